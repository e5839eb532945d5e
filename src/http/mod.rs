pub mod request;
pub mod response;
pub mod verb;

pub use request::{Request, RequestBody};
pub use response::{Body, Response};
pub use verb::HttpVerb;
