//! Route registration and matching.
//!
//! ```text
//! register(verb, "/users/:name", accept, target)
//!     → pattern.rs  (parse into segments)
//!     → registry.rs (append to the ordered table)
//!
//! resolve(verb, path, accept)
//!     → registry.rs (snapshot of entries for the verb)
//!     → pattern.rs  (segment-for-segment match, bind params)
//!     → accept.rs   (exact media type check)
//!     → first match, or every match for filter phases
//! ```

mod accept;
mod pattern;
mod registry;
mod resolver;

pub use accept::AcceptType;
pub use pattern::{Params, PathPattern, Segment, MATCH_ALL};
pub use registry::{Entries, RegisteredEntry, Registry};
pub use resolver::{Resolver, RouteMatch};
