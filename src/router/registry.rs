use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use tracing::{debug, info};

use crate::error::RouteError;
use crate::handler::Target;
use crate::http::HttpVerb;

use super::{AcceptType, PathPattern};

/// One registered route or filter.
#[derive(Debug)]
pub struct RegisteredEntry {
    verb: HttpVerb,
    pattern: PathPattern,
    accept: AcceptType,
    target: Target,
}

impl RegisteredEntry {
    pub fn verb(&self) -> HttpVerb {
        self.verb
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn accept(&self) -> &AcceptType {
        &self.accept
    }

    pub fn target(&self) -> &Target {
        &self.target
    }
}

type Table = Vec<Arc<RegisteredEntry>>;

/// Ordered multimap of every route and filter.
///
/// Readers load an immutable snapshot and never block; writers serialize on
/// a mutex and publish a new table, so a reader sees the whole table either
/// before or after any one mutation.
#[derive(Debug)]
pub struct Registry {
    table: ArcSwap<Table>,
    write_lock: Mutex<()>,
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(Vec::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Parses `raw_pattern` and appends the entry. Routes must use a request
    /// verb, filters must use BEFORE or AFTER.
    pub fn register<A>(
        &self,
        verb: HttpVerb,
        raw_pattern: &str,
        accept: A,
        target: Target,
    ) -> Result<(), RouteError>
    where
        A: Into<AcceptType>,
    {
        let pattern = PathPattern::parse(raw_pattern)?;
        let role_matches = match target {
            Target::Route(_) => !verb.is_filter_phase(),
            Target::Filter(_) => verb.is_filter_phase(),
        };
        if !role_matches {
            return Err(RouteError::TargetMismatch {
                verb,
                target: target.kind(),
            });
        }

        let entry = Arc::new(RegisteredEntry {
            verb,
            pattern,
            accept: accept.into(),
            target,
        });

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = Table::clone(&self.table.load());
        next.push(Arc::clone(&entry));
        let count = next.len();
        self.table.store(Arc::new(next));

        info!(
            verb = %entry.verb,
            pattern = %entry.pattern,
            accept = %entry.accept,
            target = entry.target.kind(),
            entries = count,
            "Registered entry"
        );
        Ok(())
    }

    /// Removes every entry. Entries registered afterwards are unaffected.
    pub fn clear(&self) {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.table.store(Arc::new(Vec::new()));
        debug!("Registry cleared");
    }

    /// Entries registered under `verb`, in registration order, as of now.
    pub fn entries_for(&self, verb: HttpVerb) -> Entries {
        Entries {
            table: self.table.load_full(),
            verb,
        }
    }

    pub fn len(&self) -> usize {
        self.table.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.load().is_empty()
    }
}

/// A snapshot of the entries for one verb. Iterating does not consume it and
/// later registry mutations are not observed.
#[derive(Debug, Clone)]
pub struct Entries {
    table: Arc<Table>,
    verb: HttpVerb,
}

impl Entries {
    pub fn iter(&self) -> impl Iterator<Item = &Arc<RegisteredEntry>> {
        let verb = self.verb;
        self.table.iter().filter(move |entry| entry.verb == verb)
    }

    pub fn verb(&self) -> HttpVerb {
        self.verb
    }
}
