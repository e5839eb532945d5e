use std::sync::Arc;

use tracing::debug;

use crate::http::HttpVerb;

use super::{Params, RegisteredEntry, Registry};

/// A registered entry together with the bindings its pattern produced.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub entry: Arc<RegisteredEntry>,
    pub params: Params,
}

/// Resolves requests against a shared [`Registry`].
#[derive(Debug, Clone)]
pub struct Resolver {
    registry: Arc<Registry>,
}

impl Resolver {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// First entry, in registration order, whose pattern matches `path` and
    /// whose accept type accepts `accept`. Specificity plays no part.
    pub fn resolve(&self, verb: HttpVerb, path: &str, accept: Option<&str>) -> Option<RouteMatch> {
        let entries = self.registry.entries_for(verb);
        let found = entries
            .iter()
            .find_map(|entry| try_match(entry, path, accept));
        debug!(
            verb = %verb,
            path = %path,
            matched = found.as_ref().map(|m| m.entry.pattern().as_str()),
            "Resolved route"
        );
        found
    }

    /// Every matching entry for a filter phase, in registration order.
    pub fn resolve_all(
        &self,
        phase: HttpVerb,
        path: &str,
        accept: Option<&str>,
    ) -> Vec<RouteMatch> {
        let entries = self.registry.entries_for(phase);
        let found: Vec<_> = entries
            .iter()
            .filter_map(|entry| try_match(entry, path, accept))
            .collect();
        debug!(phase = %phase, path = %path, filters = found.len(), "Resolved filters");
        found
    }
}

fn try_match(entry: &Arc<RegisteredEntry>, path: &str, accept: Option<&str>) -> Option<RouteMatch> {
    let params = entry.pattern().matches(path)?;
    if !entry.accept().accepts(accept) {
        return None;
    }
    Some(RouteMatch {
        entry: Arc::clone(entry),
        params,
    })
}
