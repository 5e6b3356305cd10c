//! The route table.

use std::collections::BTreeMap;

use waypost_model::HttpVerb;

use crate::route::{RouteKey, RouteRecord};

/// What to do when two operations claim the same route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Fail registration.
    #[default]
    Reject,
    /// Keep the later registration.
    Replace,
}

/// Errors raised while building a router.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    /// An entity name was empty or contained a slash.
    #[error("invalid entity name {0:?}")]
    InvalidEntityName(String),

    /// An `Auth` operation was found on a controller without an authenticator.
    #[error("{controller}.{operation} requires authentication but the controller has no authenticator")]
    MissingAuthenticator {
        /// Controller name.
        controller: String,
        /// Operation name.
        operation: String,
    },

    /// Two operations map to the same route.
    #[error("route {route} is served by both {existing} and {duplicate}")]
    DuplicateRoute {
        /// The contested route.
        route: String,
        /// Operation already registered.
        existing: String,
        /// Operation being registered.
        duplicate: String,
    },

    /// The router was built with no routes at all.
    #[error("no routes were registered")]
    NoRoutes,
}

/// Routes keyed by entity, verb, version and action.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: BTreeMap<RouteKey, RouteRecord>,
}

impl RouteTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record under `policy`.
    ///
    /// Returns the record it replaced, if any.
    pub fn insert(
        &mut self,
        record: RouteRecord,
        policy: DuplicatePolicy,
    ) -> Result<Option<RouteRecord>, RegistrationError> {
        let key = record.key();
        if policy == DuplicatePolicy::Reject {
            if let Some(existing) = self.routes.get(&key) {
                return Err(RegistrationError::DuplicateRoute {
                    route: key.to_string(),
                    existing: format!("{}.{}", existing.controller_name, existing.handler_name),
                    duplicate: format!("{}.{}", record.controller_name, record.handler_name),
                });
            }
        }
        Ok(self.routes.insert(key, record))
    }

    /// Find the route for a request.
    #[must_use]
    pub fn lookup(
        &self,
        verb: HttpVerb,
        version_token: &str,
        entity: &str,
        action: &str,
    ) -> Option<&RouteRecord> {
        self.routes
            .get(&RouteKey::new(entity, verb, version_token, action))
    }

    /// Number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// One sorted line per route.
    #[must_use]
    pub fn summary(&self, base_path: &str) -> Vec<String> {
        let mut lines: Vec<String> = self
            .routes
            .values()
            .map(|record| record.summary_line(base_path))
            .collect();
        lines.sort();
        lines
    }
}
