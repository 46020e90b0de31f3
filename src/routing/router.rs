//! Route lookup and dispatch for GET requests.
//!
//! # Responsibilities
//! - Store handlers registered under path prefixes
//! - Look up the handler for a decoded path
//! - Return matched handler, unknown name, or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction
//! - Longest prefix wins when prefixes nest
//! - Handler names are exact matches on the remainder after the prefix

use std::collections::HashMap;

use crate::routing::matcher::PathPrefixMatcher;
use crate::routing::target::QueryParams;

/// A GET handler: acts on the application context and returns the body text.
pub type GetHandler<C> = fn(&mut C, &QueryParams) -> String;

/// Handlers mounted under one path prefix.
struct Mount<C> {
    matcher: PathPrefixMatcher,
    handlers: HashMap<String, GetHandler<C>>,
}

/// Result of a route lookup.
pub enum RouteMatch<'r, C> {
    /// A handler is registered for the path.
    Handler(GetHandler<C>),
    /// The prefix matched but no handler has this name.
    UnknownName(&'r str),
    /// No prefix matched.
    NoMatch,
}

impl<C> std::fmt::Debug for RouteMatch<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteMatch::Handler(_) => f.write_str("Handler"),
            RouteMatch::UnknownName(name) => f.debug_tuple("UnknownName").field(name).finish(),
            RouteMatch::NoMatch => f.write_str("NoMatch"),
        }
    }
}

/// Prefix router for GET requests.
pub struct Router<C> {
    mounts: Vec<Mount<C>>,
}

impl<C> Default for Router<C> {
    fn default() -> Self {
        Self { mounts: Vec::new() }
    }
}

impl<C> Router<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` as `<prefix><name>`.
    pub fn route(mut self, prefix: &str, name: &str, handler: GetHandler<C>) -> Self {
        let index = match self.mounts.iter().position(|m| m.matcher.prefix() == prefix) {
            Some(index) => index,
            None => {
                self.mounts.push(Mount {
                    matcher: PathPrefixMatcher::new(prefix),
                    handlers: HashMap::new(),
                });
                self.mounts
                    .sort_by(|a, b| b.matcher.prefix().len().cmp(&a.matcher.prefix().len()));
                self.mounts
                    .iter()
                    .position(|m| m.matcher.prefix() == prefix)
                    .unwrap_or_default()
            }
        };
        self.mounts[index].handlers.insert(name.to_string(), handler);
        self
    }

    /// Find the handler for `path`.
    pub fn lookup<'p>(&self, path: &'p str) -> RouteMatch<'p, C> {
        for mount in &self.mounts {
            if let Some(name) = mount.matcher.strip(path) {
                return match mount.handlers.get(name) {
                    Some(handler) => RouteMatch::Handler(*handler),
                    None => RouteMatch::UnknownName(name),
                };
            }
        }
        RouteMatch::NoMatch
    }
}
