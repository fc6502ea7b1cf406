//! Route pattern lookup port
//!
//! The machine's only collaborator: given a route id, asynchronously return
//! the patterns of that route.

use crate::error::LookupError;
use crate::types::{RouteId, RoutePattern};
use async_trait::async_trait;
use dashmap::DashMap;

/// Route pattern lookup service
///
/// Implement this trait to connect the machine to a real data source.
#[async_trait]
pub trait RoutePatternLookup: Send + Sync {
    /// Fetch every pattern of `route_id`
    async fn fetch_route_patterns(
        &self,
        route_id: &RouteId,
    ) -> Result<Vec<RoutePattern>, LookupError>;
}

/// Invoke `lookup`, failing fast when there is no route id
///
/// # Errors
/// - `LookupError::NoRouteId` if `route_id` is `None`; the service is not
///   called
/// - Whatever the service returns otherwise
pub async fn fetch_for_route(
    lookup: &dyn RoutePatternLookup,
    route_id: Option<&RouteId>,
) -> Result<Vec<RoutePattern>, LookupError> {
    let route_id = route_id.ok_or(LookupError::NoRouteId)?;
    tracing::debug!(%route_id, "fetching route patterns");
    let route_patterns = lookup.fetch_route_patterns(route_id).await?;
    tracing::debug!(%route_id, count = route_patterns.len(), "route patterns fetched");
    Ok(route_patterns)
}

/// In-memory lookup backed by a concurrent map
///
/// Unknown routes resolve to an empty list.
#[derive(Debug, Default)]
pub struct InMemoryRoutePatternLookup {
    patterns: DashMap<RouteId, Vec<RoutePattern>>,
}

impl InMemoryRoutePatternLookup {
    /// Create an empty lookup
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(route, patterns)` pairs
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = (RouteId, Vec<RoutePattern>)>) -> Self {
        let lookup = Self::new();
        for (route_id, route_patterns) in entries {
            lookup.insert(route_id, route_patterns);
        }
        lookup
    }

    /// Replace the patterns of a route
    pub fn insert(&self, route_id: RouteId, route_patterns: Vec<RoutePattern>) {
        self.patterns.insert(route_id, route_patterns);
    }

    /// Number of routes known
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Check whether no route has patterns
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[async_trait]
impl RoutePatternLookup for InMemoryRoutePatternLookup {
    async fn fetch_route_patterns(
        &self,
        route_id: &RouteId,
    ) -> Result<Vec<RoutePattern>, LookupError> {
        Ok(self
            .patterns
            .get(route_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }
}
