//! Core types for detour authoring
//!
//! Defines the values carried in the machine context:
//! - Routes and their patterns
//! - Shape points used for waypoints and connection points
//! - The working context and the construction input

use serde::{Deserialize, Serialize};

/// Transit route identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(pub String);

impl RouteId {
    /// Create a route id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RouteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Route pattern identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutePatternId(pub String);

impl RoutePatternId {
    /// Create a route pattern id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for RoutePatternId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction flag of a route pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirectionId(pub u8);

impl DirectionId {
    /// Outbound direction
    pub const OUTBOUND: Self = Self(0);
    /// Inbound direction
    pub const INBOUND: Self = Self(1);
}

/// A transit line with a display name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    /// Route id
    pub id: RouteId,
    /// Display name
    pub name: String,
}

impl Route {
    /// Create a route
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: RouteId::new(id),
            name: name.into(),
        }
    }
}

/// One directional variant of a route
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePattern {
    /// Pattern id
    pub id: RoutePatternId,
    /// Display name
    pub name: String,
    /// Route this pattern is a variant of
    pub route_id: RouteId,
    /// Travel direction
    pub direction_id: DirectionId,
    /// Destination sign text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headsign: Option<String>,
}

impl RoutePattern {
    /// Create a route pattern without a headsign
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        route_id: RouteId,
        direction_id: DirectionId,
    ) -> Self {
        Self {
            id: RoutePatternId::new(id),
            name: name.into(),
            route_id,
            direction_id,
            headsign: None,
        }
    }

    /// With headsign
    #[inline]
    #[must_use]
    pub fn with_headsign(mut self, headsign: impl Into<String>) -> Self {
        self.headsign = Some(headsign.into());
        self
    }

    /// Check whether the pattern runs inbound
    #[inline]
    #[must_use]
    pub fn is_inbound(&self) -> bool {
        self.direction_id == DirectionId::INBOUND
    }

    /// Check whether this pattern is a variant of `route`
    #[inline]
    #[must_use]
    pub fn belongs_to(&self, route: &Route) -> bool {
        self.route_id == route.id
    }
}

/// A geographic coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapePoint {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
}

impl ShapePoint {
    /// Create a point
    #[inline]
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Check that both coordinates are finite numbers
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Working data carried across machine states
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetourContext {
    /// Selected route
    #[serde(default)]
    pub route: Option<Route>,
    /// Selected pattern of `route`
    #[serde(default)]
    pub route_pattern: Option<RoutePattern>,
    /// Patterns fetched for `route`
    #[serde(default)]
    pub route_patterns: Option<Vec<RoutePattern>>,
    /// Intermediate points, in drawing order
    #[serde(default)]
    pub waypoints: Vec<ShapePoint>,
    /// Where the detour leaves the route
    #[serde(default)]
    pub start_point: Option<ShapePoint>,
    /// Where the detour rejoins the route
    #[serde(default)]
    pub end_point: Option<ShapePoint>,
}

impl DetourContext {
    /// Build the initial context for a construction input
    #[must_use]
    pub fn from_input(input: DetourInput) -> Self {
        let (route, route_pattern) = match input {
            DetourInput::Blank => (None, None),
            DetourInput::Route(route) => (Some(route), None),
            DetourInput::RoutePattern {
                route,
                route_pattern,
            } => (Some(route), Some(route_pattern)),
        };
        Self {
            route,
            route_pattern,
            ..Self::default()
        }
    }

    /// Check whether any part of the detour has been drawn
    #[inline]
    #[must_use]
    pub fn has_drawing(&self) -> bool {
        self.start_point.is_some() || !self.waypoints.is_empty() || self.end_point.is_some()
    }

    /// Reset start point, waypoints and end point
    pub fn clear_drawing(&mut self) {
        self.start_point = None;
        self.waypoints.clear();
        self.end_point = None;
    }

    /// Forget the route and everything derived from it
    pub fn clear_route(&mut self) {
        self.route = None;
        self.clear_route_patterns();
    }

    /// Forget the selected pattern and the fetched candidates
    pub fn clear_route_patterns(&mut self) {
        self.route_pattern = None;
        self.route_patterns = None;
    }

    /// Check the context-level invariants
    ///
    /// # Errors
    /// Returns a description of the first violated invariant.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.end_point.is_some() && self.start_point.is_none() {
            return Err("endPoint is set without a startPoint".to_string());
        }
        if !self.waypoints.is_empty() && self.start_point.is_none() {
            return Err("waypoints are set without a startPoint".to_string());
        }
        match (&self.route, &self.route_pattern) {
            (None, Some(_)) => Err("routePattern is set without a route".to_string()),
            (Some(route), Some(pattern)) if !pattern.belongs_to(route) => Err(format!(
                "routePattern {} does not belong to route {}",
                pattern.id, route.id
            )),
            _ => Ok(()),
        }
    }
}

/// What the caller already knows when creating a machine
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "InputFields", into = "InputFields")]
pub enum DetourInput {
    /// No prior selection
    #[default]
    Blank,
    /// Route known, pattern still to be picked
    Route(Route),
    /// Route and pattern both resolved
    RoutePattern {
        /// Known route
        route: Route,
        /// Pattern of `route`
        route_pattern: RoutePattern,
    },
}

impl DetourInput {
    /// Check whether pattern selection can be skipped
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::RoutePattern { .. })
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputFields {
    #[serde(default)]
    route: Option<Route>,
    #[serde(default)]
    route_pattern: Option<RoutePattern>,
}

impl TryFrom<InputFields> for DetourInput {
    type Error = String;

    fn try_from(fields: InputFields) -> Result<Self, Self::Error> {
        match (fields.route, fields.route_pattern) {
            (None, None) => Ok(Self::Blank),
            (Some(route), None) => Ok(Self::Route(route)),
            (Some(route), Some(route_pattern)) => Ok(Self::RoutePattern {
                route,
                route_pattern,
            }),
            (None, Some(_)) => Err("routePattern requires a route".to_string()),
        }
    }
}

impl From<DetourInput> for InputFields {
    fn from(input: DetourInput) -> Self {
        match input {
            DetourInput::Blank => Self {
                route: None,
                route_pattern: None,
            },
            DetourInput::Route(route) => Self {
                route: Some(route),
                route_pattern: None,
            },
            DetourInput::RoutePattern {
                route,
                route_pattern,
            } => Self {
                route: Some(route),
                route_pattern: Some(route_pattern),
            },
        }
    }
}
