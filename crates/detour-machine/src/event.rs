//! Event vocabulary
//!
//! [`DetourEvent`] is the closed set of events a caller may send.
//! [`MachineEvent`] adds the internal events produced by the session driver
//! while it carries out the route pattern lookup.

use crate::error::LookupError;
use crate::types::{Route, RoutePattern, ShapePoint};
use serde::{Deserialize, Serialize};

/// External events accepted by the machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DetourEvent {
    /// Reopen pattern selection from `Editing`
    #[serde(rename = "detour.route-pattern.open")]
    OpenRoutePattern,
    /// Confirm the selected pattern
    #[serde(rename = "detour.route-pattern.done")]
    RoutePatternDone,
    /// Forget the selected route
    #[serde(rename = "detour.route-pattern.delete-route")]
    DeleteRoute,
    /// Choose a route
    #[serde(rename = "detour.route-pattern.select-route")]
    SelectRoute {
        /// Route chosen by the dispatcher
        route: Route,
    },
    /// Choose one of the fetched patterns
    #[serde(rename = "detour.route-pattern.select-pattern")]
    SelectPattern {
        /// Pattern of the current route
        #[serde(rename = "routePattern")]
        route_pattern: RoutePattern,
    },
    /// Finish drawing
    #[serde(rename = "detour.edit.done")]
    EditDone,
    /// Go back from sharing to drawing
    #[serde(rename = "detour.edit.resume")]
    Resume,
    /// Erase the whole drawing
    #[serde(rename = "detour.edit.clear-detour")]
    ClearDetour,
    /// Tap on the route shape: start or end point
    #[serde(rename = "detour.edit.place-waypoint-on-route")]
    PlaceWaypointOnRoute {
        /// Tapped point
        location: ShapePoint,
    },
    /// Tap off the route shape: intermediate waypoint
    #[serde(rename = "detour.edit.place-waypoint")]
    PlaceWaypoint {
        /// Tapped point
        location: ShapePoint,
    },
    /// Remove the last placed point
    #[serde(rename = "detour.edit.undo")]
    Undo,
    /// The caller copied the detour text
    #[serde(rename = "detour.share.copy-detour")]
    CopyDetour {
        /// Text that was copied
        #[serde(rename = "detourText")]
        detour_text: String,
    },
}

impl DetourEvent {
    /// Parse an event, returning `None` for anything outside the vocabulary
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match Self::deserialize(value) {
            Ok(event) => Some(event),
            Err(err) => {
                tracing::trace!(error = %err, "dropping unrecognized event");
                None
            }
        }
    }

    /// Dotted event name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenRoutePattern => "detour.route-pattern.open",
            Self::RoutePatternDone => "detour.route-pattern.done",
            Self::DeleteRoute => "detour.route-pattern.delete-route",
            Self::SelectRoute { .. } => "detour.route-pattern.select-route",
            Self::SelectPattern { .. } => "detour.route-pattern.select-pattern",
            Self::EditDone => "detour.edit.done",
            Self::Resume => "detour.edit.resume",
            Self::ClearDetour => "detour.edit.clear-detour",
            Self::PlaceWaypointOnRoute { .. } => "detour.edit.place-waypoint-on-route",
            Self::PlaceWaypoint { .. } => "detour.edit.place-waypoint",
            Self::Undo => "detour.edit.undo",
            Self::CopyDetour { .. } => "detour.share.copy-detour",
        }
    }
}

/// Identifies one entry into `Pick Route ID`
///
/// Internal events carrying an older ticket are stale and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FetchTicket(pub u64);

impl FetchTicket {
    /// Ticket for the next entry
    #[inline]
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl std::fmt::Display for FetchTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything the reducer reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum MachineEvent {
    /// Caller event
    Detour(DetourEvent),
    /// The `Idle` debounce delay has passed
    LookupDebounceElapsed {
        /// Entry the timer was armed for
        ticket: FetchTicket,
    },
    /// The lookup service resolved
    RoutePatternsLoaded {
        /// Entry the lookup was started for
        ticket: FetchTicket,
        /// Patterns returned by the service
        route_patterns: Vec<RoutePattern>,
    },
    /// The lookup service rejected or timed out
    RoutePatternsFailed {
        /// Entry the lookup was started for
        ticket: FetchTicket,
        /// Why the lookup failed
        reason: LookupError,
    },
}

impl MachineEvent {
    /// Name used in logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Detour(event) => event.name(),
            Self::LookupDebounceElapsed { .. } => "internal.lookup-debounce-elapsed",
            Self::RoutePatternsLoaded { .. } => "internal.route-patterns-loaded",
            Self::RoutePatternsFailed { .. } => "internal.route-patterns-failed",
        }
    }
}

impl From<DetourEvent> for MachineEvent {
    fn from(event: DetourEvent) -> Self {
        Self::Detour(event)
    }
}
