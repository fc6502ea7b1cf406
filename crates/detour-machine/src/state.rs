//! Machine states, one tagged union per nesting level
//!
//! `Begin` and the composite `Done` states are transient: the reducer
//! resolves them within the transition that enters them, so they never
//! appear as a stable state or in a state path.

/// Name of the single top-level state
pub const ROOT: &str = "Detour Drawing";

/// Stable state of the detour machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetourState {
    /// Resolving a concrete route pattern
    PickRoutePattern(PickRoutePatternState),
    /// Drawing the detour path
    Editing(EditingState),
    /// Detour fully drawn
    ShareDetour,
}

/// Sub-states of `Pick Route Pattern`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PickRoutePatternState {
    /// Looking up the patterns of a route
    PickRouteId(PickRouteIdState),
    /// Choosing among the fetched patterns
    FinalizeRoutePattern,
}

/// Sub-states of `Pick Route ID`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PickRouteIdState {
    /// Debounce armed, lookup not yet started
    Idle,
    /// Lookup in flight
    Loading,
    /// `Error: No Route`
    NoRoute,
}

/// Sub-states of `Editing`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditingState {
    /// Waiting for the point the detour leaves the route
    PickStartPoint,
    /// Adding waypoints until the route is rejoined
    PlaceWaypoint,
    /// Both connection points placed
    FinishedDrawing,
}

impl DetourState {
    /// Entry state of `Pick Route Pattern`
    pub const PICK_ROUTE_ID: Self =
        Self::PickRoutePattern(PickRoutePatternState::PickRouteId(PickRouteIdState::Idle));

    /// Entry state of `Editing`
    pub const EDITING: Self = Self::Editing(EditingState::PickStartPoint);

    /// Full path from the root to the leaf state
    #[must_use]
    pub fn state_path(&self) -> Vec<&'static str> {
        let mut path = vec![ROOT];
        match self {
            Self::PickRoutePattern(inner) => {
                path.push("Pick Route Pattern");
                match inner {
                    PickRoutePatternState::PickRouteId(leaf) => {
                        path.push("Pick Route ID");
                        path.push(match leaf {
                            PickRouteIdState::Idle => "Idle",
                            PickRouteIdState::Loading => "Loading",
                            PickRouteIdState::NoRoute => "Error: No Route",
                        });
                    }
                    PickRoutePatternState::FinalizeRoutePattern => {
                        path.push("Finalize Route Pattern");
                    }
                }
            }
            Self::Editing(leaf) => {
                path.push("Editing");
                path.push(match leaf {
                    EditingState::PickStartPoint => "Pick Start Point",
                    EditingState::PlaceWaypoint => "Place Waypoint",
                    EditingState::FinishedDrawing => "Finished Drawing",
                });
            }
            Self::ShareDetour => path.push("Share Detour"),
        }
        path
    }

    /// Inverse of [`DetourState::state_path`]
    #[must_use]
    pub fn from_path<S: AsRef<str>>(path: &[S]) -> Option<Self> {
        let names: Vec<&str> = path.iter().map(AsRef::as_ref).collect();
        let state = match names.as_slice() {
            [ROOT, "Pick Route Pattern", "Pick Route ID", "Idle"] => Self::PICK_ROUTE_ID,
            [ROOT, "Pick Route Pattern", "Pick Route ID", "Loading"] => Self::PickRoutePattern(
                PickRoutePatternState::PickRouteId(PickRouteIdState::Loading),
            ),
            [ROOT, "Pick Route Pattern", "Pick Route ID", "Error: No Route"] => {
                Self::PickRoutePattern(PickRoutePatternState::PickRouteId(
                    PickRouteIdState::NoRoute,
                ))
            }
            [ROOT, "Pick Route Pattern", "Finalize Route Pattern"] => {
                Self::PickRoutePattern(PickRoutePatternState::FinalizeRoutePattern)
            }
            [ROOT, "Editing", "Pick Start Point"] => Self::Editing(EditingState::PickStartPoint),
            [ROOT, "Editing", "Place Waypoint"] => Self::Editing(EditingState::PlaceWaypoint),
            [ROOT, "Editing", "Finished Drawing"] => Self::Editing(EditingState::FinishedDrawing),
            [ROOT, "Share Detour"] => Self::ShareDetour,
            _ => return None,
        };
        Some(state)
    }

    /// Check whether the state path starts with `prefix`
    ///
    /// The root may be omitted: `["Editing"]` and
    /// `["Detour Drawing", "Editing"]` both match any editing state.
    #[must_use]
    pub fn matches<S: AsRef<str>>(&self, prefix: &[S]) -> bool {
        let path = self.state_path();
        let relative = match prefix.first() {
            Some(first) if first.as_ref() == ROOT => &path[..],
            _ => &path[1..],
        };
        prefix.len() <= relative.len()
            && prefix
                .iter()
                .zip(relative)
                .all(|(want, have)| want.as_ref() == *have)
    }

    /// Check whether a route pattern lookup belongs to this state
    #[inline]
    #[must_use]
    pub fn is_picking_route_id(&self) -> bool {
        matches!(
            self,
            Self::PickRoutePattern(PickRoutePatternState::PickRouteId(_))
        )
    }
}

impl std::fmt::Display for DetourState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.state_path().join("."))
    }
}

/// Every stable state, in declaration order
pub const ALL_STATES: [DetourState; 8] = [
    DetourState::PICK_ROUTE_ID,
    DetourState::PickRoutePattern(PickRoutePatternState::PickRouteId(PickRouteIdState::Loading)),
    DetourState::PickRoutePattern(PickRoutePatternState::PickRouteId(PickRouteIdState::NoRoute)),
    DetourState::PickRoutePattern(PickRoutePatternState::FinalizeRoutePattern),
    DetourState::Editing(EditingState::PickStartPoint),
    DetourState::Editing(EditingState::PlaceWaypoint),
    DetourState::Editing(EditingState::FinishedDrawing),
    DetourState::ShareDetour,
];
