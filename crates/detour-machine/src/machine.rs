//! Detour machine
//!
//! [`transition`] is the pure reducer: `(state, context, event)` in,
//! `(state, context, effects)` out. It performs no I/O; the lookup
//! debounce and the lookup itself are requested through [`Effect`]s and
//! carried out by [`crate::session::DetourSession`].
//!
//! The hierarchy is flattened into a single match on `(state, event)`.
//! Composite-level events (`select-route`, `delete-route` inside
//! `Pick Route Pattern`; `clear-detour`, `open` inside `Editing`) are
//! matched on the outer variant only, so they apply at every depth.

use crate::error::SnapshotError;
use crate::event::{DetourEvent, FetchTicket, MachineEvent};
use crate::snapshot::DetourSnapshot;
use crate::state::{DetourState, EditingState, PickRoutePatternState, PickRouteIdState};
use crate::types::{DetourContext, DetourInput, RouteId, RoutePattern};

/// Side effect requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Arm the `Idle -> Loading` debounce timer
    ScheduleLookupDebounce {
        /// Entry the timer belongs to
        ticket: FetchTicket,
    },
    /// Invoke the route pattern lookup
    FetchRoutePatterns {
        /// Entry the lookup belongs to
        ticket: FetchTicket,
        /// Route to fetch; `None` fails fast
        route_id: Option<RouteId>,
    },
    /// Drop any armed timer or in-flight lookup
    CancelLookup,
}

/// Result of a handled event
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// State after the event
    pub state: DetourState,
    /// Context after the event
    pub context: DetourContext,
    /// Current fetch ticket
    pub ticket: FetchTicket,
    /// Effects to carry out, in order
    pub effects: Vec<Effect>,
}

impl Transition {
    fn stay(state: DetourState, context: DetourContext, ticket: FetchTicket) -> Self {
        Self {
            state,
            context,
            ticket,
            effects: Vec::new(),
        }
    }
}

/// What [`DetourMachine::send`] reports back
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Outcome {
    /// Whether any transition was taken
    pub handled: bool,
    /// Effects the driver must carry out
    pub effects: Vec<Effect>,
}

/// Pick the route pattern to preselect after a lookup
///
/// Keeps `current` when it is among the fetched patterns, otherwise prefers
/// the first inbound pattern, then the first pattern.
#[must_use]
pub fn select_default_route_pattern(
    current: Option<&RoutePattern>,
    route_patterns: &[RoutePattern],
) -> Option<RoutePattern> {
    current
        .and_then(|current| route_patterns.iter().find(|rp| rp.id == current.id))
        .or_else(|| route_patterns.iter().find(|rp| rp.is_inbound()))
        .or_else(|| route_patterns.first())
        .cloned()
}

/// Resolve the transient `Begin` state
fn begin(mut context: DetourContext, ticket: FetchTicket) -> Transition {
    let resolved = match (&context.route, &context.route_pattern) {
        (Some(route), Some(route_pattern)) => route_pattern.belongs_to(route),
        _ => false,
    };
    if resolved {
        return Transition::stay(DetourState::EDITING, context, ticket);
    }

    // A pattern that does not belong to the route is re-derived by the lookup
    context.route_pattern = None;
    enter_pick_route_id(DetourState::EDITING, context, ticket)
}

/// (Re-)enter `Pick Route ID`, superseding any lookup already under way
fn enter_pick_route_id(from: DetourState, context: DetourContext, ticket: FetchTicket) -> Transition {
    let ticket = ticket.next();
    let mut effects = Vec::with_capacity(2);
    if from.is_picking_route_id() {
        effects.push(Effect::CancelLookup);
    }
    effects.push(Effect::ScheduleLookupDebounce { ticket });
    Transition {
        state: DetourState::PICK_ROUTE_ID,
        context,
        ticket,
        effects,
    }
}

/// Pure reducer
///
/// Returns `None` when the event is not handled in `state`: unknown there,
/// blocked by a guard, or a stale internal event.
#[must_use]
pub fn transition(
    state: DetourState,
    context: &DetourContext,
    ticket: FetchTicket,
    event: &MachineEvent,
) -> Option<Transition> {
    use DetourState::{Editing, PickRoutePattern, ShareDetour};
    use EditingState::{FinishedDrawing, PickStartPoint, PlaceWaypoint};
    use PickRoutePatternState::{FinalizeRoutePattern, PickRouteId};
    use PickRouteIdState::{Idle, Loading, NoRoute};

    let mut next = context.clone();

    let event = match event {
        MachineEvent::Detour(event) => event,
        MachineEvent::LookupDebounceElapsed { ticket: fired } => {
            if *fired != ticket || state != PickRoutePattern(PickRouteId(Idle)) {
                return None;
            }
            let route_id = context.route.as_ref().map(|route| route.id.clone());
            return Some(Transition {
                state: PickRoutePattern(PickRouteId(Loading)),
                context: next,
                ticket,
                effects: vec![Effect::FetchRoutePatterns { ticket, route_id }],
            });
        }
        MachineEvent::RoutePatternsLoaded {
            ticket: fetched,
            route_patterns,
        } => {
            if *fetched != ticket || state != PickRoutePattern(PickRouteId(Loading)) {
                return None;
            }
            let route = context.route.as_ref()?;
            let fetched_len = route_patterns.len();
            let route_patterns: Vec<RoutePattern> = route_patterns
                .iter()
                .filter(|rp| rp.belongs_to(route))
                .cloned()
                .collect();
            if route_patterns.len() < fetched_len {
                tracing::warn!(
                    %ticket,
                    route_id = %route.id,
                    dropped = fetched_len - route_patterns.len(),
                    "lookup returned patterns of another route"
                );
            }
            next.route_pattern =
                select_default_route_pattern(context.route_pattern.as_ref(), &route_patterns);
            next.route_patterns = Some(route_patterns);
            return Some(Transition::stay(
                PickRoutePattern(FinalizeRoutePattern),
                next,
                ticket,
            ));
        }
        MachineEvent::RoutePatternsFailed {
            ticket: failed,
            reason,
        } => {
            if *failed == ticket && state == PickRoutePattern(PickRouteId(Loading)) {
                tracing::warn!(%ticket, error = %reason, "route pattern lookup failed; staying in Loading");
            }
            return None;
        }
    };

    let next = match (state, event) {
        // Pick Route Pattern, any depth
        (PickRoutePattern(_), DetourEvent::SelectRoute { route }) => {
            next.route = Some(route.clone());
            next.clear_route_patterns();
            return Some(enter_pick_route_id(state, next, ticket));
        }
        (PickRoutePattern(_), DetourEvent::DeleteRoute) => {
            next.clear_route();
            return Some(enter_pick_route_id(state, next, ticket));
        }

        (PickRoutePattern(PickRouteId(Idle | Loading)), DetourEvent::RoutePatternDone)
            if context.route.is_none() =>
        {
            return Some(Transition {
                state: PickRoutePattern(PickRouteId(NoRoute)),
                context: next,
                ticket,
                effects: vec![Effect::CancelLookup],
            });
        }

        (
            PickRoutePattern(FinalizeRoutePattern),
            DetourEvent::SelectPattern { route_pattern },
        ) => {
            let route = context.route.as_ref()?;
            if !route_pattern.belongs_to(route) {
                return None;
            }
            next.route_pattern = Some(route_pattern.clone());
            (state, next)
        }
        (PickRoutePattern(FinalizeRoutePattern), DetourEvent::RoutePatternDone) => {
            context.route_pattern.as_ref()?;
            (DetourState::EDITING, next)
        }

        // Editing, any depth
        (Editing(_), DetourEvent::ClearDetour) => {
            next.clear_drawing();
            (Editing(PickStartPoint), next)
        }
        (Editing(_), DetourEvent::OpenRoutePattern) => {
            next.clear_drawing();
            return Some(enter_pick_route_id(state, next, ticket));
        }

        // Non-finite coordinates cannot be persisted
        (
            Editing(_),
            DetourEvent::PlaceWaypoint { location } | DetourEvent::PlaceWaypointOnRoute { location },
        ) if !location.is_finite() => return None,

        (Editing(PickStartPoint), DetourEvent::PlaceWaypointOnRoute { location }) => {
            next.start_point = Some(*location);
            (Editing(PlaceWaypoint), next)
        }

        (Editing(PlaceWaypoint), DetourEvent::PlaceWaypoint { location }) => {
            next.waypoints.push(*location);
            (state, next)
        }
        (Editing(PlaceWaypoint), DetourEvent::PlaceWaypointOnRoute { location }) => {
            next.end_point = Some(*location);
            (Editing(FinishedDrawing), next)
        }
        (Editing(PlaceWaypoint), DetourEvent::Undo) => {
            if next.waypoints.pop().is_some() {
                (state, next)
            } else {
                next.start_point = None;
                (Editing(PickStartPoint), next)
            }
        }

        (Editing(FinishedDrawing), DetourEvent::Undo) => {
            next.end_point = None;
            (Editing(PlaceWaypoint), next)
        }
        (Editing(FinishedDrawing), DetourEvent::EditDone) => (ShareDetour, next),

        (ShareDetour, DetourEvent::Resume) => (Editing(FinishedDrawing), next),
        (ShareDetour, DetourEvent::CopyDetour { .. }) => (state, next),

        _ => return None,
    };

    let (state, context) = next;
    Some(Transition::stay(state, context, ticket))
}

/// Check that a context could have been produced in `state`
///
/// # Errors
/// Returns a description of the first mismatch.
pub fn check_consistency(state: DetourState, context: &DetourContext) -> Result<(), String> {
    context.check_invariants()?;

    let requires = |ok: bool, what: &str| {
        if ok {
            Ok(())
        } else {
            Err(format!("{state} requires {what}"))
        }
    };

    match state {
        DetourState::PickRoutePattern(inner) => {
            requires(!context.has_drawing(), "an empty drawing")?;
            match inner {
                PickRoutePatternState::PickRouteId(PickRouteIdState::NoRoute) => {
                    requires(context.route.is_none(), "no route")
                }
                PickRoutePatternState::PickRouteId(_) => Ok(()),
                PickRoutePatternState::FinalizeRoutePattern => requires(
                    context.route.is_some() && context.route_patterns.is_some(),
                    "a route with fetched route patterns",
                ),
            }
        }
        DetourState::Editing(_) | DetourState::ShareDetour => {
            requires(
                context.route.is_some() && context.route_pattern.is_some(),
                "a finalized route pattern",
            )?;
            match state {
                DetourState::Editing(EditingState::PickStartPoint) => {
                    requires(!context.has_drawing(), "an empty drawing")
                }
                DetourState::Editing(EditingState::PlaceWaypoint) => requires(
                    context.start_point.is_some() && context.end_point.is_none(),
                    "a start point and no end point",
                ),
                _ => requires(
                    context.start_point.is_some() && context.end_point.is_some(),
                    "both connection points",
                ),
            }
        }
    }
}

/// A running detour machine instance
#[derive(Debug, Clone, PartialEq)]
pub struct DetourMachine {
    state: DetourState,
    context: DetourContext,
    ticket: FetchTicket,
}

impl DetourMachine {
    /// Create a machine and resolve `Begin`
    ///
    /// Returns the effects of entering the first stable state.
    #[must_use]
    pub fn new(input: DetourInput) -> (Self, Vec<Effect>) {
        let context = DetourContext::from_input(input);
        let Transition {
            state,
            context,
            ticket,
            effects,
        } = begin(context, FetchTicket::default());
        tracing::debug!(%state, "detour machine started");
        (
            Self {
                state,
                context,
                ticket,
            },
            effects,
        )
    }

    /// Apply one event
    pub fn send(&mut self, event: impl Into<MachineEvent>) -> Outcome {
        let event = event.into();
        match transition(self.state, &self.context, self.ticket, &event) {
            Some(Transition {
                state,
                context,
                ticket,
                effects,
            }) => {
                if state != self.state {
                    tracing::debug!(event = event.name(), from = %self.state, to = %state, "transition");
                } else {
                    tracing::trace!(event = event.name(), state = %state, "context update");
                }
                self.state = state;
                self.context = context;
                self.ticket = ticket;
                Outcome {
                    handled: true,
                    effects,
                }
            }
            None => {
                tracing::trace!(event = event.name(), state = %self.state, "event not handled");
                Outcome::default()
            }
        }
    }

    /// Current stable state
    #[inline]
    #[must_use]
    pub fn state(&self) -> DetourState {
        self.state
    }

    /// Current context
    #[inline]
    #[must_use]
    pub fn context(&self) -> &DetourContext {
        &self.context
    }

    /// Ticket of the most recent `Pick Route ID` entry
    #[inline]
    #[must_use]
    pub fn ticket(&self) -> FetchTicket {
        self.ticket
    }

    /// Check whether the machine is waiting on the route pattern lookup
    #[inline]
    #[must_use]
    pub fn awaits_lookup(&self) -> bool {
        matches!(
            self.state,
            DetourState::PickRoutePattern(PickRoutePatternState::PickRouteId(
                PickRouteIdState::Idle | PickRouteIdState::Loading
            ))
        )
    }

    /// Capture state path and context
    #[must_use]
    pub fn snapshot(&self) -> DetourSnapshot {
        DetourSnapshot {
            state_path: self
                .state
                .state_path()
                .into_iter()
                .map(String::from)
                .collect(),
            context: self.context.clone(),
            fetch_ticket: self.ticket,
        }
    }

    /// Rebuild a machine from a snapshot without producing effects
    ///
    /// # Errors
    /// `SnapshotError::RejectedByMachine` if the snapshot names an unknown
    /// state or its context could not occur in that state.
    pub fn restore(snapshot: DetourSnapshot) -> Result<Self, SnapshotError> {
        let state = snapshot.resolve_state()?;
        tracing::debug!(%state, "detour machine restored");
        Ok(Self {
            state,
            context: snapshot.context,
            ticket: snapshot.fetch_ticket,
        })
    }
}
