//! Testing utilities for the detour workspace
//!
//! Shared fixtures, machines parked in a given state, and fake lookup
//! services.

#![allow(missing_docs)]

use async_trait::async_trait;
use detour_machine::{
    DetourEvent, DetourInput, DetourMachine, DirectionId, LookupError, MachineEvent, Route,
    RouteId, RoutePattern, RoutePatternLookup, ShapePoint,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tokio::sync::Notify;

pub fn route_66() -> Route {
    Route::new("66", "Route 66")
}

pub fn route_39() -> Route {
    Route::new("39", "Route 39")
}

pub fn pattern(route: &Route, id: &str, direction_id: DirectionId) -> RoutePattern {
    RoutePattern::new(id, format!("{} {id}", route.name), route.id.clone(), direction_id)
}

/// `[P1 outbound, P2 inbound]`
pub fn outbound_then_inbound(route: &Route) -> Vec<RoutePattern> {
    vec![
        pattern(route, "P1", DirectionId::OUTBOUND),
        pattern(route, "P2", DirectionId::INBOUND),
    ]
}

pub fn point(lat: f64, lon: f64) -> ShapePoint {
    ShapePoint::new(lat, lon)
}

/// `count` distinct points along a line
pub fn waypoints(count: usize) -> Vec<ShapePoint> {
    (0..count)
        .map(|i| {
            let step = f64::from(u32::try_from(i).unwrap_or(u32::MAX));
            point(42.35 + step * 0.001, -71.06 - step * 0.001)
        })
        .collect()
}

/// Machine whose input already resolved the pattern (`Editing.Pick Start Point`)
pub fn editing_machine() -> DetourMachine {
    let route = route_66();
    let route_pattern = pattern(&route, "P2", DirectionId::INBOUND);
    let (machine, _) = DetourMachine::new(DetourInput::RoutePattern {
        route,
        route_pattern,
    });
    machine
}

/// `Editing.Place Waypoint` with the given waypoints placed
pub fn placing_machine(placed: &[ShapePoint]) -> DetourMachine {
    let mut machine = editing_machine();
    machine.send(DetourEvent::PlaceWaypointOnRoute {
        location: point(42.0, -71.0),
    });
    for location in placed {
        machine.send(DetourEvent::PlaceWaypoint {
            location: *location,
        });
    }
    machine
}

/// `Editing.Finished Drawing` with one waypoint
pub fn finished_machine() -> DetourMachine {
    let mut machine = placing_machine(&waypoints(1));
    machine.send(DetourEvent::PlaceWaypointOnRoute {
        location: point(42.1, -71.1),
    });
    machine
}

/// `Share Detour`
pub fn share_machine() -> DetourMachine {
    let mut machine = finished_machine();
    machine.send(DetourEvent::EditDone);
    machine
}

/// Feed the debounce and lookup results a session would deliver
pub fn resolve_lookup(machine: &mut DetourMachine, route_patterns: Vec<RoutePattern>) {
    let ticket = machine.ticket();
    machine.send(MachineEvent::LookupDebounceElapsed { ticket });
    machine.send(MachineEvent::RoutePatternsLoaded {
        ticket,
        route_patterns,
    });
}

/// `Pick Route Pattern.Finalize Route Pattern` for route 66
pub fn finalize_machine(route_patterns: Vec<RoutePattern>) -> DetourMachine {
    let (mut machine, _) = DetourMachine::new(DetourInput::Route(route_66()));
    resolve_lookup(&mut machine, route_patterns);
    machine
}

/// Lookup that holds gated routes until [`GatedLookup::release`]
///
/// Records every route id it is asked for.
#[derive(Debug, Default)]
pub struct GatedLookup {
    patterns: HashMap<RouteId, Vec<RoutePattern>>,
    gated: Mutex<HashSet<RouteId>>,
    gate: Notify,
    calls: Mutex<Vec<RouteId>>,
}

impl GatedLookup {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_route(mut self, route: &Route, route_patterns: Vec<RoutePattern>) -> Self {
        self.patterns.insert(route.id.clone(), route_patterns);
        self
    }

    #[must_use]
    pub fn gate(self, route: &Route) -> Self {
        self.gated.lock().insert(route.id.clone());
        self
    }

    /// Let every held lookup resolve
    pub fn release(&self) {
        self.gated.lock().clear();
        self.gate.notify_waiters();
    }

    pub fn calls(&self) -> Vec<RouteId> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RoutePatternLookup for GatedLookup {
    async fn fetch_route_patterns(
        &self,
        route_id: &RouteId,
    ) -> Result<Vec<RoutePattern>, LookupError> {
        self.calls.lock().push(route_id.clone());

        let notified = self.gate.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        let held = self.gated.lock().contains(route_id);
        if held {
            notified.await;
        }

        Ok(self.patterns.get(route_id).cloned().unwrap_or_default())
    }
}

/// Lookup that always fails with the same error
#[derive(Debug)]
pub struct FailingLookup {
    error: LookupError,
    calls: Mutex<usize>,
}

impl FailingLookup {
    pub fn new(error: LookupError) -> Self {
        Self {
            error,
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl RoutePatternLookup for FailingLookup {
    async fn fetch_route_patterns(
        &self,
        _route_id: &RouteId,
    ) -> Result<Vec<RoutePattern>, LookupError> {
        *self.calls.lock() += 1;
        Err(self.error.clone())
    }
}
