use detour_machine::state::ALL_STATES;
use detour_machine::*;
use detour_test_utils::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn pick_route_id(leaf: PickRouteIdState) -> DetourState {
    DetourState::PickRoutePattern(PickRoutePatternState::PickRouteId(leaf))
}

const FINALIZE: DetourState =
    DetourState::PickRoutePattern(PickRoutePatternState::FinalizeRoutePattern);
const PICK_START: DetourState = DetourState::Editing(EditingState::PickStartPoint);
const PLACE_WAYPOINT: DetourState = DetourState::Editing(EditingState::PlaceWaypoint);
const FINISHED: DetourState = DetourState::Editing(EditingState::FinishedDrawing);

fn selected_id(machine: &DetourMachine) -> Option<String> {
    machine
        .context()
        .route_pattern
        .as_ref()
        .map(|rp| rp.id.0.clone())
}

// Begin

#[test]
fn test_resolved_input_skips_pattern_selection() {
    let (machine, effects) = DetourMachine::new(DetourInput::RoutePattern {
        route: route_66(),
        route_pattern: pattern(&route_66(), "P1", DirectionId::OUTBOUND),
    });
    assert_eq!(machine.state(), PICK_START);
    assert!(effects.is_empty());
    assert!(!machine.awaits_lookup());
}

#[test]
fn test_route_only_input_enters_pick_route_id() {
    let (machine, effects) = DetourMachine::new(DetourInput::Route(route_66()));
    assert_eq!(machine.state(), pick_route_id(PickRouteIdState::Idle));
    assert!(machine.awaits_lookup());
    assert_eq!(
        effects,
        vec![Effect::ScheduleLookupDebounce {
            ticket: machine.ticket()
        }]
    );
}

#[test]
fn test_blank_input_enters_pick_route_id() {
    let (machine, _) = DetourMachine::new(DetourInput::Blank);
    assert_eq!(machine.state(), DetourState::PICK_ROUTE_ID);
    assert_eq!(machine.context(), &DetourContext::default());
}

// Pick Route ID

#[test]
fn test_debounce_starts_lookup_for_current_route() {
    let (mut machine, _) = DetourMachine::new(DetourInput::Route(route_66()));
    let ticket = machine.ticket();
    let outcome = machine.send(MachineEvent::LookupDebounceElapsed { ticket });

    assert!(outcome.handled);
    assert_eq!(machine.state(), pick_route_id(PickRouteIdState::Loading));
    assert_eq!(
        outcome.effects,
        vec![Effect::FetchRoutePatterns {
            ticket,
            route_id: Some(RouteId::new("66")),
        }]
    );
}

#[test]
fn test_lookup_without_route_is_requested_without_id() {
    let (mut machine, _) = DetourMachine::new(DetourInput::Blank);
    let ticket = machine.ticket();
    let outcome = machine.send(MachineEvent::LookupDebounceElapsed { ticket });
    assert_eq!(
        outcome.effects,
        vec![Effect::FetchRoutePatterns {
            ticket,
            route_id: None
        }]
    );
}

#[test]
fn test_lookup_failure_keeps_loading() {
    let (mut machine, _) = DetourMachine::new(DetourInput::Route(route_66()));
    let ticket = machine.ticket();
    machine.send(MachineEvent::LookupDebounceElapsed { ticket });

    let outcome = machine.send(MachineEvent::RoutePatternsFailed {
        ticket,
        reason: LookupError::Service("502".to_string()),
    });
    assert!(!outcome.handled);
    assert_eq!(machine.state(), pick_route_id(PickRouteIdState::Loading));
}

#[test]
fn test_stale_lookup_result_is_discarded() {
    let (mut machine, _) = DetourMachine::new(DetourInput::Route(route_66()));
    let first = machine.ticket();
    machine.send(MachineEvent::LookupDebounceElapsed { ticket: first });

    machine.send(DetourEvent::SelectRoute { route: route_39() });
    let second = machine.ticket();
    assert_ne!(first, second);
    machine.send(MachineEvent::LookupDebounceElapsed { ticket: second });

    let outcome = machine.send(MachineEvent::RoutePatternsLoaded {
        ticket: first,
        route_patterns: outbound_then_inbound(&route_66()),
    });
    assert!(!outcome.handled);
    assert_eq!(machine.state(), pick_route_id(PickRouteIdState::Loading));
    assert_eq!(machine.context().route_patterns, None);
}

#[test]
fn test_done_without_route_is_an_error() {
    let (mut machine, _) = DetourMachine::new(DetourInput::Blank);
    let outcome = machine.send(DetourEvent::RoutePatternDone);

    assert!(outcome.handled);
    assert_eq!(outcome.effects, vec![Effect::CancelLookup]);
    assert_eq!(machine.state(), pick_route_id(PickRouteIdState::NoRoute));

    machine.send(DetourEvent::SelectRoute { route: route_66() });
    assert_eq!(machine.state(), DetourState::PICK_ROUTE_ID);
}

#[test]
fn test_done_with_route_while_loading_is_ignored() {
    let (mut machine, _) = DetourMachine::new(DetourInput::Route(route_66()));
    let outcome = machine.send(DetourEvent::RoutePatternDone);
    assert!(!outcome.handled);
    assert_eq!(machine.state(), DetourState::PICK_ROUTE_ID);
}

#[test]
fn test_delete_route_clears_route_and_patterns() {
    let mut machine = finalize_machine(outbound_then_inbound(&route_66()));
    let outcome = machine.send(DetourEvent::DeleteRoute);

    assert!(outcome.handled);
    assert_eq!(machine.state(), DetourState::PICK_ROUTE_ID);
    assert_eq!(machine.context().route, None);
    assert_eq!(machine.context().route_pattern, None);
    assert_eq!(machine.context().route_patterns, None);
}

// Default pattern selection

#[test]
fn test_scenario_a_first_inbound_is_selected() {
    let (mut machine, _) = DetourMachine::new(DetourInput::Blank);
    machine.send(DetourEvent::SelectRoute { route: route_66() });
    resolve_lookup(&mut machine, outbound_then_inbound(&route_66()));

    assert_eq!(machine.state(), FINALIZE);
    assert_eq!(selected_id(&machine), Some("P2".to_string()));

    machine.send(DetourEvent::RoutePatternDone);
    assert_eq!(machine.state(), PICK_START);
}

#[test]
fn test_first_pattern_selected_without_inbound() {
    let route = route_66();
    let machine = finalize_machine(vec![
        pattern(&route, "P5", DirectionId::OUTBOUND),
        pattern(&route, "P6", DirectionId::OUTBOUND),
    ]);
    assert_eq!(selected_id(&machine), Some("P5".to_string()));
}

#[test]
fn test_empty_lookup_selects_nothing() {
    let machine = finalize_machine(Vec::new());
    assert_eq!(machine.state(), FINALIZE);
    assert_eq!(selected_id(&machine), None);
    assert_eq!(machine.context().route_patterns, Some(Vec::new()));
}

#[test]
fn test_reopening_keeps_matching_selection() {
    let mut machine = editing_machine();
    assert_eq!(selected_id(&machine), Some("P2".to_string()));

    machine.send(DetourEvent::OpenRoutePattern);
    assert_eq!(machine.state(), DetourState::PICK_ROUTE_ID);

    let route = route_66();
    resolve_lookup(
        &mut machine,
        vec![
            pattern(&route, "P3", DirectionId::INBOUND),
            pattern(&route, "P2", DirectionId::INBOUND),
        ],
    );
    assert_eq!(selected_id(&machine), Some("P2".to_string()));
}

#[test]
fn test_patterns_of_another_route_are_discarded() {
    let machine = finalize_machine(vec![pattern(&route_39(), "39-1", DirectionId::INBOUND)]);

    assert_eq!(machine.state(), FINALIZE);
    assert_eq!(selected_id(&machine), None);
    assert_eq!(machine.context().route_patterns, Some(Vec::new()));

    let value = machine.snapshot().to_value().unwrap();
    assert!(DetourSnapshot::validate(&value).is_ok());
}

#[test]
fn test_foreign_inbound_pattern_does_not_win_selection() {
    let mut machine = finalize_machine(vec![
        pattern(&route_39(), "39-1", DirectionId::INBOUND),
        pattern(&route_66(), "P1", DirectionId::OUTBOUND),
    ]);
    assert_eq!(selected_id(&machine), Some("P1".to_string()));
    assert_eq!(
        machine.context().route_patterns,
        Some(vec![pattern(&route_66(), "P1", DirectionId::OUTBOUND)])
    );

    machine.send(DetourEvent::RoutePatternDone);
    assert_eq!(machine.state(), PICK_START);
    let value = machine.snapshot().to_value().unwrap();
    assert!(DetourSnapshot::validate(&value).is_ok());
}

// Finalize Route Pattern

#[test]
fn test_scenario_d_done_blocked_without_pattern() {
    let mut machine = finalize_machine(Vec::new());
    let before = machine.clone();

    let outcome = machine.send(DetourEvent::RoutePatternDone);

    assert!(!outcome.handled);
    assert_eq!(machine, before);
}

#[test]
fn test_select_pattern_updates_selection() {
    let route = route_66();
    let mut machine = finalize_machine(outbound_then_inbound(&route));
    let outcome = machine.send(DetourEvent::SelectPattern {
        route_pattern: pattern(&route, "P1", DirectionId::OUTBOUND),
    });
    assert!(outcome.handled);
    assert_eq!(selected_id(&machine), Some("P1".to_string()));
    assert_eq!(machine.state(), FINALIZE);
}

#[test]
fn test_select_pattern_of_other_route_is_ignored() {
    let mut machine = finalize_machine(outbound_then_inbound(&route_66()));
    let outcome = machine.send(DetourEvent::SelectPattern {
        route_pattern: pattern(&route_39(), "39-0", DirectionId::OUTBOUND),
    });
    assert!(!outcome.handled);
    assert_eq!(selected_id(&machine), Some("P2".to_string()));
}

#[test]
fn test_scenario_e_new_route_clears_finalized_pattern() {
    let mut machine = finalize_machine(outbound_then_inbound(&route_66()));
    assert!(machine.context().route_pattern.is_some());

    let outcome = machine.send(DetourEvent::SelectRoute { route: route_39() });

    assert!(outcome.handled);
    assert_eq!(machine.state(), DetourState::PICK_ROUTE_ID);
    assert_eq!(machine.context().route, Some(route_39()));
    assert_eq!(machine.context().route_pattern, None);
    assert_eq!(machine.context().route_patterns, None);
    assert_eq!(
        outcome.effects,
        vec![Effect::ScheduleLookupDebounce {
            ticket: machine.ticket()
        }]
    );
}

// Editing

#[test]
fn test_start_point_then_waypoints_then_end_point() {
    let mut machine = editing_machine();
    machine.send(DetourEvent::PlaceWaypointOnRoute {
        location: point(1.0, 1.0),
    });
    assert_eq!(machine.state(), PLACE_WAYPOINT);
    assert_eq!(machine.context().start_point, Some(point(1.0, 1.0)));

    for location in waypoints(3) {
        machine.send(DetourEvent::PlaceWaypoint { location });
        assert_eq!(machine.state(), PLACE_WAYPOINT);
    }
    assert_eq!(machine.context().waypoints, waypoints(3));

    machine.send(DetourEvent::PlaceWaypointOnRoute {
        location: point(2.0, 2.0),
    });
    assert_eq!(machine.state(), FINISHED);
    assert_eq!(machine.context().end_point, Some(point(2.0, 2.0)));
}

#[test]
fn test_place_waypoint_before_start_is_ignored() {
    let mut machine = editing_machine();
    let outcome = machine.send(DetourEvent::PlaceWaypoint {
        location: point(1.0, 1.0),
    });
    assert!(!outcome.handled);
    assert!(machine.context().waypoints.is_empty());
}

#[test]
fn test_scenario_b_undo_pops_then_clears_start() {
    let placed = waypoints(2);
    let mut machine = placing_machine(&placed);

    machine.send(DetourEvent::Undo);
    assert_eq!(machine.state(), PLACE_WAYPOINT);
    assert_eq!(machine.context().waypoints, vec![placed[0]]);

    machine.send(DetourEvent::Undo);
    machine.send(DetourEvent::Undo);
    assert_eq!(machine.state(), PICK_START);
    assert!(machine.context().waypoints.is_empty());
    assert_eq!(machine.context().start_point, None);
}

#[test]
fn test_undo_from_finished_drawing_clears_end_point() {
    let mut machine = finished_machine();
    machine.send(DetourEvent::Undo);
    assert_eq!(machine.state(), PLACE_WAYPOINT);
    assert_eq!(machine.context().end_point, None);
    assert_eq!(machine.context().waypoints.len(), 1);
}

#[test]
fn test_clear_detour_from_any_editing_state() {
    for mut machine in [editing_machine(), placing_machine(&waypoints(2)), finished_machine()] {
        let outcome = machine.send(DetourEvent::ClearDetour);
        assert!(outcome.handled);
        assert_eq!(machine.state(), PICK_START);
        assert!(!machine.context().has_drawing());
        assert!(machine.context().route_pattern.is_some());
    }
}

#[test]
fn test_open_route_pattern_from_editing_clears_and_reenters() {
    let mut machine = finished_machine();
    let outcome = machine.send(DetourEvent::OpenRoutePattern);

    assert!(outcome.handled);
    assert_eq!(machine.state(), DetourState::PICK_ROUTE_ID);
    assert!(!machine.context().has_drawing());
    assert_eq!(machine.context().route, Some(route_66()));
    assert_eq!(
        outcome.effects,
        vec![Effect::ScheduleLookupDebounce {
            ticket: machine.ticket()
        }]
    );
}

#[test]
fn test_non_finite_points_are_ignored() {
    let mut machine = editing_machine();
    let outcome = machine.send(DetourEvent::PlaceWaypointOnRoute {
        location: point(f64::NAN, -71.0),
    });
    assert!(!outcome.handled);
    assert_eq!(machine.state(), PICK_START);

    let mut machine = placing_machine(&waypoints(1));
    let before = machine.clone();
    for location in [point(f64::NAN, 0.0), point(42.0, f64::INFINITY)] {
        assert!(!machine.send(DetourEvent::PlaceWaypoint { location }).handled);
        assert!(!machine.send(DetourEvent::PlaceWaypointOnRoute { location }).handled);
    }
    assert_eq!(machine, before);

    let value = machine.snapshot().to_value().unwrap();
    assert!(DetourSnapshot::validate(&value).is_ok());
}

// Share Detour

#[test]
fn test_scenario_c_done_then_resume() {
    let mut machine = finished_machine();
    let end_point = machine.context().end_point;

    machine.send(DetourEvent::EditDone);
    assert_eq!(machine.state(), DetourState::ShareDetour);

    machine.send(DetourEvent::Resume);
    assert_eq!(machine.state(), FINISHED);
    assert_eq!(machine.context().end_point, end_point);

    machine.send(DetourEvent::Undo);
    assert_eq!(machine.state(), PLACE_WAYPOINT);
}

#[test]
fn test_copy_detour_is_acknowledged_without_change() {
    let mut machine = share_machine();
    let before = machine.clone();
    let outcome = machine.send(DetourEvent::CopyDetour {
        detour_text: "Detour: Main St to Elm St".to_string(),
    });
    assert!(outcome.handled);
    assert!(outcome.effects.is_empty());
    assert_eq!(machine, before);
}

#[test]
fn test_share_ignores_editing_events() {
    let mut machine = share_machine();
    for event in [
        DetourEvent::Undo,
        DetourEvent::ClearDetour,
        DetourEvent::OpenRoutePattern,
        DetourEvent::EditDone,
    ] {
        assert!(!machine.send(event).handled);
        assert_eq!(machine.state(), DetourState::ShareDetour);
    }
}

// Snapshots

#[test]
fn test_snapshot_of_every_fixture_restores() {
    let (idle, _) = DetourMachine::new(DetourInput::Route(route_66()));
    for machine in [
        idle,
        finalize_machine(outbound_then_inbound(&route_66())),
        editing_machine(),
        placing_machine(&waypoints(3)),
        finished_machine(),
        share_machine(),
    ] {
        let value = machine.snapshot().to_value().unwrap();
        let snapshot = DetourSnapshot::validate(&value).unwrap();
        let restored = DetourMachine::restore(snapshot).unwrap();
        assert_eq!(restored, machine);
    }
}

#[test]
fn test_snapshot_json_shape() {
    let value = finished_machine().snapshot().to_value().unwrap();
    assert_eq!(
        value["statePath"],
        serde_json::json!(["Detour Drawing", "Editing", "Finished Drawing"])
    );
    assert!(value["context"]["endPoint"].is_object());
    assert!(value["context"]["routePattern"]["directionId"].is_number());
}

#[test]
fn test_every_state_path_is_restorable_in_principle() {
    for state in ALL_STATES {
        let path: Vec<String> = state.state_path().into_iter().map(String::from).collect();
        assert_eq!(DetourState::from_path(path.as_slice()), Some(state));
    }
}

#[test]
fn test_unknown_events_never_construct() {
    for value in [
        serde_json::json!({ "type": "detour.activate" }),
        serde_json::json!({ "type": "detour.edit.place-waypoint", "location": "here" }),
        serde_json::json!({}),
    ] {
        assert_eq!(DetourEvent::from_value(&value), None);
    }
}

// Properties

#[derive(Debug, Clone)]
enum Step {
    Event(DetourEvent),
    Debounce,
    Load,
    LoadEmpty,
    LoadForeign,
    Fail,
}

fn location() -> impl Strategy<Value = ShapePoint> {
    (-90.0f64..90.0, -180.0f64..180.0).prop_map(|(lat, lon)| ShapePoint::new(lat, lon))
}

fn fixed_steps() -> Vec<Step> {
    vec![
        Step::Event(DetourEvent::OpenRoutePattern),
        Step::Event(DetourEvent::RoutePatternDone),
        Step::Event(DetourEvent::DeleteRoute),
        Step::Event(DetourEvent::SelectRoute { route: route_66() }),
        Step::Event(DetourEvent::SelectRoute { route: route_39() }),
        Step::Event(DetourEvent::SelectPattern {
            route_pattern: pattern(&route_66(), "P1", DirectionId::OUTBOUND),
        }),
        Step::Event(DetourEvent::EditDone),
        Step::Event(DetourEvent::Resume),
        Step::Event(DetourEvent::ClearDetour),
        Step::Event(DetourEvent::Undo),
        Step::Event(DetourEvent::CopyDetour {
            detour_text: "text".to_string(),
        }),
        Step::Event(DetourEvent::PlaceWaypoint {
            location: ShapePoint::new(f64::NAN, 0.0),
        }),
        Step::Event(DetourEvent::PlaceWaypointOnRoute {
            location: ShapePoint::new(0.0, f64::NEG_INFINITY),
        }),
        Step::Debounce,
        Step::Load,
        Step::LoadEmpty,
        Step::LoadForeign,
        Step::Fail,
    ]
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => prop::sample::select(fixed_steps()),
        1 => location().prop_map(|location| Step::Event(DetourEvent::PlaceWaypoint { location })),
        1 => location()
            .prop_map(|location| Step::Event(DetourEvent::PlaceWaypointOnRoute { location })),
    ]
}

fn input() -> impl Strategy<Value = DetourInput> {
    prop_oneof![
        Just(DetourInput::Blank),
        Just(DetourInput::Route(route_66())),
        Just(DetourInput::RoutePattern {
            route: route_66(),
            route_pattern: pattern(&route_66(), "P2", DirectionId::INBOUND),
        }),
    ]
}

fn patterns_for_current_route(machine: &DetourMachine) -> Vec<RoutePattern> {
    machine
        .context()
        .route
        .as_ref()
        .map(outbound_then_inbound)
        .unwrap_or_default()
}

fn apply(machine: &mut DetourMachine, step: &Step) -> Outcome {
    let ticket = machine.ticket();
    match step {
        Step::Event(event) => machine.send(event.clone()),
        Step::Debounce => machine.send(MachineEvent::LookupDebounceElapsed { ticket }),
        Step::Load => {
            let route_patterns = patterns_for_current_route(machine);
            machine.send(MachineEvent::RoutePatternsLoaded {
                ticket,
                route_patterns,
            })
        }
        Step::LoadEmpty => machine.send(MachineEvent::RoutePatternsLoaded {
            ticket,
            route_patterns: Vec::new(),
        }),
        Step::LoadForeign => machine.send(MachineEvent::RoutePatternsLoaded {
            ticket,
            route_patterns: vec![pattern(&route_39(), "39-1", DirectionId::INBOUND)],
        }),
        Step::Fail => machine.send(MachineEvent::RoutePatternsFailed {
            ticket,
            reason: LookupError::Service("unavailable".to_string()),
        }),
    }
}

proptest! {
    #[test]
    fn prop_undo_floor(placed in 0usize..10, undos in 0usize..30) {
        let mut machine = placing_machine(&waypoints(placed));
        for _ in 0..undos {
            machine.send(DetourEvent::Undo);
        }

        if undos <= placed {
            prop_assert_eq!(machine.state(), PLACE_WAYPOINT);
            prop_assert_eq!(machine.context().waypoints.len(), placed - undos);
            prop_assert!(machine.context().start_point.is_some());
        } else {
            prop_assert_eq!(machine.state(), PICK_START);
            prop_assert!(machine.context().waypoints.is_empty());
            prop_assert!(machine.context().start_point.is_none());
        }
    }

    #[test]
    fn prop_reachable_states_are_consistent(
        input in input(),
        steps in prop::collection::vec(step(), 0..40),
    ) {
        let (mut machine, _) = DetourMachine::new(input);
        for step in &steps {
            apply(&mut machine, step);
            prop_assert!(
                machine.snapshot().resolve_state().is_ok(),
                "inconsistent after {:?}: {:?}",
                step,
                machine
            );
        }
    }

    #[test]
    fn prop_snapshot_round_trip_preserves_behavior(
        input in input(),
        prefix in prop::collection::vec(step(), 0..25),
        suffix in prop::collection::vec(step(), 0..25),
    ) {
        let (mut original, _) = DetourMachine::new(input);
        for step in &prefix {
            apply(&mut original, step);
        }

        let value = original.snapshot().to_value().unwrap();
        let snapshot = DetourSnapshot::validate(&value).unwrap();
        let mut restored = DetourMachine::restore(snapshot).unwrap();
        prop_assert_eq!(&restored, &original);

        for step in &suffix {
            let expected = apply(&mut original, step);
            let actual = apply(&mut restored, step);
            prop_assert_eq!(actual, expected);
            prop_assert_eq!(&restored, &original);
        }
    }
}
