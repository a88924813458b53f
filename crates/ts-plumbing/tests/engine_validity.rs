//! Graph composition, mutation and validity tracking.

use std::collections::BTreeMap;

use ts_core::{FC_MAX, InvalidReason, TEQ_TO_FC_FACTOR, Teq};
use ts_graph::{ATM, EdgeKey};
use ts_plumbing::{
    ComponentMappings, EngineError, InitialPressures, InitialStates, NodeMapping,
    PlumbingComponent, PlumbingEngine, SolverConfig, StateTeqs,
};

fn valve(name: &str, open_teq: f64) -> PlumbingComponent {
    let states: StateTeqs = BTreeMap::from([
        (
            "open".to_string(),
            BTreeMap::from([
                ("A1".to_string(), Teq::Seconds(open_teq)),
                ("A2".to_string(), Teq::Seconds(open_teq)),
            ]),
        ),
        (
            "closed".to_string(),
            BTreeMap::from([
                ("A1".to_string(), Teq::closed()),
                ("A2".to_string(), Teq::closed()),
            ]),
        ),
    ]);
    PlumbingComponent::new(
        name,
        &states,
        &[EdgeKey::new("1", "2", "A1"), EdgeKey::new("2", "1", "A2")],
    )
}

fn map(pairs: &[(&str, &str)]) -> NodeMapping {
    pairs
        .iter()
        .map(|(l, g)| (l.to_string(), g.to_string()))
        .collect()
}

/// fill: supply <-> tank, vent: tank <-> atm
fn network() -> (
    Vec<PlumbingComponent>,
    ComponentMappings,
    InitialPressures,
    InitialStates,
) {
    let components = vec![valve("fill", 1.0), valve("vent", 0.5)];
    let mapping = ComponentMappings::from([
        ("fill".to_string(), map(&[("1", "supply"), ("2", "tank")])),
        ("vent".to_string(), map(&[("1", "tank"), ("2", ATM)])),
    ]);
    let pressures = InitialPressures::from([
        ("supply".to_string(), (500.0, true).into()),
        ("tank".to_string(), 20.0.into()),
    ]);
    let states = InitialStates::from([
        ("fill".to_string(), "closed".to_string()),
        ("vent".to_string(), "closed".to_string()),
    ]);
    (components, mapping, pressures, states)
}

fn loaded() -> PlumbingEngine {
    let (c, m, p, s) = network();
    PlumbingEngine::load(&c, &m, &p, &s)
}

#[test]
fn load_builds_namespaced_global_graph() {
    let engine = loaded();

    assert!(engine.is_valid(), "{:?}", engine.errors());
    assert_eq!(engine.nodes().count(), 3);
    assert_eq!(engine.edges().count(), 4);
    let keys: Vec<&str> = engine.edges().map(|(k, _)| k.key.as_str()).collect();
    assert!(keys.contains(&"fill.A1"));
    assert!(keys.contains(&"vent.A2"));
    assert!(engine.edges().all(|(_, fc)| fc == 0.0));

    assert_eq!(engine.pressure("supply").unwrap(), 500.0);
    assert_eq!(engine.pressure(ATM).unwrap(), 0.0);
    assert_eq!(engine.current_state("vent"), Some("closed"));
}

#[test]
fn time_resolution_tracks_fastest_finite_teq() {
    let engine = loaded();
    // vent opens with teq 0.5 s; 0.5 s / 20 = 25 ms
    assert_eq!(engine.time_resolution(), 25_000);
}

#[test]
fn fully_open_edges_do_not_set_time_resolution() {
    let (_, m, p, s) = network();
    let components = vec![valve("fill", 0.0), valve("vent", 2.0)];
    let engine = PlumbingEngine::load(&components, &m, &p, &s);
    assert_eq!(engine.time_resolution(), 100_000);
}

#[test]
fn loading_leaves_inputs_untouched() {
    let (c, m, p, s) = network();
    let (c0, m0, p0, s0) = (c.clone(), m.clone(), p.clone(), s.clone());

    let mut first = PlumbingEngine::load(&c, &m, &p, &s);
    let second = PlumbingEngine::load(&c, &m, &p, &s);
    first.set_component_state("vent", "open").unwrap();
    first.remove_component("fill").unwrap();

    assert_eq!(m, m0);
    assert_eq!(p, p0);
    assert_eq!(s, s0);
    for (now, before) in c.iter().zip(&c0) {
        assert_eq!(now.current_state(), before.current_state());
    }
    assert_eq!(second.current_state("vent"), Some("closed"));
    assert!(second.mapping("fill").is_some());
}

#[test]
fn missing_mapping_skips_component() {
    let (c, mut m, p, s) = network();
    m.remove("vent");
    let engine = PlumbingEngine::load(&c, &m, &p, &s);

    assert!(!engine.is_valid());
    assert!(engine.component("vent").is_none());
    assert!(engine.errors().contains(&InvalidReason::InvalidComponentName {
        message: "component vent not found in mapping".to_string(),
        component: "vent".to_string(),
    }));
    assert!(matches!(
        engine.clone().step(1_000),
        Err(EngineError::InvalidEngine { .. })
    ));
}

#[test]
fn unmapped_node_drops_edges_but_keeps_component() {
    let (c, mut m, p, s) = network();
    m.insert("vent".to_string(), map(&[("1", "tank")]));
    let engine = PlumbingEngine::load(&c, &m, &p, &s);

    assert!(engine.component("vent").is_some());
    assert_eq!(engine.edges().count(), 2);
    let originals: Vec<_> = engine.errors().iter().filter(|r| !r.is_duplicate()).collect();
    assert_eq!(originals.len(), 1);
    assert!(matches!(
        originals[0],
        InvalidReason::InvalidComponentNode { component, node, .. }
            if component == "vent" && node == "2"
    ));
}

#[test]
fn repeated_error_stored_as_single_duplicate() {
    let (c, m, mut p, s) = network();
    p.insert("ghost".to_string(), 1.0.into());
    let mut engine = PlumbingEngine::load(&c, &m, &p, &s);
    assert_eq!(engine.errors().len(), 1);

    engine.load_graph(&c, &m, &p, &s);
    assert_eq!(engine.errors().len(), 1);

    let reason = engine.errors().iter().next().unwrap().clone();
    let mut twice = engine.errors().clone();
    twice.insert(reason.clone());
    twice.insert(reason.clone());
    assert_eq!(twice.len(), 2);
    assert_eq!(twice.iter().filter(|r| r.is_duplicate()).count(), 1);
}

#[test]
fn bad_initial_values_are_structural() {
    let (c, m, mut p, mut s) = network();
    p.insert("tank".to_string(), (-5.0).into());
    s.insert("fill".to_string(), "ajar".to_string());
    s.remove("vent");
    let engine = PlumbingEngine::load(&c, &m, &p, &s);

    let kinds: Vec<&str> = engine
        .errors()
        .iter()
        .map(|r| match r {
            InvalidReason::InvalidNodePressure { .. } => "pressure",
            InvalidReason::InvalidStateName { .. } => "state",
            InvalidReason::InvalidComponentName { .. } => "name",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["pressure", "state", "name"]);
}

#[test]
fn set_component_state_rewrites_edges() {
    let mut engine = loaded();
    engine.set_component_state("vent", "open").unwrap();

    let fc = engine
        .edges()
        .find(|(k, _)| k.key == "vent.A1")
        .map(|(_, fc)| fc)
        .unwrap();
    assert_eq!(fc, TEQ_TO_FC_FACTOR / 0.5);
    assert_eq!(engine.current_states().get("vent"), Some(&"open"));
}

#[test]
fn set_component_state_rejects_unknown_names() {
    let mut engine = loaded();
    assert!(matches!(
        engine.set_component_state("nope", "open"),
        Err(EngineError::BadInput { .. })
    ));
    assert!(matches!(
        engine.set_component_state("vent", "ajar"),
        Err(EngineError::BadInput { .. })
    ));
    assert!(engine.is_valid());
}

#[test]
fn add_then_remove_component_restores_graph() {
    let mut engine = loaded();
    let purge = valve("purge", 0.1);
    let mapping = map(&[("1", "tank"), ("2", "purge_line")]);
    let pressures = InitialPressures::from([("purge_line".to_string(), 3.0.into())]);

    engine
        .add_component(&purge, &mapping, "open", &pressures)
        .unwrap();
    assert_eq!(engine.nodes().count(), 4);
    assert_eq!(engine.pressure("purge_line").unwrap(), 3.0);
    assert_eq!(engine.time_resolution(), 5_000);

    engine.remove_component("purge").unwrap();
    assert_eq!(engine.nodes().count(), 3);
    assert!(engine.pressure("purge_line").is_err());
    assert_eq!(engine.pressure("tank").unwrap(), 20.0);
    assert_eq!(engine.time_resolution(), 25_000);
}

#[test]
fn add_component_rejects_duplicates_and_unknown_state() {
    let mut engine = loaded();
    let none = InitialPressures::new();
    assert!(
        engine
            .add_component(&valve("vent", 1.0), &map(&[("1", "x"), ("2", "y")]), "open", &none)
            .is_err()
    );
    assert!(
        engine
            .add_component(&valve("new", 1.0), &map(&[("1", "x"), ("2", "y")]), "ajar", &none)
            .is_err()
    );
    assert!(engine.component("new").is_none());
}

#[test]
fn remove_component_purges_its_errors_and_duplicates() {
    let (c, mut m, p, s) = network();
    m.insert("vent".to_string(), map(&[("1", "tank")]));
    let mut engine = PlumbingEngine::load(&c, &m, &p, &s);
    assert!(!engine.is_valid());
    assert!(engine.errors().iter().any(|r| r.is_duplicate()));

    engine.remove_component("vent").unwrap();
    assert!(engine.is_valid(), "{:?}", engine.errors());
    assert!(engine.step(1_000).is_ok());
}

#[test]
fn set_pressure_contract() {
    let mut engine = loaded();
    engine.set_pressure("tank", 42.0).unwrap();
    assert_eq!(engine.pressure("tank").unwrap(), 42.0);

    for (node, value) in [("tank", -1.0), ("tank", f64::NAN), ("nowhere", 1.0), (ATM, 1.0)] {
        assert!(
            matches!(engine.set_pressure(node, value), Err(EngineError::BadInput { .. })),
            "{node} {value}"
        );
    }
}

#[test]
fn set_teq_updates_current_state_immediately() {
    let mut engine = loaded();
    engine.set_component_state("fill", "open").unwrap();

    let change = StateTeqs::from([(
        "open".to_string(),
        BTreeMap::from([("A1".to_string(), Teq::Seconds(0.1))]),
    )]);
    engine.set_teq("fill", &change).unwrap();

    let key = EdgeKey::new("supply", "tank", "fill.A1");
    assert_eq!(engine.edge_teq(&key), Some(Teq::Seconds(0.1)));
    assert_eq!(engine.time_resolution(), 5_000);
}

#[test]
fn set_teq_validates_before_writing() {
    let mut engine = loaded();
    let bad = StateTeqs::from([(
        "open".to_string(),
        BTreeMap::from([
            ("A1".to_string(), Teq::Seconds(3.0)),
            ("A2".to_string(), Teq::Seconds(1e-7)),
        ]),
    )]);
    assert!(matches!(
        engine.set_teq("fill", &bad),
        Err(EngineError::BadInput { .. })
    ));
    assert_eq!(
        engine.component("fill").unwrap().fc("open", "A1"),
        Some(TEQ_TO_FC_FACTOR)
    );

    let unknown_edge = StateTeqs::from([(
        "open".to_string(),
        BTreeMap::from([("Z9".to_string(), Teq::Seconds(3.0))]),
    )]);
    assert!(engine.set_teq("fill", &unknown_edge).is_err());

    let open = StateTeqs::from([(
        "open".to_string(),
        BTreeMap::from([("A1".to_string(), Teq::Seconds(0.0))]),
    )]);
    engine.set_teq("fill", &open).unwrap();
    assert_eq!(engine.component("fill").unwrap().fc("open", "A1"), Some(FC_MAX));
}

#[test]
fn reverse_orientation_swaps_edge_conductance() {
    let check_states: StateTeqs = BTreeMap::from([(
        "flow".to_string(),
        BTreeMap::from([("A1".to_string(), Teq::Seconds(1.0))]),
    )]);
    let check = PlumbingComponent::new(
        "check",
        &check_states,
        &[EdgeKey::new("1", "2", "A1"), EdgeKey::new("2", "1", "A2")],
    );
    let mut engine = loaded();
    engine
        .add_component(&check, &map(&[("1", "tank"), ("2", "line")]), "flow", &InitialPressures::new())
        .unwrap();

    engine.reverse_orientation("check").unwrap();
    let fc = |engine: &PlumbingEngine, k: &str| {
        engine.edges().find(|(e, _)| e.key == k).map(|(_, fc)| fc).unwrap()
    };
    assert_eq!(fc(&engine, "check.A1"), 0.0);
    assert_eq!(fc(&engine, "check.A2"), TEQ_TO_FC_FACTOR);

    // stays reversed across state changes
    engine.set_component_state("check", "flow").unwrap();
    assert_eq!(fc(&engine, "check.A2"), TEQ_TO_FC_FACTOR);
}

#[test]
fn reverse_orientation_needs_two_edges() {
    let tee_states: StateTeqs = BTreeMap::from([("open".to_string(), BTreeMap::new())]);
    let tee = PlumbingComponent::new(
        "tee",
        &tee_states,
        &[
            EdgeKey::new("1", "2", "A"),
            EdgeKey::new("1", "3", "B"),
            EdgeKey::new("2", "3", "C"),
        ],
    );
    let mut engine = loaded();
    engine
        .add_component(
            &tee,
            &map(&[("1", "tank"), ("2", "t2"), ("3", "t3")]),
            "open",
            &InitialPressures::new(),
        )
        .unwrap();
    assert!(matches!(
        engine.reverse_orientation("tee"),
        Err(EngineError::BadOrientation { .. })
    ));
    assert!(matches!(
        engine.reverse_orientation("nope"),
        Err(EngineError::BadInput { .. })
    ));
}

#[test]
fn repeated_component_name_is_structural() {
    let (mut c, m, p, s) = network();
    let states: StateTeqs = BTreeMap::from([(
        "open".to_string(),
        BTreeMap::from([("B1".to_string(), Teq::Seconds(1.0))]),
    )]);
    c.push(PlumbingComponent::new(
        "vent",
        &states,
        &[EdgeKey::new("1", "2", "B1")],
    ));
    let engine = PlumbingEngine::load(&c, &m, &p, &s);

    assert!(!engine.is_valid());
    assert!(engine.errors().contains(&InvalidReason::InvalidComponentName {
        message: "component vent is listed more than once".to_string(),
        component: "vent".to_string(),
    }));
    // The first definition wins and none of the second's edges are placed.
    assert_eq!(engine.component("vent").unwrap().edge_count(), 2);
    assert!(engine.edges().all(|(key, _)| key.key != "vent.B1"));
    assert_eq!(engine.edges().count(), 4);
}

#[test]
fn slow_network_time_resolution_is_bounded() {
    let (mut c, m, p, s) = network();
    c[0] = valve("fill", 1e15);
    c[1] = valve("vent", 1e15);
    let mut engine = PlumbingEngine::load(&c, &m, &p, &s);
    assert!(engine.is_valid(), "{:?}", engine.errors());
    assert_eq!(
        engine.time_resolution(),
        engine.config().max_time_resolution
    );

    engine.step(engine.time_resolution()).unwrap();
    engine.step(engine.time_resolution()).unwrap();
    assert_eq!(engine.time(), 2 * engine.config().max_time_resolution);
}

#[test]
fn clock_overflow_is_rejected_without_stepping() {
    let mut engine = loaded();
    engine.step(u64::MAX).unwrap();
    let before = engine.current_pressures();

    assert!(matches!(engine.step(1), Err(EngineError::BadInput { .. })));
    assert_eq!(engine.time(), u64::MAX);
    assert_eq!(engine.current_pressures(), before);
}

#[test]
fn with_config_rejects_invalid_settings() {
    let config = SolverConfig {
        time_resolution_scale: 0.0,
        ..SolverConfig::default()
    };
    assert!(matches!(
        PlumbingEngine::with_config(config),
        Err(EngineError::BadInput { .. })
    ));
}
