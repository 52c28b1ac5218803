//! The scenarios shipped with lattice-sim.

use lattice_machine::{ControllerState, Face, GridEvent, HexCoord, ScanFailure};
use lattice_sim::{Error, Scenario, Simulation};

const LINE: &str = include_str!("../../lattice-sim/scenarios/line.json");
const RIVALS: &str = include_str!("../../lattice-sim/scenarios/rivals.json");

#[test]
fn line_scenario_relays_into_the_probe() {
    let scenario = Scenario::from_json(LINE).unwrap();
    assert_eq!(scenario.name.as_deref(), Some("line"));
    let mut sim = Simulation::from_scenario(&scenario).unwrap();
    let summary = sim.run(scenario.ticks);

    assert_eq!(summary.frame, scenario.ticks);
    assert_eq!(summary.faults, 0);
    assert!(summary.forwarded > 0);

    let logs = sim.probe_logs();
    assert_eq!(logs.len(), 1);
    assert_eq!((logs[0].pos, logs[0].face), (HexCoord::new(1, 0, 0), Face::NorthEast));
    // Emitted in frame 0, relayed in frame 1, read in frame 2.
    assert_eq!(logs[0].readings[0].tick, 2);
    assert_eq!(logs[0].readings[0].value, 100);

    let snapshot = sim.snapshot();
    assert_eq!(snapshot.running_clusters, 1);
    assert_eq!(snapshot.enabled_casings, 3);
    let middle = &snapshot.casings[1];
    assert_eq!(middle.links, vec![Face::East, Face::West]);
}

#[test]
fn rivals_scenario_settles_into_conflict() {
    let scenario = Scenario::from_json(RIVALS).unwrap();
    let mut sim = Simulation::from_scenario(&scenario).unwrap();
    sim.run(scenario.ticks);

    let snapshot = sim.snapshot();
    let states: Vec<(HexCoord, ControllerState)> =
        snapshot.controllers.iter().map(|c| (c.pos, c.state)).collect();
    assert_eq!(
        states,
        vec![
            (HexCoord::ORIGIN, ControllerState::Error(ScanFailure::MultipleControllers)),
            (HexCoord::new(0, 0, 3), ControllerState::Disabled),
            (HexCoord::new(4, 0, 0), ControllerState::Error(ScanFailure::MultipleControllers)),
        ]
    );
    assert_eq!(snapshot.enabled_casings, 0);

    // Nothing is rescheduled once both sides know about each other.
    let last = sim.world().frame() - 1;
    assert!(!sim
        .events_at(last)
        .any(|e| matches!(e, GridEvent::ScanScheduled { .. })));
}

#[test]
fn scenario_errors() {
    let duplicate = r#"{
        "controllers": [{ "at": { "q": 0, "r": 0, "z": 0 } }],
        "casings": [{ "at": { "q": 0, "r": 0, "z": 0 } }]
    }"#;
    let scenario = Scenario::from_json(duplicate).unwrap();
    assert!(matches!(
        Simulation::from_scenario(&scenario),
        Err(Error::DuplicatePosition(p)) if p == HexCoord::ORIGIN
    ));

    assert!(matches!(Scenario::from_json("{ not json"), Err(Error::Json(_))));
    assert!(matches!(Scenario::load("no/such/scenario.json"), Err(Error::Io { .. })));
}
