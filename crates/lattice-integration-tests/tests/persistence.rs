//! Saving a running grid and picking it up again.

use lattice_integration_tests::{install, place_line, CONTROLLER};
use lattice_machine::{
    ChunkCoord, ComputeModule, ControllerState, Face, GridConfig, HexCoord, Probe, World,
    WorldSnapshot,
};
use lattice_sim::{Scenario, Simulation};

fn line_simulation() -> (Scenario, Simulation) {
    let scenario = Scenario::from_json(include_str!("../../lattice-sim/scenarios/line.json")).unwrap();
    let sim = Simulation::from_scenario(&scenario).unwrap();
    (scenario, sim)
}

fn probe_values(sim: &Simulation) -> Vec<i16> {
    sim.probe_logs()
        .into_iter()
        .flat_map(|log| log.readings)
        .map(|r| r.value)
        .collect()
}

fn through_json(snapshot: &WorldSnapshot) -> WorldSnapshot {
    let json = serde_json::to_string_pretty(snapshot).unwrap();
    serde_json::from_str(&json).unwrap()
}

#[test]
fn restored_grid_keeps_module_state() {
    let (_, mut sim) = line_simulation();
    sim.run(6);

    let saved = through_json(&sim.save().unwrap());
    let restored = Simulation::new(World::restore(&saved).unwrap());

    assert_eq!(restored.world().frame(), sim.world().frame());
    assert_eq!(restored.probe_logs(), sim.probe_logs());
    let modules = |s: &Simulation| -> Vec<(HexCoord, Vec<ComputeModule>)> {
        s.snapshot()
            .casings
            .into_iter()
            .map(|c| (c.pos, c.modules.into_values().collect()))
            .collect()
    };
    assert_eq!(modules(&restored), modules(&sim));
}

#[test]
fn restored_grid_continues_the_sequence() {
    let (_, mut sim) = line_simulation();
    sim.run(6);
    let before = probe_values(&sim);
    assert!(!before.is_empty());

    let saved = through_json(&sim.save().unwrap());
    let mut restored = Simulation::new(World::restore(&saved).unwrap());
    let summary = restored.run(8);
    assert_eq!(summary.faults, 0);

    let after = probe_values(&restored);
    assert!(after.len() > before.len());
    assert_eq!(&after[..before.len()], &before[..]);
    // Values in flight at save time are gone; the rest arrive in order.
    assert!(after.windows(2).all(|w| w[0] < w[1]));
    assert!(after.iter().all(|v| (v - 100) % 10 == 0));

    let controller = restored.snapshot().controllers[0].clone();
    assert_eq!(controller.state, ControllerState::Running);
    assert_eq!(controller.casings.len(), 3);
}

#[test]
fn disabled_controllers_and_unloaded_chunks_survive() {
    let config = GridConfig::default().with_chunk_size(4);
    let mut world = World::new(config);
    world.place_controller(CONTROLLER).unwrap();
    let casings = place_line(&mut world, CONTROLLER, Face::Up, 2);
    install(&mut world, casings[1], Face::East, Probe::new());
    world.request_disable(CONTROLLER).unwrap();
    world.set_region_loaded(ChunkCoord::new(5, 5), false);

    let saved = through_json(&world.snapshot().unwrap());
    let mut restored = World::restore(&saved).unwrap();
    assert_eq!(restored.config(), &config);
    assert_eq!(restored.unloaded_chunks(), vec![ChunkCoord::new(5, 5)]);

    restored.tick();
    assert_eq!(
        restored.controller(CONTROLLER).map(|c| c.state()),
        Some(ControllerState::Disabled)
    );
    assert!(restored.cluster(CONTROLLER).unwrap().is_empty());

    restored.request_enable(CONTROLLER).unwrap();
    restored.tick();
    assert_eq!(restored.cluster(CONTROLLER).unwrap(), casings);
}

#[test]
fn saved_casing_tree_is_plain_json() {
    let (_, mut sim) = line_simulation();
    sim.run(2);
    let tree = sim.world().save_node(HexCoord::new(3, 0, 0)).unwrap();

    assert_eq!(tree["node"], "casing");
    assert_eq!(tree["enabled"], true);
    assert_eq!(tree["modules"]["north_east"]["kind"], "emitter");
    assert_eq!(tree["modules"]["north_east"]["next"], 120);
    assert_eq!(tree["controller"]["q"], 0);
}
