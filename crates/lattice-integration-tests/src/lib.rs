//! Shared fixtures for the end-to-end tests under `tests/`.

use std::cell::RefCell;
use std::rc::Rc;

use lattice_machine::{
    ComputeModule, Face, GridConfig, GridEvent, HexCoord, Value, World, WorldObserver,
};

/// A controller at the origin.
pub const CONTROLLER: HexCoord = HexCoord::ORIGIN;

/// Place `len` casings starting next to `from`, walking towards `face`.
pub fn place_line(world: &mut World, from: HexCoord, face: Face, len: usize) -> Vec<HexCoord> {
    let mut pos = from;
    (0..len)
        .map(|_| {
            pos = pos.step(face);
            world
                .place_casing(pos)
                .unwrap_or_else(|e| panic!("placing casing at {pos}: {e}"));
            pos
        })
        .collect()
}

/// A controller at the origin with `len` casings in a line towards East.
pub fn controlled_line(len: usize, max_casings: usize) -> (World, Vec<HexCoord>) {
    let mut world = World::new(GridConfig::default().with_max_casings(max_casings));
    world
        .place_controller(CONTROLLER)
        .unwrap_or_else(|e| panic!("placing controller: {e}"));
    let casings = place_line(&mut world, CONTROLLER, Face::East, len);
    (world, casings)
}

/// Install a module, panicking with context on failure.
pub fn install(world: &mut World, pos: HexCoord, face: Face, module: impl Into<ComputeModule>) {
    world
        .set_module(pos, face, Some(module.into()))
        .unwrap_or_else(|e| panic!("installing module on {face} of {pos}: {e}"));
}

/// `(tick, value)` pairs recorded by the probe on `face` of the casing at `pos`.
pub fn probe_log(world: &World, pos: HexCoord, face: Face) -> Vec<(u64, Value)> {
    world
        .casing(pos)
        .and_then(|c| c.compute(face))
        .and_then(ComputeModule::as_probe)
        .map(|p| p.readings.iter().map(|r| (r.tick, r.value)).collect())
        .unwrap_or_default()
}

/// Number of recorded events matching `pred`.
pub fn count_events(world: &World, pred: impl Fn(&GridEvent) -> bool) -> usize {
    world.events().iter().filter(|r| pred(&r.event)).count()
}

/// What an [`ObserverLog`] saw.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Observed {
    pub enabled: Vec<(HexCoord, bool)>,
    pub dropped: Vec<(HexCoord, Face, ComputeModule)>,
    pub events: usize,
}

/// Observer writing into a shared [`Observed`].
#[derive(Debug, Default, Clone)]
pub struct ObserverLog(pub Rc<RefCell<Observed>>);

impl ObserverLog {
    pub fn attach(world: &mut World) -> Rc<RefCell<Observed>> {
        let log = ObserverLog::default();
        let shared = log.0.clone();
        world.add_observer(log);
        shared
    }
}

impl WorldObserver for ObserverLog {
    fn on_enabled_changed(&mut self, controller: HexCoord, enabled: bool) {
        self.0.borrow_mut().enabled.push((controller, enabled));
    }

    fn on_module_dropped(&mut self, pos: HexCoord, face: Face, module: &ComputeModule) {
        self.0.borrow_mut().dropped.push((pos, face, module.clone()));
    }

    fn on_event(&mut self, _event: &lattice_machine::Recorded) {
        self.0.borrow_mut().events += 1;
    }
}
