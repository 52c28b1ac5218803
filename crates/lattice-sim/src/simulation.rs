//! Running a grid and recording what happens.

use std::collections::BTreeMap;

use lattice_machine::{
    Casing, ComputeModule, ControllerState, GridEvent, Node, NodeKey, Reading, Recorded,
    TickReport, World, WorldSnapshot,
};
use lattice_topology::{Face, HexCoord};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::scenario::Scenario;

/// A controller as seen in a [`GridSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerView {
    pub pos: HexCoord,
    pub state: ControllerState,
    pub casings: Vec<HexCoord>,
    pub ticks: u64,
    pub scans: u64,
}

/// A casing as seen in a [`GridSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasingView {
    pub pos: HexCoord,
    pub enabled: bool,
    pub controller: Option<HexCoord>,
    pub links: Vec<Face>,
    pub modules: BTreeMap<Face, ComputeModule>,
}

/// The grid at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub frame: u64,
    pub controllers: Vec<ControllerView>,
    pub casings: Vec<CasingView>,
    pub running_clusters: usize,
    pub enabled_casings: usize,
}

/// Totals over a [`Simulation::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub frame: u64,
    pub forwarded: usize,
    pub faults: usize,
    pub events: usize,
}

/// Everything one probe has recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeLog {
    pub pos: HexCoord,
    pub face: Face,
    pub readings: Vec<Reading>,
}

/// Drives a [`World`] and keeps its event timeline.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    timeline: Vec<Recorded>,
}

impl Simulation {
    pub fn new(mut world: World) -> Self {
        let timeline = world.take_events();
        Self { world, timeline }
    }

    pub fn from_scenario(scenario: &Scenario) -> Result<Self> {
        Ok(Self::new(scenario.build()?))
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access for placing and removing nodes between ticks.
    ///
    /// Events produced through this handle join the timeline on the next
    /// [`Simulation::step`].
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Advance the grid by one frame.
    pub fn step(&mut self) -> TickReport {
        self.absorb_events();
        let report = self.world.tick();
        for fault in &report.faults {
            warn!(pos = %fault.pos, face = %fault.face, error = %fault.error, "module fault");
        }
        self.absorb_events();
        report
    }

    pub fn run(&mut self, ticks: u64) -> RunSummary {
        let events_before = self.timeline.len();
        let mut summary = RunSummary::default();

        for _ in 0..ticks {
            let report = self.step();
            summary.forwarded += report.forwarded;
            summary.faults += report.faults.len();
        }

        summary.ticks = ticks;
        summary.frame = self.world.frame();
        summary.events = self.timeline.len() - events_before;
        info!(
            ticks,
            forwarded = summary.forwarded,
            faults = summary.faults,
            "simulation run complete"
        );
        summary
    }

    fn absorb_events(&mut self) {
        self.timeline.extend(self.world.take_events());
    }

    /// Every event recorded so far, in order.
    pub fn timeline(&self) -> &[Recorded] {
        &self.timeline
    }

    /// Events recorded during one frame.
    pub fn events_at(&self, frame: u64) -> impl Iterator<Item = &GridEvent> + '_ {
        self.timeline
            .iter()
            .filter(move |r| r.frame == frame)
            .map(|r| &r.event)
    }

    pub fn snapshot(&self) -> GridSnapshot {
        let world = &self.world;
        let pos_of = |key: NodeKey| world.node(key).map(Node::pos);

        let mut snapshot = GridSnapshot {
            frame: world.frame(),
            ..GridSnapshot::default()
        };

        for pos in world.positions() {
            match world.node_at(pos) {
                Some(Node::Controller(controller)) => {
                    let mut casings: Vec<HexCoord> =
                        controller.cluster().iter().filter_map(|k| pos_of(*k)).collect();
                    casings.sort();
                    if controller.is_running() {
                        snapshot.running_clusters += 1;
                    }
                    snapshot.controllers.push(ControllerView {
                        pos,
                        state: controller.state(),
                        casings,
                        ticks: controller.ticks(),
                        scans: controller.scans(),
                    });
                }
                Some(Node::Casing(casing)) => {
                    let enabled = world.is_enabled(pos);
                    if enabled {
                        snapshot.enabled_casings += 1;
                    }
                    snapshot.casings.push(CasingView {
                        pos,
                        enabled,
                        controller: casing.controller().and_then(pos_of),
                        links: Face::ALL.into_iter().filter(|f| casing.is_linked(*f)).collect(),
                        modules: Face::ALL
                            .into_iter()
                            .filter_map(|f| casing.compute(f).map(|m| (f, m.clone())))
                            .collect(),
                    });
                }
                None => {}
            }
        }
        snapshot
    }

    /// Readings of every probe in the grid, by position and face.
    pub fn probe_logs(&self) -> Vec<ProbeLog> {
        let mut logs: Vec<ProbeLog> = self
            .world
            .casings()
            .flat_map(|casing: &Casing| {
                Face::ALL.into_iter().filter_map(move |face| {
                    let probe = casing.compute(face)?.as_probe()?;
                    Some(ProbeLog {
                        pos: casing.pos(),
                        face,
                        readings: probe.readings.clone(),
                    })
                })
            })
            .collect();
        logs.sort_by_key(|log| (log.pos, log.face));
        logs
    }

    /// Persistable state of the whole grid.
    pub fn save(&self) -> Result<WorldSnapshot> {
        Ok(self.world.snapshot()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_machine::{Emitter, GridConfig, ScanFailure};

    fn pair() -> Simulation {
        let mut world = World::new(GridConfig::default());
        world.place_controller(HexCoord::ORIGIN).unwrap();
        world.place_casing(HexCoord::new(1, 0, 0)).unwrap();
        world.place_casing(HexCoord::new(2, 0, 0)).unwrap();
        world
            .set_module(HexCoord::new(2, 0, 0), Face::NorthEast, Some(Emitter::new(Face::West).into()))
            .unwrap();
        world
            .set_module(HexCoord::new(1, 0, 0), Face::NorthEast, Some(lattice_machine::Probe::new().into()))
            .unwrap();
        Simulation::new(world)
    }

    #[test]
    fn construction_events_start_the_timeline() {
        let sim = pair();
        assert!(matches!(
            sim.timeline()[0].event,
            GridEvent::NodePlaced { .. }
        ));
        assert!(sim.world().events().is_empty());
    }

    #[test]
    fn run_accumulates_totals() {
        let mut sim = pair();
        let summary = sim.run(4);
        assert_eq!(summary.ticks, 4);
        assert_eq!(summary.frame, 4);
        assert_eq!(summary.faults, 0);
        assert_eq!(summary.forwarded, 4);

        let logs = sim.probe_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].pos, HexCoord::new(1, 0, 0));
        let values: Vec<_> = logs[0].readings.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![0, 1, 2]);
    }

    #[test]
    fn snapshot_summarises_grid() {
        let mut sim = pair();
        sim.run(1);
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.frame, 1);
        assert_eq!(snapshot.running_clusters, 1);
        assert_eq!(snapshot.enabled_casings, 2);
        assert_eq!(
            snapshot.controllers[0].casings,
            vec![HexCoord::new(1, 0, 0), HexCoord::new(2, 0, 0)]
        );
        assert_eq!(snapshot.casings[0].links, vec![Face::East]);
        assert_eq!(snapshot.casings[0].controller, Some(HexCoord::ORIGIN));
        assert!(serde_json::to_string(&snapshot).is_ok());
    }

    #[test]
    fn frame_filter() {
        let mut sim = pair();
        sim.world_mut().place_controller(HexCoord::new(3, 0, 0)).unwrap();
        sim.run(1);
        assert!(sim.events_at(0).any(|e| matches!(
            e,
            GridEvent::ScanFailed { reason: ScanFailure::MultipleControllers, .. }
        )));
        assert_eq!(sim.events_at(1).count(), 0);
    }
}
