//! Scenario files.
//!
//! A scenario describes an initial grid as JSON: the configuration, where
//! controllers and casings sit, which modules the casings carry, and which
//! chunks start unloaded.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use lattice_machine::{ComputeModule, GridConfig, World};
use lattice_topology::{ChunkCoord, Face, HexCoord};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

fn default_ticks() -> u64 {
    16
}

fn default_enabled() -> bool {
    true
}

/// A controller to place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerSpec {
    pub at: HexCoord,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// A casing to place, with the modules installed on its faces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasingSpec {
    pub at: HexCoord,
    #[serde(default)]
    pub modules: BTreeMap<Face, ComputeModule>,
}

/// Initial grid layout plus how long to run it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub config: GridConfig,
    #[serde(default)]
    pub controllers: Vec<ControllerSpec>,
    #[serde(default)]
    pub casings: Vec<CasingSpec>,
    #[serde(default)]
    pub unloaded_chunks: Vec<ChunkCoord>,
    #[serde(default = "default_ticks")]
    pub ticks: u64,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: None,
            config: GridConfig::default(),
            controllers: Vec::new(),
            casings: Vec::new(),
            unloaded_chunks: Vec::new(),
            ticks: default_ticks(),
        }
    }
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Build the grid this scenario describes.
    ///
    /// Nodes are placed before modules are installed, so a module on a face
    /// that ends up linked or obstructed is rejected.
    pub fn build(&self) -> Result<World> {
        let mut seen = HashSet::new();
        let positions = self
            .controllers
            .iter()
            .map(|c| c.at)
            .chain(self.casings.iter().map(|c| c.at));
        for pos in positions {
            if !seen.insert(pos) {
                return Err(Error::DuplicatePosition(pos));
            }
        }

        let mut world = World::new(self.config);
        for controller in &self.controllers {
            world.place_controller(controller.at)?;
        }
        for casing in &self.casings {
            world.place_casing(casing.at)?;
        }
        for casing in &self.casings {
            for (face, module) in &casing.modules {
                world.set_module(casing.at, *face, Some(module.clone()))?;
            }
        }
        for controller in self.controllers.iter().filter(|c| !c.enabled) {
            world.request_disable(controller.at)?;
        }
        for chunk in &self.unloaded_chunks {
            world.set_region_loaded(*chunk, false);
        }

        info!(
            scenario = self.name.as_deref().unwrap_or("unnamed"),
            controllers = self.controllers.len(),
            casings = self.casings.len(),
            "scenario built"
        );
        Ok(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_machine::ControllerState;

    const LINE: &str = r#"{
        "name": "pair",
        "controllers": [{ "at": { "q": 0, "r": 0, "z": 0 } }],
        "casings": [
            { "at": { "q": 1, "r": 0, "z": 0 },
              "modules": { "up": { "kind": "probe" } } },
            { "at": { "q": 2, "r": 0, "z": 0 } }
        ]
    }"#;

    #[test]
    fn parses_with_defaults() {
        let scenario = Scenario::from_json(LINE).unwrap();
        assert_eq!(scenario.ticks, 16);
        assert_eq!(scenario.config, GridConfig::default());
        assert!(scenario.controllers[0].enabled);
        assert_eq!(scenario.casings[0].modules.len(), 1);
        assert!(scenario.casings[1].modules.is_empty());
    }

    #[test]
    fn builds_world() {
        let mut world = Scenario::from_json(LINE).unwrap().build().unwrap();
        assert_eq!(world.len(), 3);
        world.tick();
        assert_eq!(
            world.controller(HexCoord::ORIGIN).unwrap().state(),
            ControllerState::Running
        );
    }

    #[test]
    fn duplicate_positions_are_rejected() {
        let scenario = Scenario {
            controllers: vec![ControllerSpec {
                at: HexCoord::ORIGIN,
                enabled: true,
            }],
            casings: vec![CasingSpec {
                at: HexCoord::ORIGIN,
                modules: BTreeMap::new(),
            }],
            ..Scenario::default()
        };
        assert!(matches!(scenario.build(), Err(Error::DuplicatePosition(_))));
    }

    #[test]
    fn module_on_linked_face_is_an_error() {
        let mut scenario = Scenario::from_json(LINE).unwrap();
        scenario.casings[0]
            .modules
            .insert(Face::East, ComputeModule::from(lattice_machine::Probe::new()));
        assert!(matches!(
            scenario.build(),
            Err(Error::Machine(lattice_machine::Error::SlotOccupiedByLink { .. }))
        ));
    }

    #[test]
    fn disabled_controller_stays_off() {
        let mut scenario = Scenario::from_json(LINE).unwrap();
        scenario.controllers[0].enabled = false;
        let mut world = scenario.build().unwrap();
        world.tick();
        assert_eq!(
            world.controller(HexCoord::ORIGIN).unwrap().state(),
            ControllerState::Disabled
        );
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Scenario::load("/nonexistent/scenario.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/scenario.json"));
    }
}
