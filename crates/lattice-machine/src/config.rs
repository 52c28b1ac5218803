//! Grid configuration.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default bound on the number of casings one controller may drive.
pub const MAX_CASINGS: usize = 8;

/// Default edge length of a loading chunk, in cells.
pub const CHUNK_SIZE: u32 = 16;

/// Default number of undrained events a world keeps.
pub const EVENT_CAPACITY: usize = 65_536;

/// Tunables shared by every controller of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Largest cluster a controller adopts.
    pub max_casings: usize,
    /// Edge length of a loading chunk.
    pub chunk_size: u32,
    /// Undrained events kept before the oldest are discarded.
    pub event_capacity: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            max_casings: MAX_CASINGS,
            chunk_size: CHUNK_SIZE,
            event_capacity: EVENT_CAPACITY,
        }
    }
}

impl GridConfig {
    /// Create config from environment variables with sensible defaults.
    ///
    /// Reads `LATTICE_MAX_CASINGS`, `LATTICE_CHUNK_SIZE` and
    /// `LATTICE_EVENT_CAPACITY`. Unparseable or
    /// non-positive values are ignored with a warning.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_casings: env_positive("LATTICE_MAX_CASINGS").unwrap_or(defaults.max_casings),
            chunk_size: env_positive("LATTICE_CHUNK_SIZE").unwrap_or(defaults.chunk_size),
            event_capacity: env_positive("LATTICE_EVENT_CAPACITY")
                .unwrap_or(defaults.event_capacity),
        }
    }

    pub fn with_max_casings(mut self, max_casings: usize) -> Self {
        self.max_casings = max_casings;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u32) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_event_capacity(mut self, event_capacity: usize) -> Self {
        self.event_capacity = event_capacity.max(1);
        self
    }
}

fn env_positive<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Some(value),
        _ => {
            warn!(key, value = %raw, "ignoring invalid configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GridConfig::default();
        assert_eq!(config.max_casings, 8);
        assert_eq!(config.chunk_size, 16);
        assert_eq!(config.event_capacity, EVENT_CAPACITY);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: GridConfig = serde_json::from_str(r#"{"max_casings": 3}"#).unwrap();
        assert_eq!(config, GridConfig::default().with_max_casings(3));
    }

    #[test]
    fn chunk_size_is_at_least_one() {
        assert_eq!(GridConfig::default().with_chunk_size(0).chunk_size, 1);
    }

    #[test]
    fn env_values_are_validated() {
        std::env::set_var("LATTICE_TEST_GOOD", "12");
        std::env::set_var("LATTICE_TEST_ZERO", "0");
        std::env::set_var("LATTICE_TEST_JUNK", "many");

        assert_eq!(env_positive::<usize>("LATTICE_TEST_GOOD"), Some(12));
        assert_eq!(env_positive::<usize>("LATTICE_TEST_ZERO"), None);
        assert_eq!(env_positive::<i32>("LATTICE_TEST_JUNK"), None);
        assert_eq!(env_positive::<i32>("LATTICE_TEST_UNSET"), None);
    }
}
