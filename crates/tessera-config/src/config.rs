//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// World generation and streaming.
    pub terrain: TerrainConfig,
    /// Board render squares.
    pub board: BoardConfig,
    /// Scripted viewpoint walk.
    pub walk: WalkConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// World generation and streaming settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// World seed.
    pub seed: u64,
    /// Tiles per chunk edge.
    pub tile_unit_size: u32,
    /// World units per tile.
    pub square_size: f64,
    /// Chunks generated in each direction around the viewpoint.
    pub visible_range: u32,
    /// Extra chunks kept beyond `visible_range` before eviction.
    pub eviction_margin: u32,
    /// Category reported for tiles that are not loaded (e.g. "grass").
    pub default_category: String,
    /// Solver undo budget per chunk (0 = fail on first contradiction).
    pub max_backtracks: u32,
}

/// Board settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BoardConfig {
    /// Vertex grid subdivisions per square edge.
    pub segments: u32,
}

/// Viewpoint walk driven by the demo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WalkConfig {
    /// Starting world position.
    pub start_x: f64,
    pub start_z: f64,
    /// World units moved per step.
    pub step_x: f64,
    pub step_z: f64,
    /// Number of steps.
    pub steps: u32,
    /// Solve chunks on background threads instead of inline.
    pub async_generation: bool,
    /// Async solver threads (0 = one per spare CPU core).
    pub async_workers: usize,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Print an ASCII map around the viewpoint after the walk.
    pub print_map: bool,
    /// Tiles shown in each direction on the ASCII map.
    pub map_radius: u32,
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            tile_unit_size: 8,
            square_size: 1.0,
            visible_range: 2,
            eviction_margin: 1,
            default_category: "grass".to_string(),
            max_backtracks: 256,
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self { segments: 4 }
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            start_x: 0.0,
            start_z: 0.0,
            step_x: 2.0,
            step_z: 1.0,
            steps: 32,
            async_generation: false,
            async_workers: 0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            print_map: true,
            map_radius: 12,
            log_level: "info".to_string(),
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = Self::read(config_dir)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::WriteError {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::WriteError {
            path: config_path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(config_dir)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Rejects values the terrain streamer cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let terrain = &self.terrain;
        if terrain.tile_unit_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "terrain.tile_unit_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if !terrain.square_size.is_finite() || terrain.square_size <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "terrain.square_size",
                reason: format!("must be positive, got {}", terrain.square_size),
            });
        }
        if self.board.segments == 0 {
            return Err(ConfigError::InvalidValue {
                field: "board.segments",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    fn read(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        let contents =
            std::fs::read_to_string(&config_path).map_err(|source| ConfigError::ReadError {
                path: config_path.clone(),
                source,
            })?;
        ron::from_str(&contents).map_err(ConfigError::ParseError)
    }
}
