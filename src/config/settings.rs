use crate::config::ConfigError;
use crate::constants::{CHUNK_SIZE_I32, DEFAULT_SAVE_DIR};
use crate::voxel::types::{BlockCatalog, BlockType, TerrainPalette};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level world settings, read from `config/world.yaml`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Edge length of a cubic chunk, in voxels.
    pub chunk_size: i32,
    pub generator: GeneratorKind,
    pub terrain: TerrainSettings,
    pub agent: AgentSettings,
    pub storage: StorageConfig,
    /// Replaces the built-in block catalog when present.
    pub blocks: Option<Vec<BlockType>>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE_I32,
            generator: GeneratorKind::Noise,
            terrain: TerrainSettings::default(),
            agent: AgentSettings::default(),
            storage: StorageConfig::default(),
            blocks: None,
        }
    }
}

impl WorldConfig {
    /// In-memory world without terrain, for tests and editors.
    pub fn empty() -> Self {
        Self {
            generator: GeneratorKind::Empty,
            ..Self::default()
        }
    }

    /// The configured catalog, or the built-in one.
    pub fn catalog(&self) -> BlockCatalog {
        match &self.blocks {
            Some(blocks) => BlockCatalog::new(blocks.clone()),
            None => BlockCatalog::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=256).contains(&self.chunk_size) {
            return Err(ConfigError::Invalid(format!(
                "chunk_size must be in 1..=256, got {}",
                self.chunk_size
            )));
        }
        if let Some(blocks) = &self.blocks {
            if blocks.is_empty() || blocks.len() > 256 {
                return Err(ConfigError::Invalid(format!(
                    "block catalog must hold 1..=256 entries, got {}",
                    blocks.len()
                )));
            }
        }
        if self.generator == GeneratorKind::Noise {
            TerrainPalette::resolve(&self.catalog())?;
        }
        let t = &self.terrain;
        if t.octaves == 0 {
            return Err(ConfigError::Invalid("terrain.octaves must be at least 1".into()));
        }
        if t.trunk_min > t.trunk_max {
            return Err(ConfigError::Invalid("terrain.trunk_min exceeds trunk_max".into()));
        }
        if !(0.0..=1.0).contains(&t.tree_chance) || !(0.0..=1.0).contains(&t.leaf_density) {
            return Err(ConfigError::Invalid("terrain probabilities must be within 0..=1".into()));
        }
        let a = &self.agent;
        if a.half_width <= 0.0 || a.half_height <= 0.0 {
            return Err(ConfigError::Invalid("agent half extents must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    /// Layered value-noise height field with trees.
    Noise,
    /// Chunks start with no voxels.
    Empty,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    /// Fixed seed; when absent a new one is drawn at every process start.
    pub seed: Option<u64>,
    pub octaves: u32,
    pub persistence: f32,
    pub scale: f32,
    pub amplitude: f32,
    pub min_height: i32,
    pub dirt_depth: i32,
    pub tree_chance: f32,
    pub trunk_min: i32,
    pub trunk_max: i32,
    pub leaf_radius: i32,
    pub leaf_density: f32,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            seed: None,
            octaves: 4,
            persistence: 0.5,
            scale: 0.05,
            amplitude: 10.0,
            min_height: 1,
            dirt_depth: 3,
            tree_chance: 0.02,
            trunk_min: 3,
            trunk_max: 4,
            leaf_radius: 2,
            leaf_density: 0.7,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub half_width: f32,
    pub half_height: f32,
    pub gravity: f32,
    pub jump_speed: f32,
    /// Walk speed in voxels per second, applied to the horizontal intent.
    pub move_speed: f32,
    /// Flying agents ignore gravity and move vertically on intent alone.
    pub flying: bool,
    pub spawn: [f32; 3],
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            half_width: 0.3,
            half_height: 0.9,
            gravity: 20.0,
            jump_speed: 8.0,
            move_speed: 4.0,
            flying: false,
            spawn: [0.0, 20.0, 0.0],
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Memory,
    Directory,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub kind: StorageKind,
    /// Save directory, used by `StorageKind::Directory`.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::Memory,
            path: PathBuf::from(DEFAULT_SAVE_DIR),
        }
    }
}
