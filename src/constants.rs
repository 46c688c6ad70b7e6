// Chunk dimensions (overridable through WorldConfig::chunk_size)
pub const CHUNK_SIZE_I32: i32 = 16;

// Meshing
pub const VOXEL_SIZE: f32 = 1.0;
pub const DEFAULT_GRAY: u32 = 0x808080;

// Collision
pub const GROUND_PROBE: f32 = 0.05;

// Default config location, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/world.yaml";
pub const DEFAULT_SAVE_DIR: &str = "world_data";
