pub mod loader;
pub mod settings;

pub use loader::{ConfigError, load_config, load_config_or_default};
pub use settings::{AgentSettings, GeneratorKind, StorageConfig, StorageKind, TerrainSettings, WorldConfig};
