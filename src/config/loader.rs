use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub fn load_config<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, ConfigError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let config = serde_yaml::from_reader(reader)?;
    Ok(config)
}

/// Missing or broken config files are not fatal; defaults are used instead.
pub fn load_config_or_default<T: DeserializeOwned + Default, P: AsRef<Path>>(path: P) -> T {
    let path = path.as_ref();
    match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("using default config, could not load {}: {}", path.display(), e);
            T::default()
        }
    }
}
