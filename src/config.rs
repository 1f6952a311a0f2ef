use anyhow::Result;
use figment::{providers::{Env, Format, Serialized, Toml}, Figment};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub input: InputConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Trace every assignment at debug level
    #[serde(default)]
    pub debug: bool,
    /// Default floor (kW) for devices that do not set one
    #[serde(default)]
    pub floor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub topology_path: PathBuf,
    pub snapshot_path: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            topology_path: PathBuf::from("config/topology.toml"),
            snapshot_path: PathBuf::from("config/snapshot.json"),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from("config/default.toml")
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("PFS__").split("__"));
        Ok(figment.extract()?)
    }
}
