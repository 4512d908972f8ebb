// config lets you read a separate config file
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::construct::{FactPolicy, PersistenceMode};
use crate::error::Result;

pub const IN_MEMORY: &str = "memory";

/// Runtime settings, layered from defaults, an optional `atomicdb.toml`
/// and `ATOMICDB_*` environment variables, later layers winning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `memory`, or the path of a SQLite file
    pub persistence: String,
    pub fact_policy: FactPolicy,
    /// rule calls nested deeper than this are not explored
    pub max_depth: usize,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            persistence: IN_MEMORY.to_string(),
            fact_policy: FactPolicy::Overwrite,
            max_depth: 64,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Settings> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("atomicdb").required(false),
        };
        let settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("ATOMICDB"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
    pub fn persistence_mode(&self) -> PersistenceMode {
        if self.persistence.is_empty() || self.persistence.eq_ignore_ascii_case(IN_MEMORY) {
            PersistenceMode::InMemory
        } else {
            PersistenceMode::File(self.persistence.clone())
        }
    }
}
