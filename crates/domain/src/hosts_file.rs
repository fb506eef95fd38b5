use serde::Deserialize;
use std::collections::HashMap;

use crate::errors::ConfigError;

/// On-disk hosts configuration. Recheck intervals stay as raw strings here;
/// the policy layer parses them and rejects bad grammar at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostsFile {
    pub defaults: DefaultHostSettings,

    #[serde(default)]
    pub hosts: HashMap<String, HostSettings>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultHostSettings {
    pub delay: f64,
    pub recheck: String,
    pub priority_recheck: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostSettings {
    pub delay: Option<f64>,
    pub recheck: Option<String>,
    pub priority_recheck: Option<String>,
    pub blacklist: Option<bool>,
    pub skip: Option<bool>,

    #[serde(default)]
    pub aggregate: bool,
}

impl HostsFile {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
