//! Adapter configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Flat key/value configuration block handed down by the host.
#[derive(Clone, Debug, Default)]
pub struct ConfigBlock {
    values: BTreeMap<String, String>,
}

impl ConfigBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Typed adapter configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpnpDatabaseConfig {
    /// Local network interface the UPnP client binds. Absent means all
    /// interfaces.
    pub interface: Option<String>,
}

impl UpnpDatabaseConfig {
    pub fn from_block(block: &ConfigBlock) -> Self {
        Self {
            interface: block.get("interface").map(str::to_string),
        }
    }
}
