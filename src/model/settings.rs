use std::fmt;
use std::sync;
use std::vec;

use futures::future::BoxFuture;
use lazy_static::lazy_static;
use serde_derive::{Deserialize, Serialize};

use crate::util;

/// Immutable view of the persisted configuration. Replaces the tracker's
/// live configuration wholesale on every settings change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub active: bool,
    pub exclude: vec::Vec<String>,
    pub save_on_cell_focus_change: bool,
    pub save_on_window_blur: bool,
}

impl Default for Snapshot {
    fn default() -> Snapshot {
        Snapshot {
            active: true,
            exclude: vec::Vec::new(),
            save_on_cell_focus_change: false,
            save_on_window_blur: true,
        }
    }
}

lazy_static! {
    /// Composite fallbacks; user values overlay these.
    pub static ref DEFAULTS: toml::value::Table =
        match toml::Value::try_from(Snapshot::default()).expect("default snapshot serializes") {
            toml::Value::Table(table) => table,
            _ => unreachable!(),
        };
}

#[derive(Debug)]
pub enum SettingsError {
    Load(String),
    Write(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Load(msg) => write!(f, "failed to load settings: {}", msg),
            SettingsError::Write(msg) => write!(f, "failed to write settings: {}", msg),
        }
    }
}

impl std::error::Error for SettingsError {}

/// Loaded settings for one plugin id. `composite` merges built-in defaults
/// under any user-provided value.
pub trait SettingsHandle: Send + Sync {
    fn composite(&self, key: &str) -> Option<toml::Value>;
    fn set(&self, key: &str, value: toml::Value) -> BoxFuture<'static, Result<(), SettingsError>>;
    fn changed(&self) -> &util::Signal<()>;
}

pub trait SettingsStore: Send + Sync {
    fn load(
        &self,
        plugin_id: &str,
    ) -> BoxFuture<'static, Result<sync::Arc<dyn SettingsHandle>, SettingsError>>;
}
