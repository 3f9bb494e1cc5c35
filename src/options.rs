use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::logging;
use crate::{ManganeseError, Verbosity};

/// Keys that only come from the command line of the current invocation.
const FLAG_ONLY: [&str; 2] = ["list", "location"];

/// Options of one invocation, resolved from defaults, the persisted config
/// and command line flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub dest_folder: PathBuf,
    #[serde(default)]
    pub verbose: Verbosity,
    #[serde(default)]
    pub list: bool,
    #[serde(default)]
    pub location: bool,
    /// Any other key, e.g. `installedPlugins` or plugin specific settings.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn fits(key: &str, value: &Value) -> bool {
    match key {
        "plugin" | "name" => value.is_string() || value.is_null(),
        "destFolder" => value.is_string(),
        "verbose" => value.is_string() || value.is_u64(),
        _ => true,
    }
}

/// Turns the saved config into a layer that always merges. `list` and
/// `location` are dropped, values that can not fill their option are
/// reported and dropped.
pub fn persisted_layer(mut config: Map<String, Value>, options: &Options) -> Map<String, Value> {
    for key in FLAG_ONLY {
        if config.remove(key).is_some() {
            debug!(key, "flag only option found in config");
        }
    }
    config.retain(|key, value| {
        let fit = fits(key, value);
        if !fit {
            logging::log_error(
                options,
                format!("ignoring config value {value} for \"{key}\""),
            );
        }
        fit
    });
    config
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowest precedence layer.
    pub fn default_layer(home: impl AsRef<Path>) -> Map<String, Value> {
        let mut layer = Map::new();
        layer.insert(
            "destFolder".to_string(),
            Value::String(home.as_ref().join("manga").to_string_lossy().into_owned()),
        );
        layer.insert("verbose".to_string(), Value::String("normal".to_string()));
        layer
    }

    /// Merges layers from lowest to highest precedence. A key present in a
    /// later layer replaces the whole value of earlier ones.
    pub fn from_layers<I>(layers: I) -> Result<Self, ManganeseError>
    where
        I: IntoIterator<Item = Map<String, Value>>,
    {
        let merged = layers.into_iter().fold(Map::new(), |mut acc, layer| {
            acc.extend(layer);
            acc
        });
        Ok(serde_json::from_value(Value::Object(merged))?)
    }

    pub fn plugin(mut self, plugin: impl ToString) -> Self {
        self.plugin = Some(plugin.to_string());
        self
    }

    pub fn name(mut self, name: impl ToString) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn verbose(mut self, verbose: impl Into<Verbosity>) -> Self {
        self.verbose = verbose.into();
        self
    }

    pub fn list(mut self, list: bool) -> Self {
        self.list = list;
        self
    }

    pub fn location(mut self, location: bool) -> Self {
        self.location = location;
        self
    }
}
