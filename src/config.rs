use serde::Serialize;
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument};

use crate::cli::Outcome;
use crate::logging::{self, Level};
use crate::{ManganeseError, Options};

/// Contents of the persisted config file.
pub type Config = Map<String, Value>;

/// Reserved key listing plugins installed through `manganese install`.
pub const INSTALLED_PLUGINS: &str = "installedPlugins";

const SENTINELS: [&str; 2] = ["default", "auto"];

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Store at `<home>/.manganese-cli/config.json`.
    pub fn in_home(home: impl AsRef<Path>) -> Self {
        Self::new(home.as_ref().join(".manganese-cli").join("config.json"))
    }

    pub fn location(&self) -> &Path {
        &self.path
    }

    /// Reads the config file. Never fails: a missing file is an empty config,
    /// other problems are reported and also give an empty config.
    #[instrument(skip(self, options), fields(path = %self.path.display()))]
    pub async fn load(&self, options: &Options) -> Config {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no config file");
                return Config::new();
            }
            Err(e) => {
                logging::log_error(options, e);
                return Config::new();
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(config)) => config,
            _ => {
                logging::log_error(options, "could not parse config");
                logging::log(options, Level::Debug, &raw);
                Config::new()
            }
        }
    }

    pub async fn save(&self, config: Config) -> Result<Config, ManganeseError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        config.serialize(&mut serializer)?;
        fs::write(&self.path, buf).await?;
        debug!(path = %self.path.display(), "config saved");
        Ok(config)
    }

    /// Merges `key=value` pairs onto the stored config.
    pub async fn update(&self, args: &[String], options: &Options) -> Result<Config, ManganeseError> {
        let config = self.load(options).await;
        self.update_config(config, args).await
    }

    /// Merges `key=value` pairs onto `config`, as read earlier, and saves it.
    pub async fn update_config(
        &self,
        mut config: Config,
        args: &[String],
    ) -> Result<Config, ManganeseError> {
        if args.is_empty() {
            return Err(ManganeseError::usage(
                "expected at least one config key-value pair",
            ));
        }
        let pairs = parse_key_values(args)?;

        config.extend(pairs);
        config.retain(|_, value| !is_sentinel(value));
        self.save(config).await
    }

    /// Records plugins in `installedPlugins`, keeping the existing order.
    pub async fn add_plugins(
        &self,
        plugins: &[String],
        options: &Options,
    ) -> Result<Config, ManganeseError> {
        let config = self.load(options).await;
        self.record_plugins(config, plugins).await
    }

    /// Same as `add_plugins` on a config that was already read.
    pub async fn record_plugins(
        &self,
        mut config: Config,
        plugins: &[String],
    ) -> Result<Config, ManganeseError> {
        let existing = match config.remove(INSTALLED_PLUGINS) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            Some(Value::String(s)) => vec![s],
            _ => Vec::new(),
        };

        let mut installed: Vec<String> = Vec::new();
        for plugin in existing.into_iter().chain(plugins.iter().cloned()) {
            if !installed.contains(&plugin) {
                installed.push(plugin);
            }
        }

        config.insert(
            INSTALLED_PLUGINS.to_string(),
            Value::Array(installed.into_iter().map(Value::String).collect()),
        );
        self.save(config).await
    }
}

fn is_sentinel(value: &Value) -> bool {
    matches!(value, Value::String(s) if SENTINELS.contains(&s.as_str()))
}

/// Parses `key=value` arguments. A value written `[a,b]` becomes an array of
/// strings, anything else is kept as a string.
pub fn parse_key_values(args: &[String]) -> Result<Config, ManganeseError> {
    let mut config = Config::new();
    for arg in args {
        let (key, value) = match arg.split_once('=') {
            Some((key, value)) if !key.is_empty() && !value.is_empty() => (key, value),
            _ => {
                return Err(ManganeseError::usage(
                    "expected key-value pairs like key=value",
                ))
            }
        };
        let value = match value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
            Some("") => Value::Array(Vec::new()),
            Some(items) => Value::Array(
                items
                    .split(',')
                    .map(|item| Value::String(item.to_string()))
                    .collect(),
            ),
            None => Value::String(value.to_string()),
        };
        config.insert(key.to_string(), value);
    }
    Ok(config)
}

/// Entry point of the `config` sub-command. `saved` is the config as read
/// for this invocation.
pub async fn parse_args(
    store: &ConfigStore,
    saved: Config,
    args: Vec<String>,
    options: &Options,
) -> Result<Outcome, ManganeseError> {
    if options.location {
        println!("{}", store.location().display());
        return Ok(Outcome::Location(store.location().to_path_buf()));
    }
    Ok(Outcome::Configured(store.update_config(saved, &args).await?))
}
