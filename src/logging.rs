//! User facing leveled output.
//!
//! Messages carry a [`Level`] and are printed only when the configured
//! [`Verbosity`] ranks at least as high. Internal diagnostics go through
//! `tracing` instead and are not affected by these rules.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::Options;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Mute = 1,
    Error = 2,
    Normal = 3,
    Debug = 4,
    All = 5,
}

impl Level {
    pub fn rank(self) -> u64 {
        self as u64
    }

    pub fn name(self) -> &'static str {
        match self {
            Level::Mute => "none",
            Level::Error => "error",
            Level::Normal => "normal",
            Level::Debug => "debug",
            Level::All => "all",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" | "mute" => Some(Level::Mute),
            "error" => Some(Level::Error),
            "normal" => Some(Level::Normal),
            "debug" => Some(Level::Debug),
            "all" => Some(Level::All),
            _ => None,
        }
    }
}

/// Either a level name or its numeric rank, as found on the command line or
/// in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Verbosity {
    Rank(u64),
    Name(String),
}

impl Default for Verbosity {
    fn default() -> Self {
        Level::Normal.into()
    }
}

impl From<Level> for Verbosity {
    fn from(level: Level) -> Self {
        Verbosity::Name(level.name().to_string())
    }
}

impl From<u64> for Verbosity {
    fn from(rank: u64) -> Self {
        Verbosity::Rank(rank)
    }
}

impl From<&str> for Verbosity {
    fn from(name: &str) -> Self {
        Verbosity::Name(name.to_string())
    }
}

impl Verbosity {
    /// Unknown names have no rank.
    pub fn rank(&self) -> Option<u64> {
        match self {
            Verbosity::Rank(rank) => Some(*rank),
            Verbosity::Name(name) => name
                .trim()
                .parse::<u64>()
                .ok()
                .or_else(|| Level::from_name(name.trim()).map(Level::rank)),
        }
    }

    /// Whether a message at `level` passes this verbosity. Any comparison
    /// with an unknown rank fails.
    pub fn allows(&self, level: impl Into<Verbosity>) -> bool {
        match (self.rank(), level.into().rank()) {
            (Some(threshold), Some(level)) => level <= threshold,
            _ => false,
        }
    }

    pub fn allows_errors(&self) -> bool {
        self.rank().is_some_and(|rank| rank >= Level::Error.rank())
    }
}

/// A message that passed the filter, with the stream it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Stdout(String),
    Stderr(String),
}

impl Output {
    pub fn write(&self) {
        match self {
            Output::Stdout(message) => println!("{message}"),
            Output::Stderr(message) => eprintln!("{message}"),
        }
    }
}

/// What `log` would print.
pub fn output(
    options: &Options,
    level: impl Into<Verbosity>,
    message: impl Display,
) -> Option<Output> {
    options
        .verbose
        .allows(level)
        .then(|| Output::Stdout(message.to_string()))
}

/// What `log_error` would print.
pub fn error_output(options: &Options, message: impl Display) -> Option<Output> {
    options
        .verbose
        .allows_errors()
        .then(|| Output::Stderr(message.to_string()))
}

pub fn log(options: &Options, level: impl Into<Verbosity>, message: impl Display) {
    if let Some(output) = output(options, level, message) {
        output.write();
    }
}

pub fn log_error(options: &Options, message: impl Display) {
    if let Some(output) = error_output(options, message) {
        output.write();
    }
}
