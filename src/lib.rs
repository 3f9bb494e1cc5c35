mod cli;
mod config;
mod engine;
mod download;
mod install;
pub mod logging;
mod options;
pub mod range;

pub use cli::{print_error, Arguments, Manganese, Outcome, SubCommand};
pub use config::{parse_key_values, Config, ConfigStore, INSTALLED_PLUGINS};
pub use engine::{Detached, DownloadRequest, Downloader, FindPlugins, InstallRequest, PluginManager};
pub use download::{
    build_jobs, describe_progress, Job, JobBuilder, JobBuilderError, ProgressEvent, ProgressJob,
    ProgressKind, ProgressLine, ProgressReporter,
};
pub use logging::{Level, Output, Verbosity};
pub use options::Options;
pub use range::{ChapterRange, RangeSpec};

#[derive(Debug, thiserror::Error)]
pub enum ManganeseError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Cli(#[from] clap::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    DeserializeError(#[from] serde_json::Error),
    #[error("invalid chapter range '{0}'")]
    RangeParseError(String),
    #[error(transparent)]
    JobError(#[from] JobBuilderError),
    #[error("{0}")]
    Core(String),
    #[error("could not find the home directory")]
    HomeDirNotFound,
}

impl ManganeseError {
    pub(crate) fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }
}
