use derive_builder::Builder;
use getset::Getters;
use serde::Serialize;
use std::fmt;
use tower::ServiceExt;
use tracing::{debug, instrument};

use crate::cli::Outcome;
use crate::logging::{self, Level, Output};
use crate::range::{self, RangeSpec};
use crate::{DownloadRequest, Downloader, ManganeseError, Options};

/// One series to download with the chapters selected for it.
#[derive(Debug, Clone, PartialEq, Serialize, Builder, Getters)]
#[builder(setter(into))]
#[getset(get = "pub")]
pub struct Job {
    series: String,
    chapters: RangeSpec,
    plugin: String,
    #[builder(default, setter(into, strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

/// Pairs `series chapters` arguments into jobs.
pub fn build_jobs(args: &[String], options: &Options) -> Result<Vec<Job>, ManganeseError> {
    if args.is_empty() {
        return Err(ManganeseError::usage("no series was specified"));
    }
    let Some(plugin) = options.plugin.as_deref() else {
        return Err(ManganeseError::usage("no plugin was specified"));
    };

    let pairs = args.chunks_exact(2);
    if let [series] = pairs.remainder() {
        return Err(ManganeseError::usage(format!(
            "no chapters were specified for \"{series}\""
        )));
    }

    let mut jobs = Vec::new();
    for pair in pairs {
        let [series, chapters] = pair else { continue };
        let mut builder = JobBuilder::default();
        builder
            .series(series.as_str())
            .chapters(range::parse(chapters)?)
            .plugin(plugin);
        jobs.push(builder);
    }

    if let Some(name) = options.name.as_deref() {
        match jobs.as_mut_slice() {
            [job] => {
                job.name(name);
            }
            _ => {
                return Err(ManganeseError::usage(
                    "\"name\" can not be specified when targetting multiple series",
                ))
            }
        }
    }

    jobs.into_iter()
        .map(|builder| builder.build().map_err(ManganeseError::from))
        .collect()
}

/// Entry point of the `download` sub-command.
pub async fn parse_args<D: Downloader>(
    downloader: &mut D,
    args: Vec<String>,
    options: &Options,
) -> Result<Outcome, ManganeseError> {
    let jobs = build_jobs(&args, options)?;
    download_jobs(downloader, jobs, options).await?;
    Ok(Outcome::Downloaded)
}

#[instrument(skip_all, fields(jobs = jobs.len()))]
async fn download_jobs<D: Downloader>(
    downloader: &mut D,
    jobs: Vec<Job>,
    options: &Options,
) -> Result<(), ManganeseError> {
    debug!(?jobs);
    let req = DownloadRequest {
        jobs,
        options: options.clone(),
        progress: ProgressReporter::new(options.clone()),
    };
    downloader.ready().await?.call(req).await
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressKind {
    Start,
    End,
    Error,
    Other(String),
}

impl fmt::Display for ProgressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressKind::Start => f.write_str("start"),
            ProgressKind::End => f.write_str("end"),
            ProgressKind::Error => f.write_str("error"),
            ProgressKind::Other(kind) => f.write_str(kind),
        }
    }
}

/// The chapter an engine event is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressJob {
    pub name: String,
    pub chapter: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub error: Option<String>,
    pub kind: ProgressKind,
    pub job: ProgressJob,
}

impl ProgressEvent {
    pub fn new(kind: ProgressKind, name: impl ToString, chapter: impl ToString) -> Self {
        Self {
            error: None,
            kind,
            job: ProgressJob {
                name: name.to_string(),
                chapter: chapter.to_string(),
            },
        }
    }

    pub fn error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressLine {
    Failed(String),
    Info(String),
}

/// What should be printed for an event, if anything.
pub fn describe_progress(event: &ProgressEvent) -> Option<ProgressLine> {
    let description = format!("{} {}", event.job.name, event.job.chapter);
    if let Some(error) = &event.error {
        return Some(ProgressLine::Failed(format!(
            "error when downloading {description}: {error}"
        )));
    }
    match event.kind {
        ProgressKind::Start | ProgressKind::End => Some(ProgressLine::Info(format!(
            "{}ed download of {description}",
            event.kind
        ))),
        _ => None,
    }
}

/// Prints engine progress according to the options it was created with.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    options: Options,
}

impl ProgressReporter {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// What `report` prints for `event`: failures on stderr, start and end
    /// on stdout at the normal level.
    pub fn output(&self, event: &ProgressEvent) -> Option<Output> {
        match describe_progress(event)? {
            ProgressLine::Failed(message) => logging::error_output(&self.options, message),
            ProgressLine::Info(message) => logging::output(&self.options, Level::Normal, message),
        }
    }

    pub fn report(&self, event: &ProgressEvent) {
        if let Some(output) = self.output(event) {
            output.write();
        }
    }
}
