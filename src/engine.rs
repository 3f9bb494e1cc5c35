//! Contract with the download engine.
//!
//! The engine is any set of tower services handling the request types below.
//! Fetching series and managing plugins happens behind these services.

use futures::future::{ready, Ready};
use std::task::{Context, Poll};
use tower::Service;

use crate::{Job, ManganeseError, Options, ProgressReporter};

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub jobs: Vec<Job>,
    pub options: Options,
    /// The engine reports every chapter it starts, finishes or fails here.
    pub progress: ProgressReporter,
}

/// Install the named plugins. Resolves to the names actually installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub plugins: Vec<String>,
}

/// Ask for the names of every installable plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindPlugins;

pub trait Downloader: Service<DownloadRequest, Response = (), Error = ManganeseError> {}

impl<T> Downloader for T where T: Service<DownloadRequest, Response = (), Error = ManganeseError> {}

pub trait PluginManager:
    Service<InstallRequest, Response = Vec<String>, Error = ManganeseError>
    + Service<FindPlugins, Response = Vec<String>, Error = ManganeseError>
{
}

impl<T> PluginManager for T where
    T: Service<InstallRequest, Response = Vec<String>, Error = ManganeseError>
        + Service<FindPlugins, Response = Vec<String>, Error = ManganeseError>
{
}

/// Stand-in used when no engine is linked into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

const DETACHED: &str = "no download engine is available in this build";

impl Service<DownloadRequest> for Detached {
    type Response = ();
    type Error = ManganeseError;
    type Future = Ready<Result<(), ManganeseError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: DownloadRequest) -> Self::Future {
        ready(Err(ManganeseError::Core(DETACHED.to_string())))
    }
}

impl Service<InstallRequest> for Detached {
    type Response = Vec<String>;
    type Error = ManganeseError;
    type Future = Ready<Result<Vec<String>, ManganeseError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: InstallRequest) -> Self::Future {
        ready(Err(ManganeseError::Core(DETACHED.to_string())))
    }
}

impl Service<FindPlugins> for Detached {
    type Response = Vec<String>;
    type Error = ManganeseError;
    type Future = Ready<Result<Vec<String>, ManganeseError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: FindPlugins) -> Self::Future {
        ready(Ok(Vec::new()))
    }
}
