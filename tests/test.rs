use futures::future::{ready, Ready};
use manganese::{
    build_jobs, ConfigStore, DownloadRequest, FindPlugins, InstallRequest, Manganese,
    ManganeseError, Options, Outcome, Output, ProgressEvent, ProgressKind, INSTALLED_PLUGINS,
};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use std::task::{Context, Poll};
use tower::Service;

#[derive(Clone, Default)]
struct FakeEngine {
    downloads: Rc<RefCell<Vec<DownloadRequest>>>,
    installs: Rc<RefCell<Vec<InstallRequest>>>,
    finds: Rc<RefCell<usize>>,
    progress: Rc<RefCell<Vec<Option<Output>>>>,
    catalog: Vec<String>,
    failure: Option<String>,
}

impl FakeEngine {
    fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Default::default()
        }
    }

    fn result<T>(&self, value: T) -> Ready<Result<T, ManganeseError>> {
        ready(match &self.failure {
            Some(message) => Err(ManganeseError::Core(message.clone())),
            None => Ok(value),
        })
    }
}

impl Service<DownloadRequest> for FakeEngine {
    type Response = ();
    type Error = ManganeseError;
    type Future = Ready<Result<(), ManganeseError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: DownloadRequest) -> Self::Future {
        let mut progress = self.progress.borrow_mut();
        for job in &req.jobs {
            let start = ProgressEvent::new(ProgressKind::Start, job.series(), 1);
            let failure =
                ProgressEvent::new(ProgressKind::Error, job.series(), 1).error("page missing");
            progress.push(req.progress.output(&start));
            progress.push(req.progress.output(&failure));
        }
        drop(progress);
        self.downloads.borrow_mut().push(req);
        self.result(())
    }
}

impl Service<InstallRequest> for FakeEngine {
    type Response = Vec<String>;
    type Error = ManganeseError;
    type Future = Ready<Result<Vec<String>, ManganeseError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: InstallRequest) -> Self::Future {
        self.installs.borrow_mut().push(req.clone());
        self.result(req.plugins)
    }
}

impl Service<FindPlugins> for FakeEngine {
    type Response = Vec<String>;
    type Error = ManganeseError;
    type Future = Ready<Result<Vec<String>, ManganeseError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: FindPlugins) -> Self::Future {
        *self.finds.borrow_mut() += 1;
        self.result(self.catalog.clone())
    }
}

struct Harness {
    home: tempfile::TempDir,
    engine: FakeEngine,
    printed: Rc<RefCell<Vec<String>>>,
    manganese: Manganese<FakeEngine, FakeEngine>,
}

impl Harness {
    fn new(engine: FakeEngine) -> Self {
        let home = tempfile::tempdir().unwrap();
        let printed = Rc::new(RefCell::new(Vec::new()));
        let sink = printed.clone();
        let manganese = Manganese::new(engine.clone(), engine.clone(), home.path())
            .error_printer(move |e| sink.borrow_mut().push(e.to_string()));
        Self {
            home,
            engine,
            printed,
            manganese,
        }
    }

    async fn dispatch(&mut self, command_line: &str) -> Result<Outcome, ManganeseError> {
        let quiet: &[&str] = if command_line.contains("--verbose") {
            &[]
        } else {
            &["--verbose", "none"]
        };
        let argv = std::iter::once("manganese")
            .chain(command_line.split_whitespace())
            .chain(quiet.iter().copied());
        self.manganese.dispatch(argv).await
    }

    fn store(&self) -> &ConfigStore {
        self.manganese.store()
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_unknown_command() {
    let mut harness = Harness::new(FakeEngine::default());
    let error = harness.dispatch("unknown-command with some arguments").await.unwrap_err();
    let expected = "unknown-command is not a manganese command. See 'manganese --help'";
    assert_eq!(error.to_string(), expected);
    assert_eq!(*harness.printed.borrow(), [expected]);
    assert!(harness.engine.downloads.borrow().is_empty());
}

#[tokio::test]
async fn test_missing_command() {
    let mut harness = Harness::new(FakeEngine::default());
    let error = harness.dispatch("-p some-plugin").await.unwrap_err();
    assert_eq!(
        error.to_string(),
        "no manganese command is specified. See 'manganese --help'"
    );
    assert_eq!(harness.printed.borrow().len(), 1);
}

#[tokio::test]
async fn test_help_is_a_cli_error() {
    let mut harness = Harness::new(FakeEngine::default());
    let error = harness.dispatch("--help").await.unwrap_err();
    assert!(
        matches!(&error, ManganeseError::Cli(e) if e.kind() == clap::error::ErrorKind::DisplayHelp)
    );
    assert_eq!(harness.printed.borrow().len(), 1);
}

#[tokio::test]
async fn test_dispatch_download() {
    let mut harness = Harness::new(FakeEngine::default());
    let outcome = harness
        .dispatch("download series1 120 series2 100:140 -p some-plugin")
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Downloaded);

    let downloads = harness.engine.downloads.borrow();
    assert_eq!(downloads.len(), 1);
    let req = &downloads[0];
    assert_eq!(req.options.plugin.as_deref(), Some("some-plugin"));
    assert_eq!(req.progress.options(), &req.options);
    assert_eq!(
        req.jobs,
        build_jobs(
            &strings(&["series1", "120", "series2", "100:140"]),
            &Options::new().plugin("some-plugin")
        )
        .unwrap()
    );
    assert!(harness.printed.borrow().is_empty());
}

#[tokio::test]
async fn test_download_validation_happens_before_engine() {
    let mut harness = Harness::new(FakeEngine::default());
    let error = harness
        .dispatch("download series1 120 series2 100:140 -p p -n some-name")
        .await
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "\"name\" can not be specified when targetting multiple series"
    );
    let error = harness.dispatch("download series1 120").await.unwrap_err();
    assert_eq!(error.to_string(), "no plugin was specified");
    assert!(harness.engine.downloads.borrow().is_empty());
    assert_eq!(harness.printed.borrow().len(), 2);
}

#[tokio::test]
async fn test_download_failure_is_printed_once() {
    let mut harness = Harness::new(FakeEngine::failing("some error"));
    let error = harness.dispatch("download series1 120 -p p").await.unwrap_err();
    assert!(matches!(&error, ManganeseError::Core(m) if m == "some error"));
    assert_eq!(*harness.printed.borrow(), ["some error"]);
}

#[tokio::test]
async fn test_options_precedence() {
    let mut harness = Harness::new(FakeEngine::default());
    harness
        .dispatch("config plugin=from-config destFolder=/srv/manga")
        .await
        .unwrap();

    harness.dispatch("download series1 120").await.unwrap();
    harness.dispatch("download series1 120 -p from-flags").await.unwrap();

    let downloads = harness.engine.downloads.borrow();
    assert_eq!(downloads[0].jobs[0].plugin(), "from-config");
    assert_eq!(downloads[0].options.dest_folder.to_str(), Some("/srv/manga"));
    assert_eq!(downloads[1].jobs[0].plugin(), "from-flags");
}

#[tokio::test]
async fn test_default_dest_folder() {
    let mut harness = Harness::new(FakeEngine::default());
    harness.dispatch("download series1 120 -p p").await.unwrap();
    let downloads = harness.engine.downloads.borrow();
    assert_eq!(
        downloads[0].options.dest_folder,
        harness.home.path().join("manga")
    );
}

#[tokio::test]
async fn test_install_requires_plugins() {
    let mut harness = Harness::new(FakeEngine::default());
    let error = harness.dispatch("install").await.unwrap_err();
    assert_eq!(error.to_string(), "no plugins were specified");
    assert!(harness.engine.installs.borrow().is_empty());
}

#[tokio::test]
async fn test_install_list() {
    let engine = FakeEngine {
        catalog: strings(&["mangafox", "mangareader"]),
        ..Default::default()
    };
    let mut harness = Harness::new(engine);
    let outcome = harness.dispatch("install p1 --list").await.unwrap();
    assert_eq!(outcome, Outcome::Plugins(strings(&["mangafox", "mangareader"])));
    assert_eq!(*harness.engine.finds.borrow(), 1);
    assert!(harness.engine.installs.borrow().is_empty());
}

#[tokio::test]
async fn test_install_records_plugins() {
    let mut harness = Harness::new(FakeEngine::default());
    harness.dispatch("install a").await.unwrap();
    let outcome = harness.dispatch("install a b").await.unwrap();

    let Outcome::Installed(config) = outcome else {
        panic!("expected an install outcome");
    };
    assert_eq!(config[INSTALLED_PLUGINS], json!(["a", "b"]));
    assert_eq!(
        harness.engine.installs.borrow().last(),
        Some(&InstallRequest {
            plugins: strings(&["a", "b"])
        })
    );
    let stored = harness.store().load(&Options::new()).await;
    assert_eq!(stored[INSTALLED_PLUGINS], json!(["a", "b"]));
}

#[tokio::test]
async fn test_install_failure_leaves_config() {
    let mut harness = Harness::new(FakeEngine::failing("could not install"));
    let error = harness.dispatch("install a").await.unwrap_err();
    assert_eq!(error.to_string(), "could not install");
    assert!(!harness.store().location().exists());
}

#[tokio::test]
async fn test_config_update_and_location() {
    let mut harness = Harness::new(FakeEngine::default());
    let outcome = harness.dispatch("config --location").await.unwrap();
    assert_eq!(
        outcome,
        Outcome::Location(harness.store().location().to_path_buf())
    );
    assert!(!harness.store().location().exists());

    harness.dispatch("config k=[v1,v2]").await.unwrap();
    let stored = harness.store().load(&Options::new()).await;
    assert_eq!(stored["k"], json!(["v1", "v2"]));

    let error = harness.dispatch("config").await.unwrap_err();
    assert_eq!(
        error.to_string(),
        "expected at least one config key-value pair"
    );
    let error = harness.dispatch("config novalue").await.unwrap_err();
    assert_eq!(error.to_string(), "expected key-value pairs like key=value");
}

#[tokio::test]
async fn test_progress_follows_verbosity() {
    let mut harness = Harness::new(FakeEngine::default());
    let failed = Output::Stderr("error when downloading series1 1: page missing".into());

    harness
        .dispatch("download series1 120 -p p --verbose error")
        .await
        .unwrap();
    assert_eq!(
        harness.engine.progress.borrow_mut().split_off(0),
        [None, Some(failed.clone())]
    );

    harness
        .dispatch("download series1 120 -p p --verbose normal")
        .await
        .unwrap();
    assert_eq!(
        harness.engine.progress.borrow_mut().split_off(0),
        [
            Some(Output::Stdout("started download of series1 1".into())),
            Some(failed)
        ]
    );

    harness.dispatch("download series1 120 -p p").await.unwrap();
    assert_eq!(*harness.engine.progress.borrow(), [None, None]);
}

#[tokio::test]
async fn test_unfit_config_value_can_be_repaired() {
    let mut harness = Harness::new(FakeEngine::default());
    harness.dispatch("config plugin=[a,b] name=n").await.unwrap();

    let outcome = harness.dispatch("config --location").await.unwrap();
    assert_eq!(
        outcome,
        Outcome::Location(harness.store().location().to_path_buf())
    );
    let error = harness.dispatch("unknown-cmd").await.unwrap_err();
    assert_eq!(
        error.to_string(),
        "unknown-cmd is not a manganese command. See 'manganese --help'"
    );
    let error = harness.dispatch("download series1 120").await.unwrap_err();
    assert_eq!(error.to_string(), "no plugin was specified");
    harness.dispatch("download series1 120 -p p").await.unwrap();
    assert_eq!(
        harness.engine.downloads.borrow()[0].jobs[0].name().as_deref(),
        Some("n")
    );

    let outcome = harness.dispatch("config plugin=default").await.unwrap();
    assert_eq!(outcome, Outcome::Configured(harness.store().load(&Options::new()).await));
    let stored = harness.store().load(&Options::new()).await;
    assert_eq!(serde_json::Value::Object(stored), json!({"name": "n"}));
}

#[tokio::test]
async fn test_saved_flags_do_not_change_commands() {
    let engine = FakeEngine {
        catalog: strings(&["mangafox"]),
        ..Default::default()
    };
    let mut harness = Harness::new(engine);
    harness.dispatch("config list=true location=true").await.unwrap();

    let outcome = harness.dispatch("install a").await.unwrap();
    assert!(matches!(outcome, Outcome::Installed(_)));
    assert_eq!(*harness.engine.finds.borrow(), 0);

    let outcome = harness.dispatch("config k=v").await.unwrap();
    let Outcome::Configured(config) = outcome else {
        panic!("expected a config outcome");
    };
    assert_eq!(config["k"], json!("v"));
    assert_eq!(config["list"], json!("true"));
}
