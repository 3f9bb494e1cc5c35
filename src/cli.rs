use clap::Parser;
use serde_json::{Map, Value};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, instrument};

use crate::options::persisted_layer;
use crate::{config, download, install};
use crate::{Config, ConfigStore, Downloader, ManganeseError, Options, PluginManager};

#[derive(Debug, Parser)]
#[command(
    name = "manganese",
    version,
    author,
    about = "Download series with manganese plugins"
)]
pub struct Arguments {
    #[arg(
        value_name = "COMMAND",
        help = "download <series> <chapters>..., install <plugin>... or config <key=value>..."
    )]
    positionals: Vec<String>,
    #[arg(short, long, help = "plugin used to download")]
    plugin: Option<String>,
    #[arg(short, long, help = "name given to the downloaded series")]
    name: Option<String>,
    #[arg(long = "destFolder", help = "destination folder")]
    dest_folder: Option<PathBuf>,
    #[arg(long, help = "print the location of the config file")]
    location: bool,
    #[arg(long, help = "list installable plugins")]
    list: bool,
    #[arg(long, help = "none, error, normal, debug, all or a number from 1 to 5")]
    verbose: Option<String>,
}

impl Arguments {
    /// Flags given on the command line, as the highest precedence layer.
    fn layer(&self) -> Map<String, Value> {
        let mut layer = Map::new();
        if let Some(plugin) = &self.plugin {
            layer.insert("plugin".into(), plugin.clone().into());
        }
        if let Some(name) = &self.name {
            layer.insert("name".into(), name.clone().into());
        }
        if let Some(dest_folder) = &self.dest_folder {
            layer.insert(
                "destFolder".into(),
                dest_folder.to_string_lossy().into_owned().into(),
            );
        }
        if self.location {
            layer.insert("location".into(), true.into());
        }
        if self.list {
            layer.insert("list".into(), true.into());
        }
        if let Some(verbose) = &self.verbose {
            layer.insert("verbose".into(), verbose.clone().into());
        }
        layer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubCommand {
    Download,
    Install,
    Config,
}

impl FromStr for SubCommand {
    type Err = ManganeseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "download" => Ok(SubCommand::Download),
            "install" => Ok(SubCommand::Install),
            "config" => Ok(SubCommand::Config),
            _ => Err(ManganeseError::usage(format!(
                "{s} is not a manganese command. See 'manganese --help'"
            ))),
        }
    }
}

/// What a successful command resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Downloaded,
    Installed(Config),
    Plugins(Vec<String>),
    Configured(Config),
    Location(PathBuf),
}

/// Prints an error the way every failed command ends.
pub fn print_error(error: &ManganeseError) {
    match error {
        ManganeseError::Cli(e) => {
            let _ = e.print();
        }
        e => eprintln!("\n  {e}\n"),
    }
}

pub struct Manganese<D, P> {
    downloader: D,
    plugins: P,
    store: ConfigStore,
    home: PathBuf,
    report_error: Box<dyn Fn(&ManganeseError)>,
}

impl<D, P> Manganese<D, P>
where
    D: Downloader,
    P: PluginManager,
{
    /// The config file and default destination folder live under `home`.
    pub fn new(downloader: D, plugins: P, home: impl AsRef<Path>) -> Self {
        Self {
            downloader,
            plugins,
            store: ConfigStore::in_home(home.as_ref()),
            home: home.as_ref().to_path_buf(),
            report_error: Box::new(print_error),
        }
    }

    pub fn error_printer(mut self, printer: impl Fn(&ManganeseError) + 'static) -> Self {
        self.report_error = Box::new(printer);
        self
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Runs the command described by `argv`, program name included. A failure
    /// is printed once before being returned.
    pub async fn dispatch<I, T>(&mut self, argv: I) -> Result<Outcome, ManganeseError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let result = self.try_dispatch(argv).await;
        if let Err(e) = &result {
            (self.report_error)(e);
        }
        result
    }

    async fn try_dispatch<I, T>(&mut self, argv: I) -> Result<Outcome, ManganeseError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut arguments = Arguments::try_parse_from(argv)?;
        let positionals = std::mem::take(&mut arguments.positionals);
        let (options, config) = self.resolve_options(&arguments).await?;

        let mut positionals = positionals.into_iter();
        let Some(name) = positionals.next() else {
            return Err(ManganeseError::usage(
                "no manganese command is specified. See 'manganese --help'",
            ));
        };
        let command: SubCommand = name.parse()?;
        let args: Vec<String> = positionals.collect();
        self.run(command, args, &options, config).await
    }

    /// Resolves the options of this invocation. The config file is read once
    /// and handed back untouched for the sub-commands that rewrite it.
    #[instrument(skip(self, arguments))]
    async fn resolve_options(
        &self,
        arguments: &Arguments,
    ) -> Result<(Options, Config), ManganeseError> {
        let defaults = Options::default_layer(&self.home);
        let flags = arguments.layer();
        let preliminary = Options::from_layers([defaults.clone(), flags.clone()])?;
        let config = self.store.load(&preliminary).await;
        let persisted = persisted_layer(config.clone(), &preliminary);
        let options = Options::from_layers([defaults, persisted, flags])?;
        debug!(?options);
        Ok((options, config))
    }

    /// Runs `command`. `saved` is the config file as read for this invocation.
    pub async fn run(
        &mut self,
        command: SubCommand,
        args: Vec<String>,
        options: &Options,
        saved: Config,
    ) -> Result<Outcome, ManganeseError> {
        debug!(?command, ?args);
        match command {
            SubCommand::Download => download::parse_args(&mut self.downloader, args, options).await,
            SubCommand::Install => {
                install::parse_args(&mut self.plugins, &self.store, saved, args, options).await
            }
            SubCommand::Config => config::parse_args(&self.store, saved, args, options).await,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sub_commands() {
        assert_eq!("download".parse::<SubCommand>().unwrap(), SubCommand::Download);
        assert_eq!("install".parse::<SubCommand>().unwrap(), SubCommand::Install);
        assert_eq!("config".parse::<SubCommand>().unwrap(), SubCommand::Config);
        assert_eq!(
            "Download".parse::<SubCommand>().unwrap_err().to_string(),
            "Download is not a manganese command. See 'manganese --help'"
        );
    }

    #[test]
    fn test_flags_layer() {
        let arguments = Arguments::try_parse_from([
            "manganese",
            "download",
            "series1",
            "120",
            "-p",
            "some-plugin",
            "--destFolder",
            "/tmp/manga",
            "--verbose",
            "debug",
        ])
        .unwrap();
        assert_eq!(arguments.positionals, ["download", "series1", "120"]);

        let layer = arguments.layer();
        assert_eq!(layer["plugin"], "some-plugin");
        assert_eq!(layer["destFolder"], "/tmp/manga");
        assert_eq!(layer["verbose"], "debug");
        assert!(!layer.contains_key("name"));
        assert!(!layer.contains_key("list"));
    }

    #[test]
    fn test_positionals_stay_strings() {
        let arguments =
            Arguments::try_parse_from(["manganese", "download", "series1", "0120"]).unwrap();
        assert_eq!(arguments.positionals[2], "0120");
    }
}
