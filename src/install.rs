use tower::{Service, ServiceExt};
use tracing::{debug, instrument};

use crate::cli::Outcome;
use crate::{Config, ConfigStore, FindPlugins, InstallRequest, ManganeseError, Options, PluginManager};

/// Entry point of the `install` sub-command. `saved` is the config as read
/// for this invocation.
#[instrument(skip_all)]
pub async fn parse_args<P: PluginManager>(
    plugins: &mut P,
    store: &ConfigStore,
    saved: Config,
    args: Vec<String>,
    options: &Options,
) -> Result<Outcome, ManganeseError> {
    if options.list {
        let svc = ServiceExt::<FindPlugins>::ready(plugins).await?;
        let available = Service::<FindPlugins>::call(svc, FindPlugins).await?;
        println!("{}", format_listing(&available));
        return Ok(Outcome::Plugins(available));
    }

    if args.is_empty() {
        return Err(ManganeseError::usage("no plugins were specified"));
    }

    let installed = install_plugins(plugins, args).await?;
    debug!(?installed);
    Ok(Outcome::Installed(store.record_plugins(saved, &installed).await?))
}

async fn install_plugins<P: PluginManager>(
    plugins: &mut P,
    names: Vec<String>,
) -> Result<Vec<String>, ManganeseError> {
    let svc = ServiceExt::<InstallRequest>::ready(plugins).await?;
    Service::<InstallRequest>::call(svc, InstallRequest { plugins: names }).await
}

fn format_listing(plugins: &[String]) -> String {
    plugins
        .iter()
        .map(|plugin| format!("\t{plugin}"))
        .collect::<Vec<_>>()
        .join("\n")
}
