use std::process::ExitCode;

use manganese::{print_error, Detached, Manganese, ManganeseError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let Some(home) = dirs::home_dir() else {
        print_error(&ManganeseError::HomeDirNotFound);
        return ExitCode::FAILURE;
    };

    let mut manganese = Manganese::new(Detached, Detached, home);
    match manganese.dispatch(std::env::args_os()).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(ManganeseError::Cli(e)) => ExitCode::from(e.exit_code() as u8),
        Err(_) => ExitCode::FAILURE,
    }
}
