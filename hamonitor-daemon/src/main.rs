//! HAMonitor entry point

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use hamonitor_daemon::{block_on, logging, run, Cli, Settings, Supervisor};

/// Exit status for configuration that can never work
const EXIT_CONFIG: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_level = logging::init(cli.quiet, cli.debug);

    let settings = match Settings::resolve(&cli) {
        Ok(settings) => Arc::new(settings),
        Err(e) => {
            eprintln!("hamonitor: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    if let Some(level) = &log_level {
        level.update(settings.quiet, settings.debug);
    }
    info!("HAMonitor {} starting: {}", env!("CARGO_PKG_VERSION"), settings);

    match block_on(supervise(settings)) {
        Ok(code) => code,
        Err(e) => {
            error!("Could not start the async runtime: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn supervise(settings: Arc<Settings>) -> ExitCode {
    let supervisor = Supervisor::new(settings.supervisor_config());
    let supervised = supervisor.supervise(|_attempt| {
        let settings = Arc::clone(&settings);
        async move { run(&settings).await }
    });

    tokio::select! {
        result = supervised => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{}", e);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            ExitCode::SUCCESS
        }
    }
}
