//! HAMonitor daemon
//!
//! Glue between the presence core and the broker: settings resolution, the
//! sample source, one pipeline run, and the supervisor that restarts runs.
//!
//! ## Lifecycle
//!
//! ```text
//!  Settings::resolve ──► Supervisor::supervise ──► run() ──► run() ──► ...
//!  (fatal on error)      (5 s between crashes)     fresh connector, source
//!                                                  and state machine each time
//! ```

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use hamonitor_connectors::discovery::{self, DiscoveryConfig};
use hamonitor_connectors::{AsyncConnector, MemoryConnector, MqttConnector};
use log::{info, warn};

pub mod cli;
pub mod logging;
pub mod pipeline;
pub mod settings;
pub mod source;
pub mod supervisor;

pub use cli::Cli;
pub use pipeline::{Pipeline, PipelineError};
pub use settings::{Settings, SettingsError};
pub use supervisor::{Supervisor, SupervisorConfig, SupervisorError};

/// Samples buffered between the reader thread and the state machine
pub const SAMPLE_CHANNEL_CAPACITY: usize = 64;

/// How long stopping waits on a source reader still blocked on its input
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Drive `future` to completion on a fresh runtime
///
/// Shutdown waits at most [`SHUTDOWN_GRACE`] for blocking readers. A reader
/// parked on an idle stdin would otherwise keep the process alive.
pub fn block_on<F: Future>(future: F) -> io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    Ok(output)
}

/// One pipeline run against the configured broker
pub async fn run(settings: &Settings) -> Result<(), PipelineError> {
    if settings.dry_run {
        return run_with(settings, Arc::new(MemoryConnector::echoing())).await;
    }

    let connector = MqttConnector::connect(settings.mqtt_config()?).await?;
    run_with(settings, Arc::new(connector)).await
}

/// One pipeline run against `connector`
pub async fn run_with<C>(settings: &Settings, connector: Arc<C>) -> Result<(), PipelineError>
where
    C: AsyncConnector + 'static,
{
    if settings.discovery {
        let config = DiscoveryConfig::motion_sensor(settings.topic.as_str());
        if let Err(e) =
            discovery::announce(connector.as_ref(), &settings.discovery_object_id, &config).await
        {
            warn!("{}", e);
        }
    }

    let stream = source::open(&settings.source, settings.averaging_window)?;
    let samples = source::pump(stream, SAMPLE_CHANNEL_CAPACITY);

    let pipeline = Pipeline::new(
        settings.presence,
        connector,
        &settings.topic,
        settings.redundancy_delay,
    )?;

    match pipeline.run(samples).await {
        Err(PipelineError::SourceEnded) if settings.source.is_finite() => {
            info!("Replay of {} finished", settings.source);
            Ok(())
        }
        result => result,
    }
}
