use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use koth_agent::config::{Config, DEFAULT_CONFIG_PATH};
use koth_agent::logging::{init_logging, EventLog, TracingEventLog};
use koth_agent::supervisor::Supervisor;
use koth_agent::version::VERSION;

#[derive(Parser, Debug)]
#[command(
    author,
    version = VERSION,
    about = "Awards King of the Hill points to whoever holds each flag file.",
    long_about = None
)]
struct Args {
    /// The King of the Hill configuration file's path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Directory for the rolling JSON log files
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    init_logging(&args.log_dir);
    info!(version = VERSION, "Starting King of the Hill agent...");

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Critical error loading configuration. Exiting.");
            return Err(e.into());
        }
    };

    let log: Arc<dyn EventLog> = Arc::new(TracingEventLog);
    let mut supervisor = Supervisor::launch(config, log);
    info!(running = supervisor.running(), "Monitors launched. Waiting for interruption signal.");

    let closed = supervisor
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for the interruption signal. Shutting down.");
            }
        })
        .await;

    info!(closed, "Gracefully shut down on interruption signal.");
    Ok(())
}
