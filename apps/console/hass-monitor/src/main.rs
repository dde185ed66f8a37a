use hass_monitor::args::MonitorArgs;
use hass_monitor::error::MonitorError;
use hass_monitor::logger::{LOG_LEVEL_ENV, initialize as LoggerInitialize, level_from};
use hass_monitor::monitor::log_state_change;

use hass_client::protocol::STATE_CHANGED_EVENT;
use hass_client::{HassClient, HubConfig};

use common::ErrorLocation;

use std::env;
use std::fs::create_dir_all;
use std::panic::Location;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};

const LOG_DIR_ENV: &str = "HASS_MONITOR_LOG_DIR";
const LOG_DIR_NAME: &str = "hass-monitor";

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), MonitorError> {
    let args = MonitorArgs::parse();

    let log_dir = env::var_os(LOG_DIR_ENV)
        .map(Into::into)
        .unwrap_or_else(|| env::temp_dir().join(LOG_DIR_NAME));

    create_dir_all(&log_dir).map_err(|e| MonitorError::Monitor {
        message: format!("Failed to create log directory {}: {e}", log_dir.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Initialize logger FIRST
    let level = level_from(env::var(LOG_LEVEL_ENV).ok().as_deref())?;
    LoggerInitialize(&log_dir, level)?;

    info!("hass-monitor starting");

    let config = match &args.config {
        Some(path) => HubConfig::load(path)?,
        None => HubConfig::from_env()?,
    };

    let client = HassClient::connect(&config).await?;
    info!("Tracking {} entities", client.cached_entity_count());

    // connect already subscribed to state_changed; listen on that subscription.
    client.on_event(STATE_CHANGED_EVENT, log_state_change);

    if let Some(call) = args.service_call() {
        let result = client
            .call_service(&call.domain, &call.service, call.entity_id.as_deref())
            .await?;
        info!("{call} returned {result}");
    }

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|e| MonitorError::Monitor {
                message: format!("Failed to listen for Ctrl-C: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;
            info!("Ctrl-C received, closing hub connection");
            client.close().await?;
        }
        () = client.closed() => {
            warn!("Hub connection lost");
        }
    }

    info!("hass-monitor stopped");
    Ok(())
}
