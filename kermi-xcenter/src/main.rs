//! Kermi x-center Thing binary.
//!
//! Connects the bridge endpoint (TCP or RTU), initializes the Thing handler
//! and polls the appliance until Ctrl+C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use kermi_common::LoggingConfig;
use kermi_thing_framework::{
    BridgeHandle, ModbusEndpointHandler, ThingArgs, ThingHandler, TracingReadingSink,
    TracingStatusSink,
};
use kermi_xcenter::config::XcenterConfig;
use kermi_xcenter::handler::XcenterThingHandler;

#[tokio::main]
async fn main() -> Result<()> {
    let args = ThingArgs::parse_with_default("xcenter.json5");

    // Load configuration
    let config = XcenterConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    // Initialize logging
    let log_config = LoggingConfig {
        level: args
            .log_level
            .clone()
            .unwrap_or_else(|| config.logging.level.clone()),
        format: config.logging.format,
    };
    kermi_common::init_tracing(&log_config)
        .map_err(|e| anyhow::anyhow!("Failed to init tracing: {}", e))?;

    info!("Starting kermi-xcenter");
    info!("Loaded configuration from {:?}", args.config);

    // Connect the parent bridge that owns the Modbus channel
    let bridge = ModbusEndpointHandler::new(
        format!("{} bridge", config.name),
        config.slave_id,
        config.connection.clone(),
        Duration::from_millis(config.timeout_ms),
    );
    bridge
        .connect()
        .await
        .with_context(|| format!("Failed to connect bridge for '{}'", config.name))?;

    // Hand the Thing handler its collaborators and start it
    let handler = XcenterThingHandler::new(
        Some(config),
        Some(bridge.clone() as Arc<dyn BridgeHandle>),
        Arc::new(TracingStatusSink),
        Arc::new(TracingReadingSink),
    );
    handler.initialize();

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    handler.dispose();
    bridge.close();
    info!("kermi-xcenter stopped");

    Ok(())
}
