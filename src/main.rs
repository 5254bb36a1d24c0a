//! Data monitor command-line entry point
//!
//! Subscribes to the EdgeX core data topic over MQTT, buffers the incoming
//! events and optionally serves the HTTP API.
//!
//! Usage:
//!   cargo run -- --host localhost --port 1883 --http 127.0.0.1:8080

use clap::Parser;
use datamonitor::{
    config::{validate_buffer_size, MonitorConfig, MqttSourceConfig, DEFAULT_BUFFER_SIZE},
    http::start_server,
    logging::init_logging,
    monitor::Monitor,
    stream::MqttSubscriber,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "datamonitor")]
#[command(about = "Live monitor for EdgeX events and readings", long_about = None)]
struct Args {
    /// MQTT broker host
    #[arg(short = 'H', long, default_value = "localhost")]
    host: String,

    /// MQTT broker port
    #[arg(short, long, default_value = "1883")]
    port: u16,

    /// Topic the core data service publishes events on
    #[arg(short, long, default_value = datamonitor::config::DEFAULT_EVENTS_TOPIC)]
    topic: String,

    #[arg(long, default_value = "datamonitor")]
    client_id: String,

    /// Rows kept per table
    #[arg(short, long, default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,

    /// Capacity of the queue between the MQTT source and the processor
    #[arg(long, default_value = "1024")]
    queue_capacity: usize,

    /// Serve the HTTP API on this address, e.g. 127.0.0.1:8080
    #[arg(long)]
    http: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.json_logs);

    let config =
        MonitorConfig { buffer_size: validate_buffer_size(args.buffer_size)?, ..Default::default() };
    let mqtt_config = MqttSourceConfig {
        host: args.host,
        port: args.port,
        client_id: args.client_id,
        topic: args.topic,
        ..Default::default()
    };
    mqtt_config.validate()?;

    let (events_tx, events_rx) = mpsc::channel(args.queue_capacity.max(1));
    let monitor = Arc::new(Monitor::new(config, events_rx));
    let subscriber = Arc::new(MqttSubscriber::new(mqtt_config));

    let monitor_clone = Arc::clone(&monitor);
    let subscriber_clone = Arc::clone(&subscriber);
    ctrlc::set_handler(move || {
        info!("received Ctrl+C, stopping");
        monitor_clone.stop();
        subscriber_clone.stop();
    })?;

    let source = Arc::clone(&subscriber);
    let source_task = tokio::spawn(async move {
        if let Err(e) = source.run(events_tx).await {
            error!(error = %e, "MQTT subscriber failed");
        }
    });

    if let Some(addr) = args.http {
        let monitor = Arc::clone(&monitor);
        tokio::spawn(async move {
            if let Err(e) = start_server(&addr, monitor).await {
                error!(error = %e, "HTTP server failed");
            }
        });
    }

    monitor.run().await?;
    subscriber.stop();
    if let Err(e) = source_task.await {
        error!(error = %e, "MQTT subscriber task ended abnormally");
    }

    let stats = monitor.stats();
    info!(
        total_events = stats.total_events,
        total_readings = stats.total_readings,
        live_events = stats.live_events,
        live_readings = stats.live_readings,
        "data monitor stopped"
    );

    Ok(())
}
