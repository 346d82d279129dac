#![deny(clippy::all, clippy::pedantic)]

use prometheus::{Encoder, TextEncoder};
use std::{error::Error, sync::Arc};
use strata_cache::Cache;
use strata_gateway::{ControlEvent, Envelope, EventBus, Gateway, GatewayConfig};
use strata_models::stats::GatewayStats;
use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

/// Replays newline delimited gateway envelopes from stdin through the cache.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = GatewayConfig::from_env()?;
    let stats = Arc::new(GatewayStats::new(config.cluster_id)?);
    let cache = Cache::new(Arc::clone(&stats));
    let bus = EventBus::new();

    let mut events = bus.subscribe();
    let event_logger = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            tracing::info!(kind = event.kind(), guild = ?event.guild_id(), "Event");
        }
    });

    let mut gateway = Gateway::start(&config, cache.clone(), bus.clone())?;
    if let Some(mut control) = gateway.control() {
        tokio::spawn(async move {
            while let Some(event) = control.next().await {
                match event {
                    ControlEvent::Forward(event) => tracing::debug!(event = ?event, "Control event"),
                    ControlEvent::DecodeFailed(err) => {
                        tracing::error!(err = %err, "Dropped an envelope");
                    }
                }
            }
        });
    }

    let mut lines = BufReader::new(stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Envelope>(&line) {
            Ok(envelope) => gateway.send(envelope).await?,
            Err(err) => tracing::error!(err = ?err, "Skipping a line that is not an envelope"),
        }
    }

    let last_sequence = gateway.last_sequence();
    gateway.stop().await?;
    drop(bus);
    event_logger.await?;

    tracing::info!(
        guilds = cache.guilds().len(),
        unavailable = cache.unavailable_guilds().len(),
        last_sequence = ?last_sequence,
        "Input exhausted"
    );

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&stats.registry.gather(), &mut buffer)?;
    println!("{}", String::from_utf8_lossy(&buffer));
    Ok(())
}
