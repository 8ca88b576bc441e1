//! Example watching namespaces on a live config service.
//!
//! This example shows how to:
//! - Load client settings from the environment
//! - Subscribe to the initial batch and to incremental updates
//! - Run the background poll loop until Ctrl-C
//!
//! Run with:
//!   APOLLO_SERVER_URL=http://localhost:8080 APOLLO_APP_ID=demo \
//!   APOLLO_NAMESPACES=application,db.yaml RUST_LOG=apollo_watch=debug \
//!   cargo run --example long_poll

use apollo_watch::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings = ClientSettings::load(None::<&str>, "APOLLO")?;
    println!(
        "Watching {:?} of {} on {}\n",
        settings.namespaces, settings.app_id, settings.server_url
    );

    let subscribers = SubscriberRegistry::new();

    let _initial = subscribers
        .subscribe(Topic::InitialBatch, |event: &ChangeEvent| {
            println!("--- Initial configuration ---");
            for payload in event.payloads() {
                println!(
                    "  {}: {}",
                    payload.namespace_name,
                    String::from_utf8_lossy(&payload.bytes)
                );
            }
        })
        .await;

    let _updates = subscribers
        .subscribe(Topic::IncrementalUpdate, |event: &ChangeEvent| {
            for payload in event.payloads() {
                println!(
                    "[update] {}: {}",
                    payload.namespace_name,
                    String::from_utf8_lossy(&payload.bytes)
                );
            }
        })
        .await;

    let watcher = ApolloWatcher::builder()
        .with_settings(settings)
        .with_event_bus(subscribers.clone())
        .build()?;

    let handle = watcher.start().await?;
    println!("Polling for changes, press Ctrl-C to stop\n");

    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("Failed to listen for Ctrl-C: {}", e);
    }

    let stats = handle.watcher().stats();
    handle.shutdown().await?;

    println!("\n--- Poll statistics ---");
    println!("  Cycles: {}", stats.cycles);
    println!("  Not modified: {}", stats.not_modified);
    println!("  Changes detected: {}", stats.changes_detected);
    println!("  Payloads fetched: {}", stats.payloads_fetched);
    println!("  Soft misses: {}", stats.soft_misses);
    println!("  Fetch failures: {}", stats.fetch_failures);

    Ok(())
}
