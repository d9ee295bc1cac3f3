//! Example: object-storage locks against the in-memory store
//!
//! Run with: `RUST_LOG=debug cargo run -p storelock --example object_lock`
//!
//! A real deployment passes its own `ObjectStoreClient` implementation to
//! the builder instead of `MemoryObjectStore`.

use std::time::Duration;

use storelock::{MemoryObjectStore, ObjectLockProvider};
use storelock::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let store = MemoryObjectStore::new();
    let build = |node| {
        ObjectLockProvider::builder(store.clone())
            .bucket("shared-data")
            .kms_key_id("arn:aws:kms:eu-west-1:000000000000:key/example")
            .node(node)
            .build()
    };
    let first = build(1)?;
    let second = build(2)?;

    let held = first.acquire_lock("exports/daily.parquet", None).await?;
    info!("node 1 holds the lock");

    match second.try_acquire_lock("exports/daily.parquet").await? {
        Some(_) => info!("node 2 unexpectedly got the lock"),
        None => info!("node 2 sees the lock as busy"),
    }

    let waiter = second.create_lock("exports/daily.parquet");
    let task = tokio::spawn(async move {
        let handle = waiter.acquire(Some(Duration::from_secs(10))).await?;
        info!(lock.uri = %waiter.lock_uri(), "node 2 acquired the lock");
        handle.release().await
    });

    tokio::time::sleep(Duration::from_millis(500)).await;
    held.release().await?;
    info!("node 1 released the lock");

    task.await??;
    Ok(())
}
