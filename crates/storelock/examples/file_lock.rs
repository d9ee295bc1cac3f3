//! Example: guarding a shared file with a lock file next to it
//!
//! Run with: `RUST_LOG=debug cargo run -p storelock --example file_lock`

use std::time::Duration;

use storelock::{FileLockProvider, LockState};
use storelock::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let directory = std::env::temp_dir().join("storelock-example");
    tokio::fs::create_dir_all(&directory).await?;

    let provider = FileLockProvider::builder()
        .node(1)
        .directory(&directory)
        .timeout(Duration::from_secs(60))
        .build()?;
    println!("node {} session {}", provider.identity().node(), provider.identity().session());

    let lock = provider.create_lock("report.csv");
    println!("lock record: {}", lock.lock_uri());

    // Wait for whoever holds it, then take it
    lock.wait_for_lock(Some(Duration::from_secs(10))).await?;
    lock.lock().await?;
    println!("state while held: {}", lock.current_state().await);

    tokio::fs::write(directory.join("report.csv"), "id,total\n1,42\n").await?;

    lock.unlock().await?;
    println!("state after unlock: {}", lock.current_state().await);

    // Same thing through the handle API
    let handle = lock.acquire(Some(Duration::from_secs(5))).await?;
    assert_eq!(lock.lock_state().await?, LockState::Locked);
    handle.release().await?;
    println!("released");

    Ok(())
}
