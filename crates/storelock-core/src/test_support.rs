use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::error::{LockError, LockResult};
use crate::storage::{LockState, LockStorage};

/// In-memory storage with switchable failure.
#[derive(Clone, Default)]
pub(crate) struct MemoryStorage {
    records: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    failure: Arc<Mutex<Option<&'static str>>>,
    write_delay: Arc<Mutex<Duration>>,
}

impl MemoryStorage {
    pub(crate) fn insert(&self, resource: &str, body: Vec<u8>) {
        self.records().insert(resource.to_string(), body);
    }

    pub(crate) fn contains(&self, resource: &str) -> bool {
        self.records().contains_key(resource)
    }

    pub(crate) fn fail_with(&self, message: &'static str) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(message);
    }

    /// Makes every following write take `delay` before it lands.
    pub(crate) fn delay_writes(&self, delay: Duration) {
        *self.write_delay.lock().unwrap_or_else(PoisonError::into_inner) = delay;
    }

    fn records(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, operation: &'static str, resource: &str) -> LockResult<()> {
        match *self.failure.lock().unwrap_or_else(PoisonError::into_inner) {
            Some(message) => Err(LockError::backing_store(operation, resource, message)),
            None => Ok(()),
        }
    }
}

impl LockStorage for MemoryStorage {
    const BACKEND: &'static str = "memory";

    async fn exists(&self, resource: &str) -> LockResult<LockState> {
        self.check("stat", resource)?;
        Ok(if self.contains(resource) {
            LockState::Locked
        } else {
            LockState::Unlocked
        })
    }

    async fn read(&self, resource: &str) -> LockResult<Vec<u8>> {
        self.check("read", resource)?;
        self.records()
            .get(resource)
            .cloned()
            .ok_or_else(|| LockError::backing_store("read", resource, "not found"))
    }

    async fn write(&self, resource: &str, body: Vec<u8>) -> LockResult<()> {
        self.check("write", resource)?;
        let delay = *self.write_delay.lock().unwrap_or_else(PoisonError::into_inner);
        if !delay.is_zero() {
            // a detached write still lands when the caller stops waiting
            let storage = self.clone();
            let resource = resource.to_string();
            return tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                storage.insert(&resource, body);
            })
            .await
            .map_err(|e| LockError::backing_store("write", "memory", e));
        }
        self.insert(resource, body);
        Ok(())
    }

    async fn remove(&self, resource: &str) -> LockResult<()> {
        self.check("remove", resource)?;
        self.records().remove(resource);
        Ok(())
    }

    fn uri(&self, resource: &str) -> String {
        resource.to_string()
    }
}
