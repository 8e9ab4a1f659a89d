use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use super::document::StoreDocument;
use crate::db::Database;

/// Where the root document lives between runs.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Raw stored value, possibly in an older layout.
    async fn load(&self) -> Result<Option<Value>>;
    async fn save(&self, document: &StoreDocument) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

#[async_trait]
impl DataStore for Database {
    async fn load(&self) -> Result<Option<Value>> {
        let Some(row) = self.load_document().await? else {
            return Ok(None);
        };
        let value = serde_json::from_str(&row.body)
            .with_context(|| format!("stored document (version {}) is not valid JSON", row.version))?;
        Ok(Some(value))
    }

    async fn save(&self, document: &StoreDocument) -> Result<()> {
        let body = serde_json::to_string(document).context("failed to serialize document")?;
        self.save_document(document.version, body, Utc::now()).await
    }

    async fn clear(&self) -> Result<()> {
        self.clear_document().await
    }
}

/// Keeps the document in memory. Writes can be made to fail to exercise
/// quota-style storage errors.
#[derive(Default)]
pub struct MemoryStore {
    value: Mutex<Option<Value>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an already stored value, e.g. a legacy layout.
    pub fn with_value(value: Value) -> Self {
        Self {
            value: Mutex::new(Some(value)),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn stored(&self) -> Option<Value> {
        self.guard().clone()
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, Option<Value>> {
        match self.value.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn load(&self) -> Result<Option<Value>> {
        Ok(self.stored())
    }

    async fn save(&self, document: &StoreDocument) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("storage quota exceeded");
        }
        let value = serde_json::to_value(document).context("failed to serialize document")?;
        *self.guard() = Some(value);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.guard() = None;
        Ok(())
    }
}
