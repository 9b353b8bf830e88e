//! In-memory map from handle to managed app.
//!
//! Every mutation is a single write-lock critical section, so a `list()`
//! snapshot never sees a half-applied change. The lock is never held across
//! process or filesystem waits.

use crate::app::{AppSummary, ManagedApp};
use crate::FactoryError;
use df_supervisor::ProcessHandle;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct Registry {
    apps: Arc<RwLock<HashMap<Uuid, ManagedApp>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, app: ManagedApp) -> Result<(), FactoryError> {
        match self.apps.write().await.entry(app.handle) {
            Entry::Occupied(entry) => Err(FactoryError::DuplicateHandle(*entry.key())),
            Entry::Vacant(entry) => {
                entry.insert(app);
                Ok(())
            }
        }
    }

    pub async fn get(&self, handle: &Uuid) -> Result<AppSummary, FactoryError> {
        self.apps
            .read()
            .await
            .get(handle)
            .map(ManagedApp::summary)
            .ok_or(FactoryError::NotFound(*handle))
    }

    /// Erases the record if present. Safe to call on unknown handles.
    pub async fn remove(&self, handle: &Uuid) -> Option<ManagedApp> {
        self.apps.write().await.remove(handle)
    }

    /// Like `remove`, but an unknown handle is an error.
    pub async fn take(&self, handle: &Uuid) -> Result<ManagedApp, FactoryError> {
        self.remove(handle)
            .await
            .ok_or(FactoryError::NotFound(*handle))
    }

    /// Drops the live process from the record. Returns the process only to
    /// the one caller that performed the `running -> stopped` transition.
    pub async fn mark_stopped(&self, handle: &Uuid) -> Option<ProcessHandle> {
        self.apps
            .write()
            .await
            .get_mut(handle)
            .and_then(|app| app.process.take())
    }

    /// Snapshot of every record, oldest first.
    pub async fn list(&self) -> Vec<AppSummary> {
        let mut apps: Vec<AppSummary> = self
            .apps
            .read()
            .await
            .values()
            .map(ManagedApp::summary)
            .collect();
        apps.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.handle.cmp(&b.handle))
        });
        apps
    }

    pub async fn handles(&self) -> Vec<Uuid> {
        self.apps.read().await.keys().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.apps.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.apps.read().await.is_empty()
    }
}
