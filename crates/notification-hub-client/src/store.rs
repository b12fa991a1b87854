//! Local record of native registrations made from this device.
//!
//! The hub decides nothing about which installation belongs to a device;
//! the client remembers the id it wrote so `revoke` can delete it later.

use crate::error::HubError;
use crate::types::NativeRegistration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, warn};

/// Native registrations indexed by namespace endpoint and hub path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registrations {
    records: HashMap<String, NativeRegistration>,
}

impl Registrations {
    /// Create an empty set of registrations.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Get the registration for a hub.
    pub fn get(&self, endpoint: &str, hub_path: &str) -> Option<&NativeRegistration> {
        self.records.get(&key(endpoint, hub_path))
    }

    /// Insert or replace the registration for a hub.
    pub fn insert(&mut self, endpoint: &str, record: NativeRegistration) {
        let key = key(endpoint, &record.notification_hub_path);
        self.records.insert(key, record);
    }

    /// Forget the registration for a hub.
    pub fn remove(&mut self, endpoint: &str, hub_path: &str) -> Option<NativeRegistration> {
        self.records.remove(&key(endpoint, hub_path))
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }
}

fn key(endpoint: &str, hub_path: &str) -> String {
    format!("{}|{}", endpoint.to_lowercase(), hub_path.to_lowercase())
}

/// JSON file persistence.
pub struct FileStore {
    storage_path: PathBuf,
}

impl FileStore {
    pub fn new(storage_path: PathBuf) -> Self {
        Self { storage_path }
    }

    /// Save registrations, writing atomically via temp file + rename.
    pub async fn save(&self, registrations: &Registrations) -> Result<(), HubError> {
        let data = serde_json::to_vec_pretty(registrations)?;

        if let Some(parent) = self.storage_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.storage_path.with_extension("tmp");
        fs::write(&temp_path, &data).await?;
        fs::rename(&temp_path, &self.storage_path).await?;

        debug!(
            "Saved {} registrations to {:?}",
            registrations.count(),
            self.storage_path
        );
        Ok(())
    }

    /// Load registrations. A missing file yields an empty set.
    pub async fn load(&self) -> Result<Registrations, HubError> {
        if !fs::try_exists(&self.storage_path).await.unwrap_or(false) {
            info!(
                "Registration file not found at {:?}, starting empty",
                self.storage_path
            );
            return Ok(Registrations::new());
        }

        let data = fs::read(&self.storage_path).await?;
        match serde_json::from_slice::<Registrations>(&data) {
            Ok(registrations) => {
                info!(
                    "Loaded {} registrations from {:?}",
                    registrations.count(),
                    self.storage_path
                );
                Ok(registrations)
            }
            Err(e) => {
                warn!("Registration file unreadable ({}), starting empty", e);
                Ok(Registrations::new())
            }
        }
    }
}

/// No persistence: registrations live as long as the process.
pub struct MemoryStore;

impl MemoryStore {
    pub async fn save(&self, _registrations: &Registrations) -> Result<(), HubError> {
        debug!("Memory store: save is a no-op");
        Ok(())
    }

    pub async fn load(&self) -> Result<Registrations, HubError> {
        Ok(Registrations::new())
    }
}

/// Storage backend for native registrations.
pub enum Store {
    File(FileStore),
    Memory(MemoryStore),
}

impl Store {
    pub fn file(storage_path: PathBuf) -> Self {
        Store::File(FileStore::new(storage_path))
    }

    pub fn memory() -> Self {
        Store::Memory(MemoryStore)
    }

    pub async fn save(&self, registrations: &Registrations) -> Result<(), HubError> {
        match self {
            Store::File(s) => s.save(registrations).await,
            Store::Memory(s) => s.save(registrations).await,
        }
    }

    pub async fn load(&self) -> Result<Registrations, HubError> {
        match self {
            Store::File(s) => s.load().await,
            Store::Memory(s) => s.load().await,
        }
    }
}
