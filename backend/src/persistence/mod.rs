use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::{AppConfig, StorageKind};
use crate::models::{RegistryData, UnknownVariant};
use crate::registry::Registry;

mod pg;
pub mod schema;

pub use pg::PgSnapshot;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("database connection error: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("corrupt stored record: {0}")]
    Corrupt(#[from] UnknownVariant),

    #[error("storage task failed: {0}")]
    Task(String),

    #[error("STORAGE=postgres requires DATABASE_URL")]
    MissingDatabaseUrl,
}

/// Where the registry snapshot lives between runs.
#[derive(Debug, Clone)]
pub enum Persistence {
    Memory,
    JsonFile(PathBuf),
    Postgres(PgSnapshot),
}

impl Persistence {
    pub fn from_config(config: &AppConfig) -> Result<Self, StorageError> {
        match config.storage {
            StorageKind::Memory => Ok(Persistence::Memory),
            StorageKind::Json => Ok(Persistence::JsonFile(PathBuf::from(&config.data_file))),
            StorageKind::Postgres => config
                .database_url
                .as_deref()
                .filter(|url| !url.is_empty())
                .map(|url| Persistence::Postgres(PgSnapshot::new(url)))
                .ok_or(StorageError::MissingDatabaseUrl),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Persistence::Memory => "memory".to_string(),
            Persistence::JsonFile(path) => format!("json file {}", path.display()),
            Persistence::Postgres(_) => "postgres".to_string(),
        }
    }

    /// `Ok(None)` when there is nothing stored yet.
    pub fn load(&self) -> Result<Option<RegistryData>, StorageError> {
        match self {
            Persistence::Memory => Ok(None),
            Persistence::JsonFile(path) => {
                if !path.exists() {
                    return Ok(None);
                }
                let raw = fs::read_to_string(path)?;
                Ok(Some(serde_json::from_str(&raw)?))
            }
            Persistence::Postgres(pg) => pg.load().map(Some),
        }
    }

    pub fn save(&self, data: &RegistryData) -> Result<(), StorageError> {
        match self {
            Persistence::Memory => Ok(()),
            Persistence::JsonFile(path) => write_json(path, data),
            Persistence::Postgres(pg) => pg.save(data),
        }
    }
}

// Write next to the target and rename over it so a crash mid-write never
// leaves a truncated data file.
fn write_json(path: &Path, data: &RegistryData) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(data)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Saves the registry when it changed since the last flush. Returns whether
/// anything was written; on failure the registry stays dirty for the next try.
pub async fn flush(registry: &Registry, persistence: &Arc<Persistence>) -> Result<bool, StorageError> {
    if !registry.take_dirty() {
        return Ok(false);
    }
    if let Persistence::Memory = persistence.as_ref() {
        return Ok(false);
    }

    let snapshot = registry.snapshot().await;
    let target = Arc::clone(persistence);
    let outcome = match tokio::task::spawn_blocking(move || target.save(&snapshot)).await {
        Ok(result) => result,
        Err(e) => Err(StorageError::Task(e.to_string())),
    };
    if outcome.is_err() {
        registry.mark_dirty();
    }
    outcome.map(|_| true)
}

pub fn spawn_flush_loop(
    registry: Arc<Registry>,
    persistence: Arc<Persistence>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match flush(&registry, &persistence).await {
                Ok(true) => log::debug!("Registry flushed to {}", persistence.describe()),
                Ok(false) => {}
                Err(e) => log::error!("Registry flush failed, retrying next tick: {}", e),
            }
        }
    })
}
