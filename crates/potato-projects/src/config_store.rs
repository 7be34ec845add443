use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use potato_core::write_bytes_atomic;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("failed to read active configuration {location}: {source}")]
    Read {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write active configuration {location}: {message}")]
    Write { location: String, message: String },
}

/// The single active-configuration slot consumed by the annotation service.
///
/// Writes replace the previous content in full; nothing is merged or archived.
pub trait ActiveConfigStore: Send + Sync {
    /// Human-readable location used in logs and error messages.
    fn location(&self) -> String;

    /// `Ok(None)` when no active configuration exists.
    fn read_active(&self) -> Result<Option<Vec<u8>>, ConfigStoreError>;

    fn write_active(&self, content: &[u8]) -> Result<(), ConfigStoreError>;
}

/// Active configuration stored at a fixed filesystem path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsActiveConfigStore {
    path: PathBuf,
}

impl FsActiveConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ActiveConfigStore for FsActiveConfigStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn read_active(&self) -> Result<Option<Vec<u8>>, ConfigStoreError> {
        match std::fs::read(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ConfigStoreError::Read {
                location: self.location(),
                source,
            }),
        }
    }

    fn write_active(&self, content: &[u8]) -> Result<(), ConfigStoreError> {
        write_bytes_atomic(&self.path, content).map_err(|error| ConfigStoreError::Write {
            location: self.location(),
            message: format!("{error:#}"),
        })
    }
}

/// In-memory implementation for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryActiveConfigStore {
    inner: Mutex<InMemoryActiveConfig>,
}

#[derive(Debug, Default)]
struct InMemoryActiveConfig {
    content: Option<Vec<u8>>,
    write_count: usize,
    write_failure: Option<String>,
}

impl InMemoryActiveConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: impl Into<Vec<u8>>) -> Self {
        let store = Self::default();
        store.state().content = Some(content.into());
        store
    }

    fn state(&self) -> MutexGuard<'_, InMemoryActiveConfig> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn content(&self) -> Option<Vec<u8>> {
        self.state().content.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state().write_count
    }

    /// Makes every subsequent write fail with `message`.
    pub fn fail_writes(&self, message: impl Into<String>) {
        self.state().write_failure = Some(message.into());
    }
}

impl ActiveConfigStore for InMemoryActiveConfigStore {
    fn location(&self) -> String {
        "memory://active-config".to_string()
    }

    fn read_active(&self) -> Result<Option<Vec<u8>>, ConfigStoreError> {
        Ok(self.state().content.clone())
    }

    fn write_active(&self, content: &[u8]) -> Result<(), ConfigStoreError> {
        let mut state = self.state();
        if let Some(message) = state.write_failure.clone() {
            return Err(ConfigStoreError::Write {
                location: self.location(),
                message,
            });
        }
        state.content = Some(content.to_vec());
        state.write_count = state.write_count.saturating_add(1);
        Ok(())
    }
}
