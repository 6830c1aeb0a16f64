//! Persistence of the single session token string.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::ConsoleError;

pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, ConsoleError>;
    fn save(&self, token: &str) -> Result<(), ConsoleError>;
    fn clear(&self) -> Result<(), ConsoleError>;
}

/// Token kept in a plain file between CLI invocations.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, ConsoleError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, token: &str) -> Result<(), ConsoleError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), ConsoleError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, ConsoleError> {
        let guard = self
            .token
            .lock()
            .map_err(|e| ConsoleError::Storage(e.to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, token: &str) -> Result<(), ConsoleError> {
        let mut guard = self
            .token
            .lock()
            .map_err(|e| ConsoleError::Storage(e.to_string()))?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), ConsoleError> {
        let mut guard = self
            .token
            .lock()
            .map_err(|e| ConsoleError::Storage(e.to_string()))?;
        *guard = None;
        Ok(())
    }
}
