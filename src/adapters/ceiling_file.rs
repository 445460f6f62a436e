//! File-backed ceiling storage.
//!
//! The configured ceiling survives restarts as a single integer in a text
//! file. Writes go straight through to disk; a failure here is surfaced as
//! its own error category so the operator hears "your storage medium may be
//! failing" instead of a generic refusal.

use std::fs;
use std::path::PathBuf;

use crate::app::ports::{CeilingStore, StoreError};

pub struct FileCeilingStore {
    path: PathBuf,
}

impl FileCeilingStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CeilingStore for FileCeilingStore {
    fn load(&self) -> Result<u16, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound)
            }
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };
        text.trim().parse().map_err(|_| StoreError::Corrupted)
    }

    fn save(&self, ceiling: u16) -> Result<(), StoreError> {
        fs::write(&self.path, format!("{ceiling}\n")).map_err(|e| StoreError::Io(e.to_string()))
    }
}
