//! Key event log persistence.
//!
//! A log is saved as its event list. Loading replays every event, so an
//! edited file is rejected rather than trusted.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MarkerError, Result};
use crate::keylog::{KeyEvent, KeyEventLog};

const KEYLOG_FILE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct KeyLogFile {
    version: u32,
    identifier: String,
    events: Vec<KeyEvent>,
}

/// One JSON file per log, named by identifier.
pub struct KeyLogStore {
    base_dir: PathBuf,
}

impl KeyLogStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn path_for(&self, identifier: &str) -> Result<PathBuf> {
        super::record_path(&self.base_dir, "key log", identifier)
    }

    pub fn save(&self, log: &KeyEventLog) -> Result<()> {
        save_log(&self.path_for(log.identifier())?, log)
    }

    pub fn load(&self, identifier: &str) -> Result<KeyEventLog> {
        let log = load_log(&self.path_for(identifier)?)?;
        if log.identifier() != identifier {
            return Err(MarkerError::InvalidFileFormat(format!(
                "file for {identifier} holds log {}",
                log.identifier()
            )));
        }
        Ok(log)
    }

    pub fn list(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.base_dir)? {
            let name = entry?.file_name();
            if let Some(stem) = name.to_string_lossy().strip_suffix(".json") {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

pub fn save_log(path: &Path, log: &KeyEventLog) -> Result<()> {
    let file = KeyLogFile {
        version: KEYLOG_FILE_VERSION,
        identifier: log.identifier().to_string(),
        events: log.events().to_vec(),
    };
    let json = serde_json::to_string_pretty(&file)?;
    super::key_file::write_atomic(path, json.as_bytes())
}

/// Read and fully replay a saved log.
pub fn load_log(path: &Path) -> Result<KeyEventLog> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => MarkerError::NotFound(format!("key log {}", path.display())),
        _ => MarkerError::Io(e),
    })?;
    let file: KeyLogFile = serde_json::from_slice(&bytes)
        .map_err(|e| MarkerError::InvalidFileFormat(format!("failed to parse key log: {e}")))?;
    if file.version != KEYLOG_FILE_VERSION {
        return Err(MarkerError::InvalidFileFormat(format!(
            "unsupported key log version {}",
            file.version
        )));
    }
    KeyEventLog::from_events(file.events)
}
