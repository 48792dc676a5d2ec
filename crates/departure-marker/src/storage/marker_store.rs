//! Marker persistence keyed by content address.
//!
//! Stores hold markers verbatim and never validate them; callers verify on
//! the way in or out as they see fit.
//!
//! File format:
//! ```json
//! {
//!     "version": 1,
//!     "marker": { ... DepartureMarker ... }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::{MarkerError, Result};
use crate::marker::DepartureMarker;

const MARKER_FILE_VERSION: u32 = 1;

/// Persistence for whole markers.
pub trait MarkerStore {
    /// Store a marker under its `id`, replacing any previous copy.
    fn save(&self, marker: &DepartureMarker) -> Result<()>;

    fn load(&self, id: &str) -> Result<DepartureMarker>;

    /// Stored ids in ascending order.
    fn list(&self) -> Result<Vec<String>>;

    /// Remove a marker. Missing ids are not an error.
    fn delete(&self, id: &str) -> Result<()>;

    fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.list()?.iter().any(|stored| stored == id))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct MarkerFile {
    version: u32,
    marker: DepartureMarker,
}

/// One JSON file per marker under a base directory.
pub struct FileMarkerStore {
    base_dir: PathBuf,
}

impl FileMarkerStore {
    /// Open a store, creating `base_dir` if needed.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn marker_path(&self, id: &str) -> Result<PathBuf> {
        super::record_path(&self.base_dir, "marker", id)
    }
}

impl MarkerStore for FileMarkerStore {
    fn save(&self, marker: &DepartureMarker) -> Result<()> {
        let path = self.marker_path(&marker.id)?;
        let file = MarkerFile {
            version: MARKER_FILE_VERSION,
            marker: marker.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        super::key_file::write_atomic(&path, json.as_bytes())
    }

    fn load(&self, id: &str) -> Result<DepartureMarker> {
        let path = self.marker_path(id)?;
        if !path.exists() {
            return Err(MarkerError::NotFound(format!("marker not found: {id}")));
        }
        let bytes = std::fs::read(&path)?;
        let file: MarkerFile = serde_json::from_slice(&bytes).map_err(|e| {
            MarkerError::InvalidFileFormat(format!(
                "failed to parse marker file {}: {e}",
                path.display()
            ))
        })?;
        Ok(file.marker)
    }

    fn list(&self) -> Result<Vec<String>> {
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

    fn delete(&self, id: &str) -> Result<()> {
        match std::fs::remove_file(self.marker_path(id)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MarkerError::Io(e)),
        }
    }

    fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.marker_path(id).map(|p| p.exists()).unwrap_or(false))
    }
}

/// In-memory store.
#[derive(Default)]
pub struct MemoryMarkerStore {
    markers: RwLock<BTreeMap<String, DepartureMarker>>,
}

impl MemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MarkerStore for MemoryMarkerStore {
    fn save(&self, marker: &DepartureMarker) -> Result<()> {
        let mut markers = self.markers.write().unwrap_or_else(|e| e.into_inner());
        markers.insert(marker.id.clone(), marker.clone());
        Ok(())
    }

    fn load(&self, id: &str) -> Result<DepartureMarker> {
        let markers = self.markers.read().unwrap_or_else(|e| e.into_inner());
        markers
            .get(id)
            .cloned()
            .ok_or_else(|| MarkerError::NotFound(format!("marker not found: {id}")))
    }

    fn list(&self) -> Result<Vec<String>> {
        let markers = self.markers.read().unwrap_or_else(|e| e.into_inner());
        Ok(markers.keys().cloned().collect())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut markers = self.markers.write().unwrap_or_else(|e| e.into_inner());
        markers.remove(id);
        Ok(())
    }
}
