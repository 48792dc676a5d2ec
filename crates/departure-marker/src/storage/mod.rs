//! Storage adapters for keys, markers and key event logs.
//!
//! # Directory layout
//!
//! By convention the default root is `~/.departure/`:
//!
//! ```text
//! ~/.departure/
//! ├── keys/
//! │   └── {name}.dmk
//! ├── markers/
//! │   └── {id}.json
//! └── keylogs/
//!     └── {identifier}.json
//! ```
//!
//! # Modules
//!
//! - [`key_file`]: `.dmk` save/load with passphrase encryption.
//! - [`marker_store`]: the `MarkerStore` trait with file and memory backends.
//! - [`keylog_store`]: key event logs, replayed on load.

pub mod key_file;
pub mod keylog_store;
pub mod marker_store;

use std::path::{Path, PathBuf};

use crate::error::{MarkerError, Result};

pub use key_file::{load_keys, read_key_file, save_keys, KeyFile, StoredKeys};
pub use keylog_store::{load_log, save_log, KeyLogStore};
pub use marker_store::{FileMarkerStore, MarkerStore, MemoryMarkerStore};

/// Path of `{id}.json` under `dir`. Ids become file names, so only ASCII
/// alphanumerics are accepted.
pub(crate) fn record_path(dir: &Path, kind: &str, id: &str) -> Result<PathBuf> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(MarkerError::NotFound(format!("invalid {kind} id '{id}'")));
    }
    Ok(dir.join(format!("{id}.json")))
}
