//! Persisted run state for incremental processing.
//!
//! The manifest records what the previous run saw so the next run can skip
//! unchanged work: per-anim content hashes, which library files each script
//! depends on, and processed timestamps. It is stored as JSON in
//! `.gmlforge-state.json` inside the project's `assistant` directory.
//!
//! # Manifest Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "anim_hashes": { "bair": "9f86d081..." },
//!   "injection_clients": {
//!     "scripts/attacks/bair.gml": ["assistant/.inject/attacks.gml"]
//!   },
//!   "processed_at": { "anims/bair.aseprite": 1724500000 },
//!   "scripts_processed_at": 1724500000
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::warn;

/// Current manifest format version.
const MANIFEST_VERSION: u32 = 1;

/// Directory under the project root holding assistant-owned files.
pub const ASSISTANT_FOLDER: &str = "assistant";

/// Manifest filename inside the assistant directory.
pub const MANIFEST_FILENAME: &str = ".gmlforge-state.json";

/// Error during manifest operations.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persisted state from the previous run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Manifest format version
    pub version: u32,
    /// Per-anim frame content hashes
    #[serde(default)]
    pub anim_hashes: HashMap<String, String>,
    /// Script path -> library source files it was last injected from
    #[serde(default)]
    pub injection_clients: HashMap<PathBuf, Vec<PathBuf>>,
    /// Per-file processed timestamps (unix seconds)
    #[serde(default)]
    pub processed_at: HashMap<PathBuf, u64>,
    /// When scripts as a whole were last processed
    #[serde(default)]
    pub scripts_processed_at: Option<u64>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            anim_hashes: HashMap::new(),
            injection_clients: HashMap::new(),
            processed_at: HashMap::new(),
            scripts_processed_at: None,
        }
    }
}

impl Manifest {
    /// Load the manifest from the assistant directory.
    ///
    /// A missing file yields a default manifest; an unreadable or
    /// version-mismatched one is discarded with a warning, since losing the
    /// cache only costs a full reprocess.
    pub fn load_from_dir(dir: &Path) -> Self {
        let path = dir.join(MANIFEST_FILENAME);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str::<Manifest>(&contents) {
            Ok(manifest) if manifest.version == MANIFEST_VERSION => manifest,
            Ok(manifest) => {
                warn!(
                    "state file version {} != {}; starting fresh",
                    manifest.version, MANIFEST_VERSION
                );
                Self::default()
            }
            Err(e) => {
                warn!("could not parse state file {}: {}; starting fresh", path.display(), e);
                Self::default()
            }
        }
    }

    /// Write the manifest into the assistant directory.
    pub fn save_to_dir(&self, dir: &Path) -> Result<(), ManifestError> {
        fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(dir.join(MANIFEST_FILENAME), json)?;
        Ok(())
    }

    pub fn anim_hash(&self, name: &str) -> Option<&str> {
        self.anim_hashes.get(name).map(String::as_str)
    }

    pub fn record_anim_hash(&mut self, name: &str, hash: &str) {
        self.anim_hashes.insert(name.to_string(), hash.to_string());
    }

    /// Record which library files a script was supplied from.
    pub fn set_injection_sources(&mut self, script: &Path, sources: Vec<PathBuf>) {
        if sources.is_empty() {
            self.injection_clients.remove(script);
        } else {
            self.injection_clients.insert(script.to_path_buf(), sources);
        }
    }

    /// Scripts recorded as depending on the given library file.
    pub fn clients_for_injection(&self, library_file: &Path) -> Vec<PathBuf> {
        self.injection_clients
            .iter()
            .filter(|(_, sources)| sources.iter().any(|source| source == library_file))
            .map(|(script, _)| script.clone())
            .collect()
    }

    pub fn processed_time(&self, path: &Path) -> Option<u64> {
        self.processed_at.get(path).copied()
    }

    pub fn mark_processed(&mut self, path: &Path, when: u64) {
        self.processed_at.insert(path.to_path_buf(), when);
    }
}

/// Current time as unix seconds, for processed-at stamps.
pub fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Whether a file is fresh relative to a recorded processed time.
///
/// A file with no recorded time is always fresh.
pub fn is_fresh(modified: u64, processed: Option<u64>) -> bool {
    match processed {
        Some(processed) => modified > processed,
        None => true,
    }
}

/// Modification time of a path as unix seconds.
pub fn modified_time(path: &Path) -> std::io::Result<u64> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(modified.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut manifest = Manifest::default();
        manifest.record_anim_hash("bair", "abc123");
        manifest.set_injection_sources(
            Path::new("scripts/attacks/bair.gml"),
            vec![PathBuf::from("assistant/.inject/attacks.gml")],
        );
        manifest.mark_processed(Path::new("anims/bair.aseprite"), 100);
        manifest.save_to_dir(dir.path()).unwrap();

        let loaded = Manifest::load_from_dir(dir.path());
        assert_eq!(loaded.anim_hash("bair"), Some("abc123"));
        assert_eq!(
            loaded.clients_for_injection(Path::new("assistant/.inject/attacks.gml")),
            vec![PathBuf::from("scripts/attacks/bair.gml")]
        );
        assert_eq!(loaded.processed_time(Path::new("anims/bair.aseprite")), Some(100));
    }

    #[test]
    fn test_missing_file_yields_default() {
        let dir = TempDir::new().unwrap();
        let manifest = Manifest::load_from_dir(dir.path());
        assert!(manifest.anim_hashes.is_empty());
    }

    #[test]
    fn test_garbage_file_yields_default() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MANIFEST_FILENAME), "{not json").unwrap();
        let manifest = Manifest::load_from_dir(dir.path());
        assert!(manifest.anim_hashes.is_empty());
    }

    #[test]
    fn test_version_mismatch_resets() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(MANIFEST_FILENAME),
            r#"{"version": 99, "anim_hashes": {"bair": "abc"}}"#,
        )
        .unwrap();
        let manifest = Manifest::load_from_dir(dir.path());
        assert!(manifest.anim_hash("bair").is_none());
    }

    #[test]
    fn test_empty_sources_clear_client_entry() {
        let mut manifest = Manifest::default();
        let script = Path::new("scripts/a.gml");
        manifest.set_injection_sources(script, vec![PathBuf::from("lib.gml")]);
        manifest.set_injection_sources(script, vec![]);
        assert!(manifest.clients_for_injection(Path::new("lib.gml")).is_empty());
    }

    #[test]
    fn test_freshness_comparison() {
        assert!(is_fresh(10, None));
        assert!(is_fresh(10, Some(5)));
        assert!(!is_fresh(10, Some(10)));
        assert!(!is_fresh(10, Some(15)));
    }
}
