//! GML script files - content, freshness, and save-if-changed
//!
//! A script's `working_content` starts as a copy of what was read from disk
//! and is rewritten in place by the warning and injection passes; it is only
//! written back when it actually changed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{error, warn};

use crate::manifest::{self, Manifest};

/// Directory under the project root where scripts live.
pub const SCRIPTS_FOLDER: &str = "scripts";

/// One GML source file being processed this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub path: PathBuf,
    pub original_content: String,
    pub working_content: String,
    /// True when the file changed since the last processed stamp, or when a
    /// library file it depends on did.
    pub is_fresh: bool,
}

impl Script {
    pub fn read(path: &Path, processed: Option<u64>) -> io::Result<Self> {
        let original_content = fs::read_to_string(path)?;
        let modified = manifest::modified_time(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            working_content: original_content.clone(),
            original_content,
            is_fresh: manifest::is_fresh(modified, processed),
        })
    }

    /// Write the working content back, only if it changed.
    ///
    /// Empty content is never written; an injection pass that produced
    /// nothing should not wipe a file.
    pub fn save(&self) -> io::Result<()> {
        if self.working_content.is_empty() {
            warn!("not saving empty script {}", self.path.display());
            return Ok(());
        }
        if self.working_content != self.original_content {
            fs::write(&self.path, &self.working_content)?;
        }
        Ok(())
    }

    /// The script's base filename, used to match anims to attack scripts.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Read every `.gml` file under `<root>/<folder>`, sorted for determinism.
///
/// Freshness is judged against the global scripts-processed stamp, the same
/// way the previous run recorded it.
pub fn read_scripts(root_dir: &Path, folder: &str, manifest: &Manifest) -> Vec<Script> {
    let pattern = root_dir.join(folder).join("**/*.gml");
    let Ok(entries) = glob::glob(&pattern.to_string_lossy()) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries.flatten().collect();
    paths.sort();

    let mut scripts = Vec::new();
    for path in paths {
        match Script::read(&path, manifest.scripts_processed_at) {
            Ok(script) => scripts.push(script),
            Err(e) => error!("skipping {}: {}", path.display(), e),
        }
    }
    scripts
}

/// Save every modified script, logging failures without aborting.
pub fn save_scripts(scripts: &[Script]) -> usize {
    let mut failures = 0;
    for script in scripts {
        if let Err(e) = script.save() {
            error!("could not save {}: {}", script.path.display(), e);
            failures += 1;
        }
    }
    failures
}
