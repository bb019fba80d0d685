//! Aseprite file discovery and loading
//!
//! Finds `.ase`/`.aseprite` files under the project's `anims` directory and
//! parses each into its layers and anims. A file that fails to parse is
//! logged and skipped; the rest of the run continues.

use std::fs;
use std::path::{Path, PathBuf};

use log::error;
use thiserror::Error;

use crate::aseprite::anims::{derive_anims, Anim};
use crate::aseprite::layers::AsepriteLayers;
use crate::aseprite::loader::{ParseError, RawAsepriteFile};
use crate::aseprite::tags::TagColor;
use crate::manifest::{self, Manifest};

/// Directory under the project root where anim sources live.
pub const ANIMS_FOLDER: &str = "anims";

#[derive(Debug, Error)]
pub enum AsepriteFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

/// A discovered aseprite file with its parsed content.
#[derive(Debug, Clone)]
pub struct AsepriteFile {
    pub path: PathBuf,
    /// File stem, used as the anim name for untagged files.
    pub name: String,
    /// True when the file's mtime is newer than the recorded processed time.
    pub is_fresh: bool,
    pub raw: RawAsepriteFile,
    pub layers: AsepriteLayers,
    pub anims: Vec<Anim>,
}

impl AsepriteFile {
    pub fn load(
        path: &Path,
        anim_tag_colors: &[TagColor],
        window_tag_colors: &[TagColor],
        manifest: &mut Manifest,
    ) -> Result<Self, AsepriteFileError> {
        let data = fs::read(path)?;
        let raw = RawAsepriteFile::parse(&data)?;
        let layers = AsepriteLayers::from_file(&raw);

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let modified = manifest::modified_time(path)?;
        let is_fresh = manifest::is_fresh(modified, manifest.processed_time(path));

        let anims =
            derive_anims(&name, &raw, anim_tag_colors, window_tag_colors, is_fresh, manifest);

        Ok(Self { path: path.to_path_buf(), name, is_fresh, raw, layers, anims })
    }
}

/// Load every aseprite file under `<root>/anims`, skipping files that fail
/// to parse.
pub fn read_aseprites(
    root_dir: &Path,
    anim_tag_colors: &[TagColor],
    window_tag_colors: &[TagColor],
    manifest: &mut Manifest,
) -> Vec<AsepriteFile> {
    let mut files = Vec::new();
    for path in find_aseprite_paths(root_dir) {
        match AsepriteFile::load(&path, anim_tag_colors, window_tag_colors, manifest) {
            Ok(file) => files.push(file),
            Err(e) => error!("skipping {}: {}", path.display(), e),
        }
    }
    files
}

/// All aseprite source paths under the anims folder, sorted for determinism.
fn find_aseprite_paths(root_dir: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for extension in ["ase", "aseprite"] {
        let pattern = root_dir.join(ANIMS_FOLDER).join(format!("**/*.{extension}"));
        let Ok(entries) = glob::glob(&pattern.to_string_lossy()) else {
            continue;
        };
        paths.extend(entries.flatten());
    }
    paths.sort();
    paths
}
