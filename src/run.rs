//! Per-run orchestration
//!
//! One run reads the manifest and config, discovers scripts and aseprite
//! sources, then processes the two halves of the pipeline: the script half
//! (warnings, injection, save) and the anim half (spritesheet export). The
//! `--mode` flag gates which halves run; discovery always happens so the
//! script half can see anim windows. Processed stamps are only advanced for
//! the halves that actually ran.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use crate::aseprite::anims::Anim;
use crate::aseprite::files::{read_aseprites, ANIMS_FOLDER};
use crate::assets::supply_missing_sprites;
use crate::codegen::handle_codegen;
use crate::config::loader::default_config_text;
use crate::config::{load_config, ConfigError, CONFIG_FILENAME};
use crate::export::{export_aseprites, ExportError, SPRITES_FOLDER};
use crate::inject::library::{library_file_paths, LIBRARY_FOLDERS};
use crate::inject::{apply_injection, read_injection_library, LibraryError};
use crate::manifest::{self, Manifest, ManifestError, ASSISTANT_FOLDER};
use crate::scripts::{read_scripts, save_scripts, Script, SCRIPTS_FOLDER};
use crate::warnings::handle_warnings;

/// Which halves of the pipeline to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    All,
    Anims,
    Scripts,
}

impl Mode {
    fn includes_scripts(self) -> bool {
        matches!(self, Mode::All | Mode::Scripts)
    }

    fn includes_anims(self) -> bool {
        matches!(self, Mode::All | Mode::Anims)
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Library(#[from] LibraryError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("could not set up project structure: {0}")]
    Setup(#[from] io::Error),
}

/// What a run did, reported to the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    /// The assistant folder did not exist yet; it was scaffolded and the run
    /// stopped so the user can edit the config first.
    pub first_run: bool,
    pub scripts_processed: usize,
    pub script_saves_failed: usize,
    pub anims_found: usize,
    pub exports_failed: usize,
    pub sprites_supplied: usize,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.script_saves_failed == 0 && self.exports_failed == 0
    }
}

/// Run the assistant over one project.
pub async fn run_project(root_dir: &Path, mode: Mode) -> Result<RunOutcome, RunError> {
    let state_dir = root_dir.join(ASSISTANT_FOLDER);
    if !state_dir.exists() {
        make_basic_folder_structure(root_dir)?;
        info!("created {} for first-time setup", state_dir.display());
        return Ok(RunOutcome { first_run: true, ..RunOutcome::default() });
    }

    let mut manifest = Manifest::load_from_dir(&state_dir);
    let config = load_config(root_dir)?;

    let library_paths = library_file_paths(root_dir);
    let library = read_injection_library(root_dir)?;
    let mut scripts = read_scripts(root_dir, SCRIPTS_FOLDER, &manifest);
    refresh_injection_clients(&mut scripts, &library_paths, &manifest);

    let anim_colors = config.anim_tag_colors();
    let window_colors = config.window_tag_colors();
    let files = read_aseprites(root_dir, &anim_colors, &window_colors, &mut manifest);
    let anims: Vec<Anim> = files.iter().flat_map(|file| file.anims.iter().cloned()).collect();

    let mut outcome = RunOutcome { anims_found: anims.len(), ..RunOutcome::default() };

    if mode.includes_scripts() {
        handle_warnings(&mut scripts);
        handle_codegen(&mut scripts);
        apply_injection(&mut scripts, &library, &anims, &mut manifest);
        outcome.scripts_processed = scripts.iter().filter(|script| script.is_fresh).count();
        outcome.script_saves_failed = save_scripts(&scripts);
        // Stamp after saving, so a save landing in a later second can't
        // leave the written file ahead of the stamp.
        let now = manifest::unix_now();
        manifest.scripts_processed_at = Some(now);
        for path in &library_paths {
            manifest.mark_processed(path, now);
        }
    }

    if mode.includes_anims() {
        outcome.exports_failed = export_aseprites(&files, &config, root_dir).await?;
        let now = manifest::unix_now();
        for file in &files {
            manifest.mark_processed(&file.path, now);
        }
    }

    outcome.sprites_supplied = supply_missing_sprites(root_dir, &scripts);
    manifest.save_to_dir(&state_dir)?;

    info!(
        "run complete: {} scripts processed, {} anims found, {} sprites supplied",
        outcome.scripts_processed, outcome.anims_found, outcome.sprites_supplied
    );
    Ok(outcome)
}

/// A fresh library file re-freshens every script recorded as its client, so
/// an edited snippet propagates even when the scripts themselves are
/// unchanged.
fn refresh_injection_clients(
    scripts: &mut [Script],
    library_paths: &[PathBuf],
    manifest: &Manifest,
) {
    for path in library_paths {
        let Ok(modified) = manifest::modified_time(path) else {
            continue;
        };
        if !manifest::is_fresh(modified, manifest.processed_time(path)) {
            continue;
        }
        for client in manifest.clients_for_injection(path) {
            if let Some(script) = scripts.iter_mut().find(|script| script.path == client) {
                script.is_fresh = true;
            }
        }
    }
}

/// Create the folders and default config a project needs before the first
/// real run.
fn make_basic_folder_structure(root_dir: &Path) -> io::Result<()> {
    for folder in LIBRARY_FOLDERS {
        fs::create_dir_all(root_dir.join(folder))?;
    }
    for folder in [SCRIPTS_FOLDER, ANIMS_FOLDER, SPRITES_FOLDER] {
        fs::create_dir_all(root_dir.join(folder))?;
    }
    let config_path = root_dir.join(ASSISTANT_FOLDER).join(CONFIG_FILENAME);
    if !config_path.exists() {
        fs::write(config_path, default_config_text())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inject::INJECTION_START_HEADER;
    use crate::manifest::MANIFEST_FILENAME;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(ASSISTANT_FOLDER)).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_first_run_scaffolds_and_stops() {
        let dir = TempDir::new().unwrap();
        let outcome = run_project(dir.path(), Mode::All).await.unwrap();
        assert!(outcome.first_run);
        assert!(dir.path().join(ASSISTANT_FOLDER).join(CONFIG_FILENAME).exists());
        assert!(dir.path().join("assistant").join(".inject").exists());
        assert!(dir.path().join(SCRIPTS_FOLDER).exists());

        let again = run_project(dir.path(), Mode::All).await.unwrap();
        assert!(!again.first_run);
    }

    #[tokio::test]
    async fn test_scripts_half_injects_and_saves() {
        let dir = project();
        let inject_dir = dir.path().join("assistant").join(".inject");
        fs::create_dir_all(&inject_dir).unwrap();
        fs::write(inject_dir.join("math.gml"), "#define double(x)\n    return x * 2").unwrap();
        let scripts_dir = dir.path().join(SCRIPTS_FOLDER);
        fs::create_dir_all(&scripts_dir).unwrap();
        fs::write(scripts_dir.join("init.gml"), "value = double(2)").unwrap();

        let outcome = run_project(dir.path(), Mode::All).await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.scripts_processed, 1);

        let saved = fs::read_to_string(scripts_dir.join("init.gml")).unwrap();
        assert!(saved.contains(INJECTION_START_HEADER));
        assert!(saved.contains("#define double(x)"));

        let manifest = Manifest::load_from_dir(&dir.path().join(ASSISTANT_FOLDER));
        assert!(manifest.scripts_processed_at.is_some());
        assert_eq!(
            manifest.clients_for_injection(&inject_dir.join("math.gml")),
            vec![scripts_dir.join("init.gml")]
        );
    }

    #[tokio::test]
    async fn test_scripts_half_expands_seeds() {
        let dir = project();
        let scripts_dir = dir.path().join(SCRIPTS_FOLDER);
        fs::create_dir_all(&scripts_dir).unwrap();
        fs::write(scripts_dir.join("update.gml"), "$foreach enemies$").unwrap();

        run_project(dir.path(), Mode::All).await.unwrap();
        let saved = fs::read_to_string(scripts_dir.join("update.gml")).unwrap();
        assert!(saved.contains("for (var enemies_item_i = 0;"));
        assert!(!saved.contains('$'));
    }

    #[tokio::test]
    async fn test_scripts_stamp_is_not_behind_saved_files() {
        let dir = project();
        let scripts_dir = dir.path().join(SCRIPTS_FOLDER);
        fs::create_dir_all(&scripts_dir).unwrap();
        let path = scripts_dir.join("update.gml");
        fs::write(&path, "x = view_get_xview(0)").unwrap();

        run_project(dir.path(), Mode::All).await.unwrap();
        let manifest = Manifest::load_from_dir(&dir.path().join(ASSISTANT_FOLDER));
        let stamp = manifest.scripts_processed_at.unwrap();
        assert!(stamp >= manifest::modified_time(&path).unwrap());
    }

    #[tokio::test]
    async fn test_anims_mode_leaves_scripts_alone() {
        let dir = project();
        let scripts_dir = dir.path().join(SCRIPTS_FOLDER);
        fs::create_dir_all(&scripts_dir).unwrap();
        fs::write(scripts_dir.join("update.gml"), "x = view_get_xview(0)").unwrap();

        let outcome = run_project(dir.path(), Mode::Anims).await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(
            fs::read_to_string(scripts_dir.join("update.gml")).unwrap(),
            "x = view_get_xview(0)"
        );
        let manifest = Manifest::load_from_dir(&dir.path().join(ASSISTANT_FOLDER));
        assert!(manifest.scripts_processed_at.is_none());
    }

    #[tokio::test]
    async fn test_manifest_is_written() {
        let dir = project();
        run_project(dir.path(), Mode::All).await.unwrap();
        assert!(dir.path().join(ASSISTANT_FOLDER).join(MANIFEST_FILENAME).exists());
    }

    #[test]
    fn test_fresh_library_refreshens_clients() {
        let dir = project();
        let library = dir.path().join("lib.gml");
        fs::write(&library, "#macro A 1").unwrap();

        let mut manifest = Manifest::default();
        manifest.set_injection_sources(Path::new("scripts/a.gml"), vec![library.clone()]);
        manifest.mark_processed(&library, 0);

        let mut scripts = [Script {
            path: PathBuf::from("scripts/a.gml"),
            original_content: String::new(),
            working_content: String::new(),
            is_fresh: false,
        }];
        refresh_injection_clients(&mut scripts, &[library], &manifest);
        assert!(scripts[0].is_fresh);
    }

    #[test]
    fn test_already_processed_library_does_not_refreshen() {
        let dir = project();
        let library = dir.path().join("lib.gml");
        fs::write(&library, "#macro A 1").unwrap();

        let mut manifest = Manifest::default();
        manifest.set_injection_sources(Path::new("scripts/a.gml"), vec![library.clone()]);
        manifest.mark_processed(&library, u64::MAX);

        let mut scripts = [Script {
            path: PathBuf::from("scripts/a.gml"),
            original_content: String::new(),
            working_content: String::new(),
            is_fresh: false,
        }];
        refresh_injection_clients(&mut scripts, &[library], &manifest);
        assert!(!scripts[0].is_fresh);
    }
}
