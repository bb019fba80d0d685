//! Export planning and subprocess fan-out
//!
//! Each fresh anim becomes a set of export jobs: the normal layers, each
//! `SPLIT(...)` group alone, each `OPT(...)` group on top of the normals,
//! and a `_hurt` mask sibling for anims that request one. Jobs run as
//! concurrent Aseprite subprocesses; a failed job is logged and does not
//! stop its siblings. Within one job, stale strip deletion always precedes
//! the export itself.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, warn};
use thiserror::Error;
use tokio::process::Command;
use tokio::task::JoinSet;

use crate::aseprite::anims::Anim;
use crate::aseprite::files::{AsepriteFile, ANIMS_FOLDER};
use crate::aseprite::layers::AsepriteLayers;
use crate::config::AssistantConfig;
use crate::export::lua::{supply_lua_scripts, LuaScripts};
use crate::manifest::ASSISTANT_FOLDER;

/// Directory under the project root where exported strips land.
pub const SPRITES_FOLDER: &str = "sprites";

const BASE_SCALE: u32 = 2;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not prepare export: {0}")]
    Io(#[from] std::io::Error),
}

/// One planned Aseprite invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ExportJob {
    source: PathBuf,
    dest: PathBuf,
    /// Output name without the `_strip<n>.png` suffix, also the stale-file
    /// cleanup key.
    dest_name: String,
    /// 1-based inclusive frame range.
    start_frame: u32,
    end_frame: u32,
    scale: u32,
    /// 1-based layer indices, comma-joined. Empty means all layers.
    target_layers: String,
    script: PathBuf,
    hurtbox_layer: Option<usize>,
    hurtmask_layer: Option<usize>,
}

impl ExportJob {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("filename", self.source.display().to_string()),
            ("dest", self.dest.display().to_string()),
            ("startFrame", self.start_frame.to_string()),
            ("endFrame", self.end_frame.to_string()),
            ("scale", self.scale.to_string()),
            ("targetLayers", self.target_layers.clone()),
        ];
        if let Some(index) = self.hurtbox_layer {
            params.push(("hurtboxLayer", index.to_string()));
        }
        if let Some(index) = self.hurtmask_layer {
            params.push(("hurtmaskLayer", index.to_string()));
        }
        params
    }
}

/// Export every fresh anim of every file. Returns the number of failed
/// invocations; setup failures (script supply, directory creation) are the
/// only hard errors.
pub async fn export_aseprites(
    files: &[AsepriteFile],
    config: &AssistantConfig,
    root_dir: &Path,
) -> Result<usize, ExportError> {
    let Some(program) = config.aseprite_path.clone() else {
        warn!("no aseprite_path configured, sprite export disabled");
        return Ok(0);
    };

    let lua = supply_lua_scripts(&root_dir.join(ASSISTANT_FOLDER))?;
    let sprites_dir = root_dir.join(SPRITES_FOLDER);
    fs::create_dir_all(&sprites_dir)?;

    let mut jobs = Vec::new();
    for file in files {
        jobs.extend(plan_file_exports(file, config, root_dir, &sprites_dir, &lua));
    }

    let mut set = JoinSet::new();
    for job in jobs {
        let program = program.clone();
        let sprites_dir = sprites_dir.clone();
        set.spawn(async move { run_export(&program, &sprites_dir, &job).await });
    }

    let mut failures = 0;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(message)) => {
                error!("{message}");
                failures += 1;
            }
            Err(e) => {
                error!("export task failed: {e}");
                failures += 1;
            }
        }
    }
    Ok(failures)
}

fn plan_file_exports(
    file: &AsepriteFile,
    config: &AssistantConfig,
    root_dir: &Path,
    sprites_dir: &Path,
    lua: &LuaScripts,
) -> Vec<ExportJob> {
    let prefix = subfolder_prefix(&file.path, &root_dir.join(ANIMS_FOLDER));
    let variants = layer_variants(&file.layers);

    let mut jobs = Vec::new();
    for anim in file.anims.iter().filter(|anim| anim.is_fresh) {
        let base = match prefix.as_str() {
            "" => anim.save_name(),
            prefix => format!("{prefix}_{}", anim.save_name()),
        };
        let frames = anim.num_frames();

        for variant in &variants {
            let name = match &variant.suffix {
                Some(suffix) => format!("{base}_{suffix}"),
                None => base.clone(),
            };
            jobs.push(ExportJob {
                source: file.path.clone(),
                dest: sprites_dir.join(format!("{name}_strip{frames}.png")),
                dest_name: name.clone(),
                start_frame: u32::from(anim.start) + 1,
                end_frame: u32::from(anim.end) + 1,
                scale: sheet_scale(anim, config),
                target_layers: layer_csv(&variant.layers),
                script: lua.sheet.clone(),
                hurtbox_layer: None,
                hurtmask_layer: None,
            });

            if config.hurtboxes_enabled && anim.gets_hurtbox() {
                let name = format!("{name}_hurt");
                jobs.push(ExportJob {
                    source: file.path.clone(),
                    dest: sprites_dir.join(format!("{name}_strip{frames}.png")),
                    dest_name: name,
                    start_frame: u32::from(anim.start) + 1,
                    end_frame: u32::from(anim.end) + 1,
                    scale: mask_scale(config),
                    target_layers: layer_csv(&variant.layers),
                    script: lua.hurtmask.clone(),
                    hurtbox_layer: file.layers.hurtbox.as_ref().map(|layer| layer.index + 1),
                    hurtmask_layer: file.layers.hurtmask.as_ref().map(|layer| layer.index + 1),
                });
            }
        }
    }
    jobs
}

#[derive(Debug, Clone)]
struct LayerVariant {
    suffix: Option<String>,
    /// 0-based layer indices.
    layers: Vec<usize>,
}

fn layer_variants(layers: &AsepriteLayers) -> Vec<LayerVariant> {
    let normals: Vec<usize> = layers.normals.iter().map(|layer| layer.index).collect();
    let mut variants = vec![LayerVariant { suffix: None, layers: normals.clone() }];

    for (key, group) in &layers.splits {
        variants.push(LayerVariant {
            suffix: Some(key.clone()),
            layers: group.iter().map(|layer| layer.index).collect(),
        });
    }
    for (key, group) in &layers.opts {
        let mut combined = normals.clone();
        combined.extend(group.iter().map(|layer| layer.index));
        combined.sort_unstable();
        variants.push(LayerVariant { suffix: Some(key.clone()), layers: combined });
    }
    variants
}

fn layer_csv(indices: &[usize]) -> String {
    indices.iter().map(|index| (index + 1).to_string()).collect::<Vec<_>>().join(",")
}

/// `_`-joined subfolder names between the anims root and the file, so
/// same-named files in different folders export to distinct names.
fn subfolder_prefix(file_path: &Path, anims_root: &Path) -> String {
    let Ok(relative) = file_path.strip_prefix(anims_root) else {
        return String::new();
    };
    let Some(parent) = relative.parent() else {
        return String::new();
    };
    parent
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("_")
}

fn sheet_scale(anim: &Anim, config: &AssistantConfig) -> u32 {
    let mut scale = BASE_SCALE;
    if config.has_small_sprites && anim.cares_about_small_sprites() {
        scale = 1;
    }
    if config.is_ssl {
        scale *= 2;
    }
    scale
}

/// Mask scale tracks SSL doubling but ignores the small-sprite halving.
fn mask_scale(config: &AssistantConfig) -> u32 {
    if config.is_ssl {
        BASE_SCALE * 2
    } else {
        BASE_SCALE
    }
}

/// Remove prior `<name>_strip*.png` outputs. The frame count in the suffix
/// can change between runs, so the old file is not simply overwritten.
fn delete_stale_strips(sprites_dir: &Path, dest_name: &str) {
    let pattern = sprites_dir.join(format!("{dest_name}_strip*.png"));
    let Ok(entries) = glob::glob(&pattern.to_string_lossy()) else {
        return;
    };
    for path in entries.flatten() {
        if let Err(e) = fs::remove_file(&path) {
            warn!("could not remove stale strip {}: {}", path.display(), e);
        }
    }
}

async fn run_export(program: &Path, sprites_dir: &Path, job: &ExportJob) -> Result<(), String> {
    delete_stale_strips(sprites_dir, &job.dest_name);
    debug!("exporting {} from {}", job.dest.display(), job.source.display());

    let mut command = Command::new(program);
    command.arg("-b");
    for (key, value) in job.params() {
        command.arg("-script-param").arg(format!("{key}={value}"));
    }
    command.arg("-script").arg(&job.script);

    let output = command
        .output()
        .await
        .map_err(|e| format!("could not launch {}: {}", program.display(), e))?;
    if !output.status.success() {
        return Err(format!(
            "aseprite exited with {} exporting {}: {}",
            output.status,
            job.dest_name,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(())
}
