//! Configuration loading

use std::fs;
use std::path::Path;

use log::info;
use thiserror::Error;

use super::schema::AssistantConfig;
use crate::manifest::ASSISTANT_FOLDER;

/// Config filename under `<root>/assistant/`.
pub const CONFIG_FILENAME: &str = "gmlforge.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse {CONFIG_FILENAME}: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Load the project config, or defaults when the file does not exist.
pub fn load_config(root_dir: &Path) -> Result<AssistantConfig, ConfigError> {
    let path = root_dir.join(ASSISTANT_FOLDER).join(CONFIG_FILENAME);
    if !path.exists() {
        info!("no {CONFIG_FILENAME} found, using defaults");
        return Ok(AssistantConfig::default());
    }
    let content = fs::read_to_string(&path)?;
    Ok(toml::from_str(&content)?)
}

/// Render the default config with its field docs, for `init`.
pub fn default_config_text() -> String {
    [
        "# gmlforge project settings. Every key is optional.",
        "",
        "# Path to the Aseprite executable. Sprite export is disabled when unset.",
        "# aseprite_path = \"C:/Program Files/Aseprite/aseprite.exe\"",
        "",
        "# Tag swatch names that mark animations and attack windows.",
        "# anim_tag_colors = [\"green\"]",
        "# window_tag_colors = [\"orange\"]",
        "",
        "# has_small_sprites = false",
        "# hurtboxes_enabled = true",
        "# is_ssl = false",
        "",
    ]
    .join("\n")
}
