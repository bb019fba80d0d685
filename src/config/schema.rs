//! Configuration schema for `gmlforge.toml`

use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::aseprite::tags::TagColor;

/// Project settings, all optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssistantConfig {
    /// Path to the Aseprite executable. Sprite export is disabled when
    /// unset.
    pub aseprite_path: Option<PathBuf>,
    /// Tag swatch names that mark a tag as an animation.
    pub anim_tag_colors: Vec<String>,
    /// Tag swatch names that mark a tag as an attack window.
    pub window_tag_colors: Vec<String>,
    /// Export at half scale for anims that have small-sprite variants.
    pub has_small_sprites: bool,
    /// Export hurtbox masks for anims that want them.
    pub hurtboxes_enabled: bool,
    /// Double all export scales for SSL-format projects.
    pub is_ssl: bool,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            aseprite_path: None,
            anim_tag_colors: vec!["green".to_string()],
            window_tag_colors: vec!["orange".to_string()],
            has_small_sprites: false,
            hurtboxes_enabled: true,
            is_ssl: false,
        }
    }
}

impl AssistantConfig {
    /// Resolve the configured anim swatch names, warning on unknown names.
    pub fn anim_tag_colors(&self) -> Vec<TagColor> {
        resolve_colors(&self.anim_tag_colors)
    }

    /// Resolve the configured window swatch names, warning on unknown names.
    pub fn window_tag_colors(&self) -> Vec<TagColor> {
        resolve_colors(&self.window_tag_colors)
    }
}

fn resolve_colors(names: &[String]) -> Vec<TagColor> {
    let mut colors = Vec::new();
    for name in names {
        match TagColor::from_name(name) {
            Some(color) => colors.push(color),
            None => warn!("unknown tag color name '{name}' in config, ignoring"),
        }
    }
    colors
}
