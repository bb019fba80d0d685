//! Anim derivation - one exported spritesheet unit per colored tag
//!
//! An aseprite file yields one anim per tag whose color is configured as an
//! anim color, or a single whole-file anim when no tag matches. Each anim
//! carries its windows (rebased to anim-relative frame numbers) and a
//! content hash over its frame bytes, used to decide whether the anim needs
//! re-export this run.

use sha2::{Digest, Sha256};

use crate::aseprite::loader::RawAsepriteFile;
use crate::aseprite::tags::TagColor;
use crate::aseprite::windows::Window;
use crate::manifest::Manifest;

/// Trailing marker on an anim name requesting an auto-generated hurtbox
/// variant. Stripped before computing the save name.
pub const HURTBOX_MARKER: &str = "HURTBOX";

/// Anims whose exported scale drops to 1 when the character is configured
/// with small sprites. Everything else keeps the base scale.
pub const ANIMS_WHICH_CARE_ABOUT_SMALL_SPRITES: &[&str] = &[
    "airdodge", "bighurt", "bouncehurt", "crouch", "dash", "dashstart", "dashstop",
    "dashturn", "doublejump", "downhurt", "hurt", "hurtground", "idle", "jump",
    "jumpsquat", "land", "landinglag", "parry", "pratfall", "pratland", "roll",
    "spinhurt", "tech", "techroll", "uphurt", "walk", "walkturn", "walljump",
    "waveland",
];

/// A part of an aseprite file representing a single spritesheet.
///
/// `start` and `end` are inclusive, 0-indexed frame numbers in the owning
/// file. All derived values (windows, hash, freshness) are computed at
/// construction and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anim {
    pub name: String,
    pub start: u16,
    pub end: u16,
    pub windows: Vec<Window>,
    /// Hex digest of the anim's frame bytes.
    pub frame_hash: String,
    /// True when the owning file changed and the frame hash differs from the
    /// one recorded last run.
    pub is_fresh: bool,
}

impl Anim {
    pub fn num_frames(&self) -> u16 {
        self.end - self.start + 1
    }

    /// Whether this anim's name requests a hurtbox variant.
    pub fn gets_hurtbox(&self) -> bool {
        self.name.trim_end().ends_with(HURTBOX_MARKER)
    }

    /// The anim name with the hurtbox marker stripped, for matching against
    /// a script's base filename.
    pub fn script_match_name(&self) -> String {
        self.name.replace(HURTBOX_MARKER, "").trim().to_string()
    }

    /// The lowercase name used to build export filenames.
    pub fn save_name(&self) -> String {
        self.script_match_name().to_lowercase()
    }

    pub fn cares_about_small_sprites(&self) -> bool {
        ANIMS_WHICH_CARE_ABOUT_SMALL_SPRITES.contains(&self.save_name().as_str())
    }
}

/// Derive the anims for a parsed file, recording each anim's new frame hash
/// into the manifest after comparing against the stored one.
pub fn derive_anims(
    file_name: &str,
    raw: &RawAsepriteFile,
    anim_tag_colors: &[TagColor],
    window_tag_colors: &[TagColor],
    file_is_fresh: bool,
    manifest: &mut Manifest,
) -> Vec<Anim> {
    if raw.num_frames() == 0 {
        return Vec::new();
    }

    let tags = raw.tags();
    let mut anims: Vec<Anim> = tags
        .iter()
        .filter(|tag| anim_tag_colors.contains(&tag.color))
        .map(|tag| {
            make_anim(tag.name.clone(), tag.start, tag.end, raw, window_tag_colors, file_is_fresh, manifest)
        })
        .collect();

    if anims.is_empty() {
        anims.push(make_anim(
            file_name.to_string(),
            0,
            raw.num_frames() - 1,
            raw,
            window_tag_colors,
            file_is_fresh,
            manifest,
        ));
    }
    anims
}

fn make_anim(
    name: String,
    start: u16,
    end: u16,
    raw: &RawAsepriteFile,
    window_tag_colors: &[TagColor],
    file_is_fresh: bool,
    manifest: &mut Manifest,
) -> Anim {
    let windows = raw
        .tags()
        .iter()
        .filter(|tag| {
            window_tag_colors.contains(&tag.color)
                && tag.start >= start
                && tag.start <= end
                && tag.end >= start
                && tag.end <= end
        })
        .map(|tag| Window::new(tag.name.clone(), tag.start - start + 1, tag.end - start + 1))
        .collect();

    let frame_hash = hash_frames(raw, start, end);
    // Compare before recording: the new hash is always written so the next
    // run compares against this run's value.
    let is_fresh = file_is_fresh && manifest.anim_hash(&name) != Some(frame_hash.as_str());
    manifest.record_anim_hash(&name, &frame_hash);

    Anim { name, start, end, windows, frame_hash, is_fresh }
}

fn hash_frames(raw: &RawAsepriteFile, start: u16, end: u16) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.frame_range_bytes(start, end));
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}
