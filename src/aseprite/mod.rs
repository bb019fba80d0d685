//! Aseprite file handling
//!
//! Parses the binary `.aseprite` chunk format into tags, layers, and frame
//! data, then derives the anims and attack windows that drive spritesheet
//! export and script injection.
//!
//! # Overview
//!
//! - **Loading**: `loader` walks the length-prefixed byte layout into typed
//!   chunks (`chunks`), skipping unknown chunk types for forward
//!   compatibility.
//! - **Classification**: `layers` groups visible normal-type layers by naming
//!   convention (`SPLIT(...)`, `OPT(...)`, `HURTBOX`, `HURTMASK`).
//! - **Derivation**: `anims` turns colored tags into `Anim`s carrying their
//!   `Window`s and a content hash used for freshness tracking.

pub mod anims;
pub mod chunks;
pub mod files;
pub mod layers;
pub mod loader;
pub mod tags;
pub mod windows;

pub use anims::Anim;
pub use chunks::{Chunk, FrameTagsChunk, LayerChunk};
pub use files::AsepriteFile;
pub use layers::AsepriteLayers;
pub use loader::{ParseError, RawAsepriteFile};
pub use tags::{AsepriteTag, TagColor};
pub use windows::Window;
