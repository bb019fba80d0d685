//! Spritesheet export via the Aseprite CLI
//!
//! Export never rasterizes anything itself. For every fresh anim it plans
//! one subprocess invocation per output variant and hands the actual
//! crop/scale/save work to a Lua script run by the Aseprite binary.

pub mod lua;
pub mod orchestrator;

pub use lua::{supply_lua_scripts, LuaScripts};
pub use orchestrator::{export_aseprites, ExportError, SPRITES_FOLDER};
