//! gmlforge - Build assistant for GameMaker (GML) workshop projects
//!
//! This library provides functionality to:
//! - Parse `.aseprite` binary files and extract animation timing metadata
//! - Export spritesheets by driving the Aseprite CLI, one subprocess per variant
//! - Inject reusable GML library snippets into scripts, idempotently

pub mod aseprite;
pub mod assets;
pub mod cli;
pub mod codegen;
pub mod config;
pub mod export;
pub mod inject;
pub mod manifest;
pub mod run;
pub mod scripts;
pub mod warnings;
