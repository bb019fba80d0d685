//! Project configuration
//!
//! Settings live in `<root>/assistant/gmlforge.toml`. A missing file means
//! defaults; a file that exists but does not parse is an error.

pub mod loader;
pub mod schema;

pub use loader::{load_config, ConfigError, CONFIG_FILENAME};
pub use schema::AssistantConfig;
