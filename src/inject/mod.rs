//! GML library injection
//!
//! A library of named snippets (`#define` functions and `#macro` constants)
//! is supplied into scripts on demand: a script that calls a library define
//! gets that define, plus everything the define itself needs, appended in a
//! machine-owned trailing region. Scripts that wrote their own version of a
//! snippet are left alone, and re-running the pass is a no-op.

pub mod apply;
pub mod library;
pub mod model;

pub use apply::{apply_injection, INJECTION_END_HEADER, INJECTION_START_HEADER};
pub use library::{read_injection_library, LibraryError};
pub use model::{Define, GmlInjection, Macro};
