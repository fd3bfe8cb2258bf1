// The rule engine lives in reportqa-core.
// This crate wires it to files, flags and terminal output.

pub mod loader;
pub mod render;

// Re-export core types for convenience
pub use reportqa_core::*;

pub use loader::{load_document, load_rules, resolve_model, ModelChoice};
pub use render::{render, write_output, OutputFormat};
