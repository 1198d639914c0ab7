//! Text layer of the buildgraph compiler.
//!
//! This crate handles:
//! - Variable substitution over raw definition text
//! - Parsing pipeline definitions (KDL)
//! - Compiler configuration

pub mod error;
pub mod pipeline;
pub mod system;
pub mod variables;

pub use error::{ConfigError, ConfigResult};
pub use pipeline::{parse_definition, parse_pipeline};
pub use system::{CompilerConfig, parse_compiler_config};
pub use variables::VariableContext;
