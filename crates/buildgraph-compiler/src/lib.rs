//! Build-graph compiler for buildgraph.
//!
//! Turns the raw pipeline definitions of one build into the set of stages the
//! scheduler walks:
//! substitute -> parse -> evaluate conditions -> drop empty pipelines ->
//! resolve dependencies -> assemble the process tree.
//!
//! The pass is pure. [`compile`] reads a [`BuildContext`] and returns
//! [`CompiledItem`]s; [`attach`] writes their flattened process tree onto a
//! build record.
//!
//! [`BuildContext`]: buildgraph_core::BuildContext

pub mod applicability;
pub mod compiler;
pub mod error;
pub mod filter;
pub mod graph;
pub mod item;
pub mod tree;

pub use compiler::{Compiler, attach, compile};
pub use error::{CompileError, CompileResult};
pub use item::{CompiledItem, CompiledPipeline, CompiledStep, RunsOn};
