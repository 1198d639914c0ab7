//! Core domain types for the buildgraph pipeline compiler.
//!
//! This crate contains:
//! - Identifiers (build ids, process ids, pipeline names)
//! - Build, repository and credential records
//! - The build context a compilation reads from
//! - Parsed pipeline definitions
//! - Process records and process tree nodes

pub mod build;
pub mod context;
pub mod error;
pub mod id;
pub mod pipeline;
pub mod proc;
pub mod repository;
pub mod secret;

pub use build::{Build, BuildEvent, Status};
pub use context::BuildContext;
pub use error::{Error, Result};
pub use id::{BuildId, PipelineName, ProcId, ProcIdSequence};
pub use pipeline::{Constraint, PipelineDefinition, RawDefinition, StepDefinition, When};
pub use proc::{Proc, ProcKind, ProcNode};
pub use repository::{GitProvider, Repo};
pub use secret::{Netrc, Registry, Secret};
