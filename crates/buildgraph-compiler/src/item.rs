//! Compiler output.

use buildgraph_core::{Constraint, Netrc, PipelineName, ProcId, ProcKind, ProcNode, Registry, Secret};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Completion condition of a pipeline: which outcome of its dependencies lets it run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunsOn {
    Success,
    Failure,
    Always,
}

impl RunsOn {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunsOn::Success => "success",
            RunsOn::Failure => "failure",
            RunsOn::Always => "always",
        }
    }
}

impl fmt::Display for RunsOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunsOn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(RunsOn::Success),
            "failure" => Ok(RunsOn::Failure),
            "always" => Ok(RunsOn::Always),
            other => Err(format!("unknown runs_on condition '{}'", other)),
        }
    }
}

/// One surviving pipeline, ready for the scheduler.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledItem {
    pub name: PipelineName,
    /// Names of surviving pipelines this one waits for.
    pub depends_on: Vec<PipelineName>,
    /// As declared. Empty means "on success".
    pub runs_on: Vec<RunsOn>,
    pub platform: String,
    pub labels: BTreeMap<String, String>,
    /// Stage node with one child per compiled step.
    pub proc: ProcNode,
    pub config: CompiledPipeline,
}

impl CompiledItem {
    pub fn runs_on_success(&self) -> bool {
        self.runs_on.is_empty()
            || self
                .runs_on
                .iter()
                .any(|r| matches!(r, RunsOn::Success | RunsOn::Always))
    }

    pub fn runs_on_failure(&self) -> bool {
        self.runs_on
            .iter()
            .any(|r| matches!(r, RunsOn::Failure | RunsOn::Always))
    }

    pub fn is_skipped(&self) -> bool {
        self.proc.is_skipped()
    }
}

/// Executable configuration of one pipeline.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompiledPipeline {
    /// Clone step first, then declared steps.
    pub steps: Vec<CompiledStep>,
    #[serde(skip_serializing)]
    pub secrets: Vec<Secret>,
    #[serde(skip_serializing)]
    pub registries: Vec<Registry>,
    #[serde(skip_serializing)]
    pub netrc: Netrc,
}

/// A step with its process id and fully merged environment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledStep {
    pub proc_id: ProcId,
    pub name: String,
    pub kind: ProcKind,
    pub image: String,
    pub commands: Vec<String>,
    pub environment: BTreeMap<String, String>,
    pub settings: BTreeMap<String, serde_json::Value>,
    pub secrets: Vec<String>,
    /// Evaluated by the scheduler against earlier step outcomes.
    pub status: Constraint,
    pub detach: bool,
    pub privileged: bool,
    pub pull: bool,
}
