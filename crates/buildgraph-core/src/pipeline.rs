//! Pipeline definitions, raw and parsed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::id::PipelineName;

/// One pipeline definition as fetched from the forge, before substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDefinition {
    pub name: PipelineName,
    pub data: Vec<u8>,
    /// Set when the definition arrived without a name and got the default one.
    pub unnamed: bool,
}

impl RawDefinition {
    pub fn new(name: impl Into<PipelineName>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            unnamed: false,
        }
    }

    /// A definition without a name (single-pipeline repositories).
    pub fn unnamed(data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: PipelineName::default(),
            data: data.into(),
            unnamed: true,
        }
    }
}

/// Include/exclude pattern lists. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Constraint {
    pub fn including<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: patterns.into_iter().map(Into::into).collect(),
            exclude: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

/// Conditions attached to a step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct When {
    pub branch: Constraint,
    pub event: Constraint,
    #[serde(rename = "ref")]
    pub git_ref: Constraint,
    pub environment: Constraint,
    /// Runtime condition on the outcome of earlier steps.
    pub status: Constraint,
}

impl When {
    pub fn is_empty(&self) -> bool {
        self.branch.is_empty()
            && self.event.is_empty()
            && self.git_ref.is_empty()
            && self.environment.is_empty()
            && self.status.is_empty()
    }
}

/// A step of a parsed pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: String,
    /// Position within the pipeline, starting at 0.
    pub position: usize,
    pub image: String,
    pub commands: Vec<String>,
    pub environment: BTreeMap<String, String>,
    /// Opaque plugin settings.
    pub settings: BTreeMap<String, serde_json::Value>,
    /// Names of secrets the step asks for.
    pub secrets: Vec<String>,
    pub when: When,
    pub detach: bool,
    pub privileged: bool,
    pub pull: bool,
}

/// A parsed pipeline definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub name: PipelineName,
    pub steps: Vec<StepDefinition>,
    pub depends_on: Vec<PipelineName>,
    /// Completion conditions as written; validated by the compiler.
    pub runs_on: Vec<String>,
    pub skip_clone: bool,
    /// Replacement for the implicit clone step.
    pub clone: Option<StepDefinition>,
    pub branches: Constraint,
    pub events: Constraint,
    pub platform: Option<String>,
    pub labels: BTreeMap<String, String>,
    /// Environment shared by every step.
    pub environment: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unnamed_definition_gets_default_name() {
        let raw = RawDefinition::unnamed("pipeline {}");
        assert!(raw.name.is_default());
        assert!(raw.unnamed);

        let named = RawDefinition::new("lint", "pipeline {}");
        assert_eq!(named.name, "lint");
        assert!(!named.unnamed);

        let explicit = RawDefinition::new(PipelineName::DEFAULT, "pipeline {}");
        assert!(explicit.name.is_default());
        assert!(!explicit.unnamed);
    }

    #[test]
    fn test_empty_when() {
        assert!(When::default().is_empty());
        let when = When {
            branch: Constraint::including(["main"]),
            ..Default::default()
        };
        assert!(!when.is_empty());
    }
}
