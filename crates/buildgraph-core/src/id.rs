//! Identifiers.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use uuid::Uuid;

/// Identifier of a build record.
/// Uses UUIDv7 for time-ordered, sortable IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct BuildId(Uuid);

impl BuildId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BuildId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for BuildId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::str::FromStr for BuildId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identifier of a process node inside one build.
///
/// Ids are dense and start at 1; `0` is the build root that stages hang off.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[display("{_0}")]
#[serde(transparent)]
pub struct ProcId(u32);

impl ProcId {
    /// Parent id of every stage node.
    pub const ROOT: ProcId = ProcId(0);

    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

/// Hands out strictly increasing process ids for one build.
#[derive(Debug, Default)]
pub struct ProcIdSequence {
    last: u32,
}

impl ProcIdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> ProcId {
        self.last += 1;
        ProcId(self.last)
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u32 {
        self.last
    }
}

/// Name of a pipeline definition, used as the key for `depends_on` references.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
#[serde(transparent)]
pub struct PipelineName(String);

impl PipelineName {
    /// Name given to definitions that arrive without one.
    pub const DEFAULT: &'static str = "default";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT
    }
}

impl Default for PipelineName {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl From<&str> for PipelineName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for PipelineName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for PipelineName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PipelineName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for PipelineName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for PipelineName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proc_id_sequence_is_dense() {
        let mut seq = ProcIdSequence::new();
        assert_eq!(seq.next_id(), ProcId::new(1));
        assert_eq!(seq.next_id(), ProcId::new(2));
        assert_eq!(seq.issued(), 2);
        assert!(ProcId::ROOT.is_root());
    }

    #[test]
    fn test_default_pipeline_name() {
        let name = PipelineName::default();
        assert!(name.is_default());
        assert_eq!(name, "default");
        assert_eq!(PipelineName::from("lint").to_string(), "lint");
    }
}
