//! Process records and the process tree.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::build::Status;
use crate::id::ProcId;

/// What a process node stands for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcKind {
    /// One pipeline definition as a whole.
    #[default]
    Stage,
    /// The implicit clone step.
    Clone,
    /// A declared build step.
    Step,
}

impl ProcKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcKind::Stage => "stage",
            ProcKind::Clone => "clone",
            ProcKind::Step => "step",
        }
    }
}

/// A flattened process record as persisted on a build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Proc {
    pub id: ProcId,
    pub parent_id: ProcId,
    pub name: String,
    pub kind: ProcKind,
    pub state: Status,
    pub environ: BTreeMap<String, String>,
}

/// A node in a build's process tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcNode {
    pub id: ProcId,
    pub parent_id: ProcId,
    pub name: String,
    pub kind: ProcKind,
    pub state: Status,
    pub environ: BTreeMap<String, String>,
    pub children: Vec<ProcNode>,
}

impl ProcNode {
    pub fn new(id: ProcId, parent_id: ProcId, name: impl Into<String>, kind: ProcKind) -> Self {
        Self {
            id,
            parent_id,
            name: name.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.state == Status::Skipped
    }

    /// Mark this node and every descendant as skipped.
    pub fn skip(&mut self) {
        self.state = Status::Skipped;
        for child in &mut self.children {
            child.skip();
        }
    }

    /// The flattened record for this node alone.
    pub fn record(&self) -> Proc {
        Proc {
            id: self.id,
            parent_id: self.parent_id,
            name: self.name.clone(),
            kind: self.kind,
            state: self.state,
            environ: self.environ.clone(),
        }
    }

    /// Append this subtree to `out` in pre-order.
    pub fn flatten_into(&self, out: &mut Vec<Proc>) {
        out.push(self.record());
        for child in &self.children {
            child.flatten_into(out);
        }
    }

    /// Pre-order walk over this subtree.
    pub fn walk(&self) -> Vec<&ProcNode> {
        let mut nodes = vec![self];
        for child in &self.children {
            nodes.extend(child.walk());
        }
        nodes
    }

    /// Number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ProcNode::node_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> ProcNode {
        let mut stage = ProcNode::new(ProcId::new(1), ProcId::ROOT, "build", ProcKind::Stage);
        let mut step = ProcNode::new(ProcId::new(2), ProcId::new(1), "compile", ProcKind::Step);
        step.children
            .push(ProcNode::new(ProcId::new(3), ProcId::new(2), "nested", ProcKind::Step));
        stage.children.push(step);
        stage
    }

    #[test]
    fn test_skip_cascades_downward() {
        let mut node = stage();
        node.children[0].skip();
        assert_eq!(node.state, Status::Pending);
        assert!(node.children[0].is_skipped());
        assert!(node.children[0].children[0].is_skipped());

        node.skip();
        assert!(node.walk().iter().all(|n| n.is_skipped()));
    }

    #[test]
    fn test_flatten_is_pre_order() {
        let node = stage();
        let mut procs = Vec::new();
        node.flatten_into(&mut procs);
        let ids: Vec<u32> = procs.iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(procs[1].parent_id, ProcId::new(1));
        assert_eq!(node.node_count(), 3);
    }
}
