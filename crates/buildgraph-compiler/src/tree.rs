//! Process tree assembly.
//!
//! Ids come from one sequence shared by every stage of a build, so they are
//! dense and increase in stage-then-children order.

use buildgraph_core::{Proc, ProcId, ProcIdSequence, ProcKind, ProcNode};
use std::collections::BTreeMap;

/// Shape of one stage before ids are assigned.
#[derive(Debug, Clone, Default)]
pub struct StageLayout {
    pub name: String,
    pub skipped: bool,
    pub environ: BTreeMap<String, String>,
    pub children: Vec<ChildLayout>,
}

#[derive(Debug, Clone)]
pub struct ChildLayout {
    pub name: String,
    pub kind: ProcKind,
    pub skipped: bool,
}

impl ChildLayout {
    pub fn new(name: impl Into<String>, kind: ProcKind, skipped: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            skipped,
        }
    }
}

/// Hands out process ids across all stages of one build.
#[derive(Debug, Default)]
pub struct TreeAssembler {
    ids: ProcIdSequence,
}

impl TreeAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay out one stage with its children. A skipped stage skips every child.
    pub fn assemble(&mut self, layout: StageLayout) -> ProcNode {
        let stage_id = self.ids.next_id();
        let mut stage = ProcNode::new(stage_id, ProcId::ROOT, layout.name, ProcKind::Stage);
        stage.environ = layout.environ;

        for child in layout.children {
            let mut node = ProcNode::new(self.ids.next_id(), stage_id, child.name, child.kind);
            if child.skipped {
                node.skip();
            }
            stage.children.push(node);
        }

        if layout.skipped {
            stage.skip();
        }
        stage
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u32 {
        self.ids.issued()
    }
}

/// Flatten stage trees into process records, preserving id order.
pub fn flatten<'a, I>(stages: I) -> Vec<Proc>
where
    I: IntoIterator<Item = &'a ProcNode>,
{
    let mut procs = Vec::new();
    for stage in stages {
        stage.flatten_into(&mut procs);
    }
    procs
}
