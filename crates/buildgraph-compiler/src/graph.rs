//! Name-keyed dependency graph between the pipelines of one build.

use buildgraph_core::PipelineName;
use std::collections::{HashMap, VecDeque};

use crate::{CompileError, CompileResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Pipelines indexed by input position, with `depends_on` edges resolved by name.
///
/// Several unnamed definitions share the default name, so one name can stand
/// for several nodes. A dependency on such a name waits on all of them.
#[derive(Debug)]
pub struct DependencyGraph<'a> {
    names: Vec<&'a PipelineName>,
    depends_on: Vec<&'a [PipelineName]>,
    by_name: HashMap<&'a str, Vec<usize>>,
}

impl<'a> DependencyGraph<'a> {
    /// Build the graph, rejecting references to names no definition carries.
    pub fn new<I>(nodes: I) -> CompileResult<Self>
    where
        I: IntoIterator<Item = (&'a PipelineName, &'a [PipelineName])>,
    {
        let (names, depends_on): (Vec<_>, Vec<_>) = nodes.into_iter().unzip();

        let mut by_name: HashMap<&'a str, Vec<usize>> = HashMap::new();
        for (index, name) in names.iter().enumerate() {
            by_name.entry(name.as_str()).or_default().push(index);
        }

        for (name, deps) in names.iter().zip(&depends_on) {
            if let Some(unknown) = deps.iter().find(|d| !by_name.contains_key(d.as_str())) {
                return Err(CompileError::configuration(
                    name,
                    format!("depends_on references unknown pipeline '{}'", unknown),
                ));
            }
        }

        Ok(Self {
            names,
            depends_on,
            by_name,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Node indexes `node` depends on.
    fn dependencies(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.depends_on[node]
            .iter()
            .filter_map(|name| self.by_name.get(name.as_str()))
            .flatten()
            .copied()
    }

    /// Fail with the offending path if `depends_on` edges form a cycle.
    pub fn detect_cycle(&self) -> CompileResult<()> {
        let mut marks = vec![Mark::Unvisited; self.len()];
        let mut path = Vec::new();

        for start in 0..self.len() {
            if marks[start] == Mark::Unvisited {
                if let Some(cycle) = self.visit(start, &mut marks, &mut path) {
                    return Err(CompileError::DependencyCycle { cycle });
                }
            }
        }
        Ok(())
    }

    fn visit(
        &self,
        node: usize,
        marks: &mut [Mark],
        path: &mut Vec<usize>,
    ) -> Option<Vec<PipelineName>> {
        marks[node] = Mark::InProgress;
        path.push(node);

        for dep in self.dependencies(node) {
            match marks[dep] {
                Mark::Unvisited => {
                    if let Some(cycle) = self.visit(dep, marks, path) {
                        return Some(cycle);
                    }
                }
                Mark::InProgress => {
                    let start = path.iter().position(|n| *n == dep).unwrap_or(0);
                    let mut cycle: Vec<PipelineName> = path[start..]
                        .iter()
                        .map(|n| self.names[*n].clone())
                        .collect();
                    cycle.push(self.names[dep].clone());
                    return Some(cycle);
                }
                Mark::Done => {}
            }
        }

        path.pop();
        marks[node] = Mark::Done;
        None
    }

    /// Close the set of empty pipelines over reverse dependencies.
    ///
    /// Seeded with `empty`, a work list adds every pipeline that depends on a
    /// name whose nodes are all elided, until nothing changes. Each node is
    /// queued at most once, so this terminates even on cyclic input.
    pub fn elide(&self, empty: &[bool]) -> Vec<bool> {
        let mut dependents: HashMap<&str, Vec<usize>> = HashMap::new();
        for (index, deps) in self.depends_on.iter().enumerate() {
            for dep in deps.iter() {
                dependents.entry(dep.as_str()).or_default().push(index);
            }
        }

        let mut elided = vec![false; self.len()];
        let mut queue = VecDeque::new();
        for (index, is_empty) in empty.iter().enumerate().take(self.len()) {
            if *is_empty {
                elided[index] = true;
                queue.push_back(index);
            }
        }

        while let Some(node) = queue.pop_front() {
            let name = self.names[node].as_str();
            if !self.is_dead(name, &elided) {
                continue;
            }
            for &dependent in dependents.get(name).into_iter().flatten() {
                if !elided[dependent] {
                    elided[dependent] = true;
                    queue.push_back(dependent);
                }
            }
        }

        elided
    }

    /// A name is dead once every node carrying it is elided.
    fn is_dead(&self, name: &str, elided: &[bool]) -> bool {
        self.by_name
            .get(name)
            .is_some_and(|nodes| nodes.iter().all(|n| elided[*n]))
    }

    /// `depends_on` of `node` with references to dead names dropped, in
    /// declaration order and without repeats.
    pub fn resolve(&self, node: usize, elided: &[bool]) -> Vec<PipelineName> {
        let mut resolved: Vec<PipelineName> = Vec::new();
        for dep in self.depends_on[node] {
            if !self.is_dead(dep.as_str(), elided) && !resolved.contains(dep) {
                resolved.push(dep.clone());
            }
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(shape: &[(&str, &[&str])]) -> Vec<(PipelineName, Vec<PipelineName>)> {
        shape.iter()
            .map(|(name, deps)| {
                (
                    PipelineName::from(*name),
                    deps.iter().map(|d| PipelineName::from(*d)).collect(),
                )
            })
            .collect()
    }

    fn graph(nodes: &[(PipelineName, Vec<PipelineName>)]) -> CompileResult<DependencyGraph<'_>> {
        DependencyGraph::new(nodes.iter().map(|(n, d)| (n, d.as_slice())))
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let nodes = nodes(&[("deploy", &["build"])]);
        let err = graph(&nodes).unwrap_err();
        assert!(matches!(err, CompileError::Configuration { ref pipeline, .. } if pipeline == "deploy"));
    }

    #[test]
    fn test_detect_cycle() {
        let nodes = nodes(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        let err = graph(&nodes).unwrap().detect_cycle().unwrap_err();
        match err {
            CompileError::DependencyCycle { cycle } => {
                assert_eq!(cycle.first(), cycle.last());
                assert_eq!(cycle.len(), 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let nodes = nodes(&[("a", &["a"])]);
        assert!(matches!(
            graph(&nodes).unwrap().detect_cycle(),
            Err(CompileError::DependencyCycle { .. })
        ));
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let nodes = nodes(&[
            ("base", &[]),
            ("left", &["base"]),
            ("right", &["base"]),
            ("top", &["left", "right"]),
        ]);
        assert!(graph(&nodes).unwrap().detect_cycle().is_ok());
    }

    #[test]
    fn test_elision_is_transitive() {
        let nodes = nodes(&[
            ("zerostep", &[]),
            ("justastep", &[]),
            ("shouldbefiltered", &["zerostep"]),
            ("shouldbefilteredtoo", &["shouldbefiltered"]),
        ]);
        let graph = graph(&nodes).unwrap();
        let elided = graph.elide(&[true, false, false, false]);
        assert_eq!(elided, vec![true, false, true, true]);
    }

    #[test]
    fn test_elision_ignores_declaration_order() {
        let nodes = nodes(&[
            ("c", &["b"]),
            ("b", &["a"]),
            ("a", &[]),
            ("d", &["c", "e"]),
            ("e", &[]),
        ]);
        let graph = graph(&nodes).unwrap();
        let elided = graph.elide(&[false, false, true, false, false]);
        assert_eq!(elided, vec![true, true, true, true, false]);
    }

    #[test]
    fn test_shared_name_dies_with_last_node() {
        let nodes = nodes(&[("default", &[]), ("default", &[]), ("after", &["default"])]);
        let graph = graph(&nodes).unwrap();

        let elided = graph.elide(&[true, false, false]);
        assert_eq!(elided, vec![true, false, false]);
        assert_eq!(graph.resolve(2, &elided), vec![PipelineName::from("default")]);

        let elided = graph.elide(&[true, true, false]);
        assert_eq!(elided, vec![true, true, true]);
    }

    #[test]
    fn test_resolve_keeps_order_and_drops_repeats() {
        let nodes = nodes(&[
            ("lint", &[]),
            ("test", &[]),
            ("deploy", &["lint", "test", "lint"]),
        ]);
        let graph = graph(&nodes).unwrap();
        let elided = graph.elide(&[false, false, false]);
        assert_eq!(
            graph.resolve(2, &elided),
            vec![PipelineName::from("lint"), PipelineName::from("test")]
        );
    }
}
