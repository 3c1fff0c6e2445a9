use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use crate::core::{Fingerprint, State};

pub type Graph = Arc<BTreeMap<String, Vec<String>>>;

/// Walk along a directed graph from `start` until reaching `end`. Nodes in
/// `blocks` fail fast. This exercises the solvers through nothing but the
/// State trait, so tests can pin down traversal order precisely.
#[derive(Debug, Clone)]
pub struct GraphPuzzle {
    graph: Graph,
    start: String,
    end: String,
    blocks: Arc<BTreeSet<String>>,
}

impl GraphPuzzle {
    pub fn graph(edges: &[(&str, &[&str])]) -> Graph {
        Arc::new(edges.iter().map(|(from, to)| {
            (from.to_string(), to.iter().map(|t| t.to_string()).collect())
        }).collect())
    }

    pub fn new(graph: Graph, start: &str, end: &str) -> Self {
        Self::with_blocks(graph, start, end, &[])
    }

    pub fn with_blocks(graph: Graph, start: &str, end: &str, blocks: &[&str]) -> Self {
        Self {
            graph,
            start: start.to_string(),
            end: end.to_string(),
            blocks: Arc::new(blocks.iter().map(|b| b.to_string()).collect()),
        }
    }

    pub fn at(&self) -> &str {
        &self.start
    }

    /// Number of states currently sharing this puzzle's graph.
    pub fn live_handles(&self) -> usize {
        Arc::strong_count(&self.graph)
    }

    /// Nodes visited along a solver path, for compact assertions.
    pub fn nodes(path: &[GraphPuzzle]) -> Vec<&str> {
        path.iter().map(|p| p.at()).collect()
    }
}

impl State for GraphPuzzle {
    fn is_solved(&self) -> bool {
        self.start == self.end
    }

    fn fail_fast(&self) -> bool {
        self.blocks.contains(&self.start)
    }

    fn extensions(&self) -> Vec<Self> {
        self.graph.get(&self.start).map(|next| {
            next.iter().map(|n| Self {
                graph: self.graph.clone(),
                start: n.clone(),
                end: self.end.clone(),
                blocks: self.blocks.clone(),
            }).collect()
        }).unwrap_or_default()
    }

    fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(format!("({} -> {})", self.start, self.end))
    }
}
