// src/dag/concrete.rs

use std::collections::HashMap;
use std::path::Path;
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use regex::Regex;
use tracing::debug;

use crate::task::hash::short_hash;
use crate::task::Task;

static BUCKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z]{2}$").expect("static bucket regex"));

static BUCKET_REST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z]{28,30}$").expect("static bucket regex"));

/// One executed task in the provenance graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DagNode {
    /// Insertion order, starting at 0.
    pub index: usize,
    /// `[ab/cdef12] name`
    pub label: String,
    pub hash: String,
    /// Hashes of the tasks whose work directories this task read from.
    pub predecessors: Vec<String>,
}

#[derive(Debug, Default)]
struct DagState {
    nodes: HashMap<String, DagNode>,
    next_index: usize,
}

/// Additive-only graph of executed tasks, keyed by content hash.
///
/// Edges are not declared: they are discovered from input paths pointing
/// into another task's work directory.
#[derive(Debug, Default)]
pub struct ConcreteDag {
    state: Mutex<DagState>,
}

/// Hash of the task work directory `path` lives in, if any.
///
/// Looks for the two-level bucket layout `ab/cdef.../<file>`. The innermost
/// match wins, so a work root that itself looks like a bucket does not
/// shadow the real one.
pub fn extract_predecessor(path: &Path) -> Option<String> {
    let parts: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    parts
        .windows(3)
        .rev()
        .find(|w| BUCKET.is_match(&w[0]) && BUCKET_REST.is_match(&w[1]))
        .map(|w| format!("{}{}", w[0], w[1]))
}

impl ConcreteDag {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DagState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `task`. Returns `false` when its hash is already present; the
    /// first insertion keeps its index and label.
    pub fn add_task(&self, task: &Task) -> bool {
        let hash = task.hash().to_string();
        let predecessors: Vec<String> = task
            .spec()
            .inputs
            .iter()
            .filter_map(|input| extract_predecessor(&input.source))
            .collect();

        let mut state = self.lock();
        if state.nodes.contains_key(&hash) {
            return false;
        }

        let index = state.next_index;
        state.next_index += 1;

        let node = DagNode {
            index,
            label: format!("[{}] {}", short_hash(&hash), task.name()),
            hash: hash.clone(),
            predecessors,
        };
        debug!(task = %task.name(), index, predecessors = ?node.predecessors, "recorded dag node");
        state.nodes.insert(hash, node);
        true
    }

    pub fn len(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, hash: &str) -> Option<DagNode> {
        self.lock().nodes.get(hash).cloned()
    }

    /// Snapshot of all nodes in insertion order.
    pub fn nodes(&self) -> Vec<DagNode> {
        let mut nodes: Vec<DagNode> = self.lock().nodes.values().cloned().collect();
        nodes.sort_by_key(|n| n.index);
        nodes
    }

    /// Graph over recorded nodes; edges point from predecessor to dependent.
    /// Predecessors that were never recorded are skipped.
    pub fn graph(&self) -> DiGraph<DagNode, ()> {
        let nodes = self.nodes();
        let mut graph = DiGraph::with_capacity(nodes.len(), nodes.len());
        let mut ids: HashMap<String, NodeIndex> = HashMap::new();

        for node in &nodes {
            let id = graph.add_node(node.clone());
            ids.insert(node.hash.clone(), id);
        }

        for node in &nodes {
            let to = ids[&node.hash];
            for pred in &node.predecessors {
                // Predecessor fragments may be shorter than full hashes.
                let from = ids
                    .iter()
                    .find(|(hash, _)| hash.starts_with(pred.as_str()))
                    .map(|(_, id)| *id);
                if let Some(from) = from {
                    if from != to {
                        graph.update_edge(from, to, ());
                    }
                }
            }
        }

        graph
    }

    /// Labels in dependency order. Falls back to insertion order if the
    /// edges form a cycle.
    pub fn topological_labels(&self) -> Vec<String> {
        let graph = self.graph();
        match toposort(&graph, None) {
            Ok(order) => order.into_iter().map(|id| graph[id].label.clone()).collect(),
            Err(_) => graph.node_weights().map(|n| n.label.clone()).collect(),
        }
    }
}
