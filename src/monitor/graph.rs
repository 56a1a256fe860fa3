//! Observed dependency graph and cycle detection
//!
//! Snapshots are immutable once built; the monitor swaps in a fresh `Arc` on
//! every rebuild and readers keep whatever snapshot they were handed.

use crate::core::types::TypeKey;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Immutable snapshot of observed resolution dependencies.
///
/// An edge `A -> B` means a resolve of `A` triggered a nested resolve of `B`.
/// Edges are observed from call timing, not declared metadata, so incidental
/// nested lookups show up too.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: HashSet<TypeKey>,
    edges: HashSet<(TypeKey, TypeKey)>,
    adjacency: HashMap<TypeKey, Vec<TypeKey>>,
}

impl DependencyGraph {
    pub(crate) fn build(nodes: HashSet<TypeKey>, edges: HashSet<(TypeKey, TypeKey)>) -> Self {
        let mut nodes = nodes;
        let mut adjacency: HashMap<TypeKey, Vec<TypeKey>> = HashMap::new();
        for &(from, to) in &edges {
            nodes.insert(from);
            nodes.insert(to);
            adjacency.entry(from).or_default().push(to);
        }
        Self {
            nodes,
            edges,
            adjacency,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_node(&self, key: TypeKey) -> bool {
        self.nodes.contains(&key)
    }

    pub fn contains_edge(&self, from: TypeKey, to: TypeKey) -> bool {
        self.edges.contains(&(from, to))
    }

    /// Keys with at least one observed outgoing edge from `key`.
    pub fn dependencies_of(&self, key: TypeKey) -> &[TypeKey] {
        self.adjacency.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Keys lying on a cycle: members of a strongly connected component of
    /// size two or more, plus self-loops.
    ///
    /// Iterative Tarjan so deep resolution chains cannot overflow the stack.
    pub fn cycle_participants(&self) -> HashSet<TypeKey> {
        let mut index_of: HashMap<TypeKey, u32> = HashMap::new();
        let mut lowlink: HashMap<TypeKey, u32> = HashMap::new();
        let mut on_stack: HashSet<TypeKey> = HashSet::new();
        let mut stack: Vec<TypeKey> = Vec::new();
        let mut next_index = 0u32;
        let mut participants = HashSet::new();

        for &root in &self.nodes {
            if index_of.contains_key(&root) {
                continue;
            }
            // explicit call stack of (node, next-neighbor position)
            let mut call: Vec<(TypeKey, usize)> = vec![(root, 0)];
            while !call.is_empty() {
                let top = call.len() - 1;
                let (node, neighbor_pos) = call[top];

                if !index_of.contains_key(&node) {
                    index_of.insert(node, next_index);
                    lowlink.insert(node, next_index);
                    next_index += 1;
                    stack.push(node);
                    on_stack.insert(node);
                }

                let neighbors = self
                    .adjacency
                    .get(&node)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                if neighbor_pos < neighbors.len() {
                    call[top].1 = neighbor_pos + 1;
                    let next = neighbors[neighbor_pos];
                    if !index_of.contains_key(&next) {
                        call.push((next, 0));
                    } else if on_stack.contains(&next) {
                        let candidate = index_of[&next].min(lowlink[&node]);
                        lowlink.insert(node, candidate);
                    }
                    continue;
                }

                call.pop();
                if let Some(&(parent, _)) = call.last() {
                    let candidate = lowlink[&node].min(lowlink[&parent]);
                    lowlink.insert(parent, candidate);
                }
                if lowlink[&node] == index_of[&node] {
                    let mut component = Vec::new();
                    while let Some(member) = stack.pop() {
                        on_stack.remove(&member);
                        component.push(member);
                        if member == node {
                            break;
                        }
                    }
                    if component.len() > 1 || self.edges.contains(&(node, node)) {
                        participants.extend(component);
                    }
                }
            }
        }
        participants
    }

    /// Serializable summary with deterministic ordering.
    pub fn summary(&self) -> GraphSummary {
        let mut nodes: Vec<String> = self.nodes.iter().map(|key| key.name().to_owned()).collect();
        nodes.sort_unstable();
        let mut edges: Vec<(String, String)> = self
            .edges
            .iter()
            .map(|(from, to)| (from.name().to_owned(), to.name().to_owned()))
            .collect();
        edges.sort_unstable();
        let mut cycle_participants: Vec<String> = self
            .cycle_participants()
            .iter()
            .map(|key| key.name().to_owned())
            .collect();
        cycle_participants.sort_unstable();
        GraphSummary {
            nodes,
            edges,
            cycle_participants,
        }
    }
}

/// Exportable view of one graph snapshot
#[derive(Debug, Clone, Serialize)]
pub struct GraphSummary {
    pub nodes: Vec<String>,
    pub edges: Vec<(String, String)>,
    pub cycle_participants: Vec<String>,
}

/// One entry of the monitor's snapshot history.
#[derive(Clone)]
pub struct GraphSnapshot {
    pub graph: std::sync::Arc<DependencyGraph>,
    pub captured_at: Instant,
}
