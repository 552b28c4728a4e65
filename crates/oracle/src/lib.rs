//! # The Oracle: call graph
//!
//! Bidirectional directed graph over USRs: `callers[v]` is every USR that
//! calls `v`; `callees[u]` is every USR `u` calls. Both views are kept in
//! sync from the same underlying `petgraph::DiGraph`, the same structure the
//! teacher used for its one-directional reachability search, generalized
//! here to bidirectional lookup plus bounded simple-path search.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};

/// Call graph keyed by USR string. Nodes are never removed from the
/// underlying `DiGraph` once created (petgraph's `remove_node` swap-removes
/// the last index, which would silently invalidate the index map); instead
/// [`CallGraph::remove_symbol`] drops only the incident edges, which is all
/// the §4.7 invariant requires — a symbol with no edges is indistinguishable
/// from one that was never added.
#[derive(Default)]
pub struct CallGraph {
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn node_for(&mut self, usr: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(usr) {
            return idx;
        }
        let idx = self.graph.add_node(usr.to_string());
        self.index.insert(usr.to_string(), idx);
        idx
    }

    /// Records that `caller` invokes `callee`. Idempotent: calling it twice
    /// with the same pair leaves a single edge.
    pub fn add_edge(&mut self, caller: &str, callee: &str) {
        let from = self.node_for(caller);
        let to = self.node_for(callee);
        if self.graph.find_edge(from, to).is_none() {
            self.graph.add_edge(from, to, ());
        }
    }

    /// Removes every edge incident to `usr`, in either direction. The node
    /// itself is left in place with no edges — `callers`/`callees` then
    /// correctly report empty sets for it.
    pub fn remove_symbol(&mut self, usr: &str) {
        let Some(&idx) = self.index.get(usr) else {
            return;
        };
        let incident: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.id())
            .chain(
                self.graph
                    .edges_directed(idx, Direction::Incoming)
                    .map(|e| e.id()),
            )
            .collect();
        for edge in incident {
            self.graph.remove_edge(edge);
        }
    }

    /// USRs that call `v`.
    pub fn callers(&self, usr: &str) -> HashSet<String> {
        self.neighbors(usr, Direction::Incoming)
    }

    /// USRs that `u` calls.
    pub fn callees(&self, usr: &str) -> HashSet<String> {
        self.neighbors(usr, Direction::Outgoing)
    }

    fn neighbors(&self, usr: &str, direction: Direction) -> HashSet<String> {
        let Some(&idx) = self.index.get(usr) else {
            return HashSet::new();
        };
        self.graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].clone())
            .collect()
    }

    /// Every simple path `from = u0, u1, …, uk = to` with each `u(i+1)` a
    /// callee of `u(i)` and `k <= max_depth`. BFS over `callees` so shorter
    /// paths are produced first; the caller may truncate the result.
    /// `from == to` yields a single one-node path regardless of `max_depth`.
    pub fn paths(&self, from: &str, to: &str, max_depth: usize) -> Vec<Vec<String>> {
        if from == to {
            return vec![vec![from.to_string()]];
        }
        if !self.index.contains_key(from) || !self.index.contains_key(to) {
            return Vec::new();
        }

        let mut results = Vec::new();
        let mut queue: VecDeque<Vec<String>> = VecDeque::new();
        queue.push_back(vec![from.to_string()]);

        while let Some(path) = queue.pop_front() {
            if path.len() as isize - 1 >= max_depth as isize {
                continue;
            }
            let last = path.last().expect("path is never empty");
            for next in self.callees(last) {
                if path.contains(&next) {
                    continue; // keep paths simple
                }
                let mut extended = path.clone();
                extended.push(next.clone());
                if next == to {
                    results.push(extended);
                } else {
                    queue.push_back(extended);
                }
            }
        }
        results
    }

    /// `limit` USRs with the largest caller sets, descending.
    pub fn top_most_called(&self, limit: usize) -> Vec<(String, usize)> {
        self.ranked(Direction::Incoming, limit)
    }

    /// `limit` USRs with the largest callee sets, descending.
    pub fn top_most_calling(&self, limit: usize) -> Vec<(String, usize)> {
        self.ranked(Direction::Outgoing, limit)
    }

    fn ranked(&self, direction: Direction, limit: usize) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = self
            .index
            .keys()
            .map(|usr| (usr.clone(), self.neighbors(usr, direction).len()))
            .filter(|(_, count)| *count > 0)
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts.truncate(limit);
        counts
    }
}
