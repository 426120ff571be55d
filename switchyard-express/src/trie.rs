use std::collections::HashMap;

use switchyard_core::{MatcherFault, RouteId};

pub(crate) const ROOT: usize = 0;

/// One trie node. Literal edges are keyed by segment text; all parameter
/// segments share the single `param` edge because structural matching is
/// kind-blind.
#[derive(Debug, Default)]
pub(crate) struct Node {
    literals: HashMap<String, usize>,
    param: Option<usize>,
    terminals: Vec<RouteId>,
}

/// The segment trie. Nodes are append-only; an edge pointing outside
/// `nodes` can only mean internal corruption, which resolution reports as
/// a [`MatcherFault`] rather than panicking.
#[derive(Debug)]
pub(crate) struct SegmentTrie {
    nodes: Vec<Node>,
}

impl SegmentTrie {
    pub(crate) fn new() -> Self {
        Self { nodes: vec![Node::default()] }
    }

    pub(crate) fn descend_literal(&mut self, from: usize, segment: &str) -> usize {
        if let Some(&child) = self.nodes[from].literals.get(segment) {
            return child;
        }
        let child = self.push_node();
        self.nodes[from].literals.insert(segment.to_owned(), child);
        child
    }

    pub(crate) fn descend_param(&mut self, from: usize) -> usize {
        if let Some(child) = self.nodes[from].param {
            return child;
        }
        let child = self.push_node();
        self.nodes[from].param = Some(child);
        child
    }

    pub(crate) fn mark_terminal(&mut self, node: usize, route: RouteId) {
        self.nodes[node].terminals.push(route);
    }

    fn push_node(&mut self) -> usize {
        self.nodes.push(Node::default());
        self.nodes.len() - 1
    }

    /// Walks the trie with a frontier of nodes, taking literal and
    /// parameter edges in parallel, and returns every route that ends
    /// exactly where the path ends. The result is sorted ascending so the
    /// caller sees candidates in registration order.
    pub(crate) fn candidates(&self, parts: &[&str]) -> Result<Vec<RouteId>, MatcherFault> {
        let mut frontier = vec![ROOT];
        for part in parts {
            let mut next = Vec::new();
            for &ix in &frontier {
                let node = self.node(ix)?;
                if let Some(&child) = node.literals.get(*part) {
                    next.push(child);
                }
                if let Some(param) = node.param {
                    if !part.is_empty() {
                        next.push(param);
                    }
                }
            }
            if next.is_empty() {
                return Ok(Vec::new());
            }
            frontier = next;
        }

        let mut out = Vec::new();
        for &ix in &frontier {
            out.extend(self.node(ix)?.terminals.iter().copied());
        }
        out.sort_unstable();
        Ok(out)
    }

    fn node(&self, ix: usize) -> Result<&Node, MatcherFault> {
        self.nodes
            .get(ix)
            .ok_or_else(|| MatcherFault::new(format!("dangling trie node index {ix}")))
    }
}
