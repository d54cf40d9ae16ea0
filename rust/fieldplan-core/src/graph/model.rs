use std::collections::BTreeMap;

use crate::error::{FieldplanError, Result};
use crate::field::FieldId;

/// Per-portal attributes (spec §3).
#[derive(Clone, Debug, PartialEq)]
pub struct NodeAttrs {
    pub sbul: bool,
    pub keys: u32,
}

impl NodeAttrs {
    pub fn outgoing_cap(&self) -> usize {
        if self.sbul { 40 } else { 8 }
    }
}

/// A link's completion dependency: either a specific edge, or "all outgoing
/// edges from this portal" (spec §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Dependency {
    Edge(usize, usize),
    Node(usize),
}

/// Per-link attributes (spec §3).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeAttrs {
    pub order: usize,
    pub reversible: bool,
    pub fields: Vec<[usize; 3]>,
    pub depends: Vec<Dependency>,
}

/// Directed graph whose nodes are portal indices `0..N` and whose edges are
/// directed links (spec §3). Dense node indexing; edge lookup by `(from,
/// to)` is O(log N) via a `BTreeMap`.
#[derive(Clone, Debug)]
pub struct Graph {
    nodes: Vec<NodeAttrs>,
    out_degree: Vec<usize>,
    edges: BTreeMap<(usize, usize), EdgeAttrs>,
    /// Dense build-order sequence matching edge `order`; the structure that
    /// backtracking truncates (spec §4.4) and that `reverse_edge` mutates
    /// in place at a fixed index (spec §4.2, testable property 5).
    pub link_order: Vec<(usize, usize)>,
    /// Root fields of the first-generation triangulation.
    pub firstgen_fields: Vec<FieldId>,
}

impl Graph {
    pub fn new(nodes: Vec<NodeAttrs>) -> Self {
        let n = nodes.len();
        Self {
            nodes,
            out_degree: vec![0; n],
            edges: BTreeMap::new(),
            link_order: Vec::new(),
            firstgen_fields: Vec::new(),
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, p: usize) -> &NodeAttrs {
        &self.nodes[p]
    }

    pub fn out_degree(&self, p: usize) -> usize {
        self.out_degree[p]
    }

    pub fn can_add_outbound(&self, p: usize) -> bool {
        self.out_degree[p] < self.nodes[p].outgoing_cap()
    }

    pub fn has_edge(&self, from: usize, to: usize) -> bool {
        self.edges.contains_key(&(from, to))
    }

    pub fn has_edge_either(&self, a: usize, b: usize) -> bool {
        self.has_edge(a, b) || self.has_edge(b, a)
    }

    pub fn edge(&self, from: usize, to: usize) -> Option<&EdgeAttrs> {
        self.edges.get(&(from, to))
    }

    pub fn edge_mut(&mut self, from: usize, to: usize) -> Option<&mut EdgeAttrs> {
        self.edges.get_mut(&(from, to))
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn edges_iter(&self) -> impl Iterator<Item = (&(usize, usize), &EdgeAttrs)> {
        self.edges.iter()
    }

    /// Outgoing edges `(from, to)` from `p`, in no particular order.
    pub fn outgoing(&self, p: usize) -> Vec<(usize, usize)> {
        self.edges
            .range((p, usize::MIN)..(p + 1, usize::MIN))
            .map(|(&k, _)| k)
            .collect()
    }

    /// Adds `from -> to` at the next dense order slot. Fails with
    /// `DuplicateEdge` if either direction already exists (spec §4.2).
    pub fn add_edge(&mut self, from: usize, to: usize, reversible: bool) -> Result<()> {
        if self.has_edge_either(from, to) {
            return Err(FieldplanError::DuplicateEdge(from, to));
        }
        let order = self.link_order.len();
        self.edges.insert(
            (from, to),
            EdgeAttrs { order, reversible, fields: Vec::new(), depends: Vec::new() },
        );
        self.link_order.push((from, to));
        self.out_degree[from] += 1;
        Ok(())
    }

    /// Reverses `from -> to` into `to -> from`, preserving all other
    /// attributes and the edge's `order` slot in `link_order` in place.
    pub fn reverse_edge(&mut self, from: usize, to: usize) {
        let attrs = self.edges.remove(&(from, to)).expect("reverse_edge: no such edge");
        let order = attrs.order;
        self.edges.insert((to, from), attrs);
        self.link_order[order] = (to, from);
        self.out_degree[from] -= 1;
        self.out_degree[to] += 1;
    }

    pub fn remove_edge(&mut self, from: usize, to: usize) {
        if self.edges.remove(&(from, to)).is_some() {
            self.out_degree[from] -= 1;
        }
    }

    /// Removes every edge whose `order` is `>= at`, from both the edge map
    /// and `link_order`. Used by backtracking (spec §4.4); handles edges
    /// that were reversed since the snapshot was taken (the edge may sit
    /// at index `order` under either orientation).
    pub fn truncate_links(&mut self, at: usize) {
        for &(from, to) in self.link_order[at..].iter() {
            self.remove_edge(from, to);
        }
        self.link_order.truncate(at);
    }

    /// Re-assigns dense `order` indices to match a given order of links,
    /// used by the reorder passes (spec §4.6, §4.7).
    pub fn reassign_order(&mut self, ordered_links: &[(usize, usize)]) {
        for (order, &link) in ordered_links.iter().enumerate() {
            if let Some(e) = self.edges.get_mut(&link) {
                e.order = order;
            }
        }
        self.link_order = ordered_links.to_vec();
    }

    /// Clears every edge's `fields`/`depends`, ready for re-annotation
    /// (spec §4.7).
    pub fn clear_annotations(&mut self) {
        for e in self.edges.values_mut() {
            e.fields.clear();
            e.depends.clear();
        }
    }

    pub fn ordered_links(&self) -> Vec<(usize, usize)> {
        let mut v: Vec<(usize, usize)> = self.edges.keys().copied().collect();
        v.sort_by_key(|&link| self.edges[&link].order);
        v
    }
}
