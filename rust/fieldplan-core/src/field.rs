//! Triangular fields and the edge-placement policy that builds them
//! (spec §3, §4.3, §4.5).

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{FieldplanError, Result};
use crate::geometry::point_in_triangle;
use crate::graph::{Dependency, Graph};

/// Arena index into a [`FieldArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FieldId(pub usize);

/// A triangular region (spec §3). `vertices[0]` is the anchor/nose portal.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub vertices: [usize; 3],
    pub exterior: bool,
    pub contents: Vec<usize>,
    pub splitter: Option<usize>,
    pub children: Option<[FieldId; 3]>,
}

impl Field {
    pub fn new(vertices: [usize; 3], exterior: bool) -> Self {
        Self { vertices, exterior, contents: Vec::new(), splitter: None, children: None }
    }
}

/// Owns every [`Field`] created while building one candidate plan. Arena
/// indices, not pointers, link parents to children (Design Notes §9).
#[derive(Clone, Debug, Default)]
pub struct FieldArena {
    fields: Vec<Field>,
}

impl FieldArena {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn alloc(&mut self, field: Field) -> FieldId {
        self.fields.push(field);
        FieldId(self.fields.len() - 1)
    }

    pub fn get(&self, id: FieldId) -> &Field {
        &self.fields[id.0]
    }

    pub fn get_mut(&mut self, id: FieldId) -> &mut Field {
        &mut self.fields[id.0]
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Drops every field allocated at index `>= at` (backtracking, spec §4.4).
    pub fn truncate(&mut self, at: usize) {
        self.fields.truncate(at);
    }
}

/// The edge-placement policy (spec §4.3). Priority order:
/// 1. Refuse silently if already adjacent in either direction.
/// 2. Add `p -> q` if `p` has outgoing capacity.
/// 3. Else, if `reversible` and `q` has capacity, add `q -> p`.
/// 4. Else try to free capacity at `p` by flipping one of its reversible
///    outgoing edges whose destination has spare capacity, then add `p -> q`.
/// 5. Else, symmetrically at `q`, if `reversible`.
/// 6. Otherwise fail with `Deadend`.
pub fn try_add_link(graph: &mut Graph, p: usize, q: usize, reversible: bool) -> Result<()> {
    if graph.has_edge_either(p, q) {
        return Ok(());
    }
    if graph.can_add_outbound(p) {
        graph.add_edge(p, q, reversible)?;
        return Ok(());
    }
    if reversible && graph.can_add_outbound(q) {
        graph.add_edge(q, p, reversible)?;
        return Ok(());
    }
    if let Some((from, to)) = find_freeable(graph, p) {
        graph.reverse_edge(from, to);
        graph.add_edge(p, q, reversible)?;
        return Ok(());
    }
    if reversible {
        if let Some((from, to)) = find_freeable(graph, q) {
            graph.reverse_edge(from, to);
            graph.add_edge(q, p, reversible)?;
            return Ok(());
        }
    }
    Err(FieldplanError::Deadend(format!(
        "no placement possible for link {p} -> {q}"
    )))
}

/// First outgoing edge from `origin` that is reversible and whose
/// destination has spare outgoing capacity.
fn find_freeable(graph: &Graph, origin: usize) -> Option<(usize, usize)> {
    graph.outgoing(origin).into_iter().find(|&(from, to)| {
        graph.edge(from, to).map(|e| e.reversible).unwrap_or(false) && graph.can_add_outbound(to)
    })
}

impl Field {
    /// Populates `contents` with every portal strictly interior to this
    /// triangle (spec §4.4 step 3).
    pub fn populate_contents(&mut self, gno: &[(f64, f64)]) {
        let v0 = gno[self.vertices[0]];
        let v1 = gno[self.vertices[1]];
        let v2 = gno[self.vertices[2]];
        self.contents = (0..gno.len())
            .filter(|i| !self.vertices.contains(i))
            .filter(|&i| point_in_triangle(gno[i], v0, v1, v2))
            .collect();
    }

    /// Splits on a random interior portal, allocating three children into
    /// `arena` (spec §4.4 step 4, `field.py::split`). No-op if `contents`
    /// is empty.
    pub fn split(field_id: FieldId, arena: &mut FieldArena, rng: &mut impl Rng) {
        let (contents, vertices) = {
            let f = arena.get(field_id);
            (f.contents.clone(), f.vertices)
        };
        if contents.is_empty() {
            return;
        }
        let splitter = *contents.choose(rng).unwrap();
        // child 0: opposite the anchor, treated as exterior (the "tail").
        let child0 = arena.alloc(Field::new([splitter, vertices[1], vertices[2]], true));
        let child1 = arena.alloc(Field::new([vertices[0], vertices[1], splitter], false));
        let child2 = arena.alloc(Field::new([vertices[0], vertices[2], splitter], false));
        let f = arena.get_mut(field_id);
        f.splitter = Some(splitter);
        f.children = Some([child0, child1, child2]);
    }

    /// Builds every link within this field except the final ("jet") links
    /// (spec §4.4 step 4, `field.py::build_links`).
    pub fn build_links(
        field_id: FieldId,
        graph: &mut Graph,
        arena: &mut FieldArena,
        gno: &[(f64, f64)],
        rng: &mut impl Rng,
    ) -> Result<()> {
        let vertices = arena.get(field_id).vertices;
        if graph.has_edge_either(vertices[0], vertices[1])
            && graph.has_edge_either(vertices[0], vertices[2])
        {
            return Err(FieldplanError::Deadend(
                "final vertex completed by neighbor(s)".into(),
            ));
        }

        if arena.get(field_id).contents.is_empty() {
            arena.get_mut(field_id).populate_contents(gno);
        }
        Field::split(field_id, arena, rng);

        let children = arena.get(field_id).children;
        match children {
            None => {
                try_add_link(graph, vertices[2], vertices[1], true)?;
            }
            Some([c0, c1, c2]) => {
                Field::build_links(c0, graph, arena, gno, rng)?;
                Field::build_final_links(c0, graph, arena, rng)?;
                Field::build_links(c1, graph, arena, gno, rng)?;
                Field::build_links(c2, graph, arena, gno, rng)?;
            }
        }
        Ok(())
    }

    /// Builds this field's final ("jet") links, then recurses into the two
    /// non-opposite children (spec §4.4 step 4, `field.py::build_final_links`).
    pub fn build_final_links(
        field_id: FieldId,
        graph: &mut Graph,
        arena: &mut FieldArena,
        rng: &mut impl Rng,
    ) -> Result<()> {
        let (vertices, exterior, children) = {
            let f = arena.get(field_id);
            (f.vertices, f.exterior, f.children)
        };
        if exterior {
            try_add_link(graph, vertices[1], vertices[0], true)?;
            try_add_link(graph, vertices[2], vertices[0], true)?;
        } else {
            try_add_link(graph, vertices[0], vertices[1], false)?;
            try_add_link(graph, vertices[0], vertices[2], false)?;
        }
        let _ = rng; // reserved: jet-link placement order is fixed, no randomness consumed here
        if let Some([_c0, c1, c2]) = children {
            Field::build_final_links(c1, graph, arena, rng)?;
            Field::build_final_links(c2, graph, arena, rng)?;
        }
        Ok(())
    }

    /// Walks the field tree post-order, recording which edge completes each
    /// triangle and the dependencies that completion requires (spec §4.5).
    pub fn assign_fields_to_links(field_id: FieldId, graph: &mut Graph, arena: &FieldArena) -> Result<()> {
        let (vertices, exterior, children, contents) = {
            let f = arena.get(field_id);
            (f.vertices, f.exterior, f.children, f.contents.clone())
        };

        let mut links: Vec<(usize, usize)> = Vec::with_capacity(3);
        for i in 0..3 {
            for j in 0..3 {
                if i == j {
                    continue;
                }
                let (a, b) = (vertices[i], vertices[j]);
                if graph.has_edge(a, b) {
                    links.push((a, b));
                }
            }
        }
        if links.len() != 3 {
            return Err(FieldplanError::InternalInvariant(format!(
                "field {:?} does not have three edges (found {})",
                vertices,
                links.len()
            )));
        }

        let last_link = *links
            .iter()
            .max_by_key(|&&(a, b)| graph.edge(a, b).unwrap().order)
            .unwrap();

        if !exterior {
            let depends: Vec<Dependency> = links
                .iter()
                .filter(|&&l| l != last_link)
                .map(|&(a, b)| Dependency::Edge(a, b))
                .collect();
            let e = graph.edge_mut(last_link.0, last_link.1).unwrap();
            e.fields.push(vertices);
            e.depends.extend(depends);
        } else if let Some(_) = children {
            let opp_link = *links
                .iter()
                .find(|&&(a, b)| a != vertices[0] && b != vertices[0])
                .expect("exterior field with children must have an anchor-opposite edge");
            let e = graph.edge_mut(last_link.0, last_link.1).unwrap();
            e.fields.push(vertices);
            e.depends.push(Dependency::Edge(opp_link.0, opp_link.1));
        } else {
            let e = graph.edge_mut(last_link.0, last_link.1).unwrap();
            e.fields.push(vertices);
        }

        if let Some([c0, c1, c2]) = children {
            Field::assign_fields_to_links(c0, graph, arena)?;
            Field::assign_fields_to_links(c1, graph, arena)?;
            Field::assign_fields_to_links(c2, graph, arena)?;
        }

        let e = graph.edge_mut(last_link.0, last_link.1).unwrap();
        e.depends.extend(contents.into_iter().map(Dependency::Node));

        Ok(())
    }
}
