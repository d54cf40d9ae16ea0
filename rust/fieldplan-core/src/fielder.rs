//! Recursive ear-clipping triangulation of the portal perimeter (spec §4.4).

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{FieldplanError, Result};
use crate::field::{Field, FieldArena};
use crate::geometry::convex_hull;
use crate::graph::Graph;

/// Cap on build retries for a single perimeter candidate before giving up on
/// it and trying the next one (spec §4.4 step 4, `_N_FIELD_ATTEMPTS`).
pub const FIELD_ATTEMPT_LIMIT: usize = 100;

/// Triangulates every portal reachable from `graph`'s node set, starting
/// from the gnomonic convex hull. On success every node belongs to at least
/// one field and `graph.firstgen_fields` holds the first-generation roots.
pub fn run(graph: &mut Graph, arena: &mut FieldArena, gno: &[(f64, f64)], rng: &mut impl Rng) -> Result<()> {
    let hull = convex_hull(gno);
    make_fields(&hull, graph, arena, gno, rng).map_err(|e| match e {
        FieldplanError::Deadend(_) => FieldplanError::TriangulationFailed,
        other => other,
    })
}

/// Ear-clips one triangle off `perimeter` at a time (spec §4.4 steps 1-5).
fn make_fields(
    perimeter: &[usize],
    graph: &mut Graph,
    arena: &mut FieldArena,
    gno: &[(f64, f64)],
    rng: &mut impl Rng,
) -> Result<()> {
    if perimeter.len() < 3 {
        return Ok(());
    }

    let n = perimeter.len();
    let mut candidates: Vec<usize> = (0..n).collect();
    candidates.shuffle(rng);

    for pos in candidates {
        let prev = perimeter[(pos + n - 1) % n];
        let cur = perimeter[pos];
        let next = perimeter[(pos + 1) % n];

        for _attempt in 0..FIELD_ATTEMPT_LIMIT {
            let links_snapshot = graph.link_order.len();
            let fields_snapshot = graph.firstgen_fields.len();
            let arena_snapshot = arena.len();

            let vertices = random_rotation([prev, cur, next], rng);
            let root = arena.alloc(Field::new(vertices, true));

            let built = Field::build_links(root, graph, arena, gno, rng)
                .and_then(|_| Field::build_final_links(root, graph, arena, rng));

            let succeeded = match built {
                Ok(()) => {
                    graph.firstgen_fields.push(root);
                    let mut reduced = perimeter.to_vec();
                    reduced.remove(pos);
                    make_fields(&reduced, graph, arena, gno, rng).is_ok()
                }
                Err(_) => false,
            };

            if succeeded {
                return Ok(());
            }

            graph.truncate_links(links_snapshot);
            graph.firstgen_fields.truncate(fields_snapshot);
            arena.truncate(arena_snapshot);
        }
    }

    Err(FieldplanError::Deadend(
        "exhausted every perimeter candidate and retry budget".into(),
    ))
}

/// Picks one of the three cyclic rotations of `[prev, cur, next]` at random,
/// so the anchor (`vertices[0]`) is not always the same perimeter role
/// (spec §4.4 step 2, "randomise which vertex is the anchor").
fn random_rotation(v: [usize; 3], rng: &mut impl Rng) -> [usize; 3] {
    match rng.gen_range(0..3) {
        0 => [v[0], v[1], v[2]],
        1 => [v[1], v[2], v[0]],
        _ => [v[2], v[0], v[1]],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeAttrs;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn graph(n: usize) -> Graph {
        Graph::new(vec![NodeAttrs { sbul: false, keys: 0 }; n])
    }

    #[test]
    fn triangulates_a_square_with_one_interior_portal() {
        let gno = vec![
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (0.0, 10.0),
            (5.0, 5.0),
        ];
        let mut g = graph(gno.len());
        let mut arena = FieldArena::new();
        let mut rng = StdRng::seed_from_u64(7);
        run(&mut g, &mut arena, &gno, &mut rng).unwrap();
        assert!(!g.firstgen_fields.is_empty());
        assert!(g.num_edges() >= 5);
    }

    #[test]
    fn triangulates_a_bare_triangle_with_no_interior_portals() {
        let gno = vec![(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)];
        let mut g = graph(gno.len());
        let mut arena = FieldArena::new();
        let mut rng = StdRng::seed_from_u64(1);
        run(&mut g, &mut arena, &gno, &mut rng).unwrap();
        assert_eq!(g.num_edges(), 3);
        assert_eq!(g.firstgen_fields.len(), 1);
    }

    #[test]
    fn fewer_than_three_portals_succeeds_trivially() {
        let gno = vec![(0.0, 0.0), (10.0, 0.0)];
        let mut g = graph(gno.len());
        let mut arena = FieldArena::new();
        let mut rng = StdRng::seed_from_u64(3);
        run(&mut g, &mut arena, &gno, &mut rng).unwrap();
        assert_eq!(g.num_edges(), 0);
        assert!(g.firstgen_fields.is_empty());
    }
}
