//! Link-order optimisation: origin-grouping and block-move passes
//! (spec §4.6, §4.7).

use crate::error::Result;
use crate::field::{Field, FieldArena};
use crate::graph::{Dependency, Graph};

/// Cap on block-move passes before the reorderer gives up improving further
/// (spec §4.7, `_N_REORDER_ATTEMPTS`).
pub const REORDER_ATTEMPT_LIMIT: usize = 100;

/// Groups same-origin links together so one agent can make several links
/// from a single stop (spec §4.6). Operates on, and returns, an explicit
/// link order; does not touch `graph` until the caller reassigns it.
pub fn reorder_links_origin(graph: &mut Graph) {
    let mut order = graph.ordered_links();
    let mut i = 0;
    while i < order.len() {
        let (from, to) = order[i];
        let completes_field = graph.edge(from, to).map(|e| !e.fields.is_empty()).unwrap_or(false);
        if completes_field {
            i += 1;
            continue;
        }

        if let Some(target) = order[..i].iter().position(|&(f, _)| f == from) {
            if target + 1 != i {
                relocate(&mut order, i, target + 1);
            }
            i += 1;
            continue;
        }

        let reversible = graph.edge(from, to).map(|e| e.reversible).unwrap_or(false);
        if reversible && graph.can_add_outbound(to) {
            if let Some(target) = order[..i].iter().position(|&(f, _)| f == to) {
                graph.reverse_edge(from, to);
                order[i] = (to, from);
                if target + 1 != i {
                    relocate(&mut order, i, target + 1);
                }
                i += 1;
                continue;
            }
        }

        i += 1;
    }
    graph.reassign_order(&order);
}

fn relocate(order: &mut Vec<(usize, usize)>, from: usize, to: usize) {
    let item = order.remove(from);
    order.insert(to, item);
}

/// Total single-agent path length: sum of distances between consecutive
/// link origins, in the given order.
pub fn get_path_length(order: &[(usize, usize)], dist: &[Vec<i64>]) -> i64 {
    order
        .windows(2)
        .map(|w| dist[w[0].0][w[1].0])
        .sum()
}

/// `true` if any link in `later` depends (edge- or node-style) on any link
/// in `earlier` (spec §4.7).
fn depends_on_any(graph: &Graph, later: (usize, usize), earlier: &[(usize, usize)]) -> bool {
    let Some(e) = graph.edge(later.0, later.1) else { return false };
    e.depends.iter().any(|d| match *d {
        Dependency::Edge(u, v) => earlier.contains(&(u, v)),
        Dependency::Node(u) => earlier.iter().any(|&(f, _)| f == u),
    })
}

/// Whether moving `block` (currently at `[i, i+s)`) to sit just before/after
/// index `j` is legal under dependency constraints (spec §4.7).
fn move_is_legal(graph: &Graph, order: &[(usize, usize)], i: usize, s: usize, j: usize) -> bool {
    let block = &order[i..i + s];
    if j < i {
        let between = &order[j..i];
        !block.iter().any(|&b| depends_on_any(graph, b, between))
    } else {
        let between = &order[i + s..=j.min(order.len() - 1)];
        !between.iter().any(|&b| depends_on_any(graph, b, block))
    }
}

/// Re-annotates `fields`/`depends` on every edge by clearing them and
/// replaying field→link assignment from the first-generation roots
/// (spec §4.7, last paragraph).
pub fn reannotate(graph: &mut Graph, arena: &FieldArena) -> Result<()> {
    graph.clear_annotations();
    let roots = graph.firstgen_fields.clone();
    for root in roots {
        Field::assign_fields_to_links(root, graph, arena)?;
    }
    Ok(())
}

/// Hill-climbs path length by relocating contiguous blocks of links,
/// subject to dependency legality (spec §4.7). Mutates `graph`'s order and
/// re-annotates after every accepted move. Returns the number of accepted
/// moves.
// Recomputes full path length per candidate rather than the incremental
// three-edge delta; simpler and correct, at the cost of an extra O(n) per
// candidate move.
pub fn reorder_links_depends(graph: &mut Graph, arena: &FieldArena, dist: &[Vec<i64>]) -> Result<usize> {
    let mut accepted = 0;
    for _pass in 0..REORDER_ATTEMPT_LIMIT {
        let mut order = graph.ordered_links();
        let n = order.len();
        if n < 2 {
            break;
        }
        let max_block = (n / 4).max(1);
        let mut improved = false;

        'search: for s in 1..=max_block {
            for i in 0..=(n - s) {
                let before_len = get_path_length(&order, dist);
                for j in 0..n {
                    if j >= i && j < i + s {
                        continue;
                    }
                    if !move_is_legal(graph, &order, i, s, j) {
                        continue;
                    }
                    let mut candidate = order.clone();
                    let block: Vec<_> = candidate.drain(i..i + s).collect();
                    let insert_at = if j < i { j } else { j - s + 1 };
                    for (k, link) in block.into_iter().enumerate() {
                        candidate.insert(insert_at + k, link);
                    }
                    let after = get_path_length(&candidate, dist);
                    if after < before_len {
                        order = candidate;
                        graph.reassign_order(&order);
                        reannotate(graph, arena)?;
                        accepted += 1;
                        improved = true;
                        break 'search;
                    }
                }
            }
        }

        if !improved {
            break;
        }
    }
    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeAttrs;

    fn graph(n: usize) -> Graph {
        Graph::new(vec![NodeAttrs { sbul: false, keys: 0 }; n])
    }

    #[test]
    fn origin_grouping_moves_same_origin_link_adjacent() {
        let mut g = graph(4);
        g.add_edge(0, 1, true).unwrap();
        g.add_edge(2, 3, true).unwrap();
        g.add_edge(0, 2, true).unwrap();
        reorder_links_origin(&mut g);
        let order = g.ordered_links();
        let pos0a = order.iter().position(|&l| l == (0, 1)).unwrap();
        let pos0b = order.iter().position(|&l| l == (0, 2)).unwrap();
        assert_eq!((pos0a as isize - pos0b as isize).abs(), 1);
    }

    #[test]
    fn path_length_sums_consecutive_origin_distances() {
        let dist = vec![vec![0, 5, 9], vec![5, 0, 4], vec![9, 4, 0]];
        let order = vec![(0, 1), (1, 2), (2, 0)];
        assert_eq!(get_path_length(&order, &dist), 5 + 4);
    }
}
