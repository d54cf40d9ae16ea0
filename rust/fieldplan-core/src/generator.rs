//! A single candidate plan: one fielding attempt, reordered and scored
//! (spec §4.8, `original_source/maxfield/generator.py`).

use rand::Rng;

use crate::error::Result;
use crate::field::FieldArena;
use crate::fielder;
use crate::graph::Graph;
use crate::reorder;

pub const AP_PER_PORTAL: i64 = 1750;
pub const AP_PER_LINK: i64 = 313;
pub const AP_PER_FIELD: i64 = 1250;

/// One fully built, reordered, and scored candidate plan.
#[derive(Clone, Debug)]
pub struct PlanResult {
    pub graph: Graph,
    pub arena: FieldArena,
    pub length: i64,
    pub max_keys: u32,
    pub num_links: usize,
    pub num_fields: usize,
    pub ap: i64,
}

/// Runs the fielder to convergence, both reorder passes, and scores the
/// result (spec §4.4, §4.6, §4.7, §4.8). `seed` must have no edges yet.
pub fn generate(
    seed: &Graph,
    gno: &[(f64, f64)],
    dist: &[Vec<i64>],
    rng: &mut impl Rng,
) -> Result<PlanResult> {
    let mut graph = seed.clone();
    let mut arena = FieldArena::new();

    fielder::run(&mut graph, &mut arena, gno, rng)?;

    let roots = graph.firstgen_fields.clone();
    for root in &roots {
        crate::field::Field::assign_fields_to_links(*root, &mut graph, &arena)?;
    }

    reorder::reorder_links_origin(&mut graph);
    reorder::reannotate(&mut graph, &arena)?;
    reorder::reorder_links_depends(&mut graph, &arena, dist)?;

    Ok(score(graph, arena, dist))
}

fn score(graph: Graph, arena: FieldArena, dist: &[Vec<i64>]) -> PlanResult {
    let order = graph.ordered_links();
    let length = reorder::get_path_length(&order, dist);

    let num_links = graph.num_edges();
    let num_fields: usize = graph.edges_iter().map(|(_, e)| e.fields.len()).sum();

    let mut keys_needed = vec![0u32; graph.num_nodes()];
    for (&(_from, to), _) in graph.edges_iter() {
        keys_needed[to] += 1;
    }
    let max_keys = keys_needed
        .into_iter()
        .enumerate()
        .map(|(p, needed)| needed.saturating_sub(graph.node(p).keys))
        .max()
        .unwrap_or(0);

    let ap = graph.num_nodes() as i64 * AP_PER_PORTAL
        + num_links as i64 * AP_PER_LINK
        + num_fields as i64 * AP_PER_FIELD;

    PlanResult { graph, arena, length, max_keys, num_links, num_fields, ap }
}
