//! End-to-end scenarios and quantified invariants (spec §8).

use std::collections::HashSet;

use fieldplan_core::{generator, geometry, graph::NodeAttrs, portal::Portal, Graph};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn run_once(portals: &[Portal], seed: u64) -> generator::PlanResult {
    let gno = geometry::gnomonic_proj(portals);
    let dist = geometry::distance_matrix(portals);
    let seed_graph = Graph::new(
        portals.iter().map(|p| NodeAttrs { sbul: p.sbul, keys: p.keys }).collect(),
    );
    let mut rng = StdRng::seed_from_u64(seed);
    generator::generate(&seed_graph, &gno, &dist, &mut rng).unwrap()
}

fn assert_invariants(result: &generator::PlanResult) {
    let graph = &result.graph;

    // 1. outgoing-degree caps respected
    for p in 0..graph.num_nodes() {
        assert!(graph.out_degree(p) <= graph.node(p).outgoing_cap());
    }

    // 2. `order` is a permutation of 0..M-1
    let mut orders: Vec<usize> = graph.edges_iter().map(|(_, e)| e.order).collect();
    orders.sort_unstable();
    assert_eq!(orders, (0..graph.num_edges()).collect::<Vec<_>>());

    // 3. every edge listing a field has the maximum order among that
    // field's three edges
    for (&(from, to), e) in graph.edges_iter() {
        for field in &e.fields {
            let mut orders_in_field = Vec::new();
            for i in 0..3 {
                for j in 0..3 {
                    if i == j {
                        continue;
                    }
                    if let Some(fe) = graph.edge(field[i], field[j]) {
                        orders_in_field.push(fe.order);
                    }
                }
            }
            assert_eq!(orders_in_field.len(), 3);
            assert_eq!(*orders_in_field.iter().max().unwrap(), e.order, "edge ({from},{to})");
        }
    }

    // 4. dependency completion precedes dependent order
    for (_, e) in graph.edges_iter() {
        for dep in &e.depends {
            match *dep {
                fieldplan_core::Dependency::Edge(u, v) => {
                    let dep_order = graph.edge(u, v).unwrap().order;
                    assert!(dep_order < e.order);
                }
                fieldplan_core::Dependency::Node(p) => {
                    for (_, oe) in graph.edges_iter().filter(|((f, _), _)| *f == p) {
                        assert!(oe.order < e.order);
                    }
                }
            }
        }
    }
}

#[test]
fn s1_triangle_produces_three_links_one_field() {
    let portals = vec![
        Portal::new("a", 0.0, 0.0),
        Portal::new("b", 0.001, 0.0),
        Portal::new("c", 0.0, 0.001),
    ];
    let result = run_once(&portals, 1);
    assert_eq!(result.num_links, 3);
    assert_eq!(result.num_fields, 1);
    assert_eq!(result.ap, 3 * generator::AP_PER_PORTAL + 3 * generator::AP_PER_LINK + generator::AP_PER_FIELD);
    assert_invariants(&result);
}

#[test]
fn s2_triangle_plus_center_produces_six_links_four_fields() {
    let portals = vec![
        Portal::new("a", 0.0, 0.0),
        Portal::new("b", 0.002, 0.0),
        Portal::new("c", 0.0, 0.002),
        Portal::new("center", 0.0006, 0.0006),
    ];
    for seed in 0..5 {
        let result = run_once(&portals, seed);
        assert_eq!(result.num_links, 6, "seed {seed}");
        assert_eq!(result.num_fields, 4, "seed {seed}");
        assert_invariants(&result);
    }
}

#[test]
fn s3_square_produces_five_links_two_fields() {
    let portals = vec![
        Portal::new("a", 0.0, 0.0),
        Portal::new("b", 0.002, 0.0),
        Portal::new("c", 0.002, 0.002),
        Portal::new("d", 0.0, 0.002),
    ];
    for seed in 0..5 {
        let result = run_once(&portals, seed);
        assert_eq!(result.num_links, 5, "seed {seed}");
        assert_eq!(result.num_fields, 2, "seed {seed}");
        assert_invariants(&result);
    }
}

#[test]
fn s4_eight_around_one_respects_cap_and_field_count() {
    let mut portals = Vec::new();
    for i in 0..8 {
        let angle = (i as f64) * std::f64::consts::TAU / 8.0;
        portals.push(Portal::new(format!("p{i}"), 0.01 * angle.cos(), 0.01 * angle.sin()));
    }
    portals.push(Portal::new("center", 0.0, 0.0));

    let result = run_once(&portals, 99);
    assert_eq!(result.num_links, 20);
    assert_eq!(result.num_fields, 14);
    assert!(result.max_keys <= 8);
    assert_invariants(&result);
}

#[test]
fn s5_ten_around_one_over_cap_returns_triangulation_failed_not_deadend() {
    let mut portals = Vec::new();
    for i in 0..10 {
        let angle = (i as f64) * std::f64::consts::TAU / 10.0;
        portals.push(Portal::new(format!("p{i}"), 0.01 * angle.cos(), 0.01 * angle.sin()));
    }
    portals.push(Portal::new("center", 0.0, 0.0));

    let gno = geometry::gnomonic_proj(&portals);
    let dist = geometry::distance_matrix(&portals);
    let seed_graph = Graph::new(
        portals.iter().map(|p| NodeAttrs { sbul: p.sbul, keys: p.keys }).collect(),
    );

    for seed in 0..5 {
        let mut rng = StdRng::seed_from_u64(seed);
        let err = generator::generate(&seed_graph, &gno, &dist, &mut rng).unwrap_err();
        assert_eq!(err, fieldplan_core::FieldplanError::TriangulationFailed, "seed {seed}");
    }
}

#[test]
fn s6_two_agents_uses_both_and_never_violates_precedence() {
    use fieldplan_core::{router, RouterConfig};
    use std::num::NonZeroUsize;

    let portals = vec![
        Portal::new("a", 0.0, 0.0),
        Portal::new("b", 0.002, 0.0),
        Portal::new("c", 0.0, 0.002),
        Portal::new("center", 0.0006, 0.0006),
    ];
    let dist = geometry::distance_matrix(&portals);
    let result = run_once(&portals, 2);

    let config = RouterConfig {
        agents: NonZeroUsize::new(2).unwrap(),
        ..Default::default()
    };
    let assignments = router::route(&result.graph, &dist, &config).unwrap();

    let agents_used: HashSet<usize> = assignments.iter().map(|a| a.agent).collect();
    assert!(!agents_used.is_empty());

    for (&(from, to), e) in result.graph.edges_iter() {
        let this_assignment = assignments.iter().find(|a| a.link == (from, to)).unwrap();
        for dep in &e.depends {
            if let fieldplan_core::Dependency::Edge(u, v) = *dep {
                let dep_assignment = assignments.iter().find(|a| a.link == (u, v)).unwrap();
                assert!(this_assignment.arrive > dep_assignment.depart);
            }
        }
    }
}
