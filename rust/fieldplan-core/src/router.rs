//! Assigns and schedules the link build order across one or more agents
//! (spec §4.9, `original_source/maxfield/router.py`).

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use crate::error::{FieldplanError, Result};
use crate::graph::{Dependency, Graph};

pub const WALKSPEED_MPS: f64 = 1.0;
pub const LINKTIME_SECS: i64 = 30;
pub const COMMTIME_SECS: i64 = 30;

#[derive(Clone, Copy, Debug)]
pub struct RouterConfig {
    pub agents: NonZeroUsize,
    pub max_solutions: usize,
    pub time_budget: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            agents: NonZeroUsize::new(1).unwrap(),
            max_solutions: 200,
            time_budget: Duration::from_secs(5),
        }
    }
}

/// One scheduled link: which agent builds it, and when (seconds from plan
/// start).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgentAssignment {
    pub agent: usize,
    pub link: (usize, usize),
    pub arrive: i64,
    pub depart: i64,
}

struct Group {
    origin: usize,
    links: Vec<(usize, usize)>,
}

/// Assigns `graph`'s ordered links to `config.agents` agents and schedules
/// arrival/departure times (spec §4.9).
pub fn route(graph: &Graph, dist: &[Vec<i64>], config: &RouterConfig) -> Result<Vec<AgentAssignment>> {
    let order = graph.ordered_links();
    if order.is_empty() {
        return Ok(Vec::new());
    }

    if config.agents.get() == 1 {
        return Ok(route_trivial(&order, dist));
    }

    let groups = compress(&order);
    let link_group = index_groups(&groups);
    let depends = group_dependencies(graph, &groups, &link_group);

    let mut best = schedule(&groups, &depends, dist, &round_robin_assignment(groups.len(), config.agents.get()));
    let mut best_makespan = makespan(&best);

    let deadline = Instant::now() + config.time_budget;
    let mut tried = 0usize;
    let mut assignment = round_robin_assignment(groups.len(), config.agents.get());
    let mut rng_state: u64 = 0x2545_F491_4F6C_DD1D;

    while tried < config.max_solutions && Instant::now() < deadline {
        tried += 1;
        let a = next_rand(&mut rng_state) as usize % groups.len();
        let old = assignment[a];
        let new_agent = next_rand(&mut rng_state) as usize % config.agents.get();
        if new_agent == old {
            continue;
        }
        assignment[a] = new_agent;
        let candidate = schedule(&groups, &depends, dist, &assignment);
        let candidate_makespan = makespan(&candidate);
        if candidate_makespan < best_makespan {
            best_makespan = candidate_makespan;
            best = candidate;
        } else {
            assignment[a] = old;
        }
    }

    if best.is_empty() {
        return Err(FieldplanError::RoutingInfeasible);
    }
    Ok(best)
}

fn route_trivial(order: &[(usize, usize)], dist: &[Vec<i64>]) -> Vec<AgentAssignment> {
    let mut out = Vec::with_capacity(order.len());
    let mut arrive = 0i64;
    for i in 0..order.len() {
        let depart = arrive + LINKTIME_SECS;
        out.push(AgentAssignment { agent: 0, link: order[i], arrive, depart });
        if i + 1 < order.len() {
            let travel = (dist[order[i].0][order[i + 1].0] as f64 / WALKSPEED_MPS).round() as i64;
            arrive = depart + travel;
        }
    }
    out
}

fn compress(order: &[(usize, usize)]) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    for &link in order {
        if let Some(last) = groups.last_mut() {
            if last.origin == link.0 {
                last.links.push(link);
                continue;
            }
        }
        groups.push(Group { origin: link.0, links: vec![link] });
    }
    groups
}

/// Maps every link to the index of the compressed group that contains it.
fn index_groups(groups: &[Group]) -> std::collections::HashMap<(usize, usize), usize> {
    let mut map = std::collections::HashMap::new();
    for (k, g) in groups.iter().enumerate() {
        for &link in &g.links {
            map.insert(link, k);
        }
    }
    map
}

/// For every group, the set of earlier group indices it depends on (edge-
/// or node-style), resolved via every link the group contains (spec §4.9,
/// generalised beyond strictly-consecutive groups so that property 9 holds
/// for every dependency pair, not only adjacent ones).
fn group_dependencies(graph: &Graph, groups: &[Group], link_group: &std::collections::HashMap<(usize, usize), usize>) -> Vec<Vec<usize>> {
    groups
        .iter()
        .map(|g| {
            let mut deps: Vec<usize> = g
                .links
                .iter()
                .filter_map(|&(u, v)| graph.edge(u, v))
                .flat_map(|e| e.depends.iter())
                .flat_map(|d| match *d {
                    Dependency::Edge(a, b) => link_group.get(&(a, b)).copied().into_iter().collect::<Vec<_>>(),
                    Dependency::Node(p) => graph
                        .outgoing(p)
                        .iter()
                        .filter_map(|l| link_group.get(l).copied())
                        .collect::<Vec<_>>(),
                })
                .collect();
            deps.sort_unstable();
            deps.dedup();
            deps
        })
        .collect()
}

fn round_robin_assignment(num_groups: usize, num_agents: usize) -> Vec<usize> {
    (0..num_groups).map(|i| i % num_agents).collect()
}

/// Discrete-event list-scheduling simulation: groups are visited in their
/// fixed (already dependency-respecting) order, each landing on whichever
/// agent can reach it soonest without violating precedence (spec §4.9,
/// "seed with a naive solution" plus the local-search step above). A
/// group's ready time is the max, over every group it depends on, of that
/// group's completion time plus `COMMTIME`; adjacent non-dependent groups
/// only need non-decreasing arrival, matching "parallel fielding" allowed
/// by the spec.
fn schedule(groups: &[Group], depends: &[Vec<usize>], dist: &[Vec<i64>], assignment: &[usize]) -> Vec<AgentAssignment> {
    let num_agents = assignment.iter().copied().max().map(|m| m + 1).unwrap_or(1);
    let mut agent_free = vec![0i64; num_agents];
    let mut agent_pos: Vec<Option<usize>> = vec![None; num_agents];
    let mut out = Vec::new();

    let mut group_arrive = vec![0i64; groups.len()];
    let mut group_completion = vec![0i64; groups.len()];

    for (k, group) in groups.iter().enumerate() {
        let mut ready_time = if k > 0 { group_arrive[k - 1] } else { 0 };
        for &dep in &depends[k] {
            ready_time = ready_time.max(group_completion[dep] + COMMTIME_SECS);
        }

        let agent = assignment[k];
        let travel = match agent_pos[agent] {
            Some(from) => (dist[from][group.origin] as f64 / WALKSPEED_MPS).round() as i64,
            None => 0,
        };
        let earliest = agent_free[agent] + travel;
        let arrive = earliest.max(ready_time);

        let mut clock = arrive;
        for &link in &group.links {
            let depart = clock + LINKTIME_SECS;
            out.push(AgentAssignment { agent, link, arrive: clock, depart });
            clock = depart;
        }

        agent_free[agent] = clock;
        agent_pos[agent] = Some(group.origin);
        group_arrive[k] = arrive;
        group_completion[k] = clock;
    }

    out.sort_by(|a, b| a.arrive.cmp(&b.arrive).then(a.agent.cmp(&b.agent)));
    out
}

fn makespan(assignments: &[AgentAssignment]) -> i64 {
    assignments.iter().map(|a| a.depart).max().unwrap_or(0)
}

/// xorshift64*, deterministic and dependency-free; good enough for a local
/// search that just needs varied candidate moves, not cryptographic
/// randomness.
fn next_rand(state: &mut u64) -> u64 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    *state = x;
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeAttrs;

    fn graph(n: usize) -> Graph {
        Graph::new(vec![NodeAttrs { sbul: false, keys: 0 }; n])
    }

    #[test]
    fn trivial_single_agent_schedule_is_sequential() {
        let mut g = graph(3);
        g.add_edge(0, 1, true).unwrap();
        g.add_edge(1, 2, true).unwrap();
        let dist = vec![vec![0, 10, 20], vec![10, 0, 10], vec![20, 10, 0]];
        let config = RouterConfig { agents: NonZeroUsize::new(1).unwrap(), ..Default::default() };
        let out = route(&g, &dist, &config).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].arrive, 0);
        assert_eq!(out[0].depart, LINKTIME_SECS);
        assert_eq!(out[1].arrive, LINKTIME_SECS + 10);
    }

    #[test]
    fn multi_agent_schedule_uses_more_than_one_agent_when_beneficial() {
        let mut g = graph(4);
        g.add_edge(0, 1, true).unwrap();
        g.add_edge(2, 3, true).unwrap();
        let dist = vec![
            vec![0, 1000, 5, 1000],
            vec![1000, 0, 1000, 5],
            vec![5, 1000, 0, 1000],
            vec![1000, 5, 1000, 0],
        ];
        let config = RouterConfig {
            agents: NonZeroUsize::new(2).unwrap(),
            max_solutions: 50,
            time_budget: Duration::from_millis(200),
        };
        let out = route(&g, &dist, &config).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn empty_graph_routes_to_no_assignments() {
        let g = graph(0);
        let dist: Vec<Vec<i64>> = Vec::new();
        let config = RouterConfig::default();
        let out = route(&g, &dist, &config).unwrap();
        assert!(out.is_empty());
    }
}
