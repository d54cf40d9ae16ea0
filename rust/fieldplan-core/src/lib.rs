//! fieldplan-core: core library
//!
//! Turns a list of geographic portals into a link-build plan: a
//! directed graph of non-crossing triangular fields, reordered to
//! minimise walking distance, and scheduled across one or more agents.
//!
//! Out of scope here (left to callers): command-line argument parsing,
//! portal-file tokenising, map-tile fetching, and rendering. Those
//! consume this crate's outputs through [`plan::Optimizer`] and
//! [`router::AgentAssignment`].

pub mod error;
pub mod portal;
pub mod geometry;
pub mod graph;
pub mod field;
pub mod fielder;
pub mod reorder;
pub mod generator;
pub mod plan;
pub mod router;

pub use error::FieldplanError;
pub use generator::PlanResult;
pub use graph::{Dependency, Graph};
pub use plan::{Optimizer, OptimizerConfig, WorkerCount};
pub use portal::Portal;
pub use router::{AgentAssignment, RouterConfig};

/// Returns the crate version for basic linkage diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// End-to-end: finds the best plan across `opt_config.num_field_iterations`
/// Generators, then routes it across `router_config.agents` agents.
pub fn plan_and_route(
    portals: &[Portal],
    opt_config: OptimizerConfig,
    router_config: RouterConfig,
) -> error::Result<(PlanResult, Vec<AgentAssignment>)> {
    let dist = geometry::distance_matrix(portals);
    let best = Optimizer::new(opt_config).run(portals)?;
    let assignments = router::route(&best.graph, &dist, &router_config)?;
    Ok((best, assignments))
}
