//! Directed multigraph of portals and links (spec §3, §4.2).

mod model;

pub use model::{Dependency, EdgeAttrs, Graph, NodeAttrs};
