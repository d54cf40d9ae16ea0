use thiserror::Error;

/// Error kinds produced by the core pipeline (spec §7).
///
/// `Deadend` is an internal control-flow signal: [`crate::fielder::run`]
/// uses it to drive backtracking internally and translates an exhausted
/// search into `TriangulationFailed` at its own boundary, so it must never
/// escape [`crate::fielder::run`] (and therefore never
/// [`crate::generator::generate`]). It is public only because
/// field-building helpers need to return it across module boundaries
/// inside this crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldplanError {
    /// A particular field-build attempt could not place a required link.
    /// Recoverable: the Fielder backtracks and retries.
    #[error("deadend: {0}")]
    Deadend(String),

    /// Both endpoints of an edge already have a link between them.
    #[error("duplicate edge between portals {0} and {1}")]
    DuplicateEdge(usize, usize),

    /// All random permutations were exhausted without a valid triangulation.
    #[error("triangulation failed after exhausting all perimeter permutations")]
    TriangulationFailed,

    /// The routing solver found no feasible multi-agent assignment.
    #[error("no feasible agent routing found")]
    RoutingInfeasible,

    /// A structural invariant was violated; indicates a bug in this crate.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

pub type Result<T> = std::result::Result<T, FieldplanError>;
