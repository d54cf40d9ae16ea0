use std::env;
use std::num::NonZeroUsize;
use std::time::Duration;

/// Environment overrides layered on top of CLI flags, in the teacher's
/// `Config::from_env` style.
#[derive(Clone, Debug)]
pub struct Config {
    pub router_max_solutions: usize,
    pub router_time_budget: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let router_max_solutions = env::var("FIELDPLAN_ROUTER_MAX_SOLUTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(200);
        let router_time_budget_secs: u64 = env::var("FIELDPLAN_ROUTER_TIME_BUDGET_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);
        Self {
            router_max_solutions,
            router_time_budget: Duration::from_secs(router_time_budget_secs),
        }
    }
}

/// Resolves a worker-count CLI flag: `0` means "all available CPUs", `1`
/// sequential, anything else a fixed thread count.
pub fn resolve_workers(n: usize) -> fieldplan_core::WorkerCount {
    match n {
        0 => fieldplan_core::WorkerCount::AllCpus,
        1 => fieldplan_core::WorkerCount::Sequential,
        n => fieldplan_core::WorkerCount::Fixed(NonZeroUsize::new(n).unwrap()),
    }
}
