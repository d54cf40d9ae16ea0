//! Spawns Generators across a worker pool and picks the best plan
//! (spec §4.8, `original_source/maxfield/plan.py::optimize`).

use std::num::NonZeroUsize;
use std::sync::mpsc;
use std::thread;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{FieldplanError, Result};
use crate::generator::{self, PlanResult};
use crate::geometry;
use crate::graph::{Graph, NodeAttrs};
use crate::portal::Portal;

/// How many OS threads the Optimizer may use for inter-plan parallelism
/// (spec §5, `original_source/maxfield/plan.py` — `num_cpus < 1` meaning
/// "all available").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerCount {
    Sequential,
    Fixed(NonZeroUsize),
    AllCpus,
}

impl WorkerCount {
    fn resolve(self) -> usize {
        match self {
            WorkerCount::Sequential => 1,
            WorkerCount::Fixed(n) => n.get(),
            WorkerCount::AllCpus => thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct OptimizerConfig {
    pub num_field_iterations: usize,
    pub workers: WorkerCount,
    pub seed: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self { num_field_iterations: 1, workers: WorkerCount::Sequential, seed: 0 }
    }
}

pub struct Optimizer {
    config: OptimizerConfig,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Runs `num_field_iterations` Generators, spread across
    /// `config.workers` threads, and returns the lexicographically best
    /// plan by `(-AP, length, max_keys)` (spec §4.8). A Generator that
    /// fails to triangulate is simply discarded and the next one tried;
    /// `TriangulationFailed` is only returned here if every Generator
    /// failed. An `InternalInvariant` from any Generator instead aborts
    /// the whole run immediately (spec §7) and is propagated as-is.
    pub fn run(&self, portals: &[Portal]) -> Result<PlanResult> {
        let gno = geometry::gnomonic_proj(portals);
        let dist = geometry::distance_matrix(portals);
        let seed = Graph::new(
            portals
                .iter()
                .map(|p| NodeAttrs { sbul: p.sbul, keys: p.keys })
                .collect(),
        );

        let worker_count = self.config.workers.resolve().max(1);
        let n = self.config.num_field_iterations.max(1);
        let chunk = n.div_ceil(worker_count);

        let (tx, rx) = mpsc::channel();
        let mut handles = Vec::new();
        let mut start = 0;
        let mut worker_idx = 0u64;
        while start < n {
            let end = (start + chunk).min(n);
            let tx = tx.clone();
            let seed = seed.clone();
            let gno = gno.clone();
            let dist = dist.clone();
            let base_seed = self.config.seed.wrapping_add(worker_idx.wrapping_mul(0x9E37_79B9));
            handles.push(thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(base_seed);
                for i in start..end {
                    let _ = i;
                    let result = generator::generate(&seed, &gno, &dist, &mut rng);
                    let _ = tx.send(result);
                }
            }));
            start = end;
            worker_idx += 1;
        }
        drop(tx);
        for h in handles {
            let _ = h.join();
        }

        let mut oks = Vec::new();
        for result in rx {
            match result {
                Ok(p) => oks.push(p),
                Err(e @ FieldplanError::InternalInvariant(_)) => return Err(e),
                Err(_) => {}
            }
        }

        let best = oks
            .into_iter()
            .min_by_key(|p: &PlanResult| (-p.ap, p.length, p.max_keys))
            .ok_or(FieldplanError::TriangulationFailed)?;

        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_portals() -> Vec<Portal> {
        vec![
            Portal::new("a", 0.0, 0.0),
            Portal::new("b", 0.002, 0.0),
            Portal::new("c", 0.002, 0.002),
            Portal::new("d", 0.0, 0.002),
        ]
    }

    #[test]
    fn sequential_optimizer_finds_a_plan() {
        let opt = Optimizer::new(OptimizerConfig {
            num_field_iterations: 3,
            workers: WorkerCount::Sequential,
            seed: 42,
        });
        let best = opt.run(&square_portals()).unwrap();
        assert!(best.num_links >= 4);
        assert!(best.ap > 0);
    }

    #[test]
    fn multi_worker_optimizer_finds_a_plan() {
        let opt = Optimizer::new(OptimizerConfig {
            num_field_iterations: 4,
            workers: WorkerCount::Fixed(NonZeroUsize::new(2).unwrap()),
            seed: 7,
        });
        let best = opt.run(&square_portals()).unwrap();
        assert!(best.num_fields >= 1);
    }
}
