use std::fs;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use fieldplan_core::{plan_and_route, OptimizerConfig, RouterConfig};

use fieldplan_cli::config::{self, Config};
use fieldplan_cli::portal_file;

#[derive(Parser, Debug)]
#[command(name = "fieldplan", version, about = "Plan Ingress portal fields and agent routing from a portal list")]
struct Args {
    /// Portal file (spec §6 grammar: one portal per line, `;`-separated fields)
    #[arg(long = "portals", value_name = "PATH")]
    portals: PathBuf,

    /// Number of Generators to run; the best plan by (-AP, length, max_keys) wins
    #[arg(long = "iterations", default_value_t = 1)]
    iterations: usize,

    /// Worker threads for inter-plan parallelism: 0 = all CPUs, 1 = sequential
    #[arg(long = "workers", default_value_t = 1)]
    workers: usize,

    /// Number of field agents to route across
    #[arg(long = "agents", default_value_t = 1)]
    agents: usize,

    /// Seed for the first Generator's RNG; later Generators derive from it
    #[arg(long = "seed", default_value_t = 0)]
    seed: u64,

    /// Emit the full plan (graph, fields, assignments) as JSON to this path
    #[arg(long = "out-json", value_name = "PATH")]
    out_json: Option<PathBuf>,
}

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,fieldplan=debug"))
        .expect("failed to init EnvFilter");
    fmt().with_env_filter(env_filter).init();

    let args = Args::parse();
    let config = Config::from_env();
    info!(?args, "starting fieldplan");

    let started = Instant::now();

    let contents = fs::read_to_string(&args.portals)
        .with_context(|| format!("failed to read portal file {:?}", args.portals))?;
    let portals = portal_file::parse(&contents).with_context(|| "failed to parse portal file")?;
    if portals.len() < 2 {
        anyhow::bail!("need at least 2 portals, found {}", portals.len());
    }
    info!(count = portals.len(), "loaded portals");

    let workers = config::resolve_workers(args.workers);

    let opt_config = OptimizerConfig { num_field_iterations: args.iterations.max(1), workers, seed: args.seed };
    let router_config = RouterConfig {
        agents: NonZeroUsize::new(args.agents.max(1)).unwrap(),
        max_solutions: config.router_max_solutions,
        time_budget: config.router_time_budget,
    };

    let (best, assignments) = match plan_and_route(&portals, opt_config, router_config) {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "planning failed");
            anyhow::bail!(e);
        }
    };

    let elapsed = started.elapsed();
    print_summary(portals.len(), &best, &assignments, elapsed);

    if let Some(path) = &args.out_json {
        write_json(path, &portals, &best, &assignments)?;
    }

    Ok(())
}

fn print_summary(
    num_portals: usize,
    best: &fieldplan_core::PlanResult,
    assignments: &[fieldplan_core::AgentAssignment],
    elapsed: std::time::Duration,
) {
    println!("portals:     {num_portals}");
    println!("links:       {}", best.num_links);
    println!("fields:      {}", best.num_fields);
    println!("max keys:    {}", best.max_keys);
    println!("path length: {} m", best.length);
    println!("AP:          {}", best.ap);
    println!("links scheduled: {}", assignments.len());
    println!("build time:  {:.2?}", elapsed);
}

fn write_json(
    path: &PathBuf,
    portals: &[fieldplan_core::Portal],
    best: &fieldplan_core::PlanResult,
    assignments: &[fieldplan_core::AgentAssignment],
) -> Result<()> {
    let order = best.graph.ordered_links();
    let edges: Vec<_> = order
        .iter()
        .map(|&(from, to)| {
            let e = best.graph.edge(from, to).expect("ordered_links entries must exist");
            serde_json::json!({
                "from": from,
                "to": to,
                "order": e.order,
                "reversible": e.reversible,
                "fields": e.fields,
            })
        })
        .collect();
    let assignments_json: Vec<_> = assignments
        .iter()
        .map(|a| {
            serde_json::json!({
                "agent": a.agent,
                "link": [a.link.0, a.link.1],
                "arrive": a.arrive,
                "depart": a.depart,
            })
        })
        .collect();
    let doc = serde_json::json!({
        "portals": portals,
        "edges": edges,
        "firstgen_fields": best.graph.firstgen_fields.iter().map(|f| f.0).collect::<Vec<_>>(),
        "assignments": assignments_json,
        "summary": {
            "num_links": best.num_links,
            "num_fields": best.num_fields,
            "max_keys": best.max_keys,
            "length": best.length,
            "ap": best.ap,
        },
    });
    let rendered = serde_json::to_string_pretty(&doc).context("failed to serialise plan")?;
    fs::write(path, rendered).with_context(|| format!("failed to write {path:?}"))?;
    Ok(())
}
