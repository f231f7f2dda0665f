//! Sweep alternate portfolio returns for a plan
//!
//! Each return is an independent scenario run, so the sweep runs them in
//! parallel and reports terminal balances against the baseline.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;

use wealth_projection::plan::load_bundle;
use wealth_projection::progress::TerminalDelta;
use wealth_projection::{ScenarioEngine, ScenarioOverride};

#[derive(Parser, Debug)]
#[command(name = "return_sweep", version, about = "Compare a plan under a range of portfolio returns")]
struct Args {
    /// Plan bundle (JSON)
    #[arg(long)]
    plan: PathBuf,

    /// Lowest annual return, e.g. 0.02
    #[arg(long, default_value_t = 0.0)]
    min: f64,

    /// Highest annual return
    #[arg(long, default_value_t = 0.10)]
    max: f64,

    /// Step between returns
    #[arg(long, default_value_t = 0.01)]
    step: f64,
}

/// One row of the sweep
struct SweepRow {
    annual_return: f64,
    final_nominal: f64,
    final_real: f64,
    depleted: Option<String>,
    delta: TerminalDelta,
}

fn sweep_returns(min: f64, max: f64, step: f64) -> Vec<f64> {
    if step <= 0.0 || max < min {
        return vec![min];
    }
    let count = ((max - min) / step + 1e-9).floor() as usize + 1;
    (0..count).map(|i| min + step * i as f64).collect()
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let start = Instant::now();

    let bundle = load_bundle(&args.plan)?;
    let engine = ScenarioEngine::new(&bundle.inputs, bundle.config.clone());
    let baseline = engine.baseline().context("Baseline projection failed")?;

    let returns = sweep_returns(args.min, args.max, args.step);
    println!("Running {} scenarios for plan {}...", returns.len(), bundle.inputs.plan.plan_id);

    // Run scenarios in parallel
    let rows: Vec<SweepRow> = returns
        .par_iter()
        .map(|&annual_return| -> Result<SweepRow> {
            let trajectory = engine
                .run(&ScenarioOverride::alternate_portfolio(annual_return))
                .with_context(|| format!("Scenario at {:.4} failed", annual_return))?;
            let summary = trajectory.summary();
            Ok(SweepRow {
                annual_return,
                final_nominal: summary.final_nominal,
                final_real: summary.final_real,
                depleted: summary.depletion_date.map(|d| d.to_string()),
                delta: TerminalDelta::between(&baseline, &trajectory),
            })
        })
        .collect::<Result<_>>()?;

    println!("Sweep complete in {:?}\n", start.elapsed());
    println!("Baseline final nominal: {:.2}\n", baseline.final_nominal());

    println!("{:>8} {:>16} {:>16} {:>16} {:>9} {:>10}",
        "Return", "Final Nominal", "Final Real", "vs Baseline", "%", "Depleted");
    println!("{}", "-".repeat(80));

    for row in &rows {
        println!("{:>7.2}% {:>16.2} {:>16.2} {:>+16.2} {:>9} {:>10}",
            row.annual_return * 100.0,
            row.final_nominal,
            row.final_real,
            row.delta.absolute,
            row.delta.percent.map(|p| format!("{:+.1}", p)).unwrap_or_else(|| "-".to_string()),
            row.depleted.as_deref().unwrap_or("-"),
        );
    }

    Ok(())
}
