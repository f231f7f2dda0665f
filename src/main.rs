//! Wealth Projection CLI
//!
//! Runs a plan bundle: projects the trajectory, solves the terminal target and
//! reports progress against recorded months.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use wealth_projection::plan::{load_actuals, load_bundle, write_trajectory_csv};
use wealth_projection::progress::TerminalDelta;
use wealth_projection::projection::TrajectorySummary;
use wealth_projection::{
    ProgressComparator, ProgressReport, ProjectionEngine, ScenarioEngine, ScenarioOverride,
    TerminalSolution, TerminalValueSolver,
};

#[derive(Parser, Debug)]
#[command(name = "wealth_projection", version, about = "Project a wealth plan month by month")]
struct Args {
    /// Plan bundle (JSON)
    #[arg(long)]
    plan: PathBuf,

    /// Actual records (CSV: Year,Month,StartingBalance,EndingBalance,Contribution,Return);
    /// replaces any actuals in the bundle
    #[arg(long)]
    actuals: Option<PathBuf>,

    /// Write the full trajectory to this CSV file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print results as JSON instead of tables
    #[arg(long)]
    json: bool,

    /// Number of months printed in the console table
    #[arg(long, default_value_t = 24)]
    months_shown: usize,
}

/// Everything printed by `--json`
#[derive(Serialize)]
struct RunReport {
    summary: TrajectorySummary,
    solution: TerminalSolution,
    progress: ProgressReport,
    scenario: Option<ScenarioReport>,
}

#[derive(Serialize)]
struct ScenarioReport {
    scenario: ScenarioOverride,
    summary: TrajectorySummary,
    terminal_delta: TerminalDelta,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut bundle = load_bundle(&args.plan)?;
    if let Some(path) = &args.actuals {
        bundle.inputs.actuals = load_actuals(path)?;
    }
    let inputs = &bundle.inputs;
    let config = bundle.config.clone();

    let trajectory = ProjectionEngine::new(inputs, config.clone())
        .project()
        .context("Projection failed")?;
    let solution = TerminalValueSolver::new(config.payment_timing)
        .solve_from_latest(inputs)
        .context("Terminal solve failed")?;
    let progress = ProgressComparator::new(inputs, config.clone())
        .report_against(solution.required_capital)
        .context("Progress report failed")?;

    let scenario = match bundle
        .scenario
        .clone()
        .or_else(|| ScenarioOverride::from_plan(&inputs.plan))
    {
        Some(scenario) => {
            let comparison = ScenarioEngine::new(inputs, config.clone())
                .compare(&scenario)
                .context("Scenario run failed")?;
            Some(ScenarioReport {
                summary: comparison.alternative.summary(),
                terminal_delta: comparison.terminal_delta,
                scenario,
            })
        }
        None => None,
    };

    if let Some(path) = &args.output {
        write_trajectory_csv(path, &trajectory)?;
    }

    let report = RunReport {
        summary: trajectory.summary(),
        solution,
        progress,
        scenario,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Wealth Projection v{}", env!("CARGO_PKG_VERSION"));
    println!("========================\n");

    let plan = &inputs.plan;
    println!("Plan: {}", plan.plan_id);
    println!("  Start: {}", plan.start);
    println!("  Accumulation End: {}", plan.accumulation_end);
    println!("  Initial Capital: {:.2} {}", plan.initial_capital, plan.currency);
    println!("  Terminal Policy: {}", plan.terminal_policy);
    println!("  Revisions: {}, Events: {}, Actuals: {}", inputs.revisions.len(), inputs.events.len(), inputs.actuals.len());
    println!();

    println!("Projection ({} months):", trajectory.len());
    println!("{:>5} {:>8} {:>13} {:>10} {:>14} {:>14} {:>12}",
        "Month", "Date", "Phase", "Source", "Nominal", "Real", "Cashflow");
    println!("{}", "-".repeat(82));

    for point in trajectory.points.iter().take(args.months_shown) {
        println!("{:>5} {:>8} {:>13} {:>10} {:>14.2} {:>14.2} {:>12.2}",
            point.month_index,
            point.date.to_string(),
            format!("{:?}", point.phase),
            format!("{:?}", point.source),
            point.nominal_balance,
            point.real_balance,
            point.cashflow,
        );
    }
    if trajectory.len() > args.months_shown {
        println!("... ({} more months)", trajectory.len() - args.months_shown);
    }

    let summary = &report.summary;
    println!("\nSummary:");
    println!("  Total Months: {} ({} recorded)", summary.total_months, summary.actual_months);
    println!("  Final Nominal: {:.2}", summary.final_nominal);
    println!("  Final Real: {:.2}", summary.final_real);
    println!("  Peak Nominal: {:.2}", summary.peak_nominal);
    if let Some(balance) = summary.retirement_nominal {
        println!("  Balance at Retirement: {:.2}", balance);
    }
    println!("  Total Contributions: {:.2}", summary.total_contributions);
    println!("  Total Withdrawals: {:.2}", summary.total_withdrawals);
    if let Some(date) = summary.depletion_date {
        println!("  Depleted: {}", date);
    }

    let solution = &report.solution;
    println!("\nTerminal Target ({}):", solution.policy);
    println!("  Income at Retirement: {:.2}/month", solution.inflated_income);
    println!("  Required Capital: {:.2}", solution.required_capital);
    println!("  Required Contribution: {:.2}/month over {} months",
        solution.required_contribution, solution.months_to_retirement);

    let progress = &report.progress;
    println!("\nProgress:");
    match (progress.planned_months_to_target, progress.reconciled_months_to_target) {
        (Some(planned), Some(reconciled)) => {
            println!("  Target reached at month {} (planned {})", reconciled, planned)
        }
        (planned, reconciled) => {
            println!("  Target reached: planned {:?}, reconciled {:?}", planned, reconciled)
        }
    }
    println!("  Recorded Months: {}", progress.recorded_months);
    println!("  Contribution Delta: {:.2}", progress.contribution_delta);
    if let (Some(month), Some(delta)) = (progress.last_recorded, progress.balance_delta) {
        println!("  Balance Delta at {}: {:.2}", month, delta);
    }
    if let Some(rate) = progress.realised_return {
        println!("  Realised Return: {:.2}%", rate * 100.0);
    }

    if let Some(scenario) = &report.scenario {
        println!("\nScenario:");
        println!("  Final Nominal: {:.2}", scenario.summary.final_nominal);
        match scenario.terminal_delta.percent {
            Some(pct) => println!("  vs Baseline: {:+.2} ({:+.2}%)", scenario.terminal_delta.absolute, pct),
            None => println!("  vs Baseline: {:+.2}", scenario.terminal_delta.absolute),
        }
    }

    if let Some(path) = &args.output {
        println!("\nFull trajectory written to: {}", path.display());
    }

    Ok(())
}
