//! Planned-vs-actual progress reporting
//!
//! Compares the trajectory the plan promised (no actual records) with the
//! reconciled one (actual records substituted) to show whether the user is
//! ahead of or behind their target.

use serde::{Deserialize, Serialize};

use crate::calendar::YearMonth;
use crate::error::DomainError;
use crate::plan::{ActualRecord, PlanInputs};
use crate::projection::irr::money_weighted_return;
use crate::projection::{ProjectionCache, ProjectionConfig, Trajectory};
use crate::terminal::TerminalValueSolver;

/// Difference between the terminal nominal balances of two trajectories
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerminalDelta {
    pub baseline: f64,
    pub other: f64,
    /// `other - baseline`
    pub absolute: f64,
    /// Relative to `|baseline|`; `None` when the baseline ends at zero
    pub percent: Option<f64>,
}

impl TerminalDelta {
    pub fn between(baseline: &Trajectory, other: &Trajectory) -> Self {
        Self::from_balances(baseline.final_nominal(), other.final_nominal())
    }

    pub fn from_balances(baseline: f64, other: f64) -> Self {
        let absolute = other - baseline;
        let percent = if baseline.abs() > f64::EPSILON {
            Some(absolute / baseline.abs() * 100.0)
        } else {
            None
        };
        Self {
            baseline,
            other,
            absolute,
            percent,
        }
    }
}

/// Where the user stands against the plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub plan_id: u32,

    /// Capital the plan needs at retirement
    pub target_capital: f64,

    /// Months from plan start until the as-planned balance reaches the target
    pub planned_months_to_target: Option<u32>,

    /// Same, with actual records substituted
    pub reconciled_months_to_target: Option<u32>,

    /// Number of recorded months inside the projection
    pub recorded_months: u32,

    /// Actual minus planned contributions over the recorded months
    pub contribution_delta: f64,

    /// Last month with an actual record
    pub last_recorded: Option<YearMonth>,

    /// Actual minus planned balance at `last_recorded`
    pub balance_delta: Option<f64>,

    /// Reconciled vs planned terminal balance
    pub terminal_delta: TerminalDelta,

    /// Annual money-weighted return earned over the recorded months
    pub realised_return: Option<f64>,
}

impl ProgressReport {
    /// Positive when the reconciled trajectory reaches the target sooner
    pub fn months_ahead(&self) -> Option<i64> {
        match (self.planned_months_to_target, self.reconciled_months_to_target) {
            (Some(planned), Some(reconciled)) => Some(planned as i64 - reconciled as i64),
            _ => None,
        }
    }

    pub fn is_on_track(&self) -> bool {
        self.balance_delta.map_or(true, |delta| delta >= 0.0)
    }
}

/// Builds progress reports for one plan
///
/// Trajectories are memoized, so asking for reports against several targets
/// only projects the plan twice.
#[derive(Debug)]
pub struct ProgressComparator<'a> {
    inputs: &'a PlanInputs,
    config: ProjectionConfig,
    cache: ProjectionCache,
}

impl<'a> ProgressComparator<'a> {
    pub fn new(inputs: &'a PlanInputs, config: ProjectionConfig) -> Self {
        Self {
            inputs,
            config,
            cache: ProjectionCache::new(),
        }
    }

    /// Report against the capital the terminal solver asks for at plan start
    pub fn report(&mut self) -> Result<ProgressReport, DomainError> {
        let solution = TerminalValueSolver::new(self.config.payment_timing).solve_at_start(self.inputs)?;
        self.report_against(solution.required_capital)
    }

    /// Report against an explicit target capital
    pub fn report_against(&mut self, target_capital: f64) -> Result<ProgressReport, DomainError> {
        let planned_config = ProjectionConfig {
            use_actuals: false,
            ..self.config.clone()
        };
        let reconciled_config = ProjectionConfig {
            use_actuals: true,
            ..self.config.clone()
        };

        let planned = self
            .cache
            .get_or_project(self.inputs, &planned_config, None)?
            .clone();
        let reconciled = self.cache.get_or_project(self.inputs, &reconciled_config, None)?;

        let mut recorded: Vec<&ActualRecord> = self
            .inputs
            .actuals
            .iter()
            .filter(|a| planned.at(a.month).is_some())
            .collect();
        recorded.sort_by_key(|a| a.month);

        let contribution_delta = recorded
            .iter()
            .filter_map(|a| planned.at(a.month).map(|p| a.contribution - p.contribution))
            .sum();

        let last_recorded = recorded.last().map(|a| a.month);
        let balance_delta = last_recorded.and_then(|month| {
            let planned_point = planned.at(month)?;
            let reconciled_point = reconciled.at(month)?;
            Some(reconciled_point.nominal_balance - planned_point.nominal_balance)
        });

        let owned: Vec<ActualRecord> = recorded.iter().map(|a| (*a).clone()).collect();

        Ok(ProgressReport {
            plan_id: self.inputs.plan.plan_id,
            target_capital,
            planned_months_to_target: planned.months_to_reach(target_capital),
            reconciled_months_to_target: reconciled.months_to_reach(target_capital),
            recorded_months: recorded.len() as u32,
            contribution_delta,
            last_recorded,
            balance_delta,
            terminal_delta: TerminalDelta::between(&planned, reconciled),
            realised_return: money_weighted_return(&owned),
        })
    }

    pub fn cache(&self) -> &ProjectionCache {
        &self.cache
    }
}
