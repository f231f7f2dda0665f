//! Core projection engine for monthly wealth trajectories

use std::collections::HashMap;

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use super::state::{Phase, ProjectionState};
use super::trajectory::{PointSource, ProjectionPoint, Trajectory};
use crate::assumptions::rates::checked_monthly_rate;
use crate::assumptions::{CumulativePriceIndex, RevisionSchedule};
use crate::error::DomainError;
use crate::events::EventSchedule;
use crate::plan::{ActualRecord, PlanInputs};
use crate::scenario::ScenarioOverride;
use crate::terminal::PaymentTiming;

/// Configuration for a projection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Replace projected months with recorded ones.
    /// Off gives the trajectory "as originally planned".
    pub use_actuals: bool,

    /// Stop after this many months even if the limiting age is further out
    pub max_months: Option<u32>,

    /// Contribution timing assumed by the terminal solver
    pub payment_timing: PaymentTiming,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            use_actuals: true,
            max_months: None,
            payment_timing: PaymentTiming::End,
        }
    }
}

impl ProjectionConfig {
    /// Config for the trajectory as planned, ignoring recorded history
    pub fn as_planned() -> Self {
        Self {
            use_actuals: false,
            ..Default::default()
        }
    }
}

/// Per-run lookups built once before stepping
struct RunContext<'a> {
    schedule: RevisionSchedule<'a>,
    index: CumulativePriceIndex,
    events: EventSchedule,
    actuals: HashMap<u32, &'a ActualRecord>,
}

/// Main projection engine
pub struct ProjectionEngine<'a> {
    inputs: &'a PlanInputs,
    config: ProjectionConfig,
}

impl<'a> ProjectionEngine<'a> {
    /// Create a new projection engine over borrowed inputs
    pub fn new(inputs: &'a PlanInputs, config: ProjectionConfig) -> Self {
        Self { inputs, config }
    }

    pub fn inputs(&self) -> &'a PlanInputs {
        self.inputs
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// Run the baseline projection
    pub fn project(&self) -> Result<Trajectory, DomainError> {
        self.run(None)
    }

    /// Number of months a run will produce
    pub fn horizon_months(&self) -> Result<u32, DomainError> {
        let horizon = self.inputs.horizon_months()?;
        Ok(match self.config.max_months {
            Some(cap) => horizon.min(cap),
            None => horizon,
        })
    }

    /// Run the projection, optionally with scenario overrides applied
    pub(crate) fn run(&self, scenario: Option<&ScenarioOverride>) -> Result<Trajectory, DomainError> {
        self.inputs.validate()?;
        if let Some(scenario) = scenario {
            scenario.validate()?;
        }

        let plan = &self.inputs.plan;
        let horizon = self.horizon_months()?;
        let context = self.build_context(horizon, scenario)?;

        let alternate_return = match scenario.and_then(|s| s.alternate_return) {
            Some(annual) => Some(checked_monthly_rate("alternate return", annual)?),
            None => None,
        };

        debug!(
            "Projecting plan {} from {} over {} months ({} revisions, {} actual months)",
            plan.plan_id,
            plan.start,
            horizon,
            context.schedule.len(),
            context.actuals.len()
        );

        let mut trajectory = Trajectory::with_capacity(plan.plan_id, horizon as usize);
        let mut state = ProjectionState::new(
            plan.initial_capital,
            plan.start,
            plan.accumulation_end,
            self.inputs.limiting_month(),
        );

        for _month in 0..horizon {
            if let Some(previous) = state.advance_month() {
                debug!("{}: {:?} -> {:?}", state.date, previous, state.phase);
            }
            if state.is_terminal() {
                break;
            }

            let point = match context.actuals.get(&state.month_index) {
                Some(actual) => self.record_actual(&mut state, actual, &context),
                None => self.project_month(&mut state, &context, scenario, alternate_return)?,
            };
            trace!(
                "{} {:?} nominal {:.2} real {:.2}",
                point.date,
                point.source,
                point.nominal_balance,
                point.real_balance
            );
            trajectory.push(point);
        }

        Ok(trajectory)
    }

    fn build_context(
        &self,
        horizon: u32,
        scenario: Option<&ScenarioOverride>,
    ) -> Result<RunContext<'a>, DomainError> {
        let inputs = self.inputs;
        let start = inputs.plan.start;
        let schedule = RevisionSchedule::new(&inputs.revisions)?;
        let index = CumulativePriceIndex::build(&schedule, start, horizon)?;
        let events = EventSchedule::build(&inputs.events, start, horizon, &index);

        let mut actuals = HashMap::new();
        if self.config.use_actuals {
            for actual in &inputs.actuals {
                if scenario.is_some_and(|s| !s.keeps_actual(actual.month)) {
                    continue;
                }
                let offset = start.months_until(actual.month);
                if offset < 0 || offset as u32 >= horizon {
                    warn!(
                        "Ignoring actual record for {}: outside the projected months",
                        actual.month
                    );
                    continue;
                }
                if actuals.insert(offset as u32, actual).is_some() {
                    return Err(DomainError::DuplicateActual(actual.month));
                }
            }
        }

        Ok(RunContext {
            schedule,
            index,
            events,
            actuals,
        })
    }

    /// Take a recorded month as-is
    fn record_actual(
        &self,
        state: &mut ProjectionState<'a>,
        actual: &ActualRecord,
        context: &RunContext<'a>,
    ) -> ProjectionPoint {
        state.balance = actual.ending_balance;

        ProjectionPoint {
            month_index: state.month_index,
            date: state.date,
            phase: state.phase,
            nominal_balance: state.balance,
            real_balance: state.balance / context.index.at_end(state.month_index),
            cashflow: actual.contribution,
            contribution: actual.contribution,
            source: PointSource::Actual,
        }
    }

    /// Compound the prior balance one month and apply the month's cashflow
    fn project_month(
        &self,
        state: &mut ProjectionState<'a>,
        context: &RunContext<'a>,
        scenario: Option<&ScenarioOverride>,
        alternate_return: Option<f64>,
    ) -> Result<ProjectionPoint, DomainError> {
        let plan = &self.inputs.plan;
        let t = state.month_index;

        let revision = context.schedule.resolve(state.date);
        let monthly_return = match alternate_return {
            Some(rate) => rate,
            None => checked_monthly_rate("expected return", revision.expected_return)?,
        };
        if state.switch_revision(revision, monthly_return) {
            debug!(
                "{}: revision effective {} (contribution {:.2}, income {:.2}, return {:.4})",
                state.date,
                revision.effective,
                revision.monthly_contribution,
                revision.monthly_income,
                revision.expected_return
            );
        }

        let price_factor = context.index.at_start(t);
        let contribution = match state.phase {
            Phase::Accumulating => {
                let contribution = scenario
                    .and_then(|s| s.contribution_at(state.date))
                    .unwrap_or(revision.monthly_contribution);
                if revision.inflates_contribution(plan) {
                    contribution * price_factor
                } else {
                    contribution
                }
            }
            _ => 0.0,
        };
        let planned = match state.phase {
            Phase::Accumulating => contribution,
            Phase::Decumulating => {
                let income = scenario
                    .and_then(|s| s.income_at(state.date))
                    .unwrap_or(revision.monthly_income);
                let income = if revision.inflates_income(plan) {
                    income * price_factor
                } else {
                    income
                };
                -income
            }
            Phase::Terminal => 0.0,
        };

        let cashflow = planned + context.events.amount_at(t);
        state.balance = state.balance * (1.0 + state.monthly_return) + cashflow;

        Ok(ProjectionPoint {
            month_index: t,
            date: state.date,
            phase: state.phase,
            nominal_balance: state.balance,
            real_balance: state.balance / context.index.at_end(t),
            cashflow,
            contribution,
            source: PointSource::Projected,
        })
    }
}
