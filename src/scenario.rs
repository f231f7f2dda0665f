//! What-if scenarios over a plan
//!
//! A scenario re-runs the projection with a contribution change, an income
//! change or an alternate portfolio return. The plan inputs are borrowed and
//! never modified, so the baseline and any number of scenarios can be run
//! side by side.

use serde::{Deserialize, Serialize};

use crate::assumptions::rates::checked_monthly_rate;
use crate::calendar::YearMonth;
use crate::error::{ensure_finite, DomainError};
use crate::plan::{Plan, PlanInputs};
use crate::progress::TerminalDelta;
use crate::projection::{ProjectionConfig, ProjectionEngine, Trajectory};

/// A replacement monthly amount from a given month onward
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueOverride {
    pub value: f64,
    pub effective: YearMonth,
}

impl ValueOverride {
    pub fn new(value: f64, effective: YearMonth) -> Self {
        Self { value, effective }
    }

    fn at(&self, date: YearMonth) -> Option<f64> {
        (date >= self.effective).then_some(self.value)
    }
}

/// Changes applied on top of the plan's revisions for a comparison run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOverride {
    #[serde(default)]
    pub contribution: Option<ValueOverride>,

    #[serde(default)]
    pub income: Option<ValueOverride>,

    /// Annual return compounded instead of each revision's expected return
    #[serde(default)]
    pub alternate_return: Option<f64>,
}

impl ScenarioOverride {
    pub fn contribution(value: f64, effective: YearMonth) -> Self {
        Self {
            contribution: Some(ValueOverride::new(value, effective)),
            ..Default::default()
        }
    }

    pub fn income(value: f64, effective: YearMonth) -> Self {
        Self {
            income: Some(ValueOverride::new(value, effective)),
            ..Default::default()
        }
    }

    pub fn alternate_portfolio(annual_return: f64) -> Self {
        Self {
            alternate_return: Some(annual_return),
            ..Default::default()
        }
    }

    /// Alternate-portfolio scenario configured on the plan, if any
    pub fn from_plan(plan: &Plan) -> Option<Self> {
        plan.alternate_return.map(Self::alternate_portfolio)
    }

    pub fn with_contribution(mut self, value: f64, effective: YearMonth) -> Self {
        self.contribution = Some(ValueOverride::new(value, effective));
        self
    }

    pub fn with_income(mut self, value: f64, effective: YearMonth) -> Self {
        self.income = Some(ValueOverride::new(value, effective));
        self
    }

    pub fn with_alternate_return(mut self, annual_return: f64) -> Self {
        self.alternate_return = Some(annual_return);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.contribution.is_none() && self.income.is_none() && self.alternate_return.is_none()
    }

    /// First month an override changes anything; `None` means from plan start
    /// (alternate return) or never (empty override)
    pub fn actuals_cutoff(&self) -> Option<YearMonth> {
        if self.alternate_return.is_some() {
            return None;
        }
        [self.contribution, self.income]
            .iter()
            .flatten()
            .map(|o| o.effective)
            .min()
    }

    /// Whether a recorded month still stands under this scenario
    pub fn keeps_actual(&self, month: YearMonth) -> bool {
        if self.alternate_return.is_some() {
            return false;
        }
        match self.actuals_cutoff() {
            Some(cutoff) => month < cutoff,
            None => true,
        }
    }

    pub(crate) fn contribution_at(&self, date: YearMonth) -> Option<f64> {
        self.contribution.and_then(|o| o.at(date))
    }

    pub(crate) fn income_at(&self, date: YearMonth) -> Option<f64> {
        self.income.and_then(|o| o.at(date))
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(o) = &self.contribution {
            ensure_finite("override contribution", o.value)?;
        }
        if let Some(o) = &self.income {
            ensure_finite("override income", o.value)?;
        }
        if let Some(rate) = self.alternate_return {
            checked_monthly_rate("alternate return", rate)?;
        }
        Ok(())
    }
}

/// Baseline and scenario trajectories with their terminal difference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub scenario: ScenarioOverride,
    pub baseline: Trajectory,
    pub alternative: Trajectory,
    /// Alternative minus baseline, on nominal terminal balances
    pub terminal_delta: TerminalDelta,
}

/// Runs scenarios against one set of plan inputs
///
/// # Example
/// ```ignore
/// let engine = ScenarioEngine::new(&inputs, ProjectionConfig::default());
///
/// for rate in [0.03, 0.05, 0.07] {
///     let trajectory = engine.run(&ScenarioOverride::alternate_portfolio(rate))?;
///     println!("{rate}: {:.2}", trajectory.final_nominal());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioEngine<'a> {
    inputs: &'a PlanInputs,
    config: ProjectionConfig,
}

impl<'a> ScenarioEngine<'a> {
    pub fn new(inputs: &'a PlanInputs, config: ProjectionConfig) -> Self {
        Self { inputs, config }
    }

    pub fn inputs(&self) -> &'a PlanInputs {
        self.inputs
    }

    /// Trajectory without any override
    pub fn baseline(&self) -> Result<Trajectory, DomainError> {
        self.engine().project()
    }

    /// Trajectory with `scenario` applied
    pub fn run(&self, scenario: &ScenarioOverride) -> Result<Trajectory, DomainError> {
        self.engine().run(Some(scenario))
    }

    /// Run several scenarios one after another
    pub fn run_many(&self, scenarios: &[ScenarioOverride]) -> Result<Vec<Trajectory>, DomainError> {
        scenarios.iter().map(|s| self.run(s)).collect()
    }

    /// Baseline vs scenario
    pub fn compare(&self, scenario: &ScenarioOverride) -> Result<ScenarioComparison, DomainError> {
        let baseline = self.baseline()?;
        let alternative = self.run(scenario)?;
        let terminal_delta = TerminalDelta::between(&baseline, &alternative);

        Ok(ScenarioComparison {
            scenario: scenario.clone(),
            baseline,
            alternative,
            terminal_delta,
        })
    }

    fn engine(&self) -> ProjectionEngine<'a> {
        ProjectionEngine::new(self.inputs, self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{ActualRecord, PlanRevision, TerminalPolicy, UserProfile};
    use crate::projection::PointSource;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    fn test_inputs() -> PlanInputs {
        let plan = Plan::new(3, 10_000.0, ym("2024-01"), ym("2044-01"), 55, TerminalPolicy::FiniteHorizonDepletion);
        let profile = UserProfile::new(NaiveDate::from_ymd_opt(1989, 1, 1).unwrap());
        let revision = PlanRevision::new(ym("2024-01"), 500.0, 3000.0, 0.05, 0.02);
        let actuals = (0..3)
            .map(|t| ActualRecord {
                month: ym("2024-01").add_months(t),
                starting_balance: 10_000.0 + 600.0 * t as f64,
                ending_balance: 10_600.0 + 600.0 * t as f64,
                contribution: 500.0,
                investment_return: 100.0,
            })
            .collect();
        PlanInputs::new(plan, profile, vec![revision]).with_actuals(actuals)
    }

    fn config() -> ProjectionConfig {
        ProjectionConfig {
            max_months: Some(60),
            ..Default::default()
        }
    }

    #[test]
    fn test_scenarios_never_mutate_inputs() {
        let inputs = test_inputs();
        let snapshot = inputs.clone();
        let engine = ScenarioEngine::new(&inputs, config());

        let before = engine.baseline().unwrap();
        engine
            .run(&ScenarioOverride::contribution(2000.0, ym("2025-01")).with_alternate_return(0.09))
            .unwrap();
        engine.run(&ScenarioOverride::income(100.0, ym("2024-06"))).unwrap();
        let after = engine.baseline().unwrap();

        assert_eq!(inputs, snapshot);
        assert_eq!(before, after);
    }

    #[test]
    fn test_contribution_override_from_effective_month() {
        let inputs = test_inputs();
        let engine = ScenarioEngine::new(&inputs, config());
        let trajectory = engine
            .run(&ScenarioOverride::contribution(2000.0, ym("2025-01")))
            .unwrap();

        // Recorded months before the override still stand
        assert_eq!(trajectory.actual_prefix().len(), 3);
        assert_eq!(trajectory.at(ym("2024-12")).unwrap().cashflow, 500.0);
        assert_eq!(trajectory.at(ym("2025-01")).unwrap().cashflow, 2000.0);
    }

    #[test]
    fn test_income_override_from_effective_month() {
        let mut inputs = test_inputs();
        inputs.plan.accumulation_end = ym("2025-01");
        let scenario = ScenarioOverride::income(1000.0, ym("2026-01"));

        let trajectory = ScenarioEngine::new(&inputs, config()).run(&scenario).unwrap();
        assert_eq!(trajectory.at(ym("2025-06")).unwrap().cashflow, -3000.0);
        assert_eq!(trajectory.at(ym("2026-01")).unwrap().cashflow, -1000.0);
        assert_eq!(trajectory.at(ym("2028-12")).unwrap().cashflow, -1000.0);

        // The override is in today's money when income is indexed
        inputs.plan = inputs.plan.clone().with_inflation_flags(false, true);
        inputs.revisions[0].inflation = 0.12;
        let trajectory = ScenarioEngine::new(&inputs, config()).run(&scenario).unwrap();
        let before = trajectory.at(ym("2025-06")).unwrap();
        assert_relative_eq!(before.cashflow, -3000.0 * 1.12_f64.powf(17.0 / 12.0), epsilon = 1e-6);
        let from = trajectory.at(ym("2026-01")).unwrap();
        assert_eq!(from.month_index, 24);
        assert_relative_eq!(from.cashflow, -1000.0 * 1.12 * 1.12, epsilon = 1e-6);
    }

    #[test]
    fn test_override_before_actuals_drops_them() {
        let inputs = test_inputs();
        let engine = ScenarioEngine::new(&inputs, config());
        let trajectory = engine
            .run(&ScenarioOverride::contribution(0.0, ym("2024-02")))
            .unwrap();

        assert_eq!(trajectory.points[0].source, PointSource::Actual);
        assert_eq!(trajectory.points[1].source, PointSource::Projected);
        assert_eq!(trajectory.points[1].cashflow, 0.0);
    }

    #[test]
    fn test_alternate_return_replays_from_start() {
        let inputs = test_inputs();
        let engine = ScenarioEngine::new(&inputs, config());
        let comparison = engine.compare(&ScenarioOverride::alternate_portfolio(0.0)).unwrap();

        assert!(comparison.alternative.actual_prefix().is_empty());
        assert!(comparison.alternative.points.iter().all(|p| p.cashflow == 500.0));
        assert_relative_eq!(comparison.alternative.final_nominal(), 10_000.0 + 500.0 * 60.0);
        assert!(comparison.terminal_delta.absolute < 0.0);
    }

    #[test]
    fn test_from_plan() {
        let inputs = test_inputs();
        assert_eq!(ScenarioOverride::from_plan(&inputs.plan), None);

        let plan = inputs.plan.clone().with_alternate_return(0.03);
        let scenario = ScenarioOverride::from_plan(&plan).unwrap();
        assert_eq!(scenario.alternate_return, Some(0.03));
        assert_eq!(scenario.actuals_cutoff(), None);
        assert!(!scenario.keeps_actual(ym("2024-01")));
    }

    #[test]
    fn test_cutoff_is_earliest_override() {
        let scenario = ScenarioOverride::income(1.0, ym("2030-01")).with_contribution(1.0, ym("2026-05"));
        assert_eq!(scenario.actuals_cutoff(), Some(ym("2026-05")));
        assert!(scenario.keeps_actual(ym("2026-04")));
        assert!(!scenario.keeps_actual(ym("2026-05")));
        assert!(ScenarioOverride::default().keeps_actual(ym("2099-01")));
        assert!(ScenarioOverride::default().is_empty());
    }

    #[test]
    fn test_invalid_override_rejected() {
        let inputs = test_inputs();
        let engine = ScenarioEngine::new(&inputs, config());
        assert!(engine.run(&ScenarioOverride::alternate_portfolio(-2.0)).is_err());
        assert!(engine
            .run(&ScenarioOverride::contribution(f64::NAN, ym("2025-01")))
            .is_err());
    }
}
