//! Required capital and required contribution per terminal policy

use log::debug;
use serde::{Deserialize, Serialize};

use super::discount::{AnnuityMath, PaymentTiming};
use crate::assumptions::rates::checked_monthly_rate;
use crate::assumptions::RevisionSchedule;
use crate::calendar::YearMonth;
use crate::error::{ensure_finite, DomainError};
use crate::plan::{PlanInputs, PlanRevision, TerminalPolicy};

/// Everything the closed-form solve depends on
#[derive(Debug, Clone)]
pub struct SolverInput<'a> {
    pub revision: &'a PlanRevision,
    pub policy: TerminalPolicy,
    pub legacy_amount: f64,
    pub initial_capital: f64,
    /// Months of accumulation left
    pub months_to_retirement: u32,
    /// Months of income to fund under depletion
    pub payout_months: u32,
    pub inflate_income: bool,
    pub inflate_contribution: bool,
}

/// Solver output shown on plan setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalSolution {
    pub policy: TerminalPolicy,
    /// Monthly expected return used for the payout phase
    pub monthly_return: f64,
    /// Monthly rate used to grow contributions
    pub contribution_rate: f64,
    /// Target income in money of the retirement month
    pub inflated_income: f64,
    pub required_capital: f64,
    /// First monthly contribution needed; negative when already over-funded
    pub required_contribution: f64,
    pub months_to_retirement: u32,
    pub payout_months: u32,
}

/// Closed-form terminal value solver
#[derive(Debug, Clone, Default)]
pub struct TerminalValueSolver {
    timing: PaymentTiming,
}

impl TerminalValueSolver {
    pub fn new(timing: PaymentTiming) -> Self {
        Self { timing }
    }

    /// Monthly income compounded forward at monthly inflation for `months`
    pub fn inflation_adjusted_income(
        monthly_income: f64,
        annual_inflation: f64,
        months: u32,
    ) -> Result<f64, DomainError> {
        let inflation = checked_monthly_rate("inflation", annual_inflation)?;
        Ok(AnnuityMath::fv_lump(monthly_income, months, inflation))
    }

    /// Capital needed at retirement to fund `monthly_income` under `policy`
    pub fn required_capital(
        policy: TerminalPolicy,
        monthly_income: f64,
        monthly_return: f64,
        payout_months: u32,
        legacy_amount: f64,
    ) -> Result<f64, DomainError> {
        match policy {
            TerminalPolicy::FiniteHorizonDepletion => Ok(AnnuityMath::pv_annuity_ordinary(
                monthly_income,
                payout_months,
                monthly_return,
            )),
            TerminalPolicy::LegacyPreserving => {
                let perpetual = AnnuityMath::pv_perpetuity(monthly_income, monthly_return)?;
                Ok((perpetual + legacy_amount).max(legacy_amount))
            }
            TerminalPolicy::Perpetuity => AnnuityMath::pv_perpetuity(monthly_income, monthly_return),
        }
    }

    /// Monthly contribution taking `initial_capital` to `target` in `months`
    ///
    /// Level contributions compound at the blended return + inflation rate.
    /// Inflation-indexed contributions are solved as a growing annuity at the
    /// expected return, returning the first month's amount.
    pub fn required_contribution(
        &self,
        target: f64,
        initial_capital: f64,
        annual_return: f64,
        annual_inflation: f64,
        months: u32,
        inflate_contribution: bool,
    ) -> Result<(f64, f64), DomainError> {
        if inflate_contribution {
            let rate = checked_monthly_rate("expected return", annual_return)?;
            let growth = checked_monthly_rate("inflation", annual_inflation)?;
            let payment =
                AnnuityMath::growing_payment(rate, growth, months, initial_capital, target, self.timing);
            Ok((payment, rate))
        } else {
            let rate = checked_monthly_rate("blended return", annual_return + annual_inflation)?;
            let payment = AnnuityMath::payment(rate, months, initial_capital, target, self.timing);
            Ok((payment, rate))
        }
    }

    /// Capital target and contribution for one set of solver inputs
    ///
    /// With `inflate_income` set, the revision's income is in today's money and
    /// is inflated over `months_to_retirement` first. Otherwise the income is
    /// taken as already expressed in money of the retirement month and is used
    /// unchanged, whatever the inflation rate.
    pub fn solve(&self, input: &SolverInput<'_>) -> Result<TerminalSolution, DomainError> {
        let revision = input.revision;
        ensure_finite("initial capital", input.initial_capital)?;
        ensure_finite("legacy amount", input.legacy_amount)?;
        ensure_finite("monthly income", revision.monthly_income)?;

        let monthly_return = checked_monthly_rate("expected return", revision.expected_return)?;
        let inflated_income = if input.inflate_income {
            Self::inflation_adjusted_income(
                revision.monthly_income,
                revision.inflation,
                input.months_to_retirement,
            )?
        } else {
            checked_monthly_rate("inflation", revision.inflation)?;
            revision.monthly_income
        };

        let required_capital = Self::required_capital(
            input.policy,
            inflated_income,
            monthly_return,
            input.payout_months,
            input.legacy_amount,
        )?;

        let (required_contribution, contribution_rate) = self.required_contribution(
            required_capital,
            input.initial_capital,
            revision.expected_return,
            revision.inflation,
            input.months_to_retirement,
            input.inflate_contribution,
        )?;

        debug!(
            "Solved {}: capital {:.2}, contribution {:.2} over {} months",
            input.policy, required_capital, required_contribution, input.months_to_retirement
        );

        Ok(TerminalSolution {
            policy: input.policy,
            monthly_return,
            contribution_rate,
            inflated_income,
            required_capital,
            required_contribution,
            months_to_retirement: input.months_to_retirement,
            payout_months: input.payout_months,
        })
    }

    /// Solve for a plan as seen from `as_of`, starting from `capital`
    pub fn solve_for_plan(
        &self,
        inputs: &PlanInputs,
        as_of: YearMonth,
        capital: f64,
    ) -> Result<TerminalSolution, DomainError> {
        let plan = &inputs.plan;
        plan.validate()?;
        let schedule = RevisionSchedule::new(&inputs.revisions)?;
        let revision = schedule.resolve(as_of);

        let input = SolverInput {
            revision,
            policy: plan.terminal_policy,
            legacy_amount: plan.legacy_amount,
            initial_capital: capital,
            months_to_retirement: as_of.months_until(plan.accumulation_end).max(0) as u32,
            payout_months: plan.payout_months(),
            inflate_income: revision.inflates_income(plan),
            inflate_contribution: revision.inflates_contribution(plan),
        };
        self.solve(&input)
    }

    /// Solve from plan start with the plan's initial capital
    pub fn solve_at_start(&self, inputs: &PlanInputs) -> Result<TerminalSolution, DomainError> {
        self.solve_for_plan(inputs, inputs.plan.start, inputs.plan.initial_capital)
    }

    /// Solve from the month after the latest actual record, starting from its ending balance
    ///
    /// Falls back to [`Self::solve_at_start`] when nothing has been recorded.
    pub fn solve_from_latest(&self, inputs: &PlanInputs) -> Result<TerminalSolution, DomainError> {
        match inputs.actuals.iter().max_by_key(|a| a.month) {
            Some(latest) => {
                ensure_finite("ending balance", latest.ending_balance)?;
                self.solve_for_plan(inputs, latest.month.add_months(1), latest.ending_balance)
            }
            None => self.solve_at_start(inputs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{ActualRecord, Plan, UserProfile};
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use chrono::NaiveDate;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    fn input(revision: &PlanRevision, policy: TerminalPolicy) -> SolverInput<'_> {
        SolverInput {
            revision,
            policy,
            legacy_amount: 0.0,
            initial_capital: 0.0,
            months_to_retirement: 360,
            payout_months: 300,
            inflate_income: false,
            inflate_contribution: false,
        }
    }

    #[test]
    fn test_perpetuity_capital() {
        let capital = TerminalValueSolver::required_capital(TerminalPolicy::Perpetuity, 1000.0, 0.005, 0, 0.0)
            .unwrap();
        assert_relative_eq!(capital, 200_000.0, max_relative = 1e-12);
        assert_relative_eq!(capital * 0.005, 1000.0, max_relative = 1e-12);
    }

    #[test]
    fn test_finite_horizon_capital() {
        let capital = TerminalValueSolver::required_capital(
            TerminalPolicy::FiniteHorizonDepletion,
            1000.0,
            0.004,
            300,
            0.0,
        )
        .unwrap();
        let expected = 1000.0 * (1.0 - 1.004_f64.powi(-300)) / 0.004;
        assert_abs_diff_eq!(capital, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_legacy_capital() {
        let capital =
            TerminalValueSolver::required_capital(TerminalPolicy::LegacyPreserving, 1000.0, 0.005, 0, 50_000.0)
                .unwrap();
        assert_relative_eq!(capital, 250_000.0, max_relative = 1e-12);

        // Negative income can never push capital below the legacy floor
        let capital =
            TerminalValueSolver::required_capital(TerminalPolicy::LegacyPreserving, -1000.0, 0.005, 0, 50_000.0)
                .unwrap();
        assert_eq!(capital, 50_000.0);
    }

    #[test]
    fn test_perpetuity_at_zero_return_fails() {
        let revision = PlanRevision::new(ym("2024-01"), 0.0, 1000.0, 0.0, 0.0);
        let solver = TerminalValueSolver::default();
        for policy in [TerminalPolicy::Perpetuity, TerminalPolicy::LegacyPreserving] {
            assert!(matches!(
                solver.solve(&input(&revision, policy)),
                Err(DomainError::UnfundablePerpetuity { .. })
            ));
        }
    }

    #[test]
    fn test_zero_rates_reduce_to_linear() {
        let revision = PlanRevision::new(ym("2024-01"), 0.0, 1000.0, 0.0, 0.0);
        let mut input = input(&revision, TerminalPolicy::FiniteHorizonDepletion);
        input.initial_capital = 12_000.0;

        let solution = TerminalValueSolver::default().solve(&input).unwrap();
        assert_eq!(solution.monthly_return, 0.0);
        assert_eq!(solution.required_capital, 300_000.0);
        assert_eq!(solution.required_contribution, (300_000.0 - 12_000.0) / 360.0);
    }

    #[test]
    fn test_inflated_income() {
        let income = TerminalValueSolver::inflation_adjusted_income(1000.0, 0.03, 120).unwrap();
        assert_relative_eq!(income, 1000.0 * 1.03_f64.powi(10), max_relative = 1e-9);

        let revision = PlanRevision::new(ym("2024-01"), 0.0, 1000.0, 0.06, 0.03);
        let mut input = input(&revision, TerminalPolicy::Perpetuity);
        input.inflate_income = true;
        let solution = TerminalValueSolver::default().solve(&input).unwrap();
        assert_relative_eq!(solution.inflated_income, 1000.0 * 1.03_f64.powi(30), max_relative = 1e-9);
        assert_relative_eq!(
            solution.required_capital,
            solution.inflated_income / solution.monthly_return,
            max_relative = 1e-12
        );

        // Unindexed income is already money of the retirement month
        input.inflate_income = false;
        let solution = TerminalValueSolver::default().solve(&input).unwrap();
        assert_eq!(solution.inflated_income, 1000.0);
    }

    #[test]
    fn test_contribution_uses_blended_rate() {
        let solver = TerminalValueSolver::default();
        let (payment, rate) = solver
            .required_contribution(500_000.0, 0.0, 0.06, 0.02, 240, false)
            .unwrap();
        let expected_rate = 1.08_f64.powf(1.0 / 12.0) - 1.0;
        assert_relative_eq!(rate, expected_rate, max_relative = 1e-12);
        assert_relative_eq!(
            payment,
            500_000.0 * expected_rate / ((1.0 + expected_rate).powi(240) - 1.0),
            max_relative = 1e-9
        );

        let (indexed, rate) = solver
            .required_contribution(500_000.0, 0.0, 0.06, 0.02, 240, true)
            .unwrap();
        assert_relative_eq!(rate, 1.06_f64.powf(1.0 / 12.0) - 1.0, max_relative = 1e-12);
        // Indexed contributions start lower because they grow
        assert!(indexed < solver.required_contribution(500_000.0, 0.0, 0.06, 0.0, 240, false).unwrap().0);
    }

    #[test]
    fn test_solve_from_latest_actual() {
        let plan = Plan::new(7, 10_000.0, ym("2024-01"), ym("2044-01"), 55, TerminalPolicy::Perpetuity);
        let profile = UserProfile::new(NaiveDate::from_ymd_opt(1989, 1, 1).unwrap());
        let revision = PlanRevision::new(ym("2024-01"), 500.0, 2000.0, 0.05, 0.02);
        let inputs = PlanInputs::new(plan, profile, vec![revision]).with_actuals(vec![ActualRecord {
            month: ym("2025-12"),
            starting_balance: 30_000.0,
            ending_balance: 31_000.0,
            contribution: 500.0,
            investment_return: 500.0,
        }]);

        let solver = TerminalValueSolver::default();
        let at_start = solver.solve_at_start(&inputs).unwrap();
        let latest = solver.solve_from_latest(&inputs).unwrap();

        assert_eq!(at_start.months_to_retirement, 240);
        assert_eq!(latest.months_to_retirement, 216);
        assert_relative_eq!(latest.required_capital, at_start.required_capital, max_relative = 1e-12);
    }
}
