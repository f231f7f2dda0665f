//! Plan, revision and history records consumed by the engine

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::assumptions::rates::checked_monthly_rate;
use crate::calendar::YearMonth;
use crate::error::{ensure_finite, DomainError};
use crate::events::CashEvent;

/// Default terminal horizon age
pub const DEFAULT_LIMITING_AGE: u32 = 100;

/// Oldest limiting age accepted; keeps month arithmetic on ages in range
pub const MAX_LIMITING_AGE: u32 = 150;

fn default_limiting_age() -> u32 {
    DEFAULT_LIMITING_AGE
}

fn default_currency() -> String {
    "USD".to_string()
}

/// What counts as "enough" capital at the end of accumulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TerminalPolicy {
    /// Spend the capital down to zero by the limiting age
    FiniteHorizonDepletion,
    /// Live off returns while never dipping below a bequest amount
    LegacyPreserving,
    /// Live off returns forever
    Perpetuity,
}

impl TerminalPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalPolicy::FiniteHorizonDepletion => "finite-horizon-depletion",
            TerminalPolicy::LegacyPreserving => "legacy-preserving",
            TerminalPolicy::Perpetuity => "perpetuity",
        }
    }
}

impl fmt::Display for TerminalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TerminalPolicy {
    type Err = DomainError;

    /// Accepts the stored numeric tags ("1", "2", "3") and the kebab-case names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" | "finite-horizon-depletion" => Ok(TerminalPolicy::FiniteHorizonDepletion),
            "2" | "legacy-preserving" => Ok(TerminalPolicy::LegacyPreserving),
            "3" | "perpetuity" => Ok(TerminalPolicy::Perpetuity),
            other => Err(DomainError::UnknownTerminalPolicy(other.to_string())),
        }
    }
}

impl TryFrom<String> for TerminalPolicy {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TerminalPolicy> for String {
    fn from(value: TerminalPolicy) -> Self {
        value.as_str().to_string()
    }
}

/// Owner of a plan; only the birth date matters to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub birth_date: NaiveDate,
}

impl UserProfile {
    pub fn new(birth_date: NaiveDate) -> Self {
        Self { birth_date }
    }

    pub fn birth_month(&self) -> YearMonth {
        YearMonth::from_date(self.birth_date)
    }

    /// Completed months of age at the given month
    pub fn age_in_months(&self, at: YearMonth) -> i32 {
        self.birth_month().months_until(at)
    }

    /// Age in whole years at the given month
    pub fn age_at(&self, at: YearMonth) -> i32 {
        self.age_in_months(at).div_euclid(12)
    }

    /// Month in which the user turns `age`
    pub fn month_at_age(&self, age: u32) -> YearMonth {
        let months = i32::try_from(age).unwrap_or(i32::MAX).saturating_mul(12);
        self.birth_month().add_months(months)
    }
}

/// An investment plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub plan_id: u32,

    #[serde(default = "default_currency")]
    pub currency: String,

    /// Balance invested at plan start
    pub initial_capital: f64,

    /// First projected month
    pub start: YearMonth,

    /// First month of decumulation
    pub accumulation_end: YearMonth,

    /// Age at which contributions stop and income starts
    pub final_age: u32,

    /// Age at which the projection ends
    #[serde(default = "default_limiting_age")]
    pub limiting_age: u32,

    pub terminal_policy: TerminalPolicy,

    /// Bequest floor for [`TerminalPolicy::LegacyPreserving`]
    #[serde(default)]
    pub legacy_amount: f64,

    /// Default for revisions that leave the flag unset
    #[serde(default)]
    pub inflate_contribution: bool,

    /// Default for revisions that leave the flag unset
    #[serde(default)]
    pub inflate_income: bool,

    /// Annual return of an alternate portfolio, for comparison runs
    #[serde(default)]
    pub alternate_return: Option<f64>,
}

impl Plan {
    pub fn new(
        plan_id: u32,
        initial_capital: f64,
        start: YearMonth,
        accumulation_end: YearMonth,
        final_age: u32,
        terminal_policy: TerminalPolicy,
    ) -> Self {
        Self {
            plan_id,
            currency: default_currency(),
            initial_capital,
            start,
            accumulation_end,
            final_age,
            limiting_age: DEFAULT_LIMITING_AGE,
            terminal_policy,
            legacy_amount: 0.0,
            inflate_contribution: false,
            inflate_income: false,
            alternate_return: None,
        }
    }

    pub fn with_limiting_age(mut self, limiting_age: u32) -> Self {
        self.limiting_age = limiting_age;
        self
    }

    pub fn with_legacy(mut self, legacy_amount: f64) -> Self {
        self.legacy_amount = legacy_amount;
        self
    }

    pub fn with_inflation_flags(mut self, contribution: bool, income: bool) -> Self {
        self.inflate_contribution = contribution;
        self.inflate_income = income;
        self
    }

    pub fn with_alternate_return(mut self, annual_return: f64) -> Self {
        self.alternate_return = Some(annual_return);
        self
    }

    /// Months of income the capital must fund under a depletion policy
    pub fn payout_months(&self) -> u32 {
        self.limiting_age.saturating_sub(self.final_age) * 12
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        ensure_finite("initial capital", self.initial_capital)?;
        ensure_finite("legacy amount", self.legacy_amount)?;
        if let Some(rate) = self.alternate_return {
            checked_monthly_rate("alternate return", rate)?;
        }
        if self.limiting_age == 0 {
            return Err(DomainError::InvalidAge {
                age: self.limiting_age,
                reason: "limiting age must be positive",
            });
        }
        if self.limiting_age > MAX_LIMITING_AGE {
            return Err(DomainError::InvalidAge {
                age: self.limiting_age,
                reason: "limiting age is past the supported maximum",
            });
        }
        if self.final_age > self.limiting_age {
            return Err(DomainError::InvalidAge {
                age: self.final_age,
                reason: "final age is past the limiting age",
            });
        }
        Ok(())
    }
}

/// A dated set of assumptions ("micro-plan") superseding earlier ones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRevision {
    /// First month the revision applies to
    pub effective: YearMonth,

    pub monthly_contribution: f64,

    /// Desired monthly income in today's money
    pub monthly_income: f64,

    /// Annual expected portfolio return
    pub expected_return: f64,

    /// Annual inflation
    pub inflation: f64,

    /// Overrides the plan flag when set
    #[serde(default)]
    pub inflate_contribution: Option<bool>,

    /// Overrides the plan flag when set
    #[serde(default)]
    pub inflate_income: Option<bool>,
}

impl PlanRevision {
    pub fn new(
        effective: YearMonth,
        monthly_contribution: f64,
        monthly_income: f64,
        expected_return: f64,
        inflation: f64,
    ) -> Self {
        Self {
            effective,
            monthly_contribution,
            monthly_income,
            expected_return,
            inflation,
            inflate_contribution: None,
            inflate_income: None,
        }
    }

    pub fn inflates_contribution(&self, plan: &Plan) -> bool {
        self.inflate_contribution.unwrap_or(plan.inflate_contribution)
    }

    pub fn inflates_income(&self, plan: &Plan) -> bool {
        self.inflate_income.unwrap_or(plan.inflate_income)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        ensure_finite("monthly contribution", self.monthly_contribution)?;
        ensure_finite("monthly income", self.monthly_income)?;
        checked_monthly_rate("expected return", self.expected_return)?;
        checked_monthly_rate("inflation", self.inflation)?;
        Ok(())
    }
}

/// Recorded real-world figures for one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualRecord {
    pub month: YearMonth,
    pub starting_balance: f64,
    pub ending_balance: f64,
    pub contribution: f64,
    #[serde(rename = "return", alias = "investment_return")]
    pub investment_return: f64,
}

impl ActualRecord {
    pub fn validate(&self) -> Result<(), DomainError> {
        ensure_finite("starting balance", self.starting_balance)?;
        ensure_finite("ending balance", self.ending_balance)?;
        ensure_finite("actual contribution", self.contribution)?;
        ensure_finite("actual return", self.investment_return)?;
        Ok(())
    }
}

/// Everything the simulator needs for one plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanInputs {
    pub plan: Plan,
    pub profile: UserProfile,
    pub revisions: Vec<PlanRevision>,
    #[serde(default)]
    pub events: Vec<CashEvent>,
    #[serde(default)]
    pub actuals: Vec<ActualRecord>,
}

impl PlanInputs {
    pub fn new(plan: Plan, profile: UserProfile, revisions: Vec<PlanRevision>) -> Self {
        Self {
            plan,
            profile,
            revisions,
            events: Vec::new(),
            actuals: Vec::new(),
        }
    }

    pub fn with_events(mut self, events: Vec<CashEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn with_actuals(mut self, actuals: Vec<ActualRecord>) -> Self {
        self.actuals = actuals;
        self
    }

    /// Month the user reaches the limiting age; the first month not projected
    pub fn limiting_month(&self) -> YearMonth {
        self.profile.month_at_age(self.plan.limiting_age)
    }

    /// Number of projected months
    pub fn horizon_months(&self) -> Result<u32, DomainError> {
        let end = self.limiting_month();
        let months = self.plan.start.months_until(end);
        if months <= 0 {
            return Err(DomainError::EmptyHorizon {
                start: self.plan.start,
                end,
            });
        }
        Ok(months as u32)
    }

    /// Check every input up front so a run either fully succeeds or fails here
    pub fn validate(&self) -> Result<(), DomainError> {
        self.plan.validate()?;
        if self.revisions.is_empty() {
            return Err(DomainError::EmptyRevisions);
        }
        for revision in &self.revisions {
            revision.validate()?;
        }
        for event in &self.events {
            event.validate()?;
        }
        for actual in &self.actuals {
            actual.validate()?;
        }
        self.horizon_months()?;
        Ok(())
    }
}
