//! Projection output: one point per simulated month

use serde::{Deserialize, Serialize};

use super::state::Phase;
use crate::calendar::YearMonth;

/// Where a point's balance came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointSource {
    /// Taken from a recorded month
    Actual,
    /// Computed by the simulator
    Projected,
}

/// Balance at the end of one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPoint {
    /// Months since plan start
    pub month_index: u32,
    pub date: YearMonth,
    pub phase: Phase,
    pub nominal_balance: f64,
    /// Nominal balance deflated to plan-start money
    pub real_balance: f64,
    /// Net cashflow applied this month (contributions, income, events)
    pub cashflow: f64,
    /// Contribution part of `cashflow`; zero outside accumulation
    pub contribution: f64,
    pub source: PointSource,
}

/// Gap-free monthly sequence from plan start to the limiting-age month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub plan_id: u32,
    pub points: Vec<ProjectionPoint>,
}

impl Trajectory {
    pub fn new(plan_id: u32) -> Self {
        Self {
            plan_id,
            points: Vec::new(),
        }
    }

    pub fn with_capacity(plan_id: u32, months: usize) -> Self {
        Self {
            plan_id,
            points: Vec::with_capacity(months),
        }
    }

    pub fn push(&mut self, point: ProjectionPoint) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&ProjectionPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&ProjectionPoint> {
        self.points.last()
    }

    /// Point for a calendar month, if projected
    pub fn at(&self, date: YearMonth) -> Option<&ProjectionPoint> {
        let first = self.points.first()?;
        let offset = first.date.months_until(date);
        if offset < 0 {
            return None;
        }
        self.points.get(offset as usize)
    }

    pub fn final_nominal(&self) -> f64 {
        self.points.last().map(|p| p.nominal_balance).unwrap_or(0.0)
    }

    pub fn final_real(&self) -> f64 {
        self.points.last().map(|p| p.real_balance).unwrap_or(0.0)
    }

    /// Leading run of points taken from actual records
    pub fn actual_prefix(&self) -> &[ProjectionPoint] {
        let len = self
            .points
            .iter()
            .take_while(|p| p.source == PointSource::Actual)
            .count();
        &self.points[..len]
    }

    /// First month index whose nominal balance reaches `target`
    pub fn months_to_reach(&self, target: f64) -> Option<u32> {
        self.points
            .iter()
            .find(|p| p.nominal_balance >= target)
            .map(|p| p.month_index)
    }

    /// Get summary statistics
    pub fn summary(&self) -> TrajectorySummary {
        let actual_months = self
            .points
            .iter()
            .filter(|p| p.source == PointSource::Actual)
            .count() as u32;

        let total_contributions: f64 = self
            .points
            .iter()
            .filter(|p| p.phase == Phase::Accumulating)
            .map(|p| p.cashflow)
            .sum();
        let total_withdrawals: f64 = self
            .points
            .iter()
            .filter(|p| p.phase == Phase::Decumulating)
            .map(|p| -p.cashflow)
            .sum();

        let peak = self
            .points
            .iter()
            .max_by(|a, b| a.nominal_balance.total_cmp(&b.nominal_balance));

        let retirement_nominal = self
            .points
            .iter()
            .rev()
            .find(|p| p.phase == Phase::Accumulating)
            .map(|p| p.nominal_balance);

        let depletion_date = self
            .points
            .iter()
            .find(|p| p.nominal_balance < 0.0)
            .map(|p| p.date);

        TrajectorySummary {
            total_months: self.points.len() as u32,
            actual_months,
            final_nominal: self.final_nominal(),
            final_real: self.final_real(),
            peak_nominal: peak.map(|p| p.nominal_balance).unwrap_or(0.0),
            peak_date: peak.map(|p| p.date),
            retirement_nominal,
            total_contributions,
            total_withdrawals,
            depletion_date,
        }
    }
}

/// Summary statistics for a trajectory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySummary {
    pub total_months: u32,
    pub actual_months: u32,
    pub final_nominal: f64,
    pub final_real: f64,
    pub peak_nominal: f64,
    pub peak_date: Option<YearMonth>,
    /// Balance at the last accumulating month
    pub retirement_nominal: Option<f64>,
    /// Net cashflow over the accumulation phase
    pub total_contributions: f64,
    /// Net outflow over the decumulation phase
    pub total_withdrawals: f64,
    /// First month the balance goes negative
    pub depletion_date: Option<YearMonth>,
}
