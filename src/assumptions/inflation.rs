//! Cumulative price indices used to inflate cashflows and deflate balances

use super::rates::checked_monthly_rate;
use super::revisions::RevisionSchedule;
use crate::calendar::YearMonth;
use crate::error::DomainError;

/// Cumulative inflation factor between plan start and the start of a month
///
/// Month indices are relative to plan start; month 0 has factor 1.
pub trait PriceIndex {
    fn factor_at(&self, month_index: i32) -> f64;
}

/// A single inflation rate applied to every month
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantInflation {
    monthly_rate: f64,
}

impl ConstantInflation {
    pub fn new(annual_inflation: f64) -> Result<Self, DomainError> {
        Ok(Self {
            monthly_rate: checked_monthly_rate("inflation", annual_inflation)?,
        })
    }

    pub fn monthly_rate(&self) -> f64 {
        self.monthly_rate
    }
}

impl PriceIndex for ConstantInflation {
    fn factor_at(&self, month_index: i32) -> f64 {
        (1.0 + self.monthly_rate).powi(month_index)
    }
}

/// Price index built from the inflation rate of the revision active each month
///
/// A revision change only alters growth from its month onward; the factor
/// already accumulated is never recomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct CumulativePriceIndex {
    /// Factor at the end of month t, after that month's inflation
    end_of_month: Vec<f64>,
}

impl CumulativePriceIndex {
    pub fn build(
        schedule: &RevisionSchedule<'_>,
        start: YearMonth,
        horizon_months: u32,
    ) -> Result<Self, DomainError> {
        let mut end_of_month = Vec::with_capacity(horizon_months as usize);
        let mut factor = 1.0;

        for t in 0..horizon_months {
            let revision = schedule.resolve(start.add_months(t as i32));
            let monthly = checked_monthly_rate("inflation", revision.inflation)?;
            factor *= 1.0 + monthly;
            end_of_month.push(factor);
        }

        Ok(Self { end_of_month })
    }

    /// Factor including month `t`'s inflation; used to deflate that month's balance
    pub fn at_end(&self, t: u32) -> f64 {
        match self.end_of_month.get(t as usize) {
            Some(&factor) => factor,
            None => self.end_of_month.last().copied().unwrap_or(1.0),
        }
    }

    /// Factor before month `t`'s inflation; used to inflate cashflows paid in month `t`
    pub fn at_start(&self, t: u32) -> f64 {
        if t == 0 {
            1.0
        } else {
            self.at_end(t - 1)
        }
    }

    pub fn len(&self) -> usize {
        self.end_of_month.len()
    }

    pub fn is_empty(&self) -> bool {
        self.end_of_month.is_empty()
    }
}

impl PriceIndex for CumulativePriceIndex {
    fn factor_at(&self, month_index: i32) -> f64 {
        if month_index <= 0 {
            1.0
        } else {
            self.at_start(month_index as u32)
        }
    }
}
