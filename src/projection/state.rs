//! Month-by-month simulator state

use serde::{Deserialize, Serialize};

use crate::calendar::YearMonth;
use crate::plan::PlanRevision;

/// Lifecycle phase of a plan at a given month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Before the accumulation-end month: contributions flow in
    Accumulating,
    /// From accumulation end until the limiting-age month: income flows out
    Decumulating,
    /// Limiting age reached; nothing more is projected
    Terminal,
}

impl Phase {
    /// Phase of `month`; depends on nothing but the two boundary months
    pub fn at(month: YearMonth, accumulation_end: YearMonth, limiting_month: YearMonth) -> Self {
        if month >= limiting_month {
            Phase::Terminal
        } else if month < accumulation_end {
            Phase::Accumulating
        } else {
            Phase::Decumulating
        }
    }
}

/// State carried between simulated months
#[derive(Debug, Clone)]
pub struct ProjectionState<'a> {
    /// Month being simulated, 0 = plan start
    pub month_index: u32,

    /// Calendar month being simulated
    pub date: YearMonth,

    pub phase: Phase,

    /// Nominal balance; before `advance_month` it is the prior month's closing balance
    pub balance: f64,

    /// Revision used for the last projected month
    pub active_revision: Option<&'a PlanRevision>,

    /// Monthly return of `active_revision`
    pub monthly_return: f64,

    start: YearMonth,
    accumulation_end: YearMonth,
    limiting_month: YearMonth,
    started: bool,
}

impl<'a> ProjectionState<'a> {
    /// State just before the first simulated month
    pub fn new(
        initial_capital: f64,
        start: YearMonth,
        accumulation_end: YearMonth,
        limiting_month: YearMonth,
    ) -> Self {
        Self {
            month_index: 0,
            date: start,
            phase: Phase::at(start, accumulation_end, limiting_month),
            balance: initial_capital,
            active_revision: None,
            monthly_return: 0.0,
            start,
            accumulation_end,
            limiting_month,
            started: false,
        }
    }

    /// Move to the next month; returns the previous phase when it changed
    pub fn advance_month(&mut self) -> Option<Phase> {
        if self.started {
            self.month_index += 1;
        }
        self.started = true;
        self.date = self.start.add_months(self.month_index as i32);

        let phase = Phase::at(self.date, self.accumulation_end, self.limiting_month);
        if phase != self.phase {
            let previous = self.phase;
            self.phase = phase;
            return Some(previous);
        }
        None
    }

    /// Swap in the revision for this month; true when it differs from last month's
    pub fn switch_revision(&mut self, revision: &'a PlanRevision, monthly_return: f64) -> bool {
        let changed = !self
            .active_revision
            .is_some_and(|current| std::ptr::eq(current, revision));
        self.active_revision = Some(revision);
        self.monthly_return = monthly_return;
        changed
    }

    pub fn is_terminal(&self) -> bool {
        self.phase == Phase::Terminal
    }
}
