//! One-off, installment and repeating cash events
//!
//! A [`CashEvent`] covers both goals (expenses) and general signed flows. It
//! carries no dated entries of its own; [`CashEvent::expand`] derives them on
//! demand and [`EventSchedule`] folds every event into per-month totals.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::assumptions::PriceIndex;
use crate::calendar::YearMonth;
use crate::error::{ensure_finite, DomainError};

fn default_one() -> i32 {
    1
}

/// How an event's amount is paid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    /// Full amount once, at the anchor month
    #[default]
    Single,
    /// Amount split evenly over `count` payments
    Installment,
    /// Full amount paid `count` times
    Repeat,
}

/// Lifecycle status; display only, completed events still count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    #[default]
    Pending,
    Completed,
}

/// A discrete signed cashflow anchored to a calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashEvent {
    #[serde(default)]
    pub label: Option<String>,

    /// Month of the first payment
    pub anchor: YearMonth,

    /// Signed amount; negative for outflows
    pub amount: f64,

    #[serde(default)]
    pub mode: PaymentMode,

    /// Number of payments for installment / repeat modes
    #[serde(default = "default_one")]
    pub count: i32,

    /// Months between payments
    #[serde(default = "default_one")]
    pub interval_months: i32,

    /// Express the amount in plan-start money, inflating each payment
    #[serde(default)]
    pub inflate: bool,

    #[serde(default)]
    pub status: EventStatus,
}

impl CashEvent {
    pub fn single(anchor: YearMonth, amount: f64) -> Self {
        Self {
            label: None,
            anchor,
            amount,
            mode: PaymentMode::Single,
            count: 1,
            interval_months: 1,
            inflate: false,
            status: EventStatus::Pending,
        }
    }

    pub fn installments(anchor: YearMonth, amount: f64, count: i32, interval_months: i32) -> Self {
        Self {
            mode: PaymentMode::Installment,
            count,
            interval_months,
            ..Self::single(anchor, amount)
        }
    }

    pub fn repeating(anchor: YearMonth, amount: f64, count: i32, interval_months: i32) -> Self {
        Self {
            mode: PaymentMode::Repeat,
            count,
            interval_months,
            ..Self::single(anchor, amount)
        }
    }

    /// A goal costs money: the cost is recorded as an outflow whatever its sign
    pub fn goal(label: impl Into<String>, anchor: YearMonth, cost: f64) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::single(anchor, -cost.abs())
        }
    }

    pub fn inflated(mut self) -> Self {
        self.inflate = true;
        self
    }

    pub fn completed(mut self) -> Self {
        self.status = EventStatus::Completed;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        ensure_finite("event amount", self.amount)?;
        Ok(())
    }

    /// Number of payments and the amount of each, before inflation
    fn payment_plan(&self) -> (u32, i32, f64) {
        if self.mode == PaymentMode::Single || self.count <= 0 || self.interval_months <= 0 {
            return (1, 1, self.amount);
        }
        let count = self.count as u32;
        let per_payment = match self.mode {
            PaymentMode::Installment => self.amount / count as f64,
            _ => self.amount,
        };
        (count, self.interval_months, per_payment)
    }

    /// Dated payments as (month index from plan start, signed amount)
    ///
    /// The iterator is lazy and can be cloned to replay it from the start.
    pub fn expand<'a, I: PriceIndex + ?Sized>(
        &self,
        plan_start: YearMonth,
        index: &'a I,
    ) -> Expansion<'a, I> {
        let (count, interval, per_payment) = self.payment_plan();
        let anchor_index = plan_start.months_until(self.anchor);

        // Payments past the largest representable month index never land anywhere
        let representable = (i32::MAX as i64 - anchor_index as i64) / interval as i64 + 1;
        let count = (count as i64).min(representable) as u32;

        Expansion {
            anchor_index,
            interval,
            count,
            per_payment,
            inflate: self.inflate,
            next: 0,
            index,
        }
    }
}

/// Iterator over an event's payments
pub struct Expansion<'a, I: ?Sized> {
    anchor_index: i32,
    interval: i32,
    count: u32,
    per_payment: f64,
    inflate: bool,
    next: u32,
    index: &'a I,
}

impl<I: ?Sized> Clone for Expansion<'_, I> {
    fn clone(&self) -> Self {
        Self {
            anchor_index: self.anchor_index,
            interval: self.interval,
            count: self.count,
            per_payment: self.per_payment,
            inflate: self.inflate,
            next: self.next,
            index: self.index,
        }
    }
}

impl<I: ?Sized> Expansion<'_, I> {
    /// Month index of payment `k`; `k < count` always fits in `i32`
    fn month_of(&self, k: u32) -> i32 {
        (self.anchor_index as i64 + k as i64 * self.interval as i64) as i32
    }

    /// Skip payments dated before `month`, returning how many were skipped
    pub fn skip_before(&mut self, month: i32) -> u32 {
        if self.next >= self.count {
            return 0;
        }
        let gap = month as i64 - self.month_of(self.next) as i64;
        if gap <= 0 {
            return 0;
        }
        let steps = (gap + self.interval as i64 - 1) / self.interval as i64;
        let skipped = steps.min((self.count - self.next) as i64) as u32;
        self.next += skipped;
        skipped
    }
}

impl<I: PriceIndex + ?Sized> Iterator for Expansion<'_, I> {
    type Item = (i32, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }
        let month = self.month_of(self.next);
        self.next += 1;

        let amount = if self.inflate {
            self.per_payment * self.index.factor_at(month)
        } else {
            self.per_payment
        };
        Some((month, amount))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.count - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl<I: PriceIndex + ?Sized> ExactSizeIterator for Expansion<'_, I> {}

/// Net event cashflow for every month of the horizon
#[derive(Debug, Clone, PartialEq)]
pub struct EventSchedule {
    per_month: Vec<f64>,
}

impl EventSchedule {
    pub fn build<I: PriceIndex + ?Sized>(
        events: &[CashEvent],
        plan_start: YearMonth,
        horizon_months: u32,
        index: &I,
    ) -> Self {
        let mut per_month = vec![0.0; horizon_months as usize];

        for event in events {
            let mut payments = event.expand(plan_start, index);
            let skipped = payments.skip_before(0);
            if skipped > 0 {
                debug!("Dropping {} event payments dated before plan start", skipped);
            }

            for (month, amount) in payments {
                if month as i64 >= horizon_months as i64 {
                    debug!(
                        "Dropping event payment of {:.2} at month {} and any later ones (horizon {})",
                        amount, month, horizon_months
                    );
                    break;
                }
                per_month[month as usize] += amount;
            }
        }

        Self { per_month }
    }

    /// Net event amount landing on month `t`
    pub fn amount_at(&self, t: u32) -> f64 {
        self.per_month.get(t as usize).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.per_month.iter().sum()
    }
}
