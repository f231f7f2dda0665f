//! Time-value-of-money helpers for the terminal solver
//!
//! All rates here are monthly and all periods are months.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Rates closer to zero than this take the linear branch
const ZERO_RATE_TOLERANCE: f64 = 1e-12;

/// When in each month a level payment is made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentTiming {
    /// Ordinary annuity; matches the simulator, which compounds then adds the cashflow
    #[default]
    End,
    /// Annuity due
    Begin,
}

/// Helper functions for present / future value calculations
pub struct AnnuityMath;

impl AnnuityMath {
    /// PV of `n_months` level payments, first payment immediate
    pub fn pv_annuity_due(amount: f64, n_months: u32, monthly_rate: f64) -> f64 {
        if monthly_rate.abs() < ZERO_RATE_TOLERANCE {
            return amount * n_months as f64;
        }

        let v = 1.0 / (1.0 + monthly_rate);
        amount * (1.0 - v.powi(n_months as i32)) / (1.0 - v)
    }

    /// PV of `n_months` level payments made at the end of each month
    ///
    /// `amount * (1 - (1 + r)^-n) / r`
    pub fn pv_annuity_ordinary(amount: f64, n_months: u32, monthly_rate: f64) -> f64 {
        if monthly_rate.abs() < ZERO_RATE_TOLERANCE {
            return amount * n_months as f64;
        }
        amount * (1.0 - (1.0 + monthly_rate).powi(-(n_months as i32))) / monthly_rate
    }

    /// PV of a level payment received forever
    pub fn pv_perpetuity(amount: f64, monthly_rate: f64) -> Result<f64, DomainError> {
        if monthly_rate <= ZERO_RATE_TOLERANCE {
            return Err(DomainError::UnfundablePerpetuity { monthly_rate });
        }
        Ok(amount / monthly_rate)
    }

    /// Future value of a single amount after `n_months`
    pub fn fv_lump(amount: f64, n_months: u32, monthly_rate: f64) -> f64 {
        amount * (1.0 + monthly_rate).powi(n_months as i32)
    }

    /// Level payment growing `pv` into `fv` over `n_months`
    ///
    /// Solves `pv (1+r)^n + pmt * s(n, r) = fv` for `pmt`. With no periods
    /// left the whole shortfall is due at once.
    pub fn payment(
        monthly_rate: f64,
        n_months: u32,
        pv: f64,
        fv: f64,
        timing: PaymentTiming,
    ) -> f64 {
        if n_months == 0 {
            return fv - pv;
        }
        if monthly_rate.abs() < ZERO_RATE_TOLERANCE {
            return (fv - pv) / n_months as f64;
        }

        let growth = (1.0 + monthly_rate).powi(n_months as i32);
        let mut factor = (growth - 1.0) / monthly_rate;
        if timing == PaymentTiming::Begin {
            factor *= 1.0 + monthly_rate;
        }
        (fv - pv * growth) / factor
    }

    /// First payment of a series growing by `monthly_growth` each month
    /// that grows `pv` into `fv` over `n_months`
    pub fn growing_payment(
        monthly_rate: f64,
        monthly_growth: f64,
        n_months: u32,
        pv: f64,
        fv: f64,
        timing: PaymentTiming,
    ) -> f64 {
        if monthly_growth.abs() < ZERO_RATE_TOLERANCE {
            return Self::payment(monthly_rate, n_months, pv, fv, timing);
        }
        if n_months == 0 {
            return fv - pv;
        }

        let n = n_months as i32;
        let growth = (1.0 + monthly_rate).powi(n);
        let mut factor = if (monthly_rate - monthly_growth).abs() < ZERO_RATE_TOLERANCE {
            n as f64 * (1.0 + monthly_rate).powi(n - 1)
        } else {
            (growth - (1.0 + monthly_growth).powi(n)) / (monthly_rate - monthly_growth)
        };
        if timing == PaymentTiming::Begin {
            factor *= 1.0 + monthly_rate;
        }
        (fv - pv * growth) / factor
    }
}
