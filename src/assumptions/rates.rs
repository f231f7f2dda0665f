//! Annual <-> monthly rate conversion
//!
//! Every rate the engine compounds with (expected return, inflation, the
//! solver's blended rate, alternate-portfolio returns) goes through
//! [`monthly_rate`], so one month of growth always means the same thing.

use crate::error::DomainError;

/// Convert an annual effective rate to the equivalent monthly compounding rate
///
/// `r_m = (1 + r_y)^(1/12) - 1`, with `r_y = 0` mapped straight to 0.
pub fn monthly_rate(annual_rate: f64) -> Result<f64, DomainError> {
    checked_monthly_rate("annual", annual_rate)
}

/// Same as [`monthly_rate`] but names the offending input in the error
pub fn checked_monthly_rate(field: &'static str, annual_rate: f64) -> Result<f64, DomainError> {
    validate(field, annual_rate)?;
    if annual_rate == 0.0 {
        return Ok(0.0);
    }
    Ok((1.0 + annual_rate).powf(1.0 / 12.0) - 1.0)
}

/// Convert a monthly compounding rate back to an annual effective rate
pub fn annual_rate(monthly_rate: f64) -> Result<f64, DomainError> {
    validate("monthly", monthly_rate)?;
    if monthly_rate == 0.0 {
        return Ok(0.0);
    }
    Ok((1.0 + monthly_rate).powi(12) - 1.0)
}

/// Growth factor of `months` months of compounding at an annual rate
pub fn compound_factor(annual_rate: f64, months: i32) -> Result<f64, DomainError> {
    let r = monthly_rate(annual_rate)?;
    Ok((1.0 + r).powi(months))
}

fn validate(field: &'static str, rate: f64) -> Result<(), DomainError> {
    if !rate.is_finite() || rate < -1.0 {
        return Err(DomainError::InvalidRate { field, value: rate });
    }
    Ok(())
}
