//! Error types raised by the projection engine

use thiserror::Error;

use crate::calendar::YearMonth;

/// Invalid input detected by one of the engine's pure functions.
///
/// Every engine entry point either fully succeeds or returns one of these;
/// there is no partial result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("invalid {field} rate {value}: must be finite and >= -100%")]
    InvalidRate { field: &'static str, value: f64 },

    #[error("{field} must be a finite amount, got {value}")]
    NonFiniteAmount { field: &'static str, value: f64 },

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("invalid age {age}: {reason}")]
    InvalidAge { age: u32, reason: &'static str },

    #[error("plan has no revisions")]
    EmptyRevisions,

    #[error("unknown terminal policy tag {0:?}")]
    UnknownTerminalPolicy(String),

    #[error("projection horizon is empty: plan starts {start}, limiting age reached {end}")]
    EmptyHorizon { start: YearMonth, end: YearMonth },

    #[error("capital funding income forever needs a positive monthly return, got {monthly_rate}")]
    UnfundablePerpetuity { monthly_rate: f64 },

    #[error("more than one actual record for {0}")]
    DuplicateActual(YearMonth),
}

/// Reject NaN and infinite amounts.
pub(crate) fn ensure_finite(field: &'static str, value: f64) -> Result<f64, DomainError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DomainError::NonFiniteAmount { field, value })
    }
}
