//! Month-granular calendar arithmetic
//!
//! The engine steps one calendar month at a time, so every date that enters it
//! (plan start, revision effective dates, event anchors, actual records) is
//! reduced to a [`YearMonth`] at the boundary. Day-of-month is ignored.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A calendar month, e.g. 2024-01
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Build from a year and a 1-based month
    pub fn new(year: i32, month: u32) -> Result<Self, DomainError> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::InvalidDate(format!("month {month} out of range 1-12")));
        }
        Ok(Self { year, month })
    }

    /// Month containing the given date
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month
    pub fn first_day(&self) -> Result<NaiveDate, DomainError> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .ok_or_else(|| DomainError::InvalidDate(format!("{self} is outside the supported range")))
    }

    /// Months elapsed since year 0, January
    fn ordinal(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    fn from_ordinal(ordinal: i64) -> Self {
        Self {
            year: ordinal.div_euclid(12) as i32,
            month: ordinal.rem_euclid(12) as u32 + 1,
        }
    }

    /// Signed number of months from `self` to `other` (positive when `other` is later)
    pub fn months_until(&self, other: YearMonth) -> i32 {
        (other.ordinal() - self.ordinal()) as i32
    }

    /// Shift by a signed number of months
    pub fn add_months(&self, months: i32) -> Self {
        Self::from_ordinal(self.ordinal() + months as i64)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = DomainError;

    /// Accepts `YYYY-MM` or a full `YYYY-MM-DD` date
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self::from_date(date));
        }

        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| DomainError::InvalidDate(format!("expected YYYY-MM, got {s:?}")))?;
        let year: i32 = year
            .parse()
            .map_err(|_| DomainError::InvalidDate(format!("bad year in {s:?}")))?;
        let month: u32 = month
            .parse()
            .map_err(|_| DomainError::InvalidDate(format!("bad month in {s:?}")))?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    #[test]
    fn test_months_until() {
        assert_eq!(ym("2024-01").months_until(ym("2054-01")), 360);
        assert_eq!(ym("2024-11").months_until(ym("2025-02")), 3);
        assert_eq!(ym("2025-02").months_until(ym("2024-11")), -3);
    }

    #[test]
    fn test_add_months_wraps_years() {
        assert_eq!(ym("2024-11").add_months(3), ym("2025-02"));
        assert_eq!(ym("2024-01").add_months(-1), ym("2023-12"));
        assert_eq!(ym("2024-01").add_months(0), ym("2024-01"));
    }

    #[test]
    fn test_parse_formats() {
        assert_eq!(ym("1990-07-15"), YearMonth::new(1990, 7).unwrap());
        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!("2024".parse::<YearMonth>().is_err());
        assert!("abcd-01".parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&ym("2031-04")).unwrap();
        assert_eq!(json, "\"2031-04\"");
        let back: YearMonth = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ym("2031-04"));
    }
}
