//! Internal rate of return of recorded cashflows
//!
//! Used to express what the actual history earned as an annual rate,
//! comparable with a revision's expected return.

use crate::plan::ActualRecord;

const TOLERANCE: f64 = 1e-10;
const MAX_ITERATIONS: usize = 1000;

/// Periodic IRR of a cashflow series (positive = inflow, negative = outflow)
///
/// Newton-Raphson from a small positive guess, falling back to bisection over
/// [-99%, 1000%] per period. `None` when the series never changes sign.
pub fn periodic_irr(cashflows: &[f64]) -> Option<f64> {
    if cashflows.is_empty() {
        return None;
    }
    if cashflows.iter().all(|cf| cf.abs() < TOLERANCE) {
        return Some(0.0);
    }

    let has_inflow = cashflows.iter().any(|&cf| cf > TOLERANCE);
    let has_outflow = cashflows.iter().any(|&cf| cf < -TOLERANCE);
    if !has_inflow || !has_outflow {
        return None;
    }

    let mut rate = 0.005;
    for _ in 0..MAX_ITERATIONS {
        let (npv, slope) = npv_with_slope(cashflows, rate);
        if slope.abs() < 1e-20 {
            break;
        }

        let next = (rate - npv / slope).clamp(-0.99, 10.0);
        if (next - rate).abs() < TOLERANCE {
            return Some(next);
        }
        rate = next;
    }

    bisect(cashflows)
}

/// IRR of monthly cashflows, annualized
pub fn annualized_irr(monthly_cashflows: &[f64]) -> Option<f64> {
    periodic_irr(monthly_cashflows).map(|r| (1.0 + r).powi(12) - 1.0)
}

/// Money-weighted annual return of recorded months
///
/// The opening balance of the earliest record is the first outflow, each
/// month's contribution is paid in at the end of that month and the closing
/// balance of the latest record comes back at the end of its month. Records
/// are placed by calendar month, so months missing from the history carry no
/// cashflow rather than closing the gap.
pub fn money_weighted_return(actuals: &[ActualRecord]) -> Option<f64> {
    let first = actuals.iter().min_by_key(|a| a.month)?;
    let last = actuals.iter().max_by_key(|a| a.month)?;
    let span = first.month.months_until(last.month) as usize + 1;

    let mut cashflows = vec![0.0; span + 1];
    cashflows[0] = -first.starting_balance;
    for actual in actuals {
        let offset = first.month.months_until(actual.month) as usize;
        cashflows[offset + 1] -= actual.contribution;
    }
    cashflows[span] += last.ending_balance;

    annualized_irr(&cashflows)
}

fn npv_with_slope(cashflows: &[f64], rate: f64) -> (f64, f64) {
    let mut npv = 0.0;
    let mut slope = 0.0;

    for (t, &cf) in cashflows.iter().enumerate() {
        npv += cf / (1.0 + rate).powi(t as i32);
        if t > 0 {
            slope -= t as f64 * cf / (1.0 + rate).powi(t as i32 + 1);
        }
    }

    (npv, slope)
}

fn npv(cashflows: &[f64], rate: f64) -> f64 {
    npv_with_slope(cashflows, rate).0
}

fn bisect(cashflows: &[f64]) -> Option<f64> {
    let mut low = -0.99_f64;
    let mut high = 10.0_f64;
    let mut npv_low = npv(cashflows, low);

    if npv_low * npv(cashflows, high) > 0.0 {
        return None;
    }

    for _ in 0..MAX_ITERATIONS {
        let mid = (low + high) / 2.0;
        let npv_mid = npv(cashflows, mid);

        if npv_mid.abs() < TOLERANCE || (high - low) / 2.0 < TOLERANCE {
            return Some(mid);
        }

        if npv_mid * npv_low < 0.0 {
            high = mid;
        } else {
            low = mid;
            npv_low = npv_mid;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::YearMonth;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_single_period_growth() {
        // 1000 in, 1100 back after a year of months
        let mut cashflows = vec![-1000.0];
        cashflows.extend(vec![0.0; 11]);
        cashflows.push(1100.0);

        let irr = annualized_irr(&cashflows).unwrap();
        assert_abs_diff_eq!(irr, 0.10, epsilon = 1e-6);
    }

    #[test]
    fn test_no_sign_change() {
        assert_eq!(periodic_irr(&[]), None);
        assert_eq!(periodic_irr(&[100.0, 200.0]), None);
        assert_eq!(periodic_irr(&[0.0, 0.0]), Some(0.0));
    }

    #[test]
    fn test_money_weighted_return_matches_growth() {
        let r = 0.004;
        let start = YearMonth::new(2024, 1).unwrap();
        let mut balance = 10_000.0;
        let mut actuals = Vec::new();

        for t in 0..24 {
            let starting_balance = balance;
            let investment_return = balance * r;
            balance += investment_return + 500.0;
            actuals.push(ActualRecord {
                month: start.add_months(t),
                starting_balance,
                ending_balance: balance,
                contribution: 500.0,
                investment_return,
            });
        }

        let annual = money_weighted_return(&actuals).unwrap();
        assert_abs_diff_eq!(annual, (1.0 + r).powi(12) - 1.0, epsilon = 1e-8);
        assert_eq!(money_weighted_return(&[]), None);

        actuals.reverse();
        let shuffled = money_weighted_return(&actuals).unwrap();
        assert_abs_diff_eq!(shuffled, annual, epsilon = 1e-10);
    }

    #[test]
    fn test_money_weighted_return_spans_gaps() {
        // A year of 10% growth recorded only in January and December
        let record = |month: u32, starting_balance: f64, ending_balance: f64| ActualRecord {
            month: YearMonth::new(2024, month).unwrap(),
            starting_balance,
            ending_balance,
            contribution: 0.0,
            investment_return: ending_balance - starting_balance,
        };
        let monthly = 1.1_f64.powf(1.0 / 12.0);
        let january_close = 10_000.0 * monthly;
        let december_open = 11_000.0 / monthly;
        let actuals = vec![
            record(1, 10_000.0, january_close),
            record(12, december_open, 11_000.0),
        ];

        let annual = money_weighted_return(&actuals).unwrap();
        assert_abs_diff_eq!(annual, 0.10, epsilon = 1e-8);
    }
}
