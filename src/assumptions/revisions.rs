//! Selection of the revision in force for a given month
//!
//! Rule: the revision with the most recent effective month at or before the
//! target month wins. When every revision starts after the target month, the
//! earliest one is used as a floor. Revisions sharing an effective month are
//! resolved in favour of the one supplied last.

use crate::calendar::YearMonth;
use crate::error::DomainError;
use crate::plan::PlanRevision;

/// Resolve the active revision with a single scan of the list
///
/// Prefer [`RevisionSchedule`] when resolving many months against the same list.
pub fn resolve(revisions: &[PlanRevision], target: YearMonth) -> Result<&PlanRevision, DomainError> {
    let mut active: Option<&PlanRevision> = None;
    let mut earliest: Option<&PlanRevision> = None;

    for revision in revisions {
        if revision.effective <= target && active.map_or(true, |a| revision.effective >= a.effective) {
            active = Some(revision);
        }
        if earliest.map_or(true, |e| revision.effective < e.effective) {
            earliest = Some(revision);
        }
    }

    active.or(earliest).ok_or(DomainError::EmptyRevisions)
}

/// Revisions sorted once by effective month for repeated lookups
#[derive(Debug, Clone)]
pub struct RevisionSchedule<'a> {
    /// Sorted by effective month, ties kept in input order
    sorted: Vec<&'a PlanRevision>,
}

impl<'a> RevisionSchedule<'a> {
    pub fn new(revisions: &'a [PlanRevision]) -> Result<Self, DomainError> {
        if revisions.is_empty() {
            return Err(DomainError::EmptyRevisions);
        }
        let mut sorted: Vec<&PlanRevision> = revisions.iter().collect();
        // Stable sort keeps the later-supplied revision last among equals
        sorted.sort_by_key(|r| r.effective);
        Ok(Self { sorted })
    }

    /// Revision in force at `target`
    pub fn resolve(&self, target: YearMonth) -> &'a PlanRevision {
        let idx = self.sorted.partition_point(|r| r.effective <= target);
        if idx == 0 {
            self.sorted[0]
        } else {
            self.sorted[idx - 1]
        }
    }

    /// Earliest revision, used as the floor
    pub fn earliest(&self) -> &'a PlanRevision {
        self.sorted[0]
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    fn revision(effective: &str, contribution: f64) -> PlanRevision {
        PlanRevision::new(ym(effective), contribution, 0.0, 0.05, 0.02)
    }

    #[test]
    fn test_boundary_month() {
        // Effective at month 0 and month 24 of a plan starting 2024-01
        let revisions = vec![revision("2024-01", 100.0), revision("2026-01", 200.0)];
        let schedule = RevisionSchedule::new(&revisions).unwrap();

        let month_23 = ym("2024-01").add_months(23);
        let month_24 = ym("2024-01").add_months(24);

        assert_eq!(schedule.resolve(month_23).monthly_contribution, 100.0);
        assert_eq!(schedule.resolve(month_24).monthly_contribution, 200.0);
        assert_eq!(resolve(&revisions, month_23).unwrap().monthly_contribution, 100.0);
        assert_eq!(resolve(&revisions, month_24).unwrap().monthly_contribution, 200.0);
    }

    #[test]
    fn test_arbitrary_input_order() {
        let revisions = vec![
            revision("2030-01", 300.0),
            revision("2024-01", 100.0),
            revision("2027-06", 200.0),
        ];
        let schedule = RevisionSchedule::new(&revisions).unwrap();

        for (month, expected) in [("2025-01", 100.0), ("2027-06", 200.0), ("2029-12", 200.0), ("2040-01", 300.0)] {
            assert_eq!(schedule.resolve(ym(month)).monthly_contribution, expected);
            assert_eq!(resolve(&revisions, ym(month)).unwrap().monthly_contribution, expected);
        }

        // Input is left untouched
        assert_eq!(revisions[0].monthly_contribution, 300.0);
    }

    #[test]
    fn test_falls_back_to_earliest() {
        let revisions = vec![revision("2030-01", 300.0), revision("2028-01", 200.0)];
        let schedule = RevisionSchedule::new(&revisions).unwrap();

        assert_eq!(schedule.resolve(ym("2024-01")).monthly_contribution, 200.0);
        assert_eq!(resolve(&revisions, ym("2024-01")).unwrap().monthly_contribution, 200.0);
        assert_eq!(schedule.earliest().monthly_contribution, 200.0);
    }

    #[test]
    fn test_same_month_later_supplied_wins() {
        let revisions = vec![revision("2025-01", 100.0), revision("2025-01", 150.0)];
        let schedule = RevisionSchedule::new(&revisions).unwrap();

        assert_eq!(schedule.resolve(ym("2025-03")).monthly_contribution, 150.0);
        assert_eq!(resolve(&revisions, ym("2025-03")).unwrap().monthly_contribution, 150.0);
    }

    #[test]
    fn test_empty_revisions_fail() {
        assert_eq!(resolve(&[], ym("2025-01")).unwrap_err(), DomainError::EmptyRevisions);
        assert!(matches!(RevisionSchedule::new(&[]), Err(DomainError::EmptyRevisions)));
    }
}
