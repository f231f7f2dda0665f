//! Memoized trajectories for repeated projections of unchanged inputs
//!
//! A progress report projects the same plan twice (as planned and reconciled)
//! and a what-if sweep re-runs the baseline for every comparison. Projection is
//! a pure function of (inputs, config, scenario), so the trajectory for a given
//! combination is computed once and handed back on later calls.

use std::collections::hash_map::DefaultHasher;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use log::debug;
use serde::Serialize;

use super::engine::{ProjectionConfig, ProjectionEngine};
use super::trajectory::Trajectory;
use crate::error::DomainError;
use crate::plan::PlanInputs;
use crate::scenario::ScenarioOverride;

/// Everything a trajectory depends on
#[derive(Serialize)]
struct CacheKey<'a> {
    inputs: &'a PlanInputs,
    config: &'a ProjectionConfig,
    scenario: Option<&'a ScenarioOverride>,
}

impl CacheKey<'_> {
    fn digest(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        // Serializing plain data cannot fail; an empty key still hashes consistently
        serde_json::to_vec(self).unwrap_or_default().hash(&mut hasher);
        hasher.finish()
    }
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// In-memory trajectory cache
#[derive(Debug, Default)]
pub struct ProjectionCache {
    entries: HashMap<u64, Trajectory>,
    stats: CacheStats,
}

impl ProjectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached trajectory or project and remember it
    ///
    /// Failed projections are not cached.
    pub fn get_or_project(
        &mut self,
        inputs: &PlanInputs,
        config: &ProjectionConfig,
        scenario: Option<&ScenarioOverride>,
    ) -> Result<&Trajectory, DomainError> {
        let key = CacheKey {
            inputs,
            config,
            scenario,
        }
        .digest();

        match self.entries.entry(key) {
            Entry::Occupied(entry) => {
                self.stats.hits += 1;
                debug!("Projection cache hit for plan {} ({:016x})", inputs.plan.plan_id, key);
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                self.stats.misses += 1;
                debug!("Projection cache miss for plan {} ({:016x})", inputs.plan.plan_id, key);
                let trajectory = ProjectionEngine::new(inputs, config.clone()).run(scenario)?;
                Ok(entry.insert(trajectory))
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::YearMonth;
    use crate::plan::{Plan, PlanRevision, TerminalPolicy, UserProfile};
    use chrono::NaiveDate;

    fn inputs() -> PlanInputs {
        let start = YearMonth::new(2024, 1).unwrap();
        let plan = Plan::new(7, 1000.0, start, start.add_months(120), 60, TerminalPolicy::Perpetuity);
        let profile = UserProfile::new(NaiveDate::from_ymd_opt(1974, 1, 1).unwrap());
        PlanInputs::new(plan, profile, vec![PlanRevision::new(start, 100.0, 500.0, 0.05, 0.02)])
    }

    #[test]
    fn test_hit_returns_same_trajectory() {
        let mut cache = ProjectionCache::new();
        let inputs = inputs();
        let config = ProjectionConfig::default();

        let first = cache.get_or_project(&inputs, &config, None).unwrap().clone();
        let second = cache.get_or_project(&inputs, &config, None).unwrap().clone();

        assert_eq!(first, second);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
        assert_eq!(cache.stats().hit_rate(), 0.5);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_changed_inputs_miss() {
        let mut cache = ProjectionCache::new();
        let mut inputs = inputs();
        let config = ProjectionConfig::default();

        cache.get_or_project(&inputs, &config, None).unwrap();
        inputs.revisions[0].monthly_contribution = 200.0;
        cache.get_or_project(&inputs, &config, None).unwrap();
        cache
            .get_or_project(&inputs, &ProjectionConfig::as_planned(), None)
            .unwrap();

        assert_eq!(cache.stats().misses, 3);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_errors_not_cached() {
        let mut cache = ProjectionCache::new();
        let mut inputs = inputs();
        inputs.revisions.clear();

        assert!(cache
            .get_or_project(&inputs, &ProjectionConfig::default(), None)
            .is_err());
        assert!(cache.is_empty());
    }
}
