//! Wealth Projection - deterministic monthly projection engine for personal investment plans
//!
//! This library provides:
//! - Month-by-month balance projection through accumulation and decumulation
//! - Dated plan revisions, one-off / installment / repeating cash events
//! - Terminal capital and required-contribution solving for three payout policies
//! - Reconciliation against recorded months and planned-vs-actual progress reports
//! - What-if scenarios (contribution, income, alternate portfolio return)

pub mod calendar;
pub mod error;
pub mod assumptions;
pub mod events;
pub mod plan;
pub mod terminal;
pub mod projection;
pub mod scenario;
pub mod progress;

// Re-export commonly used types
pub use calendar::YearMonth;
pub use error::DomainError;
pub use events::{CashEvent, EventSchedule, PaymentMode};
pub use plan::{ActualRecord, Plan, PlanBundle, PlanInputs, PlanRevision, TerminalPolicy, UserProfile};
pub use projection::{ProjectionConfig, ProjectionEngine, Trajectory, TrajectorySummary};
pub use scenario::{ScenarioEngine, ScenarioOverride};
pub use progress::{ProgressComparator, ProgressReport};
pub use terminal::{TerminalSolution, TerminalValueSolver};
