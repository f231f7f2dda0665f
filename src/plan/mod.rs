//! Plan inputs and file loading

mod data;
pub mod loader;

pub use data::{
    ActualRecord, Plan, PlanInputs, PlanRevision, TerminalPolicy, UserProfile, DEFAULT_LIMITING_AGE,
};
pub use loader::{load_actuals, load_actuals_from_reader, load_bundle, write_trajectory_csv, PlanBundle};
