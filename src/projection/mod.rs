//! Month-by-month projection of a plan's balance

mod state;
mod engine;
mod trajectory;
mod cache;
pub mod irr;

pub use state::{Phase, ProjectionState};
pub use engine::{ProjectionEngine, ProjectionConfig};
pub use trajectory::{PointSource, ProjectionPoint, Trajectory, TrajectorySummary};
pub use cache::{CacheStats, ProjectionCache};
