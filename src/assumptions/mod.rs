//! Rate conversion, price indices and revision selection

pub mod rates;
mod inflation;
mod revisions;

pub use rates::{annual_rate, compound_factor, monthly_rate};
pub use inflation::{ConstantInflation, CumulativePriceIndex, PriceIndex};
pub use revisions::{resolve, RevisionSchedule};
