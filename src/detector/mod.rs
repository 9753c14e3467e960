//! Turns pairs of match snapshots into classified change events.

pub mod diff;
pub mod trend;

pub use diff::diff;
pub use trend::{advance, ScoreTrend, TrendKind};
