pub mod timeline_store;

pub use timeline_store::{TimelinePhase, TimelineStore, TimelineSummary};
