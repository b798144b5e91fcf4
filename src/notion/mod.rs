pub mod client;
pub mod collector;
pub mod types;
pub mod writer;

pub use client::NotionClient;
pub use collector::Collector;

/// Checkbox a writer ticks when the report is ready for feedback.
pub const READY_PROPERTY: &str = "FB_READY";
/// Checkbox set once feedback has been written.
pub const DONE_PROPERTY: &str = "FB_DONE";
/// Date property stamped with the completion time.
pub const COMPLETED_AT_PROPERTY: &str = "FB_AT";
