// Declare modules
pub mod event;
pub mod milestone;
pub mod sync;

// Re-export all public types so callers can use `crate::models::CalendarEvent`
// without caring which file a type lives in.
pub use event::{CalendarEvent, EventTime};
pub use milestone::{Milestone, SoundClip};
pub use sync::{CycleOutcome, MergeOutcome};
