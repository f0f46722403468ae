pub mod entry;
pub mod schedule;
pub mod topology;

pub use entry::{Banner, Direction, EntryPayload, NodeId, ScheduleEntry, Severity, ViewId};
pub use schedule::Schedule;
