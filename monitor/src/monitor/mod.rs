//! Container monitor loop
//!
//! Two interchangeable background tasks share one list-then-iterate shape:
//! the exec sweep runs a fixed command in every running container, the inspect
//! sweep prints each container's inspection payload.

mod format;
mod sink;
mod sweep;

pub use format::indent_json;
pub use sink::LineSink;
pub use sweep::{ContainerMonitor, SweepKind, SweepReport, DEFAULT_SWEEP_INTERVAL};
