//! Logging facilities for ability tasks.
//!
//! The crates use `tracing` for instrumentation. Install a subscriber in the
//! host application to see output:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("ability_tasks=debug,ability_tasks_core::owner=trace")
//!     .init();
//! ```
//!
//! Lifecycle transitions are logged at `debug`, per-notification decisions
//! at `trace`.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Listener registry target.
    pub const SIGNAL: &str = "ability_tasks_core::signal";
    /// Owning component target.
    pub const OWNER: &str = "ability_tasks_core::owner";
    /// Task lifecycle target.
    pub const TASK: &str = "ability_tasks::task";
    /// Waiter callback target.
    pub const WAITER: &str = "ability_tasks::waiter";
    /// Tag query evaluation target.
    pub const QUERY: &str = "ability_tasks::query";
}

