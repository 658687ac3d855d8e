//! # Chime Scheduler
//!
//! Cron-driven jobs that render a template and broadcast it to a fixed
//! audience.
//!
//! ## Architecture
//! ```text
//! tick(now)
//!   → SchedulerEngine.collect_due(now)
//!     → for each due entry: render action, advance or stop (one-shot)
//!   → deliver(firing) to every user (private) and group
//!   → one-shot cleanup: job table, timer entry, store key
//! ```

pub mod engine;
pub mod job;
pub mod schedule;

pub use engine::{Firing, JobState, SchedulerEngine, deliver};
pub use job::Job;
pub use schedule::{CronSchedule, validate_cron};
