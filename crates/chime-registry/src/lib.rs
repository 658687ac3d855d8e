//! # Chime Registry
//!
//! The tree of groups and the entries they hold (rules, notice triggers,
//! jobs, resources), persisted in the key-value store and mirrored into the
//! dispatch tables and the job timer.
//!
//! ## Lifecycle
//! ```text
//! create:  validate → cursor id → put entry → put parent group → activate
//! modify:  validate → put entry → swap handler → rename in parent
//! delete:  unlink from parent → delete key → deactivate
//! startup: scan every namespace → skip bad records → activate active ones
//! ```

pub mod entry;
pub mod item;
pub mod registry;
pub mod runtime;

pub use entry::{Entry, Resource, UserRecord};
pub use item::{Group, Item, ItemType, ROOT_GROUP};
pub use registry::Registry;
pub use runtime::{Runtime, RuntimeBuilder};
