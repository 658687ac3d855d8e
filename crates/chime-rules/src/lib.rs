//! # Chime Rules
//!
//! Message rules and notice triggers: their stored definitions, the compiler
//! that turns them into predicate chains, the per-rule rate limiter and the
//! dispatch runtime that evaluates inbound events against the active set.
//!
//! ```text
//! MessageEvent ─▶ Dispatcher (priority order)
//!                   ├── filters: channel kind, groups, users, @me, role
//!                   ├── pattern: full / keyword / prefix / suffix / command / regex
//!                   ├── rate limit
//!                   └── render reply ─▶ Transport   (stop here if `block`)
//! ```

pub mod compile;
pub mod dispatch;
pub mod limiter;
pub mod model;
pub mod pattern;

pub use compile::{Compiler, MatchSettings, check_trigger_arity};
pub use dispatch::Dispatcher;
pub use limiter::RateLimiter;
pub use model::{MatcherType, MessageTypes, RateLimit, RoleMask, Rule, Trigger};
pub use pattern::{MatchDetails, Pattern};
