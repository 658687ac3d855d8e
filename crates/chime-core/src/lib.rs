//! # Chime Core
//! Shared building blocks for every Chime crate: the error type, the TOML
//! configuration, inbound chat events, and the seams to the outside world
//! (message transport, template rendering, scripting, wall clock).

pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod render;
pub mod script;
pub mod template;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ChimeConfig;
pub use error::{ChimeError, Result, ValidationKind};
pub use event::{ChannelKind, GroupRole, MessageEvent, NoticeEvent, Sender, Target};
pub use render::Renderer;
pub use script::{ScriptHost, ScriptSession};
pub use template::{PlaceholderEngine, RenderContext, Template, TemplateEngine};
pub use transport::{LogTransport, RecordingTransport, Transport};
