//! Show control: playback state machine, command registry and the actor that owns the show.
//!
//! Protocol adapters parse their own wire format into `(command, payload)` and hand it to a
//! [`Dispatcher`]; everything else happens inside the single show actor.

mod actor;
mod clock;
mod commands;
mod config;
mod control;
mod error;
mod origin;
mod path;
mod playback;
mod registry;
mod show;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use control::{DispatchReply, Dispatcher, ShowControl};
pub use error::{DispatchError, PathError, PlaybackError, Result};
pub use origin::{LogOrigin, Origin};
pub use path::{parse_message_path, ParsedMessage, NAMESPACE};
pub use playback::{next_eligible, previous_eligible, transition, EndActionTaken, EventReport, Phase, Playback, PlaybackCommand, PlaybackEngine, PlaybackReport, PlaybackState, Target};
pub use registry::{CommandRegistry, CommandSpec, Handler, Payload, PayloadShape};
pub use show::{RundownEdit, RundownView, ShowState, TimedEntry};
