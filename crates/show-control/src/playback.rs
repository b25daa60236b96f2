mod engine;
mod fsm;
mod report;
mod state;
mod target;

pub use engine::{EndActionTaken, PlaybackEngine};
pub use fsm::{transition, PlaybackCommand};
pub use report::{EventReport, PlaybackReport};
pub use state::{Phase, Playback, PlaybackState};
pub use target::{next_eligible, previous_eligible, Target};
