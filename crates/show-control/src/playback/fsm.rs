use super::Playback;
use crate::error::{PlaybackError, Result};

/// Operator intents, validated before the engine touches any timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackCommand {
	Load,
	Start,
	Pause,
	Stop,
	Reload,
	Roll,
	AddTime,
}

impl PlaybackCommand {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Load => "load",
			Self::Start => "start",
			Self::Pause => "pause",
			Self::Stop => "stop",
			Self::Reload => "reload",
			Self::Roll => "roll",
			Self::AddTime => "add time",
		}
	}
}

/// Pure FSM: returns the next mode or why the command is illegal
pub fn transition(mode: Playback, cmd: &PlaybackCommand) -> Result<Playback> {
	use Playback::{Armed, Pause, Play, Roll, Stop};
	use PlaybackCommand as Cmd;

	let invalid = || PlaybackError::InvalidTransition { from: mode, command: cmd.as_str() };

	Ok(match (mode, cmd) {
		// Load always arms, whatever was running
		(_, Cmd::Load) => Armed,

		(Armed | Pause | Play, Cmd::Start) => Play,
		(Stop, Cmd::Start) => return Err(PlaybackError::NothingLoaded),
		(Roll, Cmd::Start) => return Err(invalid()),

		(Play | Pause, Cmd::Pause) => Pause,
		(Stop, Cmd::Pause) => return Err(PlaybackError::NothingLoaded),
		(Armed | Roll, Cmd::Pause) => return Err(invalid()),

		// Stop is always legal, idempotent from Stop
		(_, Cmd::Stop) => Stop,

		(Armed | Play | Pause, Cmd::Reload) => Armed,
		(Stop, Cmd::Reload) => return Err(PlaybackError::NothingLoaded),
		(Roll, Cmd::Reload) => return Err(invalid()),

		(_, Cmd::Roll) => Roll,

		(Armed | Play | Pause, Cmd::AddTime) => mode,
		(Stop, Cmd::AddTime) => return Err(PlaybackError::NothingLoaded),
		(Roll, Cmd::AddTime) => return Err(invalid()),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	const ALL_MODES: [Playback; 5] = [Playback::Stop, Playback::Armed, Playback::Play, Playback::Pause, Playback::Roll];

	#[test]
	fn stop_is_legal_from_every_mode() {
		for mode in ALL_MODES {
			assert_eq!(transition(mode, &PlaybackCommand::Stop).unwrap(), Playback::Stop);
		}
	}

	#[test]
	fn start_without_anything_loaded_is_reported() {
		assert!(matches!(transition(Playback::Stop, &PlaybackCommand::Start), Err(PlaybackError::NothingLoaded)));
	}

	#[test]
	fn start_resumes_from_armed_and_pause() {
		assert_eq!(transition(Playback::Armed, &PlaybackCommand::Start).unwrap(), Playback::Play);
		assert_eq!(transition(Playback::Pause, &PlaybackCommand::Start).unwrap(), Playback::Play);
		assert_eq!(transition(Playback::Play, &PlaybackCommand::Start).unwrap(), Playback::Play);
	}

	#[test]
	fn pause_only_while_playing() {
		assert_eq!(transition(Playback::Play, &PlaybackCommand::Pause).unwrap(), Playback::Pause);
		assert!(matches!(
			transition(Playback::Armed, &PlaybackCommand::Pause),
			Err(PlaybackError::InvalidTransition { from: Playback::Armed, .. })
		));
		assert!(transition(Playback::Roll, &PlaybackCommand::Pause).is_err());
	}

	#[test]
	fn roll_rejects_timer_commands() {
		for cmd in [PlaybackCommand::Start, PlaybackCommand::Reload, PlaybackCommand::AddTime] {
			assert!(transition(Playback::Roll, &cmd).is_err(), "{cmd:?}");
		}
		assert_eq!(transition(Playback::Roll, &PlaybackCommand::Load).unwrap(), Playback::Armed);
	}
}
