use crate::playback::Playback;
use rundown::{RundownError, TimeMs};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlaybackError>;

#[derive(Debug, Error)]
pub enum PlaybackError {
	#[error("Nothing is loaded")]
	NothingLoaded,

	#[error("Entry not found: {0}")]
	EntryNotFound(String),

	#[error("Entry {0} cannot be played")]
	NotPlayable(String),

	#[error("No eligible entry to load")]
	NoEligibleEntry,

	#[error("Cannot {command} while in {from}")]
	InvalidTransition { from: Playback, command: &'static str },

	#[error("Adding {0} ms moves the timer out of range")]
	TimeOutOfRange(TimeMs),
}

impl PlaybackError {
	/// Another playback command can clear the condition; the rest need a rundown change
	pub const fn is_recoverable(&self) -> bool {
		matches!(self, Self::NothingLoaded | Self::InvalidTransition { .. } | Self::TimeOutOfRange(_))
	}
}

/// Everything a dispatch can fail with; always reported back, never raised past the dispatcher
#[derive(Debug, Error)]
pub enum DispatchError {
	#[error("Unknown command: {0}")]
	UnknownCommand(String),

	#[error("Invalid payload for {command}: {reason}")]
	InvalidPayload { command: String, reason: String },

	#[error(transparent)]
	Playback(#[from] PlaybackError),

	#[error(transparent)]
	Rundown(#[from] RundownError),

	#[error("Show engine unavailable")]
	Unavailable,
}

impl DispatchError {
	pub(crate) fn invalid(command: &str, reason: impl Into<String>) -> Self {
		Self::InvalidPayload {
			command: command.to_string(),
			reason: reason.into(),
		}
	}

	pub const fn is_recoverable(&self) -> bool {
		!matches!(self, Self::Unavailable)
	}

	/// Short label used for metrics
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::UnknownCommand(_) => "unknown_command",
			Self::InvalidPayload { .. } => "invalid_payload",
			Self::Playback(_) => "playback",
			Self::Rundown(_) => "rundown",
			Self::Unavailable => "unavailable",
		}
	}
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
	#[error("Address {0} is outside the /ontime namespace")]
	WrongNamespace(String),

	#[error("Address {0} has no command")]
	MissingCommand(String),
}
