use rundown::{EntryId, TimeMs, TimerType};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Playback {
	#[default]
	Stop,
	Armed,
	Play,
	Pause,
	Roll,
}

impl Playback {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Stop => "stop",
			Self::Armed => "armed",
			Self::Play => "play",
			Self::Pause => "pause",
			Self::Roll => "roll",
		}
	}
}

impl fmt::Display for Playback {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Escalation level of the active timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
	#[default]
	Default,
	Warning,
	Danger,
	Overtime,
}

impl Phase {
	pub const fn from_remaining(remaining: TimeMs, warning: TimeMs, danger: TimeMs) -> Self {
		if remaining < 0 {
			Self::Overtime
		} else if remaining <= danger {
			Self::Danger
		} else if remaining <= warning {
			Self::Warning
		} else {
			Self::Default
		}
	}
}

/// Published view of the playback engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
	pub playback: Playback,
	pub selected_entry_id: Option<EntryId>,
	pub next_entry_id: Option<EntryId>,
	pub timer_type: TimerType,
	pub current_timer_value: Option<TimeMs>,
	/// Overtime once the crossing passed; in roll, the countdown to the next start
	pub secondary_timer_value: Option<TimeMs>,
	pub duration: Option<TimeMs>,
	pub elapsed: Option<TimeMs>,
	pub started_at: Option<TimeMs>,
	pub finished_at: Option<TimeMs>,
	pub expected_finish: Option<TimeMs>,
	pub added_time: TimeMs,
	pub phase: Phase,
	pub clock: TimeMs,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn phase_thresholds() {
		assert_eq!(Phase::from_remaining(300_000, 120_000, 60_000), Phase::Default);
		assert_eq!(Phase::from_remaining(120_000, 120_000, 60_000), Phase::Warning);
		assert_eq!(Phase::from_remaining(60_000, 120_000, 60_000), Phase::Danger);
		assert_eq!(Phase::from_remaining(0, 120_000, 60_000), Phase::Danger);
		assert_eq!(Phase::from_remaining(-1, 120_000, 60_000), Phase::Overtime);
	}
}
