use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds from the logical start of the show day
pub type TimeMs = i64;

/// Stable identifier of an entry
pub type EntryId = String;

pub const SECOND_MS: TimeMs = 1_000;
pub const MINUTE_MS: TimeMs = 60 * SECOND_MS;
pub const HOUR_MS: TimeMs = 60 * MINUTE_MS;
pub const DAY_MS: TimeMs = 24 * HOUR_MS;

/// Largest magnitude accepted for any single time value
pub const MAX_TIME_MS: TimeMs = 30 * DAY_MS;

/// Longest cue label accepted by the store
pub const MAX_CUE_LENGTH: usize = 32;

/// How an event keeps its schedule consistent when one of its times moves
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TimeStrategy {
	/// Duration stays fixed, the end follows the start
	#[default]
	LockDuration,
	/// End stays fixed, the duration absorbs start changes
	LockEnd,
	/// Start is taken from the end of the linked previous event
	LinkStart,
}

/// What happens when the active event's timer reaches zero
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EndAction {
	#[default]
	None,
	Stop,
	LoadNext,
	PlayNext,
}

/// How the running timer value is derived
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TimerType {
	#[default]
	CountDown,
	CountUp,
	TimeToEnd,
	Clock,
}

impl fmt::Display for TimeStrategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::LockDuration => write!(f, "lock-duration"),
			Self::LockEnd => write!(f, "lock-end"),
			Self::LinkStart => write!(f, "link-start"),
		}
	}
}

impl fmt::Display for EndAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::None => write!(f, "none"),
			Self::Stop => write!(f, "stop"),
			Self::LoadNext => write!(f, "load-next"),
			Self::PlayNext => write!(f, "play-next"),
		}
	}
}

/// Duration between two day offsets, treating an end before the start as crossing midnight
#[must_use]
pub const fn duration_between(start: TimeMs, end: TimeMs) -> TimeMs {
	if end < start {
		end + DAY_MS - start
	} else {
		end - start
	}
}

/// Moves an end that precedes its start onto the following day
#[must_use]
pub const fn wrap_end(start: TimeMs, end: TimeMs) -> TimeMs {
	if end < start {
		end + DAY_MS
	} else {
		end
	}
}

/// Whether a time value lies within `±MAX_TIME_MS`
#[must_use]
pub const fn in_time_range(value: TimeMs) -> bool {
	-MAX_TIME_MS <= value && value <= MAX_TIME_MS
}

/// Builds a day offset from clock components, handy for fixtures and parsing
#[must_use]
pub const fn hms(hours: i64, minutes: i64, seconds: i64) -> TimeMs {
	hours * HOUR_MS + minutes * MINUTE_MS + seconds * SECOND_MS
}

/// Parses operator time input: plain milliseconds, `hh:mm` or `hh:mm:ss`.
/// Values outside `±MAX_TIME_MS` are rejected.
#[must_use]
pub fn parse_time(input: &str) -> Option<TimeMs> {
	let input = input.trim();
	if input.is_empty() {
		return None;
	}
	if let Ok(millis) = input.parse::<TimeMs>() {
		return Some(millis).filter(|ms| in_time_range(*ms));
	}

	let parts: Vec<&str> = input.split(':').collect();
	let parse = |part: &str| part.trim().parse::<i64>().ok().filter(|v| *v >= 0);
	let clock = |h: i64, m: i64, s: i64| {
		h.checked_mul(HOUR_MS)?
			.checked_add(m.checked_mul(MINUTE_MS)?)?
			.checked_add(s.checked_mul(SECOND_MS)?)
	};
	let millis = match parts.as_slice() {
		[h, m] => clock(parse(h)?, parse(m)?, 0),
		[h, m, s] => clock(parse(h)?, parse(m)?, parse(s)?),
		_ => None,
	}?;
	Some(millis).filter(|ms| in_time_range(*ms))
}
