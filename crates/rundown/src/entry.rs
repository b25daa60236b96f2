use crate::error::{Result, RundownError};
use crate::types::{duration_between, in_time_range, wrap_end, EndAction, EntryId, TimeMs, TimeStrategy, TimerType, MAX_CUE_LENGTH, MAX_TIME_MS, MINUTE_MS};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A timed program item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct OntimeEvent {
	pub id: EntryId,
	pub cue: String,
	pub title: String,
	pub note: String,
	pub time_start: TimeMs,
	pub time_end: TimeMs,
	pub duration: TimeMs,
	pub time_strategy: TimeStrategy,
	pub link_start: Option<EntryId>,
	/// Local delay, carried by every entry after this one
	pub delay: TimeMs,
	pub time_warning: TimeMs,
	pub time_danger: TimeMs,
	pub end_action: EndAction,
	pub timer_type: TimerType,
	pub is_public: bool,
	pub skip: bool,
	pub colour: String,
	pub revision: u64,
	pub custom: BTreeMap<String, String>,
}

impl Default for OntimeEvent {
	fn default() -> Self {
		Self {
			id: generate_id(),
			cue: String::new(),
			title: String::new(),
			note: String::new(),
			time_start: 0,
			time_end: 0,
			duration: 0,
			time_strategy: TimeStrategy::default(),
			link_start: None,
			delay: 0,
			time_warning: 2 * MINUTE_MS,
			time_danger: MINUTE_MS,
			end_action: EndAction::default(),
			timer_type: TimerType::default(),
			is_public: false,
			skip: false,
			colour: String::new(),
			revision: 0,
			custom: BTreeMap::new(),
		}
	}
}

impl OntimeEvent {
	/// Create an event spanning `time_start..time_end`; an end before the start crosses midnight
	pub fn new(id: impl Into<EntryId>, time_start: TimeMs, time_end: TimeMs) -> Self {
		Self {
			id: id.into(),
			time_start,
			time_end: wrap_end(time_start, time_end),
			duration: duration_between(time_start, time_end),
			..Self::default()
		}
	}

	pub fn with_cue(mut self, cue: impl Into<String>) -> Self {
		self.cue = cue.into();
		self
	}

	pub fn with_title(mut self, title: impl Into<String>) -> Self {
		self.title = title.into();
		self
	}

	pub const fn with_strategy(mut self, strategy: TimeStrategy) -> Self {
		self.time_strategy = strategy;
		self
	}

	/// Derive this event's start from the end of `previous`
	pub fn linked_to(mut self, previous: impl Into<EntryId>) -> Self {
		self.time_strategy = TimeStrategy::LinkStart;
		self.link_start = Some(previous.into());
		self
	}

	pub const fn with_delay(mut self, delay: TimeMs) -> Self {
		self.delay = delay;
		self
	}

	pub const fn with_end_action(mut self, end_action: EndAction) -> Self {
		self.end_action = end_action;
		self
	}

	pub const fn with_timer_type(mut self, timer_type: TimerType) -> Self {
		self.timer_type = timer_type;
		self
	}

	pub const fn with_thresholds(mut self, warning: TimeMs, danger: TimeMs) -> Self {
		self.time_warning = warning;
		self.time_danger = danger;
		self
	}

	pub const fn skipped(mut self) -> Self {
		self.skip = true;
		self
	}

	pub fn with_custom(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.custom.insert(key.into(), value.into());
		self
	}

	pub const fn is_linked(&self) -> bool {
		matches!(self.time_strategy, TimeStrategy::LinkStart)
	}

	/// Align end and duration with the start. An event carrying only a duration gets its end
	/// from it, otherwise the duration follows the (day-wrapped) end.
	pub(crate) fn normalize(&mut self) -> Result<()> {
		self.check_ranges()?;
		if self.duration > 0 && self.time_end == self.time_start {
			self.time_end = self.time_start + self.duration;
		} else {
			self.time_end = wrap_end(self.time_start, self.time_end);
			self.duration = self.time_end - self.time_start;
		}
		Ok(())
	}

	fn check_ranges(&self) -> Result<()> {
		check_time("timeStart", self.time_start)?;
		check_time("timeEnd", self.time_end)?;
		check_time("duration", self.duration)?;
		check_time("delay", self.delay)?;
		check_time("timeWarning", self.time_warning)?;
		check_time("timeDanger", self.time_danger)
	}

	pub(crate) fn validate(&self) -> Result<()> {
		validate_cue(&self.cue)?;
		self.check_ranges()?;
		if self.duration < 0 {
			return Err(RundownError::invalid_field("duration", "must not be negative"));
		}
		if self.time_warning < 0 || self.time_danger < 0 {
			return Err(RundownError::invalid_field("timeWarning", "thresholds must not be negative"));
		}
		if self.link_start.as_deref() == Some(self.id.as_str()) {
			return Err(RundownError::InvalidLink {
				id: self.id.clone(),
				target: self.id.clone(),
				reason: "an event cannot link to itself".to_string(),
			});
		}
		Ok(())
	}
}

/// A delay marker pushing every later entry by `duration`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OntimeDelay {
	pub id: EntryId,
	#[serde(default)]
	pub duration: TimeMs,
}

impl OntimeDelay {
	pub fn new(id: impl Into<EntryId>, duration: TimeMs) -> Self {
		Self { id: id.into(), duration }
	}
}

/// A grouping marker with no timing of its own
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OntimeBlock {
	pub id: EntryId,
	#[serde(default)]
	pub title: String,
}

impl OntimeBlock {
	pub fn new(id: impl Into<EntryId>, title: impl Into<String>) -> Self {
		Self { id: id.into(), title: title.into() }
	}
}

/// One item of a rundown
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entry {
	Event(OntimeEvent),
	Delay(OntimeDelay),
	Block(OntimeBlock),
}

impl Entry {
	pub fn id(&self) -> &str {
		match self {
			Self::Event(event) => &event.id,
			Self::Delay(delay) => &delay.id,
			Self::Block(block) => &block.id,
		}
	}

	pub const fn as_event(&self) -> Option<&OntimeEvent> {
		match self {
			Self::Event(event) => Some(event),
			Self::Delay(_) | Self::Block(_) => None,
		}
	}

	pub const fn is_event(&self) -> bool {
		matches!(self, Self::Event(_))
	}

	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Event(_) => "event",
			Self::Delay(_) => "delay",
			Self::Block(_) => "block",
		}
	}
}

impl From<OntimeEvent> for Entry {
	fn from(event: OntimeEvent) -> Self {
		Self::Event(event)
	}
}

impl From<OntimeDelay> for Entry {
	fn from(delay: OntimeDelay) -> Self {
		Self::Delay(delay)
	}
}

impl From<OntimeBlock> for Entry {
	fn from(block: OntimeBlock) -> Self {
		Self::Block(block)
	}
}

/// Partial update of an event; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct EventPatch {
	pub cue: Option<String>,
	pub title: Option<String>,
	pub note: Option<String>,
	pub time_start: Option<TimeMs>,
	pub time_end: Option<TimeMs>,
	pub duration: Option<TimeMs>,
	pub time_strategy: Option<TimeStrategy>,
	/// `Some(None)` clears the link
	#[serde(deserialize_with = "present_field")]
	pub link_start: Option<Option<EntryId>>,
	pub delay: Option<TimeMs>,
	pub time_warning: Option<TimeMs>,
	pub time_danger: Option<TimeMs>,
	pub end_action: Option<EndAction>,
	pub timer_type: Option<TimerType>,
	pub is_public: Option<bool>,
	pub skip: Option<bool>,
	pub colour: Option<String>,
	pub custom: Option<BTreeMap<String, String>>,
}

fn present_field<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de>,
{
	T::deserialize(deserializer).map(Some)
}

impl EventPatch {
	pub fn is_empty(&self) -> bool {
		*self == Self::default()
	}

	/// Apply the patch, keeping start, end and duration consistent with the time strategy.
	/// The event is left untouched when the result would be invalid.
	pub(crate) fn apply(self, event: &mut OntimeEvent) -> Result<()> {
		let times = [
			("timeStart", self.time_start),
			("timeEnd", self.time_end),
			("duration", self.duration),
			("delay", self.delay),
			("timeWarning", self.time_warning),
			("timeDanger", self.time_danger),
		];
		for (field, value) in times {
			if let Some(value) = value {
				check_time(field, value)?;
			}
		}

		let mut next = event.clone();

		if let Some(strategy) = self.time_strategy {
			next.time_strategy = strategy;
			if strategy != TimeStrategy::LinkStart && self.link_start.is_none() {
				next.link_start = None;
			}
		}
		if let Some(link) = self.link_start {
			next.link_start = link;
			if next.link_start.is_some() {
				next.time_strategy = TimeStrategy::LinkStart;
			} else if next.time_strategy == TimeStrategy::LinkStart {
				next.time_strategy = TimeStrategy::LockDuration;
			}
		}

		if let Some(start) = self.time_start {
			next.time_start = start;
			match next.time_strategy {
				TimeStrategy::LockEnd => next.duration = duration_between(start, next.time_end),
				TimeStrategy::LockDuration | TimeStrategy::LinkStart => next.time_end = start + next.duration,
			}
		}
		if let Some(end) = self.time_end {
			next.time_end = wrap_end(next.time_start, end);
			next.duration = duration_between(next.time_start, end);
		}
		if let Some(duration) = self.duration {
			if duration < 0 {
				return Err(RundownError::invalid_field("duration", "must not be negative"));
			}
			next.duration = duration;
			next.time_end = next.time_start + duration;
		}

		if let Some(cue) = self.cue {
			next.cue = cue;
		}
		if let Some(title) = self.title {
			next.title = title;
		}
		if let Some(note) = self.note {
			next.note = note;
		}
		if let Some(delay) = self.delay {
			next.delay = delay;
		}
		if let Some(warning) = self.time_warning {
			next.time_warning = warning;
		}
		if let Some(danger) = self.time_danger {
			next.time_danger = danger;
		}
		if let Some(end_action) = self.end_action {
			next.end_action = end_action;
		}
		if let Some(timer_type) = self.timer_type {
			next.timer_type = timer_type;
		}
		if let Some(is_public) = self.is_public {
			next.is_public = is_public;
		}
		if let Some(skip) = self.skip {
			next.skip = skip;
		}
		if let Some(colour) = self.colour {
			next.colour = colour;
		}
		if let Some(custom) = self.custom {
			next.custom.extend(custom);
		}

		next.validate()?;
		next.revision = event.revision.wrapping_add(1);
		*event = next;
		Ok(())
	}
}

/// Time values past `±MAX_TIME_MS` are rejected before any arithmetic touches them
pub(crate) fn check_time(field: &str, value: TimeMs) -> Result<()> {
	if in_time_range(value) {
		Ok(())
	} else {
		Err(RundownError::invalid_field(field, format!("must be within {MAX_TIME_MS} ms of zero")))
	}
}

pub(crate) fn validate_cue(cue: &str) -> Result<()> {
	if cue.chars().count() > MAX_CUE_LENGTH {
		return Err(RundownError::invalid_field("cue", format!("longer than {MAX_CUE_LENGTH} characters")));
	}
	if cue.chars().any(char::is_control) {
		return Err(RundownError::invalid_field("cue", "must be printable"));
	}
	Ok(())
}

/// Fresh id for entries created without one
pub fn generate_id() -> EntryId {
	uuid::Uuid::new_v4().simple().to_string()
}
