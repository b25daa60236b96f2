use std::collections::BTreeMap;

use rundown::{EntryId, TimeMs};
use serde::{Deserialize, Serialize};

/// Actual run of one event, recorded as it plays
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventReport {
	pub started_at: Option<TimeMs>,
	pub ended_at: Option<TimeMs>,
	/// Run time minus the scheduled duration; positive when the event ran long
	pub over_under: Option<TimeMs>,
}

impl EventReport {
	pub const fn started(now: TimeMs) -> Self {
		Self {
			started_at: Some(now),
			ended_at: None,
			over_under: None,
		}
	}

	pub fn finish(&mut self, now: TimeMs, planned: TimeMs) {
		self.ended_at = Some(now);
		self.over_under = self.started_at.map(|started| now - started - planned);
	}
}

/// Reports keyed by event id
pub type PlaybackReport = BTreeMap<EntryId, EventReport>;
