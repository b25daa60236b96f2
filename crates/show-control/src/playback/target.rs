use crate::error::{PlaybackError, Result};
use rundown::{Entry, EntryId, OntimeEvent, Rundown};
use serde::{Deserialize, Serialize};

/// How a command addresses the entry to load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
	Id(EntryId),
	Cue(String),
	/// Position among events, starting at 0
	Index(usize),
	Next,
	Previous,
}

impl Target {
	/// Find the event this target names, relative to the current selection
	pub fn locate<'a>(&self, rundown: &'a Rundown, selected: Option<&str>) -> Result<&'a OntimeEvent> {
		match self {
			Self::Id(id) => {
				let entry = rundown.get(id).ok_or_else(|| PlaybackError::EntryNotFound(id.clone()))?;
				let event = entry.as_event().ok_or_else(|| PlaybackError::NotPlayable(id.clone()))?;
				playable(event)
			}
			Self::Cue(cue) => match rundown.events().find(|event| event.cue == *cue && !event.skip) {
				Some(event) => Ok(event),
				None if rundown.get_by_cue(cue).is_some() => Err(PlaybackError::NotPlayable(format!("cue {cue}"))),
				None => Err(PlaybackError::EntryNotFound(format!("cue {cue}"))),
			},
			Self::Index(index) => {
				let event = rundown.events().nth(*index).ok_or_else(|| PlaybackError::EntryNotFound(format!("index {index}")))?;
				playable(event)
			}
			Self::Next => next_eligible(rundown, selected).ok_or(PlaybackError::NoEligibleEntry),
			Self::Previous => previous_eligible(rundown, selected).ok_or(PlaybackError::NoEligibleEntry),
		}
	}
}

fn playable(event: &OntimeEvent) -> Result<&OntimeEvent> {
	if event.skip {
		Err(PlaybackError::NotPlayable(event.id.clone()))
	} else {
		Ok(event)
	}
}

/// First non-skipped event after `after`; with no (or a vanished) anchor, the first one
pub fn next_eligible<'a>(rundown: &'a Rundown, after: Option<&str>) -> Option<&'a OntimeEvent> {
	let start = after.and_then(|id| rundown.position(id)).map_or(0, |position| position + 1);
	rundown.entries()[start.min(rundown.len())..].iter().filter_map(Entry::as_event).find(|event| !event.skip)
}

/// Last non-skipped event before `before`; with no anchor, the first one
pub fn previous_eligible<'a>(rundown: &'a Rundown, before: Option<&str>) -> Option<&'a OntimeEvent> {
	match before.and_then(|id| rundown.position(id)) {
		Some(position) => rundown.entries()[..position].iter().rev().filter_map(Entry::as_event).find(|event| !event.skip),
		None => next_eligible(rundown, None),
	}
}
