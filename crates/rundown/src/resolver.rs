use crate::entry::Entry;
use crate::store::Rundown;
use crate::types::{EntryId, TimeMs, TimeStrategy, DAY_MS};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Effective schedule of one event after links and upstream delays
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTiming {
	pub time_start: TimeMs,
	pub time_end: TimeMs,
	pub duration: TimeMs,
	/// Cumulative delay in effect when this event was reached
	pub delay: TimeMs,
}

/// Resolved schedule of every event, in rundown order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRundown {
	order: Vec<(EntryId, ResolvedTiming)>,
	index: HashMap<EntryId, usize>,
	total_delay: TimeMs,
}

impl ResolvedRundown {
	pub fn get(&self, id: &str) -> Option<&ResolvedTiming> {
		self.index.get(id).map(|&position| &self.order[position].1)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &ResolvedTiming)> {
		self.order.iter().map(|(id, timing)| (id.as_str(), timing))
	}

	pub fn len(&self) -> usize {
		self.order.len()
	}

	pub fn is_empty(&self) -> bool {
		self.order.is_empty()
	}

	pub fn first_start(&self) -> Option<TimeMs> {
		self.order.first().map(|(_, timing)| timing.time_start)
	}

	pub fn last_end(&self) -> Option<TimeMs> {
		self.order.last().map(|(_, timing)| timing.time_end)
	}

	/// Span from the first start to the last end
	pub fn total_duration(&self) -> TimeMs {
		match (self.first_start(), self.last_end()) {
			(Some(start), Some(end)) => (end - start).max(0),
			_ => 0,
		}
	}

	/// Delay carried past the final entry
	pub const fn total_delay(&self) -> TimeMs {
		self.total_delay
	}
}

/// Resolve every event's effective start, end and duration.
///
/// Total over any entry slice: a link whose target is missing or not earlier falls back to the
/// event's own stored start.
pub fn resolve(entries: &[Entry]) -> ResolvedRundown {
	let mut resolved = ResolvedRundown::default();
	let mut cumulative: TimeMs = 0;

	for entry in entries {
		let event = match entry {
			Entry::Event(event) => event,
			Entry::Delay(delay) => {
				cumulative += delay.duration;
				continue;
			}
			Entry::Block(_) => continue,
		};

		let anchor = match (event.time_strategy, &event.link_start) {
			(TimeStrategy::LinkStart, Some(target)) => resolved.get(target).copied(),
			_ => None,
		};

		let time_start = match anchor {
			// delays picked up since the anchor still push the linked start
			Some(target) => target.time_end + (cumulative - target.delay),
			None => event.time_start + cumulative,
		};
		let mut time_end = match event.time_strategy {
			TimeStrategy::LockDuration | TimeStrategy::LinkStart => time_start + event.duration,
			TimeStrategy::LockEnd => event.time_end + cumulative,
		};
		if time_end < time_start {
			time_end += DAY_MS;
		}

		let timing = ResolvedTiming {
			time_start,
			time_end,
			duration: time_end - time_start,
			delay: cumulative,
		};
		resolved.index.insert(event.id.clone(), resolved.order.len());
		resolved.order.push((event.id.clone(), timing));
		cumulative += event.delay;
	}

	resolved.total_delay = cumulative;
	resolved
}

/// Caches the last resolution and recomputes in full whenever the rundown version moves
#[derive(Debug, Default)]
pub struct TimeResolver {
	cached: Option<(u64, Arc<ResolvedRundown>)>,
}

impl TimeResolver {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn resolved(&mut self, rundown: &Rundown) -> Arc<ResolvedRundown> {
		if let Some((version, resolved)) = &self.cached {
			if *version == rundown.version() {
				return Arc::clone(resolved);
			}
		}

		trace!(version = rundown.version(), entries = rundown.len(), "resolving rundown");
		let resolved = Arc::new(resolve(rundown.entries()));
		self.cached = Some((rundown.version(), Arc::clone(&resolved)));
		resolved
	}

	/// Drop the cache; needed when the rundown is replaced wholesale
	pub fn invalidate(&mut self) {
		self.cached = None;
	}
}
