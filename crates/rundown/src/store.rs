use crate::entry::{check_time, generate_id, Entry, EventPatch, OntimeEvent};
use crate::error::{Result, RundownError};
use crate::types::{EntryId, TimeMs, TimeStrategy};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Ordered entries of a show with an id → position index.
///
/// Every Rundown upholds the link invariant: a linked event names an event at a strictly
/// earlier position. Mutations that would break it are rejected, structural changes re-anchor
/// links to the nearest preceding event.
#[derive(Debug, Clone, Default)]
pub struct Rundown {
	entries: Vec<Entry>,
	index: HashMap<EntryId, usize>,
	version: u64,
}

impl Rundown {
	pub fn new() -> Self {
		Self::default()
	}

	/// Build a rundown from untrusted data, rejecting anything that violates the data model
	pub fn from_entries(entries: Vec<Entry>) -> Result<Self> {
		let mut rundown = Self {
			entries,
			index: HashMap::new(),
			version: 0,
		};
		rundown.rebuild_index()?;
		for entry in &mut rundown.entries {
			match entry {
				Entry::Event(event) => event.normalize()?,
				Entry::Delay(delay) => check_time("duration", delay.duration)?,
				Entry::Block(_) => {}
			}
		}

		for (position, entry) in rundown.entries.iter().enumerate() {
			let Some(event) = entry.as_event() else {
				continue;
			};
			event.validate()?;
			if event.is_linked() {
				if let Some(target) = &event.link_start {
					rundown.check_link(&event.id, target, position)?;
				}
			}
		}

		rundown.relink();
		Ok(rundown)
	}

	pub const fn version(&self) -> u64 {
		self.version
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn entries(&self) -> &[Entry] {
		&self.entries
	}

	pub fn iter(&self) -> impl Iterator<Item = &Entry> {
		self.entries.iter()
	}

	/// Events only, in rundown order
	pub fn events(&self) -> impl Iterator<Item = &OntimeEvent> {
		self.entries.iter().filter_map(Entry::as_event)
	}

	pub fn position(&self, id: &str) -> Option<usize> {
		self.index.get(id).copied()
	}

	pub fn get(&self, id: &str) -> Option<&Entry> {
		self.position(id).and_then(|position| self.entries.get(position))
	}

	pub fn get_event(&self, id: &str) -> Option<&OntimeEvent> {
		self.get(id).and_then(Entry::as_event)
	}

	/// First event carrying the given cue; cues are not unique
	pub fn get_by_cue(&self, cue: &str) -> Option<&OntimeEvent> {
		self.events().find(|event| event.cue == cue)
	}

	pub fn get_by_index(&self, index: usize) -> Option<&Entry> {
		self.entries.get(index)
	}

	/// Insert an entry after `after`, or at the end when no anchor is given
	pub fn insert(&mut self, mut entry: Entry, after: Option<&str>) -> Result<&Entry> {
		assign_id(&mut entry);
		match &mut entry {
			Entry::Event(event) => event.normalize()?,
			Entry::Delay(delay) => check_time("duration", delay.duration)?,
			Entry::Block(_) => {}
		}
		if self.index.contains_key(entry.id()) {
			return Err(RundownError::DuplicateId(entry.id().to_string()));
		}

		let position = match after {
			Some(anchor) => self.position(anchor).ok_or_else(|| RundownError::NotFound(anchor.to_string()))? + 1,
			None => self.entries.len(),
		};

		if let Some(event) = entry.as_event() {
			event.validate()?;
			if let (true, Some(target)) = (event.is_linked(), &event.link_start) {
				self.check_link(&event.id, target, position)?;
			}
		}

		debug!(id = entry.id(), kind = entry.kind(), position, "inserting entry");
		self.entries.insert(position, entry);
		self.structure_changed();
		Ok(&self.entries[position])
	}

	/// Apply a partial update to an event
	pub fn patch_event(&mut self, id: &str, patch: EventPatch) -> Result<&OntimeEvent> {
		let position = self.position(id).ok_or_else(|| RundownError::NotFound(id.to_string()))?;
		let current = self.entries[position].as_event().ok_or_else(|| RundownError::NotAnEvent(id.to_string()))?;

		let mut next = current.clone();
		patch.apply(&mut next)?;

		if next.is_linked() {
			match &next.link_start {
				Some(target) => self.check_link(id, target, position)?,
				None => {
					let anchor = self.preceding_event(position).ok_or_else(|| RundownError::InvalidLink {
						id: id.to_string(),
						target: String::new(),
						reason: "no earlier event to link to".to_string(),
					})?;
					next.link_start = Some(anchor);
				}
			}
		}

		debug!(id, revision = next.revision, "patched event");
		self.entries[position] = Entry::Event(next);
		self.bump();
		match &self.entries[position] {
			Entry::Event(event) => Ok(event),
			Entry::Delay(_) | Entry::Block(_) => Err(RundownError::NotAnEvent(id.to_string())),
		}
	}

	/// Change a delay marker's duration
	pub fn set_delay_duration(&mut self, id: &str, duration: TimeMs) -> Result<()> {
		check_time("duration", duration)?;
		let position = self.position(id).ok_or_else(|| RundownError::NotFound(id.to_string()))?;
		match &mut self.entries[position] {
			Entry::Delay(delay) => delay.duration = duration,
			Entry::Event(_) | Entry::Block(_) => return Err(RundownError::invalid_field("duration", format!("{id} is not a delay"))),
		}
		self.bump();
		Ok(())
	}

	/// Remove entries by id; nothing is removed when any id is unknown
	pub fn remove<I, S>(&mut self, ids: I) -> Result<()>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut doomed = Vec::new();
		for id in ids {
			let id = id.as_ref();
			let position = self.position(id).ok_or_else(|| RundownError::NotFound(id.to_string()))?;
			doomed.push(position);
		}
		if doomed.is_empty() {
			return Ok(());
		}

		doomed.sort_unstable();
		doomed.dedup();
		for position in doomed.into_iter().rev() {
			let removed = self.entries.remove(position);
			debug!(id = removed.id(), "removed entry");
		}
		self.structure_changed();
		Ok(())
	}

	pub fn clear(&mut self) {
		self.entries.clear();
		self.index.clear();
		self.bump();
	}

	/// Move the entry `id`, currently at `from`, to position `to`
	pub fn reorder(&mut self, id: &str, from: usize, to: usize) -> Result<()> {
		let actual = self.position(id).ok_or_else(|| RundownError::NotFound(id.to_string()))?;
		if actual != from {
			return Err(RundownError::invalid_field("from", format!("{id} is at {actual}, not {from}")));
		}
		if to >= self.entries.len() {
			return Err(RundownError::invalid_field("to", format!("position {to} is out of range")));
		}
		if from == to {
			return Ok(());
		}

		let entry = self.entries.remove(from);
		self.entries.insert(to, entry);
		self.structure_changed();
		Ok(())
	}

	/// Exchange the positions of two events; the schedule slots stay where they were
	pub fn swap(&mut self, a: &str, b: &str) -> Result<()> {
		let first = self.position(a).ok_or_else(|| RundownError::NotFound(a.to_string()))?;
		let second = self.position(b).ok_or_else(|| RundownError::NotFound(b.to_string()))?;
		if first == second {
			return Ok(());
		}
		for (id, position) in [(a, first), (b, second)] {
			if !self.entries[position].is_event() {
				return Err(RundownError::NotAnEvent(id.to_string()));
			}
		}

		self.entries.swap(first, second);
		let (low, high) = if first < second { (first, second) } else { (second, first) };
		let (head, tail) = self.entries.split_at_mut(high);
		if let (Entry::Event(x), Entry::Event(y)) = (&mut head[low], &mut tail[0]) {
			std::mem::swap(&mut x.time_start, &mut y.time_start);
			std::mem::swap(&mut x.time_end, &mut y.time_end);
			std::mem::swap(&mut x.duration, &mut y.duration);
			x.revision = x.revision.wrapping_add(1);
			y.revision = y.revision.wrapping_add(1);
		}
		self.structure_changed();
		Ok(())
	}

	/// Bake a delay marker into the stored times of every event after it, then drop the marker.
	///
	/// Resolved times do not move. Events linked across the marker are unlinked and locked
	/// at their resolved start.
	pub fn apply_delay(&mut self, delay_id: &str) -> Result<()> {
		let position = self.position(delay_id).ok_or_else(|| RundownError::NotFound(delay_id.to_string()))?;
		let Entry::Delay(delay) = &self.entries[position] else {
			return Err(RundownError::invalid_field("id", format!("{delay_id} is not a delay")));
		};
		let amount = delay.duration;
		let resolved = crate::resolver::resolve(&self.entries);

		for entry in &mut self.entries[position + 1..] {
			let Entry::Event(event) = entry else {
				continue;
			};
			let crosses_marker = event.is_linked()
				&& event
					.link_start
					.as_ref()
					.and_then(|target| self.index.get(target))
					.is_some_and(|&target| target < position);

			match resolved.get(&event.id) {
				Some(timing) if crosses_marker => {
					event.time_strategy = TimeStrategy::LockDuration;
					event.link_start = None;
					event.time_start = timing.time_start - timing.delay + amount;
					event.time_end = event.time_start + event.duration;
				}
				_ if amount == 0 => continue,
				_ => {
					event.time_start += amount;
					event.time_end += amount;
				}
			}
			event.revision = event.revision.wrapping_add(1);
		}

		debug!(id = delay_id, amount, "applied delay");
		self.entries.remove(position);
		self.structure_changed();
		Ok(())
	}

	fn check_link(&self, id: &str, target: &str, position: usize) -> Result<()> {
		let invalid = |reason: &str| RundownError::InvalidLink {
			id: id.to_string(),
			target: target.to_string(),
			reason: reason.to_string(),
		};
		let target_position = self.position(target).ok_or_else(|| invalid("target does not exist"))?;
		if target_position >= position {
			return Err(invalid("target must come earlier in the rundown"));
		}
		if !self.entries[target_position].is_event() {
			return Err(invalid("target is not an event"));
		}
		Ok(())
	}

	fn preceding_event(&self, position: usize) -> Option<EntryId> {
		self.entries[..position].iter().rev().find_map(|entry| entry.as_event().map(|event| event.id.clone()))
	}

	fn structure_changed(&mut self) {
		self.index = self.entries.iter().enumerate().map(|(position, entry)| (entry.id().to_string(), position)).collect();
		self.relink();
		self.bump();
	}

	fn rebuild_index(&mut self) -> Result<()> {
		self.index.clear();
		for (position, entry) in self.entries.iter_mut().enumerate() {
			assign_id(entry);
			if self.index.insert(entry.id().to_string(), position).is_some() {
				return Err(RundownError::DuplicateId(entry.id().to_string()));
			}
		}
		Ok(())
	}

	/// Re-anchor links whose target is gone or no longer earlier
	fn relink(&mut self) {
		let mut last_event: Option<EntryId> = None;
		let mut seen_events: HashSet<EntryId> = HashSet::new();

		for entry in &mut self.entries {
			let Entry::Event(event) = entry else {
				continue;
			};

			if event.time_strategy == TimeStrategy::LinkStart {
				let anchored = event.link_start.as_ref().is_some_and(|target| seen_events.contains(target));
				if !anchored {
					match &last_event {
						Some(previous) => event.link_start = Some(previous.clone()),
						None => {
							event.link_start = None;
							event.time_strategy = TimeStrategy::LockDuration;
						}
					}
					event.revision = event.revision.wrapping_add(1);
					debug!(id = %event.id, link = ?event.link_start, "re-anchored link");
				}
			} else if event.link_start.is_some() {
				event.link_start = None;
			}

			seen_events.insert(event.id.clone());
			last_event = Some(event.id.clone());
		}
	}

	fn bump(&mut self) {
		self.version = self.version.wrapping_add(1);
	}
}

fn assign_id(entry: &mut Entry) {
	let id = match entry {
		Entry::Event(event) => &mut event.id,
		Entry::Delay(delay) => &mut delay.id,
		Entry::Block(block) => &mut block.id,
	};
	if id.is_empty() {
		*id = generate_id();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::entry::{OntimeBlock, OntimeDelay};
	use crate::types::{hms, MINUTE_MS};

	fn event(id: &str, start: i64, end: i64) -> Entry {
		OntimeEvent::new(id, start, end).into()
	}

	fn sample() -> Rundown {
		Rundown::from_entries(vec![
			event("a", hms(9, 0, 0), hms(9, 30, 0)),
			OntimeEvent::new("b", hms(9, 30, 0), hms(10, 0, 0)).linked_to("a").into(),
			event("c", hms(10, 0, 0), hms(10, 15, 0)),
		])
		.unwrap()
	}

	#[test]
	fn from_entries_rejects_duplicates_and_forward_links() {
		let dup = Rundown::from_entries(vec![event("a", 0, 1), event("a", 1, 2)]);
		assert!(matches!(dup, Err(RundownError::DuplicateId(_))));

		let forward = Rundown::from_entries(vec![OntimeEvent::new("a", 0, 1).linked_to("b").into(), event("b", 1, 2)]);
		assert!(matches!(forward, Err(RundownError::InvalidLink { .. })));

		let to_self = Rundown::from_entries(vec![OntimeEvent::new("a", 0, 1).linked_to("a").into()]);
		assert!(matches!(to_self, Err(RundownError::InvalidLink { .. })));
	}

	#[test]
	fn from_entries_rejects_links_to_markers() {
		let result = Rundown::from_entries(vec![OntimeBlock::new("blk", "Act 1").into(), OntimeEvent::new("a", 0, 1).linked_to("blk").into()]);
		assert!(matches!(result, Err(RundownError::InvalidLink { .. })));
	}

	#[test]
	fn implicit_link_anchors_to_previous_event() {
		let mut linked = OntimeEvent::new("b", 0, MINUTE_MS);
		linked.time_strategy = TimeStrategy::LinkStart;
		let rundown = Rundown::from_entries(vec![event("a", 0, MINUTE_MS), OntimeDelay::new("d", 0).into(), linked.into()]).unwrap();
		assert_eq!(rundown.get_event("b").unwrap().link_start.as_deref(), Some("a"));
	}

	#[test]
	fn insert_after_and_generated_ids() {
		let mut rundown = sample();
		let version = rundown.version();
		let inserted = rundown.insert(event("", 0, MINUTE_MS), Some("a")).unwrap().id().to_string();
		assert!(!inserted.is_empty());
		assert_eq!(rundown.position(&inserted), Some(1));
		assert_eq!(rundown.position("b"), Some(2));
		assert!(rundown.version() > version);

		assert!(matches!(rundown.insert(event("a", 0, 1), None), Err(RundownError::DuplicateId(_))));
		assert!(matches!(rundown.insert(event("z", 0, 1), Some("missing")), Err(RundownError::NotFound(_))));
	}

	#[test]
	fn removing_link_target_re_anchors_dependent() {
		let mut rundown = Rundown::from_entries(vec![
			event("a", 0, MINUTE_MS),
			event("b", MINUTE_MS, 2 * MINUTE_MS),
			OntimeEvent::new("c", 0, MINUTE_MS).linked_to("b").into(),
		])
		.unwrap();
		rundown.remove(["b"]).unwrap();
		assert_eq!(rundown.get_event("c").unwrap().link_start.as_deref(), Some("a"));

		rundown.remove(["a"]).unwrap();
		let c = rundown.get_event("c").unwrap();
		assert_eq!(c.link_start, None);
		assert_eq!(c.time_strategy, TimeStrategy::LockDuration);
	}

	#[test]
	fn remove_with_unknown_id_changes_nothing() {
		let mut rundown = sample();
		assert!(rundown.remove(["a", "nope"]).is_err());
		assert_eq!(rundown.len(), 3);
	}

	#[test]
	fn reorder_moving_target_after_dependent_re_anchors() {
		let mut rundown = sample();
		rundown.reorder("a", 0, 2).unwrap();
		let ids: Vec<&str> = rundown.iter().map(Entry::id).collect();
		assert_eq!(ids, ["b", "c", "a"]);
		let b = rundown.get_event("b").unwrap();
		assert_eq!(b.link_start, None);
		assert_eq!(b.time_strategy, TimeStrategy::LockDuration);

		assert!(rundown.reorder("a", 0, 1).is_err());
		assert!(rundown.reorder("a", 2, 9).is_err());
	}

	#[test]
	fn swap_exchanges_positions_and_keeps_slots() {
		let mut rundown = sample();
		rundown.swap("a", "c").unwrap();
		let ids: Vec<&str> = rundown.iter().map(Entry::id).collect();
		assert_eq!(ids, ["c", "b", "a"]);
		assert_eq!(rundown.get_event("c").unwrap().time_start, hms(9, 0, 0));
		assert_eq!(rundown.get_event("a").unwrap().time_start, hms(10, 0, 0));
		assert_eq!(rundown.get_event("b").unwrap().link_start.as_deref(), Some("c"));
	}

	#[test]
	fn patch_rejects_forward_link_and_keeps_event() {
		let mut rundown = sample();
		let patch = EventPatch {
			link_start: Some(Some("c".into())),
			..EventPatch::default()
		};
		assert!(matches!(rundown.patch_event("a", patch), Err(RundownError::InvalidLink { .. })));
		assert_eq!(rundown.get_event("a").unwrap().revision, 0);
	}

	#[test]
	fn patch_strategy_to_link_on_first_event_fails() {
		let mut rundown = sample();
		let patch = EventPatch {
			time_strategy: Some(TimeStrategy::LinkStart),
			..EventPatch::default()
		};
		assert!(rundown.patch_event("a", patch.clone()).is_err());
		let patched = rundown.patch_event("c", patch).unwrap();
		assert_eq!(patched.link_start.as_deref(), Some("b"));
	}

	#[test]
	fn apply_delay_shifts_everything_after_the_marker() {
		let mut rundown = Rundown::from_entries(vec![
			event("a", 0, MINUTE_MS),
			OntimeDelay::new("d", 5 * MINUTE_MS).into(),
			event("b", MINUTE_MS, 2 * MINUTE_MS),
			OntimeBlock::new("blk", "Part 2").into(),
			event("c", 2 * MINUTE_MS, 3 * MINUTE_MS),
		])
		.unwrap();
		let before = crate::resolver::resolve(rundown.entries());
		rundown.apply_delay("d").unwrap();
		assert!(rundown.get("d").is_none());
		assert_eq!(rundown.get_event("a").unwrap().time_start, 0);
		assert_eq!(rundown.get_event("b").unwrap().time_start, 6 * MINUTE_MS);
		assert_eq!(rundown.get_event("c").unwrap().time_start, 7 * MINUTE_MS);

		let after = crate::resolver::resolve(rundown.entries());
		assert_eq!(after.get("c").unwrap().time_start, before.get("c").unwrap().time_start);
		assert_eq!(after.total_delay(), 0);
		assert!(rundown.apply_delay("a").is_err());
	}

	#[test]
	fn apply_delay_locks_events_linked_across_the_marker() {
		let mut rundown = Rundown::from_entries(vec![
			event("a", hms(9, 0, 0), hms(9, 30, 0)),
			OntimeDelay::new("d", 5 * MINUTE_MS).into(),
			OntimeEvent::new("b", 0, 15 * MINUTE_MS).linked_to("a").into(),
			OntimeEvent::new("c", 0, 10 * MINUTE_MS).linked_to("b").into(),
		])
		.unwrap();
		rundown.apply_delay("d").unwrap();

		let b = rundown.get_event("b").unwrap();
		assert_eq!(b.time_strategy, TimeStrategy::LockDuration);
		assert_eq!(b.time_start, hms(9, 35, 0));
		assert_eq!(b.time_end, hms(9, 50, 0));
		assert_eq!(rundown.get_event("c").unwrap().link_start.as_deref(), Some("b"));

		let resolved = crate::resolver::resolve(rundown.entries());
		assert_eq!(resolved.get("b").unwrap().time_start, hms(9, 35, 0));
		assert_eq!(resolved.get("c").unwrap().time_start, hms(9, 50, 0));
	}

	#[test]
	fn lookups_by_cue_and_index() {
		let mut rundown = sample();
		rundown
			.patch_event(
				"c",
				EventPatch {
					cue: Some("3".into()),
					..EventPatch::default()
				},
			)
			.unwrap();
		assert_eq!(rundown.get_by_cue("3").unwrap().id, "c");
		assert_eq!(rundown.get_by_index(1).unwrap().id(), "b");
		assert!(rundown.get_by_cue("missing").is_none());
	}
}
