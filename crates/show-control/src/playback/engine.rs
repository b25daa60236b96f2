use rundown::{in_time_range, EndAction, EntryId, OntimeEvent, ResolvedRundown, ResolvedTiming, Rundown, TimeMs, TimerType, DAY_MS};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::report::{EventReport, PlaybackReport};
use super::target::{next_eligible, Target};
use super::{transition, Phase, Playback, PlaybackCommand, PlaybackState};
use crate::error::{PlaybackError, Result};
use crate::origin::LogOrigin;

/// Snapshot of the loaded event's settings, taken from its resolved schedule
#[derive(Debug, Clone)]
struct Loaded {
	id: EntryId,
	timer_type: TimerType,
	end_action: EndAction,
	time_warning: TimeMs,
	time_danger: TimeMs,
	time_end: TimeMs,
	duration: TimeMs,
}

impl Loaded {
	fn new(event: &OntimeEvent, timing: &ResolvedTiming) -> Self {
		Self {
			id: event.id.clone(),
			timer_type: event.timer_type,
			end_action: event.end_action,
			time_warning: event.time_warning,
			time_danger: event.time_danger,
			time_end: timing.time_end,
			duration: timing.duration,
		}
	}

	fn resolve(event: &OntimeEvent, resolved: &ResolvedRundown) -> Result<Self> {
		let timing = resolved.get(&event.id).ok_or_else(|| PlaybackError::EntryNotFound(event.id.clone()))?;
		Ok(Self::new(event, timing))
	}
}

/// End action evaluated on a zero crossing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndActionTaken {
	pub entry_id: EntryId,
	pub action: EndAction,
}

/// Playback state machine.
///
/// Timer values are always derived from absolute `started_at` / `expected_finish`, so a late
/// tick computes the same value an on-time tick would have.
#[derive(Debug, Default)]
pub struct PlaybackEngine {
	mode: Playback,
	loaded: Option<Loaded>,
	next_id: Option<EntryId>,
	added_time: TimeMs,
	started_at: Option<TimeMs>,
	expected_finish: Option<TimeMs>,
	// frozen values while armed or paused
	remaining: TimeMs,
	elapsed: TimeMs,
	finished_at: Option<TimeMs>,
	crossing_handled: bool,
	roll_gap: Option<TimeMs>,
	state: PlaybackState,
	report: PlaybackReport,
	// event whose report is still open
	reporting: Option<EntryId>,
}

impl PlaybackEngine {
	pub fn new() -> Self {
		Self::default()
	}

	pub const fn mode(&self) -> Playback {
		self.mode
	}

	pub const fn state(&self) -> &PlaybackState {
		&self.state
	}

	pub fn selected(&self) -> Option<&str> {
		self.loaded.as_ref().map(|loaded| loaded.id.as_str())
	}

	pub const fn report(&self) -> &PlaybackReport {
		&self.report
	}

	/// Drop one event's report, or all of them
	pub fn clear_report(&mut self, id: Option<&str>) {
		match id {
			Some(id) => {
				self.report.remove(id);
			}
			None => self.report.clear(),
		}
	}

	/// Arm the targeted event
	pub fn load(&mut self, target: &Target, rundown: &Rundown, resolved: &ResolvedRundown, now: TimeMs) -> Result<()> {
		let next_mode = transition(self.mode, &PlaybackCommand::Load)?;
		let event = target.locate(rundown, self.selected())?;
		let loaded = Loaded::resolve(event, resolved)?;

		info!(origin = %LogOrigin::Playback, id = %loaded.id, "loaded event");
		self.close_report(now);
		self.arm(loaded, rundown);
		self.mode = next_mode;
		self.refresh(now);
		Ok(())
	}

	/// Start or resume the loaded event
	pub fn start(&mut self, now: TimeMs) -> Result<()> {
		let next_mode = transition(self.mode, &PlaybackCommand::Start)?;
		if self.mode == Playback::Play {
			return Ok(());
		}
		let loaded = self.loaded.as_ref().ok_or(PlaybackError::NothingLoaded)?;

		self.started_at = Some(now - self.elapsed);
		self.expected_finish = Some(match loaded.timer_type {
			TimerType::TimeToEnd => scheduled_finish(loaded.time_end, now) + self.added_time,
			TimerType::CountDown | TimerType::CountUp | TimerType::Clock => now + self.remaining,
		});
		info!(origin = %LogOrigin::Playback, id = %loaded.id, from = %self.mode, "playback started");
		if self.mode == Playback::Armed {
			self.report.insert(loaded.id.clone(), EventReport::started(now));
			self.reporting = Some(loaded.id.clone());
		}
		self.mode = next_mode;
		self.refresh(now);
		Ok(())
	}

	/// Load the target, then start it
	pub fn start_target(&mut self, target: &Target, rundown: &Rundown, resolved: &ResolvedRundown, now: TimeMs) -> Result<()> {
		self.load(target, rundown, resolved, now)?;
		self.start(now)
	}

	pub fn pause(&mut self, now: TimeMs) -> Result<()> {
		let next_mode = transition(self.mode, &PlaybackCommand::Pause)?;
		if self.mode == Playback::Pause {
			return Ok(());
		}
		if let (Some(finish), Some(started)) = (self.expected_finish.take(), self.started_at.take()) {
			self.remaining = finish - now;
			self.elapsed = now - started;
		}
		info!(origin = %LogOrigin::Playback, remaining = self.remaining, "playback paused");
		self.mode = next_mode;
		self.refresh(now);
		Ok(())
	}

	/// Stop and clear the selection; any pending end action is dropped with it
	pub fn stop(&mut self, now: TimeMs) -> Result<()> {
		let next_mode = transition(self.mode, &PlaybackCommand::Stop)?;
		if self.mode != Playback::Stop {
			info!(origin = %LogOrigin::Playback, from = %self.mode, "playback stopped");
		}
		self.close_report(now);
		self.clear();
		self.mode = next_mode;
		self.refresh(now);
		Ok(())
	}

	/// Re-arm the loaded event from the top
	pub fn reload(&mut self, rundown: &Rundown, resolved: &ResolvedRundown, now: TimeMs) -> Result<()> {
		transition(self.mode, &PlaybackCommand::Reload)?;
		let id = self.selected().ok_or(PlaybackError::NothingLoaded)?.to_string();
		self.load(&Target::Id(id), rundown, resolved, now)
	}

	/// Follow the wall clock against the resolved schedule
	pub fn roll(&mut self, rundown: &Rundown, resolved: &ResolvedRundown, now: TimeMs) -> Result<()> {
		let next_mode = transition(self.mode, &PlaybackCommand::Roll)?;
		if next_eligible(rundown, None).is_none() {
			return Err(PlaybackError::NoEligibleEntry);
		}
		self.close_report(now);
		self.clear();
		self.mode = next_mode;
		self.follow_schedule(rundown, resolved, now);
		info!(origin = %LogOrigin::Playback, selected = ?self.selected(), "roll mode");
		self.refresh(now);
		Ok(())
	}

	/// Shift the expected finish; negative values take time away. Nothing changes when the
	/// result would leave the time range.
	pub fn add_time(&mut self, delta: TimeMs, now: TimeMs) -> Result<()> {
		transition(self.mode, &PlaybackCommand::AddTime)?;
		let out_of_range = || PlaybackError::TimeOutOfRange(delta);
		let added_time = self.added_time.checked_add(delta).filter(|added| in_time_range(*added)).ok_or_else(out_of_range)?;
		let remaining = match self.expected_finish {
			Some(finish) => {
				let finish = finish.checked_add(delta).ok_or_else(out_of_range)?;
				self.expected_finish = Some(finish);
				finish - now
			}
			None => {
				self.remaining = self.remaining.checked_add(delta).ok_or_else(out_of_range)?;
				self.remaining
			}
		};
		self.added_time = added_time;
		if remaining > 0 && self.crossing_handled {
			debug!("added time re-armed the end action");
			self.crossing_handled = false;
			self.finished_at = None;
		}
		info!(origin = %LogOrigin::Playback, delta, added = self.added_time, "time added");
		self.refresh(now);
		Ok(())
	}

	/// Advance timers; evaluates the end action at most once per crossing
	pub fn tick(&mut self, rundown: &Rundown, resolved: &ResolvedRundown, now: TimeMs) -> Option<EndActionTaken> {
		match self.mode {
			Playback::Roll => {
				if !self.follow_schedule(rundown, resolved, now) {
					warn!(origin = %LogOrigin::Playback, "nothing left to roll, stopping");
					self.clear();
					self.mode = Playback::Stop;
				}
			}
			Playback::Play => {
				let remaining = self.expected_finish.map_or(0, |finish| finish - now);
				if remaining <= 0 && !self.crossing_handled {
					if let Some(loaded) = self.loaded.clone() {
						self.crossing_handled = true;
						self.finished_at = Some(now);
						self.run_end_action(&loaded, rundown, resolved, now);
						self.refresh(now);
						return Some(EndActionTaken {
							entry_id: loaded.id,
							action: loaded.end_action,
						});
					}
				}
			}
			Playback::Stop | Playback::Armed | Playback::Pause => {}
		}
		self.refresh(now);
		None
	}

	/// Re-read the loaded event after a rundown edit; stops when it was removed
	pub fn on_rundown_changed(&mut self, rundown: &Rundown, resolved: &ResolvedRundown, now: TimeMs) {
		match self.mode {
			Playback::Stop => {}
			Playback::Roll => {
				if !self.follow_schedule(rundown, resolved, now) {
					self.clear();
					self.mode = Playback::Stop;
				}
			}
			Playback::Armed | Playback::Play | Playback::Pause => {
				let refreshed = self
					.selected()
					.and_then(|id| rundown.get_event(id))
					.and_then(|event| resolved.get(&event.id).map(|timing| Loaded::new(event, timing)));
				let Some(loaded) = refreshed else {
					info!(origin = %LogOrigin::Playback, "loaded event left the rundown, stopping");
					self.close_report(now);
					self.clear();
					self.mode = Playback::Stop;
					self.refresh(now);
					return;
				};

				let total = loaded.duration + self.added_time;
				let remaining = match (self.started_at, self.expected_finish.as_mut()) {
					(Some(started), Some(finish)) => {
						*finish = match loaded.timer_type {
							TimerType::TimeToEnd => scheduled_finish(loaded.time_end, now) + self.added_time,
							TimerType::CountDown | TimerType::CountUp | TimerType::Clock => started + total,
						};
						*finish - now
					}
					_ => {
						self.remaining = total - self.elapsed;
						self.remaining
					}
				};
				if remaining > 0 {
					self.crossing_handled = false;
					self.finished_at = None;
				}
				self.next_id = next_eligible(rundown, Some(&loaded.id)).map(|event| event.id.clone());
				self.loaded = Some(loaded);
			}
		}
		self.refresh(now);
	}

	fn arm(&mut self, loaded: Loaded, rundown: &Rundown) {
		self.next_id = next_eligible(rundown, Some(&loaded.id)).map(|event| event.id.clone());
		self.remaining = loaded.duration;
		self.elapsed = 0;
		self.added_time = 0;
		self.started_at = None;
		self.expected_finish = None;
		self.finished_at = None;
		self.crossing_handled = false;
		self.roll_gap = None;
		self.loaded = Some(loaded);
	}

	fn clear(&mut self) {
		self.loaded = None;
		self.next_id = None;
		self.remaining = 0;
		self.elapsed = 0;
		self.added_time = 0;
		self.started_at = None;
		self.expected_finish = None;
		self.finished_at = None;
		self.crossing_handled = false;
		self.roll_gap = None;
	}

	/// Close the open report against the loaded event's schedule
	fn close_report(&mut self, now: TimeMs) {
		let Some(id) = self.reporting.take() else {
			return;
		};
		let planned = self.loaded.as_ref().filter(|loaded| loaded.id == id).map_or(0, |loaded| loaded.duration);
		if let Some(entry) = self.report.get_mut(&id) {
			entry.finish(now, planned);
			debug!(origin = %LogOrigin::Playback, %id, over_under = ?entry.over_under, "event report closed");
		}
	}

	fn run_end_action(&mut self, loaded: &Loaded, rundown: &Rundown, resolved: &ResolvedRundown, now: TimeMs) {
		info!(origin = %LogOrigin::Playback, id = %loaded.id, action = %loaded.end_action, "timer finished");
		let result = match loaded.end_action {
			EndAction::None => Ok(()),
			EndAction::Stop => self.stop(now),
			EndAction::LoadNext | EndAction::PlayNext => match next_eligible(rundown, Some(&loaded.id)) {
				None => {
					debug!("no event after {}, staying in overtime", loaded.id);
					Ok(())
				}
				Some(next) => {
					let target = Target::Id(next.id.clone());
					if loaded.end_action == EndAction::PlayNext {
						self.start_target(&target, rundown, resolved, now)
					} else {
						self.load(&target, rundown, resolved, now)
					}
				}
			},
		};
		if let Err(e) = result {
			warn!(origin = %LogOrigin::Playback, id = %loaded.id, "end action failed: {}", e);
		}
	}

	/// Select what the schedule says should be running now; false when nothing is eligible
	fn follow_schedule(&mut self, rundown: &Rundown, resolved: &ResolvedRundown, now: TimeMs) -> bool {
		let time_of_day = now.rem_euclid(DAY_MS);
		let eligible = move || {
			rundown
				.events()
				.filter(|event| !event.skip)
				.filter_map(move |event| resolved.get(&event.id).map(|timing| (event, timing)))
		};

		let active = eligible().find_map(|(event, timing)| {
			let into = (time_of_day - timing.time_start).rem_euclid(DAY_MS);
			(into < timing.duration).then_some((event, timing, into))
		});

		if let Some((event, timing, into)) = active {
			let loaded = Loaded::new(event, timing);
			if self.selected() != Some(loaded.id.as_str()) {
				debug!(origin = %LogOrigin::Playback, id = %loaded.id, "roll entered event");
			}
			let started = now - into;
			self.started_at = Some(started);
			self.expected_finish = Some(started + loaded.duration);
			self.roll_gap = None;
			self.next_id = next_eligible(rundown, Some(&loaded.id)).map(|event| event.id.clone());
			self.loaded = Some(loaded);
			return true;
		}

		let upcoming = eligible().min_by_key(|(_, timing)| (timing.time_start - time_of_day).rem_euclid(DAY_MS));
		let Some((event, timing)) = upcoming else {
			return false;
		};
		let loaded = Loaded::new(event, timing);
		self.started_at = None;
		self.expected_finish = None;
		self.remaining = loaded.duration;
		self.elapsed = 0;
		self.roll_gap = Some((timing.time_start - time_of_day).rem_euclid(DAY_MS));
		self.next_id = Some(loaded.id.clone());
		self.loaded = Some(loaded);
		true
	}

	/// Recompute the published state from the absolute timestamps
	fn refresh(&mut self, now: TimeMs) {
		let Some(loaded) = &self.loaded else {
			self.state = PlaybackState {
				playback: self.mode,
				clock: now,
				..PlaybackState::default()
			};
			return;
		};

		let (remaining, elapsed) = match (self.expected_finish, self.started_at) {
			(Some(finish), Some(started)) => (finish - now, now - started),
			_ => (self.remaining, self.elapsed),
		};
		let current = match loaded.timer_type {
			TimerType::CountDown => remaining,
			TimerType::TimeToEnd if self.mode == Playback::Armed => scheduled_finish(loaded.time_end, now) + self.added_time - now,
			TimerType::TimeToEnd => remaining,
			TimerType::CountUp => elapsed,
			TimerType::Clock => now.rem_euclid(DAY_MS),
		};
		let secondary = self.roll_gap.or_else(|| (remaining < 0).then_some(-remaining));
		let phase = if self.roll_gap.is_some() {
			Phase::Default
		} else {
			Phase::from_remaining(remaining, loaded.time_warning, loaded.time_danger)
		};

		self.state = PlaybackState {
			playback: self.mode,
			selected_entry_id: Some(loaded.id.clone()),
			next_entry_id: self.next_id.clone(),
			timer_type: loaded.timer_type,
			current_timer_value: Some(current),
			secondary_timer_value: secondary,
			duration: Some(loaded.duration),
			elapsed: Some(elapsed),
			started_at: self.started_at,
			finished_at: self.finished_at,
			expected_finish: self.expected_finish,
			added_time: self.added_time,
			phase,
			clock: now,
		};
	}
}

/// Absolute time of a day-offset end on the show day nearest to `now`
const fn scheduled_finish(time_end: TimeMs, now: TimeMs) -> TimeMs {
	let mut offset = (time_end - now).rem_euclid(DAY_MS);
	if offset > DAY_MS / 2 {
		offset -= DAY_MS;
	}
	now + offset
}
