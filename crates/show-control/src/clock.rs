use chrono::Timelike;
use rundown::TimeMs;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

/// Source of "now" for the playback engine, in ms from the logical day start
pub trait Clock: Send + Sync + fmt::Debug {
	fn now(&self) -> TimeMs;
}

/// Wall clock anchored to local midnight when created; keeps counting past 24h
#[derive(Debug)]
pub struct SystemClock {
	anchor: Instant,
	offset: TimeMs,
}

impl SystemClock {
	pub fn new() -> Self {
		let time = chrono::Local::now().time();
		let millis = i64::from(time.num_seconds_from_midnight()) * 1_000 + i64::from(time.nanosecond().min(999_999_999) / 1_000_000);
		Self {
			anchor: Instant::now(),
			offset: millis,
		}
	}
}

impl Default for SystemClock {
	fn default() -> Self {
		Self::new()
	}
}

impl Clock for SystemClock {
	fn now(&self) -> TimeMs {
		let elapsed = TimeMs::try_from(self.anchor.elapsed().as_millis()).unwrap_or(TimeMs::MAX - self.offset);
		self.offset + elapsed
	}
}

/// Clock moved by hand, for tests and simulations
#[derive(Debug, Default)]
pub struct ManualClock {
	now: AtomicI64,
}

impl ManualClock {
	pub const fn new(start: TimeMs) -> Self {
		Self { now: AtomicI64::new(start) }
	}

	pub fn set(&self, now: TimeMs) {
		self.now.store(now, Ordering::SeqCst);
	}

	pub fn advance(&self, by: TimeMs) {
		self.now.fetch_add(by, Ordering::SeqCst);
	}
}

impl Clock for ManualClock {
	fn now(&self) -> TimeMs {
		self.now.load(Ordering::SeqCst)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rundown::DAY_MS;

	#[test]
	fn manual_clock_moves_only_when_told() {
		let clock = ManualClock::new(1_000);
		assert_eq!(clock.now(), 1_000);
		clock.advance(500);
		assert_eq!(clock.now(), 1_500);
		clock.set(10);
		assert_eq!(clock.now(), 10);
	}

	#[test]
	fn system_clock_starts_within_the_day() {
		let clock = SystemClock::new();
		let now = clock.now();
		assert!((0..DAY_MS + 1_000).contains(&now));
	}
}
