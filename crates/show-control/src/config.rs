use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Show engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
	pub tick_interval_ms: u64,
	/// Commands waiting for the show actor before senders are held back
	pub command_capacity: usize,
	/// Rundown snapshots buffered for persistence; older ones are dropped when full
	pub snapshot_capacity: usize,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			tick_interval_ms: 32,
			command_capacity: 64,
			snapshot_capacity: 8,
		}
	}
}

impl EngineConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub const fn with_tick_interval(mut self, ms: u64) -> Self {
		self.tick_interval_ms = ms;
		self
	}

	pub const fn with_command_capacity(mut self, capacity: usize) -> Self {
		self.command_capacity = capacity;
		self
	}

	pub const fn with_snapshot_capacity(mut self, capacity: usize) -> Self {
		self.snapshot_capacity = capacity;
		self
	}

	pub fn tick_interval(&self) -> Duration {
		Duration::from_millis(self.tick_interval_ms.max(1))
	}
}
