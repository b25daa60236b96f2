use clap::Parser;
use show_control::EngineConfig;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Config {
	/// Use JSON formatting for tracing
	#[arg(long, env = "LOG_JSON", default_value = "false")]
	pub log_json: bool,

	/// Log level
	#[arg(long, env = "RUST_LOG")]
	pub rust_log: Option<String>,

	/// Interface both listeners bind to
	#[arg(long, env = "HOST", default_value = "0.0.0.0")]
	pub host: String,

	/// HTTP port
	#[arg(long, env = "PORT", default_value = "4001")]
	pub port: u16,

	/// UDP port for /ontime/... messages
	#[arg(long, env = "OSC_PORT", default_value = "8888")]
	pub osc_port: u16,

	/// Listen for UDP messages
	#[arg(long, env = "OSC_ENABLED", default_value = "true", action = clap::ArgAction::Set)]
	pub osc_enabled: bool,

	/// Answer each UDP message with its reply
	#[arg(long, env = "OSC_FEEDBACK", default_value = "true", action = clap::ArgAction::Set)]
	pub osc_feedback: bool,

	/// Playback tick in milliseconds
	#[arg(long, env = "TICK_INTERVAL_MS", default_value = "32")]
	pub tick_interval_ms: u64,

	/// Project file loaded at startup and kept up to date
	#[arg(long, env = "PROJECT_FILE")]
	pub project_file: Option<PathBuf>,

	/// HTTP request timeout in milliseconds
	#[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "5000")]
	pub request_timeout_ms: u64,

	/// Upper bound on cleanup after ctrl-c
	#[arg(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value = "5")]
	pub shutdown_timeout_secs: u64,
}

impl Config {
	pub fn engine_config(&self) -> EngineConfig {
		EngineConfig::new().with_tick_interval(self.tick_interval_ms)
	}

	pub const fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.request_timeout_ms)
	}

	pub const fn shutdown_timeout(&self) -> Duration {
		Duration::from_secs(self.shutdown_timeout_secs)
	}
}
