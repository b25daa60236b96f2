use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag carried on log lines as the `origin` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOrigin {
	/// Inbound protocol traffic
	Rx,
	/// Outbound protocol traffic
	Tx,
	Server,
	Playback,
	User,
}

impl fmt::Display for LogOrigin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let tag = match self {
			Self::Rx => "rx",
			Self::Tx => "tx",
			Self::Server => "server",
			Self::Playback => "playback",
			Self::User => "user",
		};
		f.write_str(tag)
	}
}

/// Which adapter delivered a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
	Osc,
	Http,
	Internal,
}

impl Origin {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Osc => "osc",
			Self::Http => "http",
			Self::Internal => "internal",
		}
	}
}

impl fmt::Display for Origin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
