//! UDP adapter for `/ontime/...` messages.
//!
//! Each datagram carries one OSC message; its address goes through the message-path grammar and its
//! first argument becomes the payload leaf. With feedback on, a successful reply goes back to the
//! sender under the same address; failures are only logged.

use std::net::SocketAddr;

use rosc::{OscMessage, OscPacket, OscType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use show_control::{parse_message_path, Dispatcher, LogOrigin, Origin};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{metrics, Config};

/// Largest UDP payload over IPv4
const MAX_DATAGRAM: usize = 65_507;

/// Lowest port the listener may move to at runtime
const MIN_PORT: u16 = 1024;

/// Listener settings, changeable while the server runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OscSettings {
	pub port_in: u16,
	pub enabled_in: bool,
	pub feedback: bool,
}

impl OscSettings {
	pub const fn from_config(config: &Config) -> Self {
		Self {
			port_in: config.osc_port,
			enabled_in: config.osc_enabled,
			feedback: config.osc_feedback,
		}
	}

	/// The port must be unprivileged and must not collide with the HTTP listener
	pub fn validate(&self, http_port: u16) -> Result<(), String> {
		if self.port_in < MIN_PORT {
			return Err(format!("portIn must be at least {MIN_PORT}"));
		}
		if self.port_in == http_port {
			return Err(format!("portIn {} is taken by the HTTP server", self.port_in));
		}
		Ok(())
	}
}

/// Run the listener the current settings describe, restarting it whenever they change
pub async fn supervise(host: String, dispatcher: Dispatcher, mut settings: watch::Receiver<OscSettings>, cancel: CancellationToken) {
	loop {
		let current = *settings.borrow_and_update();
		let listener_cancel = cancel.child_token();

		let listener = if current.enabled_in {
			match UdpSocket::bind((host.as_str(), current.port_in)).await {
				Ok(socket) => Some(tokio::spawn(serve(socket, dispatcher.clone(), current.feedback, listener_cancel.clone()))),
				Err(e) => {
					error!(origin = %LogOrigin::Server, port = current.port_in, error = %e, "failed to bind OSC port");
					None
				}
			}
		} else {
			info!(origin = %LogOrigin::Server, "OSC disabled");
			None
		};

		let changed = tokio::select! {
			() = cancel.cancelled() => false,
			changed = settings.changed() => changed.is_ok(),
		};
		listener_cancel.cancel();
		if let Some(task) = listener {
			task.await.ok();
		}
		if !changed {
			break;
		}
		info!(origin = %LogOrigin::Server, "OSC settings changed, restarting listener");
	}
}

/// Receive, dispatch and answer until cancelled
pub async fn serve(socket: UdpSocket, dispatcher: Dispatcher, feedback: bool, cancel: CancellationToken) {
	let mut buf = vec![0_u8; MAX_DATAGRAM];
	if let Ok(addr) = socket.local_addr() {
		info!(origin = %LogOrigin::Server, %addr, feedback, "listening for OSC");
	}

	loop {
		tokio::select! {
			() = cancel.cancelled() => {
				info!(origin = %LogOrigin::Server, "OSC listener stopped");
				break;
			}

			received = socket.recv_from(&mut buf) => match received {
				Ok((len, peer)) => {
					let Some((address, arg)) = decode_message(&buf[..len]) else {
						continue;
					};
					let Some(reply) = handle(&dispatcher, &address, arg).await else {
						continue;
					};
					if feedback {
						send_reply(&socket, reply, peer).await;
					}
				}
				Err(e) => error!(origin = %LogOrigin::Rx, error = %e, "failed to receive datagram"),
			}
		}
	}
}

/// Address and first argument of a single message; bundles and garbage yield nothing
pub fn decode_message(bytes: &[u8]) -> Option<(String, Value)> {
	match rosc::decoder::decode_udp(bytes) {
		Ok((_, OscPacket::Message(message))) => {
			let arg = message.args.first().map_or(Value::Null, arg_to_value);
			Some((message.addr, arg))
		}
		Ok((_, OscPacket::Bundle(_))) => {
			debug!(origin = %LogOrigin::Rx, "ignoring OSC bundle");
			None
		}
		Err(e) => {
			warn!(origin = %LogOrigin::Rx, error = ?e, "dropping undecodable packet");
			None
		}
	}
}

async fn handle(dispatcher: &Dispatcher, address: &str, arg: Value) -> Option<OscMessage> {
	let parsed = match parse_message_path(address, arg) {
		Ok(parsed) => parsed,
		Err(e) => {
			warn!(origin = %LogOrigin::Rx, %address, error = %e, "rejected message");
			return None;
		}
	};

	let result = dispatcher.try_dispatch(&parsed.command, parsed.payload, Origin::Osc).await;
	metrics::record_command(&parsed.command, Origin::Osc, &result);

	match result {
		Ok(payload) => Some(OscMessage {
			addr: address.to_string(),
			args: vec![reply_arg(&payload)],
		}),
		Err(e) => {
			warn!(origin = %LogOrigin::Rx, %address, error = %e, "command failed");
			None
		}
	}
}

async fn send_reply(socket: &UdpSocket, reply: OscMessage, peer: SocketAddr) {
	let bytes = match rosc::encoder::encode(&OscPacket::Message(reply)) {
		Ok(bytes) => bytes,
		Err(e) => {
			error!(origin = %LogOrigin::Tx, error = ?e, "failed to encode reply");
			return;
		}
	};
	if let Err(e) = socket.send_to(&bytes, peer).await {
		error!(origin = %LogOrigin::Tx, %peer, error = %e, "failed to send reply");
	}
}

pub fn arg_to_value(arg: &OscType) -> Value {
	match arg {
		OscType::Int(i) => Value::from(*i),
		OscType::Long(l) => Value::from(*l),
		OscType::Float(f) => float_value(f64::from(*f)),
		OscType::Double(d) => float_value(*d),
		OscType::String(s) => Value::String(s.clone()),
		OscType::Char(c) => Value::String(c.to_string()),
		OscType::Bool(b) => Value::Bool(*b),
		_ => Value::Null,
	}
}

/// Whole floats become integers so `index 2.0` still names an index
#[allow(clippy::cast_possible_truncation)]
fn float_value(value: f64) -> Value {
	if value.fract().abs() < f64::EPSILON && value.abs() < 9.0e15 {
		Value::from(value as i64)
	} else {
		Value::from(value)
	}
}

pub fn reply_arg(value: &Value) -> OscType {
	match value {
		Value::Null => OscType::Nil,
		Value::Bool(b) => OscType::Bool(*b),
		Value::Number(n) => {
			if let Some(i) = n.as_i64() {
				i32::try_from(i).map_or(OscType::Long(i), OscType::Int)
			} else {
				OscType::Double(n.as_f64().unwrap_or_default())
			}
		}
		Value::String(s) => OscType::String(s.clone()),
		Value::Array(_) | Value::Object(_) => OscType::String(value.to_string()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rosc::{OscBundle, OscTime};
	use serde_json::json;

	fn encode(addr: &str, args: Vec<OscType>) -> Vec<u8> {
		rosc::encoder::encode(&OscPacket::Message(OscMessage { addr: addr.to_string(), args })).unwrap()
	}

	#[test]
	fn decodes_address_and_first_argument() {
		let (address, arg) = decode_message(&encode("/ontime/load/id", vec![OscType::String("abc".into()), OscType::Int(9)])).unwrap();
		assert_eq!(address, "/ontime/load/id");
		assert_eq!(arg, json!("abc"));

		let (_, arg) = decode_message(&encode("/ontime/start", vec![])).unwrap();
		assert_eq!(arg, Value::Null);
	}

	#[test]
	fn bundles_and_garbage_are_dropped() {
		let bundle = OscPacket::Bundle(OscBundle {
			timetag: OscTime { seconds: 0, fractional: 1 },
			content: vec![],
		});
		assert!(decode_message(&rosc::encoder::encode(&bundle).unwrap()).is_none());
		assert!(decode_message(b"not osc at all").is_none());
	}

	#[test]
	fn whole_floats_become_integers() {
		assert_eq!(arg_to_value(&OscType::Float(2.0)), json!(2));
		assert_eq!(arg_to_value(&OscType::Double(1.5)), json!(1.5));
		assert_eq!(arg_to_value(&OscType::Long(90_000)), json!(90_000));
	}

	#[tokio::test]
	async fn only_successful_commands_are_answered() {
		use rundown::{CustomFields, ProjectData, Rundown};
		use show_control::{EngineConfig, ManualClock, ShowControl, ShowState};
		use std::sync::Arc;

		let show = ShowState::new(ProjectData::default(), Rundown::new(), CustomFields::new(), Arc::new(ManualClock::new(0)));
		let control = ShowControl::spawn(show, EngineConfig::default(), None, &CancellationToken::new());
		let dispatcher = control.dispatcher();

		assert!(handle(&dispatcher, "/ontime/start", Value::Null).await.is_none());
		assert!(handle(&dispatcher, "/ontime/bogus", Value::Null).await.is_none());
		assert!(handle(&dispatcher, "/elsewhere/start", Value::Null).await.is_none());

		let reply = handle(&dispatcher, "/ontime/version", Value::Null).await.unwrap();
		assert_eq!(reply.addr, "/ontime/version");
		assert_eq!(reply.args, vec![OscType::String(env!("CARGO_PKG_VERSION").into())]);

		control.shutdown().await;
	}

	#[test]
	fn settings_reject_privileged_and_taken_ports() {
		let settings = OscSettings {
			port_in: 8888,
			enabled_in: true,
			feedback: false,
		};
		assert!(settings.validate(4001).is_ok());
		assert!(OscSettings { port_in: 80, ..settings }.validate(4001).is_err());
		assert!(OscSettings { port_in: 4001, ..settings }.validate(4001).is_err());
	}

	#[tokio::test]
	async fn supervisor_rebinds_when_settings_change() {
		use rundown::{CustomFields, ProjectData, Rundown};
		use show_control::{EngineConfig, ManualClock, ShowControl, ShowState};
		use std::sync::Arc;
		use std::time::Duration;

		let show = ShowState::new(ProjectData::default(), Rundown::new(), CustomFields::new(), Arc::new(ManualClock::new(0)));
		let control = ShowControl::spawn(show, EngineConfig::default(), None, &CancellationToken::new());

		// grab a free port, then let the supervisor take it over
		let port = UdpSocket::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap().port();
		let (settings_tx, settings_rx) = watch::channel(OscSettings {
			port_in: port,
			enabled_in: false,
			feedback: true,
		});
		let cancel = CancellationToken::new();
		let task = tokio::spawn(supervise("127.0.0.1".into(), control.dispatcher(), settings_rx, cancel.clone()));

		settings_tx.send_modify(|settings| settings.enabled_in = true);
		let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
		let mut buf = vec![0_u8; MAX_DATAGRAM];
		let mut answered = None;
		for _ in 0..50 {
			client.send_to(&encode("/ontime/version", vec![]), ("127.0.0.1", port)).await.unwrap();
			if let Ok(Ok((len, _))) = tokio::time::timeout(Duration::from_millis(100), client.recv_from(&mut buf)).await {
				answered = decode_message(&buf[..len]);
				break;
			}
		}
		let (address, arg) = answered.unwrap();
		assert_eq!(address, "/ontime/version");
		assert_eq!(arg, json!(env!("CARGO_PKG_VERSION")));

		cancel.cancel();
		task.await.unwrap();
		control.shutdown().await;
	}

	#[test]
	fn replies_pick_the_narrowest_type() {
		assert_eq!(reply_arg(&json!(5)), OscType::Int(5));
		assert_eq!(reply_arg(&json!(5_000_000_000_i64)), OscType::Long(5_000_000_000));
		assert_eq!(reply_arg(&json!("play")), OscType::String("play".into()));
		assert_eq!(reply_arg(&Value::Null), OscType::Nil);
		assert_eq!(reply_arg(&json!({ "a": 1 })), OscType::String(r#"{"a":1}"#.into()));
	}
}
