use rundown::{in_time_range, parse_time, EventPatch};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::DispatchError;
use crate::origin::Origin;
use crate::playback::Target;
use crate::registry::{CommandRegistry, Payload, PayloadShape};
use crate::show::{RundownEdit, ShowState};

const TIME_FIELDS: [&str; 6] = ["timeStart", "timeEnd", "duration", "delay", "timeWarning", "timeDanger"];
const FLAG_FIELDS: [&str; 2] = ["isPublic", "skip"];
const TEXT_FIELDS: [&str; 4] = ["cue", "title", "note", "colour"];
const CHOICE_FIELDS: [&str; 4] = ["timeStrategy", "linkStart", "endAction", "timerType"];
const CUSTOM_PREFIX: &str = "custom:";

pub(crate) fn register_builtin(registry: &mut CommandRegistry) {
	registry
		.register("start", PayloadShape::Target { required: false }, start)
		.register("load", PayloadShape::Target { required: true }, load)
		.register("pause", PayloadShape::Empty, pause)
		.register("stop", PayloadShape::Empty, stop)
		.register("reload", PayloadShape::Empty, reload)
		.register("roll", PayloadShape::Empty, roll)
		.register("addtime", PayloadShape::Milliseconds, add_time)
		.register("change", PayloadShape::Patch, change)
		.register("poll", PayloadShape::Empty, poll)
		.register("version", PayloadShape::Empty, version);
}

fn mode_reply(show: &ShowState) -> Value {
	Value::from(show.engine().mode().as_str())
}

fn target_of(payload: Payload) -> Option<Target> {
	match payload {
		Payload::Target(target) => target,
		Payload::Empty | Payload::Milliseconds(_) | Payload::Patch { .. } => None,
	}
}

fn start(show: &mut ShowState, payload: Payload, _origin: Origin) -> Result<Value, DispatchError> {
	match target_of(payload) {
		Some(target) => show.with_playback(|engine, rundown, resolved, now| engine.start_target(&target, rundown, resolved, now))?,
		None => show.with_playback(|engine, _, _, now| engine.start(now))?,
	}
	Ok(mode_reply(show))
}

fn load(show: &mut ShowState, payload: Payload, _origin: Origin) -> Result<Value, DispatchError> {
	let target = target_of(payload).ok_or_else(|| DispatchError::invalid("load", "expected a target"))?;
	show.with_playback(|engine, rundown, resolved, now| engine.load(&target, rundown, resolved, now))?;
	Ok(mode_reply(show))
}

fn pause(show: &mut ShowState, _payload: Payload, _origin: Origin) -> Result<Value, DispatchError> {
	show.with_playback(|engine, _, _, now| engine.pause(now))?;
	Ok(mode_reply(show))
}

fn stop(show: &mut ShowState, _payload: Payload, _origin: Origin) -> Result<Value, DispatchError> {
	show.with_playback(|engine, _, _, now| engine.stop(now))?;
	Ok(mode_reply(show))
}

fn reload(show: &mut ShowState, _payload: Payload, _origin: Origin) -> Result<Value, DispatchError> {
	show.with_playback(|engine, rundown, resolved, now| engine.reload(rundown, resolved, now))?;
	Ok(mode_reply(show))
}

fn roll(show: &mut ShowState, _payload: Payload, _origin: Origin) -> Result<Value, DispatchError> {
	show.with_playback(|engine, rundown, resolved, now| engine.roll(rundown, resolved, now))?;
	Ok(mode_reply(show))
}

fn add_time(show: &mut ShowState, payload: Payload, _origin: Origin) -> Result<Value, DispatchError> {
	let Payload::Milliseconds(delta) = payload else {
		return Err(DispatchError::invalid("addtime", "expected milliseconds"));
	};
	show.with_playback(|engine, _, _, now| engine.add_time(delta, now))?;
	Ok(mode_reply(show))
}

fn change(show: &mut ShowState, payload: Payload, origin: Origin) -> Result<Value, DispatchError> {
	let Payload::Patch { id, fields } = payload else {
		return Err(DispatchError::invalid("change", "expected a patch"));
	};
	let patch = event_patch(fields)?;
	debug!(%id, %origin, "changing event");
	Ok(show.edit(RundownEdit::Patch { id, patch })?)
}

/// Advance timers to now, then report them
fn poll(show: &mut ShowState, _payload: Payload, _origin: Origin) -> Result<Value, DispatchError> {
	show.tick();
	serde_json::to_value(show.playback()).map_err(|e| DispatchError::Rundown(e.into()))
}

fn version(_show: &mut ShowState, _payload: Payload, _origin: Origin) -> Result<Value, DispatchError> {
	Ok(Value::from(env!("CARGO_PKG_VERSION")))
}

/// Coerce protocol field values into an `EventPatch`.
///
/// Time fields take milliseconds or time strings, flags take booleans, `"true"`/`"false"` or 0/1,
/// and `custom:<key>` sets a custom field.
fn event_patch(fields: Map<String, Value>) -> Result<EventPatch, DispatchError> {
	let mut coerced = Map::new();
	let mut custom = Map::new();

	for (key, value) in fields {
		if let Some(custom_key) = key.strip_prefix(CUSTOM_PREFIX) {
			custom.insert(custom_key.to_string(), Value::String(scalar_text(&key, value)?));
			continue;
		}
		let value = match key.as_str() {
			k if TIME_FIELDS.contains(&k) => Value::from(time_value(k, &value)?),
			k if FLAG_FIELDS.contains(&k) => Value::Bool(flag_value(k, &value)?),
			k if TEXT_FIELDS.contains(&k) => Value::String(scalar_text(k, value)?),
			k if CHOICE_FIELDS.contains(&k) => value,
			other => return Err(DispatchError::invalid("change", format!("unknown field {other}"))),
		};
		coerced.insert(key, value);
	}
	if !custom.is_empty() {
		coerced.insert("custom".to_string(), Value::Object(custom));
	}

	serde_json::from_value(Value::Object(coerced)).map_err(|e| DispatchError::invalid("change", e.to_string()))
}

fn time_value(key: &str, value: &Value) -> Result<i64, DispatchError> {
	let parsed = match value {
		Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round()).filter(|f| f.is_finite()).map(truncate)),
		Value::String(s) => parse_time(s),
		_ => None,
	};
	parsed.filter(|ms| in_time_range(*ms)).ok_or_else(|| DispatchError::invalid("change", format!("{key} expects milliseconds or a time string")))
}

#[allow(clippy::cast_possible_truncation)]
fn truncate(value: f64) -> i64 {
	value as i64
}

fn flag_value(key: &str, value: &Value) -> Result<bool, DispatchError> {
	let parsed = match value {
		Value::Bool(b) => Some(*b),
		Value::Number(n) => match n.as_i64() {
			Some(0) => Some(false),
			Some(1) => Some(true),
			_ => None,
		},
		Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
			"true" | "1" => Some(true),
			"false" | "0" => Some(false),
			_ => None,
		},
		_ => None,
	};
	parsed.ok_or_else(|| DispatchError::invalid("change", format!("{key} expects a boolean")))
}

fn scalar_text(key: &str, value: Value) -> Result<String, DispatchError> {
	match value {
		Value::String(s) => Ok(s),
		Value::Number(n) => Ok(n.to_string()),
		Value::Bool(b) => Ok(b.to_string()),
		Value::Null | Value::Array(_) | Value::Object(_) => Err(DispatchError::invalid("change", format!("{key} expects text"))),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rundown::{TimeStrategy, MINUTE_MS};
	use serde_json::json;

	fn fields(value: Value) -> Map<String, Value> {
		match value {
			Value::Object(map) => map,
			_ => panic!("expected an object"),
		}
	}

	#[test]
	fn coerces_protocol_strings() {
		let patch = event_patch(fields(json!({
			"duration": "00:10:00",
			"timeStart": 3_600_000,
			"skip": "true",
			"isPublic": 0,
			"cue": 12,
			"timeStrategy": "lock-end",
		})))
		.unwrap();

		assert_eq!(patch.duration, Some(10 * MINUTE_MS));
		assert_eq!(patch.time_start, Some(3_600_000));
		assert_eq!(patch.skip, Some(true));
		assert_eq!(patch.is_public, Some(false));
		assert_eq!(patch.cue.as_deref(), Some("12"));
		assert_eq!(patch.time_strategy, Some(TimeStrategy::LockEnd));
	}

	#[test]
	fn custom_fields_collect_into_one_map() {
		let patch = event_patch(fields(json!({ "custom:lighting": "warm", "custom:sound": 3 }))).unwrap();
		let custom = patch.custom.unwrap();
		assert_eq!(custom["lighting"], "warm");
		assert_eq!(custom["sound"], "3");
	}

	#[test]
	fn rejects_unknown_and_malformed_fields() {
		assert!(event_patch(fields(json!({ "volume": 11 }))).is_err());
		assert!(event_patch(fields(json!({ "duration": "soon" }))).is_err());
		assert!(event_patch(fields(json!({ "skip": "maybe" }))).is_err());
		assert!(event_patch(fields(json!({ "endAction": "explode" }))).is_err());
		assert!(event_patch(fields(json!({ "timeStart": i64::MAX }))).is_err());
		assert!(event_patch(fields(json!({ "duration": -1e19 }))).is_err());
	}

	#[test]
	fn link_start_null_clears() {
		let patch = event_patch(fields(json!({ "linkStart": null }))).unwrap();
		assert_eq!(patch.link_start, Some(None));
	}
}
