//! Static command table: name → payload shape + handler.
//!
//! Shapes normalise raw protocol arguments before a handler ever sees them, so handlers
//! only deal with typed payloads and every malformed argument is reported the same way.

use std::collections::HashMap;
use std::fmt;

use rundown::{in_time_range, parse_time, EntryId, TimeMs};
use serde_json::{Map, Value};

use crate::error::DispatchError;
use crate::origin::Origin;
use crate::playback::Target;
use crate::show::ShowState;

/// A command handler; runs inside the show actor with exclusive access to the show
pub type Handler = fn(&mut ShowState, Payload, Origin) -> Result<Value, DispatchError>;

/// Argument a handler receives after normalisation
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
	Empty,
	Target(Option<Target>),
	Milliseconds(TimeMs),
	Patch { id: EntryId, fields: Map<String, Value> },
}

/// Declared argument shape of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
	/// Arguments are ignored
	Empty,
	/// `null`, `"next"`, `"previous"`, or an object `{id}`, `{cue}`, `{index}`, `{next}`, `{previous}`
	Target { required: bool },
	/// A number or time string, or `{add: n}` / `{remove: n}`
	Milliseconds,
	/// `{ "<entry id>": { field: value, ... } }`
	Patch,
}

impl PayloadShape {
	pub fn normalize(self, command: &str, raw: Value) -> Result<Payload, DispatchError> {
		match self {
			Self::Empty => Ok(Payload::Empty),
			Self::Target { required } => {
				let target = parse_target(command, raw)?;
				if required && target.is_none() {
					return Err(DispatchError::invalid(command, "expected a target: id, cue, index, next or previous"));
				}
				Ok(Payload::Target(target))
			}
			Self::Milliseconds => parse_milliseconds(command, &raw).map(Payload::Milliseconds),
			Self::Patch => parse_patch(command, raw),
		}
	}
}

fn parse_target(command: &str, raw: Value) -> Result<Option<Target>, DispatchError> {
	match raw {
		Value::String(s) if s.eq_ignore_ascii_case("next") => Ok(Some(Target::Next)),
		Value::String(s) if s.eq_ignore_ascii_case("previous") => Ok(Some(Target::Previous)),
		Value::Object(object) => {
			let mut fields = object.into_iter();
			let Some((key, value)) = fields.next() else {
				return Ok(None);
			};
			if fields.next().is_some() {
				return Err(DispatchError::invalid(command, "a target takes exactly one key"));
			}
			let target = match key.as_str() {
				"id" => Target::Id(text(command, "id", &value)?),
				"cue" => Target::Cue(text(command, "cue", &value)?),
				"index" => Target::Index(index(command, &value)?),
				"next" => Target::Next,
				"previous" => Target::Previous,
				other => return Err(DispatchError::invalid(command, format!("unknown target {other}"))),
			};
			Ok(Some(target))
		}
		// button presses send bare scalars; they carry no target
		Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Array(_) => Ok(None),
	}
}

fn text(command: &str, key: &str, value: &Value) -> Result<String, DispatchError> {
	match value {
		Value::String(s) if !s.is_empty() => Ok(s.clone()),
		Value::Number(n) => Ok(n.to_string()),
		_ => Err(DispatchError::invalid(command, format!("{key} must be a non-empty string"))),
	}
}

fn index(command: &str, value: &Value) -> Result<usize, DispatchError> {
	let parsed = match value {
		Value::Number(n) => n.as_u64(),
		Value::String(s) => s.trim().parse::<u64>().ok(),
		_ => None,
	};
	parsed
		.and_then(|n| usize::try_from(n).ok())
		.ok_or_else(|| DispatchError::invalid(command, "index must be a non-negative integer"))
}

fn parse_milliseconds(command: &str, raw: &Value) -> Result<TimeMs, DispatchError> {
	let invalid = || DispatchError::invalid(command, "expected milliseconds, a time string, {add} or {remove}");
	match raw {
		Value::Number(n) => n
			.as_i64()
			.or_else(|| n.as_f64().filter(|f| f.is_finite()).map(round_millis))
			.filter(|ms| in_time_range(*ms))
			.ok_or_else(invalid),
		Value::String(s) => parse_time(s).ok_or_else(invalid),
		Value::Object(object) if object.len() == 1 => match object.iter().next() {
			Some((key, value)) if key == "add" => parse_milliseconds(command, value),
			Some((key, value)) if key == "remove" => parse_milliseconds(command, value).map(|ms| -ms),
			_ => Err(invalid()),
		},
		_ => Err(invalid()),
	}
}

#[allow(clippy::cast_possible_truncation)]
fn round_millis(value: f64) -> TimeMs {
	value.round() as TimeMs
}

fn parse_patch(command: &str, raw: Value) -> Result<Payload, DispatchError> {
	let Value::Object(object) = raw else {
		return Err(DispatchError::invalid(command, "expected { <id>: { <field>: <value> } }"));
	};
	if object.len() != 1 {
		return Err(DispatchError::invalid(command, "patch exactly one entry at a time"));
	}
	let Some((id, fields)) = object.into_iter().next() else {
		return Err(DispatchError::invalid(command, "missing entry id"));
	};
	match fields {
		Value::Object(fields) if !fields.is_empty() => Ok(Payload::Patch { id, fields }),
		_ => Err(DispatchError::invalid(command, format!("no fields to change on {id}"))),
	}
}

#[derive(Clone, Copy)]
pub struct CommandSpec {
	pub shape: PayloadShape,
	pub handler: Handler,
}

impl fmt::Debug for CommandSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CommandSpec").field("shape", &self.shape).finish_non_exhaustive()
	}
}

/// Maps command names to their specs; built once at startup
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
	commands: HashMap<&'static str, CommandSpec>,
}

impl CommandRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registry holding every built-in show command
	pub fn builtin() -> Self {
		let mut registry = Self::new();
		crate::commands::register_builtin(&mut registry);
		registry
	}

	pub fn register(&mut self, name: &'static str, shape: PayloadShape, handler: Handler) -> &mut Self {
		self.commands.insert(name, CommandSpec { shape, handler });
		self
	}

	pub fn get(&self, name: &str) -> Option<&CommandSpec> {
		self.commands.get(name)
	}

	pub fn is_registered(&self, name: &str) -> bool {
		self.commands.contains_key(name)
	}

	/// Registered names, sorted
	pub fn names(&self) -> Vec<&'static str> {
		let mut names: Vec<_> = self.commands.keys().copied().collect();
		names.sort_unstable();
		names
	}

	/// Look the command up and normalise its payload
	pub fn prepare(&self, name: &str, raw: Value) -> Result<(Handler, Payload), DispatchError> {
		let spec = self.get(name).ok_or_else(|| DispatchError::UnknownCommand(name.to_string()))?;
		let payload = spec.shape.normalize(name, raw)?;
		Ok((spec.handler, payload))
	}
}
