use crate::error::PathError;
use serde_json::{Map, Value};
use tracing::debug;

/// Leading segment every message path must carry
pub const NAMESPACE: &str = "ontime";

/// A message path split into its command and folded payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
	pub command: String,
	pub payload: Value,
}

/// Parse `/ontime/{command}/{param...}` with its first argument.
///
/// Trailing segments nest the argument: `/ontime/change/e1/title "x"` → `{"e1":{"title":"x"}}`.
/// Empty segments are ignored.
pub fn parse_message_path(address: &str, first_arg: Value) -> Result<ParsedMessage, PathError> {
	let mut segments = address.split('/').filter(|segment| !segment.is_empty());

	if segments.next() != Some(NAMESPACE) {
		return Err(PathError::WrongNamespace(address.to_string()));
	}
	let command = segments.next().ok_or_else(|| PathError::MissingCommand(address.to_string()))?;

	let params: Vec<&str> = segments.collect();
	let payload = params.iter().rev().fold(first_arg, |inner, key| {
		let mut object = Map::new();
		object.insert((*key).to_string(), inner);
		Value::Object(object)
	});

	debug!(command, params = params.len(), "parsed message path");
	Ok(ParsedMessage {
		command: command.to_string(),
		payload,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn bare_command_keeps_argument() {
		let parsed = parse_message_path("/ontime/start", json!({})).unwrap();
		assert_eq!(parsed.command, "start");
		assert_eq!(parsed.payload, json!({}));
	}

	#[test]
	fn params_fold_around_argument() {
		let parsed = parse_message_path("/ontime/load/id", json!("abc")).unwrap();
		assert_eq!(parsed.command, "load");
		assert_eq!(parsed.payload, json!({ "id": "abc" }));

		let parsed = parse_message_path("/ontime/change/e1/title", json!("x")).unwrap();
		assert_eq!(parsed.payload, json!({ "e1": { "title": "x" } }));
	}

	#[test]
	fn param_without_argument_is_null_leaf() {
		let parsed = parse_message_path("/ontime/start/next", Value::Null).unwrap();
		assert_eq!(parsed.payload, json!({ "next": null }));
	}

	#[test]
	fn empty_segments_are_ignored() {
		let parsed = parse_message_path("//ontime//addtime/add/", json!(5000)).unwrap();
		assert_eq!(parsed.command, "addtime");
		assert_eq!(parsed.payload, json!({ "add": 5000 }));
	}

	#[test]
	fn rejects_other_namespaces_and_missing_command() {
		assert!(matches!(parse_message_path("/other/start", Value::Null), Err(PathError::WrongNamespace(_))));
		assert!(matches!(parse_message_path("start", Value::Null), Err(PathError::WrongNamespace(_))));
		assert!(matches!(parse_message_path("/ontime", Value::Null), Err(PathError::MissingCommand(_))));
		assert!(matches!(parse_message_path("/ontime/", Value::Null), Err(PathError::MissingCommand(_))));
	}
}
