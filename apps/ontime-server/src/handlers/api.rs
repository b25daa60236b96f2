use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde_json::{Map, Value};
use show_control::{parse_message_path, DispatchReply, Origin, NAMESPACE};
use tracing::instrument;

use crate::{metrics, AppState, ServerError};

/// `GET /api/{command}/{params...}?key=value`: the same grammar as UDP messages, with the query
/// string as the argument
#[axum::debug_handler]
#[instrument(name = "integration", skip(state, query))]
pub async fn integration(State(state): State<AppState>, Path(path): Path<String>, Query(query): Query<BTreeMap<String, String>>) -> Result<Json<DispatchReply>, ServerError> {
	let address = format!("/{NAMESPACE}/{path}");
	let parsed = parse_message_path(&address, query_arg(query))?;

	let result = state.dispatcher.try_dispatch(&parsed.command, parsed.payload, Origin::Http).await;
	metrics::record_command(&parsed.command, Origin::Http, &result);

	Ok(Json(DispatchReply { payload: result?, error: None }))
}

#[axum::debug_handler]
#[instrument(name = "poll", skip(state))]
pub async fn poll(State(state): State<AppState>) -> Result<Json<Value>, ServerError> {
	let result = state.dispatcher.try_dispatch("poll", Value::Null, Origin::Http).await;
	metrics::record_command("poll", Origin::Http, &result);
	Ok(Json(result?))
}

fn query_arg(query: BTreeMap<String, String>) -> Value {
	if query.is_empty() {
		return Value::Null;
	}
	Value::Object(query.into_iter().map(|(key, value)| (key, Value::String(value))).collect::<Map<_, _>>())
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn query_becomes_the_argument() {
		assert_eq!(query_arg(BTreeMap::new()), Value::Null);
		let query = BTreeMap::from([("cue".to_string(), "4".to_string())]);
		assert_eq!(query_arg(query), json!({ "cue": "4" }));
	}
}
