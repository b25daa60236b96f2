use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use clap::Parser;
use ontime_server::{app, AppState, Config};
use rundown::{hms, CustomFields, OntimeDelay, OntimeEvent, ProjectData, Rundown, MINUTE_MS};
use serde_json::{json, Value};
use show_control::{ManualClock, ShowControl, ShowState};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

// ============================================================================
// Fixtures
// ============================================================================

fn show(clock: Arc<ManualClock>) -> ShowState {
	let rundown = Rundown::from_entries(vec![
		OntimeEvent::new("a", hms(9, 0, 0), hms(9, 30, 0)).with_cue("1").into(),
		OntimeDelay::new("d", 5 * MINUTE_MS).into(),
		OntimeEvent::new("b", 0, 15 * MINUTE_MS).with_cue("2").linked_to("a").into(),
	])
	.unwrap();
	ShowState::new(ProjectData::default(), rundown, CustomFields::new(), clock)
}

fn server() -> (Router, ShowControl) {
	let clock = Arc::new(ManualClock::new(hms(9, 0, 0)));
	let config = Arc::new(Config::try_parse_from(["ontime-server"]).unwrap());
	let control = ShowControl::spawn(show(clock), config.engine_config(), None, &CancellationToken::new());
	(app(AppState::new(control.dispatcher(), config)), control)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
	let request = Request::builder().method(method).uri(uri).header("content-type", "application/json");
	let request = match body {
		Some(body) => request.body(Body::from(body.to_string())).unwrap(),
		None => request.body(Body::empty()).unwrap(),
	};
	let response = app.clone().oneshot(request).await.unwrap();
	let status = response.status();
	let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
	let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
	(status, value)
}

fn start_of(view: &Value, id: &str) -> i64 {
	view["timings"].as_array().unwrap().iter().find(|timed| timed["id"] == id).unwrap()["timeStart"].as_i64().unwrap()
}

// ============================================================================
// Integration API
// ============================================================================

#[tokio::test]
async fn api_paths_use_the_message_grammar() {
	let (app, control) = server();

	let (status, reply) = call(&app, Method::GET, "/api/load?cue=1", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(reply["payload"], "armed");

	let (status, reply) = call(&app, Method::GET, "/api/start/next", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(reply["payload"], "play");

	let (_, state) = call(&app, Method::GET, "/poll", None).await;
	assert_eq!(state["selectedEntryId"], "b");

	let (status, _) = call(&app, Method::GET, "/api/addtime/add?value=1", None).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	let (status, _) = call(&app, Method::GET, "/api/addtime?add=60000", None).await;
	assert_eq!(status, StatusCode::OK);

	control.shutdown().await;
}

#[tokio::test]
async fn api_errors_carry_status_and_message() {
	let (app, control) = server();

	let (status, reply) = call(&app, Method::GET, "/api/explode", None).await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(reply["payload"], Value::Null);
	assert!(reply["error"].as_str().unwrap().contains("explode"));

	let (status, _) = call(&app, Method::GET, "/api/pause", None).await;
	assert_eq!(status, StatusCode::CONFLICT);

	let (status, _) = call(&app, Method::GET, "/api/load?cue=404", None).await;
	assert_eq!(status, StatusCode::NOT_FOUND);

	control.shutdown().await;
}

// ============================================================================
// Rundown editing
// ============================================================================

#[tokio::test]
async fn rundown_view_includes_delays() {
	let (app, control) = server();

	let (status, view) = call(&app, Method::GET, "/rundown", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(view["entries"].as_array().unwrap().len(), 3);
	assert_eq!(start_of(&view, "b"), hms(9, 35, 0));
	assert_eq!(view["totalDelay"], 5 * MINUTE_MS);

	control.shutdown().await;
}

#[tokio::test]
async fn patching_an_event_cascades_to_linked_events() {
	let (app, control) = server();

	let (status, event) = call(&app, Method::PATCH, "/rundown/a", Some(json!({ "duration": 40 * MINUTE_MS }))).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(event["timeEnd"], hms(9, 40, 0));

	let (_, view) = call(&app, Method::GET, "/rundown", None).await;
	assert_eq!(start_of(&view, "b"), hms(9, 45, 0));

	control.shutdown().await;
}

#[tokio::test]
async fn applying_a_delay_bakes_it_into_stored_times() {
	let (app, control) = server();

	let (status, _) = call(&app, Method::PATCH, "/rundown/applydelay/d", None).await;
	assert_eq!(status, StatusCode::NO_CONTENT);

	let (_, view) = call(&app, Method::GET, "/rundown", None).await;
	assert_eq!(view["entries"].as_array().unwrap().len(), 2);
	assert_eq!(view["totalDelay"], 0);
	assert_eq!(start_of(&view, "b"), hms(9, 35, 0));

	control.shutdown().await;
}

#[tokio::test]
async fn create_delete_and_clear() {
	let (app, control) = server();

	let entry = json!({ "entry": { "type": "event", "id": "c", "cue": "3", "timeStart": hms(11, 0, 0), "timeEnd": hms(11, 10, 0) } });
	let (status, created) = call(&app, Method::POST, "/rundown", Some(entry)).await;
	assert_eq!(status, StatusCode::CREATED);
	assert_eq!(created["id"], "c");
	assert_eq!(created["duration"], 10 * MINUTE_MS);

	let (status, _) = call(&app, Method::POST, "/rundown", Some(json!({ "entry": { "type": "event", "id": "a" } }))).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);

	let (status, _) = call(&app, Method::DELETE, "/rundown/missing", None).await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	let (status, _) = call(&app, Method::DELETE, "/rundown/a", None).await;
	assert_eq!(status, StatusCode::NO_CONTENT);

	let (_, view) = call(&app, Method::GET, "/rundown", None).await;
	assert_eq!(view["entries"].as_array().unwrap().len(), 3);

	let (status, _) = call(&app, Method::DELETE, "/rundown", None).await;
	assert_eq!(status, StatusCode::NO_CONTENT);
	let (_, view) = call(&app, Method::GET, "/rundown", None).await;
	assert!(view["entries"].as_array().unwrap().is_empty());

	control.shutdown().await;
}

#[tokio::test]
async fn project_round_trips_through_replace() {
	let (app, control) = server();

	let (status, mut project) = call(&app, Method::GET, "/project", None).await;
	assert_eq!(status, StatusCode::OK);
	project["project"]["title"] = json!("Late show");
	project["rundown"].as_array_mut().unwrap().truncate(1);

	let (status, _) = call(&app, Method::PUT, "/project", Some(project)).await;
	assert_eq!(status, StatusCode::NO_CONTENT);

	let (_, view) = call(&app, Method::GET, "/rundown", None).await;
	assert_eq!(view["project"]["title"], "Late show");
	assert_eq!(view["entries"].as_array().unwrap().len(), 1);

	control.shutdown().await;
}

#[tokio::test]
async fn custom_fields_register_and_reach_events() {
	let (app, control) = server();

	let (status, created) = call(&app, Method::POST, "/custom-fields", Some(json!({ "label": "Camera Op", "colour": "#f00" }))).await;
	assert_eq!(status, StatusCode::CREATED);
	assert_eq!(created["key"], "camera_op");

	let (status, _) = call(&app, Method::POST, "/custom-fields", Some(json!({ "label": "camera op" }))).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);

	let (status, _) = call(&app, Method::GET, "/api/change/a/custom:camera_op?value=Sam", None).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	let (status, reply) = call(&app, Method::GET, "/api/change/a?custom:camera_op=Sam", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(reply["payload"]["custom"]["camera_op"], "Sam");

	let (status, _) = call(&app, Method::PUT, "/custom-fields/camera_op", Some(json!({ "label": "Camera", "colour": "#0f0" }))).await;
	assert_eq!(status, StatusCode::NO_CONTENT);
	let (_, fields) = call(&app, Method::GET, "/custom-fields", None).await;
	assert_eq!(fields["camera_op"]["label"], "Camera");

	let (status, _) = call(&app, Method::DELETE, "/custom-fields/camera_op", None).await;
	assert_eq!(status, StatusCode::NO_CONTENT);
	let (status, _) = call(&app, Method::DELETE, "/custom-fields/camera_op", None).await;
	assert_eq!(status, StatusCode::NOT_FOUND);

	control.shutdown().await;
}

#[tokio::test]
async fn report_lists_and_clears_played_events() {
	let (app, control) = server();

	call(&app, Method::GET, "/api/start?id=a", None).await;
	call(&app, Method::GET, "/api/stop", None).await;

	let (status, report) = call(&app, Method::GET, "/report", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(report["a"]["startedAt"], hms(9, 0, 0));
	assert_eq!(report["a"]["endedAt"], hms(9, 0, 0));
	assert_eq!(report["a"]["overUnder"], -30 * MINUTE_MS);

	let (status, report) = call(&app, Method::DELETE, "/report/nobody", None).await;
	assert_eq!(status, StatusCode::OK);
	assert!(report.get("a").is_some());

	let (_, report) = call(&app, Method::DELETE, "/report/a", None).await;
	assert_eq!(report, json!({}));

	call(&app, Method::GET, "/api/start?id=b", None).await;
	let (status, report) = call(&app, Method::DELETE, "/report", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(report, json!({}));

	control.shutdown().await;
}

#[tokio::test]
async fn osc_settings_are_validated_and_published() {
	let clock = Arc::new(ManualClock::new(0));
	let config = Arc::new(Config::try_parse_from(["ontime-server", "--osc-port", "9000", "--osc-feedback", "false"]).unwrap());
	let control = ShowControl::spawn(show(clock), config.engine_config(), None, &CancellationToken::new());
	let state = AppState::new(control.dispatcher(), config);
	let mut settings_rx = state.osc_settings();
	let app = app(state);

	let (status, settings) = call(&app, Method::GET, "/osc", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(settings, json!({ "portIn": 9000, "enabledIn": true, "feedback": false }));

	let (status, _) = call(&app, Method::POST, "/osc", Some(json!({ "portIn": 80, "enabledIn": true, "feedback": true }))).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	let (status, _) = call(&app, Method::POST, "/osc", Some(json!({ "portIn": 4001, "enabledIn": true, "feedback": true }))).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert!(!settings_rx.has_changed().unwrap());

	let (status, settings) = call(&app, Method::POST, "/osc", Some(json!({ "portIn": 9100, "enabledIn": false, "feedback": true }))).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(settings["portIn"], 9100);
	assert!(settings_rx.has_changed().unwrap());
	let published = *settings_rx.borrow_and_update();
	assert_eq!(published.port_in, 9100);
	assert!(!published.enabled_in);

	let (_, settings) = call(&app, Method::GET, "/osc", None).await;
	assert_eq!(settings["enabledIn"], false);

	control.shutdown().await;
}

// ============================================================================
// Ambient
// ============================================================================

#[tokio::test]
async fn health_and_metrics() {
	let (app, control) = server();

	let (status, health) = call(&app, Method::GET, "/health", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(health["status"], "healthy");

	call(&app, Method::GET, "/api/version", None).await;
	let response = app.clone().oneshot(Request::get("/metrics").body(Body::empty()).unwrap()).await.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	let text = String::from_utf8(to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()).unwrap();
	assert!(text.contains("ontime_commands_total"));

	control.shutdown().await;
}
