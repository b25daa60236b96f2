use axum::{
	body::Body,
	http::{Request, Response, StatusCode},
	middleware::Next,
};
use lazy_static::lazy_static;
use prometheus::{register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec, TextEncoder};
use serde_json::Value;
use show_control::{DispatchError, Origin};
use std::time::Instant;

lazy_static! {
	static ref HTTP_REQUESTS_TOTAL: IntCounterVec =
		register_int_counter_vec!("http_requests_total", "Total number of HTTP requests", &["method", "route", "status"]).expect("Failed to register HTTP_REQUESTS_TOTAL");
	static ref HTTP_REQUEST_DURATION: HistogramVec =
		register_histogram_vec!("http_request_duration_seconds", "HTTP request duration in seconds", &["method", "route"]).expect("Failed to register HTTP_REQUEST_DURATION");
	static ref COMMANDS_TOTAL: IntCounterVec =
		register_int_counter_vec!("ontime_commands_total", "Commands dispatched to the show", &["command", "origin", "outcome"]).expect("Failed to register COMMANDS_TOTAL");
}

/// Count a dispatched command; unknown names share one label
pub fn record_command(command: &str, origin: Origin, result: &Result<Value, DispatchError>) {
	let (command, outcome) = match result {
		Ok(_) => (command, "ok"),
		Err(DispatchError::UnknownCommand(_)) => ("unknown", "unknown_command"),
		Err(e) => (command, e.kind()),
	};
	COMMANDS_TOTAL.with_label_values(&[command, origin.as_str(), outcome]).inc();
}

/// Middleware for Prometheus metrics collection
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response<Body> {
	let method = req.method().to_string();
	let path = normalize_path(req.uri().path());

	let start = Instant::now();
	let response = next.run(req).await;
	let duration = start.elapsed().as_secs_f64();

	let status = response.status().as_u16().to_string();

	HTTP_REQUESTS_TOTAL.with_label_values(&[&method, &path, &status]).inc();
	HTTP_REQUEST_DURATION.with_label_values(&[&method, &path]).observe(duration);

	response
}

/// Collapse ids and integration paths so labels stay bounded
fn normalize_path(path: &str) -> String {
	let path = path.trim_end_matches('/');
	let mut segments = path.split('/').filter(|segment| !segment.is_empty());
	match (segments.next(), segments.next()) {
		(Some("api"), Some(command)) => format!("/api/{command}"),
		(Some("rundown"), Some(second @ ("reorder" | "swap"))) => format!("/rundown/{second}"),
		(Some("rundown"), Some("applydelay" | "delay")) => path.rsplit_once('/').map_or_else(|| path.to_string(), |(prefix, _)| format!("{prefix}/:id")),
		(Some("rundown"), Some(_)) => "/rundown/:id".to_string(),
		(Some(first), _) => format!("/{first}"),
		(None, _) => "/".to_string(),
	}
}

/// Prometheus metrics handler
pub async fn metrics_handler() -> Result<String, StatusCode> {
	let encoder = TextEncoder::new();
	let metric_families = prometheus::gather();
	let mut buffer = Vec::new();

	if encoder.encode(&metric_families, &mut buffer).is_err() {
		return Err(StatusCode::INTERNAL_SERVER_ERROR);
	}

	String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn paths_collapse_to_routes() {
		assert_eq!(normalize_path("/api/start/next"), "/api/start");
		assert_eq!(normalize_path("/rundown/abc123"), "/rundown/:id");
		assert_eq!(normalize_path("/rundown/swap"), "/rundown/swap");
		assert_eq!(normalize_path("/rundown/applydelay/d1"), "/rundown/applydelay/:id");
		assert_eq!(normalize_path("/rundown/"), "/rundown");
		assert_eq!(normalize_path("/"), "/");
	}
}
