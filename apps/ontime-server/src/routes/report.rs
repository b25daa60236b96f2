use crate::handlers::report as routes;
use crate::AppState;
use axum::routing::{delete, get};
use axum::{extract::FromRef, Router};

pub fn report_routes<S>() -> Router<S>
where
	S: Clone + Send + Sync + 'static,
	AppState: FromRef<S>,
{
	Router::new()
		.route("/report", get(routes::get_report).delete(routes::clear_report))
		.route("/report/:id", delete(routes::clear_event_report))
}
