use crate::handlers::api as routes;
use crate::AppState;
use axum::routing::get;
use axum::{extract::FromRef, Router};

pub fn api_routes<S>() -> Router<S>
where
	S: Clone + Send + Sync + 'static,
	AppState: FromRef<S>,
{
	Router::new().route("/api/*path", get(routes::integration)).route("/poll", get(routes::poll))
}
