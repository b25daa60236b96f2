use crate::handlers::settings as routes;
use crate::AppState;
use axum::routing::get;
use axum::{extract::FromRef, Router};

pub fn settings_routes<S>() -> Router<S>
where
	S: Clone + Send + Sync + 'static,
	AppState: FromRef<S>,
{
	Router::new().route("/osc", get(routes::get_osc).post(routes::post_osc))
}
