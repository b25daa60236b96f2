use crate::handlers::rundown as routes;
use crate::AppState;
use axum::routing::{get, patch, put};
use axum::{extract::FromRef, Router};

pub fn rundown_routes<S>() -> Router<S>
where
	S: Clone + Send + Sync + 'static,
	AppState: FromRef<S>,
{
	Router::new()
		.route("/rundown", get(routes::get_rundown).post(routes::create_entry).delete(routes::clear_rundown))
		.route("/rundown/reorder", patch(routes::reorder_entry))
		.route("/rundown/swap", patch(routes::swap_entries))
		.route("/rundown/applydelay/:id", patch(routes::apply_delay))
		.route("/rundown/delay/:id", patch(routes::set_delay))
		.route("/rundown/:id", patch(routes::patch_entry).delete(routes::delete_entry))
		.route("/project", get(routes::get_project).put(routes::put_project))
		.route("/custom-fields", get(routes::get_custom_fields).post(routes::create_custom_field))
		.route("/custom-fields/:key", put(routes::edit_custom_field).delete(routes::delete_custom_field))
}
