use axum::extract::State;
use axum::Json;
use tracing::{info, instrument};

use crate::osc::OscSettings;
use crate::{AppState, ServerError};

#[axum::debug_handler]
#[instrument(name = "get_osc", skip(state))]
pub async fn get_osc(State(state): State<AppState>) -> Json<OscSettings> {
	Json(*state.osc.borrow())
}

/// Replace the OSC settings; the listener restarts with them
#[axum::debug_handler]
#[instrument(name = "post_osc", skip(state))]
pub async fn post_osc(State(state): State<AppState>, Json(settings): Json<OscSettings>) -> Result<Json<OscSettings>, ServerError> {
	settings.validate(state.config.port).map_err(ServerError::InvalidSettings)?;
	let changed = state.osc.send_if_modified(|current| {
		let changed = *current != settings;
		*current = settings;
		changed
	});
	if changed {
		info!(port_in = settings.port_in, enabled_in = settings.enabled_in, feedback = settings.feedback, "OSC settings updated");
	}
	Ok(Json(settings))
}
