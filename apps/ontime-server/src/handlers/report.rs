use axum::extract::{Path, State};
use axum::Json;
use rundown::EntryId;
use show_control::PlaybackReport;
use tracing::instrument;

use crate::{AppState, ServerError};

#[axum::debug_handler]
#[instrument(name = "get_report", skip(state))]
pub async fn get_report(State(state): State<AppState>) -> Result<Json<PlaybackReport>, ServerError> {
	Ok(Json(state.dispatcher.report().await?))
}

#[axum::debug_handler]
#[instrument(name = "clear_report", skip(state))]
pub async fn clear_report(State(state): State<AppState>) -> Result<Json<PlaybackReport>, ServerError> {
	Ok(Json(state.dispatcher.clear_report(None).await?))
}

/// Unknown ids are not an error; the event simply has no report
#[axum::debug_handler]
#[instrument(name = "clear_event_report", skip(state))]
pub async fn clear_event_report(State(state): State<AppState>, Path(id): Path<EntryId>) -> Result<Json<PlaybackReport>, ServerError> {
	Ok(Json(state.dispatcher.clear_report(Some(id)).await?))
}
