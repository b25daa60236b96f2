use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rundown::{CustomField, CustomFields, Entry, EntryId, EventPatch, ProjectFile, TimeMs};
use serde::Deserialize;
use serde_json::{json, Value};
use show_control::{RundownEdit, RundownView};
use tracing::instrument;

use crate::{AppState, ServerError};

#[derive(Debug, Deserialize)]
pub struct InsertRequest {
	pub entry: Entry,
	#[serde(default)]
	pub after: Option<EntryId>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
	pub id: EntryId,
	pub from: usize,
	pub to: usize,
}

#[derive(Debug, Deserialize)]
pub struct SwapRequest {
	pub from: EntryId,
	pub to: EntryId,
}

#[derive(Debug, Deserialize)]
pub struct DelayRequest {
	pub duration: TimeMs,
}

async fn edit(state: &AppState, edit: RundownEdit) -> Result<Value, ServerError> {
	Ok(state.dispatcher.edit(edit).await?)
}

#[axum::debug_handler]
#[instrument(name = "get_rundown", skip(state))]
pub async fn get_rundown(State(state): State<AppState>) -> Result<Json<RundownView>, ServerError> {
	Ok(Json(state.dispatcher.view().await?))
}

#[axum::debug_handler]
#[instrument(name = "create_entry", skip(state, request))]
pub async fn create_entry(State(state): State<AppState>, Json(request): Json<InsertRequest>) -> Result<(StatusCode, Json<Value>), ServerError> {
	let created = edit(
		&state,
		RundownEdit::Insert {
			entry: request.entry,
			after: request.after,
		},
	)
	.await?;
	Ok((StatusCode::CREATED, Json(created)))
}

#[axum::debug_handler]
#[instrument(name = "patch_entry", skip(state, patch))]
pub async fn patch_entry(State(state): State<AppState>, Path(id): Path<EntryId>, Json(patch): Json<EventPatch>) -> Result<Json<Value>, ServerError> {
	Ok(Json(edit(&state, RundownEdit::Patch { id, patch }).await?))
}

#[axum::debug_handler]
#[instrument(name = "delete_entry", skip(state))]
pub async fn delete_entry(State(state): State<AppState>, Path(id): Path<EntryId>) -> Result<StatusCode, ServerError> {
	edit(&state, RundownEdit::Remove { ids: vec![id] }).await?;
	Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
#[instrument(name = "clear_rundown", skip(state))]
pub async fn clear_rundown(State(state): State<AppState>) -> Result<StatusCode, ServerError> {
	edit(&state, RundownEdit::Clear).await?;
	Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
#[instrument(name = "reorder_entry", skip(state))]
pub async fn reorder_entry(State(state): State<AppState>, Json(request): Json<ReorderRequest>) -> Result<StatusCode, ServerError> {
	let ReorderRequest { id, from, to } = request;
	edit(&state, RundownEdit::Reorder { id, from, to }).await?;
	Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
#[instrument(name = "swap_entries", skip(state))]
pub async fn swap_entries(State(state): State<AppState>, Json(request): Json<SwapRequest>) -> Result<StatusCode, ServerError> {
	edit(&state, RundownEdit::Swap { a: request.from, b: request.to }).await?;
	Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
#[instrument(name = "apply_delay", skip(state))]
pub async fn apply_delay(State(state): State<AppState>, Path(id): Path<EntryId>) -> Result<StatusCode, ServerError> {
	edit(&state, RundownEdit::ApplyDelay { id }).await?;
	Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
#[instrument(name = "set_delay", skip(state))]
pub async fn set_delay(State(state): State<AppState>, Path(id): Path<EntryId>, Json(request): Json<DelayRequest>) -> Result<StatusCode, ServerError> {
	edit(&state, RundownEdit::SetDelay { id, duration: request.duration }).await?;
	Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
#[instrument(name = "get_project", skip(state))]
pub async fn get_project(State(state): State<AppState>) -> Result<Json<ProjectFile>, ServerError> {
	Ok(Json(state.dispatcher.snapshot().await?))
}

/// Replace the whole show; playback stops
#[axum::debug_handler]
#[instrument(name = "put_project", skip(state, project))]
pub async fn put_project(State(state): State<AppState>, Json(project): Json<ProjectFile>) -> Result<StatusCode, ServerError> {
	edit(&state, RundownEdit::Replace { project }).await?;
	Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
#[instrument(name = "get_custom_fields", skip(state))]
pub async fn get_custom_fields(State(state): State<AppState>) -> Result<Json<CustomFields>, ServerError> {
	Ok(Json(state.dispatcher.view().await?.custom_fields))
}

/// Register a field; the key is derived from its label and returned
#[axum::debug_handler]
#[instrument(name = "create_custom_field", skip(state))]
pub async fn create_custom_field(State(state): State<AppState>, Json(field): Json<CustomField>) -> Result<(StatusCode, Json<Value>), ServerError> {
	let key = edit(&state, RundownEdit::AddCustomField { field }).await?;
	Ok((StatusCode::CREATED, Json(json!({ "key": key }))))
}

#[axum::debug_handler]
#[instrument(name = "edit_custom_field", skip(state))]
pub async fn edit_custom_field(State(state): State<AppState>, Path(key): Path<String>, Json(field): Json<CustomField>) -> Result<StatusCode, ServerError> {
	edit(&state, RundownEdit::EditCustomField { key, field }).await?;
	Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
#[instrument(name = "delete_custom_field", skip(state))]
pub async fn delete_custom_field(State(state): State<AppState>, Path(key): Path<String>) -> Result<StatusCode, ServerError> {
	edit(&state, RundownEdit::RemoveCustomField { key }).await?;
	Ok(StatusCode::NO_CONTENT)
}
