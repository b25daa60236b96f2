use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rundown::RundownError;
use show_control::{DispatchError, DispatchReply, PathError, PlaybackError};

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
	#[error(transparent)]
	Dispatch(#[from] DispatchError),

	#[error(transparent)]
	Path(#[from] PathError),

	#[error("Project file error: {0}")]
	Project(#[from] RundownError),

	#[error("Invalid settings: {0}")]
	InvalidSettings(String),

	#[error("Request timeout")]
	RequestTimeout,

	#[error("Unexpected Tower Service error: {0}")]
	TowerError(#[from] tower::BoxError),

	#[error("I/O error: {0}")]
	IoError(#[from] std::io::Error),
}

impl ServerError {
	pub const fn status_code(&self) -> StatusCode {
		match self {
			Self::Dispatch(DispatchError::UnknownCommand(_) | DispatchError::Rundown(RundownError::NotFound(_))) => StatusCode::NOT_FOUND,
			Self::Dispatch(DispatchError::Playback(PlaybackError::EntryNotFound(_))) => StatusCode::NOT_FOUND,
			Self::Dispatch(DispatchError::Playback(PlaybackError::TimeOutOfRange(_))) => StatusCode::BAD_REQUEST,
			Self::Dispatch(DispatchError::Playback(_)) => StatusCode::CONFLICT,
			Self::Dispatch(DispatchError::InvalidPayload { .. } | DispatchError::Rundown(_)) | Self::Path(_) | Self::Project(_) | Self::InvalidSettings(_) => StatusCode::BAD_REQUEST,
			Self::Dispatch(DispatchError::Unavailable) => StatusCode::SERVICE_UNAVAILABLE,
			Self::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
			Self::TowerError(_) | Self::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let status = self.status_code();
		if status.is_server_error() {
			tracing::error!(error = %self, "request failed");
		}
		let reply = DispatchReply {
			payload: serde_json::Value::Null,
			error: Some(self.to_string()),
		};
		(status, Json(reply)).into_response()
	}
}
