use thiserror::Error;

pub type Result<T> = std::result::Result<T, RundownError>;

#[derive(Error, Debug)]
pub enum RundownError {
	#[error("Entry not found: {0}")]
	NotFound(String),

	#[error("Duplicate entry id: {0}")]
	DuplicateId(String),

	#[error("Entry {id} cannot link to {target}: {reason}")]
	InvalidLink { id: String, target: String, reason: String },

	#[error("Invalid value for {field}: {reason}")]
	InvalidField { field: String, reason: String },

	#[error("Entry {0} is not an event")]
	NotAnEvent(String),

	#[error("Invalid project file: {0}")]
	InvalidProject(String),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl RundownError {
	pub(crate) fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::InvalidField {
			field: field.into(),
			reason: reason.into(),
		}
	}
}
