use coblocks_mail::EmailError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormError {
	/// A submitted entry that does not fit the `field-<slug>[label|value]` shape
	#[error("Malformed submission entry '{key}': {reason}")]
	MalformedSubmission { key: String, reason: String },

	#[error("Invalid form attributes: {0}")]
	InvalidAttributes(String),

	#[error("Invalid attributes for block '{block}': {reason}")]
	InvalidBlock { block: String, reason: String },

	#[error("Invalid request body: {0}")]
	InvalidRequest(String),

	#[error("Configuration error: {0}")]
	Configuration(String),

	#[error(transparent)]
	Email(#[from] EmailError),
}

pub type FormResult<T> = std::result::Result<T, FormError>;
