//! # CoBlocks Mail
//!
//! Email delivery for form submissions.
//!
//! - [`EmailMessage`]: validated message built through a fluent builder
//! - [`EmailBackend`]: async transport trait with console, memory and SMTP
//!   implementations
//! - [`Mailer`]: sender bound to a backend and a default `From` address, with
//!   a scoped content-type override that is always released
//!
//! ## Example
//!
//! ```
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use coblocks_mail::{ContentType, Mailer, MemoryBackend};
//! use std::sync::Arc;
//!
//! let backend = Arc::new(MemoryBackend::new());
//! let mailer = Mailer::new(backend.clone(), "noreply@example.com");
//!
//! {
//!     let _html = mailer.scoped_content_type(ContentType::Html);
//!     mailer.send("admin@example.com", "Hello", "<ul><li>Name: Alice</li></ul>").await?;
//! }
//!
//! assert_eq!(mailer.content_type(), ContentType::Plain);
//! assert_eq!(backend.count(), 1);
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod mailer;
pub mod message;
pub mod validation;

use thiserror::Error;

pub use backends::{
	ConsoleBackend, EmailBackend, MemoryBackend, SmtpBackend, SmtpConfig, SmtpSecurity,
	backend_from_settings,
};
pub use mailer::{ContentType, ContentTypeGuard, Mailer};
pub use message::{EmailMessage, EmailMessageBuilder};
pub use validation::MAX_EMAIL_LENGTH;

#[derive(Debug, Error)]
pub enum EmailError {
	#[error("Invalid email address: {0}")]
	InvalidAddress(String),

	#[error("Missing required field: {0}")]
	MissingField(String),

	#[error("Backend error: {0}")]
	BackendError(String),

	#[error("SMTP error: {0}")]
	SmtpError(String),

	#[error("Invalid header: {0}")]
	InvalidHeader(String),

	#[error("Header injection attempt detected: {0}")]
	HeaderInjection(String),
}

pub type EmailResult<T> = std::result::Result<T, EmailError>;
