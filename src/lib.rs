//! # CoBlocks
//!
//! Server-side processing for the CoBlocks form block.
//!
//! The form block is rendered with a hash of its attributes and content plus
//! a nonce. When the page is posted back with the same hash, the submitted
//! fields are collected and mailed to the site owner, and the visitor sees a
//! confirmation instead of the form.
//!
//! ## Crates
//!
//! - [`core`]: hooks, sanitization and nonces (`coblocks-core`)
//! - [`conf`]: settings from TOML and the environment (`coblocks-conf`)
//! - [`mail`]: email messages and transports (`coblocks-mail`)
//! - [`forms`]: form rendering and submission processing (`coblocks-forms`)
//!
//! ## Feature Flags
//!
//! - `full` (default) - everything below
//! - `forms` - form processing, implies `mail`
//! - `mail` - email messages, console/memory/SMTP backends
//!
//! ## Quick Example
//!
//! ```
//! # #[cfg(feature = "forms")]
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use coblocks::prelude::*;
//! use std::sync::Arc;
//!
//! let settings = Settings::from_toml_str(r#"
//! [site]
//! name = "Acme"
//! admin_email = "admin@example.com"
//!
//! [email]
//! backend = "memory"
//! "#)?;
//! let processor = FormProcessor::builder(settings)
//!     .backend(Arc::new(MemoryBackend::new()))
//!     .build()?;
//!
//! let request = FormRequest::get("https://example.com/contact/")?;
//! let rendered = processor
//!     .render_block(FormAttributes::new(), "<!-- wp:coblocks/field-email /-->", &request)
//!     .await?;
//!
//! assert_eq!(rendered.outcome, SubmissionOutcome::NotSubmitted);
//! assert!(rendered.html.contains(r#"<input type="email" id="email" name="field-email[value]" />"#));
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "forms"))]
//! # fn main() {}
//! ```

pub mod conf;
pub mod core;
#[cfg(feature = "forms")]
pub mod forms;
#[cfg(feature = "mail")]
pub mod mail;

pub use coblocks_conf::{Settings, SettingsError};
pub use coblocks_core::{Action, Filter, HookName, HmacNonce, NonceService};

#[cfg(feature = "mail")]
pub use coblocks_mail::{
	ConsoleBackend, ContentType, EmailBackend, EmailError, EmailMessage, Mailer, MemoryBackend,
	SmtpBackend, backend_from_settings,
};

#[cfg(feature = "forms")]
pub use coblocks_forms::{
	BlockRegistry, FormAttributes, FormDefinition, FormError, FormHooks, FormProcessor, FormRequest,
	PostData, RenderedForm, Submission, SubmissionOutcome, ValidationFailure,
};

/// Commonly used types
pub mod prelude {
	pub use crate::{Action, Filter, HmacNonce, HookName, NonceService, Settings, SettingsError};

	#[cfg(feature = "mail")]
	pub use crate::{
		ConsoleBackend, ContentType, EmailBackend, EmailError, EmailMessage, Mailer, MemoryBackend,
		SmtpBackend, backend_from_settings,
	};

	#[cfg(feature = "forms")]
	pub use crate::{
		BlockRegistry, FormAttributes, FormDefinition, FormError, FormHooks, FormProcessor,
		FormRequest, PostData, RenderedForm, Submission, SubmissionOutcome, ValidationFailure,
	};
}
