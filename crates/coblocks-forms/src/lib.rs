//! # CoBlocks Forms
//!
//! Server side of the CoBlocks form block.
//!
//! A form block arrives as attributes plus serialized inner content. It is
//! parsed into a [`FormDefinition`] whose hash identifies this exact form
//! instance. [`FormProcessor::render`] then either renders the form, with the
//! hash and a nonce embedded, or admits a POST carrying both. An admitted POST
//! has its `field-<slug>[label|value]` entries mailed as an HTML list and gets
//! a confirmation instead of the form.
//!
//! ## Modules
//!
//! - [`attributes`]: form block attributes and their canonical JSON
//! - [`blocks`]: block comment parsing
//! - [`fields`]: field kinds, slugs and field markup
//! - [`registry`]: known block types
//! - [`hooks`]: the form's filters and actions
//! - [`request`]: incoming request and POST body
//! - [`submission`]: submitted field extraction and the email body
//! - [`render`] / [`response`]: form and confirmation markup
//! - [`processor`]: validation, delivery and the request cycle
//!
//! ## Example
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use coblocks_conf::Settings;
//! use coblocks_forms::{FormAttributes, FormProcessor, FormRequest, PostData, SubmissionOutcome};
//! use coblocks_mail::MemoryBackend;
//! use std::sync::Arc;
//!
//! let mut settings = Settings::default();
//! settings.site.admin_email = "admin@example.com".to_string();
//! let outbox = Arc::new(MemoryBackend::new());
//! let processor = FormProcessor::builder(settings).backend(outbox.clone()).build()?;
//!
//! let form = processor.definition(FormAttributes::new(), "<!-- wp:coblocks/field-name /-->")?;
//! let nonce = processor.nonces().create_nonce("coblocks-form-submit", "");
//! let post = PostData::from_pairs([
//!     ("field-name[label]", "Name"),
//!     ("field-name[value]", "Alice"),
//!     ("form-submit", nonce.as_str()),
//!     ("action", "coblocks-form-submit"),
//!     ("form-hash", form.hash()),
//! ]);
//! let request = FormRequest::get("https://example.com/contact/")?.with_post_data(post);
//!
//! let rendered = processor.render(&form, &request).await;
//!
//! assert_eq!(rendered.outcome, SubmissionOutcome::Success);
//! assert_eq!(outbox.messages()[0].to(), ["admin@example.com".to_string()]);
//! # Ok(())
//! # }
//! ```

pub mod attributes;
pub mod blocks;
pub mod error;
pub mod fields;
pub mod form;
pub mod hooks;
pub mod processor;
pub mod registry;
pub mod render;
pub mod request;
pub mod response;
pub mod submission;

pub use attributes::FormAttributes;
pub use blocks::{ContentSegment, parse_blocks};
pub use error::{FormError, FormResult};
pub use fields::{FieldAttributes, FieldEntry, FieldKind, FieldType, RadioAttributes};
pub use form::{FormDefinition, form_instance_hash};
pub use hooks::{FormHooks, FormSubmitted, SubmissionContext};
pub use processor::{
	Delivery, FormProcessor, FormProcessorBuilder, PostLookup, REPLY_TO_FIELD, RenderedForm,
	StaticPostLookup, SubmissionOutcome, ValidationFailure,
};
pub use registry::{BlockKind, BlockRegistry, BlockType};
pub use render::render_form;
pub use request::{FormRequest, PostData, SUBMIT_ACTION};
pub use response::{HISTORY_REPLACE_SCRIPT, render_success};
pub use submission::{MalformedEntry, Submission, SubmittedField};
