//! Form rendering and submission handling
//!
//! [`FormProcessor::render`] is the whole request cycle of a form block:
//! a POST carrying this form's hash, the submit action and a valid nonce is
//! turned into an email and answered with a confirmation; every other
//! request gets the form.

use crate::attributes::FormAttributes;
use crate::error::{FormError, FormResult};
use crate::form::FormDefinition;
use crate::hooks::{FormHooks, FormSubmitted, SubmissionContext};
use crate::registry::BlockRegistry;
use crate::render::render_form;
use crate::request::{ACTION_FIELD, FORM_HASH_FIELD, FormRequest, NONCE_FIELD, PostData, SUBMIT_ACTION};
use crate::response::render_success;
use crate::submission::Submission;
use coblocks_conf::Settings;
use coblocks_core::nonce::{HmacNonce, NonceAge, NonceError, NonceService};
use coblocks_core::sanitize::{sanitize_email, sanitize_text_field};
use coblocks_mail::validation::validate_email;
use coblocks_mail::{ContentType, EmailBackend, EmailResult, Mailer, backend_from_settings};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Slug of the field whose value becomes the `Reply-To` address
pub const REPLY_TO_FIELD: &str = "email";

/// Resolves post ids from the request to post titles
pub trait PostLookup: Send + Sync {
	fn title(&self, post_id: u64) -> Option<String>;
}

impl<F> PostLookup for F
where
	F: Fn(u64) -> Option<String> + Send + Sync,
{
	fn title(&self, post_id: u64) -> Option<String> {
		self(post_id)
	}
}

/// Post titles held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticPostLookup {
	titles: HashMap<u64, String>,
}

impl StaticPostLookup {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_post(mut self, post_id: u64, title: impl Into<String>) -> Self {
		self.titles.insert(post_id, title.into());
		self
	}
}

impl PostLookup for StaticPostLookup {
	fn title(&self, post_id: u64) -> Option<String> {
		self.titles.get(&post_id).cloned()
	}
}

/// Why a submission of this form was turned away
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationFailure {
	#[error("action is not coblocks-form-submit")]
	ActionMismatch,
	#[error("nonce is missing")]
	MissingNonce,
	#[error("nonce rejected: {0}")]
	InvalidNonce(NonceError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
	/// The email was handed to the transport
	Success,
	/// No POST for this form instance
	NotSubmitted,
	ValidationFailed(ValidationFailure),
	/// The transport rejected the email
	SendFailed(String),
}

impl SubmissionOutcome {
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Success)
	}
}

/// Markup for the block plus what happened to the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedForm {
	pub html: String,
	pub outcome: SubmissionOutcome,
}

/// Result of sending one submission
#[derive(Debug)]
pub struct Delivery {
	pub context: SubmissionContext,
	pub to: String,
	pub subject: String,
	/// The visitor's address from the `email` field, when it is usable
	pub reply_to: Option<String>,
	/// Body before `coblocks_form_email_content` ran
	pub email_body: String,
	pub result: EmailResult<()>,
}

impl Delivery {
	pub fn sent(&self) -> bool {
		self.result.is_ok()
	}
}

/// Renders form blocks and processes their submissions
///
/// Holds no per-request state, so one processor serves concurrent requests.
///
/// # Examples
///
/// ```
/// use coblocks_conf::Settings;
/// use coblocks_forms::{FormAttributes, FormProcessor, FormRequest, SubmissionOutcome};
/// use coblocks_mail::MemoryBackend;
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut settings = Settings::default();
/// settings.site.admin_email = "admin@example.com".to_string();
///
/// let processor = FormProcessor::builder(settings)
///     .backend(Arc::new(MemoryBackend::new()))
///     .build()
///     .unwrap();
///
/// let request = FormRequest::get("https://example.com/contact/").unwrap();
/// let rendered = processor
///     .render_block(FormAttributes::new(), "<!-- wp:coblocks/field-name /-->", &request)
///     .await
///     .unwrap();
///
/// assert_eq!(rendered.outcome, SubmissionOutcome::NotSubmitted);
/// assert!(rendered.html.contains(r#"name="field-name[value]""#));
/// # }
/// ```
pub struct FormProcessor {
	settings: Settings,
	hooks: FormHooks,
	registry: BlockRegistry,
	nonces: Arc<dyn NonceService>,
	backend: Arc<dyn EmailBackend>,
	posts: Arc<dyn PostLookup>,
}

impl std::fmt::Debug for FormProcessor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FormProcessor")
			.field("site", &self.settings.site.name)
			.field("hooks", &self.hooks)
			.field("registry", &self.registry)
			.finish_non_exhaustive()
	}
}

impl FormProcessor {
	pub fn builder(settings: Settings) -> FormProcessorBuilder {
		FormProcessorBuilder::new(settings)
	}

	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	pub fn hooks(&self) -> &FormHooks {
		&self.hooks
	}

	pub fn registry(&self) -> &BlockRegistry {
		&self.registry
	}

	pub fn nonces(&self) -> &dyn NonceService {
		self.nonces.as_ref()
	}

	/// Parse a form block's content against this processor's registry
	pub fn definition(
		&self,
		attributes: FormAttributes,
		inner_content: impl Into<String>,
	) -> FormResult<FormDefinition> {
		FormDefinition::new(attributes, inner_content, &self.registry)
	}

	/// Mailer sending through the configured backend and sender
	pub fn mailer(&self) -> Mailer {
		Mailer::new(Arc::clone(&self.backend), self.settings.sender())
	}

	/// Admit a request as a submission of `definition`
	///
	/// A request without this form's hash is [`SubmissionOutcome::NotSubmitted`];
	/// one with the hash but a wrong action or nonce is
	/// [`SubmissionOutcome::ValidationFailed`].
	pub fn validate<'r>(
		&self,
		definition: &FormDefinition,
		request: &'r FormRequest,
	) -> Result<&'r PostData, SubmissionOutcome> {
		let Some(post) = request.post_data() else {
			return Err(SubmissionOutcome::NotSubmitted);
		};

		match post.get(FORM_HASH_FIELD) {
			Some(hash) if hash == definition.hash() => {}
			Some(hash) => {
				tracing::debug!(
					submitted = %hash,
					expected = %definition.hash(),
					"form hash does not match this form"
				);
				return Err(SubmissionOutcome::NotSubmitted);
			}
			None => return Err(SubmissionOutcome::NotSubmitted),
		}

		let failure = if post.get(ACTION_FIELD) != Some(SUBMIT_ACTION) {
			Some(ValidationFailure::ActionMismatch)
		} else {
			match post.get(NONCE_FIELD).filter(|nonce| !nonce.is_empty()) {
				None => Some(ValidationFailure::MissingNonce),
				Some(nonce) => match self.nonces.verify_nonce(nonce, SUBMIT_ACTION, &request.session) {
					Ok(NonceAge::Current) => None,
					Ok(NonceAge::Previous) => {
						tracing::debug!("accepting nonce from the previous tick");
						None
					}
					Err(e) => Some(ValidationFailure::InvalidNonce(e)),
				},
			}
		};

		match failure {
			Some(failure) => {
				tracing::info!(form = %definition.hash(), reason = %failure, "form submission rejected");
				Err(SubmissionOutcome::ValidationFailed(failure))
			}
			None => Ok(post),
		}
	}

	/// Subject used when the form does not set one
	pub fn default_subject(&self, post_id: Option<u64>) -> String {
		let site = &self.settings.site.name;
		match post_id.and_then(|id| self.posts.title(id)) {
			Some(title) => format!("{} - {}", site, title),
			None => site.clone(),
		}
	}

	/// Build the email for an admitted submission and send it
	///
	/// Required fields are not enforced: an empty value is sent as is.
	pub async fn process(
		&self,
		definition: &FormDefinition,
		request: &FormRequest,
		post: &PostData,
	) -> Delivery {
		let attributes = &definition.attributes;
		let post_id = request.post_id();
		let submission = Submission::extract(post);
		let email_body = submission.email_body();

		let to = attributes
			.to
			.as_deref()
			.map(sanitize_email)
			.filter(|to| !to.is_empty())
			.unwrap_or_else(|| self.settings.site.admin_email.clone());
		let subject = attributes
			.subject
			.as_deref()
			.map(sanitize_text_field)
			.filter(|subject| !subject.is_empty())
			.unwrap_or_else(|| self.default_subject(post_id));

		let reply_to = submission
			.value(REPLY_TO_FIELD)
			.map(sanitize_email)
			.filter(|address| validate_email(address).is_ok());

		let context = SubmissionContext {
			submission,
			post_id,
		};
		let to = self.hooks.email_to.apply(to, &context);
		let subject = self.hooks.email_subject.apply(subject, &context);
		let content = self.hooks.email_content.apply(email_body.clone(), &context);

		let mailer = self.mailer();
		let result = {
			let _html = mailer.scoped_content_type(ContentType::Html);
			mailer
				.send_with_reply_to(&to, &subject, &content, reply_to.as_slice())
				.await
		};

		match &result {
			Ok(()) => tracing::info!(
				to = %to,
				fields = context.submission.fields().len(),
				"form submission sent"
			),
			Err(e) => tracing::warn!(to = %to, error = %e, "form submission could not be sent"),
		}

		self.hooks.form_submit.fire(&FormSubmitted {
			submission: context.submission.clone(),
			attributes: attributes.clone(),
			post_id,
			sent: result.is_ok(),
		});

		Delivery {
			context,
			to,
			subject,
			reply_to,
			email_body,
			result,
		}
	}

	/// Markup of the form itself with a fresh nonce
	pub fn render_initial(&self, definition: &FormDefinition, request: &FormRequest) -> String {
		let nonce = self.nonces.create_nonce(SUBMIT_ACTION, &request.session);
		render_form(definition, request, &nonce, &self.hooks, &self.settings.forms)
	}

	/// Handle one request for `definition`
	///
	/// Only a sent submission yields the confirmation; every other outcome
	/// renders the form again.
	pub async fn render(&self, definition: &FormDefinition, request: &FormRequest) -> RenderedForm {
		let outcome = match self.validate(definition, request) {
			Err(outcome) => outcome,
			Ok(post) => {
				let delivery = self.process(definition, request, post).await;
				match delivery.result {
					Ok(()) => {
						return RenderedForm {
							html: render_success(
								&delivery.email_body,
								&delivery.context,
								&self.hooks,
								&self.settings.forms,
							),
							outcome: SubmissionOutcome::Success,
						};
					}
					Err(e) => SubmissionOutcome::SendFailed(e.to_string()),
				}
			}
		};

		RenderedForm {
			html: self.render_initial(definition, request),
			outcome,
		}
	}

	/// Parse the block and handle the request in one step
	pub async fn render_block(
		&self,
		attributes: FormAttributes,
		inner_content: &str,
		request: &FormRequest,
	) -> FormResult<RenderedForm> {
		let definition = self.definition(attributes, inner_content)?;
		Ok(self.render(&definition, request).await)
	}
}

/// Assembles a [`FormProcessor`]; unset collaborators come from the settings
pub struct FormProcessorBuilder {
	settings: Settings,
	hooks: FormHooks,
	nonces: Option<Arc<dyn NonceService>>,
	backend: Option<Arc<dyn EmailBackend>>,
	posts: Arc<dyn PostLookup>,
}

impl FormProcessorBuilder {
	pub fn new(settings: Settings) -> Self {
		Self {
			settings,
			hooks: FormHooks::new(),
			nonces: None,
			backend: None,
			posts: Arc::new(StaticPostLookup::new()),
		}
	}

	pub fn hooks(mut self, hooks: FormHooks) -> Self {
		self.hooks = hooks;
		self
	}

	pub fn nonces(mut self, nonces: Arc<dyn NonceService>) -> Self {
		self.nonces = Some(nonces);
		self
	}

	pub fn backend(mut self, backend: Arc<dyn EmailBackend>) -> Self {
		self.backend = Some(backend);
		self
	}

	pub fn posts(mut self, posts: Arc<dyn PostLookup>) -> Self {
		self.posts = posts;
		self
	}

	/// Register the form blocks and resolve the nonce service and backend
	pub fn build(self) -> FormResult<FormProcessor> {
		let nonces = match self.nonces {
			Some(nonces) => nonces,
			None => Arc::new(nonces_from_settings(&self.settings)?),
		};
		let backend = match self.backend {
			Some(backend) => backend,
			None => backend_from_settings(&self.settings.email)?,
		};
		let registry = BlockRegistry::with_form_blocks(&self.hooks);

		Ok(FormProcessor {
			settings: self.settings,
			hooks: self.hooks,
			registry,
			nonces,
			backend,
			posts: self.posts,
		})
	}
}

fn nonces_from_settings(settings: &Settings) -> FormResult<HmacNonce> {
	let security = &settings.security;
	let nonces = if security.nonce_secret.is_empty() {
		tracing::warn!("no nonce secret configured; nonces will not survive a restart");
		HmacNonce::random()
	} else {
		HmacNonce::new(security.nonce_secret.as_bytes().to_vec())
			.map_err(|e| FormError::Configuration(e.to_string()))?
	};
	Ok(nonces.with_lifetime(Duration::from_secs(security.nonce_lifetime_secs)))
}
