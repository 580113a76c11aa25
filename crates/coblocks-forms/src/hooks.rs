//! Extension points of the form block

use crate::attributes::FormAttributes;
use crate::registry::BlockRegistry;
use crate::submission::Submission;
use coblocks_core::hooks::{Action, Filter};

/// Hook names
pub mod names {
	use coblocks_core::hooks::HookName;

	pub const REGISTER_FORM_BLOCKS: HookName = HookName::new_static("coblocks_register_form_blocks");
	pub const LABEL_REQUIRED_TEXT: HookName =
		HookName::new_static("coblocks_form_label_required_text");
	pub const EMAIL_TO: HookName = HookName::new_static("coblocks_form_email_to");
	pub const EMAIL_SUBJECT: HookName = HookName::new_static("coblocks_form_email_subject");
	pub const EMAIL_CONTENT: HookName = HookName::new_static("coblocks_form_email_content");
	pub const SUCCESS_MESSAGE: HookName = HookName::new_static("coblocks_form_success_message");
	pub const FORM_SUBMIT: HookName = HookName::new_static("coblocks_form_submit");
}

/// What the email filters see besides the value being filtered
#[derive(Debug, Clone)]
pub struct SubmissionContext {
	pub submission: Submission,
	/// Post id from the request query, if any
	pub post_id: Option<u64>,
}

/// Payload of `coblocks_form_submit`
#[derive(Debug, Clone)]
pub struct FormSubmitted {
	pub submission: Submission,
	pub attributes: FormAttributes,
	pub post_id: Option<u64>,
	/// Whether the mail transport accepted the message
	pub sent: bool,
}

/// Every extension point the form block exposes
///
/// Clones share their listeners, so one registry can be handed to several
/// processors.
///
/// # Examples
///
/// ```
/// use coblocks_forms::FormHooks;
///
/// let hooks = FormHooks::new();
/// hooks.email_subject.add_filter(|subject, _ctx| format!("[Website] {}", subject));
///
/// assert!(hooks.email_subject.has_filters());
/// ```
#[derive(Debug, Clone)]
pub struct FormHooks {
	/// Fired once the form blocks are registered; listeners may register more
	pub register_form_blocks: Action<BlockRegistry>,
	/// `(text, field label) -> text`
	pub label_required_text: Filter<String, str>,
	pub email_to: Filter<String, SubmissionContext>,
	pub email_subject: Filter<String, SubmissionContext>,
	pub email_content: Filter<String, SubmissionContext>,
	/// Markup shown after a successful submission
	pub success_message: Filter<String, SubmissionContext>,
	pub form_submit: Action<FormSubmitted>,
}

impl FormHooks {
	pub fn new() -> Self {
		Self {
			register_form_blocks: Action::new(names::REGISTER_FORM_BLOCKS),
			label_required_text: Filter::new(names::LABEL_REQUIRED_TEXT),
			email_to: Filter::new(names::EMAIL_TO),
			email_subject: Filter::new(names::EMAIL_SUBJECT),
			email_content: Filter::new(names::EMAIL_CONTENT),
			success_message: Filter::new(names::SUCCESS_MESSAGE),
			form_submit: Action::new(names::FORM_SUBMIT),
		}
	}
}

impl Default for FormHooks {
	fn default() -> Self {
		Self::new()
	}
}
