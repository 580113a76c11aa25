//! Markup returned after a successful submission

use crate::hooks::{FormHooks, SubmissionContext};
use coblocks_conf::FormSettings;
use coblocks_core::sanitize::kses_post;

/// Replaces the POST entry in the browser history so a reload does not
/// submit the form again
pub const HISTORY_REPLACE_SCRIPT: &str = r#"<script type="text/javascript">
if ( window.history.replaceState ) {
	window.history.replaceState( null, null, window.location.href );
}
</script>"#;

/// Confirmation shown in place of the form
///
/// The unfiltered email body is quoted, passed through
/// `coblocks_form_success_message` and sanitized again. With
/// `reuse_content_filter_for_success` set, `coblocks_form_email_content`
/// runs on the quoted markup first.
pub fn render_success(
	email_body: &str,
	context: &SubmissionContext,
	hooks: &FormHooks,
	settings: &FormSettings,
) -> String {
	let mut markup = format!("<blockquote>{}</blockquote>", kses_post(email_body));
	if settings.reuse_content_filter_for_success {
		markup = hooks.email_content.apply(markup, context);
	}
	markup = hooks.success_message.apply(markup, context);

	let mut html = kses_post(&markup);
	html.push('\n');
	html.push_str(HISTORY_REPLACE_SCRIPT);
	html
}
