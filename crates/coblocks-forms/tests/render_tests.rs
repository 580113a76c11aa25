//! Initial form rendering tests

mod common;

use coblocks_forms::{BlockRegistry, FieldType, FormAttributes, FormHooks, FormRequest, SubmissionOutcome};
use coblocks_mail::MemoryBackend;
use common::{CONTACT_FORM, Harness, settings};
use regex::Regex;
use rstest::rstest;

fn form_hash(html: &str) -> String {
	let re = Regex::new(r#"name="form-hash" value="([0-9a-f]{40})""#).unwrap();
	re.captures(html).expect("form-hash input")[1].to_string()
}

/// Test: Rendering the same definition twice embeds the same form hash
#[rstest]
#[tokio::test]
async fn test_form_hash_stable_across_renders() {
	// Arrange
	let harness = Harness::new();
	let request = FormRequest::get("https://example.com/contact/").unwrap();

	// Act
	let first = harness
		.processor
		.render_block(FormAttributes::new().with_to("x@y.com"), CONTACT_FORM, &request)
		.await
		.unwrap();
	let second = harness
		.processor
		.render_block(FormAttributes::new().with_to("x@y.com"), CONTACT_FORM, &request)
		.await
		.unwrap();

	// Assert
	assert_eq!(first.outcome, SubmissionOutcome::NotSubmitted);
	assert_eq!(form_hash(&first.html), form_hash(&second.html));
}

/// Test: The rendered form carries every field in document order
#[rstest]
#[tokio::test]
async fn test_fields_rendered_in_order() {
	let harness = Harness::new();
	let request = FormRequest::get("/contact/").unwrap();

	let rendered = harness
		.processor
		.render_block(FormAttributes::new(), CONTACT_FORM, &request)
		.await
		.unwrap();

	let html = rendered.html;
	let name = html.find("name=\"field-name[value]\"").unwrap();
	let email = html.find("name=\"field-email[value]\"").unwrap();
	let message = html.find("name=\"field-message[value]\"").unwrap();
	assert!(name < email && email < message);
	assert_eq!(html.matches("<small>(required)</small>").count(), 2);
}

/// Test: The required marker comes from settings and the label filter
#[rstest]
#[tokio::test]
async fn test_required_text_customized() {
	let hooks = FormHooks::new();
	hooks
		.label_required_text
		.add_filter(|text, label: &str| format!("{} ({})", text, label.to_lowercase()));
	let mut settings = settings();
	settings.forms.required_text = "*".to_string();
	let harness = Harness::with(settings, hooks, MemoryBackend::new());
	let request = FormRequest::get("/contact/").unwrap();

	let rendered = harness
		.processor
		.render_block(FormAttributes::new(), CONTACT_FORM, &request)
		.await
		.unwrap();

	assert!(rendered.html.contains("<small>* (name)</small>"));
	assert!(rendered.html.contains("<small>* (email)</small>"));
}

/// Test: Blocks registered from the registration action render as fields
#[rstest]
#[tokio::test]
async fn test_registered_block_renders_as_field() {
	// Arrange
	let hooks = FormHooks::new();
	hooks.register_form_blocks.add_action(|registry: &BlockRegistry| {
		registry
			.register_field("acme/field-phone", FieldType::Name)
			.expect("acme/field-phone registers");
	});
	let harness = Harness::with(settings(), hooks, MemoryBackend::new());
	let request = FormRequest::get("/contact/").unwrap();

	// Act
	let rendered = harness
		.processor
		.render_block(
			FormAttributes::new(),
			r#"<!-- wp:acme/field-phone {"label":"Phone"} /-->"#,
			&request,
		)
		.await
		.unwrap();

	// Assert
	assert!(rendered.html.contains("<input type=\"text\" id=\"phone\" name=\"field-phone[value]\" />"));
}

/// Test: Each render issues a nonce the processor accepts
#[rstest]
#[tokio::test]
async fn test_rendered_nonce_verifies() {
	let harness = Harness::new();
	let request = FormRequest::get("/contact/").unwrap().with_session("visitor-7");
	let form = harness
		.processor
		.definition(FormAttributes::new(), CONTACT_FORM)
		.unwrap();

	let html = harness.processor.render_initial(&form, &request);

	let re = Regex::new(r#"name="form-submit" value="([0-9a-f]{64})""#).unwrap();
	let nonce = re.captures(&html).unwrap()[1].to_string();
	assert!(
		harness
			.processor
			.nonces()
			.verify_nonce(&nonce, coblocks_forms::SUBMIT_ACTION, "visitor-7")
			.is_ok()
	);
}
