//! End-to-end submission tests against an in-memory outbox

mod common;

use coblocks_core::NonceError;
use coblocks_forms::{
	FormAttributes, FormHooks, FormSubmitted, HISTORY_REPLACE_SCRIPT, PostData, SubmissionContext,
	SubmissionOutcome, ValidationFailure,
};
use coblocks_mail::MemoryBackend;
use common::{CONTACT_FORM, Harness, alice, settings};
use parking_lot::Mutex;
use rstest::rstest;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Test: A genuine resubmission sends one HTML email and confirms
#[rstest]
#[tokio::test]
async fn test_submission_sends_list_in_post_order() {
	// Arrange
	let harness = Harness::new();
	let form = harness
		.processor
		.definition(FormAttributes::new(), CONTACT_FORM)
		.unwrap();
	let request = harness.submit("/contact/", &form, &alice());

	// Act
	let rendered = harness.processor.render(&form, &request).await;

	// Assert
	assert_eq!(rendered.outcome, SubmissionOutcome::Success);
	let messages = harness.outbox.messages();
	assert_eq!(messages.len(), 1);
	assert_eq!(
		messages[0].html_body(),
		Some("<ul><li>Name: Alice</li><li>Email: a@example.com</li></ul>")
	);
	assert!(rendered.html.starts_with("<blockquote><ul><li>Name: Alice</li>"));
	assert!(rendered.html.ends_with(HISTORY_REPLACE_SCRIPT));
}

/// Test: A POST for another form instance is ignored
#[rstest]
#[tokio::test]
async fn test_hash_mismatch_never_sends() {
	let harness = Harness::new();
	let form = harness
		.processor
		.definition(FormAttributes::new(), CONTACT_FORM)
		.unwrap();
	let other = harness
		.processor
		.definition(FormAttributes::new().with_subject("Other"), CONTACT_FORM)
		.unwrap();
	let request = harness.submit("/contact/", &other, &alice());

	let rendered = harness.processor.render(&form, &request).await;

	assert_eq!(rendered.outcome, SubmissionOutcome::NotSubmitted);
	assert_eq!(harness.outbox.count(), 0);
	assert!(rendered.html.contains(&format!("value=\"{}\"", form.hash())));
}

/// Test: A matching hash without a usable nonce or action sends nothing
#[rstest]
#[case("form-submit", "", ValidationFailure::MissingNonce)]
#[case(
	"form-submit",
	"0000000000000000000000000000000000000000000000000000000000000000",
	ValidationFailure::InvalidNonce(NonceError::Invalid)
)]
#[case("action", "something-else", ValidationFailure::ActionMismatch)]
#[tokio::test]
async fn test_rejected_submission_never_sends(
	#[case] key: &str,
	#[case] value: &str,
	#[case] expected: ValidationFailure,
) {
	// Arrange
	let harness = Harness::new();
	let form = harness
		.processor
		.definition(FormAttributes::new(), CONTACT_FORM)
		.unwrap();
	let mut pairs: Vec<(String, String)> = alice()
		.into_iter()
		.map(|(k, v)| (k.to_string(), v.to_string()))
		.collect();
	pairs.extend(
		harness
			.control_fields(&form)
			.into_iter()
			.map(|(k, v)| if k == key { (k, value.to_string()) } else { (k, v) }),
	);
	let request = coblocks_forms::FormRequest::get("/contact/")
		.unwrap()
		.with_post_data(PostData::from_pairs(pairs));

	// Act
	let rendered = harness.processor.render(&form, &request).await;

	// Assert
	assert_eq!(rendered.outcome, SubmissionOutcome::ValidationFailed(expected));
	assert_eq!(harness.outbox.count(), 0);
	assert!(rendered.html.contains("<form action="));
}

/// Test: The recipient defaults to the admin email and honors `to` verbatim
#[rstest]
#[case(FormAttributes::new(), "admin@example.com")]
#[case(FormAttributes::new().with_to("x@y.com"), "x@y.com")]
#[tokio::test]
async fn test_recipient(#[case] attributes: FormAttributes, #[case] expected: &str) {
	let harness = Harness::new();
	let form = harness.processor.definition(attributes, CONTACT_FORM).unwrap();
	let request = harness.submit("/contact/", &form, &alice());

	harness.processor.render(&form, &request).await;

	assert_eq!(harness.outbox.messages()[0].to(), [expected.to_string()]);
}

/// Test: The subject falls back to the site name, with the post title when known
#[rstest]
#[case("/contact/", FormAttributes::new(), "Acme")]
#[case("/contact/?post=42", FormAttributes::new(), "Acme - Contact Us")]
#[case("/contact/?post=999", FormAttributes::new(), "Acme")]
#[case("/contact/?post=42", FormAttributes::new().with_subject("  New <b>lead</b> "), "New lead")]
#[tokio::test]
async fn test_subject(
	#[case] url: &str,
	#[case] attributes: FormAttributes,
	#[case] expected: &str,
) {
	let harness = Harness::new();
	let form = harness.processor.definition(attributes, CONTACT_FORM).unwrap();
	let request = harness.submit(url, &form, &alice());

	harness.processor.render(&form, &request).await;

	assert_eq!(harness.outbox.messages()[0].subject(), expected);
}

/// Test: Required fields left empty are still sent
#[rstest]
#[tokio::test]
async fn test_empty_required_field_is_sent() {
	let harness = Harness::new();
	let form = harness
		.processor
		.definition(FormAttributes::new(), CONTACT_FORM)
		.unwrap();
	let request = harness.submit(
		"/contact/",
		&form,
		&[
			("field-name[label]", "Name"),
			("field-name[value]", ""),
			("field-email[label]", "Email"),
			("field-email[value]", ""),
		],
	);

	let rendered = harness.processor.render(&form, &request).await;

	assert_eq!(rendered.outcome, SubmissionOutcome::Success);
	assert_eq!(
		harness.outbox.messages()[0].html_body(),
		Some("<ul><li>Name: </li><li>Email: </li></ul>")
	);
}

/// Test: Malformed entries are skipped while the rest is sent
#[rstest]
#[tokio::test]
async fn test_malformed_entries_skipped() {
	let harness = Harness::new();
	let form = harness
		.processor
		.definition(FormAttributes::new(), CONTACT_FORM)
		.unwrap();
	let request = harness.submit(
		"/contact/",
		&form,
		&[
			("field-name[label]", "Name"),
			("field-name[value]", "Alice"),
			("field-email[value]", "orphan@example.com"),
			("utm_source", "newsletter"),
		],
	);

	let rendered = harness.processor.render(&form, &request).await;

	assert_eq!(rendered.outcome, SubmissionOutcome::Success);
	assert_eq!(
		harness.outbox.messages()[0].html_body(),
		Some("<ul><li>Name: Alice</li></ul>")
	);
}

/// Test: The email filters see the submission and post id
#[rstest]
#[tokio::test]
async fn test_email_filters_override_message() {
	// Arrange
	let hooks = FormHooks::new();
	hooks.email_to.add_filter(|to, ctx: &SubmissionContext| {
		match ctx.submission.value("email") {
			Some(email) if !email.is_empty() => email.to_string(),
			_ => to,
		}
	});
	hooks
		.email_subject
		.add_filter(|subject, ctx: &SubmissionContext| format!("[{:?}] {}", ctx.post_id, subject));
	hooks
		.email_content
		.add_filter(|content, _: &SubmissionContext| format!("<p>New message</p>{}", content));
	let harness = Harness::with(settings(), hooks, MemoryBackend::new());
	let form = harness
		.processor
		.definition(FormAttributes::new(), CONTACT_FORM)
		.unwrap();
	let request = harness.submit("/contact/?post=42", &form, &alice());

	// Act
	let rendered = harness.processor.render(&form, &request).await;

	// Assert
	let message = &harness.outbox.messages()[0];
	assert_eq!(message.to(), ["a@example.com".to_string()]);
	assert_eq!(message.subject(), "[Some(42)] Acme - Contact Us");
	assert!(message.html_body().unwrap().starts_with("<p>New message</p><ul>"));
	// The confirmation quotes the body before the content filter ran
	assert!(rendered.html.starts_with("<blockquote><ul>"));
}

/// Test: `coblocks_form_submit` reports whether the email was sent
#[rstest]
#[case(MemoryBackend::new(), true)]
#[case(MemoryBackend::failing("connection refused"), false)]
#[tokio::test]
async fn test_form_submit_action(#[case] outbox: MemoryBackend, #[case] expected_sent: bool) {
	// Arrange
	let hooks = FormHooks::new();
	let seen: Arc<Mutex<Vec<FormSubmitted>>> = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&seen);
	hooks
		.form_submit
		.add_action(move |event: &FormSubmitted| sink.lock().push(event.clone()));
	let harness = Harness::with(settings(), hooks, outbox);
	let form = harness
		.processor
		.definition(FormAttributes::new().with_to("x@y.com"), CONTACT_FORM)
		.unwrap();
	let request = harness.submit("/contact/?post=42", &form, &alice());

	// Act
	harness.processor.render(&form, &request).await;

	// Assert
	let seen = seen.lock();
	assert_eq!(seen.len(), 1);
	assert_eq!(seen[0].sent, expected_sent);
	assert_eq!(seen[0].post_id, Some(42));
	assert_eq!(seen[0].attributes.to.as_deref(), Some("x@y.com"));
	assert_eq!(seen[0].submission.fields().len(), 2);
}

/// Test: A transport failure re-renders the form and reports the reason
#[rstest]
#[tokio::test]
async fn test_send_failure_renders_form() {
	let harness = Harness::with(
		settings(),
		FormHooks::new(),
		MemoryBackend::failing("connection refused"),
	);
	let form = harness
		.processor
		.definition(FormAttributes::new(), CONTACT_FORM)
		.unwrap();
	let request = harness.submit("/contact/", &form, &alice());

	let rendered = harness.processor.render(&form, &request).await;

	let SubmissionOutcome::SendFailed(reason) = &rendered.outcome else {
		panic!("expected a send failure, got {:?}", rendered.outcome);
	};
	assert!(reason.contains("connection refused"));
	assert!(rendered.html.contains("<form action="));
	assert!(!rendered.html.contains("<blockquote>"));
}

/// Test: The success view has its own filter unless reuse is configured
#[rstest]
#[case(false, 1, "<p>Thank you!</p>")]
#[case(true, 2, "<p>Thank you!</p>")]
#[tokio::test]
async fn test_success_message_filters(
	#[case] reuse: bool,
	#[case] expected_content_calls: usize,
	#[case] expected_prefix: &str,
) {
	// Arrange
	let hooks = FormHooks::new();
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&calls);
	hooks.email_content.add_filter(move |content, _: &SubmissionContext| {
		counter.fetch_add(1, Ordering::SeqCst);
		content
	});
	hooks
		.success_message
		.add_filter(|markup, _: &SubmissionContext| format!("<p>Thank you!</p>{}", markup));
	let mut settings = settings();
	settings.forms.reuse_content_filter_for_success = reuse;
	let harness = Harness::with(settings, hooks, MemoryBackend::new());
	let form = harness
		.processor
		.definition(FormAttributes::new(), CONTACT_FORM)
		.unwrap();
	let request = harness.submit("/contact/", &form, &alice());

	// Act
	let rendered = harness.processor.render(&form, &request).await;

	// Assert
	assert_eq!(calls.load(Ordering::SeqCst), expected_content_calls);
	assert!(rendered.html.starts_with(expected_prefix));
}

/// Test: Concurrent submissions through one processor are independent
#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions() {
	let harness = Arc::new(Harness::new());
	let form = Arc::new(
		harness
			.processor
			.definition(FormAttributes::new(), CONTACT_FORM)
			.unwrap(),
	);

	let mut handles = Vec::new();
	for i in 0..8 {
		let harness = Arc::clone(&harness);
		let form = Arc::clone(&form);
		handles.push(tokio::spawn(async move {
			let name = format!("Visitor {}", i);
			let request = harness.submit(
				"/contact/",
				&form,
				&[("field-name[label]", "Name"), ("field-name[value]", name.as_str())],
			);
			harness.processor.render(&form, &request).await.outcome
		}));
	}

	for handle in handles {
		assert_eq!(handle.await.unwrap(), SubmissionOutcome::Success);
	}
	assert_eq!(harness.outbox.count(), 8);
}

/// Test: Without a configured sender the mail goes out from the admin address
#[rstest]
#[tokio::test]
async fn test_default_settings_send_from_admin() {
	// Arrange
	let harness = Harness::new();
	assert!(harness.processor.settings().email.from_email.is_empty());
	let form = harness
		.processor
		.definition(FormAttributes::new(), CONTACT_FORM)
		.unwrap();
	let request = harness.submit("/contact/", &form, &alice());

	// Act
	let rendered = harness.processor.render(&form, &request).await;

	// Assert
	assert_eq!(rendered.outcome, SubmissionOutcome::Success);
	let message = &harness.outbox.messages()[0];
	assert_eq!(message.from_email(), "admin@example.com");
	assert_eq!(message.reply_to(), ["a@example.com".to_string()]);
}

/// Test: The plain-text part shows submitted characters, not entities
#[rstest]
#[tokio::test]
async fn test_plain_text_part_keeps_submitted_characters() {
	let harness = Harness::new();
	let form = harness
		.processor
		.definition(FormAttributes::new(), CONTACT_FORM)
		.unwrap();
	let request = harness.submit(
		"/contact/",
		&form,
		&[
			("field-name[label]", "Name"),
			("field-name[value]", "Tom & Jerry O'Brien"),
		],
	);

	let rendered = harness.processor.render(&form, &request).await;

	assert_eq!(rendered.outcome, SubmissionOutcome::Success);
	let message = &harness.outbox.messages()[0];
	assert_eq!(
		message.html_body(),
		Some("<ul><li>Name: Tom &amp; Jerry O&#x27;Brien</li></ul>")
	);
	assert_eq!(message.body(), "Name: Tom & Jerry O'Brien");
}

/// Test: A recipient filter may return a comma-separated list
#[rstest]
#[tokio::test]
async fn test_recipient_filter_returns_several_addresses() {
	let hooks = FormHooks::new();
	hooks
		.email_to
		.add_filter(|to, _: &SubmissionContext| format!("{}, sales@example.com", to));
	let harness = Harness::with(settings(), hooks, MemoryBackend::new());
	let form = harness
		.processor
		.definition(FormAttributes::new(), CONTACT_FORM)
		.unwrap();
	let request = harness.submit("/contact/", &form, &alice());

	let rendered = harness.processor.render(&form, &request).await;

	assert_eq!(rendered.outcome, SubmissionOutcome::Success);
	assert_eq!(
		harness.outbox.messages()[0].to(),
		["admin@example.com".to_string(), "sales@example.com".to_string()]
	);
}
