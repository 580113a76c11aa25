//! Shared helpers for form integration tests

#![allow(dead_code)]

use coblocks_conf::Settings;
use coblocks_forms::{
	FormDefinition, FormHooks, FormProcessor, FormRequest, PostData, StaticPostLookup, SUBMIT_ACTION,
};
use coblocks_mail::MemoryBackend;
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Install a subscriber honoring `RUST_LOG`, once per test binary
pub fn init_tracing() {
	TRACING.call_once(|| {
		let _ = tracing_subscriber::fmt()
			.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
			.with_test_writer()
			.try_init();
	});
}

pub const CONTACT_FORM: &str = concat!(
	"<!-- wp:coblocks/field-name {\"required\":true} /-->\n",
	"<!-- wp:coblocks/field-email {\"required\":true} /-->\n",
	"<!-- wp:coblocks/field-textarea /-->",
);

pub fn settings() -> Settings {
	let mut settings = Settings::default();
	settings.site.name = "Acme".to_string();
	settings.site.admin_email = "admin@example.com".to_string();
	settings.security.nonce_secret = "integration-test-secret-0123456789abcdef".to_string();
	settings
}

pub struct Harness {
	pub processor: FormProcessor,
	pub outbox: Arc<MemoryBackend>,
}

impl Harness {
	pub fn new() -> Self {
		Self::with(settings(), FormHooks::new(), MemoryBackend::new())
	}

	pub fn with(settings: Settings, hooks: FormHooks, outbox: MemoryBackend) -> Self {
		init_tracing();
		let outbox = Arc::new(outbox);
		let processor = FormProcessor::builder(settings)
			.hooks(hooks)
			.backend(outbox.clone())
			.posts(Arc::new(StaticPostLookup::new().with_post(42, "Contact Us")))
			.build()
			.expect("processor builds");
		Self { processor, outbox }
	}

	pub fn nonce(&self) -> String {
		self.processor.nonces().create_nonce(SUBMIT_ACTION, "")
	}

	/// Control fields of a genuine resubmission of `form`
	pub fn control_fields(&self, form: &FormDefinition) -> Vec<(String, String)> {
		vec![
			("form-submit".to_string(), self.nonce()),
			("_wp_http_referer".to_string(), "/contact/".to_string()),
			("action".to_string(), SUBMIT_ACTION.to_string()),
			("form-hash".to_string(), form.hash().to_string()),
		]
	}

	/// A POST to `url` with the given field entries followed by the control fields
	pub fn submit(&self, url: &str, form: &FormDefinition, fields: &[(&str, &str)]) -> FormRequest {
		let mut pairs: Vec<(String, String)> = fields
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		pairs.extend(self.control_fields(form));
		FormRequest::get(url)
			.expect("valid url")
			.with_post_data(PostData::from_pairs(pairs))
	}
}

pub fn alice() -> Vec<(&'static str, &'static str)> {
	vec![
		("field-name[label]", "Name"),
		("field-name[value]", "Alice"),
		("field-email[label]", "Email"),
		("field-email[value]", "a@example.com"),
	]
}
