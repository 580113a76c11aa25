//! Submitted field extraction and the email body

use crate::error::FormError;
use crate::request::PostData;
use coblocks_core::sanitize::{escape_html, sanitize_text_field};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn field_key_pattern() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| {
		Regex::new(r"^field-([^\[\]]+)\[(label|value)\]$").expect("valid field key pattern")
	})
}

/// One submitted field, sanitized as plain text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedField {
	pub slug: String,
	pub label: String,
	pub value: String,
}

/// An entry that was skipped during extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedEntry {
	pub key: String,
	pub reason: String,
}

impl From<MalformedEntry> for FormError {
	fn from(entry: MalformedEntry) -> Self {
		FormError::MalformedSubmission {
			key: entry.key,
			reason: entry.reason,
		}
	}
}

/// Fields extracted from one POST, in the order they were submitted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
	fields: Vec<SubmittedField>,
	malformed: Vec<MalformedEntry>,
}

#[derive(Default)]
struct PartialField {
	key: String,
	label: Option<String>,
	value: Option<String>,
}

impl Submission {
	/// Extract `field-<slug>[label]` / `field-<slug>[value]` pairs
	///
	/// Control fields are ignored. Fields are ordered by the first entry
	/// seen for their slug. Entries that do not fit the pattern, and slugs
	/// lacking a label or a value, are logged and recorded as malformed
	/// instead of aborting extraction.
	///
	/// # Examples
	///
	/// ```
	/// use coblocks_forms::{PostData, Submission};
	///
	/// let post = PostData::from_pairs([
	///     ("field-name[label]", "Name"),
	///     ("field-name[value]", "Alice"),
	///     ("stray", "x"),
	/// ]);
	/// let submission = Submission::extract(&post);
	///
	/// assert_eq!(submission.email_body(), "<ul><li>Name: Alice</li></ul>");
	/// assert_eq!(submission.malformed().len(), 1);
	/// ```
	pub fn extract(post: &PostData) -> Self {
		let mut order: Vec<String> = Vec::new();
		let mut partial: HashMap<String, PartialField> = HashMap::new();
		let mut malformed = Vec::new();

		for (key, value) in post.field_entries() {
			let Some(caps) = field_key_pattern().captures(key) else {
				malformed.push(MalformedEntry {
					key: key.to_string(),
					reason: "expected field-<slug>[label] or field-<slug>[value]".to_string(),
				});
				continue;
			};

			let slug = caps[1].to_string();
			let entry = partial.entry(slug.clone()).or_insert_with(|| {
				order.push(slug.clone());
				PartialField {
					key: format!("field-{}", slug),
					..PartialField::default()
				}
			});
			match &caps[2] {
				"label" => entry.label = Some(sanitize_text_field(value)),
				_ => entry.value = Some(sanitize_text_field(value)),
			}
		}

		let mut fields = Vec::with_capacity(order.len());
		for slug in order {
			let Some(field) = partial.remove(&slug) else {
				continue;
			};
			match (field.label, field.value) {
				(Some(label), Some(value)) => fields.push(SubmittedField { slug, label, value }),
				(None, _) => malformed.push(MalformedEntry {
					key: field.key,
					reason: "missing label".to_string(),
				}),
				(_, None) => malformed.push(MalformedEntry {
					key: field.key,
					reason: "missing value".to_string(),
				}),
			}
		}

		for entry in &malformed {
			tracing::warn!(key = %entry.key, reason = %entry.reason, "skipping malformed form entry");
		}

		Self { fields, malformed }
	}

	pub fn from_fields(fields: Vec<SubmittedField>) -> Self {
		Self {
			fields,
			malformed: Vec::new(),
		}
	}

	pub fn fields(&self) -> &[SubmittedField] {
		&self.fields
	}

	pub fn malformed(&self) -> &[MalformedEntry] {
		&self.malformed
	}

	/// Value submitted for `slug`
	pub fn value(&self, slug: &str) -> Option<&str> {
		self.fields
			.iter()
			.find(|field| field.slug == slug)
			.map(|field| field.value.as_str())
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	/// `<ul><li>label: value</li>...</ul>`
	pub fn email_body(&self) -> String {
		let mut body = String::from("<ul>");
		for field in &self.fields {
			body.push_str("<li>");
			body.push_str(&escape_html(&field.label));
			body.push_str(": ");
			body.push_str(&escape_html(&field.value));
			body.push_str("</li>");
		}
		body.push_str("</ul>");
		body
	}
}
