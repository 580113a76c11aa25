//! Field blocks and field rendering

use crate::error::{FormError, FormResult};
use crate::hooks::FormHooks;
use coblocks_core::sanitize::{escape_attr, escape_html, slugify};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write;

/// Kind of a field block, without its attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
	Name,
	Email,
	Textarea,
	Radio,
}

impl FieldType {
	/// Label used when the block does not set one
	pub fn default_label(&self) -> &'static str {
		match self {
			Self::Name => "Name",
			Self::Email => "Email",
			Self::Textarea => "Message",
			Self::Radio => "Choose one",
		}
	}
}

/// Attributes shared by every field block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAttributes {
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub required: bool,
}

/// Attributes of a multiple-choice field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadioAttributes {
	#[serde(flatten)]
	pub field: FieldAttributes,
	#[serde(default)]
	pub options: Vec<String>,
	#[serde(default)]
	pub is_inline: bool,
}

/// A field block with its typed attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
	Name(FieldAttributes),
	Email(FieldAttributes),
	Textarea(FieldAttributes),
	Radio(RadioAttributes),
}

impl FieldKind {
	/// Decode block attributes for `field_type`
	///
	/// `null` or a missing attribute object means all defaults.
	pub fn from_attributes(
		field_type: FieldType,
		block: &str,
		attributes: Option<serde_json::Value>,
	) -> FormResult<Self> {
		let value = match attributes {
			Some(serde_json::Value::Null) | None => serde_json::Value::Object(Default::default()),
			Some(value) => value,
		};
		let invalid = |e: serde_json::Error| FormError::InvalidBlock {
			block: block.to_string(),
			reason: e.to_string(),
		};

		Ok(match field_type {
			FieldType::Name => Self::Name(serde_json::from_value(value).map_err(invalid)?),
			FieldType::Email => Self::Email(serde_json::from_value(value).map_err(invalid)?),
			FieldType::Textarea => Self::Textarea(serde_json::from_value(value).map_err(invalid)?),
			FieldType::Radio => Self::Radio(serde_json::from_value(value).map_err(invalid)?),
		})
	}

	pub fn field_type(&self) -> FieldType {
		match self {
			Self::Name(_) => FieldType::Name,
			Self::Email(_) => FieldType::Email,
			Self::Textarea(_) => FieldType::Textarea,
			Self::Radio(_) => FieldType::Radio,
		}
	}

	pub fn attributes(&self) -> &FieldAttributes {
		match self {
			Self::Name(attrs) | Self::Email(attrs) | Self::Textarea(attrs) => attrs,
			Self::Radio(radio) => &radio.field,
		}
	}

	/// The configured label, or the kind's default label
	pub fn label(&self) -> &str {
		self.attributes()
			.label
			.as_deref()
			.filter(|label| !label.is_empty())
			.unwrap_or_else(|| self.field_type().default_label())
	}

	pub fn required(&self) -> bool {
		self.attributes().required
	}
}

/// Hands out slugs that are unique within one form
///
/// The first field labelled "Email" gets `email`, the second `email-2`.
#[derive(Debug, Default)]
pub struct SlugAllocator {
	seen: HashMap<String, usize>,
}

impl SlugAllocator {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn allocate(&mut self, label: &str) -> String {
		let mut base = slugify(label);
		if base.is_empty() {
			base = "field".to_string();
		}
		let mut count = self.seen.get(&base).copied().unwrap_or(0);
		loop {
			count += 1;
			let candidate = if count == 1 {
				base.clone()
			} else {
				format!("{}-{}", base, count)
			};
			// A literal label such as "Email 2" can already own the suffixed slug
			if count == 1 || !self.seen.contains_key(&candidate) {
				self.seen.insert(base.clone(), count);
				if count > 1 {
					self.seen.insert(candidate.clone(), 1);
				}
				return candidate;
			}
		}
	}
}

/// A field as placed in a rendered form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEntry {
	pub slug: String,
	pub label: String,
	pub required: bool,
	pub kind: FieldKind,
}

impl FieldEntry {
	pub fn new(kind: FieldKind, slugs: &mut SlugAllocator) -> Self {
		let label = kind.label().to_string();
		Self {
			slug: slugs.allocate(&label),
			required: kind.required(),
			label,
			kind,
		}
	}

	/// POST key for the submitted value
	pub fn value_name(&self) -> String {
		format!("field-{}[value]", self.slug)
	}

	/// POST key for the echoed label
	pub fn label_name(&self) -> String {
		format!("field-{}[label]", self.slug)
	}

	/// Render the label, the hidden label input and the control
	///
	/// `required_text` is the marker shown next to required labels before the
	/// `coblocks_form_label_required_text` filter runs.
	pub fn render(&self, hooks: &FormHooks, required_text: &str) -> String {
		let mut html = self.render_label(hooks, required_text);
		html.push('\n');
		html.push_str(&self.render_control());
		html
	}

	fn render_label(&self, hooks: &FormHooks, required_text: &str) -> String {
		let slug = escape_attr(&self.slug);
		let required_label = if self.required {
			let text = hooks
				.label_required_text
				.apply(required_text.to_string(), self.label.as_str());
			format!(r#" <span class="required"><small>{}</small></span>"#, text)
		} else {
			String::new()
		};

		format!(
			"<label for=\"{slug}\">{label}{required_label}</label>\n<input type=\"hidden\" name=\"{name}\" value=\"{value}\">",
			slug = slug,
			label = escape_html(&self.label),
			required_label = required_label,
			name = escape_attr(&self.label_name()),
			value = escape_attr(&self.label),
		)
	}

	fn render_control(&self) -> String {
		let id = escape_attr(&self.slug);
		let name = escape_attr(&self.value_name());
		let required = if self.required { " required" } else { "" };

		match &self.kind {
			FieldKind::Name(_) => {
				format!(r#"<input type="text" id="{id}" name="{name}"{required} />"#)
			}
			FieldKind::Email(_) => {
				format!(r#"<input type="email" id="{id}" name="{name}"{required} />"#)
			}
			FieldKind::Textarea(_) => {
				format!(r#"<textarea name="{name}" id="{id}" rows="20"{required}></textarea>"#)
			}
			FieldKind::Radio(radio) => {
				let class = if radio.is_inline {
					"coblocks-field--radio is-inline"
				} else {
					"coblocks-field--radio"
				};
				let mut html = format!(r#"<div class="{class}">"#);
				for (index, option) in radio.options.iter().filter(|o| !o.is_empty()).enumerate() {
					let option_id = format!("{}-{}", id, index + 1);
					let _ = write!(
						html,
						r#"<input type="radio" id="{option_id}" name="{name}" value="{value}"{required} /><label for="{option_id}">{text}</label>"#,
						value = escape_attr(option),
						text = escape_html(option),
					);
				}
				html.push_str("</div>");
				html
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use rstest::rstest;
	use serde_json::json;
	use std::collections::HashSet;

	fn attrs(label: Option<&str>, required: bool) -> FieldAttributes {
		FieldAttributes {
			label: label.map(str::to_string),
			required,
		}
	}

	#[rstest]
	#[case(FieldType::Name, "Name")]
	#[case(FieldType::Email, "Email")]
	#[case(FieldType::Textarea, "Message")]
	#[case(FieldType::Radio, "Choose one")]
	fn test_default_labels(#[case] field_type: FieldType, #[case] expected: &str) {
		let kind = FieldKind::from_attributes(field_type, "test", None).unwrap();

		assert_eq!(kind.label(), expected);
		assert!(!kind.required());
	}

	#[rstest]
	fn test_radio_attributes() {
		let kind = FieldKind::from_attributes(
			FieldType::Radio,
			"coblocks/field-radio",
			Some(json!({"label": "Color", "required": true, "options": ["Red", "Blue"], "isInline": true})),
		)
		.unwrap();

		let FieldKind::Radio(radio) = &kind else {
			panic!("expected a radio field");
		};
		assert_eq!(radio.options, vec!["Red", "Blue"]);
		assert!(radio.is_inline);
		assert_eq!(kind.label(), "Color");
		assert!(kind.required());
	}

	#[rstest]
	fn test_invalid_attributes() {
		let result = FieldKind::from_attributes(
			FieldType::Email,
			"coblocks/field-email",
			Some(json!({"required": "yes"})),
		);

		assert!(matches!(result, Err(FormError::InvalidBlock { block, .. }) if block == "coblocks/field-email"));
	}

	#[rstest]
	fn test_slugs_are_unique() {
		let mut slugs = SlugAllocator::new();

		assert_eq!(slugs.allocate("Email"), "email");
		assert_eq!(slugs.allocate("Email"), "email-2");
		assert_eq!(slugs.allocate("Email 3"), "email-3");
		assert_eq!(slugs.allocate("Email"), "email-4");
		assert_eq!(slugs.allocate("Your Name!"), "your-name");
		assert_eq!(slugs.allocate("???"), "field");
		assert_eq!(slugs.allocate(""), "field-2");
	}

	#[rstest]
	fn test_render_required_email() {
		// Arrange
		let hooks = FormHooks::new();
		let mut slugs = SlugAllocator::new();
		let entry = FieldEntry::new(FieldKind::Email(attrs(None, true)), &mut slugs);

		// Act
		let html = entry.render(&hooks, "(required)");

		// Assert
		assert_eq!(
			html,
			concat!(
				"<label for=\"email\">Email <span class=\"required\"><small>(required)</small></span></label>\n",
				"<input type=\"hidden\" name=\"field-email[label]\" value=\"Email\">\n",
				"<input type=\"email\" id=\"email\" name=\"field-email[value]\" required />"
			)
		);
	}

	#[rstest]
	fn test_render_escapes_label() {
		let hooks = FormHooks::new();
		let mut slugs = SlugAllocator::new();
		let entry = FieldEntry::new(
			FieldKind::Name(attrs(Some("<b>Full \"name\"</b>"), false)),
			&mut slugs,
		);

		let html = entry.render(&hooks, "(required)");

		assert!(html.contains("&lt;b&gt;Full"));
		assert!(!html.contains("<b>"));
		assert!(html.contains(r#"<input type="text" id="full-name" name="field-full-name[value]" />"#));
	}

	#[rstest]
	fn test_required_text_filter_receives_label() {
		let hooks = FormHooks::new();
		hooks
			.label_required_text
			.add_filter(|text, label: &str| format!("{} for {}", text, label));
		let mut slugs = SlugAllocator::new();
		let entry = FieldEntry::new(FieldKind::Textarea(attrs(Some("Comments"), true)), &mut slugs);

		let html = entry.render(&hooks, "*");

		assert!(html.contains("<small>* for Comments</small>"));
		assert!(html.contains(r#"rows="20" required></textarea>"#));
	}

	#[rstest]
	fn test_render_radio_options() {
		let hooks = FormHooks::new();
		let mut slugs = SlugAllocator::new();
		let kind = FieldKind::Radio(RadioAttributes {
			field: attrs(Some("Plan"), false),
			options: vec!["Basic".into(), String::new(), "Pro & Co".into()],
			is_inline: false,
		});
		let entry = FieldEntry::new(kind, &mut slugs);

		let html = entry.render(&hooks, "(required)");

		assert!(html.contains(r#"<input type="radio" id="plan-1" name="field-plan[value]" value="Basic" />"#));
		assert!(html.contains(r#"value="Pro &amp; Co""#));
		assert!(!html.contains("plan-3"));
	}

	proptest! {
		#[test]
		fn prop_allocated_slugs_unique(labels in proptest::collection::vec("[A-Za-z0-9 _.!-]{0,12}", 0..24)) {
			let mut slugs = SlugAllocator::new();
			let mut seen = HashSet::new();

			for label in &labels {
				let slug = slugs.allocate(label);
				prop_assert!(!slug.is_empty());
				prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
				prop_assert!(seen.insert(slug.clone()), "duplicate slug {}", slug);
			}
		}
	}
}
