//! Form block attributes

use crate::error::{FormError, FormResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attributes of a `coblocks/form` block
///
/// Known keys are typed; anything else the editor stores is kept in `extra`
/// so it still contributes to the form instance hash. Serialization is
/// deterministic: known keys in declaration order, unset keys omitted, extra
/// keys sorted.
///
/// # Examples
///
/// ```
/// use coblocks_forms::FormAttributes;
///
/// let attributes = FormAttributes::from_json_str(
///     r#"{"to":"sales@example.com","submitButtonText":"Send","align":"wide"}"#,
/// ).unwrap();
///
/// assert_eq!(attributes.to.as_deref(), Some("sales@example.com"));
/// assert_eq!(attributes.submit_button_text.as_deref(), Some("Send"));
/// assert_eq!(attributes.extra["align"], "wide");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormAttributes {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub to: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub subject: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub submit_button_text: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub submit_button_classes: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub custom_background_button_color: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub custom_text_button_color: Option<String>,
	#[serde(flatten)]
	pub extra: BTreeMap<String, serde_json::Value>,
}

impl FormAttributes {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_json_str(json: &str) -> FormResult<Self> {
		serde_json::from_str(json).map_err(|e| FormError::InvalidAttributes(e.to_string()))
	}

	pub fn from_value(value: serde_json::Value) -> FormResult<Self> {
		serde_json::from_value(value).map_err(|e| FormError::InvalidAttributes(e.to_string()))
	}

	/// Canonical JSON used for the form instance hash
	pub fn to_canonical_json(&self) -> FormResult<String> {
		serde_json::to_string(self).map_err(|e| FormError::InvalidAttributes(e.to_string()))
	}

	pub fn with_to(mut self, to: impl Into<String>) -> Self {
		self.to = Some(to.into());
		self
	}

	pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
		self.subject = Some(subject.into());
		self
	}

	pub fn with_submit_button_text(mut self, text: impl Into<String>) -> Self {
		self.submit_button_text = Some(text.into());
		self
	}

	pub fn with_submit_button_classes(mut self, classes: impl Into<String>) -> Self {
		self.submit_button_classes = Some(classes.into());
		self
	}

	pub fn with_button_colors(
		mut self,
		background: Option<impl Into<String>>,
		text: Option<impl Into<String>>,
	) -> Self {
		self.custom_background_button_color = background.map(Into::into);
		self.custom_text_button_color = text.map(Into::into);
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_unset_keys_are_omitted() {
		let attributes = FormAttributes::new().with_to("x@y.com");

		assert_eq!(attributes.to_canonical_json().unwrap(), r#"{"to":"x@y.com"}"#);
	}

	#[rstest]
	fn test_extra_keys_sorted() {
		let a = FormAttributes::from_json_str(r#"{"zeta":1,"alpha":2,"subject":"Hi"}"#).unwrap();
		let b = FormAttributes::from_json_str(r#"{"alpha":2,"subject":"Hi","zeta":1}"#).unwrap();

		assert_eq!(a, b);
		assert_eq!(
			a.to_canonical_json().unwrap(),
			r#"{"subject":"Hi","alpha":2,"zeta":1}"#
		);
	}

	#[rstest]
	fn test_camel_case_keys() {
		let attributes = FormAttributes::new()
			.with_submit_button_classes("wp-block-button__link")
			.with_button_colors(Some("#000"), None::<String>);

		let json = attributes.to_canonical_json().unwrap();

		assert!(json.contains(r#""submitButtonClasses":"wp-block-button__link""#));
		assert!(json.contains(r##""customBackgroundButtonColor":"#000""##));
		assert!(!json.contains("customTextButtonColor"));
	}

	#[rstest]
	#[case("[]")]
	#[case(r#"{"to": 5}"#)]
	#[case("{")]
	fn test_invalid_json(#[case] json: &str) {
		assert!(matches!(
			FormAttributes::from_json_str(json),
			Err(FormError::InvalidAttributes(_))
		));
	}
}
