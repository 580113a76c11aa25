//! Form definitions and the form instance hash

use crate::attributes::FormAttributes;
use crate::blocks::{ContentSegment, parse_blocks};
use crate::error::FormResult;
use crate::fields::{FieldEntry, SlugAllocator};
use crate::registry::BlockRegistry;
use sha1::{Digest, Sha1};

/// Fingerprint of a form's attributes and inner content
///
/// `sha1(canonical_json(attributes) + inner_content)` as 40 lowercase hex
/// characters. A POST carrying this value was produced by markup rendered
/// from exactly this definition.
///
/// # Examples
///
/// ```
/// use coblocks_forms::{FormAttributes, form_instance_hash};
///
/// let attributes = FormAttributes::new().with_subject("Hello");
/// let first = form_instance_hash(&attributes, "<!-- wp:coblocks/field-name /-->").unwrap();
/// let second = form_instance_hash(&attributes, "<!-- wp:coblocks/field-name /-->").unwrap();
///
/// assert_eq!(first, second);
/// assert_eq!(first.len(), 40);
/// ```
pub fn form_instance_hash(attributes: &FormAttributes, inner_content: &str) -> FormResult<String> {
	let mut hasher = Sha1::new();
	hasher.update(attributes.to_canonical_json()?.as_bytes());
	hasher.update(inner_content.as_bytes());
	Ok(hex::encode(hasher.finalize()))
}

/// A form block as stored by the editor, with its content parsed
#[derive(Debug, Clone, PartialEq)]
pub struct FormDefinition {
	pub attributes: FormAttributes,
	pub inner_content: String,
	pub segments: Vec<ContentSegment>,
	hash: String,
}

impl FormDefinition {
	pub fn new(
		attributes: FormAttributes,
		inner_content: impl Into<String>,
		registry: &BlockRegistry,
	) -> FormResult<Self> {
		let inner_content = inner_content.into();
		let segments = parse_blocks(&inner_content, registry)?;
		let hash = form_instance_hash(&attributes, &inner_content)?;
		Ok(Self {
			attributes,
			inner_content,
			segments,
			hash,
		})
	}

	/// Build from the attribute JSON the editor stores in the block delimiter
	pub fn from_json(
		attributes_json: &str,
		inner_content: impl Into<String>,
		registry: &BlockRegistry,
	) -> FormResult<Self> {
		Self::new(FormAttributes::from_json_str(attributes_json)?, inner_content, registry)
	}

	pub fn hash(&self) -> &str {
		&self.hash
	}

	/// Field entries in document order, with slugs unique within the form
	pub fn fields(&self) -> Vec<FieldEntry> {
		let mut slugs = SlugAllocator::new();
		self.segments
			.iter()
			.filter_map(|segment| match segment {
				ContentSegment::Field(kind) => Some(FieldEntry::new(kind.clone(), &mut slugs)),
				ContentSegment::Html(_) => None,
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::hooks::FormHooks;
	use proptest::prelude::*;
	use rstest::{fixture, rstest};

	#[fixture]
	fn registry() -> BlockRegistry {
		BlockRegistry::with_form_blocks(&FormHooks::new())
	}

	#[rstest]
	fn test_hash_matches_sha1_of_json_and_content() {
		// sha1("{}") computed independently
		let hash = form_instance_hash(&FormAttributes::new(), "").unwrap();

		assert_eq!(hash, "bf21a9e8fbc5a3846fb05b4fa0859e0917b2202f");
	}

	#[rstest]
	fn test_hash_changes_with_content_and_attributes(registry: BlockRegistry) {
		let base = FormDefinition::new(FormAttributes::new(), "a", &registry).unwrap();
		let other_content = FormDefinition::new(FormAttributes::new(), "b", &registry).unwrap();
		let other_attrs =
			FormDefinition::new(FormAttributes::new().with_to("x@y.com"), "a", &registry).unwrap();

		assert_ne!(base.hash(), other_content.hash());
		assert_ne!(base.hash(), other_attrs.hash());
	}

	#[rstest]
	fn test_fields_get_unique_slugs(registry: BlockRegistry) {
		let definition = FormDefinition::new(
			FormAttributes::new(),
			"<!-- wp:coblocks/field-email /--><!-- wp:coblocks/field-email /-->",
			&registry,
		)
		.unwrap();

		let slugs: Vec<_> = definition.fields().into_iter().map(|f| f.slug).collect();

		assert_eq!(slugs, vec!["email", "email-2"]);
	}

	proptest! {
		#[test]
		fn prop_hash_is_deterministic(
			to in proptest::option::of("[a-z]{1,8}@[a-z]{1,8}\\.com"),
			subject in proptest::option::of(".{0,20}"),
			content in ".{0,200}",
		) {
			let mut attributes = FormAttributes::new();
			attributes.to = to;
			attributes.subject = subject;

			let first = form_instance_hash(&attributes, &content).unwrap();
			let second = form_instance_hash(&attributes.clone(), &content).unwrap();

			prop_assert_eq!(&first, &second);
			prop_assert_eq!(first.len(), 40);
			prop_assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
		}
	}
}
