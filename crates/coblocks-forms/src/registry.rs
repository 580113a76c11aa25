//! Block type registry

use crate::error::{FormError, FormResult};
use crate::fields::FieldType;
use crate::hooks::FormHooks;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

pub const FORM_BLOCK: &str = "coblocks/form";
pub const NAME_FIELD_BLOCK: &str = "coblocks/field-name";
pub const EMAIL_FIELD_BLOCK: &str = "coblocks/field-email";
pub const TEXTAREA_FIELD_BLOCK: &str = "coblocks/field-textarea";
pub const RADIO_FIELD_BLOCK: &str = "coblocks/field-radio";

/// What a registered block renders as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
	Form,
	Field(FieldType),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockType {
	pub name: String,
	pub kind: BlockKind,
	/// Block this one may only appear inside
	pub parent: Option<String>,
}

fn block_name_pattern() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| {
		Regex::new(r"^[a-z][a-z0-9-]*/[a-z][a-z0-9-]*$").expect("valid block name pattern")
	})
}

/// Known block types, shared between clones
///
/// # Examples
///
/// ```
/// use coblocks_forms::{BlockRegistry, FieldType, FormHooks};
///
/// let registry = BlockRegistry::with_form_blocks(&FormHooks::new());
///
/// assert_eq!(registry.field_type("coblocks/field-email"), Some(FieldType::Email));
/// assert!(registry.is_registered("coblocks/form"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct BlockRegistry {
	blocks: Arc<RwLock<BTreeMap<String, BlockType>>>,
}

impl BlockRegistry {
	/// An empty registry
	pub fn new() -> Self {
		Self::default()
	}

	/// A registry holding the form block and its field blocks
	pub fn with_form_blocks(hooks: &FormHooks) -> Self {
		let registry = Self::new();
		registry.register_form_blocks(hooks);
		registry
	}

	/// Register the form block and its field blocks, then fire
	/// `coblocks_register_form_blocks`
	///
	/// Blocks that are already registered are left as they are.
	pub fn register_form_blocks(&self, hooks: &FormHooks) {
		let defaults = [
			(FORM_BLOCK, BlockKind::Form, None),
			(NAME_FIELD_BLOCK, BlockKind::Field(FieldType::Name), Some(FORM_BLOCK)),
			(EMAIL_FIELD_BLOCK, BlockKind::Field(FieldType::Email), Some(FORM_BLOCK)),
			(TEXTAREA_FIELD_BLOCK, BlockKind::Field(FieldType::Textarea), Some(FORM_BLOCK)),
			(RADIO_FIELD_BLOCK, BlockKind::Field(FieldType::Radio), Some(FORM_BLOCK)),
		];

		{
			let mut blocks = self.blocks.write();
			for (name, kind, parent) in defaults {
				blocks.entry(name.to_string()).or_insert_with(|| BlockType {
					name: name.to_string(),
					kind,
					parent: parent.map(str::to_string),
				});
			}
		}

		tracing::debug!(blocks = self.len(), "form blocks registered");
		hooks.register_form_blocks.fire(self);
	}

	/// Register a block type
	///
	/// Fails when the name is not `namespace/name` or is already taken.
	pub fn register(&self, block: BlockType) -> FormResult<()> {
		if !block_name_pattern().is_match(&block.name) {
			return Err(FormError::InvalidBlock {
				block: block.name,
				reason: "block names must look like namespace/name".to_string(),
			});
		}

		let mut blocks = self.blocks.write();
		if blocks.contains_key(&block.name) {
			return Err(FormError::InvalidBlock {
				block: block.name,
				reason: "block type is already registered".to_string(),
			});
		}
		blocks.insert(block.name.clone(), block);
		Ok(())
	}

	/// Register `name` as another spelling of a field kind inside the form
	pub fn register_field(&self, name: impl Into<String>, field_type: FieldType) -> FormResult<()> {
		self.register(BlockType {
			name: name.into(),
			kind: BlockKind::Field(field_type),
			parent: Some(FORM_BLOCK.to_string()),
		})
	}

	pub fn unregister(&self, name: &str) -> Option<BlockType> {
		self.blocks.write().remove(name)
	}

	pub fn get(&self, name: &str) -> Option<BlockType> {
		self.blocks.read().get(name).cloned()
	}

	pub fn is_registered(&self, name: &str) -> bool {
		self.blocks.read().contains_key(name)
	}

	/// Field kind rendered by `name`, if it is a field block
	pub fn field_type(&self, name: &str) -> Option<FieldType> {
		match self.blocks.read().get(name)?.kind {
			BlockKind::Field(field_type) => Some(field_type),
			BlockKind::Form => None,
		}
	}

	pub fn len(&self) -> usize {
		self.blocks.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.blocks.read().is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[rstest]
	fn test_form_blocks_registered() {
		let registry = BlockRegistry::with_form_blocks(&FormHooks::new());

		assert_eq!(registry.len(), 5);
		assert_eq!(registry.get(FORM_BLOCK).unwrap().kind, BlockKind::Form);
		assert_eq!(
			registry.get(RADIO_FIELD_BLOCK).unwrap().parent.as_deref(),
			Some(FORM_BLOCK)
		);
		assert_eq!(registry.field_type(FORM_BLOCK), None);
		assert_eq!(registry.field_type(TEXTAREA_FIELD_BLOCK), Some(FieldType::Textarea));
	}

	#[rstest]
	fn test_registration_action_can_add_blocks() {
		// Arrange
		let hooks = FormHooks::new();
		let fired = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&fired);
		hooks.register_form_blocks.add_action(move |registry: &BlockRegistry| {
			counter.fetch_add(1, Ordering::SeqCst);
			registry
				.register_field("acme/field-phone", FieldType::Name)
				.unwrap();
		});

		// Act
		let registry = BlockRegistry::with_form_blocks(&hooks);

		// Assert
		assert_eq!(fired.load(Ordering::SeqCst), 1);
		assert_eq!(registry.field_type("acme/field-phone"), Some(FieldType::Name));
	}

	#[rstest]
	#[case("NoNamespace")]
	#[case("acme/")]
	#[case("Acme/Field")]
	fn test_invalid_names_rejected(#[case] name: &str) {
		let registry = BlockRegistry::new();

		assert!(registry.register_field(name, FieldType::Name).is_err());
	}

	#[rstest]
	fn test_duplicate_rejected_and_unregister() {
		let registry = BlockRegistry::with_form_blocks(&FormHooks::new());

		assert!(registry.register_field(EMAIL_FIELD_BLOCK, FieldType::Name).is_err());
		assert!(registry.unregister(EMAIL_FIELD_BLOCK).is_some());
		assert!(!registry.is_registered(EMAIL_FIELD_BLOCK));
	}
}
