//! Serialized block content parsing
//!
//! Inner form content arrives in the block editor's serialization: HTML with
//! blocks delimited by comments such as
//! `<!-- wp:coblocks/field-email {"required":true} /-->`. Registered field
//! blocks become [`ContentSegment::Field`]; everything else, including the
//! delimiters of unknown blocks, passes through as HTML.

use crate::error::{FormError, FormResult};
use crate::fields::FieldKind;
use crate::registry::BlockRegistry;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSegment {
	/// Markup emitted as is
	Html(String),
	Field(FieldKind),
}

fn delimiter_pattern() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| {
		Regex::new(
			r"(?s)<!--\s+(/)?wp:([a-z][a-z0-9_-]*(?:/[a-z][a-z0-9_-]*)?)\s+(?:(\{.*?\})\s+)?(/)?-->",
		)
		.expect("valid block delimiter pattern")
	})
}

/// Canonical block name; bare names belong to the `core` namespace
fn full_block_name(name: &str) -> String {
	if name.contains('/') {
		name.to_string()
	} else {
		format!("core/{}", name)
	}
}

/// Split serialized content into markup and field blocks
///
/// The inner content of a field block written with an opening and closing
/// delimiter is dropped, because the field renders its own markup.
///
/// # Examples
///
/// ```
/// use coblocks_forms::{BlockRegistry, ContentSegment, FormHooks, parse_blocks};
///
/// let registry = BlockRegistry::with_form_blocks(&FormHooks::new());
/// let segments = parse_blocks(
///     r#"<p>Say hi</p><!-- wp:coblocks/field-name {"required":true} /-->"#,
///     &registry,
/// ).unwrap();
///
/// assert_eq!(segments.len(), 2);
/// assert_eq!(segments[0], ContentSegment::Html("<p>Say hi</p>".to_string()));
/// assert!(matches!(&segments[1], ContentSegment::Field(field) if field.required()));
/// ```
pub fn parse_blocks(content: &str, registry: &BlockRegistry) -> FormResult<Vec<ContentSegment>> {
	let mut segments = Vec::new();
	let mut html_start = 0;
	// Field block whose inner content is being skipped
	let mut skipping: Option<String> = None;

	for caps in delimiter_pattern().captures_iter(content) {
		let Some(whole) = caps.get(0) else {
			continue;
		};
		let closing = caps.get(1).is_some();
		let name = full_block_name(&caps[2]);

		if let Some(open) = &skipping {
			if closing && *open == name {
				skipping = None;
				html_start = whole.end();
			}
			continue;
		}

		if closing {
			continue;
		}

		let Some(field_type) = registry.field_type(&name) else {
			continue;
		};

		let attributes = caps
			.get(3)
			.map(|json| serde_json::from_str::<serde_json::Value>(json.as_str()))
			.transpose()
			.map_err(|e| FormError::InvalidBlock {
				block: name.clone(),
				reason: e.to_string(),
			})?;
		let field = FieldKind::from_attributes(field_type, &name, attributes)?;

		push_html(&mut segments, &content[html_start..whole.start()]);
		segments.push(ContentSegment::Field(field));
		html_start = whole.end();

		if caps.get(4).is_none() {
			skipping = Some(name);
		}
	}

	if let Some(open) = skipping {
		tracing::warn!(block = %open, "field block is never closed");
	} else {
		push_html(&mut segments, &content[html_start..]);
	}

	Ok(segments)
}

fn push_html(segments: &mut Vec<ContentSegment>, html: &str) {
	if html.is_empty() {
		return;
	}
	if let Some(ContentSegment::Html(previous)) = segments.last_mut() {
		previous.push_str(html);
	} else {
		segments.push(ContentSegment::Html(html.to_string()));
	}
}
