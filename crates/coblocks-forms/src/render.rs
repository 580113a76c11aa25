//! Form envelope markup

use crate::attributes::FormAttributes;
use crate::blocks::ContentSegment;
use crate::fields::{FieldEntry, SlugAllocator};
use crate::form::FormDefinition;
use crate::hooks::FormHooks;
use crate::request::{
	ACTION_FIELD, FORM_HASH_FIELD, FormRequest, NONCE_FIELD, REFERER_FIELD, SUBMIT_ACTION,
};
use coblocks_conf::FormSettings;
use coblocks_core::sanitize::{escape_attr, escape_html, escape_url};

/// Render the form with its fields, submit button and hidden inputs
///
/// `nonce` is embedded as issued; everything else derives from the
/// definition and the request, so two renders with the same nonce are
/// identical.
pub fn render_form(
	definition: &FormDefinition,
	request: &FormRequest,
	nonce: &str,
	hooks: &FormHooks,
	settings: &FormSettings,
) -> String {
	let class = match request.post_id() {
		Some(id) => format!("coblocks-form {}", id),
		None => "coblocks-form".to_string(),
	};

	let mut html = format!(
		"<div class=\"{class}\">\n<form action=\"{action}\" method=\"post\">\n",
		class = escape_attr(&class),
		action = escape_url(request.url().as_str()),
	);

	html.push_str(&render_segments(definition, hooks, &settings.required_text));

	html.push_str("\n<p class=\"form-submit\">\n");
	html.push_str(&render_submit_button(&definition.attributes, &settings.submit_text));
	html.push('\n');
	html.push_str(&format!(
		"<input type=\"hidden\" id=\"{field}\" name=\"{field}\" value=\"{nonce}\" />",
		field = NONCE_FIELD,
		nonce = escape_attr(nonce),
	));
	html.push_str(&format!(
		"<input type=\"hidden\" name=\"{}\" value=\"{}\" />\n",
		REFERER_FIELD,
		escape_attr(&request.request_uri()),
	));
	html.push_str(&format!(
		"<input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
		ACTION_FIELD, SUBMIT_ACTION
	));
	html.push_str(&format!(
		"<input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
		FORM_HASH_FIELD,
		escape_attr(definition.hash()),
	));
	html.push_str("</p>\n</form>\n</div>");
	html
}

/// Inner content with each field block replaced by its markup
fn render_segments(definition: &FormDefinition, hooks: &FormHooks, required_text: &str) -> String {
	let mut slugs = SlugAllocator::new();
	let mut html = String::new();
	for segment in &definition.segments {
		match segment {
			ContentSegment::Html(markup) => html.push_str(markup),
			ContentSegment::Field(kind) => {
				let entry = FieldEntry::new(kind.clone(), &mut slugs);
				html.push_str(&entry.render(hooks, required_text));
			}
		}
	}
	html
}

/// The submit button
///
/// Colors go into the inline style unchanged.
fn render_submit_button(attributes: &FormAttributes, default_text: &str) -> String {
	let text = attributes
		.submit_button_text
		.as_deref()
		.unwrap_or(default_text);
	let classes = attributes.submit_button_classes.as_deref().unwrap_or("");

	let mut styles = String::new();
	if let Some(background) = &attributes.custom_background_button_color {
		styles.push_str(&format!("background-color: {};", background));
	}
	if let Some(color) = &attributes.custom_text_button_color {
		styles.push_str(&format!("color: {};", color));
	}
	let style = if styles.is_empty() {
		String::new()
	} else {
		format!(" style='{}'", styles)
	};

	format!(
		"<button type=\"submit\" class=\"{}\"{}>{}</button>",
		escape_attr(classes),
		style,
		escape_html(text),
	)
}
