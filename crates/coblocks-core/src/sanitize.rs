//! Sanitization and escaping primitives
//!
//! These are the only functions allowed to turn untrusted strings into
//! markup, email addresses or slugs. Rendering code escapes every dynamic
//! value through [`escape_html`] or [`escape_attr`]; submitted values go
//! through [`sanitize_text_field`]; configured recipients go through
//! [`sanitize_email`].

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Escape HTML special characters for element content
///
/// # Examples
///
/// ```
/// use coblocks_core::sanitize::escape_html;
///
/// assert_eq!(escape_html("<b>Tom & Jerry</b>"), "&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;");
/// ```
pub fn escape_html(input: &str) -> String {
	let mut escaped = String::with_capacity(input.len() + 8);
	for c in input.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			'\'' => escaped.push_str("&#x27;"),
			_ => escaped.push(c),
		}
	}
	escaped
}

/// Decode the entities produced by [`escape_html`]
///
/// Decoding is a single pass, so `&amp;lt;` becomes `&lt;` and not `<`.
/// Other entities are left as written.
///
/// # Examples
///
/// ```
/// use coblocks_core::sanitize::unescape_html;
///
/// assert_eq!(unescape_html("Tom &amp; Jerry O&#x27;Brien"), "Tom & Jerry O'Brien");
/// assert_eq!(unescape_html("&amp;lt; &copy;"), "&lt; &copy;");
/// ```
pub fn unescape_html(input: &str) -> String {
	const ENTITIES: &[(&str, char)] = &[
		("&amp;", '&'),
		("&lt;", '<'),
		("&gt;", '>'),
		("&quot;", '"'),
		("&#x27;", '\''),
		("&#39;", '\''),
	];

	let mut decoded = String::with_capacity(input.len());
	let mut rest = input;
	while let Some(pos) = rest.find('&') {
		decoded.push_str(&rest[..pos]);
		let tail = &rest[pos..];
		match ENTITIES.iter().find(|(entity, _)| tail.starts_with(entity)) {
			Some((entity, c)) => {
				decoded.push(*c);
				rest = &tail[entity.len()..];
			}
			None => {
				decoded.push('&');
				rest = &tail[1..];
			}
		}
	}
	decoded.push_str(rest);
	decoded
}

/// Escape a value for use inside a quoted HTML attribute
///
/// # Examples
///
/// ```
/// use coblocks_core::sanitize::escape_attr;
///
/// assert_eq!(escape_attr(r#"x" onclick="y"#), "x&quot; onclick=&quot;y");
/// assert_eq!(escape_attr("line\nbreak"), "line&#10;break");
/// ```
pub fn escape_attr(input: &str) -> String {
	let mut escaped = String::with_capacity(input.len() + 8);
	for c in input.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			'\'' => escaped.push_str("&#x27;"),
			'\n' => escaped.push_str("&#10;"),
			'\r' => escaped.push_str("&#13;"),
			'\t' => escaped.push_str("&#9;"),
			_ => escaped.push(c),
		}
	}
	escaped
}

/// Strip HTML tags, tolerating `>` inside quoted attributes, comments and
/// unclosed tags
///
/// # Examples
///
/// ```
/// use coblocks_core::sanitize::strip_tags;
///
/// assert_eq!(strip_tags("<p>Hello <b>World</b></p>"), "Hello World");
/// assert_eq!(strip_tags(r#"<a title="x>y">Link</a>"#), "Link");
/// assert_eq!(strip_tags("Hello<!-- note -->World"), "HelloWorld");
/// assert_eq!(strip_tags("Hello<br"), "Hello");
/// ```
pub fn strip_tags(html: &str) -> String {
	let mut result = String::with_capacity(html.len());
	let chars: Vec<char> = html.chars().collect();
	let len = chars.len();
	let mut i = 0;

	while i < len {
		if chars[i] != '<' {
			result.push(chars[i]);
			i += 1;
			continue;
		}

		if i + 3 < len && chars[i + 1] == '!' && chars[i + 2] == '-' && chars[i + 3] == '-' {
			i += 4;
			let mut closed = false;
			while i + 2 < len {
				if chars[i] == '-' && chars[i + 1] == '-' && chars[i + 2] == '>' {
					i += 3;
					closed = true;
					break;
				}
				i += 1;
			}
			if !closed {
				break;
			}
			continue;
		}

		i += 1;
		let mut in_single = false;
		let mut in_double = false;
		while i < len {
			match chars[i] {
				'"' if !in_single => in_double = !in_double,
				'\'' if !in_double => in_single = !in_single,
				'>' if !in_single && !in_double => {
					i += 1;
					break;
				}
				_ => {}
			}
			i += 1;
		}
	}
	result
}

fn percent_octets() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| Regex::new(r"%[a-fA-F0-9]{2}").expect("valid octet pattern"))
}

fn script_blocks() -> &'static [Regex; 2] {
	static RE: OnceLock<[Regex; 2]> = OnceLock::new();
	RE.get_or_init(|| {
		[
			Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid script pattern"),
			Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("valid style pattern"),
		]
	})
}

/// Sanitize a single-line plain text value
///
/// Removes markup (including the content of `<script>`/`<style>` elements),
/// percent-encoded octets and control characters, collapses runs of
/// whitespace into one space and trims the result.
///
/// # Examples
///
/// ```
/// use coblocks_core::sanitize::sanitize_text_field;
///
/// assert_eq!(sanitize_text_field("  Alice\n\tSmith "), "Alice Smith");
/// assert_eq!(sanitize_text_field("<b>bold</b><script>x()</script>"), "bold");
/// assert_eq!(sanitize_text_field("100%25 sure"), "100 sure");
/// ```
pub fn sanitize_text_field(input: &str) -> String {
	let mut text = input.to_string();
	for re in script_blocks() {
		text = re.replace_all(&text, "").into_owned();
	}
	let text = strip_tags(&text);
	let text = percent_octets().replace_all(&text, "");

	let mut result = String::with_capacity(text.len());
	let mut pending_space = false;
	for c in text.chars() {
		if c.is_whitespace() {
			pending_space = true;
		} else if c.is_control() {
			continue;
		} else {
			if pending_space && !result.is_empty() {
				result.push(' ');
			}
			pending_space = false;
			result.push(c);
		}
	}
	result
}

const EMAIL_LOCAL_SPECIALS: &str = "!#$%&'*+/=?^_`{|}~.-";

/// Sanitize an email address
///
/// Strips characters that are not allowed in the local part or domain.
/// Returns an empty string when the address cannot be repaired into a
/// plausible `local@domain.tld` shape.
///
/// # Examples
///
/// ```
/// use coblocks_core::sanitize::sanitize_email;
///
/// assert_eq!(sanitize_email(" x@y.com "), "x@y.com");
/// assert_eq!(sanitize_email("jo(h)n@exa mple.org"), "john@example.org");
/// assert_eq!(sanitize_email("not-an-address"), "");
/// assert_eq!(sanitize_email("a@localhost"), "");
/// ```
pub fn sanitize_email(input: &str) -> String {
	let email = input.trim();
	if email.len() < 6 {
		return String::new();
	}

	let Some((local, domain)) = email.split_once('@') else {
		return String::new();
	};

	let local: String = local
		.chars()
		.filter(|c| c.is_ascii_alphanumeric() || EMAIL_LOCAL_SPECIALS.contains(*c))
		.collect();
	if local.is_empty() {
		return String::new();
	}

	if domain.contains("..") {
		return String::new();
	}
	let domain = domain.trim_matches(|c: char| c == '.' || c.is_whitespace());

	let subs: Vec<String> = domain
		.split('.')
		.map(|sub| {
			sub.chars()
				.filter(|c| c.is_ascii_alphanumeric() || *c == '-')
				.collect::<String>()
				.trim_matches('-')
				.to_string()
		})
		.filter(|sub| !sub.is_empty())
		.collect();

	if subs.len() < 2 {
		return String::new();
	}

	format!("{}@{}", local, subs.join("."))
}

/// Validate URLs and allow only safe protocols
///
/// Relative paths, anchors and the `http`, `https`, `mailto`, `ftp`,
/// `ftps` schemes are accepted. Parent traversal (`../`) is rejected.
///
/// # Examples
///
/// ```
/// use coblocks_core::sanitize::is_safe_url;
///
/// assert!(is_safe_url("https://example.com/contact/"));
/// assert!(is_safe_url("/contact/"));
/// assert!(!is_safe_url("javascript:alert(1)"));
/// assert!(!is_safe_url("../secret"));
/// ```
pub fn is_safe_url(url: &str) -> bool {
	let url = url.trim();
	if url.starts_with('/') || url.starts_with("./") || url.starts_with('#') {
		// Protocol-relative URLs can point anywhere
		return !url.starts_with("//");
	}

	let lower = url.to_ascii_lowercase();
	["http://", "https://", "mailto:", "ftp://", "ftps://"]
		.iter()
		.any(|protocol| lower.starts_with(protocol))
}

/// Escape a URL for an attribute, returning an empty string for unsafe URLs
pub fn escape_url(url: &str) -> String {
	if is_safe_url(url) {
		escape_attr(url.trim())
	} else {
		tracing::debug!(url = %url, "dropping unsafe url");
		String::new()
	}
}

/// Derive a URL- and attribute-safe slug from a label
///
/// Markup is stripped, letters are lowercased, punctuation is dropped and
/// whitespace, `-`, `_` and `.` collapse into single hyphens.
///
/// # Examples
///
/// ```
/// use coblocks_core::sanitize::slugify;
///
/// assert_eq!(slugify("Your Email"), "your-email");
/// assert_eq!(slugify("  What's   up?  "), "whats-up");
/// assert_eq!(slugify("first_name.last"), "first-name-last");
/// assert_eq!(slugify("<em>Name</em>"), "name");
/// assert_eq!(slugify("!!!"), "");
/// ```
pub fn slugify(input: &str) -> String {
	let text = strip_tags(input);
	let mut slug = String::with_capacity(text.len());
	let mut pending_hyphen = false;

	for c in text.chars().flat_map(char::to_lowercase) {
		if c.is_alphanumeric() {
			if pending_hyphen && !slug.is_empty() {
				slug.push('-');
			}
			pending_hyphen = false;
			slug.push(c);
		} else if c.is_whitespace() || matches!(c, '-' | '_' | '.') {
			pending_hyphen = true;
		}
	}
	slug
}

/// Tags accepted by [`kses_post`] with the attributes each may carry.
const ALLOWED_TAGS: &[(&str, &[&str])] = &[
	("a", &["href", "title", "target", "rel", "class"]),
	("b", &[]),
	("blockquote", &["cite", "class"]),
	("br", &[]),
	("code", &[]),
	("div", &["class"]),
	("em", &[]),
	("h1", &["class"]),
	("h2", &["class"]),
	("h3", &["class"]),
	("h4", &["class"]),
	("h5", &["class"]),
	("h6", &["class"]),
	("i", &[]),
	("li", &["class"]),
	("ol", &["class"]),
	("p", &["class"]),
	("pre", &[]),
	("small", &[]),
	("span", &["class"]),
	("strong", &[]),
	("u", &[]),
	("ul", &["class"]),
];

fn tag_pattern() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| {
		Regex::new(r#"(?s)<(/?)([a-zA-Z][a-zA-Z0-9]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
			.expect("valid tag pattern")
	})
}

fn attr_pattern() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| {
		Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*(?:=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
			.expect("valid attribute pattern")
	})
}

fn comment_pattern() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment pattern"))
}

/// Sanitize HTML down to the tags allowed in post content
///
/// `<script>` and `<style>` elements are removed with their content,
/// comments are removed, tags outside the allowlist are dropped (their text
/// content is kept), attributes outside each tag's allowlist are dropped and
/// `href` values must pass [`is_safe_url`].
///
/// # Examples
///
/// ```
/// use coblocks_core::sanitize::kses_post;
///
/// assert_eq!(
///     kses_post("<blockquote><ul><li>Name: Alice</li></ul></blockquote>"),
///     "<blockquote><ul><li>Name: Alice</li></ul></blockquote>"
/// );
/// assert_eq!(kses_post(r#"<p onclick="x()">Hi</p><script>evil()</script>"#), "<p>Hi</p>");
/// assert_eq!(kses_post(r#"<a href="javascript:x()">link</a>"#), "<a>link</a>");
/// assert_eq!(kses_post("<iframe src=x></iframe>text"), "text");
/// ```
pub fn kses_post(html: &str) -> String {
	let mut cleaned = html.to_string();
	for re in script_blocks() {
		cleaned = re.replace_all(&cleaned, "").into_owned();
	}
	let cleaned = comment_pattern().replace_all(&cleaned, "");

	let allowed: HashSet<&str> = ALLOWED_TAGS.iter().map(|(tag, _)| *tag).collect();

	tag_pattern()
		.replace_all(&cleaned, |caps: &regex::Captures<'_>| {
			let closing = !caps[1].is_empty();
			let tag = caps[2].to_ascii_lowercase();
			if !allowed.contains(tag.as_str()) {
				return String::new();
			}
			if closing {
				return format!("</{}>", tag);
			}

			let attrs = caps.get(3).map_or("", |m| m.as_str());
			let self_closing = attrs.trim_end().ends_with('/');
			let permitted = ALLOWED_TAGS
				.iter()
				.find(|(name, _)| *name == tag)
				.map_or(&[][..], |(_, attrs)| *attrs);

			let mut out = format!("<{}", tag);
			for attr in attr_pattern().captures_iter(attrs) {
				let name = attr[1].to_ascii_lowercase();
				if !permitted.contains(&name.as_str()) {
					continue;
				}
				let value = attr
					.get(2)
					.or_else(|| attr.get(3))
					.or_else(|| attr.get(4))
					.map_or("", |m| m.as_str());
				if name == "href" && !is_safe_url(value) {
					continue;
				}
				out.push_str(&format!(r#" {}="{}""#, name, escape_attr(value)));
			}
			if self_closing {
				out.push_str(" /");
			}
			out.push('>');
			out
		})
		.into_owned()
}
