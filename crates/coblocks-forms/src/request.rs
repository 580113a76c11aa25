//! Incoming requests

use crate::error::{FormError, FormResult};
use url::Url;

/// POST field carrying the nonce
pub const NONCE_FIELD: &str = "form-submit";
/// POST field carrying the request URI the form was rendered on
pub const REFERER_FIELD: &str = "_wp_http_referer";
pub const ACTION_FIELD: &str = "action";
pub const FORM_HASH_FIELD: &str = "form-hash";

/// Fields added by the envelope rather than by the form's own fields
pub const CONTROL_FIELDS: [&str; 4] = [NONCE_FIELD, REFERER_FIELD, ACTION_FIELD, FORM_HASH_FIELD];

/// Value of the `action` field and the nonce action
pub const SUBMIT_ACTION: &str = "coblocks-form-submit";

/// URL-encoded POST entries in submission order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostData {
	entries: Vec<(String, String)>,
}

impl PostData {
	/// Parse an `application/x-www-form-urlencoded` body
	pub fn parse(body: &str) -> FormResult<Self> {
		let entries: Vec<(String, String)> =
			serde_urlencoded::from_str(body).map_err(|e| FormError::InvalidRequest(e.to_string()))?;
		Ok(Self { entries })
	}

	pub fn from_pairs<I, K, V>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			entries: pairs
				.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		}
	}

	/// Value of `key`; a repeated key yields its last value
	pub fn get(&self, key: &str) -> Option<&str> {
		self.entries
			.iter()
			.rev()
			.find(|(k, _)| k == key)
			.map(|(_, v)| v.as_str())
	}

	pub fn entries(&self) -> &[(String, String)] {
		&self.entries
	}

	/// Entries other than [`CONTROL_FIELDS`]
	pub fn field_entries(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries
			.iter()
			.filter(|(k, _)| !CONTROL_FIELDS.contains(&k.as_str()))
			.map(|(k, v)| (k.as_str(), v.as_str()))
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Everything the form block reads from the current request
///
/// # Examples
///
/// ```
/// use coblocks_forms::FormRequest;
///
/// let request = FormRequest::post(
///     "https://example.com/contact/?post=42",
///     "form-hash=abc&field-name%5Bvalue%5D=Alice",
/// ).unwrap();
///
/// assert_eq!(request.post_id(), Some(42));
/// assert_eq!(request.request_uri(), "/contact/?post=42");
/// assert_eq!(request.post_data().unwrap().get("field-name[value]"), Some("Alice"));
/// ```
#[derive(Debug, Clone)]
pub struct FormRequest {
	url: Url,
	post: Option<PostData>,
	/// Identifies the visitor for nonce binding; empty for anonymous visitors
	pub session: String,
}

impl FormRequest {
	fn parse_url(url: &str) -> FormResult<Url> {
		match Url::parse(url) {
			Ok(url) => Ok(url),
			Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse("http://localhost/")
				.and_then(|base| base.join(url))
				.map_err(|e| FormError::InvalidRequest(e.to_string())),
			Err(e) => Err(FormError::InvalidRequest(e.to_string())),
		}
	}

	/// A page view without a POST body
	pub fn get(url: &str) -> FormResult<Self> {
		Ok(Self {
			url: Self::parse_url(url)?,
			post: None,
			session: String::new(),
		})
	}

	/// A form submission with a URL-encoded body
	pub fn post(url: &str, body: &str) -> FormResult<Self> {
		Ok(Self {
			url: Self::parse_url(url)?,
			post: Some(PostData::parse(body)?),
			session: String::new(),
		})
	}

	pub fn with_post_data(mut self, post: PostData) -> Self {
		self.post = Some(post);
		self
	}

	pub fn with_session(mut self, session: impl Into<String>) -> Self {
		self.session = session.into();
		self
	}

	pub fn url(&self) -> &Url {
		&self.url
	}

	pub fn post_data(&self) -> Option<&PostData> {
		self.post.as_ref()
	}

	/// Path plus query string, as echoed in the referer field
	pub fn request_uri(&self) -> String {
		match self.url.query() {
			Some(query) => format!("{}?{}", self.url.path(), query),
			None => self.url.path().to_string(),
		}
	}

	/// Last value of query parameter `name`
	pub fn query_param(&self, name: &str) -> Option<String> {
		self.url
			.query_pairs()
			.filter(|(k, _)| k == name)
			.last()
			.map(|(_, v)| v.into_owned())
	}

	/// Post id from the `post` query parameter
	///
	/// Non-digit characters are dropped before parsing, and an empty or zero
	/// result means no post.
	pub fn post_id(&self) -> Option<u64> {
		let raw = self.query_param("post")?;
		let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
		digits.parse::<u64>().ok().filter(|id| *id > 0)
	}
}
