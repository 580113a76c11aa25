//! Settings structures and loading

use crate::env::{Env, EnvError, load_dotenv};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "COBLOCKS_";

/// Minimum nonce secret length outside debug mode
pub const MIN_SECRET_LENGTH: usize = 32;

/// Longest accepted nonce lifetime (one year)
pub const MAX_NONCE_LIFETIME_SECS: u64 = 31_536_000;

/// Backends understood by the mail layer
pub const EMAIL_BACKENDS: &[&str] = &["console", "memory", "smtp"];

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("File error: {0}")]
	FileError(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Unsupported format: {0}")]
	UnsupportedFormat(String),

	#[error(transparent)]
	Env(#[from] EnvError),
}

/// Site metadata used for subjects and the default recipient
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
	pub name: String,
	pub url: String,
	/// Recipient when a form has no `to` attribute
	pub admin_email: String,
}

impl Default for SiteSettings {
	fn default() -> Self {
		Self {
			name: "CoBlocks".to_string(),
			url: "http://localhost".to_string(),
			admin_email: String::new(),
		}
	}
}

/// Email transport settings
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
	/// One of `console`, `memory` or `smtp`
	pub backend: String,
	pub host: String,
	pub port: u16,
	pub username: Option<String>,
	pub password: Option<String>,
	/// STARTTLS
	pub use_tls: bool,
	/// Implicit TLS
	pub use_ssl: bool,
	/// Sender address; `site.admin_email` is used when empty
	pub from_email: String,
	/// Connection timeout in seconds
	pub timeout: Option<u64>,
}

impl Default for EmailSettings {
	fn default() -> Self {
		Self {
			backend: "console".to_string(),
			host: "localhost".to_string(),
			port: 25,
			username: None,
			password: None,
			use_tls: false,
			use_ssl: false,
			from_email: String::new(),
			timeout: None,
		}
	}
}

#[non_exhaustive]
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
	/// HMAC key for form nonces
	pub nonce_secret: String,
	pub nonce_lifetime_secs: u64,
}

impl std::fmt::Debug for SecuritySettings {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SecuritySettings")
			.field("nonce_secret", &"[redacted]")
			.field("nonce_lifetime_secs", &self.nonce_lifetime_secs)
			.finish()
	}
}

impl Default for SecuritySettings {
	fn default() -> Self {
		Self {
			nonce_secret: String::new(),
			nonce_lifetime_secs: 86_400,
		}
	}
}

/// Form rendering and processing switches
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormSettings {
	/// Also run the email content filter over the success message
	pub reuse_content_filter_for_success: bool,
	/// Marker appended to required field labels
	pub required_text: String,
	/// Submit button text when the form does not set one
	pub submit_text: String,
}

impl Default for FormSettings {
	fn default() -> Self {
		Self {
			reuse_content_filter_for_success: false,
			required_text: "(required)".to_string(),
			submit_text: "Submit".to_string(),
		}
	}
}

/// Top-level settings
///
/// # Examples
///
/// ```
/// use coblocks_conf::Settings;
///
/// let settings = Settings::from_toml_str(r#"
/// debug = true
///
/// [site]
/// name = "Example"
/// admin_email = "admin@example.com"
/// "#).unwrap();
///
/// assert_eq!(settings.site.name, "Example");
/// assert_eq!(settings.email.backend, "console");
/// assert!(settings.validate().is_ok());
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	pub debug: bool,
	pub site: SiteSettings,
	pub email: EmailSettings,
	pub security: SecuritySettings,
	pub forms: FormSettings,
}

impl Settings {
	/// Address outgoing mail is sent from
	pub fn sender(&self) -> &str {
		match self.email.from_email.trim() {
			"" => self.site.admin_email.trim(),
			from => from,
		}
	}

	pub fn from_toml_str(contents: &str) -> Result<Self, SettingsError> {
		toml::from_str(contents)
			.map_err(|e| SettingsError::ParseError(format!("TOML parse error: {}", e)))
	}

	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		let path = path.as_ref();
		if path.extension().and_then(|s| s.to_str()) != Some("toml") {
			return Err(SettingsError::UnsupportedFormat(
				"Supported formats: .toml".to_string(),
			));
		}

		let contents = std::fs::read_to_string(path).map_err(|e| {
			SettingsError::FileError(format!("Failed to read {}: {}", path.display(), e))
		})?;

		Self::from_toml_str(&contents)
	}

	/// Load settings the way a deployment does
	///
	/// Reads `.env` (if any), the TOML file (if given), applies `COBLOCKS_*`
	/// environment overrides and validates the result.
	pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
		load_dotenv(None)?;

		let mut settings = match path {
			Some(path) => Self::from_file(path)?,
			None => Self::default(),
		};
		settings.apply_env(&Env::new().with_prefix(ENV_PREFIX))?;
		settings.validate()?;

		tracing::debug!(
			site = %settings.site.name,
			backend = %settings.email.backend,
			debug = settings.debug,
			"settings loaded"
		);
		Ok(settings)
	}

	/// Override values from environment variables
	///
	/// Keys are looked up relative to the reader's prefix, e.g. `ADMIN_EMAIL`
	/// becomes `COBLOCKS_ADMIN_EMAIL`.
	pub fn apply_env(&mut self, env: &Env) -> Result<(), SettingsError> {
		if let Some(debug) = env.bool("DEBUG")? {
			self.debug = debug;
		}

		if let Some(name) = env.str("SITE_NAME")? {
			self.site.name = name;
		}
		if let Some(url) = env.str("SITE_URL")? {
			self.site.url = url;
		}
		if let Some(admin) = env.str("ADMIN_EMAIL")? {
			self.site.admin_email = admin;
		}

		if let Some(backend) = env.str("EMAIL_BACKEND")? {
			self.email.backend = backend;
		}
		if let Some(host) = env.str("EMAIL_HOST")? {
			self.email.host = host;
		}
		if let Some(port) = env.u64("EMAIL_PORT")? {
			self.email.port = u16::try_from(port).map_err(|_| {
				SettingsError::ValidationError(format!("EMAIL_PORT {} is out of range", port))
			})?;
		}
		if let Some(user) = env.str("EMAIL_USER")? {
			self.email.username = Some(user);
		}
		if let Some(password) = env.str("EMAIL_PASSWORD")? {
			self.email.password = Some(password);
		}
		if let Some(tls) = env.bool("EMAIL_USE_TLS")? {
			self.email.use_tls = tls;
		}
		if let Some(ssl) = env.bool("EMAIL_USE_SSL")? {
			self.email.use_ssl = ssl;
		}
		if let Some(from) = env.str("FROM_EMAIL")? {
			self.email.from_email = from;
		}
		if let Some(timeout) = env.u64("EMAIL_TIMEOUT")? {
			self.email.timeout = Some(timeout);
		}

		if let Some(secret) = env.str("NONCE_SECRET")? {
			self.security.nonce_secret = secret;
		}
		if let Some(lifetime) = env.u64("NONCE_LIFETIME")? {
			self.security.nonce_lifetime_secs = lifetime;
		}

		Ok(())
	}

	pub fn validate(&self) -> Result<(), SettingsError> {
		if !is_plausible_address(&self.site.admin_email) {
			return Err(SettingsError::ValidationError(
				"site.admin_email must be a valid address".to_string(),
			));
		}

		let from = self.email.from_email.trim();
		if !from.is_empty() && !is_plausible_address(from) {
			return Err(SettingsError::ValidationError(format!(
				"email.from_email '{}' must be a valid address",
				from
			)));
		}

		if !EMAIL_BACKENDS.contains(&self.email.backend.as_str()) {
			return Err(SettingsError::ValidationError(format!(
				"email.backend '{}' is not one of {}",
				self.email.backend,
				EMAIL_BACKENDS.join(", ")
			)));
		}

		if self.email.use_tls && self.email.use_ssl {
			return Err(SettingsError::ValidationError(
				"email.use_tls and email.use_ssl are mutually exclusive".to_string(),
			));
		}

		if self.security.nonce_secret.len() < MIN_SECRET_LENGTH && !self.debug {
			return Err(SettingsError::ValidationError(format!(
				"security.nonce_secret must be at least {} characters",
				MIN_SECRET_LENGTH
			)));
		}

		if !(2..=MAX_NONCE_LIFETIME_SECS).contains(&self.security.nonce_lifetime_secs) {
			return Err(SettingsError::ValidationError(format!(
				"security.nonce_lifetime_secs must be between 2 and {}",
				MAX_NONCE_LIFETIME_SECS
			)));
		}

		Ok(())
	}
}

/// `local@domain.tld`, optionally wrapped as `Name <local@domain.tld>`
///
/// The mail layer does the full syntax check; this catches sender and admin
/// values that could never be delivered.
fn is_plausible_address(value: &str) -> bool {
	let value = value.trim();
	let address = match (value.rfind('<'), value.strip_suffix('>')) {
		(Some(open), Some(inner)) => &inner[open + 1..],
		_ => value,
	};
	let Some((local, domain)) = address.trim().split_once('@') else {
		return false;
	};
	!local.is_empty()
		&& !address.contains(char::is_whitespace)
		&& domain.split('.').count() >= 2
		&& domain.split('.').all(|label| !label.is_empty())
}
