//! # CoBlocks Conf
//!
//! Settings for the form processor: site metadata, the mail transport, the
//! nonce secret and form switches.
//!
//! Settings are read from a TOML file, then overridden by `COBLOCKS_*`
//! environment variables (a `.env` file is loaded first when present), and
//! finally validated.
//!
//! ```toml
//! [site]
//! name = "My Site"
//! admin_email = "admin@example.com"
//!
//! [email]
//! backend = "smtp"
//! host = "smtp.example.com"
//! port = 587
//! use_tls = true
//!
//! [security]
//! nonce_secret = "a long random string of at least 32 characters"
//! ```

pub mod env;
pub mod settings;

pub use env::{Env, EnvError};
pub use settings::{
	ENV_PREFIX, EmailSettings, FormSettings, MAX_NONCE_LIFETIME_SECS, SecuritySettings, Settings,
	SettingsError, SiteSettings,
};
