//! Environment variable handling
//!
//! Typed lookups with an optional key prefix. Values normally come from the
//! process environment; [`Env::from_vars`] swaps in a fixed set, which keeps
//! tests independent of the process state.

use std::collections::HashMap;

/// Environment variable errors
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
	#[error("Failed to parse environment variable '{key}' (value length: {value_len}): {error}")]
	ParseError {
		key: String,
		/// Length of the original value, stored instead of the value so secrets do not leak
		value_len: usize,
		error: String,
	},

	#[error("Invalid environment variable name '{name}': {reason}")]
	InvalidVariableName { name: String, reason: String },

	#[error("Failed to load env file: {0}")]
	DotenvError(String),
}

/// Environment variable reader with prefix support
#[derive(Debug, Clone, Default)]
pub struct Env {
	/// Prefix prepended to every key (e.g., "COBLOCKS_")
	pub prefix: Option<String>,
	vars: Option<HashMap<String, String>>,
}

impl Env {
	pub fn new() -> Self {
		Self::default()
	}

	/// Read from a fixed set of variables instead of the process environment
	pub fn from_vars<I, K, V>(vars: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			prefix: None,
			vars: Some(
				vars.into_iter()
					.map(|(k, v)| (k.into(), v.into()))
					.collect(),
			),
		}
	}

	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = Some(prefix.into());
		self
	}

	fn get_key_name(&self, key: &str) -> String {
		match &self.prefix {
			Some(prefix) => format!("{}{}", prefix, key),
			None => key.to_string(),
		}
	}

	fn lookup(&self, key: &str) -> Result<(String, Option<String>), EnvError> {
		let full_key = self.get_key_name(key);
		validate_env_var_name(&full_key)?;

		let value = match &self.vars {
			Some(vars) => vars.get(&full_key).cloned(),
			None => std::env::var(&full_key).ok(),
		};
		Ok((full_key, value))
	}

	/// Read a string value, `None` when unset
	pub fn str(&self, key: &str) -> Result<Option<String>, EnvError> {
		Ok(self.lookup(key)?.1)
	}

	/// Read a boolean value, `None` when unset
	pub fn bool(&self, key: &str) -> Result<Option<bool>, EnvError> {
		let (full_key, value) = self.lookup(key)?;
		value
			.map(|val| {
				parse_bool(&val).map_err(|e| EnvError::ParseError {
					key: full_key,
					value_len: val.len(),
					error: e,
				})
			})
			.transpose()
	}

	/// Read an unsigned integer value, `None` when unset
	pub fn u64(&self, key: &str) -> Result<Option<u64>, EnvError> {
		let (full_key, value) = self.lookup(key)?;
		value
			.map(|val| {
				val.trim().parse::<u64>().map_err(|e| EnvError::ParseError {
					key: full_key,
					value_len: val.len(),
					error: e.to_string(),
				})
			})
			.transpose()
	}
}

/// Parse a boolean in the usual environment spellings
pub fn parse_bool(value: &str) -> Result<bool, String> {
	match value.trim().to_lowercase().as_str() {
		"true" | "1" | "yes" | "on" => Ok(true),
		"false" | "0" | "no" | "off" | "" => Ok(false),
		other => Err(format!("'{}' is not a boolean", other)),
	}
}

/// Rejects names that are empty, contain control characters, or contain `=`.
pub fn validate_env_var_name(name: &str) -> Result<(), EnvError> {
	if name.is_empty() {
		return Err(EnvError::InvalidVariableName {
			name: name.to_string(),
			reason: "environment variable name must not be empty".to_string(),
		});
	}

	if let Some(pos) = name.find(|c: char| c.is_control()) {
		return Err(EnvError::InvalidVariableName {
			name: name.to_string(),
			reason: format!(
				"environment variable name contains control character at position {}",
				pos
			),
		});
	}

	if name.contains('=') {
		return Err(EnvError::InvalidVariableName {
			name: name.to_string(),
			reason: "environment variable name must not contain '='".to_string(),
		});
	}

	Ok(())
}

/// Load a `.env` file into the process environment
///
/// A missing file is not an error. Variables already set are left untouched.
pub fn load_dotenv(path: Option<&std::path::Path>) -> Result<(), EnvError> {
	let result = match path {
		Some(path) => dotenv::from_path(path).map(|_| ()),
		None => dotenv::dotenv().map(|_| ()),
	};

	match result {
		Ok(()) => Ok(()),
		Err(e) if e.not_found() => {
			tracing::debug!("no .env file found");
			Ok(())
		}
		Err(e) => Err(EnvError::DotenvError(e.to_string())),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("true", true)]
	#[case("1", true)]
	#[case("Yes", true)]
	#[case("off", false)]
	#[case("", false)]
	fn test_parse_bool(#[case] input: &str, #[case] expected: bool) {
		assert_eq!(parse_bool(input), Ok(expected));
	}

	#[rstest]
	fn test_parse_bool_rejects_garbage() {
		assert!(parse_bool("maybe").is_err());
	}

	#[rstest]
	fn test_prefixed_lookup() {
		let env = Env::from_vars([("COBLOCKS_PORT", "2525"), ("PORT", "1")]).with_prefix("COBLOCKS_");

		assert_eq!(env.u64("PORT").unwrap(), Some(2525));
		assert_eq!(env.str("MISSING").unwrap(), None);
	}

	#[rstest]
	fn test_parse_error_hides_value() {
		let env = Env::from_vars([("SECRET_PORT", "hunter2")]);

		let err = env.u64("SECRET_PORT").unwrap_err();

		let message = err.to_string();
		assert!(message.contains("SECRET_PORT"));
		assert!(message.contains("value length: 7"));
		assert!(!message.contains("hunter2"));
	}

	#[rstest]
	#[case("")]
	#[case("A=B")]
	#[case("A\nB")]
	fn test_invalid_names(#[case] name: &str) {
		assert!(validate_env_var_name(name).is_err());
	}
}
