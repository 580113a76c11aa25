//! Address and header validation

use crate::{EmailError, EmailResult};
use regex::Regex;
use std::sync::OnceLock;

/// Maximum address length (RFC 5321 path limit minus the angle brackets)
pub const MAX_EMAIL_LENGTH: usize = 254;

const MAX_LOCAL_PART_LENGTH: usize = 64;

fn address_regex() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| {
		Regex::new(
			r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~.-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
		)
		.expect("address pattern is valid")
	})
}

/// Split `"Display Name <user@example.com>"` into its parts
///
/// A bare address yields no display name.
pub fn split_mailbox(value: &str) -> (Option<&str>, &str) {
	let value = value.trim();
	if let Some(open) = value.rfind('<')
		&& value.ends_with('>')
	{
		let name = value[..open].trim().trim_matches('"').trim();
		let address = value[open + 1..value.len() - 1].trim();
		let name = (!name.is_empty()).then_some(name);
		return (name, address);
	}
	(None, value)
}

/// Validate a single address, optionally with a display name
///
/// # Examples
///
/// ```
/// use coblocks_mail::validation::validate_email;
///
/// assert!(validate_email("user@example.com").is_ok());
/// assert!(validate_email("Site <noreply@example.com>").is_ok());
/// assert!(validate_email("not-an-address").is_err());
/// ```
pub fn validate_email(value: &str) -> EmailResult<()> {
	check_header_injection(value)?;

	let (_, address) = split_mailbox(value);
	if address.is_empty() || address.len() > MAX_EMAIL_LENGTH {
		return Err(EmailError::InvalidAddress(address.to_string()));
	}

	let local_len = address.find('@').unwrap_or(address.len());
	if local_len > MAX_LOCAL_PART_LENGTH
		|| address.starts_with('.')
		|| address.contains("..")
		|| !address_regex().is_match(address)
	{
		return Err(EmailError::InvalidAddress(address.to_string()));
	}

	Ok(())
}

pub fn validate_email_list(values: &[String]) -> EmailResult<()> {
	values.iter().try_for_each(|value| validate_email(value))
}

/// Reject values that would start a new header line
pub fn check_header_injection(value: &str) -> EmailResult<()> {
	if value.contains(['\r', '\n', '\0']) {
		return Err(EmailError::HeaderInjection(
			value.escape_debug().to_string(),
		));
	}
	Ok(())
}
