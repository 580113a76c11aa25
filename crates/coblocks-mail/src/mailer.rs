//! Sending helper with a scoped content type

use crate::backends::EmailBackend;
use crate::message::EmailMessage;
use crate::EmailResult;
use coblocks_core::sanitize::{strip_tags, unescape_html};
use parking_lot::Mutex;
use std::sync::Arc;

/// Body format used by [`Mailer::send`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
	#[default]
	Plain,
	Html,
}

impl ContentType {
	pub fn mime(&self) -> &'static str {
		match self {
			Self::Plain => "text/plain",
			Self::Html => "text/html",
		}
	}
}

/// A backend plus the sender address and the current content type
///
/// The content type is plain text unless a [`ContentTypeGuard`] is alive.
pub struct Mailer {
	backend: Arc<dyn EmailBackend>,
	from_email: String,
	content_type: Mutex<ContentType>,
}

impl std::fmt::Debug for Mailer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Mailer")
			.field("from_email", &self.from_email)
			.field("content_type", &*self.content_type.lock())
			.finish_non_exhaustive()
	}
}

impl Mailer {
	pub fn new(backend: Arc<dyn EmailBackend>, from_email: impl Into<String>) -> Self {
		Self {
			backend,
			from_email: from_email.into(),
			content_type: Mutex::new(ContentType::Plain),
		}
	}

	pub fn from_email(&self) -> &str {
		&self.from_email
	}

	pub fn content_type(&self) -> ContentType {
		*self.content_type.lock()
	}

	/// Switch the content type until the returned guard is dropped
	///
	/// Guards nest; each restores the type that was active when it was made.
	pub fn scoped_content_type(&self, content_type: ContentType) -> ContentTypeGuard<'_> {
		let previous = std::mem::replace(&mut *self.content_type.lock(), content_type);
		ContentTypeGuard {
			mailer: self,
			previous,
		}
	}

	/// Send one message in the current content type
	///
	/// `to` may list several comma-separated recipients. HTML messages carry
	/// a tag-stripped plain-text alternative.
	pub async fn send(&self, to: &str, subject: &str, body: &str) -> EmailResult<()> {
		self.send_with_reply_to(to, subject, body, &[]).await
	}

	/// [`send`](Self::send) with `Reply-To` set to `reply_to`
	pub async fn send_with_reply_to(
		&self,
		to: &str,
		subject: &str,
		body: &str,
		reply_to: &[String],
	) -> EmailResult<()> {
		let content_type = self.content_type();
		let builder = EmailMessage::builder()
			.from(&self.from_email)
			.to(split_recipients(to))
			.reply_to(reply_to.to_vec())
			.subject(subject);

		let message = match content_type {
			ContentType::Html => builder.body(plain_alternative(body)).html(body),
			ContentType::Plain => builder.body(body),
		}
		.build()?;

		tracing::debug!(
			to = %to,
			content_type = content_type.mime(),
			"sending email"
		);
		message.send(self.backend.as_ref()).await
	}
}

/// Recipients of a comma-separated `To` value, blanks dropped
///
/// Commas inside a quoted display name do not split.
pub fn split_recipients(to: &str) -> Vec<String> {
	let mut recipients = Vec::new();
	let mut current = String::new();
	let mut quoted = false;
	for c in to.chars() {
		match c {
			'"' => {
				quoted = !quoted;
				current.push(c);
			}
			',' if !quoted => recipients.push(std::mem::take(&mut current)),
			_ => current.push(c),
		}
	}
	recipients.push(current);

	recipients
		.into_iter()
		.map(|recipient| recipient.trim().to_string())
		.filter(|recipient| !recipient.is_empty())
		.collect()
}

/// Text rendering of an HTML body, one line per list item or paragraph
fn plain_alternative(html: &str) -> String {
	let spaced = html
		.replace("</li>", "</li>\n")
		.replace("</p>", "</p>\n")
		.replace("<br>", "\n")
		.replace("<br />", "\n");
	unescape_html(strip_tags(&spaced).trim())
}

/// Restores the previous content type on drop
#[must_use = "the content type is restored as soon as the guard is dropped"]
pub struct ContentTypeGuard<'a> {
	mailer: &'a Mailer,
	previous: ContentType,
}

impl Drop for ContentTypeGuard<'_> {
	fn drop(&mut self) {
		*self.mailer.content_type.lock() = self.previous;
	}
}
