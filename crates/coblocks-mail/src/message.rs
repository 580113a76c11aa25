/// An email message ready to hand to a backend.
///
/// Use getter methods for read access and the builder for construction, so
/// every message has passed address and header validation.
///
/// # Examples
///
/// ```
/// use coblocks_mail::EmailMessage;
///
/// let message = EmailMessage::builder()
///     .from("noreply@example.com")
///     .to(vec!["admin@example.com".to_string()])
///     .subject("My Site - Contact")
///     .body("Name: Alice")
///     .html("<ul><li>Name: Alice</li></ul>")
///     .build()
///     .unwrap();
///
/// assert!(message.is_html());
/// assert_eq!(message.to(), ["admin@example.com"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
	subject: String,
	body: String,
	from_email: String,
	to: Vec<String>,
	reply_to: Vec<String>,
	html_body: Option<String>,
}

impl EmailMessage {
	pub fn builder() -> EmailMessageBuilder {
		EmailMessageBuilder::default()
	}

	pub fn subject(&self) -> &str {
		&self.subject
	}

	/// Plain-text body
	pub fn body(&self) -> &str {
		&self.body
	}

	pub fn from_email(&self) -> &str {
		&self.from_email
	}

	pub fn to(&self) -> &[String] {
		&self.to
	}

	pub fn reply_to(&self) -> &[String] {
		&self.reply_to
	}

	pub fn html_body(&self) -> Option<&str> {
		self.html_body.as_deref()
	}

	pub fn is_html(&self) -> bool {
		self.html_body.is_some()
	}

	/// Send the message through `backend`
	pub async fn send(&self, backend: &dyn crate::backends::EmailBackend) -> crate::EmailResult<()> {
		backend.send_messages(std::slice::from_ref(self)).await?;
		Ok(())
	}
}

#[derive(Debug, Default)]
pub struct EmailMessageBuilder {
	subject: String,
	body: String,
	from_email: String,
	to: Vec<String>,
	reply_to: Vec<String>,
	html_body: Option<String>,
}

impl EmailMessageBuilder {
	pub fn subject(mut self, subject: impl Into<String>) -> Self {
		self.subject = subject.into();
		self
	}

	pub fn body(mut self, body: impl Into<String>) -> Self {
		self.body = body.into();
		self
	}

	pub fn from(mut self, from: impl Into<String>) -> Self {
		self.from_email = from.into();
		self
	}

	pub fn to(mut self, to: Vec<String>) -> Self {
		self.to = to;
		self
	}

	pub fn reply_to(mut self, reply_to: Vec<String>) -> Self {
		self.reply_to = reply_to;
		self
	}

	pub fn html(mut self, html: impl Into<String>) -> Self {
		self.html_body = Some(html.into());
		self
	}

	/// Build the message, validating addresses and the subject line.
	pub fn build(self) -> crate::EmailResult<EmailMessage> {
		use crate::EmailError;
		use crate::validation::{check_header_injection, validate_email, validate_email_list};

		if self.from_email.is_empty() {
			return Err(EmailError::MissingField("from".to_string()));
		}
		validate_email(&self.from_email)?;

		if self.to.is_empty() {
			return Err(EmailError::MissingField("to".to_string()));
		}
		validate_email_list(&self.to)?;
		validate_email_list(&self.reply_to)?;

		check_header_injection(&self.subject)?;

		Ok(EmailMessage {
			subject: self.subject,
			body: self.body,
			from_email: self.from_email,
			to: self.to,
			reply_to: self.reply_to,
			html_body: self.html_body,
		})
	}
}
