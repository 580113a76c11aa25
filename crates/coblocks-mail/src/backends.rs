//! Email transports

use crate::message::EmailMessage;
use crate::validation::split_mailbox;
use crate::{EmailError, EmailResult};
use async_trait::async_trait;
use coblocks_conf::EmailSettings;
use lettre::message::header::ContentType as MimeType;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Delivers messages somewhere
#[async_trait]
pub trait EmailBackend: Send + Sync {
	/// Send `messages`, returning how many were delivered
	async fn send_messages(&self, messages: &[EmailMessage]) -> EmailResult<usize>;
}

/// Prints messages to stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleBackend;

impl ConsoleBackend {
	fn format_message(message: &EmailMessage) -> String {
		let mut output = String::new();
		output.push_str(&format!("From: {}\n", message.from_email()));
		output.push_str(&format!("To: {}\n", message.to().join(", ")));
		if !message.reply_to().is_empty() {
			output.push_str(&format!("Reply-To: {}\n", message.reply_to().join(", ")));
		}
		output.push_str(&format!("Subject: {}\n", message.subject()));
		match message.html_body() {
			Some(html) => {
				output.push_str("Content-Type: text/html; charset=utf-8\n\n");
				output.push_str(html);
			}
			None => {
				output.push_str("Content-Type: text/plain; charset=utf-8\n\n");
				output.push_str(message.body());
			}
		}
		output
	}
}

#[async_trait]
impl EmailBackend for ConsoleBackend {
	async fn send_messages(&self, messages: &[EmailMessage]) -> EmailResult<usize> {
		for message in messages {
			println!("{}", Self::format_message(message));
			println!("{}", "-".repeat(79));
		}
		Ok(messages.len())
	}
}

/// Keeps messages in memory
///
/// Clones share the same outbox. [`MemoryBackend::failing`] builds a backend
/// that rejects every send, for exercising error paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
	outbox: Arc<RwLock<Vec<EmailMessage>>>,
	failure: Option<String>,
}

impl MemoryBackend {
	pub fn new() -> Self {
		Self::default()
	}

	/// A backend whose every send fails with `reason`
	pub fn failing(reason: impl Into<String>) -> Self {
		Self {
			outbox: Arc::default(),
			failure: Some(reason.into()),
		}
	}

	/// Messages delivered so far
	pub fn messages(&self) -> Vec<EmailMessage> {
		self.outbox.read().clone()
	}

	pub fn count(&self) -> usize {
		self.outbox.read().len()
	}

	pub fn clear(&self) {
		self.outbox.write().clear();
	}
}

#[async_trait]
impl EmailBackend for MemoryBackend {
	async fn send_messages(&self, messages: &[EmailMessage]) -> EmailResult<usize> {
		if let Some(reason) = &self.failure {
			return Err(EmailError::BackendError(reason.clone()));
		}
		self.outbox.write().extend_from_slice(messages);
		Ok(messages.len())
	}
}

/// Connection security for SMTP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtpSecurity {
	/// Plain connection
	#[default]
	None,
	/// Upgrade with STARTTLS
	StartTls,
	/// Implicit TLS
	Tls,
}

#[derive(Clone)]
pub struct SmtpConfig {
	pub host: String,
	pub port: u16,
	pub username: Option<String>,
	pub password: Option<String>,
	pub security: SmtpSecurity,
	pub timeout: Option<Duration>,
}

impl std::fmt::Debug for SmtpConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SmtpConfig")
			.field("host", &self.host)
			.field("port", &self.port)
			.field("username", &self.username)
			.field("password", &self.password.as_ref().map(|_| "[redacted]"))
			.field("security", &self.security)
			.field("timeout", &self.timeout)
			.finish()
	}
}

impl SmtpConfig {
	pub fn new(host: impl Into<String>, port: u16) -> Self {
		Self {
			host: host.into(),
			port,
			username: None,
			password: None,
			security: SmtpSecurity::None,
			timeout: None,
		}
	}

	pub fn with_credentials(mut self, username: String, password: String) -> Self {
		self.username = Some(username);
		self.password = Some(password);
		self
	}

	pub fn with_security(mut self, security: SmtpSecurity) -> Self {
		self.security = security;
		self
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);
		self
	}

	pub fn from_settings(settings: &EmailSettings) -> Self {
		let security = if settings.use_ssl {
			SmtpSecurity::Tls
		} else if settings.use_tls {
			SmtpSecurity::StartTls
		} else {
			SmtpSecurity::None
		};

		let mut config = Self::new(&settings.host, settings.port).with_security(security);
		if let Some(username) = &settings.username {
			config = config.with_credentials(
				username.clone(),
				settings.password.clone().unwrap_or_default(),
			);
		}
		if let Some(secs) = settings.timeout {
			config = config.with_timeout(Duration::from_secs(secs));
		}
		config
	}
}

/// Sends through an SMTP relay
pub struct SmtpBackend {
	transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpBackend {
	pub fn new(config: SmtpConfig) -> EmailResult<Self> {
		let mut builder = match config.security {
			SmtpSecurity::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
			SmtpSecurity::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
				.map_err(|e| EmailError::SmtpError(e.to_string()))?,
			SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
				.map_err(|e| EmailError::SmtpError(e.to_string()))?,
		}
		.port(config.port)
		.timeout(config.timeout);

		if let Some(username) = config.username {
			builder = builder.credentials(Credentials::new(
				username,
				config.password.unwrap_or_default(),
			));
		}

		Ok(Self {
			transport: builder.build(),
		})
	}

	fn build_message(message: &EmailMessage) -> EmailResult<Message> {
		let mut builder = Message::builder()
			.from(parse_mailbox(message.from_email())?)
			.subject(message.subject());
		for to in message.to() {
			builder = builder.to(parse_mailbox(to)?);
		}
		for reply_to in message.reply_to() {
			builder = builder.reply_to(parse_mailbox(reply_to)?);
		}

		let built = match message.html_body() {
			Some(html) => builder.multipart(MultiPart::alternative_plain_html(
				message.body().to_string(),
				html.to_string(),
			)),
			None => builder
				.header(MimeType::TEXT_PLAIN)
				.body(message.body().to_string()),
		};
		built.map_err(|e| EmailError::InvalidHeader(e.to_string()))
	}
}

fn parse_mailbox(value: &str) -> EmailResult<Mailbox> {
	let (name, address) = split_mailbox(value);
	let address = address
		.parse()
		.map_err(|_| EmailError::InvalidAddress(address.to_string()))?;
	Ok(Mailbox::new(name.map(str::to_string), address))
}

#[async_trait]
impl EmailBackend for SmtpBackend {
	async fn send_messages(&self, messages: &[EmailMessage]) -> EmailResult<usize> {
		let mut sent = 0;
		for message in messages {
			let email = Self::build_message(message)?;
			self.transport
				.send(email)
				.await
				.map_err(|e| EmailError::SmtpError(e.to_string()))?;
			sent += 1;
		}
		Ok(sent)
	}
}

/// Build the backend named by `settings.backend`
pub fn backend_from_settings(settings: &EmailSettings) -> EmailResult<Arc<dyn EmailBackend>> {
	match settings.backend.as_str() {
		"console" => Ok(Arc::new(ConsoleBackend)),
		"memory" => Ok(Arc::new(MemoryBackend::new())),
		"smtp" => Ok(Arc::new(SmtpBackend::new(SmtpConfig::from_settings(settings))?)),
		other => Err(EmailError::BackendError(format!(
			"unknown email backend '{}'",
			other
		))),
	}
}
