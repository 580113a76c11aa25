//! Email messages, transports and the [`Mailer`].

#[cfg(feature = "mail")]
pub use coblocks_mail::*;
