//! # CoBlocks Core
//!
//! Building blocks shared by the CoBlocks form crates:
//!
//! - [`hooks`]: named filter and action slots that external code can attach to
//! - [`sanitize`]: plain-text, email, attribute and safe-HTML sanitization
//! - [`nonce`]: action-bound CSRF tokens signed with HMAC-SHA256
//!
//! ## Example
//!
//! ```
//! use coblocks_core::hooks::{Filter, HookName};
//!
//! let filter: Filter<String, str> = Filter::new(HookName::custom("shout"));
//! filter.add_filter(|value, _ctx| value.to_uppercase());
//!
//! assert_eq!(filter.apply("hello".to_string(), ""), "HELLO");
//! ```

pub mod hooks;
pub mod nonce;
pub mod sanitize;

pub use hooks::{Action, Filter, HookName, DEFAULT_PRIORITY};
pub use nonce::{HmacNonce, MAX_NONCE_LIFETIME, NonceAge, NonceError, NonceService};
