//! Extension points, sanitization and nonces.
//!
//! # Examples
//!
//! ```
//! use coblocks::core::sanitize::sanitize_text_field;
//!
//! assert_eq!(sanitize_text_field("  Alice\n\tSmith "), "Alice Smith");
//! ```

pub use coblocks_core::*;
