//! Form block rendering and submission processing.
//!
//! # Examples
//!
//! ```rust,no_run
//! # #[cfg(feature = "forms")]
//! use coblocks::forms::{FormProcessor, FormRequest, SubmissionOutcome};
//! ```

#[cfg(feature = "forms")]
pub use coblocks_forms::*;
