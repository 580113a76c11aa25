//! Settings loaded from TOML and `COBLOCKS_*` environment variables.

pub use coblocks_conf::*;
