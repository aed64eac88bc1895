//! Configuration structures and loading utilities.
//!
//! Every structure loads from environment variables with `from_env()` and
//! falls back to its `Default` for missing or malformed values.

pub mod analysis;
pub mod server;
pub mod summarizer;

pub use analysis::*;
pub use server::*;
pub use summarizer::*;
