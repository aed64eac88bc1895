//! Cross-cutting request middleware.

pub mod telemetry;

pub use telemetry::*;
