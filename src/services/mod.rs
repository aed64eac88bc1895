//! Event analysis services.
//!
//! The analysis core (`duration`, `aggregator`, `report`) is pure and
//! synchronous. `ingest` feeds it from CSV sources and `narrative` hands its
//! output to a language-model provider; `metrics` and `rate_limit` serve the
//! HTTP layer.

pub mod aggregator;
pub mod duration;
pub mod ingest;
pub mod metrics;
pub mod narrative;
pub mod rate_limit;
pub mod report;

pub use aggregator::*;
pub use duration::*;
pub use ingest::*;
pub use metrics::*;
pub use narrative::*;
pub use rate_limit::*;
pub use report::*;
