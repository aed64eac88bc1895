//! Data models for the ITO event insight service.
//!
//! `events` holds the analysis core's records and statistics snapshot,
//! `api` the request/response bodies, and `narrative` the payload sent to the
//! language-model provider.

pub mod api;
pub mod events;
pub mod narrative;

pub use api::*;
pub use events::*;
pub use narrative::*;
