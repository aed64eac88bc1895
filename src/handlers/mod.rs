//! HTTP request handlers for API endpoints.

pub mod events;
pub mod health;
pub mod metrics;
pub mod openapi;
pub mod version;

pub use events::*;
pub use health::*;
pub use metrics::*;
pub use openapi::*;
pub use version::*;
