//! Utility functions shared by handlers and middleware.

pub mod http;

pub use http::*;
