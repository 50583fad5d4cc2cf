//! HTTP service implementation.
//!
//! Translates requests under `/api/1.0` into engine calls and engine results
//! into JSON responses.
//!
//! ## Structure
//!
//! - [`handler`] - router, shared state and request handlers.
//! - [`error`] - mapping of engine errors onto HTTP status codes.
//! - [`config`] - concrete engine and backend types.

pub mod config;
pub mod error;
pub mod handler;
