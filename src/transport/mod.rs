//! The `transport` module is the HTTP face of the service.
//!
//! It defines the request/response shapes of the notify endpoint and the
//! axum server that checks the caller against the rate limiter before
//! handing the message to the publisher.

pub mod http;
pub mod message;

pub use http::{AppState, create_router};
