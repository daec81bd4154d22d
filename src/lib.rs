//! # popsub-notify
//!
//! `popsub-notify` turns plain HTTP GET requests into MQTT publishes on a
//! single, fixed topic. Callers are rate limited per address, and messages
//! that arrive while the broker is unreachable are held in memory and sent,
//! in order, once the connection is back.
//!
//! ## Core Modules
//!
//! - `broker`: the connection-aware publisher and the MQTT connection driver.
//! - `ratelimit`: the fixed-window, per-identity rate limiter.
//! - `transport`: the axum HTTP server that composes the two.
//! - `config`: loading and validating settings from file and environment.
//! - `utils`: error type and logging setup.

pub mod broker;
pub mod config;
pub mod ratelimit;
pub mod transport;
pub mod utils;
