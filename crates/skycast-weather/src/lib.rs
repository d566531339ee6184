//! Weather vendor client for Skycast.
//!
//! Wraps the timeline HTTP API: one request per (location, date) pair,
//! fixed short deadlines, no retries. Missing payload sections are "no
//! data", not errors.

pub mod client;
pub mod types;

pub use client::WeatherClient;
pub use types::*;
