//! # Middleware
//!
//! - `metrics`: per-route request counters and latency histograms.

pub mod metrics;
