//! # featgauge
//!
//! Application side of featgauge: configuration, the controller task, the
//! HTTP API and the CLI. The aggregation logic lives in `featgauge-core`.

pub mod api;
pub mod cli;
pub mod config;
pub mod controller;
