//! flowscan: heuristic market scanner
//!
//! This library provides the core components for:
//! - Candidate acquisition from screener and full-universe providers
//! - Cheap metadata-only pre-filtering
//! - Rate-limited bounded-concurrency deep analysis
//! - Support/resistance and volume-profile computation
//! - Pillars, Quality, Dark-Flow and Pressure-Cooker scoring
//! - Deduplicated, deterministically ranked results
//! - File-backed TTL caching
//! - Full observability stack

pub mod analysis;
pub mod backoff;
pub mod cache;
pub mod catalyst;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod exec;
pub mod prefilter;
pub mod provider;
pub mod scan;
pub mod telemetry;
