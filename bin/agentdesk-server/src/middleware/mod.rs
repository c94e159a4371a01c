//! HTTP middleware stack: bearer-token gate, CORS and per-request tracing.

pub mod auth;
pub mod cors;
pub mod trace;
