//! MPM Protocol - Backend HTTP API types
//!
//! This crate provides the request/response bodies exchanged with the
//! process-manager backend and the normalizer that turns raw
//! `SHOW FULL PROCESSLIST` rows into canonical snapshots.

pub mod message;
pub mod parse;

pub use message::{
    cell_text, ErrorBody, ExecuteRequest, ExecuteResult, ExplainResponse, KillFailure,
    KillRequest, KillResponse, PingResponse, QueryRequest, RecommendResponse, TokenResponse,
};
pub use parse::{normalize_snapshot, parse_snapshot, RawProcess};
