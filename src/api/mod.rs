//! Interest Bridge API Server module
//!
//! HTTP REST API in front of the spreadsheet gateway.
//! Run with `interest-bridge serve`.

pub mod handlers;
pub mod server;

pub use server::{build_router, init_tracing, run_api_server, ApiConfig, AppState};
