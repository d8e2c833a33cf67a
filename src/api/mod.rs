//! HTTP interface
//!
//! Thin axum layer over an [`Invoker`](crate::inference::Invoker): health
//! routes plus one POST route per enabled endpoint.

pub mod handlers;
pub mod server;
pub mod types;

pub use handlers::{ApiFailure, AppState, SharedState};
pub use server::{router, serve, start_server};
