//! # Chime Gateway
//!
//! HTTP admin API: CRUD over the group tree and its entries, base64
//! export/import, and event ingress for the chat network.

pub mod error;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, build_router, start};
