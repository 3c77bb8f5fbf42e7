//! Command handlers behind the CLI.
//!
//! Handlers take the state they need and return serializable responses;
//! rendering is left to the binary.
//! - `auth`: `login`, `reset`
//! - `sync`: `check`, `watch`, `status`
//! - `pull_requests`: `list`, `mark-viewed`, `review-url`

pub mod auth;
pub mod pull_requests;
pub mod sync;

pub use auth::{login, reset, LoginInput, LoginResponse};
pub use pull_requests::{list, mark_viewed, review_url, ListEntry};
pub use sync::{check, status, watch, CategoryCount, CheckResponse, StatusResponse};
