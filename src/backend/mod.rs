//! Agent backend integration used for diagnostics and report delivery.

pub mod api;

pub use api::{BackendClient, BackendError};
