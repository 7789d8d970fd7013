//! Client for the Sitetack PTM site prediction service: submission, threshold
//! highlighting of the returned per-site probabilities, and JSON/CSV export.

pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod form;
pub mod models;
pub mod reference;
pub mod render;
pub mod session;
