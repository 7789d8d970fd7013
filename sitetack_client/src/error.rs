// src/error.rs

use thiserror::Error;

/// Text shown when a failed submission carries no usable `detail` messages.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred.";

/// Why a submission produced no result. Every variant is terminal for that submission.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The server rejected the input and listed the reasons.
    #[error("submission rejected: {}", .0.join("; "))]
    Validation(Vec<String>),
    /// Non-2xx response whose body had no `detail` messages.
    #[error("submission failed with HTTP {status}")]
    Unrecognized { status: u16 },
    /// No response arrived.
    #[error("transport failure: {0}")]
    Transport(String),
    /// A response arrived but its body could not be read as a prediction.
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl SubmitError {
    /// The message placed in the results panel's alert.
    pub fn alert_message(&self) -> String {
        match self {
            SubmitError::Validation(messages) if !messages.is_empty() => messages.join("\n"),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Failures talking to the reference-data endpoints.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to fetch data from {url}. Status: {status}. Error: {body}")]
    Status { url: String, status: u16, body: String },
    #[error("exceeded maximum retries for {0}")]
    RetriesExhausted(String),
    #[error("unexpected payload from {url}: {reason}")]
    Payload { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("export is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}
