use thiserror::Error;

/// How a failure should be treated by the retry driver.
///
/// Every error maps to exactly one class, decided here rather than ad hoc at
/// each call site. Transient transport and server-side failures are worth
/// another attempt; everything else terminates the request immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient — the retry driver may attempt again within its budget.
    Retryable,
    /// Permanent for this request — no further attempts.
    Terminal,
}

/// Unified error type for the adapter.
#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Remote service error: HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    /// The service answered but produced no usable candidate text
    /// (blocked prompt, empty candidate list, malformed body).
    #[error("Invalid response from service{}", feedback_suffix(.feedback))]
    InvalidResponse { feedback: Option<String> },

    /// A remote file upload ended in the FAILED state.
    #[error("Upload failed for {name}")]
    UploadFailed { name: String },

    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Audio encoding error: {0}")]
    Audio(#[from] hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn feedback_suffix(feedback: &Option<String>) -> String {
    match feedback {
        Some(fb) => format!(" (prompt feedback: {fb})"),
        None => String::new(),
    }
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Classify this error for the retry driver.
    ///
    /// HTTP 408/429 and 5xx are transient server conditions. Connection and
    /// timeout failures are transient. A response-validity failure is
    /// terminal: retrying a blocked prompt yields the same block.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Transport(e) => {
                if e.is_timeout() || e.is_connect() || e.is_request() {
                    ErrorClass::Retryable
                } else {
                    ErrorClass::Terminal
                }
            }
            Error::Remote { status, .. } => match status {
                408 | 429 => ErrorClass::Retryable,
                s if *s >= 500 => ErrorClass::Retryable,
                _ => ErrorClass::Terminal,
            },
            _ => ErrorClass::Terminal,
        }
    }

    /// Prompt-feedback diagnostic attached to a response-validity failure.
    pub fn prompt_feedback(&self) -> Option<&str> {
        match self {
            Error::InvalidResponse { feedback } => feedback.as_deref(),
            _ => None,
        }
    }
}
