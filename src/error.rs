//! Error types for the eligibility pipeline
//!
//! Each component boundary has its own error enum. Per-record failures are
//! folded into [`RecordError`], which knows how to describe itself in the
//! status column; main-loop failures are folded into [`LoopError`], which
//! decides the backoff tier.

use std::time::Duration;
use thiserror::Error;

/// Configuration could not be assembled from the environment
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required variable is absent or still holds a placeholder value
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    /// A variable is present but could not be parsed
    #[error("Invalid value for {name}: {value}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Raw value that failed to parse
        value: String,
    },
}

/// Failures while driving the remote UI
#[derive(Error, Debug)]
pub enum UiError {
    /// No element matched
    #[error("No element found for '{0}'")]
    NotFound(String),

    /// More than one element matched where exactly one was required
    #[error("Ambiguous match for '{target}': {count} elements")]
    Ambiguous {
        /// Selector or visible text that was matched
        target: String,
        /// Number of matches
        count: usize,
    },

    /// The selector resolved to something that is not a text input
    #[error("Element '{selector}' is not a fillable text input (found <{tag}>)")]
    NotFillable {
        /// Selector from the plan
        selector: String,
        /// Tag (and type) of the element that was found
        tag: String,
    },

    /// A bounded wait expired
    #[error("Timed out after {timeout:?} waiting for {what}")]
    Timeout {
        /// What was being waited for
        what: String,
        /// The bound that expired
        timeout: Duration,
    },

    /// The WebDriver session itself failed
    #[error("Browser driver error: {0}")]
    Driver(String),
}

impl From<fantoccini::error::CmdError> for UiError {
    fn from(e: fantoccini::error::CmdError) -> Self {
        UiError::Driver(e.to_string())
    }
}

/// Failures at the reasoning-service boundary
#[derive(Error, Debug)]
pub enum PlanError {
    /// The model call itself failed (transport, HTTP status, blocked prompt)
    #[error("Reasoning service call failed: {0}")]
    Model(String),

    /// The model answered, but not with the expected structured data
    #[error("Unparseable model output: {reason} - Raw response: {raw}")]
    Malformed {
        /// Parser message
        reason: String,
        /// Response text after fence stripping
        raw: String,
    },

    /// The structured data parsed but violates the plan schema
    #[error("Invalid plan: {0}")]
    Invalid(String),
}

/// Persisted session state could not be read or written
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// File I/O error
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),

    /// Well-formed JSON with an unsupported layout
    #[error("Invalid Data: {0}")]
    InvalidData(String),
}

/// Failures while establishing an authenticated portal session
#[derive(Error, Debug)]
pub enum SessionError {
    /// Navigation or element interaction failed during login
    #[error("Login step '{step}' failed: {source}")]
    Login {
        /// Step of the login sequence
        step: &'static str,
        /// Underlying UI failure
        #[source]
        source: UiError,
    },

    /// The passcode was submitted but the landing page never loaded
    #[error("Passcode verification did not reach the landing page: {0}")]
    VerificationFailed(#[source] UiError),

    /// No passcode could be read from the operator
    #[error("One-time passcode unavailable: {0}")]
    OtpUnavailable(String),

    /// Session state could not be saved
    #[error("Failed to persist session state: {0}")]
    Persistence(#[from] PersistenceError),
}

impl SessionError {
    /// Whether this failure must stop the process even inside the main loop
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::OtpUnavailable(_))
    }
}

/// Google OAuth token acquisition failures
#[derive(Error, Debug)]
pub enum AuthError {
    /// The service-account key file is missing or unreadable
    #[error("Failed to read service account key {path}: {reason}")]
    KeyFile {
        /// Path that was read
        path: String,
        /// Underlying reason
        reason: String,
    },

    /// The JWT assertion could not be signed
    #[error("Failed to sign token assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// The token endpoint rejected the request or was unreachable
    #[error("Token exchange failed: {0}")]
    Exchange(String),
}

/// Spreadsheet backend failures
#[derive(Error, Debug)]
pub enum QueueError {
    /// Could not obtain an access token
    #[error("Queue backend authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// The backend throttled us
    #[error("Queue backend rate limit exceeded: {0}")]
    RateLimited(String),

    /// Any other non-success response
    #[error("Queue backend returned HTTP {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// The request never completed
    #[error("Queue backend request failed: {0}")]
    Transport(String),
}

/// Evidence upload failures. Never escalated past the evidence recorder.
#[derive(Error, Debug)]
pub enum UploadError {
    /// Could not obtain an access token
    #[error("Artifact store authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Local file could not be read
    #[error("Failed to read artifact: {0}")]
    Io(#[from] std::io::Error),

    /// The store answered with an error or an unexpected body
    #[error("Artifact store error: {0}")]
    Store(String),
}

/// Why payer selection failed
#[derive(Error, Debug)]
pub enum PayerSelectionError {
    /// The selection plan could not be generated
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// A category or payer element could not be resolved
    #[error(transparent)]
    Ui(#[from] UiError),
}

/// Failure of one record's lookup. Always converted into a written result.
#[derive(Error, Debug)]
pub enum RecordError {
    /// The fill plan could not be generated or failed validation
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// An element could not be resolved, clicked, or waited for
    #[error(transparent)]
    Ui(#[from] UiError),

    /// The portal rejected the submitted values
    #[error("Form submission error on page: {0}")]
    FormValidation(String),
}

impl From<PayerSelectionError> for RecordError {
    fn from(e: PayerSelectionError) -> Self {
        match e {
            PayerSelectionError::Plan(e) => RecordError::Plan(e),
            PayerSelectionError::Ui(e) => RecordError::Ui(e),
        }
    }
}

impl RecordError {
    /// Tag written to the status column
    pub fn kind(&self) -> &'static str {
        match self {
            RecordError::Plan(_) => "PlanGenerationError",
            RecordError::Ui(_) => "UISelectionError",
            RecordError::FormValidation(_) => "FormValidationError",
        }
    }

    /// Terminal status value for this failure
    pub fn status(&self) -> String {
        match self {
            RecordError::FormValidation(reason) => format!("Error: {}: {}", self.kind(), reason),
            _ => format!("Error: {}", self.kind()),
        }
    }
}

/// Errors that escape a single pass of the main loop
#[derive(Error, Debug)]
pub enum LoopError {
    /// Spreadsheet backend failure; long backoff
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Session could not be (re-)established; fatal only for a missing passcode
    #[error(transparent)]
    Session(#[from] SessionError),
}
