use thiserror::Error;

/// Errors that can occur while analyzing a document with Form Recognizer.
#[derive(Error, Debug)]
pub enum FormRecognizerError {
    /// The settings source could not be loaded, or a setting has an invalid value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A request builder was given invalid input.
    #[error("Builder error: {0}")]
    Builder(String),

    /// A request URL could not be constructed.
    #[error("Invalid endpoint URL: {message}")]
    InvalidEndpoint {
        message: String,
        #[source]
        source: Option<url::ParseError>,
    },

    /// The HTTP request failed at the transport level.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The submit call answered with something other than `202 Accepted`.
    #[error("unexpected status code: {status}, response body: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// A response body could not be decoded as a JSON object.
    #[error("Decode error: {0}")]
    Decode(#[source] serde_json::Error),

    /// A result document could not be encoded as JSON.
    #[error("Encode error: {0}")]
    Encode(#[source] serde_json::Error),

    /// Progress or result text could not be written.
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    /// The remote analysis job reported `failed`.
    #[error("Analysis failed ({code}): {message}")]
    AnalysisFailed { code: String, message: String },

    /// The poll loop gave up before the job reached a terminal status.
    #[error("Polling timed out after {attempts} attempts")]
    PollTimeout { attempts: u32 },
}

impl FormRecognizerError {
    /// Build an [`InvalidEndpoint`](Self::InvalidEndpoint) error that keeps the parse error as its source.
    pub fn invalid_endpoint_with_source(message: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidEndpoint {
            message: format!("{}: {source}", message.into()),
            source: Some(source),
        }
    }

    /// Build an [`UnexpectedStatus`](Self::UnexpectedStatus) error.
    pub fn unexpected_status(status: u16, body: impl Into<String>) -> Self {
        Self::UnexpectedStatus {
            status,
            body: body.into(),
        }
    }

    /// Process exit code for this error kind.
    ///
    /// `0` is success and `2` is left to command-line usage errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 3,
            Self::Builder(_) | Self::InvalidEndpoint { .. } => 4,
            Self::Request(_) => 5,
            Self::UnexpectedStatus { .. } => 6,
            Self::Decode(_) => 7,
            Self::Encode(_) | Self::Output(_) => 8,
            Self::AnalysisFailed { .. } => 9,
            Self::PollTimeout { .. } => 10,
        }
    }
}

/// Result type alias for Form Recognizer operations.
pub type FormRecognizerResult<T> = std::result::Result<T, FormRecognizerError>;
