//! Result types for Form Recognizer analyze operations.
//!
//! The service answers every poll with a JSON object carrying a `status` key
//! and a model-specific payload. [`ResultDocument`] keeps the whole object so
//! it can be printed unchanged, and decodes `status` into [`AnalysisStatus`].

use form_recognizer_core::error::{FormRecognizerError, FormRecognizerResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Status of an asynchronous analyze operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisStatus {
    /// Accepted but not started (`notStarted` or `queued`).
    Queued,
    /// In progress.
    Running,
    /// Completed successfully.
    Succeeded,
    /// Completed with an error.
    Failed,
    /// Any other value, kept verbatim. A missing status is `Unknown("")`.
    Unknown(String),
}

impl AnalysisStatus {
    /// Map a raw `status` value onto a variant.
    pub fn from_api(raw: &str) -> Self {
        match raw {
            "notStarted" | "queued" => Self::Queued,
            "running" => Self::Running,
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Returns the API string representation of this status.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Unknown(raw) => raw,
        }
    }

    /// Returns `true` if the status is terminal (succeeded or failed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AnalysisStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_api(&raw))
    }
}

/// Error details reported by the service for a failed operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeOperationError {
    /// The error code.
    #[serde(default)]
    pub code: String,
    /// Human-readable error description.
    #[serde(default)]
    pub message: String,
}

/// One decoded poll response.
///
/// `fields` is the complete JSON object returned by the service, including
/// `status`. Each poll produces a new document; nothing is merged.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultDocument {
    status: AnalysisStatus,
    fields: Map<String, Value>,
}

impl ResultDocument {
    /// Decode a response body. Anything other than a JSON object is an error.
    pub fn from_json_slice(bytes: &[u8]) -> FormRecognizerResult<Self> {
        let fields: Map<String, Value> =
            serde_json::from_slice(bytes).map_err(FormRecognizerError::Decode)?;
        Ok(Self::from_map(fields))
    }

    /// Wrap an already decoded JSON object.
    pub fn from_map(fields: Map<String, Value>) -> Self {
        let status = match fields.get("status") {
            Some(Value::String(raw)) => AnalysisStatus::from_api(raw),
            Some(other) => AnalysisStatus::Unknown(other.to_string()),
            None => AnalysisStatus::Unknown(String::new()),
        };

        Self { status, fields }
    }

    /// The decoded status.
    pub fn status(&self) -> &AnalysisStatus {
        &self.status
    }

    /// The `status` value exactly as the service sent it.
    ///
    /// Empty when the key is missing or not a string.
    pub fn raw_status(&self) -> &str {
        self.fields.get("status").and_then(Value::as_str).unwrap_or_default()
    }

    /// The full JSON object.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Consume the document, returning the JSON object.
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    /// The model-specific payload under `analyzeResult`, if present.
    pub fn analyze_result(&self) -> Option<&Value> {
        self.fields.get("analyzeResult")
    }

    /// Error details under `error`, if present and well-formed.
    pub fn error(&self) -> Option<AnalyzeOperationError> {
        self.fields
            .get("error")
            .and_then(|value| AnalyzeOperationError::deserialize(value).ok())
    }
}

impl Serialize for ResultDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ResultDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Self::from_map)
    }
}

/// The result of submitting a document for analysis.
///
/// Contains the `Operation-Location` URL to poll for results. The value is
/// taken from the response as is and may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationStatus {
    /// The URL to poll for the analysis result.
    pub operation_location: String,
}
