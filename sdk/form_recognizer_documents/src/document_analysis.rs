//! Document analysis against the Form Recognizer REST API.
//!
//! Analysis is asynchronous: a submit request returns `202 Accepted` with an
//! `Operation-Location` header, and the client polls that URL until the job
//! reports `succeeded`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use form_recognizer_core::auth::SubscriptionKey;
//! use form_recognizer_core::client::{AnalysisClient, PollPolicy};
//! use form_recognizer_documents::document_analysis::{self, DocumentAnalysisRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AnalysisClient::builder()
//!     .endpoint("https://your-resource.cognitiveservices.azure.com")
//!     .credential(SubscriptionKey::new("your-key"))
//!     .build()?;
//!
//! let request = DocumentAnalysisRequest::new("prebuilt-layout", "https://example.com/form.pdf");
//! let operation = document_analysis::analyze(&client, &request).await?;
//! let document = document_analysis::poll_until_complete(
//!     &client,
//!     &operation.operation_location,
//!     &PollPolicy::default(),
//! )
//! .await?;
//! println!("{}", document.status());
//! # Ok(())
//! # }
//! ```

use form_recognizer_core::client::{AnalysisClient, PollPolicy};
use form_recognizer_core::config::Settings;
use form_recognizer_core::error::{FormRecognizerError, FormRecognizerResult};
use reqwest::StatusCode;
use serde::Serialize;

use crate::models::{AnalysisStatus, OperationStatus, ResultDocument};

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// A request to analyze the document at a URL.
///
/// Neither field is validated; empty values produce a request the service
/// will reject.
#[derive(Debug, Clone)]
pub struct DocumentAnalysisRequest {
    /// The model ID to use for analysis.
    pub model_id: String,

    /// URL of the document to analyze.
    pub url_source: String,
}

/// The JSON body sent to the analyze endpoint.
#[derive(Debug, Serialize)]
struct AnalyzeDocumentBody<'a> {
    #[serde(rename = "urlSource")]
    url_source: &'a str,
}

impl DocumentAnalysisRequest {
    /// Create a request for `url_source` analyzed with `model_id`.
    pub fn new(model_id: impl Into<String>, url_source: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            url_source: url_source.into(),
        }
    }

    /// Create the request described by run settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.model_id, &settings.document_url)
    }

    fn body(&self) -> AnalyzeDocumentBody<'_> {
        AnalyzeDocumentBody {
            url_source: &self.url_source,
        }
    }
}

// ---------------------------------------------------------------------------
// API functions
// ---------------------------------------------------------------------------

/// Submit a document for analysis.
///
/// Only `202 Accepted` counts as success; any other status becomes
/// [`FormRecognizerError::UnexpectedStatus`] carrying the response body.
///
/// The returned [`OperationStatus`] holds the `Operation-Location` header
/// verbatim. If the header is missing or not visible ASCII the handle is
/// empty and a warning is logged; the first poll will then fail to parse it.
///
/// # Tracing
///
/// Emits a span named `form_recognizer::document_analysis::analyze` with field `model_id`.
#[tracing::instrument(
    name = "form_recognizer::document_analysis::analyze",
    skip(client, request),
    fields(model_id = %request.model_id)
)]
pub async fn analyze(
    client: &AnalysisClient,
    request: &DocumentAnalysisRequest,
) -> FormRecognizerResult<OperationStatus> {
    tracing::debug!("submitting document for analysis");

    let url = client.analyze_url(&request.model_id)?;
    let response = client.post_json(url, &request.body()).await?;
    let response = client.expect_status(response, StatusCode::ACCEPTED).await?;

    let operation_location = match response.headers().get("Operation-Location") {
        Some(value) => match value.to_str() {
            Ok(location) => location.to_string(),
            Err(_) => {
                tracing::warn!("Operation-Location header is not visible ASCII, ignoring it");
                String::new()
            }
        },
        None => {
            tracing::warn!("Operation-Location header missing from response");
            String::new()
        }
    };

    tracing::debug!(operation_location = %operation_location, "document analysis submitted");

    Ok(OperationStatus { operation_location })
}

/// Fetch the current state of an analyze operation.
///
/// The response status code is not checked: whatever body comes back is
/// decoded as a JSON object. A missing `status` key decodes as
/// [`AnalysisStatus::Unknown`] with an empty value.
///
/// # Tracing
///
/// Emits a span named `form_recognizer::document_analysis::get_result`.
#[tracing::instrument(
    name = "form_recognizer::document_analysis::get_result",
    skip(client),
    fields(operation_location = %operation_location)
)]
pub async fn get_result(
    client: &AnalysisClient,
    operation_location: &str,
) -> FormRecognizerResult<ResultDocument> {
    tracing::debug!("fetching analyze result");

    let url = AnalysisClient::operation_url(operation_location)?;
    let response = client.get(url).await?;

    let http_status = response.status();
    if !http_status.is_success() {
        tracing::debug!(status = http_status.as_u16(), "non-success poll response, decoding body anyway");
    }

    let body = response.bytes().await?;
    let document = ResultDocument::from_json_slice(&body)?;

    tracing::debug!(status = %document.status(), "analyze result fetched");
    Ok(document)
}

/// Poll an analyze operation until it succeeds.
///
/// Equivalent to [`poll_until_complete_with_progress`] with no progress callback.
pub async fn poll_until_complete(
    client: &AnalysisClient,
    operation_location: &str,
    policy: &PollPolicy,
) -> FormRecognizerResult<ResultDocument> {
    poll_until_complete_with_progress(client, operation_location, policy, |_, _| Ok(())).await
}

/// Poll an analyze operation until it succeeds, reporting every poll.
///
/// `on_poll` is called with the 1-based attempt number and the decoded
/// document after each poll; an error from it stops the loop.
///
/// Outcomes:
/// - `succeeded`: the document from that poll is returned.
/// - `failed`: [`FormRecognizerError::AnalysisFailed`] with the service's error details.
/// - anything else (queued, running, unknown, missing): wait per `policy`, then poll again.
///
/// # Errors
///
/// Returns [`FormRecognizerError::PollTimeout`] once `policy.max_attempts`
/// polls have been made, or when the next wait would exceed
/// `policy.max_duration`. Any poll error aborts the loop without retry.
///
/// # Tracing
///
/// Emits a span named `form_recognizer::document_analysis::poll_until_complete`.
#[tracing::instrument(
    name = "form_recognizer::document_analysis::poll_until_complete",
    skip(client, policy, on_poll),
    fields(operation_location = %operation_location)
)]
pub async fn poll_until_complete_with_progress<F>(
    client: &AnalysisClient,
    operation_location: &str,
    policy: &PollPolicy,
    mut on_poll: F,
) -> FormRecognizerResult<ResultDocument>
where
    F: FnMut(u32, &ResultDocument) -> FormRecognizerResult<()>,
{
    tracing::debug!("starting to poll for completion");

    let started = tokio::time::Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts = attempts.saturating_add(1);

        let document = get_result(client, operation_location).await?;
        on_poll(attempts, &document)?;

        match document.status() {
            AnalysisStatus::Succeeded => {
                tracing::debug!(attempts, "operation succeeded");
                return Ok(document);
            }
            AnalysisStatus::Failed => {
                let details = document.error().unwrap_or_default();
                tracing::debug!(attempts, code = %details.code, "operation failed");
                return Err(FormRecognizerError::AnalysisFailed {
                    code: if details.code.is_empty() {
                        "unknown".into()
                    } else {
                        details.code
                    },
                    message: details.message,
                });
            }
            _ => {}
        }

        if policy.attempts_exhausted(attempts) {
            return Err(FormRecognizerError::PollTimeout { attempts });
        }

        let delay = policy.delay_for(attempts);
        if let Some(max_duration) = policy.max_duration {
            if started.elapsed().saturating_add(delay) > max_duration {
                return Err(FormRecognizerError::PollTimeout { attempts });
            }
        }

        tracing::trace!(
            status = %document.status(),
            attempt = attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "operation still in progress, waiting",
        );
        tokio::time::sleep(delay).await;
    }
}
