//! HTTP client for the Form Recognizer document analysis API.
//!
//! This module provides [`AnalysisClient`], which owns the HTTP transport, the
//! resource endpoint, the API version, and the subscription-key credential. It
//! also defines [`PollPolicy`], the bounded backoff schedule used while waiting
//! for an analysis job to finish.
//!
//! # Example
//!
//! ```rust,no_run
//! use form_recognizer_core::auth::SubscriptionKey;
//! use form_recognizer_core::client::AnalysisClient;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AnalysisClient::builder()
//!     .endpoint("https://your-resource.cognitiveservices.azure.com")
//!     .credential(SubscriptionKey::new("your-key"))
//!     .api_version("2023-07-31")
//!     .build()?;
//!
//! let url = client.analyze_url("prebuilt-layout")?;
//! println!("{url}");
//! # Ok(())
//! # }
//! ```

use crate::auth::{SubscriptionKey, SUBSCRIPTION_KEY_HEADER};
use crate::error::{FormRecognizerError, FormRecognizerResult};
use reqwest::Client as HttpClient;
use reqwest::StatusCode;
use url::Url;

use std::time::Duration;

/// Default API version for the Form Recognizer REST API.
pub const DEFAULT_API_VERSION: &str = "2023-07-31";

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default read/response timeout (60 seconds).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Default wait before the second poll (5 seconds).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default upper bound for a single wait between polls (30 seconds).
pub const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default growth factor applied to the wait after every poll.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 1.5;

/// Default jitter fraction (±25%).
pub const DEFAULT_POLL_JITTER: f64 = 0.25;

/// Default maximum number of polls.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 60;

/// Schedule for polling an analysis job.
///
/// The wait after poll `n` is `initial_interval * multiplier^(n-1)`, capped at
/// `max_interval`, then scaled by a random factor in `[1 - jitter, 1 + jitter]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Maximum number of polls. `0` disables the limit.
    pub max_attempts: u32,
    /// Wait after the first poll.
    pub initial_interval: Duration,
    /// Upper bound for a single wait (before jitter).
    pub max_interval: Duration,
    /// Growth factor per poll. `1.0` keeps the interval constant.
    pub multiplier: f64,
    /// Jitter fraction in `[0, 1)`. `0.0` disables jitter.
    pub jitter: f64,
    /// Overall time budget for the poll loop, if any.
    pub max_duration: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            initial_interval: DEFAULT_POLL_INTERVAL,
            max_interval: DEFAULT_MAX_POLL_INTERVAL,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            jitter: DEFAULT_POLL_JITTER,
            max_duration: None,
        }
    }
}

impl PollPolicy {
    /// Constant interval, no jitter, no attempt or time limit.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            max_attempts: 0,
            initial_interval: interval,
            max_interval: interval,
            multiplier: 1.0,
            jitter: 0.0,
            max_duration: None,
        }
    }

    /// Returns `true` once `attempts` polls have used up the attempt budget.
    pub fn attempts_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts > 0 && attempts >= self.max_attempts
    }

    /// The wait after poll number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let grown = self.initial_interval.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);
        let capped = grown.min(self.max_interval.as_secs_f64());

        if self.jitter <= 0.0 {
            return secs_to_duration(capped);
        }

        let jitter = self.jitter.min(1.0);
        let factor = 1.0 - jitter + fastrand::f64() * 2.0 * jitter;
        secs_to_duration(capped * factor)
    }
}

// Waits too long for `Duration` saturate instead of panicking.
fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// Client for the Form Recognizer document analysis API.
///
/// Holds the resource endpoint, API version, and subscription key. Every
/// request carries the `Ocp-Apim-Subscription-Key` header and nothing else
/// beyond what the request body requires.
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    pub(crate) http: HttpClient,
    pub(crate) endpoint: Url,
    pub(crate) credential: SubscriptionKey,
    pub(crate) api_version: String,
}

/// Builder for constructing an [`AnalysisClient`].
///
/// Use [`AnalysisClient::builder()`] to create a new builder.
#[derive(Debug, Default)]
pub struct AnalysisClientBuilder {
    endpoint: Option<String>,
    credential: Option<SubscriptionKey>,
    api_version: Option<String>,
    http_client: Option<HttpClient>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
}

impl AnalysisClient {
    /// Maximum length for response bodies quoted in error messages.
    const MAX_ERROR_MESSAGE_LEN: usize = 1000;

    /// Create a new builder for configuring an `AnalysisClient`.
    pub fn builder() -> AnalysisClientBuilder {
        AnalysisClientBuilder::default()
    }

    /// Get the resource endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Get the API version being used.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Build the analyze URL for a model.
    ///
    /// `{endpoint}/formrecognizer/documentModels/{model_id}:analyze?api-version={api_version}`
    pub fn analyze_url(&self, model_id: &str) -> FormRecognizerResult<Url> {
        let raw = format!(
            "{}/formrecognizer/documentModels/{model_id}:analyze?api-version={}",
            self.endpoint.as_str().trim_end_matches('/'),
            self.api_version,
        );

        Url::parse(&raw)
            .map_err(|e| FormRecognizerError::invalid_endpoint_with_source("failed to construct analyze URL", e))
    }

    /// Parse an `Operation-Location` value into a URL.
    pub fn operation_url(operation_location: &str) -> FormRecognizerResult<Url> {
        Url::parse(operation_location).map_err(|e| {
            FormRecognizerError::invalid_endpoint_with_source("failed to parse Operation-Location URL", e)
        })
    }

    /// Send a POST request with a JSON body.
    ///
    /// `Content-Type: application/json` is set once, by the JSON body. The
    /// response is returned whatever its status; callers decide what counts
    /// as success.
    pub async fn post_json<T: serde::Serialize>(
        &self,
        url: Url,
        body: &T,
    ) -> FormRecognizerResult<reqwest::Response> {
        let response = self
            .http
            .post(url)
            .header(SUBSCRIPTION_KEY_HEADER, self.credential.header_value())
            .json(body)
            .send()
            .await?;

        Ok(response)
    }

    /// Send a GET request carrying only the subscription-key header.
    ///
    /// The response is returned whatever its status.
    pub async fn get(&self, url: Url) -> FormRecognizerResult<reqwest::Response> {
        let response = self
            .http
            .get(url)
            .header(SUBSCRIPTION_KEY_HEADER, self.credential.header_value())
            .send()
            .await?;

        Ok(response)
    }

    /// Require an exact status code, turning anything else into
    /// [`FormRecognizerError::UnexpectedStatus`] with the response body.
    pub async fn expect_status(
        &self,
        response: reqwest::Response,
        expected: StatusCode,
    ) -> FormRecognizerResult<reqwest::Response> {
        if response.status() == expected {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(FormRecognizerError::unexpected_status(
            status,
            self.truncate_message(&body),
        ))
    }

    /// Remove the subscription key from a message if the service echoed it.
    pub(crate) fn sanitize_error_message(&self, msg: &str) -> String {
        let key = self.credential.header_value();
        if key.is_empty() {
            msg.to_string()
        } else {
            msg.replace(key, "[REDACTED]")
        }
    }

    /// Sanitize, then cut a message down to `MAX_ERROR_MESSAGE_LEN` bytes on a
    /// character boundary.
    pub(crate) fn truncate_message(&self, msg: &str) -> String {
        let sanitized = self.sanitize_error_message(msg);

        if sanitized.len() <= Self::MAX_ERROR_MESSAGE_LEN {
            return sanitized;
        }

        let mut cut = Self::MAX_ERROR_MESSAGE_LEN;
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... (truncated)", &sanitized[..cut])
    }
}

impl AnalysisClientBuilder {
    /// Set the resource endpoint, e.g.
    /// `https://<resource-name>.cognitiveservices.azure.com`.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the subscription key used to authenticate.
    pub fn credential(mut self, credential: SubscriptionKey) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Set the API version.
    ///
    /// Defaults to [`DEFAULT_API_VERSION`].
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Set a custom HTTP client.
    ///
    /// **Note:** timeouts set on this builder are ignored when a custom client
    /// is provided.
    pub fn http_client(mut self, client: HttpClient) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the read timeout for a whole request/response cycle.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Build the `AnalysisClient`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No endpoint or credential is provided
    /// - The endpoint URL is invalid (an empty endpoint included)
    /// - The HTTP client cannot be created
    pub fn build(self) -> FormRecognizerResult<AnalysisClient> {
        let http = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .connect_timeout(self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT))
                .timeout(self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT))
                .build()?,
        };

        let endpoint_str = self
            .endpoint
            .ok_or_else(|| FormRecognizerError::Builder("endpoint is required".into()))?;

        let endpoint = Url::parse(&endpoint_str)
            .map_err(|e| FormRecognizerError::invalid_endpoint_with_source("invalid endpoint URL", e))?;

        let credential = self
            .credential
            .ok_or_else(|| FormRecognizerError::Builder("credential is required".into()))?;

        Ok(AnalysisClient {
            http,
            endpoint,
            credential,
            api_version: self
                .api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(endpoint: &str) -> AnalysisClient {
        AnalysisClient::builder()
            .endpoint(endpoint)
            .credential(SubscriptionKey::new("test-key"))
            .api_version("2023-07-31")
            .build()
            .expect("should build")
    }

    #[test]
    fn builder_requires_endpoint() {
        let err = AnalysisClient::builder()
            .credential(SubscriptionKey::new("test"))
            .build()
            .expect_err("endpoint is required");
        assert!(matches!(err, FormRecognizerError::Builder(_)));
        assert!(err.to_string().contains("endpoint"), "error: {err}");
    }

    #[test]
    fn builder_requires_credential() {
        let err = AnalysisClient::builder()
            .endpoint("https://test.cognitiveservices.azure.com")
            .build()
            .expect_err("credential is required");
        assert!(err.to_string().contains("credential"), "error: {err}");
    }

    #[test]
    fn builder_rejects_empty_endpoint() {
        let err = AnalysisClient::builder()
            .endpoint("")
            .credential(SubscriptionKey::new("test"))
            .build()
            .expect_err("empty endpoint is not a URL");
        assert!(matches!(err, FormRecognizerError::InvalidEndpoint { .. }));
    }

    #[test]
    fn builder_uses_default_api_version() {
        let client = AnalysisClient::builder()
            .endpoint("https://test.cognitiveservices.azure.com")
            .credential(SubscriptionKey::new("test"))
            .build()
            .expect("should build");
        assert_eq!(client.api_version(), DEFAULT_API_VERSION);
    }

    #[test]
    fn analyze_url_follows_template() {
        let client = test_client("https://test.cognitiveservices.azure.com");
        let url = client.analyze_url("prebuilt-invoice").expect("valid url");
        assert_eq!(
            url.as_str(),
            "https://test.cognitiveservices.azure.com/formrecognizer/documentModels/prebuilt-invoice:analyze?api-version=2023-07-31"
        );
    }

    #[test]
    fn analyze_url_trims_trailing_slash() {
        let client = test_client("https://test.cognitiveservices.azure.com/");
        let url = client.analyze_url("prebuilt-read").expect("valid url");
        assert!(
            !url.path().contains("//"),
            "path should not contain a double slash: {url}"
        );
    }

    #[test]
    fn operation_url_rejects_empty_handle() {
        let err = AnalysisClient::operation_url("").expect_err("empty handle");
        assert!(matches!(err, FormRecognizerError::InvalidEndpoint { .. }));
        assert!(err.to_string().contains("Operation-Location"), "error: {err}");
    }

    #[test]
    fn fixed_policy_is_constant_and_unbounded() {
        let policy = PollPolicy::fixed(Duration::from_secs(5));
        for attempt in 1..10 {
            assert_eq!(policy.delay_for(attempt), Duration::from_secs(5));
        }
        assert!(!policy.attempts_exhausted(u32::MAX));
    }

    #[test]
    fn default_policy_values() {
        let policy = PollPolicy::default();
        assert_eq!(policy.max_attempts, 60);
        assert_eq!(policy.initial_interval, Duration::from_secs(5));
        assert_eq!(policy.max_interval, Duration::from_secs(30));
        assert!(policy.max_duration.is_none());
    }

    #[test]
    fn delay_grows_exponentially_and_caps() {
        let policy = PollPolicy {
            max_attempts: 10,
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_millis(500),
            multiplier: 2.0,
            jitter: 0.0,
            max_duration: None,
        };

        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_millis(500));
    }

    #[test]
    fn delay_jitter_stays_in_range() {
        let policy = PollPolicy {
            max_attempts: 0,
            initial_interval: Duration::from_millis(1000),
            max_interval: Duration::from_millis(1000),
            multiplier: 1.0,
            jitter: 0.25,
            max_duration: None,
        };

        for _ in 0..100 {
            let delay = policy.delay_for(1);
            assert!(delay >= Duration::from_millis(750), "delay: {delay:?}");
            assert!(delay <= Duration::from_millis(1250), "delay: {delay:?}");
        }
    }

    #[test]
    fn delay_saturates_for_oversized_intervals() {
        let mut policy = PollPolicy {
            max_attempts: 0,
            initial_interval: Duration::from_secs(u64::MAX),
            max_interval: Duration::from_secs(u64::MAX),
            multiplier: 1.5,
            jitter: 0.0,
            max_duration: None,
        };
        assert_eq!(policy.delay_for(1), Duration::MAX);
        assert_eq!(policy.delay_for(40), Duration::MAX);

        policy.jitter = 0.25;
        for _ in 0..100 {
            assert!(policy.delay_for(1) >= Duration::from_secs(u64::MAX / 2));
        }
    }

    #[test]
    fn attempts_exhausted_respects_limit() {
        let policy = PollPolicy {
            max_attempts: 3,
            ..PollPolicy::default()
        };
        assert!(!policy.attempts_exhausted(2));
        assert!(policy.attempts_exhausted(3));
    }

    #[test]
    fn truncate_message_redacts_key_and_limits_length() {
        let client = test_client("https://test.cognitiveservices.azure.com");
        let body = format!("{} key test-key", "é".repeat(600));
        let msg = client.truncate_message(&body);

        assert!(msg.ends_with("... (truncated)"));
        assert!(!msg.contains("test-key"));

        let short = client.truncate_message("invalid key test-key");
        assert_eq!(short, "invalid key [REDACTED]");
    }

    #[tokio::test]
    async fn post_json_sets_headers_once() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/submit"))
            .and(header(SUBSCRIPTION_KEY_HEADER, "test-key"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let url = Url::parse(&format!("{}/submit", server.uri())).expect("url");
        let response = client
            .post_json(url, &serde_json::json!({"urlSource": "https://example.com/a.pdf"}))
            .await
            .expect("should send");
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let requests = server.received_requests().await.expect("recording enabled");
        let content_types = requests[0].headers.get_all("content-type").iter().count();
        assert_eq!(content_types, 1);
    }

    #[tokio::test]
    async fn get_returns_non_success_responses() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/result"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let url = Url::parse(&format!("{}/result", server.uri())).expect("url");
        let response = client.get(url).await.expect("transport should succeed");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn expect_status_reports_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/submit"))
            .respond_with(ResponseTemplate::new(400).set_body_string("InvalidRequest: bad url"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let url = Url::parse(&format!("{}/submit", server.uri())).expect("url");
        let response = client
            .post_json(url, &serde_json::json!({}))
            .await
            .expect("transport should succeed");

        let err = client
            .expect_status(response, StatusCode::ACCEPTED)
            .await
            .expect_err("400 is not 202");
        match err {
            FormRecognizerError::UnexpectedStatus { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "InvalidRequest: bad url");
            }
            other => panic!("Expected UnexpectedStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn request_times_out_with_configured_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = AnalysisClient::builder()
            .endpoint(server.uri())
            .credential(SubscriptionKey::new("test"))
            .read_timeout(Duration::from_millis(300))
            .build()
            .expect("should build");

        let url = Url::parse(&format!("{}/slow", server.uri())).expect("url");
        let err = client.get(url).await.expect_err("should time out");
        assert!(
            matches!(err, FormRecognizerError::Request(_)),
            "Expected Request error from timeout, got {err:?}"
        );
    }
}
