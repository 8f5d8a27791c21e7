#![doc = include_str!("../README.md")]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;

pub use error::{FormRecognizerError, FormRecognizerResult};

/// Helpers for testing against a `wiremock` server.
#[cfg(feature = "test-support")]
pub mod test_support {
    use crate::auth::SubscriptionKey;
    use crate::client::AnalysisClient;
    use wiremock::MockServer;

    /// Test subscription key (not a real key).
    pub const TEST_SUBSCRIPTION_KEY: &str = "test-subscription-key";

    /// API version used by mock clients.
    pub const TEST_API_VERSION: &str = "2023-07-31";

    /// Create a client pointed at a mock server.
    ///
    /// # Panics
    ///
    /// Panics if the mock server URI is not a valid endpoint.
    pub fn mock_client(server: &MockServer) -> AnalysisClient {
        AnalysisClient::builder()
            .endpoint(server.uri())
            .credential(SubscriptionKey::new(TEST_SUBSCRIPTION_KEY))
            .api_version(TEST_API_VERSION)
            .build()
            .expect("should build client")
    }
}
