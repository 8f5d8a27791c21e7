#![doc = include_str!("../README.md")]

pub mod document_analysis;
pub mod models;
pub mod output;
pub mod runner;

/// Test utilities shared across modules.
#[cfg(test)]
pub(crate) mod test_utils {
    use form_recognizer_core::client::{AnalysisClient, PollPolicy};
    use form_recognizer_core::test_support::mock_client;
    use std::time::Duration;
    use wiremock::MockServer;

    /// Analyze path for the model used in tests.
    pub const ANALYZE_PATH: &str = "/formrecognizer/documentModels/prebuilt-read:analyze";

    /// Path of an analyze result on the mock server.
    pub fn result_path(result_id: &str) -> String {
        format!("/formrecognizer/documentModels/prebuilt-read/analyzeResults/{result_id}")
    }

    /// Create a test client connected to a mock server.
    pub fn setup_mock_client(server: &MockServer) -> AnalysisClient {
        mock_client(server)
    }

    /// A poll policy with 1ms waits and no jitter.
    pub fn fast_policy(max_attempts: u32) -> PollPolicy {
        PollPolicy {
            max_attempts,
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(1),
            multiplier: 1.0,
            jitter: 0.0,
            max_duration: None,
        }
    }
}
