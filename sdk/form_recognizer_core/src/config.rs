//! Settings for a document analysis run.
//!
//! Settings are read once at startup from a dotenv-style file, with values
//! already present in the process environment taking precedence, and are then
//! passed by reference to every operation.

use crate::auth::SubscriptionKey;
use crate::client::{AnalysisClient, PollPolicy};
use crate::error::{FormRecognizerError, FormRecognizerResult};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Settings file read when no other path is given.
pub const DEFAULT_ENV_FILE: &str = ".env";

pub const ENDPOINT_KEY: &str = "ENDPOINT";
pub const MODEL_ID_KEY: &str = "MODEL_ID";
pub const API_VERSION_KEY: &str = "API_VERSION";
pub const SUBSCRIPTION_KEY_KEY: &str = "SUBSCRIPTION_KEY";
pub const DOCUMENT_URL_KEY: &str = "DOCUMENT_URL";

pub const POLL_MAX_ATTEMPTS_KEY: &str = "POLL_MAX_ATTEMPTS";
pub const POLL_INTERVAL_SECS_KEY: &str = "POLL_INTERVAL_SECS";
pub const POLL_MAX_INTERVAL_SECS_KEY: &str = "POLL_MAX_INTERVAL_SECS";
pub const POLL_MAX_DURATION_SECS_KEY: &str = "POLL_MAX_DURATION_SECS";
pub const POLL_BACKOFF_MULTIPLIER_KEY: &str = "POLL_BACKOFF_MULTIPLIER";
pub const POLL_JITTER_KEY: &str = "POLL_JITTER";

/// Immutable settings for one analysis run.
///
/// The five connection values are not validated here. A missing value is
/// kept as an empty string and shows up later as a malformed request.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Resource endpoint, e.g. `https://<name>.cognitiveservices.azure.com`.
    pub endpoint: String,
    /// Model to analyze with, e.g. `prebuilt-layout`.
    pub model_id: String,
    /// REST API version, e.g. `2023-07-31`.
    pub api_version: String,
    /// Subscription key sent as `Ocp-Apim-Subscription-Key`.
    pub subscription_key: SubscriptionKey,
    /// Publicly reachable URL of the document to analyze.
    pub document_url: String,
    /// How to wait for the analysis job.
    pub poll_policy: PollPolicy,
}

impl Settings {
    /// Load settings from a dotenv file.
    ///
    /// Fails only when the file cannot be found, read, or parsed, or when an
    /// optional poll setting has an invalid value.
    pub fn load(path: impl AsRef<Path>) -> FormRecognizerResult<Self> {
        let path = path.as_ref();
        let file_values = read_env_file(path)?;
        tracing::debug!(path = %path.display(), keys = file_values.len(), "settings file loaded");

        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| file_values.get(key).cloned()))
    }

    /// Build settings from any key/value lookup.
    pub fn from_lookup<F>(lookup: F) -> FormRecognizerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let poll_policy = poll_policy_from(&lookup)?;

        Ok(Self {
            endpoint: required(&lookup, ENDPOINT_KEY),
            model_id: required(&lookup, MODEL_ID_KEY),
            api_version: required(&lookup, API_VERSION_KEY),
            subscription_key: SubscriptionKey::new(required(&lookup, SUBSCRIPTION_KEY_KEY)),
            document_url: required(&lookup, DOCUMENT_URL_KEY),
            poll_policy,
        })
    }

    /// Build an [`AnalysisClient`] for these settings.
    pub fn client(&self) -> FormRecognizerResult<AnalysisClient> {
        AnalysisClient::builder()
            .endpoint(&self.endpoint)
            .api_version(&self.api_version)
            .credential(self.subscription_key.clone())
            .build()
    }
}

fn read_env_file(path: &Path) -> FormRecognizerResult<HashMap<String, String>> {
    let iter = dotenvy::from_path_iter(path).map_err(|e| {
        FormRecognizerError::Config(format!("failed to load {}: {e}", path.display()))
    })?;

    iter.map(|item| {
        item.map_err(|e| FormRecognizerError::Config(format!("failed to parse {}: {e}", path.display())))
    })
    .collect()
}

fn required<F>(lookup: &F, key: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.is_empty() => value,
        _ => {
            tracing::warn!(key, "setting is missing or empty");
            String::new()
        }
    }
}

fn optional<F, T>(lookup: &F, key: &str) -> FormRecognizerResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    trimmed
        .parse()
        .map(Some)
        .map_err(|_| FormRecognizerError::Config(format!("{key} has an invalid value: {raw:?}")))
}

fn poll_policy_from<F>(lookup: &F) -> FormRecognizerResult<PollPolicy>
where
    F: Fn(&str) -> Option<String>,
{
    let mut policy = PollPolicy::default();

    if let Some(attempts) = optional::<_, u32>(lookup, POLL_MAX_ATTEMPTS_KEY)? {
        policy.max_attempts = attempts;
    }
    if let Some(secs) = optional::<_, u64>(lookup, POLL_INTERVAL_SECS_KEY)? {
        policy.initial_interval = Duration::from_secs(secs);
        policy.max_interval = policy.max_interval.max(policy.initial_interval);
    }
    if let Some(secs) = optional::<_, u64>(lookup, POLL_MAX_INTERVAL_SECS_KEY)? {
        policy.max_interval = Duration::from_secs(secs);
    }
    if let Some(secs) = optional::<_, u64>(lookup, POLL_MAX_DURATION_SECS_KEY)? {
        policy.max_duration = Some(Duration::from_secs(secs));
    }
    if let Some(multiplier) = optional::<_, f64>(lookup, POLL_BACKOFF_MULTIPLIER_KEY)? {
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(FormRecognizerError::Config(format!(
                "{POLL_BACKOFF_MULTIPLIER_KEY} must be a finite number >= 1, got {multiplier}"
            )));
        }
        policy.multiplier = multiplier;
    }
    if let Some(jitter) = optional::<_, f64>(lookup, POLL_JITTER_KEY)? {
        if !(0.0..1.0).contains(&jitter) {
            return Err(FormRecognizerError::Config(format!(
                "{POLL_JITTER_KEY} must be in [0, 1), got {jitter}"
            )));
        }
        policy.jitter = jitter;
    }

    Ok(policy)
}
