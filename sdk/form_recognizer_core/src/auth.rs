use secrecy::{ExposeSecret, SecretString};

/// Header that carries the Cognitive Services subscription key.
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Static subscription-key credential sent with every request.
#[derive(Clone)]
pub struct SubscriptionKey(SecretString);

impl SubscriptionKey {
    /// Create a credential from a raw key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::from(key.into()))
    }

    /// The value to send in the [`SUBSCRIPTION_KEY_HEADER`] header.
    pub fn header_value(&self) -> &str {
        self.0.expose_secret()
    }

    /// Returns `true` if no key was configured.
    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for SubscriptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SubscriptionKey(****)")
    }
}
