/// Stability AI 3D generation endpoint. Returns glTF binary data directly.
pub const DEFAULT_API_URL: &str = "https://api.stability.ai/v2beta/3d/stable-point-aware-3d";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Credentials and transport settings for [`StabilityClient`](crate::StabilityClient).
#[derive(Clone)]
pub struct StabilityConfig {
    pub api_key: String,
    pub api_url: String,
    /// Upper bound for one generation request, in seconds.
    pub timeout_secs: u64,
}

impl StabilityConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var                  | Required | Default              |
    /// |--------------------------|----------|----------------------|
    /// | `STABILITY_API_KEY`      | **yes**  | --                   |
    /// | `STABILITY_API_URL`      | no       | [`DEFAULT_API_URL`]  |
    /// | `STABILITY_TIMEOUT_SECS` | no       | `30`                 |
    ///
    /// # Panics
    ///
    /// Panics if `STABILITY_API_KEY` is not set or is empty.
    pub fn from_env() -> Self {
        let api_key = std::env::var("STABILITY_API_KEY")
            .expect("STABILITY_API_KEY environment variable is required");
        assert!(!api_key.is_empty(), "STABILITY_API_KEY must not be empty");

        let api_url =
            std::env::var("STABILITY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());

        let timeout_secs: u64 = std::env::var("STABILITY_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
            .parse()
            .expect("STABILITY_TIMEOUT_SECS must be a valid u64");

        Self {
            api_key,
            api_url,
            timeout_secs,
        }
    }
}

// Hand-written so the key never ends up in logs.
impl std::fmt::Debug for StabilityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StabilityConfig")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
