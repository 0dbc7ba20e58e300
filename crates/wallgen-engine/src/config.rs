use std::env;
use std::time::Duration;

pub const DEFAULT_PROVIDER: &str = "gemini";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const WALLPAPER_ASPECT_RATIO: &str = "9:16";

/// Number of single-image calls issued per submission.
pub const BATCH_SIZE: usize = 4;

const DEFAULT_TIMEOUT_S: f64 = 90.0;
const MIN_TIMEOUT_S: f64 = 15.0;
const MAX_TIMEOUT_S: f64 = 300.0;

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub provider: String,
    pub model: String,
    pub api_base: String,
    pub aspect_ratio: String,
    pub request_timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_IMAGE_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            aspect_ratio: WALLPAPER_ASPECT_RATIO.to_string(),
            request_timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_S),
        }
    }
}

impl GenerationConfig {
    /// Defaults overlaid with `GEMINI_API_BASE`, `WALLGEN_PROVIDER`,
    /// `WALLGEN_IMAGE_MODEL` and `WALLGEN_REQUEST_TIMEOUT` (seconds).
    pub fn from_env() -> Self {
        Self::from_lookup(non_empty_env)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(api_base) = lookup("GEMINI_API_BASE") {
            config.api_base = api_base.trim_end_matches('/').to_string();
        }
        if let Some(provider) = lookup("WALLGEN_PROVIDER") {
            config.provider = provider;
        }
        if let Some(model) = lookup("WALLGEN_IMAGE_MODEL") {
            config.model = model;
        }
        if let Some(timeout) =
            lookup("WALLGEN_REQUEST_TIMEOUT").and_then(|raw| raw.parse::<f64>().ok())
        {
            config = config.with_timeout_secs(timeout);
        }
        config
    }

    pub fn with_timeout_secs(mut self, seconds: f64) -> Self {
        self.request_timeout = Duration::from_secs_f64(clamp_timeout(seconds));
        self
    }
}

fn clamp_timeout(seconds: f64) -> f64 {
    if !seconds.is_finite() {
        return DEFAULT_TIMEOUT_S;
    }
    seconds.clamp(MIN_TIMEOUT_S, MAX_TIMEOUT_S)
}

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
