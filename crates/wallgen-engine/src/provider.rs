use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::GenerationConfig;
use crate::dryrun::DryrunProvider;
use crate::gemini::GeminiProvider;

/// One single-image call within a batch.
#[derive(Debug, Clone)]
pub struct UnitRequest {
    pub unit: usize,
    pub prompt: String,
    pub model: String,
    pub aspect_ratio: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// Inline image payload as returned by a provider: still base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: Option<String>,
    pub data: String,
}

/// A text-to-image backend able to produce one image per call.
///
/// `Ok(None)` means the call completed without an image (for example a
/// safety block); `Err` carries the provider's failure text so it can be
/// classified by [`crate::failure::classify_failure`].
pub trait WallpaperProvider: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, request: &UnitRequest) -> Result<Option<InlineImage>>;
}

#[derive(Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn WallpaperProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: WallpaperProvider + 'static>(&mut self, provider: P) {
        self.providers
            .insert(provider.name().to_string(), Arc::new(provider));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn WallpaperProvider>> {
        self.providers.get(name.trim()).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }
}

pub fn default_provider_registry(config: &GenerationConfig) -> ProviderRegistry {
    let mut providers = ProviderRegistry::new();
    providers.register(DryrunProvider);
    providers.register(GeminiProvider::new(&config.api_base));
    providers
}
