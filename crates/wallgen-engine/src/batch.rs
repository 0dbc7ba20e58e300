use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{anyhow, Result};
use serde_json::json;
use wallgen_contracts::data_url::encode_data_url;
use wallgen_contracts::events::{event_payload, EventWriter};
use wallgen_contracts::models::GeneratedImage;
use wallgen_contracts::prompt::enhance_prompt;

use crate::config::{GenerationConfig, BATCH_SIZE};
use crate::credentials::{CredentialStore, MissingCredential};
use crate::dryrun::prompt_tag;
use crate::failure::{classify_failure, error_chain_text, FailureKind};
use crate::provider::{InlineImage, UnitRequest, WallpaperProvider};

/// Turns one user prompt into a list of wallpapers.
///
/// `Ok` may be empty when every unit failed softly. `Err` is reserved for
/// conditions that make further calls pointless (see
/// [`crate::failure::FailureKind::requires_credential`]).
pub trait BatchGenerator: Send + Sync {
    fn generate_batch(&self, user_prompt: &str) -> Result<Vec<GeneratedImage>>;
}

pub struct WallpaperGenerator {
    provider: Arc<dyn WallpaperProvider>,
    credentials: CredentialStore,
    config: GenerationConfig,
    events: EventWriter,
}

impl WallpaperGenerator {
    pub fn new(
        provider: Arc<dyn WallpaperProvider>,
        credentials: CredentialStore,
        config: GenerationConfig,
        events: EventWriter,
    ) -> Self {
        Self {
            provider,
            credentials,
            config,
            events,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    fn unit_requests(&self, enhanced_prompt: &str, api_key: &str) -> Vec<UnitRequest> {
        (0..BATCH_SIZE)
            .map(|unit| UnitRequest {
                unit,
                prompt: enhanced_prompt.to_string(),
                model: self.config.model.clone(),
                aspect_ratio: self.config.aspect_ratio.clone(),
                api_key: api_key.to_string(),
                timeout: self.config.request_timeout,
            })
            .collect()
    }

    fn record_unit_failure(&self, unit: usize, kind: &str, detail: String) {
        self.events.record(
            "unit_failed",
            event_payload(json!({
                "unit": unit,
                "kind": kind,
                "detail": detail,
            })),
        );
    }
}

impl BatchGenerator for WallpaperGenerator {
    fn generate_batch(&self, user_prompt: &str) -> Result<Vec<GeneratedImage>> {
        let enhanced_prompt = enhance_prompt(user_prompt);
        let Some(api_key) = self.credentials.current() else {
            return Err(MissingCredential.into());
        };
        let started = Instant::now();
        self.events.record(
            "batch_started",
            event_payload(json!({
                "provider": self.provider.name(),
                "model": self.config.model,
                "units": BATCH_SIZE,
                "prompt_tag": prompt_tag(&enhanced_prompt),
            })),
        );

        let provider = self.provider.as_ref();
        let outcomes = thread::scope(|scope| {
            let handles = self
                .unit_requests(&enhanced_prompt, &api_key)
                .into_iter()
                .map(|request| scope.spawn(move || provider.generate(&request)))
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(anyhow!("generation unit panicked")))
                })
                .collect::<Vec<Result<Option<InlineImage>>>>()
        });

        let mut images = Vec::new();
        let mut fatal: Option<anyhow::Error> = None;
        let mut soft_failures = 0usize;
        for (unit, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(Some(inline)) => images.push(GeneratedImage::new(
                    encode_data_url(inline.mime_type.as_deref(), &inline.data),
                    enhanced_prompt.clone(),
                )),
                Ok(None) => {
                    soft_failures += 1;
                    self.record_unit_failure(
                        unit,
                        "no_image",
                        "response had no inline image".to_string(),
                    );
                }
                Err(err) => match classify_failure(&err) {
                    FailureKind::Soft => {
                        soft_failures += 1;
                        self.record_unit_failure(unit, "soft", error_chain_text(&err, 512));
                    }
                    _ => {
                        self.record_unit_failure(unit, "credential", error_chain_text(&err, 512));
                        if fatal.is_none() {
                            fatal = Some(err);
                        }
                    }
                },
            }
        }

        self.events.record(
            "batch_settled",
            event_payload(json!({
                "images": images.len(),
                "soft_failures": soft_failures,
                "credential_failure": fatal.is_some(),
                "elapsed_ms": started.elapsed().as_millis() as u64,
            })),
        );

        if let Some(err) = fatal {
            return Err(err);
        }
        Ok(images)
    }
}
