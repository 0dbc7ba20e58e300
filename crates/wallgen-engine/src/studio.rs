use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use serde_json::json;
use wallgen_contracts::events::{event_payload, EventWriter};
use wallgen_contracts::messages::Locale;
use wallgen_contracts::models::{GeneratedImage, GenerationState};
use wallgen_contracts::prompt::{is_blank, strip_wallpaper_template};

use crate::batch::BatchGenerator;
use crate::credentials::CredentialHost;
use crate::failure::{classify_failure, error_chain_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyPrompt,
    Busy,
    CredentialRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Number of images prepended to the gallery.
    Added(usize),
    Empty,
    CredentialRequired,
    Failed,
    Ignored(IgnoreReason),
}

/// Everything a renderer needs, cloned out of the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioSnapshot {
    pub images: Vec<GeneratedImage>,
    pub state: GenerationState,
    pub selected: Option<GeneratedImage>,
    pub draft: String,
    pub credential_connected: bool,
}

#[derive(Debug, Default)]
struct StudioInner {
    images: Vec<GeneratedImage>,
    state: GenerationState,
    selected: Option<GeneratedImage>,
    draft: String,
    credential_connected: bool,
}

/// Session controller: owns the gallery, the generation status, the
/// selected image and the credential gate.
///
/// The state lock is released while a batch is in flight, so concurrent
/// callers observe `is_loading` and their submissions are ignored.
pub struct Studio {
    generator: Box<dyn BatchGenerator>,
    host: Box<dyn CredentialHost>,
    locale: Locale,
    events: EventWriter,
    inner: Mutex<StudioInner>,
}

impl Studio {
    pub fn new(
        generator: impl BatchGenerator + 'static,
        host: impl CredentialHost + 'static,
        locale: Locale,
        events: EventWriter,
    ) -> Self {
        let credential_connected = host.has_active_credential();
        events.record(
            "session_started",
            event_payload(json!({
                "credential_connected": credential_connected,
            })),
        );
        Self {
            generator: Box::new(generator),
            host: Box::new(host),
            locale,
            events,
            inner: Mutex::new(StudioInner {
                credential_connected,
                ..StudioInner::default()
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, StudioInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn events(&self) -> &EventWriter {
        &self.events
    }

    pub fn snapshot(&self) -> StudioSnapshot {
        let inner = self.inner();
        StudioSnapshot {
            images: inner.images.clone(),
            state: inner.state.clone(),
            selected: inner.selected.clone(),
            draft: inner.draft.clone(),
            credential_connected: inner.credential_connected,
        }
    }

    pub fn images(&self) -> Vec<GeneratedImage> {
        self.inner().images.clone()
    }

    pub fn image(&self, index: usize) -> Option<GeneratedImage> {
        self.inner().images.get(index).cloned()
    }

    pub fn state(&self) -> GenerationState {
        self.inner().state.clone()
    }

    pub fn selected(&self) -> Option<GeneratedImage> {
        self.inner().selected.clone()
    }

    pub fn draft(&self) -> String {
        self.inner().draft.clone()
    }

    pub fn credential_connected(&self) -> bool {
        self.inner().credential_connected
    }

    pub fn submit(&self, prompt_text: &str) -> SubmitOutcome {
        {
            let mut inner = self.inner();
            if is_blank(prompt_text) {
                return SubmitOutcome::Ignored(IgnoreReason::EmptyPrompt);
            }
            if inner.state.is_loading {
                return SubmitOutcome::Ignored(IgnoreReason::Busy);
            }
            if !inner.credential_connected {
                return SubmitOutcome::Ignored(IgnoreReason::CredentialRequired);
            }
            inner.state = GenerationState::loading();
            inner.draft = prompt_text.to_string();
        }

        let result = self.generator.generate_batch(prompt_text);

        let mut inner = self.inner();
        match result {
            Ok(images) if images.is_empty() => {
                inner.state = GenerationState::failed(self.locale.batch_empty());
                SubmitOutcome::Empty
            }
            Ok(images) => {
                let added = images.len();
                let mut gallery = images;
                gallery.append(&mut inner.images);
                inner.images = gallery;
                inner.state = GenerationState::idle();
                SubmitOutcome::Added(added)
            }
            Err(err) => {
                let kind = classify_failure(&err);
                if kind.requires_credential() {
                    inner.credential_connected = false;
                    inner.state = GenerationState::idle();
                    self.events.record(
                        "credential_required",
                        event_payload(json!({
                            "detail": error_chain_text(&err, 512),
                        })),
                    );
                    return SubmitOutcome::CredentialRequired;
                }
                inner.state = GenerationState::failed(self.locale.generic_failure());
                self.events.record(
                    "batch_failed",
                    event_payload(json!({
                        "detail": error_chain_text(&err, 512),
                    })),
                );
                SubmitOutcome::Failed
            }
        }
    }

    pub fn select_image(&self, image: Option<GeneratedImage>) {
        let id = image.as_ref().map(|image| image.id.clone());
        self.inner().selected = image;
        self.events
            .record("image_selected", event_payload(json!({ "id": id })));
    }

    /// Selects the image at a 0-based gallery position.
    pub fn select_index(&self, index: usize) -> Option<GeneratedImage> {
        let image = self.image(index)?;
        self.select_image(Some(image.clone()));
        Some(image)
    }

    /// Seeds the next submission without generating.
    pub fn remix(&self, prompt_text: &str) {
        self.inner().draft = prompt_text.to_string();
        self.events.record(
            "remix",
            event_payload(json!({ "chars": prompt_text.chars().count() })),
        );
    }

    /// Remixes from an image's stored prompt and closes the viewer.
    pub fn remix_image(&self, image: &GeneratedImage) -> String {
        let draft = strip_wallpaper_template(&image.prompt);
        self.remix(&draft);
        self.inner().selected = None;
        draft
    }

    /// Runs the host's connection flow and assumes it worked; the next
    /// batch flips the flag back if it did not.
    pub fn connect_credential(&self) -> Result<()> {
        self.events
            .record("credential_connect_requested", Default::default());
        self.host.prompt_for_credential()?;
        self.inner().credential_connected = true;
        Ok(())
    }
}
