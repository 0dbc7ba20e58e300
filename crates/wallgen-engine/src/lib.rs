//! Wallpaper generation engine: the batch client and the session controller.

pub mod batch;
pub mod config;
pub mod credentials;
pub mod dryrun;
pub mod export;
pub mod failure;
pub mod gemini;
pub mod provider;
pub mod studio;

pub use batch::{BatchGenerator, WallpaperGenerator};
pub use config::GenerationConfig;
pub use credentials::{CredentialHost, CredentialStore, MissingCredential, StoreCredentialHost};
pub use failure::{classify_failure, FailureKind, CREDENTIAL_NOT_FOUND_MARKER};
pub use provider::{default_provider_registry, InlineImage, ProviderRegistry, UnitRequest, WallpaperProvider};
pub use studio::{IgnoreReason, Studio, StudioSnapshot, SubmitOutcome};
