use crate::credentials::MissingCredential;

/// Substring the generation service reports when the key's project is gone.
/// It is the only structured signal that the credential itself is invalid.
pub const CREDENTIAL_NOT_FOUND_MARKER: &str = "Requested entity was not found";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Per-unit failure: safety block, timeout, malformed response.
    Soft,
    /// The active credential is invalid for every further call.
    CredentialNotFound,
    /// No credential is configured.
    CredentialMissing,
}

impl FailureKind {
    pub fn requires_credential(self) -> bool {
        matches!(self, Self::CredentialNotFound | Self::CredentialMissing)
    }
}

pub fn classify_failure(err: &anyhow::Error) -> FailureKind {
    if err.chain().any(|cause| cause.is::<MissingCredential>()) {
        return FailureKind::CredentialMissing;
    }
    if err
        .chain()
        .any(|cause| cause.to_string().contains(CREDENTIAL_NOT_FOUND_MARKER))
    {
        return FailureKind::CredentialNotFound;
    }
    FailureKind::Soft
}

/// Flattens an error chain into one line, skipping repeated causes.
pub fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts
            .last()
            .map(|existing| existing == trimmed)
            .unwrap_or(false)
        {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
