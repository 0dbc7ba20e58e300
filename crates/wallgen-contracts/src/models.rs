use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One successful generation result.
///
/// `prompt` is the enhanced prompt that was sent to the provider, not the
/// raw user text; remix recovers the user text with
/// [`crate::prompt::strip_wallpaper_template`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub id: String,
    pub url: String,
    pub prompt: String,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
}

impl GeneratedImage {
    pub fn new(url: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: new_image_id(),
            url: url.into(),
            prompt: prompt.into(),
            created_at: Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationState {
    #[serde(rename = "isLoading")]
    pub is_loading: bool,
    pub error: Option<String>,
}

impl GenerationState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn loading() -> Self {
        Self {
            is_loading: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            is_loading: false,
            error: Some(message.into()),
        }
    }
}

fn new_image_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    #[test]
    fn new_images_get_distinct_ids() {
        let first = GeneratedImage::new("data:image/png;base64,AA==", "p");
        let second = GeneratedImage::new("data:image/png;base64,AA==", "p");
        assert_ne!(first.id, second.id);
        assert!(first.created_at > 0);
    }

    #[test]
    fn image_serializes_with_camel_case_timestamp() -> anyhow::Result<()> {
        let image = GeneratedImage {
            id: "abc".to_string(),
            url: "data:image/png;base64,AA==".to_string(),
            prompt: "p".to_string(),
            created_at: 42,
        };
        let value = serde_json::to_value(&image)?;
        assert_eq!(value["createdAt"], Value::from(42));
        assert!(value.get("created_at").is_none());
        Ok(())
    }

    #[test]
    fn state_constructors() {
        assert_eq!(GenerationState::idle(), GenerationState::default());
        assert!(GenerationState::loading().is_loading);
        let failed = GenerationState::failed("nope");
        assert!(!failed.is_loading);
        assert_eq!(failed.error.as_deref(), Some("nope"));
    }
}
