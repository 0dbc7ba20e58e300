use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Value};

use crate::failure::truncate_text;
use crate::provider::{InlineImage, UnitRequest, WallpaperProvider};

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiProvider {
    api_base: String,
    http: HttpClient,
}

impl GeminiProvider {
    pub fn new(api_base: &str) -> Self {
        Self {
            api_base: api_base.trim().trim_end_matches('/').to_string(),
            http: HttpClient::new(),
        }
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn build_payload(request: &UnitRequest) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }],
            }],
            "generationConfig": {
                "candidateCount": 1,
                "responseModalities": ["IMAGE"],
                "imageConfig": {
                    "aspectRatio": request.aspect_ratio,
                },
            },
        })
    }

    /// First inline image in response order. Only one candidate is
    /// requested, but later candidates are still searched when the first
    /// carries no image.
    fn first_inline_image(response_payload: &Value) -> Option<InlineImage> {
        let candidates = response_payload.get("candidates")?.as_array()?;
        for candidate in candidates {
            let Some(parts) = candidate
                .get("content")
                .and_then(|content| content.get("parts"))
                .and_then(Value::as_array)
            else {
                continue;
            };
            for part in parts {
                let Some(inline) = part
                    .get("inlineData")
                    .or_else(|| part.get("inline_data"))
                    .and_then(Value::as_object)
                else {
                    continue;
                };
                let data = inline
                    .get("data")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if data.is_empty() {
                    continue;
                }
                let mime_type = inline
                    .get("mimeType")
                    .or_else(|| inline.get("mime_type"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                return Some(InlineImage {
                    mime_type,
                    data: data.to_string(),
                });
            }
        }
        None
    }
}

impl WallpaperProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, request: &UnitRequest) -> Result<Option<InlineImage>> {
        let endpoint = self.endpoint_for_model(&request.model);
        let payload = Self::build_payload(request);
        let response = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, request.api_key.as_str())
            .timeout(request.timeout)
            .json(&payload)
            .send()
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        let response_payload = response_json_or_error("Gemini", response)?;
        Ok(Self::first_inline_image(&response_payload))
    }
}

/// Parses a JSON body, turning non-2xx statuses into errors that keep the
/// response text so upstream classification can see it.
fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use anyhow::Result;

    use super::GeminiProvider;
    use crate::failure::{classify_failure, error_chain_text, FailureKind};
    use crate::provider::{InlineImage, UnitRequest, WallpaperProvider};

    fn request() -> UnitRequest {
        UnitRequest {
            unit: 0,
            prompt: "A wallpaper. Style: dunes.".to_string(),
            model: "gemini-2.5-flash-image".to_string(),
            aspect_ratio: "9:16".to_string(),
            api_key: "key".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn endpoint_accepts_bare_and_prefixed_model_names() {
        let provider = GeminiProvider::new("https://example.test/v1beta/");
        assert_eq!(
            provider.endpoint_for_model("gemini-2.5-flash-image"),
            "https://example.test/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
        assert_eq!(
            provider.endpoint_for_model("models/custom"),
            "https://example.test/v1beta/models/custom:generateContent"
        );
    }

    #[test]
    fn payload_requests_one_vertical_image() {
        let payload = GeminiProvider::build_payload(&request());
        assert_eq!(
            payload["contents"][0]["parts"][0]["text"],
            json!("A wallpaper. Style: dunes.")
        );
        assert_eq!(payload["generationConfig"]["candidateCount"], json!(1));
        assert_eq!(
            payload["generationConfig"]["imageConfig"]["aspectRatio"],
            json!("9:16")
        );
    }

    #[test]
    fn first_inline_image_skips_text_and_empty_parts() {
        let payload = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Here is your wallpaper" },
                        { "inlineData": { "mimeType": "image/png", "data": "" } },
                        { "inlineData": { "mimeType": "image/jpeg", "data": "Zmlyc3Q=" } },
                        { "inlineData": { "mimeType": "image/png", "data": "c2Vjb25k" } }
                    ]
                }
            }]
        });
        assert_eq!(
            GeminiProvider::first_inline_image(&payload),
            Some(InlineImage {
                mime_type: Some("image/jpeg".to_string()),
                data: "Zmlyc3Q=".to_string(),
            })
        );
    }

    #[test]
    fn first_inline_image_accepts_snake_case_fields() {
        let payload = json!({
            "candidates": [
                { "content": {} },
                { "content": { "parts": [{ "inline_data": { "data": "AAAA" } }] } }
            ]
        });
        assert_eq!(
            GeminiProvider::first_inline_image(&payload),
            Some(InlineImage {
                mime_type: None,
                data: "AAAA".to_string(),
            })
        );
    }

    #[test]
    fn no_inline_image_is_none() {
        assert_eq!(GeminiProvider::first_inline_image(&json!({})), None);
        let blocked = json!({
            "candidates": [{ "finishReason": "SAFETY" }],
            "promptFeedback": { "blockReason": "SAFETY" }
        });
        assert_eq!(GeminiProvider::first_inline_image(&blocked), None);
    }

    #[test]
    fn transport_errors_do_not_carry_the_api_key() -> Result<()> {
        let provider = GeminiProvider::new("http://127.0.0.1:1/v1beta");
        let mut unit = request();
        unit.api_key = "WALLGEN-TEST-KEY-4711".to_string();
        unit.timeout = Duration::from_secs(5);

        let err = match provider.generate(&unit) {
            Ok(_) => anyhow::bail!("closed port unexpectedly answered"),
            Err(err) => err,
        };
        let text = error_chain_text(&err, 4096);
        assert!(!text.contains("WALLGEN-TEST-KEY-4711"), "{text}");
        assert!(text.contains("Gemini request failed"));
        assert_eq!(classify_failure(&err), FailureKind::Soft);
        Ok(())
    }
}
