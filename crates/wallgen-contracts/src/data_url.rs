use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

pub const DEFAULT_IMAGE_MIME: &str = "image/png";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Builds `data:<mime>;base64,<payload>` from an already encoded payload.
pub fn encode_data_url(mime_type: Option<&str>, base64_payload: &str) -> String {
    let mime = mime_type
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_IMAGE_MIME);
    format!("data:{mime};base64,{base64_payload}")
}

pub fn encode_bytes_data_url(mime_type: &str, bytes: &[u8]) -> String {
    encode_data_url(Some(mime_type), &BASE64.encode(bytes))
}

pub fn decode_data_url(url: &str) -> Result<DecodedImage> {
    let Some(rest) = url.strip_prefix("data:") else {
        bail!("not a data URL");
    };
    let Some((header, payload)) = rest.split_once(',') else {
        bail!("data URL is missing its payload separator");
    };
    let Some(mime) = header.strip_suffix(";base64") else {
        bail!("only base64 data URLs are supported");
    };
    let bytes = BASE64
        .decode(payload.trim().as_bytes())
        .context("data URL base64 decode failed")?;
    let mime_type = if mime.is_empty() {
        DEFAULT_IMAGE_MIME.to_string()
    } else {
        mime.to_string()
    };
    Ok(DecodedImage { mime_type, bytes })
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_mime_defaults_to_png() {
        assert_eq!(encode_data_url(None, "AAAA"), "data:image/png;base64,AAAA");
        assert_eq!(
            encode_data_url(Some("  "), "AAAA"),
            "data:image/png;base64,AAAA"
        );
        assert_eq!(
            encode_data_url(Some("image/jpeg"), "AAAA"),
            "data:image/jpeg;base64,AAAA"
        );
    }

    #[test]
    fn decode_returns_bytes_and_mime() -> anyhow::Result<()> {
        let url = encode_bytes_data_url("image/webp", b"wallpaper");
        let decoded = decode_data_url(&url)?;
        assert_eq!(decoded.mime_type, "image/webp");
        assert_eq!(decoded.bytes, b"wallpaper");
        Ok(())
    }

    #[test]
    fn decode_rejects_non_base64_urls() {
        assert!(decode_data_url("https://example.com/a.png").is_err());
        assert!(decode_data_url("data:image/png,raw").is_err());
        assert!(decode_data_url("data:image/png;base64").is_err());
        assert!(decode_data_url("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn extensions() {
        assert_eq!(extension_for_mime("image/jpeg"), "jpg");
        assert_eq!(extension_for_mime("IMAGE/WEBP"), "webp");
        assert_eq!(extension_for_mime("image/png"), "png");
        assert_eq!(extension_for_mime("application/octet-stream"), "png");
    }
}
