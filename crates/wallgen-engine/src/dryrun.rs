use std::io::Cursor;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{ImageFormat, Rgb, RgbImage};
use sha2::{Digest, Sha256};

use crate::provider::{InlineImage, UnitRequest, WallpaperProvider};

const DRYRUN_WIDTH: u32 = 90;
const DRYRUN_HEIGHT: u32 = 160;

/// Offline provider: a solid 9:16 PNG whose color is derived from the
/// prompt and the unit index.
pub struct DryrunProvider;

impl WallpaperProvider for DryrunProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate(&self, request: &UnitRequest) -> Result<Option<InlineImage>> {
        let (r, g, b) = color_from_prompt(&request.prompt, request.unit as u64);
        let mut image = RgbImage::new(DRYRUN_WIDTH, DRYRUN_HEIGHT);
        for pixel in image.pixels_mut() {
            *pixel = Rgb([r, g, b]);
        }
        let mut bytes = Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, ImageFormat::Png)
            .context("dryrun png encode failed")?;
        Ok(Some(InlineImage {
            mime_type: Some("image/png".to_string()),
            data: BASE64.encode(bytes.into_inner()),
        }))
    }
}

fn color_from_prompt(prompt: &str, seed: u64) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.update(seed.to_be_bytes());
    let digest = hasher.finalize();
    (digest[0], digest[1], digest[2])
}

/// Short stable tag for a prompt, used in dry-run logs.
pub fn prompt_tag(prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    hex::encode(&digest[..4])
}
