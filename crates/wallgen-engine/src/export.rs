use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use wallgen_contracts::data_url::{decode_data_url, extension_for_mime};
use wallgen_contracts::models::GeneratedImage;
use wallgen_contracts::prompt::strip_wallpaper_template;

/// `wallpaper-<createdAt>-<id prefix>.<ext>`; images from one batch share
/// a millisecond, so the id prefix keeps names apart.
pub fn default_file_name(image: &GeneratedImage, mime_type: &str) -> String {
    let id_prefix: String = image.id.chars().take(8).collect();
    format!(
        "wallpaper-{}-{}.{}",
        image.created_at,
        id_prefix,
        extension_for_mime(mime_type)
    )
}

/// Writes the decoded image bytes. A directory target (existing, or given
/// with a trailing separator) receives [`default_file_name`].
pub fn save_image(image: &GeneratedImage, target: &Path) -> Result<PathBuf> {
    let decoded = decode_data_url(&image.url)
        .with_context(|| format!("image {} has an unreadable url", image.id))?;
    let is_dir_target = target.is_dir()
        || target
            .to_str()
            .map(|raw| raw.ends_with(std::path::MAIN_SEPARATOR) || raw.ends_with('/'))
            .unwrap_or(false);
    let out_path = if is_dir_target {
        target.join(default_file_name(image, &decoded.mime_type))
    } else {
        target.to_path_buf()
    };
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&out_path, decoded.bytes)
        .with_context(|| format!("failed to write {}", out_path.display()))?;
    Ok(out_path)
}

/// Self-contained HTML page with every image in gallery order.
pub fn export_gallery_html(images: &[GeneratedImage], out_path: &Path) -> Result<()> {
    let mut cards = String::new();
    for (idx, image) in images.iter().enumerate() {
        cards.push_str(&format!(
            "<div class='card'><img src='{url}' alt='wallpaper {pos}'><div class='meta'><div class='pos'>#{pos}</div><div class='prompt'>{prompt}</div></div></div>",
            url = escape_html(&image.url),
            pos = idx + 1,
            prompt = escape_html(&strip_wallpaper_template(&image.prompt)),
        ));
    }

    let html_doc = format!(
        "<!doctype html>\n<html>\n<head>\n  <meta charset='utf-8'>\n  <title>Wallpapers</title>\n  <style>\n    body {{ font-family: sans-serif; background: #09090b; color: #fafafa; margin: 0; padding: 16px; }}\n    .grid {{ display: grid; grid-template-columns: repeat(auto-fill, minmax(160px, 1fr)); gap: 12px; }}\n    .card {{ background: #18181b; border-radius: 12px; overflow: hidden; }}\n    .card img {{ width: 100%; aspect-ratio: 9 / 16; object-fit: cover; display: block; }}\n    .meta {{ padding: 8px; font-size: 12px; }}\n    .pos {{ color: #a1a1aa; }}\n  </style>\n</head>\n<body>\n  <div class='grid'>\n    {cards}\n  </div>\n</body>\n</html>\n"
    );

    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(out_path, html_doc)
        .with_context(|| format!("failed to write {}", out_path.display()))?;
    Ok(())
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
