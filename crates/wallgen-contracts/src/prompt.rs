//! Wallpaper prompt template and its inverse.
//!
//! The prefix and suffix below are the only text [`enhance_prompt`] adds.
//! [`strip_wallpaper_template`] removes exactly these constants, so the two
//! must change together.

pub const WALLPAPER_PROMPT_PREFIX: &str =
    "A high-quality, aesthetic smartphone wallpaper (vertical 9:16 aspect ratio). Style: ";
pub const WALLPAPER_PROMPT_SUFFIX: &str =
    ". No text, minimal UI elements, highly detailed, atmospheric.";

/// Soft limit shown next to the input line. Not enforced.
pub const PROMPT_SOFT_MAX_CHARS: usize = 200;

pub fn enhance_prompt(user_prompt: &str) -> String {
    format!("{WALLPAPER_PROMPT_PREFIX}{user_prompt}{WALLPAPER_PROMPT_SUFFIX}")
}

/// Recovers the user text from an enhanced prompt.
///
/// Removes the first occurrence of the prefix and then the first occurrence
/// of the suffix. Text that was never templated comes back unchanged.
pub fn strip_wallpaper_template(prompt: &str) -> String {
    let without_prefix = prompt.replacen(WALLPAPER_PROMPT_PREFIX, "", 1);
    without_prefix.replacen(WALLPAPER_PROMPT_SUFFIX, "", 1)
}

pub fn is_blank(prompt: &str) -> bool {
    prompt.trim().is_empty()
}

pub fn exceeds_soft_limit(prompt: &str) -> bool {
    prompt.chars().count() > PROMPT_SOFT_MAX_CHARS
}
