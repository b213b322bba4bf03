//! Input checks for review submissions and slugs.

use crate::error::{CoreError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum review body length in characters.
pub const MAX_CONTENT_LENGTH: usize = 5_000;

/// Maximum review title length in characters.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Runs of characters that never survive into a slug.
static NON_SLUG_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap_or_else(|_| unreachable!()));

/// A well-formed slug.
static SLUG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap_or_else(|_| unreachable!()));

/// Lowercase, dash-separated form of a display name.
///
/// `"Tech Solutions Inc."` becomes `"tech-solutions-inc"`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let lower = name.to_lowercase();
    NON_SLUG_RUN
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

/// Check that `slug` is non-empty lowercase alphanumerics joined by dashes.
pub fn validate_slug(slug: &str) -> Result<()> {
    if SLUG_REGEX.is_match(slug) {
        Ok(())
    } else {
        Err(CoreError::validation("slug", format!("'{slug}' is not a valid slug")))
    }
}

/// Ratings are whole stars from 1 to 5.
pub fn validate_rating(rating: u8) -> Result<u8> {
    if (1..=5).contains(&rating) {
        Ok(rating)
    } else {
        Err(CoreError::validation("rating", format!("must be between 1 and 5, got {rating}")))
    }
}

/// Trimmed review body; must be non-empty and bounded.
pub fn validate_content(content: &str) -> Result<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation("content", "must not be empty"));
    }
    let len = trimmed.chars().count();
    if len > MAX_CONTENT_LENGTH {
        return Err(CoreError::validation(
            "content",
            format!("{len} characters exceeds the limit of {MAX_CONTENT_LENGTH}"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Trimmed optional title; blank titles become `None`.
pub fn validate_title(title: Option<&str>) -> Result<Option<String>> {
    let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(CoreError::validation(
            "title",
            format!("exceeds the limit of {MAX_TITLE_LENGTH} characters"),
        ));
    }
    Ok(Some(title.to_string()))
}
