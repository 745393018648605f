//! Globally unique slugs for localized pages.

use domains::error::{DomainError, Result};
use domains::ports::ContentRepository;
use domains::text::slugify;

pub const DEFAULT_SLUG_MAX_LENGTH: usize = 30;

/// Slug base derived from `title`, one character short of `max_len` so a
/// first numeric suffix fits.
pub fn slug_base(title: &str, max_len: usize) -> Result<String> {
    let base: String = slugify(title).chars().take(max_len.saturating_sub(1)).collect();
    if base.is_empty() {
        return Err(DomainError::Validation(
            "a title with at least one letter or digit is required to derive a slug".to_string(),
        ));
    }
    Ok(base)
}

/// Appends `suffix` to `base`, shortening `base` until the result fits.
/// `base` keeps the shortened form for later attempts.
pub fn with_suffix(base: &mut String, suffix: u32, max_len: usize) -> String {
    let suffix = suffix.to_string();
    while !base.is_empty() && base.len() + suffix.len() > max_len {
        base.pop();
    }
    format!("{base}{suffix}")
}

/// Derives a slug from `title`, appending 2, 3, ... until storage reports
/// it unused. The check is advisory: the storage uniqueness constraint
/// decides at commit time.
pub async fn generate_slug(repo: &dyn ContentRepository, title: &str, max_len: usize) -> Result<String> {
    let mut base = slug_base(title, max_len)?;
    let mut slug = base.clone();
    let mut suffix = 2;
    while repo.slug_exists(&slug).await? {
        slug = with_suffix(&mut base, suffix, max_len);
        suffix += 1;
    }
    Ok(slug)
}
