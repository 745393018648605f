//! Sites, their languages and theme.

use std::sync::Arc;

use chrono::Utc;
use domains::error::{DomainError, Result};
use domains::models::{RenderContext, Site, SiteLanguage};
use domains::ports::{ChangeSet, Deletion};
use uuid::Uuid;

use crate::EngineContext;

#[derive(Clone)]
pub struct SiteService {
    ctx: Arc<EngineContext>,
}

impl SiteService {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    pub async fn create_site(&self, name: &str, theme: &str, primary_language: &str) -> Result<Site> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation("site name must not be empty".to_string()));
        }
        require_theme(theme)?;
        let language = language_code(primary_language)?;

        let site = Site::new(name, theme, Utc::now());
        self.ctx
            .repo
            .commit(ChangeSet {
                sites: vec![site.clone()],
                site_languages: vec![SiteLanguage::new(site.id, language, true)],
                ..Default::default()
            })
            .await?;
        tracing::info!(site_id = %site.id, name, theme, "site created");
        Ok(site)
    }

    pub async fn languages(&self, site_id: Uuid) -> Result<Vec<SiteLanguage>> {
        self.ctx.load_site(site_id).await?;
        self.ctx.site_languages(site_id).await
    }

    /// Adds a language; adding a configured one returns it unchanged.
    pub async fn add_language(&self, site_id: Uuid, language: &str) -> Result<SiteLanguage> {
        let language = language_code(language)?;
        let _lock = self.ctx.locks.acquire(site_id).await;
        let existing = self.languages(site_id).await?;
        if let Some(found) = existing.into_iter().find(|l| l.language == language) {
            return Ok(found);
        }
        let added = SiteLanguage::new(site_id, language, false);
        self.ctx
            .repo
            .commit(ChangeSet {
                site_languages: vec![added.clone()],
                ..Default::default()
            })
            .await?;
        tracing::info!(site_id = %site_id, language = %added.language, "site language added");
        Ok(added)
    }

    pub async fn set_primary_language(&self, site_id: Uuid, language: &str) -> Result<()> {
        let _lock = self.ctx.locks.acquire(site_id).await;
        let mut languages = self.languages(site_id).await?;
        if !languages.iter().any(|l| l.language == language) {
            return Err(DomainError::not_found("SiteLanguage", format!("{site_id}/{language}")));
        }
        let changed: Vec<SiteLanguage> = languages
            .iter_mut()
            .filter(|l| l.is_primary != (l.language == language))
            .map(|l| {
                l.is_primary = !l.is_primary;
                l.clone()
            })
            .collect();
        if changed.is_empty() {
            return Ok(());
        }
        self.ctx
            .repo
            .commit(ChangeSet {
                site_languages: changed,
                ..Default::default()
            })
            .await
    }

    /// Removes a secondary language. Locales already written in it stay
    /// stored but no longer count towards completeness.
    pub async fn remove_language(&self, site_id: Uuid, language: &str) -> Result<bool> {
        let _lock = self.ctx.locks.acquire(site_id).await;
        let Some(found) = self
            .languages(site_id)
            .await?
            .into_iter()
            .find(|l| l.language == language)
        else {
            return Ok(false);
        };
        if found.is_primary {
            return Err(DomainError::Validation(format!(
                "'{language}' is the primary language and cannot be removed"
            )));
        }
        self.ctx
            .repo
            .commit(ChangeSet {
                deletions: vec![Deletion::SiteLanguage(found.id)],
                ..Default::default()
            })
            .await?;
        Ok(true)
    }

    pub async fn set_theme(&self, site_id: Uuid, theme: &str) -> Result<Site> {
        require_theme(theme)?;
        let mut site = self.ctx.load_site(site_id).await?;
        site.theme = theme.to_string();
        self.ctx
            .repo
            .commit(ChangeSet {
                sites: vec![site.clone()],
                ..Default::default()
            })
            .await?;
        Ok(site)
    }

    /// Builds the context for one render. An unconfigured or missing
    /// language falls back to the primary one.
    pub async fn render_context(
        &self,
        site_id: Uuid,
        requested_language: Option<&str>,
        preview: bool,
    ) -> Result<RenderContext> {
        let site = self.ctx.load_site(site_id).await?;
        let languages = self.ctx.site_language_codes(site_id).await?;
        let language = requested_language
            .filter(|requested| languages.iter().any(|l| l.as_str() == *requested))
            .map(str::to_string)
            .or_else(|| languages.first().cloned())
            .ok_or_else(|| DomainError::Internal(format!("site {site_id} has no languages")))?;
        Ok(RenderContext {
            site_id,
            theme: site.theme,
            language,
            preview,
        })
    }
}

fn require_theme(theme: &str) -> Result<()> {
    if theme.is_empty() || theme.contains(['/', '\\']) || theme.starts_with('.') {
        return Err(DomainError::Validation(format!("invalid theme name '{theme}'")));
    }
    Ok(())
}

/// Language codes are short ASCII tags such as `en` or `pt-br`.
fn language_code(language: &str) -> Result<String> {
    let code = language.trim().to_ascii_lowercase();
    let valid = !code.is_empty()
        && code.len() <= 10
        && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(DomainError::Validation(format!("invalid language code '{language}'")));
    }
    Ok(code)
}
