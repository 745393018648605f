//! # services
//!
//! The content lifecycle: resolving template slots, storing drafts,
//! checking translations, publishing pages atomically and retiring deleted
//! content once no live page needs it.
//!
//! Every service shares one [`EngineContext`] holding the ports and the
//! per-page lock registry; [`ContentEngine`] wires them together.

pub mod completeness;
pub mod content_store;
pub mod locks;
pub mod publication;
pub mod queries;
pub mod sites;
pub mod slot_resolver;
pub mod slug;
pub mod tombstone;

use std::sync::Arc;

use domains::error::{DomainError, Result};
use domains::models::{Site, SiteLanguage};
use domains::ports::{ContentRepository, FileStore, PageAggregate, TemplateCatalog};
use domains::slots::SlotBinding;
use uuid::Uuid;

pub use completeness::CompletenessChecker;
pub use content_store::{ContentStore, LocaleUpdate, SlotTarget};
pub use locks::PageLocks;
pub use publication::PublicationEngine;
pub use queries::ContentQueries;
pub use sites::SiteService;
pub use slot_resolver::SlotResolver;
pub use tombstone::{DeleteOutcome, TombstoneManager};

/// Tunables of the engine. Defaults match long-standing behaviour.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Upper bound of a generated slug including its numeric suffix
    pub slug_max_length: usize,
    /// Fresh slugs tried when storage reports a collision on insert
    pub slug_retry_limit: u32,
    /// Parse `min-N` / `max-N` slot arguments
    pub honor_slot_bounds: bool,
    /// Attempts per image copy during publish
    pub file_copy_attempts: u32,
    /// Prefix of auto-seeded locale titles
    pub needs_translation_label: String,
    /// Title used when a page has no locale to derive one from
    pub temporary_title: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            slug_max_length: slug::DEFAULT_SLUG_MAX_LENGTH,
            slug_retry_limit: 3,
            honor_slot_bounds: false,
            file_copy_attempts: 2,
            needs_translation_label: "needs translation".to_string(),
            temporary_title: "Temporary Title".to_string(),
        }
    }
}

/// Ports and shared state used by every service.
pub struct EngineContext {
    pub repo: Arc<dyn ContentRepository>,
    pub files: Arc<dyn FileStore>,
    pub catalog: Arc<dyn TemplateCatalog>,
    pub locks: PageLocks,
    pub settings: EngineSettings,
}

impl EngineContext {
    pub fn resolver(&self) -> SlotResolver {
        SlotResolver::new(self.settings.honor_slot_bounds)
    }

    pub async fn load_page(&self, page_id: Uuid) -> Result<PageAggregate> {
        self.repo
            .load_page(page_id)
            .await?
            .ok_or_else(|| DomainError::not_found("TemplateContent", page_id))
    }

    pub async fn load_site(&self, site_id: Uuid) -> Result<Site> {
        self.repo
            .get_site(site_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Site", site_id))
    }

    pub async fn bindings(&self, theme: &str, template_name: &str) -> Result<Vec<SlotBinding>> {
        self.resolver()
            .bindings_for_template(self.catalog.as_ref(), theme, template_name)
            .await
    }

    /// Site languages, primary first.
    pub async fn site_languages(&self, site_id: Uuid) -> Result<Vec<SiteLanguage>> {
        let mut languages = self.repo.list_site_languages(site_id).await?;
        languages.sort_by(|a, b| b.is_primary.cmp(&a.is_primary).then(a.language.cmp(&b.language)));
        Ok(languages)
    }

    pub async fn site_language_codes(&self, site_id: Uuid) -> Result<Vec<String>> {
        Ok(self
            .site_languages(site_id)
            .await?
            .into_iter()
            .map(|l| l.language)
            .collect())
    }

    pub async fn primary_language(&self, site_id: Uuid) -> Result<String> {
        self.site_languages(site_id)
            .await?
            .into_iter()
            .find(|l| l.is_primary)
            .map(|l| l.language)
            .ok_or_else(|| DomainError::Internal(format!("site {site_id} has no primary language")))
    }

    /// Removes files no committed row references any more. Failures leave
    /// an orphaned file behind and are only logged.
    pub async fn discard_files(&self, paths: Vec<String>) {
        for path in paths {
            if let Err(e) = self.files.delete(&path).await {
                tracing::warn!(error = %e, path = %path, "failed to remove unreferenced file");
            }
        }
    }
}

/// All services over one set of ports.
#[derive(Clone)]
pub struct ContentEngine {
    pub sites: SiteService,
    pub store: ContentStore,
    pub completeness: CompletenessChecker,
    pub publication: PublicationEngine,
    pub queries: ContentQueries,
}

impl ContentEngine {
    pub fn new(
        repo: Arc<dyn ContentRepository>,
        files: Arc<dyn FileStore>,
        catalog: Arc<dyn TemplateCatalog>,
        settings: EngineSettings,
    ) -> Self {
        let ctx = Arc::new(EngineContext {
            repo,
            files,
            catalog,
            locks: PageLocks::new(),
            settings,
        });
        Self {
            sites: SiteService::new(ctx.clone()),
            store: ContentStore::new(ctx.clone()),
            completeness: CompletenessChecker::new(ctx.clone()),
            publication: PublicationEngine::new(ctx.clone()),
            queries: ContentQueries::new(ctx),
        }
    }
}
