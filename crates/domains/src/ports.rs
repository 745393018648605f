//! # Ports
//!
//! Any adapter must implement these traits to be used by the services.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    ContentImage, LocalizedTemplateContent, MicroContent, Site, SiteLanguage, TemplateContent,
    TemplateContentType, Version,
};
use crate::slots::SlotDeclaration;

/// A page together with everything it owns, loaded in one read.
#[derive(Debug, Clone, PartialEq)]
pub struct PageAggregate {
    pub page: TemplateContent,
    pub locales: Vec<LocalizedTemplateContent>,
    pub microcontents: Vec<MicroContent>,
    pub images: Vec<ContentImage>,
    pub types: Vec<TemplateContentType>,
}

impl PageAggregate {
    pub fn new(page: TemplateContent) -> Self {
        Self {
            page,
            locales: Vec::new(),
            microcontents: Vec::new(),
            images: Vec::new(),
            types: Vec::new(),
        }
    }

    pub fn locale(&self, language: &str) -> Option<&LocalizedTemplateContent> {
        self.locales.iter().find(|l| l.language == language)
    }

    pub fn locale_mut(&mut self, language: &str) -> Option<&mut LocalizedTemplateContent> {
        self.locales.iter_mut().find(|l| l.language == language)
    }

    /// Draft-visible text values of a slot, ordered by position.
    pub fn live_microcontents(&self, content_type: &str) -> Vec<&MicroContent> {
        let mut found: Vec<_> = self
            .microcontents
            .iter()
            .filter(|m| !m.item.deleted && m.item.content_type == content_type)
            .collect();
        found.sort_by_key(|m| m.item.position);
        found
    }

    /// Draft-visible image values of a slot, ordered by position.
    pub fn live_images(&self, content_type: &str) -> Vec<&ContentImage> {
        let mut found: Vec<_> = self
            .images
            .iter()
            .filter(|i| !i.item.deleted && i.item.content_type == content_type)
            .collect();
        found.sort_by_key(|i| i.item.position);
        found
    }

    /// Version numbers as read; the commit is rejected if storage moved on.
    pub fn guard(&self) -> VersionGuard {
        VersionGuard {
            page_id: self.page.id,
            draft_version: self.page.draft_version,
            published_version: self.page.published_version,
        }
    }
}

/// Site-global slot values (`template_content_id` is `None`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalContents {
    pub microcontents: Vec<MicroContent>,
    pub images: Vec<ContentImage>,
}

/// Optimistic check applied inside the commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionGuard {
    pub page_id: Uuid,
    pub draft_version: Version,
    pub published_version: Option<Version>,
}

/// Row removals. Page, micro content and site removals cascade to owned rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    SiteLanguage(Uuid),
    Page(Uuid),
    Locale(Uuid),
    MicroContent(Uuid),
    LocalizedMicroContent(Uuid),
    Image(Uuid),
    PageType(Uuid),
}

/// Everything one logical operation writes. Applied atomically: either
/// every guard holds and every row is written, or nothing is.
/// Upserts are applied before deletions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub guards: Vec<VersionGuard>,
    pub sites: Vec<Site>,
    pub site_languages: Vec<SiteLanguage>,
    pub pages: Vec<TemplateContent>,
    pub locales: Vec<LocalizedTemplateContent>,
    /// Upserts the item row and every localized row it carries
    pub microcontents: Vec<MicroContent>,
    pub images: Vec<ContentImage>,
    pub page_types: Vec<TemplateContentType>,
    pub deletions: Vec<Deletion>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
            && self.site_languages.is_empty()
            && self.pages.is_empty()
            && self.locales.is_empty()
            && self.microcontents.is_empty()
            && self.images.is_empty()
            && self.page_types.is_empty()
            && self.deletions.is_empty()
    }
}

/// Data persistence contract for sites, pages and their content.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    // Site Operations
    async fn get_site(&self, id: Uuid) -> Result<Option<Site>>;
    async fn list_site_languages(&self, site_id: Uuid) -> Result<Vec<SiteLanguage>>;

    // Page Operations
    async fn load_page(&self, id: Uuid) -> Result<Option<PageAggregate>>;
    async fn list_pages(&self, site_id: Uuid) -> Result<Vec<TemplateContent>>;
    async fn find_locale_by_slug(&self, slug: &str) -> Result<Option<LocalizedTemplateContent>>;
    async fn find_locale(
        &self,
        page_id: Uuid,
        language: &str,
    ) -> Result<Option<LocalizedTemplateContent>>;
    async fn slug_exists(&self, slug: &str) -> Result<bool>;

    /// Type assignments of `content_type` across a site, ordered by position.
    async fn list_page_types(
        &self,
        site_id: Uuid,
        content_type: &str,
    ) -> Result<Vec<TemplateContentType>>;

    // Content Operations
    async fn load_global_contents(&self, site_id: Uuid) -> Result<GlobalContents>;

    /// Applies a change set atomically. Fails with `Conflict` when a guard
    /// no longer matches or a uniqueness constraint would be violated.
    async fn commit(&self, changes: ChangeSet) -> Result<()>;
}

/// Media storage contract for slot files.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Saves raw bytes near `path_hint` and returns the stored path.
    async fn store(&self, path_hint: &str, bytes: Vec<u8>) -> Result<String>;
    /// Copies a stored file; returns the path of the copy.
    async fn copy(&self, src_path: &str, dst_path_hint: &str) -> Result<String>;
    async fn delete(&self, path: &str) -> Result<()>;
    async fn exists(&self, path: &str) -> Result<bool>;
}

/// Template collaborator: finds template sources inside a theme and lists
/// the slots they declare. Markup parsing stays on the other side.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TemplateCatalog: Send + Sync {
    async fn resolve_template(&self, theme: &str, name: &str) -> Result<String>;
    fn extract_slot_declarations(&self, source: &str) -> Result<Vec<SlotDeclaration>>;
}
