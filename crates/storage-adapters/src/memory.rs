//! In-process [`ContentRepository`].
//!
//! Tables live behind one `RwLock`. A commit applies its change set to a
//! copy of the tables, checks guards and constraints, and swaps the copy in,
//! so readers never observe a partial commit.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use domains::error::{DomainError, Result};
use domains::models::{
    ContentImage, LocalizedTemplateContent, MicroContent, Site, SiteLanguage, TemplateContent,
    TemplateContentType,
};
use domains::ports::{ChangeSet, ContentRepository, Deletion, GlobalContents, PageAggregate};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct Tables {
    sites: HashMap<Uuid, Site>,
    site_languages: HashMap<Uuid, SiteLanguage>,
    pages: HashMap<Uuid, TemplateContent>,
    locales: HashMap<Uuid, LocalizedTemplateContent>,
    microcontents: HashMap<Uuid, MicroContent>,
    images: HashMap<Uuid, ContentImage>,
    page_types: HashMap<Uuid, TemplateContentType>,
}

#[derive(Debug, Default)]
pub struct InMemoryContentRepository {
    tables: RwLock<Tables>,
    fail_next_commit: AtomicBool,
}

impl InMemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next commit fail with an internal error without writing.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

impl Tables {
    fn apply(&mut self, changes: ChangeSet) {
        for site in changes.sites {
            self.sites.insert(site.id, site);
        }
        for language in changes.site_languages {
            self.site_languages.insert(language.id, language);
        }
        for page in changes.pages {
            self.pages.insert(page.id, page);
        }
        for locale in changes.locales {
            self.locales.insert(locale.id, locale);
        }
        for mc in changes.microcontents {
            self.microcontents.insert(mc.item.id, mc);
        }
        for img in changes.images {
            self.images.insert(img.item.id, img);
        }
        for assignment in changes.page_types {
            self.page_types.insert(assignment.id, assignment);
        }
        for deletion in changes.deletions {
            self.delete(deletion);
        }
    }

    fn delete(&mut self, deletion: Deletion) {
        match deletion {
            Deletion::SiteLanguage(id) => {
                self.site_languages.remove(&id);
            }
            Deletion::Page(id) => {
                self.pages.remove(&id);
                self.locales.retain(|_, l| l.template_content_id != id);
                self.microcontents.retain(|_, m| m.item.template_content_id != Some(id));
                self.images.retain(|_, i| i.item.template_content_id != Some(id));
                self.page_types.retain(|_, t| t.template_content_id != id);
            }
            Deletion::Locale(id) => {
                self.locales.remove(&id);
            }
            Deletion::MicroContent(id) => {
                self.microcontents.remove(&id);
            }
            Deletion::LocalizedMicroContent(id) => {
                for mc in self.microcontents.values_mut() {
                    mc.locales.retain(|l| l.id != id);
                }
            }
            Deletion::Image(id) => {
                self.images.remove(&id);
            }
            Deletion::PageType(id) => {
                self.page_types.remove(&id);
            }
        }
    }

    /// The constraints a relational schema would enforce.
    fn check_constraints(&self) -> Result<()> {
        let mut slugs = HashSet::new();
        let mut page_languages = HashSet::new();
        for locale in self.locales.values() {
            if !self.pages.contains_key(&locale.template_content_id) {
                return Err(conflict(format!("page {} does not exist", locale.template_content_id)));
            }
            if !slugs.insert(locale.slug.as_str()) {
                return Err(conflict(format!("slug '{}' is already taken", locale.slug)));
            }
            if !page_languages.insert((locale.template_content_id, locale.language.as_str())) {
                return Err(conflict(format!(
                    "page {} already has a '{}' locale",
                    locale.template_content_id, locale.language
                )));
            }
        }

        let mut site_languages = HashSet::new();
        for language in self.site_languages.values() {
            if !self.sites.contains_key(&language.site_id) {
                return Err(conflict(format!("site {} does not exist", language.site_id)));
            }
            if !site_languages.insert((language.site_id, language.language.as_str())) {
                return Err(conflict(format!("site already has language '{}'", language.language)));
            }
        }

        for page in self.pages.values() {
            if !self.sites.contains_key(&page.site_id) {
                return Err(conflict(format!("site {} does not exist", page.site_id)));
            }
        }

        for mc in self.microcontents.values() {
            self.check_owner(mc.item.template_content_id)?;
            let mut languages = HashSet::new();
            if mc.locales.iter().any(|l| !languages.insert(l.language.as_str())) {
                return Err(conflict(format!("microcontent {} has duplicate languages", mc.item.id)));
            }
        }
        for img in self.images.values() {
            self.check_owner(img.item.template_content_id)?;
        }

        let mut assignments = HashSet::new();
        for assignment in self.page_types.values() {
            self.check_owner(Some(assignment.template_content_id))?;
            if !assignments.insert((assignment.template_content_id, assignment.content_type.as_str())) {
                return Err(conflict(format!(
                    "page {} already has type '{}'",
                    assignment.template_content_id, assignment.content_type
                )));
            }
        }
        Ok(())
    }

    fn check_owner(&self, page_id: Option<Uuid>) -> Result<()> {
        match page_id {
            Some(id) if !self.pages.contains_key(&id) => Err(conflict(format!("page {id} does not exist"))),
            _ => Ok(()),
        }
    }
}

fn conflict(message: String) -> DomainError {
    DomainError::Conflict(message)
}

#[async_trait]
impl ContentRepository for InMemoryContentRepository {
    async fn get_site(&self, id: Uuid) -> Result<Option<Site>> {
        Ok(self.tables.read().await.sites.get(&id).cloned())
    }

    async fn list_site_languages(&self, site_id: Uuid) -> Result<Vec<SiteLanguage>> {
        let tables = self.tables.read().await;
        let mut languages: Vec<SiteLanguage> = tables
            .site_languages
            .values()
            .filter(|l| l.site_id == site_id)
            .cloned()
            .collect();
        languages.sort_by(|a, b| a.language.cmp(&b.language));
        Ok(languages)
    }

    async fn load_page(&self, id: Uuid) -> Result<Option<PageAggregate>> {
        let tables = self.tables.read().await;
        let Some(page) = tables.pages.get(&id) else {
            return Ok(None);
        };
        let mut agg = PageAggregate::new(page.clone());
        agg.locales = tables
            .locales
            .values()
            .filter(|l| l.template_content_id == id)
            .cloned()
            .collect();
        agg.locales.sort_by(|a, b| a.language.cmp(&b.language));
        agg.microcontents = tables
            .microcontents
            .values()
            .filter(|m| m.item.template_content_id == Some(id))
            .cloned()
            .collect();
        agg.microcontents.sort_by_key(|m| (m.item.position, m.item.id));
        agg.images = tables
            .images
            .values()
            .filter(|i| i.item.template_content_id == Some(id))
            .cloned()
            .collect();
        agg.images.sort_by_key(|i| (i.item.position, i.item.id));
        agg.types = tables
            .page_types
            .values()
            .filter(|t| t.template_content_id == id)
            .cloned()
            .collect();
        agg.types.sort_by(|a, b| a.content_type.cmp(&b.content_type));
        Ok(Some(agg))
    }

    async fn list_pages(&self, site_id: Uuid) -> Result<Vec<TemplateContent>> {
        let tables = self.tables.read().await;
        let mut pages: Vec<TemplateContent> = tables
            .pages
            .values()
            .filter(|p| p.site_id == site_id)
            .cloned()
            .collect();
        pages.sort_by_key(|p| (p.created_at, p.id));
        Ok(pages)
    }

    async fn find_locale_by_slug(&self, slug: &str) -> Result<Option<LocalizedTemplateContent>> {
        let tables = self.tables.read().await;
        Ok(tables.locales.values().find(|l| l.slug == slug).cloned())
    }

    async fn find_locale(&self, page_id: Uuid, language: &str) -> Result<Option<LocalizedTemplateContent>> {
        let tables = self.tables.read().await;
        Ok(tables
            .locales
            .values()
            .find(|l| l.template_content_id == page_id && l.language == language)
            .cloned())
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.locales.values().any(|l| l.slug == slug))
    }

    async fn list_page_types(&self, site_id: Uuid, content_type: &str) -> Result<Vec<TemplateContentType>> {
        let tables = self.tables.read().await;
        let mut assignments: Vec<TemplateContentType> = tables
            .page_types
            .values()
            .filter(|t| t.content_type == content_type)
            .filter(|t| {
                tables
                    .pages
                    .get(&t.template_content_id)
                    .is_some_and(|p| p.site_id == site_id)
            })
            .cloned()
            .collect();
        assignments.sort_by_key(|t| (t.position, t.id));
        Ok(assignments)
    }

    async fn load_global_contents(&self, site_id: Uuid) -> Result<GlobalContents> {
        let tables = self.tables.read().await;
        let mut globals = GlobalContents {
            microcontents: tables
                .microcontents
                .values()
                .filter(|m| m.item.site_id == site_id && m.item.is_global())
                .cloned()
                .collect(),
            images: tables
                .images
                .values()
                .filter(|i| i.item.site_id == site_id && i.item.is_global())
                .cloned()
                .collect(),
        };
        globals.microcontents.sort_by_key(|m| (m.item.position, m.item.id));
        globals.images.sort_by_key(|i| (i.item.position, i.item.id));
        Ok(globals)
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let mut tables = self.tables.write().await;
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(DomainError::Internal("commit rejected by storage".to_string()));
        }

        for guard in &changes.guards {
            let Some(page) = tables.pages.get(&guard.page_id) else {
                return Err(conflict(format!("page {} no longer exists", guard.page_id)));
            };
            if page.draft_version != guard.draft_version || page.published_version != guard.published_version {
                return Err(conflict(format!("page {} was modified concurrently", guard.page_id)));
            }
        }

        let mut next = tables.clone();
        next.apply(changes);
        next.check_constraints()?;
        *tables = next;
        Ok(())
    }
}
