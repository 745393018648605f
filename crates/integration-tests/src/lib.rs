//! Shared fixtures for the cross-crate tests: an engine over the
//! in-process adapters with one site maintained in English and German.

use std::sync::Arc;

use domains::models::{EditorId, Site, TemplateCategory};
use domains::ports::{ContentRepository, FileStore, PageAggregate};
use domains::slots::SlotCategory;
use services::{ContentEngine, EngineSettings, LocaleUpdate, SlotTarget};
use storage_adapters::{InMemoryContentRepository, InMemoryFileStore, StaticTemplateCatalog};
use uuid::Uuid;

pub const THEME: &str = "default";
pub const EDITOR: EditorId = Uuid::nil();

/// One required headline, an optional background and an optional list.
pub const HERO_TEMPLATE: &str = r#"
<section class="hero" style="background: url({% cms_get_image 'background' optional %})">
  <h1>{% cms_get_microcontent 'headline' %}</h1>
  <ul>{% cms_get_microcontents 'bullets' optional %}</ul>
</section>
"#;

pub const HOME_TEMPLATE: &str = r#"
{% extends 'base.html' %}
{% block body %}
  {% cms_get_microcontent 'intro' optional %}
  {% cms_get_template_contents 'teaser' optional %}
{% endblock %}
"#;

/// Requires at least one page of type `teaser` to exist in the site.
pub const LANDING_TEMPLATE: &str = r#"{% cms_get_template_contents 'teaser' %}"#;

pub fn catalog() -> StaticTemplateCatalog {
    StaticTemplateCatalog::new()
        .with_template(THEME, "content/hero.html", HERO_TEMPLATE)
        .with_template(THEME, "page/home.html", HOME_TEMPLATE)
        .with_template(THEME, "page/landing.html", LANDING_TEMPLATE)
}

pub struct Harness {
    pub engine: ContentEngine,
    pub repo: Arc<InMemoryContentRepository>,
    pub files: Arc<InMemoryFileStore>,
    pub site: Site,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_settings(EngineSettings::default()).await
    }

    pub async fn with_settings(settings: EngineSettings) -> Self {
        let repo = Arc::new(InMemoryContentRepository::new());
        let files = Arc::new(InMemoryFileStore::new());
        let engine = ContentEngine::new(repo.clone(), files.clone(), Arc::new(catalog()), settings);
        let site = bilingual_site(&engine).await;
        Self {
            engine,
            repo,
            files,
            site,
        }
    }

    pub async fn create_page(&self, template: &str, title: &str) -> Uuid {
        let category = if template.starts_with("page/") {
            TemplateCategory::Page
        } else {
            TemplateCategory::Content
        };
        self.engine
            .store
            .create_template_content(self.site.id, template, category, title, EDITOR)
            .await
            .unwrap()
            .page
            .id
    }

    pub async fn create_hero(&self, title: &str) -> Uuid {
        self.create_page("content/hero.html", title).await
    }

    pub fn slot(&self, page_id: Uuid, category: SlotCategory, content_type: &str) -> SlotTarget {
        SlotTarget::page(self.site.id, page_id, category, content_type)
    }

    pub async fn set_text(&self, page_id: Uuid, content_type: &str, language: &str, value: &str) -> Uuid {
        let target = self.slot(page_id, SlotCategory::Microcontent, content_type);
        self.engine
            .store
            .set_content(&target, language, value.to_string(), EDITOR)
            .await
            .unwrap()
    }

    pub async fn add_bullet(&self, page_id: Uuid, language: &str, value: &str) -> Uuid {
        let target = self.slot(page_id, SlotCategory::Microcontents, "bullets");
        self.engine
            .store
            .set_content(&target, language, value.to_string(), EDITOR)
            .await
            .unwrap()
    }

    pub async fn mark_ready(&self, page_id: Uuid, language: &str) {
        let update = LocaleUpdate {
            title: None,
            translation_ready: Some(true),
        };
        self.engine
            .store
            .update_locale(page_id, language, update, EDITOR)
            .await
            .unwrap();
    }

    /// Hero page with an English headline, ready for publishing in `en`.
    pub async fn ready_hero(&self, title: &str) -> Uuid {
        let page_id = self.create_hero(title).await;
        self.set_text(page_id, "headline", "en", "Welcome").await;
        self.mark_ready(page_id, "en").await;
        page_id
    }

    pub async fn load(&self, page_id: Uuid) -> PageAggregate {
        self.repo.load_page(page_id).await.unwrap().expect("page exists")
    }

    pub async fn versions(&self, page_id: Uuid) -> (i32, Option<i32>) {
        let page = self.load(page_id).await.page;
        (page.draft_version, page.published_version)
    }
}

/// Builds an engine over caller-supplied files, e.g. a mock store.
pub async fn engine_with_files(files: Arc<dyn FileStore>, settings: EngineSettings) -> (ContentEngine, Site) {
    engine_with(Arc::new(InMemoryContentRepository::new()), files, settings).await
}

/// Builds an engine over a caller-supplied repository and in-memory files.
pub async fn engine_with_repo(repo: Arc<dyn ContentRepository>) -> (ContentEngine, Site) {
    engine_with(repo, Arc::new(InMemoryFileStore::new()), EngineSettings::default()).await
}

async fn engine_with(
    repo: Arc<dyn ContentRepository>,
    files: Arc<dyn FileStore>,
    settings: EngineSettings,
) -> (ContentEngine, Site) {
    let engine = ContentEngine::new(repo, files, Arc::new(catalog()), settings);
    let site = bilingual_site(&engine).await;
    (engine, site)
}

async fn bilingual_site(engine: &ContentEngine) -> Site {
    let site = engine.sites.create_site("Example", THEME, "en").await.unwrap();
    engine.sites.add_language(site.id, "de").await.unwrap();
    site
}
