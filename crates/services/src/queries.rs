//! Read paths used while rendering.
//!
//! Public mode only sees pages with a publication date and reads published
//! payloads, tombstoned values included since the live page still shows
//! them. Preview mode reads drafts and hides tombstones. Site-global slot
//! values are unversioned and always read as drafts.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use domains::content::SlotContent;
use domains::error::{DomainError, Result};
use domains::models::{LocalizedTemplateContent, RenderContext, TemplateContent};
use domains::slots::{EntityKind, SlotCategory};
use serde::Serialize;
use uuid::Uuid;

use crate::EngineContext;

/// A rendered slot value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotValue {
    pub item_id: Uuid,
    pub position: i32,
    pub content: String,
}

/// A page with its locale in the requested language, if it has one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSummary {
    pub page: TemplateContent,
    pub locale: Option<LocalizedTemplateContent>,
}

#[derive(Clone)]
pub struct ContentQueries {
    ctx: Arc<EngineContext>,
}

impl ContentQueries {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// First value of a slot; the site-global slot stands in when the page
    /// has none.
    pub async fn slot_content(
        &self,
        ctx: &RenderContext,
        page_id: Option<Uuid>,
        category: SlotCategory,
        content_type: &str,
    ) -> Result<Option<String>> {
        let values = self.slot_contents(ctx, page_id, category, content_type).await?;
        Ok(values.into_iter().next().map(|v| v.content))
    }

    /// All values of a slot ordered by position, with the same global
    /// fallback as [`slot_content`](Self::slot_content).
    pub async fn slot_contents(
        &self,
        ctx: &RenderContext,
        page_id: Option<Uuid>,
        category: SlotCategory,
        content_type: &str,
    ) -> Result<Vec<SlotValue>> {
        let kind = category.entity_kind();
        if kind == EntityKind::TemplateContent {
            return Err(DomainError::Validation(
                "template_content slots are read with pages_by_type".to_string(),
            ));
        }

        if let Some(page_id) = page_id {
            let agg = self.ctx.load_page(page_id).await?;
            if agg.page.site_id != ctx.site_id || !is_visible(ctx, &agg.page) {
                return Ok(Vec::new());
            }
            let draft = ctx.preview;
            let values = match kind {
                EntityKind::Image => visible_values(&agg.images, content_type, &ctx.language, draft),
                _ => visible_values(&agg.microcontents, content_type, &ctx.language, draft),
            };
            if !values.is_empty() {
                return Ok(values);
            }
        }

        let globals = self.ctx.repo.load_global_contents(ctx.site_id).await?;
        Ok(match kind {
            EntityKind::Image => visible_values(&globals.images, content_type, &ctx.language, true),
            _ => visible_values(&globals.microcontents, content_type, &ctx.language, true),
        })
    }

    /// Pages assigned to `content_type`, in assignment order.
    pub async fn pages_by_type(&self, ctx: &RenderContext, content_type: &str) -> Result<Vec<PageSummary>> {
        let assignments = self.ctx.repo.list_page_types(ctx.site_id, content_type).await?;
        let mut pages: HashMap<Uuid, TemplateContent> = self
            .visible_pages(ctx)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut found = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            if let Some(page) = pages.remove(&assignment.template_content_id) {
                found.push(self.summary(ctx, page).await?);
            }
        }
        Ok(found)
    }

    /// Pages rendered by `template_name`, most recently published first.
    pub async fn pages_by_template(&self, ctx: &RenderContext, template_name: &str) -> Result<Vec<PageSummary>> {
        let mut pages: Vec<TemplateContent> = self
            .visible_pages(ctx)
            .await?
            .into_iter()
            .filter(|p| p.template_name == template_name)
            .collect();
        // Unpublished pages (preview only) sort after published ones.
        pages.sort_by_key(|p| (p.published_at.is_none(), Reverse(p.published_at), Reverse(p.created_at)));

        let mut found = Vec::with_capacity(pages.len());
        for page in pages {
            found.push(self.summary(ctx, page).await?);
        }
        Ok(found)
    }

    /// Resolves a slug to its page, with the locale the slug belongs to.
    pub async fn page_by_slug(&self, ctx: &RenderContext, slug: &str) -> Result<Option<PageSummary>> {
        let Some(locale) = self.ctx.repo.find_locale_by_slug(slug).await? else {
            return Ok(None);
        };
        let Some(agg) = self.ctx.repo.load_page(locale.template_content_id).await? else {
            return Ok(None);
        };
        if agg.page.site_id != ctx.site_id || !is_visible(ctx, &agg.page) {
            return Ok(None);
        }
        Ok(Some(PageSummary {
            page: agg.page,
            locale: Some(locale),
        }))
    }

    pub async fn home_page(&self, ctx: &RenderContext) -> Result<Option<PageSummary>> {
        let home = self
            .visible_pages(ctx)
            .await?
            .into_iter()
            .find(|p| p.is_home_page);
        match home {
            Some(page) => Ok(Some(self.summary(ctx, page).await?)),
            None => Ok(None),
        }
    }

    async fn visible_pages(&self, ctx: &RenderContext) -> Result<Vec<TemplateContent>> {
        Ok(self
            .ctx
            .repo
            .list_pages(ctx.site_id)
            .await?
            .into_iter()
            .filter(|p| is_visible(ctx, p))
            .collect())
    }

    async fn summary(&self, ctx: &RenderContext, page: TemplateContent) -> Result<PageSummary> {
        let locale = self.ctx.repo.find_locale(page.id, &ctx.language).await?;
        Ok(PageSummary { page, locale })
    }
}

fn is_visible(ctx: &RenderContext, page: &TemplateContent) -> bool {
    ctx.preview || page.is_public()
}

fn visible_values<T: SlotContent>(items: &[T], content_type: &str, language: &str, draft: bool) -> Vec<SlotValue> {
    let mut values: Vec<SlotValue> = items
        .iter()
        .filter(|i| i.item().content_type == content_type)
        .filter(|i| !(draft && i.item().deleted))
        .filter_map(|i| {
            i.get_content(language, draft).map(|content| SlotValue {
                item_id: i.item().id,
                position: i.item().position,
                content: content.to_string(),
            })
        })
        .collect();
    values.sort_by_key(|v| v.position);
    values
}
