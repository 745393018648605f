//! Translation completeness: whether a language of a page satisfies every
//! required slot of its template.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use domains::content::SlotContent;
use domains::error::Result;
use domains::ports::PageAggregate;
use domains::slots::{EntityKind, SlotBinding};
use uuid::Uuid;

use crate::EngineContext;

/// Why a language cannot be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gap {
    MissingLocale,
    NotReady,
    /// The page's draft moved on after the translation was marked ready.
    Stale,
    MissingSlot(String),
    IncompleteSlot(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncompleteLanguage {
    pub language: String,
    pub gap: Gap,
}

impl fmt::Display for IncompleteLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lang = &self.language;
        match &self.gap {
            Gap::MissingLocale => write!(f, "The '{lang}' translation of this content does not exist yet."),
            Gap::NotReady => write!(f, "The '{lang}' texts of this content are not marked as ready."),
            Gap::Stale => write!(
                f,
                "The '{lang}' translation is outdated: the content changed after it was marked ready."
            ),
            Gap::MissingSlot(slot) => write!(f, "The '{lang}' version has no content for the required slot '{slot}'."),
            Gap::IncompleteSlot(slot) => write!(f, "The '{lang}' text for the required slot '{slot}' is empty."),
        }
    }
}

/// Evaluates one language against resolved bindings. `typed_pages` holds
/// the page types present in the site, which satisfy `template_content`
/// slots.
pub fn evaluate(
    agg: &PageAggregate,
    language: &str,
    bindings: &[SlotBinding],
    typed_pages: &HashSet<String>,
) -> Option<Gap> {
    let Some(locale) = agg.locale(language) else {
        return Some(Gap::MissingLocale);
    };
    if !locale.translation_ready {
        return Some(Gap::NotReady);
    }
    if locale.is_stale(&agg.page) {
        return Some(Gap::Stale);
    }

    for binding in bindings.iter().filter(|b| !b.optional) {
        let slot = &binding.content_type;
        let gap = match binding.entity_kind() {
            EntityKind::TemplateContent => {
                (!typed_pages.contains(slot)).then(|| Gap::MissingSlot(slot.clone()))
            }
            EntityKind::MicroContent => slot_gap(
                slot,
                agg.live_microcontents(slot)
                    .first()
                    .map(|m| m.translation_complete(language)),
            ),
            EntityKind::Image => slot_gap(
                slot,
                agg.live_images(slot)
                    .first()
                    .map(|i| i.translation_complete(language)),
            ),
        };
        if gap.is_some() {
            return gap;
        }
    }
    None
}

/// Only the first live instance of a slot is judged.
fn slot_gap(slot: &str, first_instance_complete: Option<bool>) -> Option<Gap> {
    match first_instance_complete {
        None => Some(Gap::MissingSlot(slot.to_string())),
        Some(false) => Some(Gap::IncompleteSlot(slot.to_string())),
        Some(true) => None,
    }
}

#[derive(Clone)]
pub struct CompletenessChecker {
    ctx: Arc<EngineContext>,
}

impl CompletenessChecker {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Checks each of `languages`; returns the ones that fail.
    pub async fn gaps(&self, agg: &PageAggregate, languages: &[String]) -> Result<Vec<IncompleteLanguage>> {
        // Cheap checks first: stale or unready locales need no template.
        let mut needs_content = Vec::new();
        let mut gaps = Vec::new();
        for language in languages {
            match evaluate(agg, language, &[], &HashSet::new()) {
                Some(gap) => gaps.push(IncompleteLanguage { language: language.clone(), gap }),
                None => needs_content.push(language),
            }
        }
        if needs_content.is_empty() {
            return Ok(gaps);
        }

        let site = self.ctx.load_site(agg.page.site_id).await?;
        let bindings = self.ctx.bindings(&site.theme, &agg.page.template_name).await?;
        let typed_pages = self.typed_pages(agg.page.site_id, &bindings).await?;

        for language in needs_content {
            if let Some(gap) = evaluate(agg, language, &bindings, &typed_pages) {
                gaps.push(IncompleteLanguage { language: language.clone(), gap });
            }
        }
        Ok(gaps)
    }

    pub async fn is_complete(&self, page_id: Uuid, language: &str) -> Result<bool> {
        let agg = self.ctx.load_page(page_id).await?;
        Ok(self.gaps(&agg, &[language.to_string()]).await?.is_empty())
    }

    /// Editor-facing reason `language` cannot be published, if any.
    pub async fn report(&self, page_id: Uuid, language: &str) -> Result<Option<String>> {
        let agg = self.ctx.load_page(page_id).await?;
        let gaps = self.gaps(&agg, &[language.to_string()]).await?;
        Ok(gaps.first().map(ToString::to_string))
    }

    /// Every language configured for the site must pass; a missing locale
    /// counts as incomplete.
    pub async fn is_fully_complete(&self, page_id: Uuid) -> Result<bool> {
        Ok(self.incomplete_languages(page_id).await?.is_empty())
    }

    /// Gaps across all site languages, primary first.
    pub async fn incomplete_languages(&self, page_id: Uuid) -> Result<Vec<IncompleteLanguage>> {
        let agg = self.ctx.load_page(page_id).await?;
        let languages = self.ctx.site_language_codes(agg.page.site_id).await?;
        self.gaps(&agg, &languages).await
    }

    async fn typed_pages(&self, site_id: Uuid, bindings: &[SlotBinding]) -> Result<HashSet<String>> {
        let mut present = HashSet::new();
        for binding in bindings
            .iter()
            .filter(|b| !b.optional && b.entity_kind() == EntityKind::TemplateContent)
        {
            if !self.ctx.repo.list_page_types(site_id, &binding.content_type).await?.is_empty() {
                present.insert(binding.content_type.clone());
            }
        }
        Ok(present)
    }
}
