//! Draft-side writes: pages, locales, slot values and page types.
//!
//! Every write to a page or something it owns runs under that page's lock
//! and commits one change set guarded by the page versions it read.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use domains::content::SlotContent;
use domains::error::{DomainError, Result};
use domains::models::{
    ContentImage, EditorId, LocalizedTemplateContent, MicroContent, TemplateCategory,
    TemplateContent, TemplateContentType,
};
use domains::ports::{ChangeSet, Deletion, PageAggregate, VersionGuard};
use domains::slots::{EntityKind, SlotCategory};
use domains::text::slugify;
use uuid::Uuid;

use crate::slug::generate_slug;
use crate::tombstone::{DeleteOutcome, TombstoneManager};
use crate::EngineContext;

/// Fields of a locale an editor may change. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct LocaleUpdate {
    pub title: Option<String>,
    pub translation_ready: Option<bool>,
}

/// Addresses a slot value of a page, or the site-global value when
/// `page_id` is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotTarget {
    pub site_id: Uuid,
    pub page_id: Option<Uuid>,
    pub category: SlotCategory,
    pub content_type: String,
    /// Instance to write. Without it single slots reuse their instance and
    /// plural slots get a new one.
    pub item_id: Option<Uuid>,
}

impl SlotTarget {
    pub fn page(site_id: Uuid, page_id: Uuid, category: SlotCategory, content_type: impl Into<String>) -> Self {
        Self {
            site_id,
            page_id: Some(page_id),
            category,
            content_type: content_type.into(),
            item_id: None,
        }
    }

    pub fn global(site_id: Uuid, category: SlotCategory, content_type: impl Into<String>) -> Self {
        Self {
            site_id,
            page_id: None,
            category,
            content_type: content_type.into(),
            item_id: None,
        }
    }

    pub fn instance(mut self, item_id: Uuid) -> Self {
        self.item_id = Some(item_id);
        self
    }
}

#[derive(Clone)]
pub struct ContentStore {
    ctx: Arc<EngineContext>,
}

impl ContentStore {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Creates a page with its primary-language locale.
    pub async fn create_template_content(
        &self,
        site_id: Uuid,
        template_name: &str,
        category: TemplateCategory,
        title: &str,
        creator: EditorId,
    ) -> Result<PageAggregate> {
        let title = require_title(title)?;
        if !template_name.starts_with(&format!("{}/", category.as_str())) {
            return Err(DomainError::Validation(format!(
                "template '{template_name}' is not a {category} template"
            )));
        }
        let site = self.ctx.load_site(site_id).await?;
        self.ctx.catalog.resolve_template(&site.theme, template_name).await?;
        let language = self.ctx.primary_language(site_id).await?;

        let now = Utc::now();
        let page = TemplateContent::new(site_id, template_name, category, now);
        let locale = self
            .commit_with_fresh_slug(&title, |slug| {
                let locale = LocalizedTemplateContent::new(&page, language.as_str(), title.as_str(), slug, creator, now);
                let changes = ChangeSet {
                    pages: vec![page.clone()],
                    locales: vec![locale.clone()],
                    ..Default::default()
                };
                (locale, changes)
            })
            .await?;

        tracing::info!(page_id = %page.id, slug = %locale.slug, "template content created");
        let mut agg = PageAggregate::new(page);
        agg.locales.push(locale);
        Ok(agg)
    }

    /// Returns the locale of `language`, seeding it from an existing
    /// translation's title when the page has none yet.
    pub async fn open_locale(
        &self,
        page_id: Uuid,
        language: &str,
        editor: EditorId,
    ) -> Result<LocalizedTemplateContent> {
        let _lock = self.ctx.locks.acquire(page_id).await;
        let agg = self.ctx.load_page(page_id).await?;
        if let Some(locale) = agg.locale(language) {
            return Ok(locale.clone());
        }

        let languages = self.ctx.site_language_codes(agg.page.site_id).await?;
        require_site_language(&languages, language)?;
        let title = self.seeded_title(&agg, &languages);

        let now = Utc::now();
        let locale = self
            .commit_with_fresh_slug(&title, |slug| {
                let locale = LocalizedTemplateContent::new(&agg.page, language, title.as_str(), slug, editor, now);
                let changes = ChangeSet {
                    locales: vec![locale.clone()],
                    ..Default::default()
                };
                (locale, changes)
            })
            .await?;

        tracing::info!(page_id = %page_id, language, slug = %locale.slug, "locale seeded");
        Ok(locale)
    }

    /// Saves editor changes to a locale. A locale lagging behind the page
    /// draft is pulled up first, which revokes its readiness unless this
    /// update sets it again.
    pub async fn update_locale(
        &self,
        page_id: Uuid,
        language: &str,
        update: LocaleUpdate,
        editor: EditorId,
    ) -> Result<LocalizedTemplateContent> {
        let title = update.title.as_deref().map(require_title).transpose()?;

        let _lock = self.ctx.locks.acquire(page_id).await;
        let mut agg = self.ctx.load_page(page_id).await?;
        let index = agg
            .locales
            .iter()
            .position(|l| l.language == language)
            .ok_or_else(|| DomainError::not_found("LocalizedTemplateContent", format!("{page_id}/{language}")))?;

        let guard = agg.guard();
        agg.page.touch_draft();
        let page_draft = agg.page.draft_version;

        let locale = &mut agg.locales[index];
        // Relaxed on purpose: any lagging locale follows, not only one whose
        // published version matches the page's.
        if locale.follow_page_draft(page_draft) {
            tracing::debug!(page_id = %page_id, language, draft_version = page_draft, "locale followed page draft");
        }
        if let Some(title) = title {
            locale.title = title;
        }
        if let Some(ready) = update.translation_ready {
            locale.translation_ready = ready;
        }
        locale.last_modified = Utc::now();
        locale.last_modified_by = Some(editor);
        let locale = locale.clone();

        self.ctx
            .repo
            .commit(ChangeSet {
                guards: vec![guard],
                pages: vec![agg.page],
                locales: vec![locale.clone()],
                ..Default::default()
            })
            .await?;
        Ok(locale)
    }

    /// Writes the draft payload of a slot value and returns its id. For
    /// images `value` is a stored file path.
    pub async fn set_content(
        &self,
        target: &SlotTarget,
        language: &str,
        value: String,
        editor: EditorId,
    ) -> Result<Uuid> {
        if target.category.entity_kind() == EntityKind::TemplateContent {
            return Err(DomainError::Validation(
                "template_content slots are filled by assigning page types".to_string(),
            ));
        }
        let languages = if target.category.is_translatable() {
            let languages = self.ctx.site_language_codes(target.site_id).await?;
            require_site_language(&languages, language)?;
            languages
        } else {
            Vec::new()
        };
        let now = Utc::now();
        let write = ValueWrite {
            target,
            language,
            editor,
            now,
        };

        let (item_id, superseded) = match target.page_id {
            Some(page_id) => {
                let _lock = self.ctx.locks.acquire(page_id).await;
                let mut agg = self.load_site_page(target.site_id, page_id).await?;
                let guard = agg.guard();
                agg.page.touch_draft();

                let mut changes = ChangeSet {
                    guards: vec![guard],
                    pages: vec![agg.page.clone()],
                    ..Default::default()
                };
                let written = write.apply(&mut agg.microcontents, &mut agg.images, value, &mut changes)?;

                // The first entry in a language creates that language's locale.
                if target.category.is_translatable() && agg.locale(language).is_none() {
                    let title = self.seeded_title(&agg, &languages);
                    let locale = self
                        .commit_with_fresh_slug(&title, |slug| {
                            let locale =
                                LocalizedTemplateContent::new(&agg.page, language, title.as_str(), slug, editor, now);
                            let mut changes = changes.clone();
                            changes.locales.push(locale.clone());
                            (locale, changes)
                        })
                        .await?;
                    tracing::info!(page_id = %page_id, language, slug = %locale.slug, "locale seeded by first content entry");
                } else {
                    self.ctx.repo.commit(changes).await?;
                }
                written
            }
            None => {
                let _lock = self.ctx.locks.acquire(target.site_id).await;
                let mut globals = self.ctx.repo.load_global_contents(target.site_id).await?;
                let mut changes = ChangeSet::default();
                let written = write.apply(&mut globals.microcontents, &mut globals.images, value, &mut changes)?;
                self.ctx.repo.commit(changes).await?;
                written
            }
        };

        tracing::debug!(item_id = %item_id, content_type = %target.content_type, language, "slot content saved");
        self.ctx.discard_files(superseded.into_iter().collect()).await;
        Ok(item_id)
    }

    /// Stores an uploaded file and makes it the draft of an image slot.
    pub async fn upload_image(
        &self,
        target: &SlotTarget,
        file_name: &str,
        bytes: Vec<u8>,
        editor: EditorId,
    ) -> Result<Uuid> {
        if target.category.entity_kind() != EntityKind::Image {
            return Err(DomainError::Validation(format!(
                "'{}' slots do not hold images",
                target.category
            )));
        }
        let base_name = Path::new(file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| DomainError::Validation(format!("invalid file name '{file_name}'")))?;
        require_image_name(base_name)?;

        let hint = format!(
            "sites/{}/content_images/{}/{}",
            target.site_id,
            slugify(&target.content_type),
            base_name
        );
        let stored = self.ctx.files.store(&hint, bytes).await?;
        match self.set_content(target, "", stored.clone(), editor).await {
            Ok(id) => Ok(id),
            Err(e) => {
                self.ctx.discard_files(vec![stored]).await;
                Err(e)
            }
        }
    }

    /// Removes a slot value, or tombstones it while the live page still
    /// renders it. Deleting something already gone is not an error.
    pub async fn delete_content(
        &self,
        site_id: Uuid,
        page_id: Option<Uuid>,
        kind: EntityKind,
        item_id: Uuid,
    ) -> Result<DeleteOutcome> {
        if kind == EntityKind::TemplateContent {
            return Err(DomainError::Validation(
                "pages are removed with delete_template_content".to_string(),
            ));
        }

        let Some(page_id) = page_id else {
            return self.delete_global(site_id, kind, item_id).await;
        };

        let _lock = self.ctx.locks.acquire(page_id).await;
        let Some(mut agg) = self.ctx.repo.load_page(page_id).await? else {
            return Ok(DeleteOutcome::Absent);
        };
        if agg.page.site_id != site_id {
            return Err(DomainError::not_found("TemplateContent", page_id));
        }
        let mut changes = ChangeSet {
            guards: vec![agg.guard()],
            ..Default::default()
        };
        let (outcome, files) = TombstoneManager::delete_in(&mut agg, kind, item_id, &mut changes);
        if outcome == DeleteOutcome::Absent {
            return Ok(outcome);
        }
        changes.pages.push(agg.page);
        self.ctx.repo.commit(changes).await?;

        tracing::info!(page_id = %page_id, item_id = %item_id, ?outcome, "slot content deleted");
        self.ctx.discard_files(files).await;
        Ok(outcome)
    }

    async fn delete_global(&self, site_id: Uuid, kind: EntityKind, item_id: Uuid) -> Result<DeleteOutcome> {
        let _lock = self.ctx.locks.acquire(site_id).await;
        let globals = self.ctx.repo.load_global_contents(site_id).await?;
        let (deletion, files) = match kind {
            EntityKind::MicroContent if globals.microcontents.iter().any(|m| m.item.id == item_id) => {
                (Deletion::MicroContent(item_id), Vec::new())
            }
            EntityKind::Image => match globals.images.iter().find(|i| i.item.id == item_id) {
                Some(img) => (Deletion::Image(item_id), img.stored_files()),
                None => return Ok(DeleteOutcome::Absent),
            },
            _ => return Ok(DeleteOutcome::Absent),
        };
        self.ctx
            .repo
            .commit(ChangeSet {
                deletions: vec![deletion],
                ..Default::default()
            })
            .await?;
        self.ctx.discard_files(files).await;
        Ok(DeleteOutcome::Purged)
    }

    /// Deletes a page with everything it owns. Returns false when the page
    /// did not exist.
    pub async fn delete_template_content(&self, page_id: Uuid) -> Result<bool> {
        let lock = self.ctx.locks.acquire(page_id).await;
        let Some(agg) = self.ctx.repo.load_page(page_id).await? else {
            return Ok(false);
        };
        let files: Vec<String> = agg.images.iter().flat_map(|i| i.stored_files()).collect();
        self.ctx
            .repo
            .commit(ChangeSet {
                guards: vec![agg.guard()],
                deletions: vec![Deletion::Page(page_id)],
                ..Default::default()
            })
            .await?;
        drop(lock);
        self.ctx.locks.forget(page_id);

        tracing::info!(page_id = %page_id, files = files.len(), "template content deleted");
        self.ctx.discard_files(files).await;
        Ok(true)
    }

    /// Makes `page_id` the only home page of its site.
    pub async fn set_home_page(&self, page_id: Uuid) -> Result<()> {
        let site_id = self.ctx.load_page(page_id).await?.page.site_id;
        let mut affected: Vec<Uuid> = self
            .ctx
            .repo
            .list_pages(site_id)
            .await?
            .into_iter()
            .filter(|p| p.is_home_page && p.id != page_id)
            .map(|p| p.id)
            .collect();
        affected.push(page_id);

        let _locks = self.ctx.locks.acquire_many(&affected).await;
        let mut changes = ChangeSet::default();
        for id in affected {
            let make_home = id == page_id;
            let mut agg = match self.ctx.repo.load_page(id).await? {
                Some(agg) => agg,
                None if make_home => return Err(DomainError::not_found("TemplateContent", id)),
                None => continue,
            };
            if agg.page.is_home_page == make_home {
                continue;
            }
            changes.guards.push(agg.guard());
            agg.page.is_home_page = make_home;
            agg.page.touch_draft();
            changes.pages.push(agg.page);
        }
        if !changes.is_empty() {
            self.ctx.repo.commit(changes).await?;
            tracing::info!(page_id = %page_id, site_id = %site_id, "home page changed");
        }
        Ok(())
    }

    /// Replaces the type assignments of a page. New assignments go to the
    /// end of their type's ordering.
    pub async fn assign_types(&self, page_id: Uuid, types: &[String]) -> Result<Vec<TemplateContentType>> {
        let desired: BTreeSet<&str> = types.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).collect();

        let _lock = self.ctx.locks.acquire(page_id).await;
        let agg = self.ctx.load_page(page_id).await?;
        let mut changes = ChangeSet {
            guards: vec![agg.guard()],
            ..Default::default()
        };

        let mut assigned = Vec::new();
        for existing in agg.types {
            if desired.contains(existing.content_type.as_str()) {
                assigned.push(existing);
            } else {
                changes.deletions.push(Deletion::PageType(existing.id));
            }
        }
        for content_type in desired {
            if assigned.iter().any(|t| t.content_type == content_type) {
                continue;
            }
            let last = self
                .ctx
                .repo
                .list_page_types(agg.page.site_id, content_type)
                .await?
                .iter()
                .map(|t| t.position)
                .max()
                .unwrap_or(0);
            let assignment = TemplateContentType::new(page_id, content_type, last + 1);
            changes.page_types.push(assignment.clone());
            assigned.push(assignment);
        }

        if !changes.is_empty() {
            self.ctx.repo.commit(changes).await?;
        }
        Ok(assigned)
    }

    /// Orders the pages of one type. Pages not listed keep their relative
    /// order after the listed ones. Every page carrying the type is locked,
    /// since all of them get renumbered.
    pub async fn reorder_type(&self, site_id: Uuid, content_type: &str, ordered_pages: &[Uuid]) -> Result<()> {
        let mut locked: BTreeSet<Uuid> = ordered_pages.iter().copied().collect();
        let (_locks, mut remaining) = loop {
            let locks = self.ctx.locks.acquire_many(&locked.iter().copied().collect::<Vec<_>>()).await;
            let assignments = self.ctx.repo.list_page_types(site_id, content_type).await?;
            let before = locked.len();
            locked.extend(assignments.iter().map(|t| t.template_content_id));
            if locked.len() == before {
                break (locks, assignments);
            }
            // Pages seen for the first time get locked on the next pass.
            drop(locks);
        };

        let mut ordered = Vec::with_capacity(remaining.len());
        for page_id in ordered_pages {
            let index = remaining
                .iter()
                .position(|t| t.template_content_id == *page_id)
                .ok_or_else(|| DomainError::not_found("TemplateContentType", format!("{page_id}/{content_type}")))?;
            ordered.push(remaining.remove(index));
        }
        ordered.extend(remaining);
        for (index, assignment) in ordered.iter_mut().enumerate() {
            assignment.position = index as i32 + 1;
        }

        let guards = self
            .ctx
            .repo
            .list_pages(site_id)
            .await?
            .into_iter()
            .filter(|p| ordered.iter().any(|t| t.template_content_id == p.id))
            .map(|p| VersionGuard {
                page_id: p.id,
                draft_version: p.draft_version,
                published_version: p.published_version,
            })
            .collect();

        self.ctx
            .repo
            .commit(ChangeSet {
                guards,
                page_types: ordered,
                ..Default::default()
            })
            .await
    }

    /// Purges tombstones the live page no longer references.
    pub async fn reconcile_tombstones(&self, page_id: Uuid) -> Result<usize> {
        let _lock = self.ctx.locks.acquire(page_id).await;
        let mut agg = self.ctx.load_page(page_id).await?;
        let mut changes = ChangeSet {
            guards: vec![agg.guard()],
            ..Default::default()
        };
        let (purged, files) = TombstoneManager::reconcile(&mut agg, &mut changes);
        if purged == 0 {
            return Ok(0);
        }
        self.ctx.repo.commit(changes).await?;
        tracing::info!(page_id = %page_id, purged, "tombstones reconciled");
        self.ctx.discard_files(files).await;
        Ok(purged)
    }

    /// Unused slug for `title`, advisory until a commit claims it.
    pub async fn generate_slug(&self, title: &str) -> Result<String> {
        generate_slug(self.ctx.repo.as_ref(), title, self.ctx.settings.slug_max_length).await
    }

    /// Title of a locale seeded from the first existing translation.
    fn seeded_title(&self, agg: &PageAggregate, languages: &[String]) -> String {
        let settings = &self.ctx.settings;
        match languages.iter().find_map(|l| agg.locale(l)) {
            Some(source) => format!("[{}] {}", settings.needs_translation_label, source.title),
            None => settings.temporary_title.clone(),
        }
    }

    async fn load_site_page(&self, site_id: Uuid, page_id: Uuid) -> Result<PageAggregate> {
        let agg = self.ctx.load_page(page_id).await?;
        if agg.page.site_id != site_id {
            return Err(DomainError::not_found("TemplateContent", page_id));
        }
        Ok(agg)
    }

    /// Commits a new locale, drawing a fresh slug whenever storage rejects
    /// the previous one.
    async fn commit_with_fresh_slug<F>(&self, title: &str, mut build: F) -> Result<LocalizedTemplateContent>
    where
        F: FnMut(String) -> (LocalizedTemplateContent, ChangeSet),
    {
        let mut attempt = 0;
        loop {
            let slug = self.generate_slug(title).await?;
            let (locale, changes) = build(slug);
            match self.ctx.repo.commit(changes).await {
                Ok(()) => return Ok(locale),
                Err(e) if e.is_conflict() && attempt < self.ctx.settings.slug_retry_limit => {
                    attempt += 1;
                    tracing::warn!(slug = %locale.slug, attempt, "slug claimed concurrently, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// One draft write into either a page's or the site's slot values.
struct ValueWrite<'a> {
    target: &'a SlotTarget,
    language: &'a str,
    editor: EditorId,
    now: DateTime<Utc>,
}

impl ValueWrite<'_> {
    /// Returns the written item and a file its new draft superseded.
    fn apply(
        &self,
        microcontents: &mut Vec<MicroContent>,
        images: &mut Vec<ContentImage>,
        value: String,
        changes: &mut ChangeSet,
    ) -> Result<(Uuid, Option<String>)> {
        let target = self.target;
        match target.category.entity_kind() {
            EntityKind::MicroContent => {
                let mc = slot_instance(microcontents, target, |position| {
                    MicroContent::new(target.site_id, target.page_id, &target.content_type, position)
                })?;
                let superseded = mc.set_content(self.language, value, self.editor, self.now);
                changes.microcontents.push(mc.clone());
                Ok((mc.item.id, superseded))
            }
            EntityKind::Image => {
                let img = slot_instance(images, target, |position| {
                    ContentImage::new(
                        target.site_id,
                        target.page_id,
                        &target.content_type,
                        position,
                        value.clone(),
                        self.editor,
                        self.now,
                    )
                })?;
                let superseded = img.set_content(self.language, value, self.editor, self.now);
                changes.images.push(img.clone());
                Ok((img.item.id, superseded))
            }
            EntityKind::TemplateContent => Err(DomainError::Validation(
                "template_content slots hold no values".to_string(),
            )),
        }
    }
}

/// Finds the instance a write goes to, appending a new one when needed.
fn slot_instance<'a, T: SlotContent>(
    items: &'a mut Vec<T>,
    target: &SlotTarget,
    create: impl FnOnce(i32) -> T,
) -> Result<&'a mut T> {
    let live = |i: &T| !i.item().deleted && i.item().content_type == target.content_type;

    let existing = match target.item_id {
        Some(id) => Some(
            items
                .iter()
                .position(|i| i.item().id == id && live(i))
                .ok_or_else(|| DomainError::not_found(target.category.entity_kind().as_str(), id))?,
        ),
        None if !target.category.is_plural() => items
            .iter()
            .enumerate()
            .filter(|(_, i)| live(i))
            .min_by_key(|(_, i)| i.item().position)
            .map(|(index, _)| index),
        None => None,
    };

    let index = match existing {
        Some(index) => index,
        None => {
            let position = items
                .iter()
                .filter(|i| i.item().content_type == target.content_type)
                .map(|i| i.item().position)
                .max()
                .unwrap_or(0)
                + 1;
            items.push(create(position));
            items.len() - 1
        }
    };
    Ok(&mut items[index])
}

fn require_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(DomainError::Validation("title must not be empty".to_string()));
    }
    Ok(title.to_string())
}

fn require_site_language(languages: &[String], language: &str) -> Result<()> {
    if languages.iter().any(|l| l == language) {
        Ok(())
    } else {
        Err(DomainError::Validation(format!(
            "language '{language}' is not configured for this site"
        )))
    }
}

/// Image slots only accept files whose extension names an image type.
fn require_image_name(file_name: &str) -> Result<()> {
    match mime_guess::from_path(file_name).first() {
        Some(guessed) if guessed.type_() == mime::IMAGE => Ok(()),
        Some(guessed) => Err(DomainError::Validation(format!(
            "'{file_name}' is {guessed}, not an image"
        ))),
        None => Err(DomainError::Validation(format!(
            "cannot tell the type of '{file_name}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(page: Uuid, content_type: &str, position: i32) -> MicroContent {
        MicroContent::new(Uuid::nil(), Some(page), content_type, position)
    }

    #[test]
    fn only_image_files_are_accepted_for_upload() {
        assert!(require_image_name("hero.png").is_ok());
        assert!(require_image_name("Hero.JPG").is_ok());
        assert!(require_image_name("logo.svg").is_ok());
        assert!(matches!(require_image_name("notes.txt"), Err(DomainError::Validation(_))));
        assert!(matches!(require_image_name("blob"), Err(DomainError::Validation(_))));
    }

    #[test]
    fn single_slot_reuses_its_first_live_instance() {
        let page = Uuid::now_v7();
        let mut items = vec![item(page, "headline", 2), item(page, "headline", 1)];
        items[1].item.deleted = true;
        let expected = items[0].item.id;

        let target = SlotTarget::page(Uuid::nil(), page, SlotCategory::Microcontent, "headline");
        let found = slot_instance(&mut items, &target, |p| item(page, "headline", p)).unwrap();
        assert_eq!(found.item.id, expected);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn plural_slot_appends_after_the_last_position() {
        let page = Uuid::now_v7();
        let mut items = vec![item(page, "list", 1), item(page, "list", 4), item(page, "other", 9)];
        let target = SlotTarget::page(Uuid::nil(), page, SlotCategory::Microcontents, "list");
        let created = slot_instance(&mut items, &target, |p| item(page, "list", p)).unwrap();
        assert_eq!(created.item.position, 5);
        assert_eq!(items.len(), 4);
    }

    #[test]
    fn unknown_instance_is_not_found() {
        let page = Uuid::now_v7();
        let mut items = vec![item(page, "list", 1)];
        let target = SlotTarget::page(Uuid::nil(), page, SlotCategory::Microcontents, "list").instance(Uuid::now_v7());
        let err = slot_instance(&mut items, &target, |p| item(page, "list", p)).unwrap_err();
        assert!(matches!(err, DomainError::NotFound("microcontent", _)));
    }

    #[test]
    fn titles_are_trimmed_and_required() {
        assert_eq!(require_title("  Home ").unwrap(), "Home");
        assert!(matches!(require_title(" \t"), Err(DomainError::Validation(_))));
    }

    #[test]
    fn languages_must_belong_to_the_site() {
        let languages = vec!["en".to_string(), "de".to_string()];
        assert!(require_site_language(&languages, "de").is_ok());
        let err = require_site_language(&languages, "fr").unwrap_err();
        assert!(err.to_string().contains("'fr'"));
    }
}
