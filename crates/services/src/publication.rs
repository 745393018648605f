//! Publishing: promotes the draft line of a page to its published line.
//!
//! A publish is all-or-nothing. Completeness is checked for every targeted
//! language first; image copies are made next; only then are the metadata
//! writes committed as one change set. A failed copy or commit removes the
//! copies staged so far and leaves the stored page untouched.

use std::sync::Arc;

use chrono::Utc;
use domains::content::{PublishStep, SlotContent};
use domains::error::{DomainError, Result};
use domains::models::PublishTarget;
use domains::ports::{ChangeSet, PageAggregate};
use uuid::Uuid;

use crate::completeness::CompletenessChecker;
use crate::tombstone::TombstoneManager;
use crate::EngineContext;

#[derive(Clone)]
pub struct PublicationEngine {
    ctx: Arc<EngineContext>,
    completeness: CompletenessChecker,
}

/// Image copies made for one publish.
#[derive(Default)]
struct StagedFiles {
    /// New published copies; removed again if the publish fails
    created: Vec<String>,
    /// Published copies replaced by `created`; removed after commit
    superseded: Vec<String>,
}

impl PublicationEngine {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self {
            completeness: CompletenessChecker::new(ctx.clone()),
            ctx,
        }
    }

    /// Publishes `page_id` for `target`. Returns one message per incomplete
    /// language; a non-empty list means nothing was changed.
    pub async fn publish(&self, page_id: Uuid, target: PublishTarget) -> Result<Vec<String>> {
        let _lock = self.ctx.locks.acquire(page_id).await;
        let mut agg = self.ctx.load_page(page_id).await?;
        let languages = match target {
            PublishTarget::All => self.ctx.site_language_codes(agg.page.site_id).await?,
            PublishTarget::Language(language) => vec![language],
        };

        let gaps = self.completeness.gaps(&agg, &languages).await?;
        if !gaps.is_empty() {
            let messages: Vec<String> = gaps.iter().map(ToString::to_string).collect();
            tracing::info!(page_id = %page_id, incomplete = messages.len(), "publish refused");
            return Ok(messages);
        }

        let guard = agg.guard();
        let staged = self.copy_images(&mut agg).await?;

        let mut changes = ChangeSet {
            guards: vec![guard],
            ..Default::default()
        };
        let page_draft = agg.page.draft_version;
        for language in &languages {
            for mc in agg.microcontents.iter_mut().filter(|m| !m.item.deleted) {
                mc.publish(language);
            }
            if let Some(locale) = agg.locale_mut(language) {
                locale.published_version = Some(page_draft);
                changes.locales.push(locale.clone());
            }
        }
        agg.page.publish(Utc::now());

        let (purged, purged_files) = TombstoneManager::reconcile(&mut agg, &mut changes);
        changes.pages.push(agg.page.clone());
        changes.microcontents.extend(agg.microcontents.iter().filter(|m| !m.item.deleted).cloned());
        changes.images.extend(agg.images.iter().filter(|i| !i.item.deleted).cloned());

        if let Err(e) = self.ctx.repo.commit(changes).await {
            tracing::error!(page_id = %page_id, error = %e, "publish commit failed, discarding staged copies");
            self.ctx.discard_files(staged.created).await;
            return Err(e);
        }

        tracing::info!(
            page_id = %page_id,
            languages = ?languages,
            draft_version = agg.page.draft_version,
            published_version = ?agg.page.published_version,
            purged,
            "page published"
        );
        let mut obsolete = staged.superseded;
        obsolete.extend(purged_files);
        self.ctx.discard_files(obsolete).await;
        Ok(Vec::new())
    }

    /// Like [`publish`](Self::publish) but reports incomplete languages as
    /// [`DomainError::IncompleteTranslation`].
    pub async fn publish_checked(&self, page_id: Uuid, target: PublishTarget) -> Result<()> {
        let messages = self.publish(page_id, target).await?;
        if messages.is_empty() {
            Ok(())
        } else {
            Err(DomainError::IncompleteTranslation(messages))
        }
    }

    async fn copy_images(&self, agg: &mut PageAggregate) -> Result<StagedFiles> {
        let mut staged = StagedFiles::default();
        for img in agg.images.iter_mut().filter(|i| !i.item.deleted) {
            // Images are not translatable; the language is irrelevant.
            let PublishStep::CopyFile { source } = img.publish("") else {
                continue;
            };
            match self.copy_with_retry(&source).await {
                Ok(path) => {
                    staged.created.push(path.clone());
                    staged.superseded.extend(img.complete_publish(path));
                }
                Err(e) => {
                    tracing::error!(image_id = %img.item.id, source = %source, error = %e, "image copy failed, publish aborted");
                    self.ctx.discard_files(staged.created).await;
                    return Err(e);
                }
            }
        }
        Ok(staged)
    }

    async fn copy_with_retry(&self, source: &str) -> Result<String> {
        let hint = published_path_hint(source);
        let attempts = self.ctx.settings.file_copy_attempts.max(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            match self.ctx.files.copy(source, &hint).await {
                Ok(path) => return Ok(path),
                Err(e) => {
                    tracing::warn!(source, attempt, error = %e, "image copy attempt failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| DomainError::FileOperation(format!("could not copy {source}"))))
    }
}

/// Published copies live in a `published/` directory next to the draft.
fn published_path_hint(source: &str) -> String {
    match source.rsplit_once('/') {
        Some((dir, name)) => format!("{dir}/published/{name}"),
        None => format!("published/{source}"),
    }
}
