//! Deletion of slot values that a live page may still render.
//!
//! A value that reached a published payload of a published page is only
//! flagged (`deleted` + `deleted_in_version`); it disappears from drafts but
//! stays readable by the live page until a publish moves past that version.

use domains::content::SlotContent;
use domains::models::{TemplateContent, Version};
use domains::ports::{ChangeSet, Deletion, PageAggregate};
use domains::slots::EntityKind;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteDecision {
    Purge,
    Tombstone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Purged,
    Tombstoned { in_version: Version },
    /// Nothing to delete; the item was already gone.
    Absent,
}

pub struct TombstoneManager;

impl TombstoneManager {
    pub fn decide(page: &TemplateContent, item: &dyn SlotContent) -> DeleteDecision {
        let Some(published) = page.published_version else {
            return DeleteDecision::Purge;
        };
        if !item.has_published_payload() {
            return DeleteDecision::Purge;
        }
        match item.item().deleted_in_version {
            Some(deleted_in) if item.item().deleted && published >= deleted_in => DeleteDecision::Purge,
            _ => DeleteDecision::Tombstone,
        }
    }

    /// Deletes one owned value of `agg` in memory and records the rows to
    /// write in `changes`. The page is touched in either case. Returns the
    /// outcome plus files to remove once the change set committed.
    pub fn delete_in(
        agg: &mut PageAggregate,
        kind: EntityKind,
        item_id: Uuid,
        changes: &mut ChangeSet,
    ) -> (DeleteOutcome, Vec<String>) {
        match kind {
            EntityKind::MicroContent => match delete_from(&mut agg.page, &mut agg.microcontents, item_id) {
                None => (DeleteOutcome::Absent, Vec::new()),
                Some((outcome, Ok(row), files)) => {
                    changes.microcontents.push(row);
                    (outcome, files)
                }
                Some((outcome, Err(id), files)) => {
                    changes.deletions.push(Deletion::MicroContent(id));
                    (outcome, files)
                }
            },
            EntityKind::Image => match delete_from(&mut agg.page, &mut agg.images, item_id) {
                None => (DeleteOutcome::Absent, Vec::new()),
                Some((outcome, Ok(row), files)) => {
                    changes.images.push(row);
                    (outcome, files)
                }
                Some((outcome, Err(id), files)) => {
                    changes.deletions.push(Deletion::Image(id));
                    (outcome, files)
                }
            },
            EntityKind::TemplateContent => (DeleteOutcome::Absent, Vec::new()),
        }
    }

    /// Purges every tombstone the live page has moved past. Returns the
    /// number of purged values and their backing files.
    pub fn reconcile(agg: &mut PageAggregate, changes: &mut ChangeSet) -> (usize, Vec<String>) {
        let Some(published) = agg.page.published_version else {
            return (0, Vec::new());
        };
        let mut files = Vec::new();

        let expired = take_expired(&mut agg.microcontents, published);
        let purged = expired.len();
        changes
            .deletions
            .extend(expired.iter().map(|m| Deletion::MicroContent(m.item.id)));

        let expired = take_expired(&mut agg.images, published);
        let purged = purged + expired.len();
        for img in &expired {
            changes.deletions.push(Deletion::Image(img.item.id));
            files.extend(img.stored_files());
        }
        (purged, files)
    }
}

/// `Ok` carries the flagged row to upsert, `Err` the id of the removed row.
type Removal<T> = (DeleteOutcome, Result<T, Uuid>, Vec<String>);

fn delete_from<T: SlotContent + Clone>(
    page: &mut TemplateContent,
    items: &mut Vec<T>,
    item_id: Uuid,
) -> Option<Removal<T>> {
    let index = items.iter().position(|i| i.item().id == item_id)?;

    let decision = TombstoneManager::decide(page, &items[index]);
    page.touch_draft();

    match decision {
        DeleteDecision::Purge => {
            let removed = items.remove(index);
            Some((DeleteOutcome::Purged, Err(item_id), removed.stored_files()))
        }
        DeleteDecision::Tombstone => {
            let item = &mut items[index];
            let in_version = match item.item().deleted_in_version {
                // Repeated deletes keep the first stamp.
                Some(v) if item.item().deleted => v,
                _ => {
                    let slot = item.item_mut();
                    slot.deleted = true;
                    slot.deleted_in_version = Some(page.draft_version);
                    page.draft_version
                }
            };
            Some((DeleteOutcome::Tombstoned { in_version }, Ok(item.clone()), Vec::new()))
        }
    }
}

fn take_expired<T: SlotContent>(items: &mut Vec<T>, published: Version) -> Vec<T> {
    let (expired, live): (Vec<T>, Vec<T>) = std::mem::take(items).into_iter().partition(|i| {
        let slot = i.item();
        slot.deleted && slot.deleted_in_version.is_some_and(|v| v <= published)
    });
    *items = live;
    expired
}
