//! # Slot content capability
//!
//! Text and image slot values share one interface: read a draft or
//! published payload, replace the draft, promote it, and judge whether a
//! language is complete. Pages are not slot values and do not implement it.

use chrono::{DateTime, Utc};

use crate::models::{ContentImage, EditorId, LocalizedMicroContent, MicroContent, SlotItem};
use crate::slots::EntityKind;

/// Side effect a publish needs before it can be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishStep {
    /// Draft already promoted in memory.
    Done,
    /// A published copy of `source` must be made; finish with
    /// [`ContentImage::complete_publish`].
    CopyFile { source: String },
}

pub trait SlotContent: Send + Sync {
    fn item(&self) -> &SlotItem;

    fn item_mut(&mut self) -> &mut SlotItem;

    fn kind(&self) -> EntityKind;

    /// Payload visible in `language`; `draft` selects the draft line.
    fn get_content(&self, language: &str, draft: bool) -> Option<&str>;

    /// Replaces the draft payload. Returns a stored file the new draft
    /// superseded, if any.
    fn set_content(
        &mut self,
        language: &str,
        value: String,
        editor: EditorId,
        now: DateTime<Utc>,
    ) -> Option<String>;

    fn publish(&mut self, language: &str) -> PublishStep;

    fn translation_complete(&self, language: &str) -> bool;

    /// True once any published payload exists, i.e. a live page may
    /// reference this value.
    fn has_published_payload(&self) -> bool;

    /// Every backing file; removed when the value is purged.
    fn stored_files(&self) -> Vec<String>;
}

impl SlotContent for MicroContent {
    fn item(&self) -> &SlotItem {
        &self.item
    }

    fn item_mut(&mut self) -> &mut SlotItem {
        &mut self.item
    }

    fn kind(&self) -> EntityKind {
        EntityKind::MicroContent
    }

    fn get_content(&self, language: &str, draft: bool) -> Option<&str> {
        let localized = self.localized(language)?;
        if draft {
            localized.draft_content.as_deref()
        } else {
            localized.published_content.as_deref()
        }
    }

    fn set_content(
        &mut self,
        language: &str,
        value: String,
        editor: EditorId,
        now: DateTime<Utc>,
    ) -> Option<String> {
        match self.localized_mut(language) {
            Some(localized) => localized.set_draft(Some(value), editor, now),
            None => {
                let localized =
                    LocalizedMicroContent::new(self.item.id, language, Some(value), editor, now);
                self.locales.push(localized);
            }
        }
        None
    }

    fn publish(&mut self, language: &str) -> PublishStep {
        if let Some(localized) = self.localized_mut(language) {
            localized.published_content = localized.draft_content.clone();
        }
        PublishStep::Done
    }

    fn translation_complete(&self, language: &str) -> bool {
        self.localized(language)
            .and_then(|l| l.draft_content.as_deref())
            .is_some_and(|draft| !draft.is_empty())
    }

    fn has_published_payload(&self) -> bool {
        self.locales.iter().any(|l| l.published_content.is_some())
    }

    fn stored_files(&self) -> Vec<String> {
        Vec::new()
    }
}

impl ContentImage {
    /// Records the published copy made for the current draft. Returns the
    /// previous published file, which the caller removes after commit.
    pub fn complete_publish(&mut self, published_path: String) -> Option<String> {
        self.published_source = Some(self.draft_content.clone());
        self.published_content.replace(published_path)
    }
}

impl SlotContent for ContentImage {
    fn item(&self) -> &SlotItem {
        &self.item
    }

    fn item_mut(&mut self) -> &mut SlotItem {
        &mut self.item
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Image
    }

    fn get_content(&self, _language: &str, draft: bool) -> Option<&str> {
        if draft {
            Some(self.draft_content.as_str())
        } else {
            self.published_content.as_deref()
        }
    }

    fn set_content(
        &mut self,
        _language: &str,
        value: String,
        editor: EditorId,
        now: DateTime<Utc>,
    ) -> Option<String> {
        self.last_modified_by = Some(editor);
        self.last_modified = now;
        let previous = std::mem::replace(&mut self.draft_content, value);
        (previous != self.draft_content).then_some(previous)
    }

    fn publish(&mut self, _language: &str) -> PublishStep {
        if self.published_source.as_deref() == Some(self.draft_content.as_str())
            && self.published_content.is_some()
        {
            PublishStep::Done
        } else {
            PublishStep::CopyFile {
                source: self.draft_content.clone(),
            }
        }
    }

    fn translation_complete(&self, _language: &str) -> bool {
        true
    }

    fn has_published_payload(&self) -> bool {
        self.published_content.is_some()
    }

    fn stored_files(&self) -> Vec<String> {
        let mut files = vec![self.draft_content.clone()];
        files.extend(self.published_content.clone());
        files
    }
}
