//! # Domain Models
//!
//! These structs represent the core entities of the content engine.
//! Pages (`TemplateContent`) carry two version lines, draft and published;
//! everything a page owns is promoted from draft to published together.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::text::plain_text;

/// Identifier of the administrator performing a write.
pub type EditorId = Uuid;

/// Draft/published version counter of a page.
pub type Version = i32;

/// A website: a theme plus the set of languages it is maintained in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: Uuid,
    pub name: String,
    /// Directory name of the active theme
    pub theme: String,
    pub created_at: DateTime<Utc>,
}

impl Site {
    pub fn new(name: impl Into<String>, theme: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            theme: theme.into(),
            created_at: now,
        }
    }
}

/// One language a site is maintained in. Exactly one per site is primary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteLanguage {
    pub id: Uuid,
    pub site_id: Uuid,
    pub language: String,
    pub is_primary: bool,
}

impl SiteLanguage {
    pub fn new(site_id: Uuid, language: impl Into<String>, is_primary: bool) -> Self {
        Self {
            id: Uuid::now_v7(),
            site_id,
            language: language.into(),
            is_primary,
        }
    }
}

/// Templates live either under `page/` (full pages extending a base) or
/// `content/` (fragments displayed on pages).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateCategory {
    Page,
    Content,
}

impl TemplateCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Content => "content",
        }
    }
}

impl fmt::Display for TemplateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "page" => Ok(Self::Page),
            "content" => Ok(Self::Content),
            other => Err(DomainError::Validation(format!(
                "unknown template category '{other}'"
            ))),
        }
    }
}

/// A template-backed page or content unit.
///
/// `published_version` stays `None` until the first publish; afterwards it
/// never exceeds `draft_version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateContent {
    pub id: Uuid,
    pub site_id: Uuid,
    /// Theme-relative template path, e.g. `content/hero.html`
    pub template_name: String,
    pub category: TemplateCategory,
    pub draft_version: Version,
    pub published_version: Option<Version>,
    pub published_at: Option<DateTime<Utc>>,
    pub is_home_page: bool,
    pub created_at: DateTime<Utc>,
}

impl TemplateContent {
    pub fn new(
        site_id: Uuid,
        template_name: impl Into<String>,
        category: TemplateCategory,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            site_id,
            template_name: template_name.into(),
            category,
            draft_version: 1,
            published_version: None,
            published_at: None,
            is_home_page: false,
            created_at: now,
        }
    }

    /// Applies the draft-advance rule of a draft-affecting save: the draft
    /// moves past the published version unless it is already ahead.
    /// Returns true when the draft version changed.
    pub fn touch_draft(&mut self) -> bool {
        if self.published_version == Some(self.draft_version) {
            self.draft_version += 1;
            true
        } else {
            false
        }
    }

    /// Promotes the draft line. With no net draft change since the last
    /// publish both counters advance so a fresh published boundary exists.
    pub fn publish(&mut self, now: DateTime<Utc>) {
        match self.published_version {
            Some(published) if published == self.draft_version => {
                self.published_version = Some(published + 1);
                self.draft_version += 1;
            }
            _ => self.published_version = Some(self.draft_version),
        }
        if self.published_at.is_none() {
            self.published_at = Some(now);
        }
    }

    /// Visible in public (non-preview) mode.
    pub fn is_public(&self) -> bool {
        self.published_at.is_some()
    }
}

/// Per-language variant of a page: title, slug and translation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizedTemplateContent {
    pub id: Uuid,
    pub template_content_id: Uuid,
    pub language: String,
    pub title: String,
    /// Globally unique
    pub slug: String,
    pub draft_version: Version,
    pub published_version: Option<Version>,
    /// Set by the translator once the language is believed complete
    pub translation_ready: bool,
    pub creator: EditorId,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub last_modified_by: Option<EditorId>,
}

impl LocalizedTemplateContent {
    pub fn new(
        page: &TemplateContent,
        language: impl Into<String>,
        title: impl Into<String>,
        slug: impl Into<String>,
        creator: EditorId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            template_content_id: page.id,
            language: language.into(),
            title: title.into(),
            slug: slug.into(),
            draft_version: page.draft_version,
            published_version: None,
            translation_ready: false,
            creator,
            created_at: now,
            last_modified: now,
            last_modified_by: None,
        }
    }

    /// Pulls a lagging locale up to the page's draft. The translation no
    /// longer describes the current structure, so readiness is revoked.
    /// Applies to any lagging locale, whatever its published version.
    pub fn follow_page_draft(&mut self, page_draft: Version) -> bool {
        if self.draft_version < page_draft {
            self.draft_version = page_draft;
            self.translation_ready = false;
            true
        } else {
            false
        }
    }

    pub fn is_stale(&self, page: &TemplateContent) -> bool {
        self.draft_version != page.draft_version
    }
}

/// Fields shared by every slot value bound to a page (or to the site when
/// `template_content_id` is `None`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotItem {
    pub id: Uuid,
    pub site_id: Uuid,
    pub template_content_id: Option<Uuid>,
    /// Slot name as declared in the template
    pub content_type: String,
    pub position: i32,
    /// Tombstone flag: removed in the draft, still referenced by the live page
    pub deleted: bool,
    pub deleted_in_version: Option<Version>,
}

impl SlotItem {
    pub fn new(
        site_id: Uuid,
        template_content_id: Option<Uuid>,
        content_type: impl Into<String>,
        position: i32,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            site_id,
            template_content_id,
            content_type: content_type.into(),
            position,
            deleted: false,
            deleted_in_version: None,
        }
    }

    pub fn is_global(&self) -> bool {
        self.template_content_id.is_none()
    }
}

/// Language-specific text payload of a [`MicroContent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizedMicroContent {
    pub id: Uuid,
    pub microcontent_id: Uuid,
    pub language: String,
    pub draft_content: Option<String>,
    pub published_content: Option<String>,
    /// Markup-free projection of `draft_content`
    pub plain_text: Option<String>,
    pub creator: EditorId,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub last_modified_by: Option<EditorId>,
}

impl LocalizedMicroContent {
    pub fn new(
        microcontent_id: Uuid,
        language: impl Into<String>,
        content: Option<String>,
        editor: EditorId,
        now: DateTime<Utc>,
    ) -> Self {
        let plain = content.as_deref().map(plain_text);
        Self {
            id: Uuid::now_v7(),
            microcontent_id,
            language: language.into(),
            draft_content: content,
            published_content: None,
            plain_text: plain,
            creator: editor,
            created_at: now,
            last_modified: now,
            last_modified_by: None,
        }
    }

    pub fn set_draft(&mut self, content: Option<String>, editor: EditorId, now: DateTime<Utc>) {
        self.plain_text = content.as_deref().map(plain_text);
        self.draft_content = content;
        self.last_modified_by = Some(editor);
        self.last_modified = now;
    }
}

/// A text slot value. Holds no text itself; each language lives in a
/// [`LocalizedMicroContent`] row loaded alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicroContent {
    pub item: SlotItem,
    pub locales: Vec<LocalizedMicroContent>,
}

impl MicroContent {
    pub fn new(site_id: Uuid, page_id: Option<Uuid>, content_type: &str, position: i32) -> Self {
        Self {
            item: SlotItem::new(site_id, page_id, content_type, position),
            locales: Vec::new(),
        }
    }

    pub fn localized(&self, language: &str) -> Option<&LocalizedMicroContent> {
        self.locales.iter().find(|l| l.language == language)
    }

    pub fn localized_mut(&mut self, language: &str) -> Option<&mut LocalizedMicroContent> {
        self.locales.iter_mut().find(|l| l.language == language)
    }
}

/// An image slot value. Images are not translatable; the payload is a
/// stored file path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentImage {
    pub item: SlotItem,
    pub draft_content: String,
    pub published_content: Option<String>,
    /// Draft path the current published copy was made from
    pub published_source: Option<String>,
    pub creator: EditorId,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub last_modified_by: Option<EditorId>,
}

impl ContentImage {
    pub fn new(
        site_id: Uuid,
        page_id: Option<Uuid>,
        content_type: &str,
        position: i32,
        path: impl Into<String>,
        editor: EditorId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            item: SlotItem::new(site_id, page_id, content_type, position),
            draft_content: path.into(),
            published_content: None,
            published_source: None,
            creator: editor,
            created_at: now,
            last_modified: now,
            last_modified_by: None,
        }
    }
}

/// Assigns a page to a named type ("footer", "main-navigation", ...).
/// Positions order pages of the same type within a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateContentType {
    pub id: Uuid,
    pub template_content_id: Uuid,
    pub content_type: String,
    pub position: i32,
}

impl TemplateContentType {
    pub fn new(template_content_id: Uuid, content_type: impl Into<String>, position: i32) -> Self {
        Self {
            id: Uuid::now_v7(),
            template_content_id,
            content_type: content_type.into(),
            position,
        }
    }
}

/// Which locales a publish promotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishTarget {
    All,
    Language(String),
}

impl FromStr for PublishTarget {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "all" => Self::All,
            language => Self::Language(language.to_string()),
        })
    }
}

/// Request-scoped rendering state, passed explicitly down the read paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    pub site_id: Uuid,
    pub theme: String,
    pub language: String,
    /// Draft-visible when true; published-only otherwise
    pub preview: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> TemplateContent {
        TemplateContent::new(Uuid::now_v7(), "page/home.html", TemplateCategory::Page, Utc::now())
    }

    #[test]
    fn new_page_is_unpublished_draft_one() {
        let p = page();
        assert_eq!(p.draft_version, 1);
        assert_eq!(p.published_version, None);
        assert!(!p.is_public());
    }

    #[test]
    fn touch_only_advances_synchronized_draft() {
        let mut p = page();
        assert!(!p.touch_draft());
        assert_eq!(p.draft_version, 1);

        p.publish(Utc::now());
        assert_eq!(p.published_version, Some(1));
        assert!(p.touch_draft());
        assert_eq!(p.draft_version, 2);
        // already ahead
        assert!(!p.touch_draft());
        assert_eq!(p.draft_version, 2);
    }

    #[test]
    fn publish_with_equal_versions_advances_both() {
        let mut p = page();
        p.publish(Utc::now());
        let first_stamp = p.published_at;
        p.publish(Utc::now());
        assert_eq!(p.draft_version, 2);
        assert_eq!(p.published_version, Some(2));
        assert_eq!(p.published_at, first_stamp);
    }

    #[test]
    fn locale_follows_advanced_draft_and_loses_readiness() {
        let mut p = page();
        let mut l = LocalizedTemplateContent::new(&p, "en", "Home", "home", Uuid::nil(), Utc::now());
        l.translation_ready = true;
        p.publish(Utc::now());
        p.touch_draft();
        assert!(l.is_stale(&p));
        assert!(l.follow_page_draft(p.draft_version));
        assert!(!l.translation_ready);
        assert!(!l.is_stale(&p));
    }

    #[test]
    fn localized_draft_recomputes_plain_text() {
        let mut l = LocalizedMicroContent::new(Uuid::nil(), "en", Some("<b>Hi</b>".into()), Uuid::nil(), Utc::now());
        assert_eq!(l.plain_text.as_deref(), Some("Hi"));
        l.set_draft(None, Uuid::nil(), Utc::now());
        assert_eq!(l.plain_text, None);
    }

    #[test]
    fn publish_target_parses_all() {
        assert_eq!("all".parse::<PublishTarget>().unwrap(), PublishTarget::All);
        assert_eq!("de".parse::<PublishTarget>().unwrap(), PublishTarget::Language("de".into()));
    }
}
