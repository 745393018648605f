//! Slot declarations extracted from templates and the typed bindings they
//! resolve to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Slot category as written in a template tag (`cms_get_microcontent` ->
/// `microcontent`). Plural forms declare multi-value slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotCategory {
    TemplateContent,
    TemplateContents,
    Microcontent,
    Microcontents,
    Image,
    Images,
}

impl SlotCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TemplateContent => "template_content",
            Self::TemplateContents => "template_contents",
            Self::Microcontent => "microcontent",
            Self::Microcontents => "microcontents",
            Self::Image => "image",
            Self::Images => "images",
        }
    }

    /// Entity the slot values are stored as.
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            Self::TemplateContent | Self::TemplateContents => EntityKind::TemplateContent,
            Self::Microcontent | Self::Microcontents => EntityKind::MicroContent,
            Self::Image | Self::Images => EntityKind::Image,
        }
    }

    pub fn is_plural(&self) -> bool {
        matches!(self, Self::TemplateContents | Self::Microcontents | Self::Images)
    }

    pub fn is_translatable(&self) -> bool {
        !matches!(self, Self::Image | Self::Images)
    }
}

impl fmt::Display for SlotCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "template_content" => Ok(Self::TemplateContent),
            "template_contents" => Ok(Self::TemplateContents),
            "microcontent" => Ok(Self::Microcontent),
            "microcontents" => Ok(Self::Microcontents),
            "image" => Ok(Self::Image),
            "images" => Ok(Self::Images),
            other => Err(DomainError::UnknownSlotCategory(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    TemplateContent,
    MicroContent,
    Image,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TemplateContent => "template_content",
            Self::MicroContent => "microcontent",
            Self::Image => "image",
        }
    }
}

/// Layout editing a slot supports, from `layoutable-simple` /
/// `layoutable-full` arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    Simple,
    Full,
}

/// One slot declaration as reported by the template collaborator.
/// `category` stays a raw string: it comes from template source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDeclaration {
    pub tag_name: String,
    pub category: String,
    pub content_type: String,
    pub args: Vec<String>,
}

/// A resolved, typed slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotBinding {
    pub category: SlotCategory,
    pub content_type: String,
    pub args: Vec<String>,
    pub multi: bool,
    pub optional: bool,
    pub layout: Option<LayoutMode>,
    pub min: u32,
    /// `None` is unbounded
    pub max: Option<u32>,
    pub translatable: bool,
}

impl SlotBinding {
    pub fn entity_kind(&self) -> EntityKind {
        self.category.entity_kind()
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// How many more values an editor may add given `existing` values.
    /// Single-value slots accept one value in total. A `max` below `min` is
    /// accepted as declared and leaves nothing addable.
    pub fn addable_slots(&self, existing: usize) -> usize {
        let existing = existing as u32;
        if !self.multi {
            return usize::from(existing == 0);
        }
        match self.max {
            Some(max) if max < self.min => 0,
            Some(max) => max.saturating_sub(existing) as usize,
            None => usize::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_category_is_rejected() {
        let err = "widget".parse::<SlotCategory>().unwrap_err();
        assert_eq!(err, DomainError::UnknownSlotCategory("widget".into()));
    }

    #[test]
    fn plural_forms_map_to_the_singular_entity() {
        assert_eq!(SlotCategory::Images.entity_kind(), EntityKind::Image);
        assert_eq!(SlotCategory::Microcontents.entity_kind(), EntityKind::MicroContent);
        assert!(SlotCategory::TemplateContents.is_plural());
        assert!(!SlotCategory::Image.is_translatable());
    }
}
