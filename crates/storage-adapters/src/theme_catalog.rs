//! Template catalogs.
//!
//! Slots are declared in template sources with tags such as
//! `{% cms_get_microcontent 'headline' optional %}`: the tag suffix is the
//! slot category, the first argument the content type and the remaining
//! words its arguments.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use domains::error::{DomainError, Result};
use domains::ports::TemplateCatalog;
use domains::slots::SlotDeclaration;
use once_cell::sync::Lazy;
use regex::Regex;

static CMS_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{%\s*(cms_get_([a-z_]+))\s+([^%]*?)\s*%\}").expect("valid regex"));

/// Lists the slot tags of `source` in document order. The category is not
/// validated here; resolution rejects unknown ones.
pub fn extract_cms_tags(source: &str) -> Result<Vec<SlotDeclaration>> {
    CMS_TAG
        .captures_iter(source)
        .map(|caps| {
            let tag_name = caps[1].to_string();
            let mut words = caps[3]
                .split_whitespace()
                .map(|w| w.trim_matches(|c| c == '\'' || c == '"').to_string());
            let content_type = words
                .next()
                .filter(|w| !w.is_empty())
                .ok_or_else(|| DomainError::Validation(format!("tag '{tag_name}' names no content type")))?;
            Ok(SlotDeclaration {
                category: caps[2].to_string(),
                tag_name,
                content_type,
                args: words.collect(),
            })
        })
        .collect()
}

/// Reads templates from `{root}/{theme}/{template_name}`.
pub struct ThemeDirectoryCatalog {
    root: PathBuf,
}

impl ThemeDirectoryCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl TemplateCatalog for ThemeDirectoryCatalog {
    async fn resolve_template(&self, theme: &str, name: &str) -> Result<String> {
        let relative = Path::new(theme).join(name);
        if relative.components().any(|c| !matches!(c, Component::Normal(_))) {
            return Err(DomainError::Validation(format!("invalid template path '{theme}/{name}'")));
        }
        let path = self.root.join(relative);
        match tokio::fs::read_to_string(&path).await {
            Ok(source) => Ok(source),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(DomainError::not_found("template", format!("{theme}/{name}")))
            }
            Err(e) => Err(DomainError::Internal(format!("{}: {e}", path.display()))),
        }
    }

    fn extract_slot_declarations(&self, source: &str) -> Result<Vec<SlotDeclaration>> {
        extract_cms_tags(source)
    }
}

/// Templates held in memory, keyed by theme and name.
#[derive(Debug, Clone, Default)]
pub struct StaticTemplateCatalog {
    templates: HashMap<(String, String), String>,
}

impl StaticTemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, theme: &str, name: &str, source: &str) -> Self {
        self.templates
            .insert((theme.to_string(), name.to_string()), source.to_string());
        self
    }
}

#[async_trait]
impl TemplateCatalog for StaticTemplateCatalog {
    async fn resolve_template(&self, theme: &str, name: &str) -> Result<String> {
        self.templates
            .get(&(theme.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| DomainError::not_found("template", format!("{theme}/{name}")))
    }

    fn extract_slot_declarations(&self, source: &str) -> Result<Vec<SlotDeclaration>> {
        extract_cms_tags(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HERO: &str = r#"
        <section class="hero">
          {% load micromanager_tags %}
          <h1>{% cms_get_microcontent 'headline' %}</h1>
          <div style="background: url({% cms_get_image "background" optional %})"></div>
          {% for item in list %}{{ item }}{% endfor %}
          {% cms_get_microcontents 'bullets' layoutable-simple min-1 %}
        </section>
    "#;

    #[test]
    fn tags_are_extracted_in_order() {
        let tags = extract_cms_tags(HERO).unwrap();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0].category, "microcontent");
        assert_eq!(tags[0].content_type, "headline");
        assert!(tags[0].args.is_empty());
        assert_eq!(tags[1].tag_name, "cms_get_image");
        assert_eq!(tags[1].args, vec!["optional"]);
        assert_eq!(tags[2].category, "microcontents");
        assert_eq!(tags[2].args, vec!["layoutable-simple", "min-1"]);
    }

    #[test]
    fn template_content_tags_keep_their_full_category() {
        let tags = extract_cms_tags("{% cms_get_template_contents 'footer' %}").unwrap();
        assert_eq!(tags[0].category, "template_contents");
    }

    #[tokio::test]
    async fn directory_catalog_reads_theme_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("default/content")).unwrap();
        std::fs::write(dir.path().join("default/content/hero.html"), HERO).unwrap();

        let catalog = ThemeDirectoryCatalog::new(dir.path());
        let source = catalog.resolve_template("default", "content/hero.html").await.unwrap();
        assert_eq!(catalog.extract_slot_declarations(&source).unwrap().len(), 3);

        let missing = catalog.resolve_template("default", "content/none.html").await.unwrap_err();
        assert!(matches!(missing, DomainError::NotFound("template", _)));
        assert!(catalog.resolve_template("default", "../secret").await.is_err());
    }
}
