//! Resolves the slot declarations of a template into typed bindings.

use domains::error::Result;
use domains::ports::TemplateCatalog;
use domains::slots::{LayoutMode, SlotBinding, SlotCategory, SlotDeclaration};

/// Turns raw declarations into [`SlotBinding`]s.
///
/// `min-N`/`max-N` arguments are left unparsed by default, so bindings keep
/// `min = 0` and an unbounded `max` no matter what the template says. This
/// matches how templates have always behaved and is probably not what their
/// authors intended; `honor_bounds` switches real parsing on.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotResolver {
    honor_bounds: bool,
}

impl SlotResolver {
    pub fn new(honor_bounds: bool) -> Self {
        Self { honor_bounds }
    }

    pub fn resolve(&self, declarations: &[SlotDeclaration]) -> Result<Vec<SlotBinding>> {
        declarations.iter().map(|d| self.resolve_one(d)).collect()
    }

    pub fn resolve_one(&self, declaration: &SlotDeclaration) -> Result<SlotBinding> {
        let category: SlotCategory = declaration.category.parse().inspect_err(|_| {
            tracing::error!(
                tag = %declaration.tag_name,
                category = %declaration.category,
                content_type = %declaration.content_type,
                "template declares an unknown slot category; template and engine versions disagree"
            );
        })?;

        let mut args = declaration.args.clone();
        let has = |args: &[String], flag: &str| args.iter().any(|a| a == flag);

        let multi = if has(&args, "multi") {
            true
        } else if category.is_plural() {
            args.push("multi".to_string());
            true
        } else {
            false
        };

        let layout = if has(&args, "layoutable-full") {
            Some(LayoutMode::Full)
        } else if has(&args, "layoutable-simple") {
            Some(LayoutMode::Simple)
        } else {
            None
        };

        let (min, max) = if self.honor_bounds {
            (bound(&args, "min-").unwrap_or(0), bound(&args, "max-"))
        } else {
            (0, None)
        };

        Ok(SlotBinding {
            category,
            content_type: declaration.content_type.clone(),
            optional: has(&args, "optional"),
            args,
            multi,
            layout,
            min,
            max,
            translatable: category.is_translatable(),
        })
    }

    /// Looks the template up in `theme` and resolves every slot it declares.
    pub async fn bindings_for_template(
        &self,
        catalog: &dyn TemplateCatalog,
        theme: &str,
        template_name: &str,
    ) -> Result<Vec<SlotBinding>> {
        let source = catalog.resolve_template(theme, template_name).await?;
        let declarations = catalog.extract_slot_declarations(&source)?;
        self.resolve(&declarations)
    }
}

fn bound(args: &[String], prefix: &str) -> Option<u32> {
    let raw = args.iter().find_map(|a| a.strip_prefix(prefix))?;
    match raw.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(arg = %format!("{prefix}{raw}"), "ignoring malformed slot bound");
            None
        }
    }
}
