//! content-engine/crates/domains/src/lib.rs
//!
//! The central domain types and interface definitions of the content engine.

pub mod content;
pub mod error;
pub mod models;
pub mod ports;
pub mod slots;
pub mod text;

// Re-exporting for easier access in other crates
pub use content::*;
pub use error::*;
pub use models::*;
pub use ports::*;
pub use slots::*;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_aggregate_hides_tombstones_from_draft_view() {
        let site_id = Uuid::now_v7();
        let page = TemplateContent::new(site_id, "content/hero.html", TemplateCategory::Content, Utc::now());
        let mut agg = PageAggregate::new(page.clone());

        let mut second = MicroContent::new(site_id, Some(page.id), "headline", 2);
        second.item.deleted = true;
        agg.microcontents.push(second);
        agg.microcontents.push(MicroContent::new(site_id, Some(page.id), "headline", 1));

        let live = agg.live_microcontents("headline");
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].item.position, 1);
        assert_eq!(agg.guard().draft_version, 1);
    }
}
