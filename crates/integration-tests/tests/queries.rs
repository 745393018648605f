use domains::models::{PublishTarget, RenderContext};
use domains::slots::SlotCategory;
use integration_tests::{Harness, EDITOR};
use services::SlotTarget;
use uuid::Uuid;

async fn render(h: &Harness, language: &str, preview: bool) -> RenderContext {
    h.engine
        .sites
        .render_context(h.site.id, Some(language), preview)
        .await
        .unwrap()
}

async fn headline(h: &Harness, ctx: &RenderContext, page_id: Uuid) -> Option<String> {
    h.engine
        .queries
        .slot_content(ctx, Some(page_id), SlotCategory::Microcontent, "headline")
        .await
        .unwrap()
}

#[tokio::test]
async fn public_mode_reads_published_values_and_preview_reads_drafts() {
    let h = Harness::new().await;
    let page_id = h.ready_hero("Hero").await;
    h.engine
        .publication
        .publish_checked(page_id, PublishTarget::Language("en".into()))
        .await
        .unwrap();
    h.set_text(page_id, "headline", "en", "Draft headline").await;

    let public = render(&h, "en", false).await;
    let preview = render(&h, "en", true).await;
    assert_eq!(headline(&h, &public, page_id).await.as_deref(), Some("Welcome"));
    assert_eq!(headline(&h, &preview, page_id).await.as_deref(), Some("Draft headline"));
}

#[tokio::test]
async fn unpublished_pages_are_only_visible_in_preview() {
    let h = Harness::new().await;
    let page_id = h.ready_hero("Hero").await;

    let public = render(&h, "en", false).await;
    let preview = render(&h, "en", true).await;
    assert!(h.engine.queries.page_by_slug(&public, "hero").await.unwrap().is_none());
    assert_eq!(headline(&h, &public, page_id).await, None);

    let found = h.engine.queries.page_by_slug(&preview, "hero").await.unwrap().unwrap();
    assert_eq!(found.page.id, page_id);
    assert_eq!(found.locale.unwrap().language, "en");
}

#[tokio::test]
async fn site_global_values_fill_empty_page_slots() {
    let h = Harness::new().await;
    let page_id = h.ready_hero("Hero").await;
    h.engine
        .publication
        .publish_checked(page_id, PublishTarget::Language("en".into()))
        .await
        .unwrap();

    let footer = SlotTarget::global(h.site.id, SlotCategory::Microcontent, "footer");
    h.engine
        .store
        .set_content(&footer, "en", "Imprint".to_string(), EDITOR)
        .await
        .unwrap();

    let public = render(&h, "en", false).await;
    let value = h
        .engine
        .queries
        .slot_content(&public, Some(page_id), SlotCategory::Microcontent, "footer")
        .await
        .unwrap();
    assert_eq!(value.as_deref(), Some("Imprint"));

    let german = render(&h, "de", false).await;
    let value = h
        .engine
        .queries
        .slot_content(&german, None, SlotCategory::Microcontent, "footer")
        .await
        .unwrap();
    assert_eq!(value, None);
}

#[tokio::test]
async fn plural_slots_list_values_in_position_order() {
    let h = Harness::new().await;
    let page_id = h.create_hero("Hero").await;
    let first = h.add_bullet(page_id, "en", "one").await;
    let second = h.add_bullet(page_id, "en", "two").await;
    assert_ne!(first, second);

    // Writing to an existing instance edits it in place.
    let target = h.slot(page_id, SlotCategory::Microcontents, "bullets").instance(first);
    h.engine
        .store
        .set_content(&target, "en", "one, edited".to_string(), EDITOR)
        .await
        .unwrap();

    let preview = render(&h, "en", true).await;
    let values = h
        .engine
        .queries
        .slot_contents(&preview, Some(page_id), SlotCategory::Microcontents, "bullets")
        .await
        .unwrap();
    let texts: Vec<&str> = values.iter().map(|v| v.content.as_str()).collect();
    assert_eq!(texts, vec!["one, edited", "two"]);
    assert!(values[0].position < values[1].position);
}

#[tokio::test]
async fn pages_by_type_follow_the_assigned_order() {
    let h = Harness::new().await;
    let a = h.create_hero("Alpha").await;
    let b = h.create_hero("Beta").await;
    let c = h.create_hero("Gamma").await;
    for page in [a, b, c] {
        h.engine.store.assign_types(page, &["teaser".to_string()]).await.unwrap();
    }

    let preview = render(&h, "en", true).await;
    let ids = |pages: Vec<services::queries::PageSummary>| pages.into_iter().map(|p| p.page.id).collect::<Vec<_>>();

    let listed = h.engine.queries.pages_by_type(&preview, "teaser").await.unwrap();
    assert_eq!(ids(listed), vec![a, b, c]);

    h.engine.store.reorder_type(h.site.id, "teaser", &[c, a]).await.unwrap();
    let listed = h.engine.queries.pages_by_type(&preview, "teaser").await.unwrap();
    assert_eq!(ids(listed), vec![c, a, b]);

    // Dropping a type removes the page from the listing.
    h.engine.store.assign_types(a, &[]).await.unwrap();
    let listed = h.engine.queries.pages_by_type(&preview, "teaser").await.unwrap();
    assert_eq!(ids(listed), vec![c, b]);

    let public = render(&h, "en", false).await;
    assert!(h.engine.queries.pages_by_type(&public, "teaser").await.unwrap().is_empty());
}

#[tokio::test]
async fn pages_by_template_list_published_pages_first() {
    let h = Harness::new().await;
    let draft = h.create_hero("Draft").await;
    let live = h.ready_hero("Live").await;
    h.engine
        .publication
        .publish_checked(live, PublishTarget::Language("en".into()))
        .await
        .unwrap();

    let preview = render(&h, "en", true).await;
    let listed = h.engine.queries.pages_by_template(&preview, "content/hero.html").await.unwrap();
    let ids: Vec<Uuid> = listed.iter().map(|p| p.page.id).collect();
    assert_eq!(ids, vec![live, draft]);

    let public = render(&h, "en", false).await;
    let listed = h.engine.queries.pages_by_template(&public, "content/hero.html").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].locale.as_ref().unwrap().title, "Live");
}

#[tokio::test]
async fn home_page_and_language_fallback() {
    let h = Harness::new().await;
    let home = h.create_page("page/home.html", "Home").await;
    h.mark_ready(home, "en").await;
    h.engine.store.set_home_page(home).await.unwrap();
    h.mark_ready(home, "en").await;
    h.engine
        .publication
        .publish_checked(home, PublishTarget::Language("en".into()))
        .await
        .unwrap();

    let ctx = h
        .engine
        .sites
        .render_context(h.site.id, Some("fr"), false)
        .await
        .unwrap();
    assert_eq!(ctx.language, "en");
    assert_eq!(ctx.theme, "default");

    let found = h.engine.queries.home_page(&ctx).await.unwrap().unwrap();
    assert_eq!(found.page.id, home);
    assert_eq!(found.locale.unwrap().slug, "home");

    let german = render(&h, "de", false).await;
    let found = h.engine.queries.home_page(&german).await.unwrap().unwrap();
    assert!(found.locale.is_none());
}
