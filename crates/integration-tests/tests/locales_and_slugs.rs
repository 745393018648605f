use domains::error::DomainError;
use domains::models::{PublishTarget, TemplateCategory};
use domains::ports::ContentRepository;
use domains::slots::EntityKind;
use integration_tests::{Harness, EDITOR};
use services::{EngineSettings, LocaleUpdate};

#[tokio::test]
async fn identical_titles_get_numbered_slugs() {
    let h = Harness::new().await;
    let first = h.create_page("page/home.html", "Home").await;
    let second = h.create_page("page/home.html", "Home").await;
    let third = h.create_page("page/home.html", "Home").await;

    assert_eq!(h.load(first).await.locale("en").unwrap().slug, "home");
    assert_eq!(h.load(second).await.locale("en").unwrap().slug, "home2");
    assert_eq!(h.load(third).await.locale("en").unwrap().slug, "home3");
}

#[tokio::test]
async fn long_titles_are_truncated_before_numbering() {
    let h = Harness::new().await;
    let title = "An extraordinarily long page title about everything";
    let first = h.create_page("page/home.html", title).await;
    let second = h.create_page("page/home.html", title).await;

    let first_slug = h.load(first).await.locale("en").unwrap().slug.clone();
    let second_slug = h.load(second).await.locale("en").unwrap().slug.clone();
    assert_eq!(first_slug.len(), 29);
    assert_eq!(second_slug, format!("{first_slug}2"));
    assert_eq!(second_slug.len(), 30);
}

#[tokio::test]
async fn slug_length_is_configurable() {
    let h = Harness::with_settings(EngineSettings {
        slug_max_length: 8,
        ..EngineSettings::default()
    })
    .await;
    assert_eq!(h.engine.store.generate_slug("Frequently asked").await.unwrap(), "frequen");
}

#[tokio::test]
async fn creation_validates_its_input() {
    let h = Harness::new().await;
    let store = &h.engine.store;

    let empty_title = store
        .create_template_content(h.site.id, "page/home.html", TemplateCategory::Page, "   ", EDITOR)
        .await
        .unwrap_err();
    assert!(matches!(empty_title, DomainError::Validation(_)));

    let wrong_category = store
        .create_template_content(h.site.id, "content/hero.html", TemplateCategory::Page, "Hero", EDITOR)
        .await
        .unwrap_err();
    assert!(matches!(wrong_category, DomainError::Validation(_)));

    let missing_template = store
        .create_template_content(h.site.id, "page/missing.html", TemplateCategory::Page, "Gone", EDITOR)
        .await
        .unwrap_err();
    assert!(matches!(missing_template, DomainError::NotFound("template", _)));

    let symbols_only = store
        .create_template_content(h.site.id, "page/home.html", TemplateCategory::Page, "!!!", EDITOR)
        .await
        .unwrap_err();
    assert!(matches!(symbols_only, DomainError::Validation(_)));
}

#[tokio::test]
async fn new_page_starts_as_an_unpublished_draft() {
    let h = Harness::new().await;
    let page_id = h.create_hero("Hero").await;
    let agg = h.load(page_id).await;

    assert_eq!((agg.page.draft_version, agg.page.published_version), (1, None));
    assert_eq!(agg.locales.len(), 1);
    let locale = agg.locale("en").unwrap();
    assert_eq!(locale.title, "Hero");
    assert_eq!(locale.draft_version, 1);
    assert!(!locale.translation_ready);
}

#[tokio::test]
async fn opening_a_missing_locale_seeds_it_for_translation() {
    let h = Harness::new().await;
    let page_id = h.create_page("page/home.html", "Home").await;

    let german = h.engine.store.open_locale(page_id, "de", EDITOR).await.unwrap();
    assert_eq!(german.title, "[needs translation] Home");
    assert_eq!(german.slug, "needs-translation-home");
    assert!(!german.translation_ready);

    let again = h.engine.store.open_locale(page_id, "de", EDITOR).await.unwrap();
    assert_eq!(again.id, german.id);

    let err = h.engine.store.open_locale(page_id, "fr", EDITOR).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn first_entry_in_a_language_creates_its_locale() {
    let h = Harness::new().await;
    let page_id = h.create_hero("Hero").await;
    h.set_text(page_id, "headline", "de", "Willkommen").await;

    let german = h.load(page_id).await.locale("de").cloned().expect("de locale");
    assert_eq!(german.title, "[needs translation] Hero");
    assert_eq!(german.slug, "needs-translation-hero");
    assert_eq!(german.draft_version, h.versions(page_id).await.0);
    assert!(!german.translation_ready);

    // Later entries reuse it.
    h.set_text(page_id, "headline", "de", "Hallo").await;
    let again = h.engine.store.open_locale(page_id, "de", EDITOR).await.unwrap();
    assert_eq!(again.id, german.id);
    assert_eq!(h.load(page_id).await.locales.len(), 2);

    h.set_text(page_id, "headline", "en", "Welcome").await;
    h.mark_ready(page_id, "en").await;
    h.mark_ready(page_id, "de").await;
    h.engine.publication.publish_checked(page_id, PublishTarget::All).await.unwrap();
    assert_eq!(h.load(page_id).await.locale("de").unwrap().published_version, Some(1));
}

#[tokio::test]
async fn stale_ready_locale_is_incomplete() {
    let h = Harness::new().await;
    let page_id = h.ready_hero("Hero").await;
    h.engine
        .publication
        .publish_checked(page_id, PublishTarget::Language("en".into()))
        .await
        .unwrap();
    assert!(h.engine.completeness.is_complete(page_id, "en").await.unwrap());

    h.set_text(page_id, "headline", "en", "Changed").await;
    let locale = h.load(page_id).await.locale("en").cloned().unwrap();
    assert!(locale.translation_ready);
    assert!(!h.engine.completeness.is_complete(page_id, "en").await.unwrap());
    let report = h.engine.completeness.report(page_id, "en").await.unwrap().unwrap();
    assert!(report.contains("outdated"), "{report}");

    h.mark_ready(page_id, "en").await;
    assert!(h.engine.completeness.is_complete(page_id, "en").await.unwrap());
}

#[tokio::test]
async fn editing_a_locale_revokes_stale_readiness() {
    let h = Harness::new().await;
    let page_id = h.ready_hero("Hero").await;
    h.engine
        .publication
        .publish_checked(page_id, PublishTarget::Language("en".into()))
        .await
        .unwrap();
    h.set_text(page_id, "headline", "en", "Changed").await;

    let update = LocaleUpdate {
        title: Some("Hero, revised".to_string()),
        translation_ready: None,
    };
    let locale = h.engine.store.update_locale(page_id, "en", update, EDITOR).await.unwrap();
    assert_eq!(locale.title, "Hero, revised");
    assert_eq!(locale.draft_version, 2);
    assert!(!locale.translation_ready);
    assert_eq!(h.versions(page_id).await, (2, Some(1)));

    let blank = LocaleUpdate {
        title: Some(" ".to_string()),
        translation_ready: None,
    };
    let err = h.engine.store.update_locale(page_id, "en", blank, EDITOR).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn full_completeness_needs_every_site_language() {
    let h = Harness::new().await;
    let page_id = h.ready_hero("Hero").await;
    assert!(h.engine.completeness.is_complete(page_id, "en").await.unwrap());
    assert!(!h.engine.completeness.is_fully_complete(page_id).await.unwrap());

    let gaps = h.engine.completeness.incomplete_languages(page_id).await.unwrap();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].language, "de");
}

#[tokio::test]
async fn required_page_types_must_exist() {
    let h = Harness::new().await;
    let landing = h.create_page("page/landing.html", "Landing").await;
    h.mark_ready(landing, "en").await;
    let report = h.engine.completeness.report(landing, "en").await.unwrap().unwrap();
    assert!(report.contains("'teaser'"), "{report}");

    let teaser = h.create_hero("Teaser").await;
    h.engine.store.assign_types(teaser, &["teaser".to_string()]).await.unwrap();
    assert!(h.engine.completeness.is_complete(landing, "en").await.unwrap());
}

#[tokio::test]
async fn one_home_page_per_site() {
    let h = Harness::new().await;
    let first = h.create_page("page/home.html", "Home").await;
    let second = h.create_page("page/home.html", "Start").await;

    h.engine.store.set_home_page(first).await.unwrap();
    assert!(h.load(first).await.page.is_home_page);

    h.engine.store.set_home_page(second).await.unwrap();
    assert!(!h.load(first).await.page.is_home_page);
    assert!(h.load(second).await.page.is_home_page);
}

#[tokio::test]
async fn site_languages_keep_one_primary() {
    let h = Harness::new().await;
    let sites = &h.engine.sites;

    let languages: Vec<String> = sites.languages(h.site.id).await.unwrap().into_iter().map(|l| l.language).collect();
    assert_eq!(languages, vec!["en", "de"]);

    let removed = sites.remove_language(h.site.id, "en").await;
    assert!(matches!(removed, Err(DomainError::Validation(_))));

    sites.set_primary_language(h.site.id, "de").await.unwrap();
    let primary = sites.languages(h.site.id).await.unwrap().remove(0);
    assert_eq!(primary.language, "de");
    assert!(primary.is_primary);

    assert!(sites.remove_language(h.site.id, "en").await.unwrap());
    assert!(!sites.remove_language(h.site.id, "en").await.unwrap());
}

#[tokio::test]
async fn reordering_a_type_does_not_revive_dropped_assignments() {
    let h = Harness::new().await;
    let a = h.create_hero("Alpha").await;
    let b = h.create_hero("Beta").await;
    let c = h.create_hero("Gamma").await;
    for page in [a, b, c] {
        h.engine.store.assign_types(page, &["teaser".to_string()]).await.unwrap();
    }

    let order = [c];
    let (reordered, dropped) = tokio::join!(
        h.engine.store.reorder_type(h.site.id, "teaser", &order),
        h.engine.store.assign_types(b, &[]),
    );
    reordered.unwrap();
    assert!(dropped.unwrap().is_empty());

    let assignments = h.repo.list_page_types(h.site.id, "teaser").await.unwrap();
    let pages: Vec<_> = assignments.iter().map(|t| t.template_content_id).collect();
    assert!(!pages.contains(&b), "{pages:?}");
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0], c);
    assert!(assignments[0].position < assignments[1].position);
}

#[tokio::test]
async fn deleting_content_through_another_site_is_refused() {
    let h = Harness::new().await;
    let page_id = h.create_hero("Hero").await;
    let bullet = h.add_bullet(page_id, "en", "one").await;
    let other = h.engine.sites.create_site("Other", "default", "en").await.unwrap();

    let err = h
        .engine
        .store
        .delete_content(other.id, Some(page_id), EntityKind::MicroContent, bullet)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound("TemplateContent", _)));

    assert_eq!(h.load(page_id).await.live_microcontents("bullets").len(), 1);
}
