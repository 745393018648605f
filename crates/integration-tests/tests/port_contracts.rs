//! Publication against a mocked file store: retries, hints and cleanup.

use std::sync::Arc;

use domains::error::DomainError;
use domains::models::PublishTarget;
use domains::ports::MockFileStore;
use domains::slots::SlotCategory;
use integration_tests::{engine_with_files, EDITOR};
use mockall::predicate::eq;
use mockall::Sequence;
use services::{ContentEngine, EngineSettings, LocaleUpdate, SlotTarget};
use uuid::Uuid;

const DRAFT: &str = "sites/s/content_images/background/bg.png";
const PUBLISHED_HINT: &str = "sites/s/content_images/background/published/bg.png";

/// Ready hero page whose background draft points at `DRAFT`.
async fn hero_with_background(engine: &ContentEngine, site_id: Uuid) -> Uuid {
    let page_id = engine
        .store
        .create_template_content(
            site_id,
            "content/hero.html",
            domains::models::TemplateCategory::Content,
            "Hero",
            EDITOR,
        )
        .await
        .unwrap()
        .page
        .id;
    let headline = SlotTarget::page(site_id, page_id, SlotCategory::Microcontent, "headline");
    engine
        .store
        .set_content(&headline, "en", "Welcome".to_string(), EDITOR)
        .await
        .unwrap();
    let background = SlotTarget::page(site_id, page_id, SlotCategory::Image, "background");
    engine
        .store
        .set_content(&background, "", DRAFT.to_string(), EDITOR)
        .await
        .unwrap();
    let ready = LocaleUpdate {
        title: None,
        translation_ready: Some(true),
    };
    engine.store.update_locale(page_id, "en", ready, EDITOR).await.unwrap();
    page_id
}

#[tokio::test]
async fn copy_is_retried_up_to_the_configured_attempts() {
    let mut files = MockFileStore::new();
    files
        .expect_copy()
        .with(eq(DRAFT), eq(PUBLISHED_HINT))
        .times(3)
        .returning(|_, _| Err(DomainError::FileOperation("disk full".to_string())));
    files.expect_delete().never();

    let settings = EngineSettings {
        file_copy_attempts: 3,
        ..EngineSettings::default()
    };
    let (engine, site) = engine_with_files(Arc::new(files), settings).await;
    let page_id = hero_with_background(&engine, site.id).await;

    let result = engine
        .publication
        .publish(page_id, PublishTarget::Language("en".into()))
        .await;
    tokio_test::assert_err!(&result);
    assert!(matches!(result, Err(DomainError::FileOperation(_))));
}

#[tokio::test]
async fn transient_copy_failure_is_absorbed() {
    let mut files = MockFileStore::new();
    let mut seq = Sequence::new();
    files
        .expect_copy()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Err(DomainError::FileOperation("busy".to_string())));
    files
        .expect_copy()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, hint| Ok(hint.to_string()));
    files.expect_delete().never();

    let (engine, site) = engine_with_files(Arc::new(files), EngineSettings::default()).await;
    let page_id = hero_with_background(&engine, site.id).await;

    let incomplete = engine
        .publication
        .publish(page_id, PublishTarget::Language("en".into()))
        .await;
    let incomplete = tokio_test::assert_ok!(incomplete);
    assert!(incomplete.is_empty());
}

#[tokio::test]
async fn refused_publish_touches_no_files() {
    let mut files = MockFileStore::new();
    files.expect_copy().never();
    files.expect_delete().never();

    let (engine, site) = engine_with_files(Arc::new(files), EngineSettings::default()).await;
    let page_id = hero_with_background(&engine, site.id).await;

    let incomplete = engine.publication.publish(page_id, PublishTarget::All).await.unwrap();
    assert_eq!(incomplete.len(), 1);
}
