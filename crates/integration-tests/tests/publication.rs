use domains::content::SlotContent;
use domains::error::DomainError;
use domains::models::PublishTarget;
use domains::slots::SlotCategory;
use integration_tests::{Harness, EDITOR};

fn english() -> PublishTarget {
    PublishTarget::Language("en".to_string())
}

#[tokio::test]
async fn hero_page_publishes_its_headline() {
    let h = Harness::new().await;
    let page_id = h.ready_hero("Hero").await;

    let incomplete = h.engine.publication.publish(page_id, english()).await.unwrap();
    assert!(incomplete.is_empty(), "unexpected gaps: {incomplete:?}");

    let agg = h.load(page_id).await;
    let headline = agg.live_microcontents("headline")[0];
    assert_eq!(headline.get_content("en", false), Some("Welcome"));
    assert_eq!(agg.page.published_version, Some(1));
    assert!(agg.page.published_at.is_some());
    assert_eq!(agg.locale("en").unwrap().published_version, Some(1));
}

#[tokio::test]
async fn incomplete_language_blocks_the_whole_publish() {
    let h = Harness::new().await;
    let page_id = h.ready_hero("Hero").await;

    let incomplete = h.engine.publication.publish(page_id, PublishTarget::All).await.unwrap();
    assert_eq!(incomplete.len(), 1);
    assert!(incomplete[0].contains("'de'"));

    let agg = h.load(page_id).await;
    assert_eq!((agg.page.draft_version, agg.page.published_version), (1, None));
    assert!(agg.page.published_at.is_none());
    assert_eq!(agg.live_microcontents("headline")[0].get_content("en", false), None);
    assert_eq!(agg.locale("en").unwrap().published_version, None);

    let err = h.engine.publication.publish_checked(page_id, PublishTarget::All).await.unwrap_err();
    assert!(matches!(err, DomainError::IncompleteTranslation(ref messages) if messages.len() == 1));
}

#[tokio::test]
async fn all_languages_publish_once_each_is_complete() {
    let h = Harness::new().await;
    let page_id = h.ready_hero("Hero").await;
    h.engine.store.open_locale(page_id, "de", EDITOR).await.unwrap();
    h.set_text(page_id, "headline", "de", "Willkommen").await;
    h.mark_ready(page_id, "de").await;

    h.engine.publication.publish_checked(page_id, PublishTarget::All).await.unwrap();

    let agg = h.load(page_id).await;
    let headline = agg.live_microcontents("headline")[0];
    assert_eq!(headline.get_content("en", false), Some("Welcome"));
    assert_eq!(headline.get_content("de", false), Some("Willkommen"));
    assert!(agg.locales.iter().all(|l| l.published_version == Some(1)));
}

#[tokio::test]
async fn publishing_twice_advances_both_versions() {
    let h = Harness::new().await;
    let page_id = h.ready_hero("Hero").await;

    h.engine.publication.publish_checked(page_id, english()).await.unwrap();
    assert_eq!(h.versions(page_id).await, (1, Some(1)));

    h.engine.publication.publish_checked(page_id, english()).await.unwrap();
    assert_eq!(h.versions(page_id).await, (2, Some(2)));
}

#[tokio::test]
async fn draft_edits_stay_invisible_until_republished() {
    let h = Harness::new().await;
    let page_id = h.ready_hero("Hero").await;
    h.engine.publication.publish_checked(page_id, english()).await.unwrap();

    h.set_text(page_id, "headline", "en", "Hello again").await;
    assert_eq!(h.versions(page_id).await, (2, Some(1)));
    // Further edits do not move the draft again.
    h.set_text(page_id, "headline", "en", "Hello once more").await;
    assert_eq!(h.versions(page_id).await, (2, Some(1)));

    let agg = h.load(page_id).await;
    let headline = agg.live_microcontents("headline")[0];
    assert_eq!(headline.get_content("en", false), Some("Welcome"));
    assert_eq!(headline.get_content("en", true), Some("Hello once more"));

    // The locale was marked ready before the draft moved on.
    let incomplete = h.engine.publication.publish(page_id, english()).await.unwrap();
    assert_eq!(incomplete.len(), 1);

    h.mark_ready(page_id, "en").await;
    h.engine.publication.publish_checked(page_id, english()).await.unwrap();
    assert_eq!(h.versions(page_id).await, (2, Some(2)));
    let agg = h.load(page_id).await;
    assert_eq!(
        agg.live_microcontents("headline")[0].get_content("en", false),
        Some("Hello once more")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_publishes_and_edits_apply_one_after_another() {
    let h = Harness::new().await;
    let page_id = h.ready_hero("Hero").await;
    let headline = h.slot(page_id, SlotCategory::Microcontent, "headline");

    let (first, second, edit) = tokio::join!(
        h.engine.publication.publish(page_id, english()),
        h.engine.publication.publish(page_id, english()),
        h.engine.store.set_content(&headline, "en", "Edited".to_string(), EDITOR),
    );
    edit.unwrap();
    let published = [first.unwrap(), second.unwrap()]
        .iter()
        .filter(|messages| messages.is_empty())
        .count() as i32;

    // publish, publish, edit: (3, 2); publish, edit, publish: (2, 1);
    // edit, publish, publish: (2, 2).
    let versions = h.versions(page_id).await;
    assert!(
        matches!(versions, (3, Some(2)) | (2, Some(1)) | (2, Some(2))),
        "{versions:?}"
    );
    assert_eq!(versions.1, Some(published));

    let agg = h.load(page_id).await;
    assert_eq!(agg.live_microcontents("headline")[0].get_content("en", true), Some("Edited"));
}

#[tokio::test]
async fn image_copies_are_made_on_publish() {
    let h = Harness::new().await;
    let page_id = h.ready_hero("Hero").await;
    let background = h.slot(page_id, SlotCategory::Image, "background");
    h.engine
        .store
        .upload_image(&background, "bg.png", b"first".to_vec(), EDITOR)
        .await
        .unwrap();
    assert_eq!(h.files.paths().len(), 1);

    h.engine.publication.publish_checked(page_id, english()).await.unwrap();

    let agg = h.load(page_id).await;
    let image = agg.live_images("background")[0];
    let published = image.published_content.clone().expect("published copy");
    assert_ne!(published, image.draft_content);
    assert!(published.contains("/published/"));
    assert_eq!(h.files.read(&published), Some(b"first".to_vec()));
    assert_eq!(h.files.paths().len(), 2);
}

#[tokio::test]
async fn replaced_images_leave_no_files_behind() {
    let h = Harness::new().await;
    let page_id = h.ready_hero("Hero").await;
    let background = h.slot(page_id, SlotCategory::Image, "background");
    h.engine
        .store
        .upload_image(&background, "bg.png", b"first".to_vec(), EDITOR)
        .await
        .unwrap();
    h.engine.publication.publish_checked(page_id, english()).await.unwrap();

    let second = h
        .engine
        .store
        .upload_image(&background, "bg.png", b"second".to_vec(), EDITOR)
        .await
        .unwrap();
    // Single slot: the upload replaced the draft of the same value.
    assert_eq!(h.load(page_id).await.live_images("background").len(), 1);
    assert_eq!(h.load(page_id).await.live_images("background")[0].item.id, second);

    h.mark_ready(page_id, "en").await;
    h.engine.publication.publish_checked(page_id, english()).await.unwrap();

    let agg = h.load(page_id).await;
    let image = agg.live_images("background")[0];
    let published = image.published_content.clone().unwrap();
    let mut expected = vec![image.draft_content.clone(), published.clone()];
    expected.sort();
    assert_eq!(h.files.paths(), expected);
    assert_eq!(h.files.read(&published), Some(b"second".to_vec()));
}

#[tokio::test]
async fn failed_copy_leaves_the_page_untouched() {
    let h = Harness::new().await;
    let page_id = h.ready_hero("Hero").await;
    let background = h.slot(page_id, SlotCategory::Image, "background");
    h.engine
        .store
        .upload_image(&background, "bg.png", b"png".to_vec(), EDITOR)
        .await
        .unwrap();
    let before = h.load(page_id).await;

    h.files.set_fail_copies(true);
    let err = h.engine.publication.publish(page_id, english()).await.unwrap_err();
    assert!(matches!(err, DomainError::FileOperation(_)));

    assert_eq!(h.load(page_id).await, before);
    assert_eq!(h.files.paths().len(), 1);

    h.files.set_fail_copies(false);
    h.engine.publication.publish_checked(page_id, english()).await.unwrap();
    assert_eq!(h.versions(page_id).await, (1, Some(1)));
}

#[tokio::test]
async fn failed_commit_discards_staged_copies() {
    let h = Harness::new().await;
    let page_id = h.ready_hero("Hero").await;
    let background = h.slot(page_id, SlotCategory::Image, "background");
    h.engine
        .store
        .upload_image(&background, "bg.png", b"png".to_vec(), EDITOR)
        .await
        .unwrap();
    let before = h.load(page_id).await;

    h.repo.fail_next_commit();
    assert!(h.engine.publication.publish(page_id, english()).await.is_err());

    assert_eq!(h.load(page_id).await, before);
    assert_eq!(h.files.paths().len(), 1, "the staged copy must be removed");
}

#[tokio::test]
async fn unknown_page_is_reported() {
    let h = Harness::new().await;
    let err = h
        .engine
        .publication
        .publish(uuid::Uuid::now_v7(), PublishTarget::All)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound("TemplateContent", _)));
}
