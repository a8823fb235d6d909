//! Integration tests for editor crate

use std::sync::Arc;

use weblounge_editor::model::{codec, Composer, LocaleVariant, PageDocument, Pagelet, ResourceVersion, User};
use weblounge_editor::{
    EditSession, EditorError, MemoryRepository, Page, PageGateway, PageKey, PageQuery, PageState,
    PublishWindow, SessionOptions,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn localized(id: &str, language: &str, title: &str) -> Pagelet {
    let mut pagelet = Pagelet::new("text", id);
    let mut variant = LocaleVariant::new(language);
    variant.original = true;
    variant.text.insert("title".into(), vec![title.into()]);
    pagelet.locale.upsert(variant);
    pagelet.set_property("level", vec!["2".into()]);
    pagelet
}

fn live_only() -> MemoryRepository {
    let repository = MemoryRepository::new();
    repository.insert_page(
        PageDocument::new("home", ResourceVersion::Live)
            .with_path("/")
            .with_composer(Composer {
                id: "main".into(),
                pagelets: vec![localized("welcome", "de", "Willkommen")],
            }),
    );
    repository
}

#[tokio::test]
async fn test_load_falls_back_to_live() {
    init_tracing();
    let repository = live_only();
    let amelie = User::new("amelie");
    let gateway = repository.connect(amelie.clone());

    let page = Page::load(&gateway, &PageKey::path("/"), None).await.unwrap();
    assert_eq!(page.document().version, ResourceVersion::Live);
    assert!(page.is_work_missing());
    assert_eq!(page.state_for(&amelie), PageState::NoWorkVersion);

    let page = Page::load(&gateway, &PageKey::id("home"), Some(ResourceVersion::Live))
        .await
        .unwrap();
    assert_eq!(page.state_for(&amelie), PageState::Live);

    let err = Page::load(&gateway, &PageKey::path("/missing"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EditorError::NotFound));
}

#[tokio::test]
async fn test_lock_creates_work_version() {
    init_tracing();
    let repository = live_only();
    let amelie = User::new("amelie");
    let gateway = Arc::new(repository.connect(amelie.clone()));

    let mut session = EditSession::open(
        gateway,
        amelie,
        &PageKey::path("/"),
        SessionOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(session.state(), PageState::NoWorkVersion);

    session.lock().await.unwrap();
    assert_eq!(session.state(), PageState::WorkLockedSelf);
    assert!(session.document().is_work_version());
    assert_eq!(session.document().composer("main").unwrap().len(), 1);
    assert_eq!(
        repository.lock_holder("home").map(|u| u.id),
        Some("amelie".to_string())
    );

    session.unlock().await.unwrap();
    assert_eq!(session.state(), PageState::WorkUnlocked);
    assert!(repository.lock_holder("home").is_none());
}

#[tokio::test]
async fn test_edit_publish_cycle() {
    init_tracing();
    let repository = live_only();
    let amelie = User::new("amelie");
    let gateway = Arc::new(repository.connect(amelie.clone()));
    let mut session = EditSession::open(
        gateway.clone(),
        amelie,
        &PageKey::path("/"),
        SessionOptions::default(),
    )
    .await
    .unwrap();
    session.lock().await.unwrap();

    session
        .insert_pagelet(localized("news", "de", "Neuigkeiten"), "main", 1)
        .await
        .unwrap();
    assert_eq!(repository.write_count("home"), 1);

    let pending = gateway.search_pages(&PageQuery::pending()).await.unwrap();
    assert_eq!(pending.len(), 1);

    session.publish(&PublishWindow::now()).await.unwrap();
    let live = repository.page("home", ResourceVersion::Live).unwrap();
    assert_eq!(live.composer("main").unwrap().len(), 2);
    assert!(gateway
        .search_pages(&PageQuery::pending())
        .await
        .unwrap()
        .is_empty());

    // The work version stays editable after publishing
    assert_eq!(session.state(), PageState::WorkLockedSelf);
    session.delete_pagelet("main", 0).await.unwrap();

    session.unpublish().await.unwrap();
    assert!(repository.page("home", ResourceVersion::Live).is_none());
}

#[tokio::test]
async fn test_publish_with_invalid_references() {
    let repository = live_only();
    let amelie = User::new("amelie");
    let gateway = Arc::new(repository.connect(amelie.clone()));
    let mut session = EditSession::open(
        gateway,
        amelie,
        &PageKey::path("/"),
        SessionOptions::default(),
    )
    .await
    .unwrap();
    session.lock().await.unwrap();
    repository.mark_invalid("home");

    let err = session.publish(&PublishWindow::now()).await.unwrap_err();
    match err {
        EditorError::Validation(message) => assert!(message.contains("no longer validate")),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(session.state(), PageState::WorkLockedSelf);
}

#[tokio::test]
async fn test_unlock_failure_keeps_local_unlock() {
    let repository = live_only();
    let amelie = User::new("amelie").with_name("Amélie");
    let bob = User::new("bob");

    let a = repository.connect(amelie.clone());
    let mut page = Page::load(&a, &PageKey::id("home"), None).await.unwrap();
    page.lock(&a, &amelie).await.unwrap();

    let b = repository.connect(bob.clone());
    let mut foreign = Page::load(&b, &PageKey::id("home"), None).await.unwrap();
    let err = foreign.unlock(&b).await.unwrap_err();
    assert!(matches!(err, EditorError::LockConflict { ref owner } if owner == "Amélie"));
    assert_eq!(foreign.state_for(&bob), PageState::WorkUnlocked);
    assert!(repository.lock_holder("home").is_some());
}

#[tokio::test]
async fn test_create_reload_and_delete() {
    let repository = MemoryRepository::new();
    let amelie = User::new("amelie");
    let gateway = repository.connect(amelie.clone());

    let template = PageDocument::new("ignored", ResourceVersion::Work).with_composer(Composer::new("main"));
    let mut page = Page::create(&gateway, "/team", Some(&template)).await.unwrap();
    assert_ne!(page.id(), "ignored");
    assert_eq!(page.document().path.as_deref(), Some("/team"));
    assert_eq!(page.document().created.as_ref().unwrap().user.id, "amelie");

    let err = Page::create(&gateway, "/team", None).await.unwrap_err();
    assert!(matches!(err, EditorError::Transport(_)));

    page.lock(&gateway, &amelie).await.unwrap();
    page.create_composer("aside");
    page.reload(&gateway).await.unwrap();
    assert!(page.composer("aside").is_none());

    let id = page.id().to_string();
    page.delete(&gateway).await.unwrap();
    assert!(repository.page(&id, ResourceVersion::Work).is_none());
}

#[tokio::test]
async fn test_referrers() {
    let repository = live_only();
    let mut link = Pagelet::new("link", "internal");
    link.set_property("target", vec!["home".into()]);
    repository.insert_page(
        PageDocument::new("imprint", ResourceVersion::Live)
            .with_path("/imprint")
            .with_composer(Composer {
                id: "footer".into(),
                pagelets: vec![link],
            }),
    );

    let gateway = repository.connect(User::new("amelie"));
    let page = Page::load(&gateway, &PageKey::id("home"), None).await.unwrap();
    let referrers = page.referrers(&gateway).await.unwrap();
    assert_eq!(referrers.len(), 1);
    assert_eq!(referrers[0].id, "imprint");
}

#[tokio::test]
async fn test_order_survives_write_and_codec() {
    let repository = live_only();
    let amelie = User::new("amelie");
    let gateway = Arc::new(repository.connect(amelie.clone()));
    let mut session = EditSession::open(
        gateway.clone(),
        amelie,
        &PageKey::id("home"),
        SessionOptions::default(),
    )
    .await
    .unwrap();
    session.lock().await.unwrap();

    let pagelets = vec![
        localized("c", "en", "Third"),
        localized("a", "de", "Erster"),
        localized("b", "fr", "Deuxième"),
    ];
    session.update_composer("main", pagelets.clone()).await.unwrap();

    let reloaded = gateway
        .fetch_page(&PageKey::id("home"), ResourceVersion::Work)
        .await
        .unwrap();
    assert_eq!(reloaded.composer("main").unwrap().pagelets, pagelets);

    let xml = codec::encode_page(&reloaded).unwrap();
    let decoded = codec::decode_page(&xml).unwrap().unwrap();
    assert_eq!(decoded.composer("main").unwrap().pagelets, pagelets);
    assert!(!xml.contains("current"));
}
