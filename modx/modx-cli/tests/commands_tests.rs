//! Command layer against temp stores and a mock API

use modx_cli::{App, NewSite, SiteChanges, commands};
use modx_core::config::ModxConfig;
use modx_core::types::ContentType;
use modx_core::{MemoryNotifier, NotifyLevel, SiteStore};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app_in(dir: &TempDir) -> (App, Arc<MemoryNotifier>) {
    let mut config = ModxConfig::default();
    config.storage.sites_file = Some(dir.path().join("sites.json"));
    config.storage.credentials_file = Some(dir.path().join("credentials.toml"));
    let notifier = Arc::new(MemoryNotifier::new());
    let app = App::new(config, notifier.clone()).unwrap();
    (app, notifier)
}

async fn add_site(app: &App, name: &str, base_url: String, token: Option<&str>) {
    commands::sites_add(
        app,
        NewSite {
            name: name.to_string(),
            base_url,
            api_url: Some("api".to_string()),
            elements: None,
            token: token.map(str::to_string),
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_sites_add_stores_token_separately() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app_in(&dir);

    add_site(&app, "main", "https://example.com".to_string(), Some(" secret ")).await;

    let sites = commands::sites_list(&app).await.unwrap();
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].token_key.as_deref(), Some("modx.main"));
    assert_eq!(
        app.credentials.get("modx.main").await.unwrap().as_deref(),
        Some("secret")
    );

    let raw = std::fs::read_to_string(dir.path().join("sites.json")).unwrap();
    assert!(!raw.contains("secret"));
}

#[tokio::test]
async fn test_sites_add_rejects_duplicates() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app_in(&dir);

    add_site(&app, "main", "https://example.com".to_string(), None).await;
    let err = commands::sites_add(
        &app,
        NewSite {
            name: "main".to_string(),
            base_url: "https://other.test".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(format!("{:#}", err).contains("already exists"));
}

#[tokio::test]
async fn test_sites_edit_rename_moves_token() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app_in(&dir);
    add_site(&app, "old", "https://example.com".to_string(), Some("tok")).await;

    let site = commands::sites_edit(
        &app,
        "old",
        SiteChanges {
            name: Some("new".to_string()),
            elements: Some(vec![ContentType::Chunk]),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(site.token_key.as_deref(), Some("modx.new"));
    assert_eq!(site.enabled_types(), vec![ContentType::Chunk]);
    assert_eq!(app.credentials.get("modx.new").await.unwrap().as_deref(), Some("tok"));
    assert_eq!(app.credentials.get("modx.old").await.unwrap(), None);
    assert!(app.sites.find_site("old").await.unwrap().is_none());
}

#[tokio::test]
async fn test_sites_edit_empty_token_clears_it() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app_in(&dir);
    add_site(&app, "main", "https://example.com".to_string(), Some("tok")).await;

    let site = commands::sites_edit(
        &app,
        "main",
        SiteChanges {
            token: Some(String::new()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(site.token_key, None);
    assert_eq!(app.credentials.get("modx.main").await.unwrap(), None);
}

#[tokio::test]
async fn test_sites_remove_drops_token() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app_in(&dir);
    add_site(&app, "main", "https://example.com".to_string(), Some("tok")).await;

    commands::sites_remove(&app, "main").await.unwrap();
    assert!(commands::sites_list(&app).await.unwrap().is_empty());
    assert_eq!(app.credentials.get("modx.main").await.unwrap(), None);
    assert!(commands::sites_remove(&app, "main").await.is_err());
}

#[tokio::test]
async fn test_sites_ping_uses_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ping"))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (app, _) = app_in(&dir);
    add_site(&app, "main", server.uri(), Some("tok")).await;

    let (endpoint, status) = commands::sites_ping(&app, "main").await.unwrap();
    assert_eq!(endpoint, format!("{}/api/", server.uri()));
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_collect_tree_with_filter() {
    let server = MockServer::start().await;
    for content_type in ContentType::ALL {
        let data = match content_type {
            ContentType::Chunk => json!([{"id": 1, "name": "Header"}, {"id": 2, "name": "Footer"}]),
            _ => json!([]),
        };
        Mock::given(method("GET"))
            .and(path(format!("/api/{}", content_type.as_str())))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": data})),
            )
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let (app, _) = app_in(&dir);
    add_site(&app, "main", server.uri(), None).await;

    let tree = app.tree();
    tree.set_filter("head");
    let lines = commands::collect_tree(&tree, Some("main")).await.unwrap();

    let labels: Vec<_> = lines
        .iter()
        .map(|l| (l.depth, l.label.text.as_str()))
        .collect();
    assert_eq!(
        labels,
        [
            (0, "main"),
            (1, "Snippets"),
            (1, "Chunks"),
            (2, "Header"),
            (1, "Templates"),
            (1, "Plugins"),
        ]
    );
    assert_eq!(lines[3].label.highlight, Some(0..4));
    assert_eq!(
        lines[3].detail.as_deref(),
        Some("modx:/main/modChunk/1/Header.html")
    );

    assert!(commands::collect_tree(&tree, Some("missing")).await.is_err());
}

#[tokio::test]
async fn test_cat_and_write() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/modSnippet/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"id": 7, "name": "hello", "content": "<?php return 1;"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/modSnippet/7"))
        .and(body_json(json!({"name": "hello", "content": "<?php return 2;"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (app, _) = app_in(&dir);
    add_site(&app, "main", server.uri(), None).await;

    let uri = "modx:/main/modSnippet/7/hello.php";
    assert_eq!(commands::cat(&app, uri).await.unwrap(), b"<?php return 1;");
    commands::write(&app, uri, b"<?php return 2;").await.unwrap();
    assert_eq!(commands::stat(&app, uri).await.unwrap().size, 0);
}

#[tokio::test]
async fn test_write_rejected_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "Locked"
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (app, notifier) = app_in(&dir);
    add_site(&app, "main", server.uri(), None).await;

    let err = commands::write(&app, "modx:/main/modChunk/1/a.html", b"x")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Locked"));
    assert_eq!(
        notifier.messages_at(NotifyLevel::Warning),
        vec!["Failed to save a: Locked"]
    );
}

#[tokio::test]
async fn test_create_and_rename() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/modTemplate"))
        .and(body_json(json!({"name": "Landing"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"id": 12, "name": "Landing", "type": "modTemplate"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/modTemplate/12"))
        .and(body_json(json!({"name": "Start page"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (app, notifier) = app_in(&dir);
    add_site(&app, "main", server.uri(), None).await;

    let node = commands::create(&app, "main", ContentType::Template, "Landing")
        .await
        .unwrap();
    assert_eq!(node.uri(), "modx:/main/modTemplate/12/Landing.html");

    let renamed = commands::rename(&app, &node.uri(), "Start page").await.unwrap();
    assert_eq!(renamed, "modx:/main/modTemplate/12/Start%20page.html");
    assert_eq!(
        notifier.messages_at(NotifyLevel::Info),
        vec!["Landing renamed to Start page"]
    );

    assert!(
        commands::create(&app, "nowhere", ContentType::Chunk, "x")
            .await
            .is_err()
    );
}
