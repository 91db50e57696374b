//! The numbered end-to-end seed scenarios.

use crate::helpers::test_service;
use axum::extract::{Query, State};
use axum::Json;
use vikingfs_context::server::handlers::{content, fs, resources, search, sessions};
use vikingfs_context::server::handlers::resources::AddResourceRequest;

#[tokio::test]
async fn ingest_a_markdown_file_and_find_it() {
    let (service, dir) = test_service().await;
    let path = dir.path().join("sample.md");
    tokio::fs::write(&path, "# Sample Document\n\n## Introduction\nThis is a sample markdown document for testing.\n")
        .await
        .unwrap();

    let req = AddResourceRequest {
        path: path.to_string_lossy().into_owned(),
        target: None,
        reason: String::new(),
        instruction: String::new(),
        wait: true,
        timeout: None,
    };
    let resp = resources::add_resource(State(service.clone()), Json(req)).await.unwrap().0.result.unwrap();
    assert!(resp.root_uri.starts_with("viking://resources/"));
    assert!(resp.queue_drained);

    let find_req = search::FindRequest { query: "sample document".to_string(), target_uri: None, limit: 10, score_threshold: None };
    let found = search::find(State(service), Json(find_req)).await.unwrap().0.result.unwrap();
    assert!(found.total >= 1);
    assert!(found.resources.iter().any(|r| r.score > 0.0));
}

#[tokio::test]
async fn name_collision_resolution_appends_numeric_suffix() {
    let (service, dir) = test_service().await;
    let path = dir.path().join("sample.md");
    tokio::fs::write(&path, "# Sample Document\n\nDuplicate ingestion test.\n").await.unwrap();

    let make_req = || AddResourceRequest {
        path: path.to_string_lossy().into_owned(),
        target: None,
        reason: String::new(),
        instruction: String::new(),
        wait: false,
        timeout: None,
    };

    let first = resources::add_resource(State(service.clone()), Json(make_req())).await.unwrap().0.result.unwrap();
    let second = resources::add_resource(State(service.clone()), Json(make_req())).await.unwrap().0.result.unwrap();

    assert_ne!(first.root_uri, second.root_uri);
    assert_eq!(second.root_uri, format!("{}_1", first.root_uri));
}

#[tokio::test]
async fn directory_ingest_skips_an_oversized_file_but_keeps_the_rest() {
    let (service, dir) = test_service().await;
    let source = dir.path().join("incoming");
    tokio::fs::create_dir_all(&source).await.unwrap();
    tokio::fs::write(source.join("notes.md"), "# Notes\n\nValid content.\n").await.unwrap();
    // 10 MiB cap: write one byte over it so the walker records a warning and
    // skips the file rather than aborting the whole ingest.
    let oversized = vec![0u8; 10 * 1024 * 1024 + 1];
    tokio::fs::write(source.join("huge.bin"), &oversized).await.unwrap();

    let req = AddResourceRequest {
        path: source.to_string_lossy().into_owned(),
        target: None,
        reason: String::new(),
        instruction: String::new(),
        wait: true,
        timeout: None,
    };
    let resp = resources::add_resource(State(service.clone()), Json(req)).await.unwrap().0.result.unwrap();
    assert!(resp.warnings.iter().any(|w| w.contains("huge.bin")));

    let ls_query = fs::LsQuery { uri: resp.root_uri.clone(), simple: false, recursive: false, output: None, abs_limit: 256, show_all_hidden: false, node_limit: None };
    let entries = fs::ls(State(service), Query(ls_query)).await.unwrap().0.result.unwrap();
    // URI segments are sanitized on write, so the listed name is "notes_md",
    // not the original "notes.md".
    assert!(entries.iter().any(|e| e.name == "notes_md"));
    assert!(!entries.iter().any(|e| e.name.starts_with("huge")));
}

#[tokio::test]
async fn grep_finds_a_case_insensitive_match() {
    let (service, dir) = test_service().await;
    let path = dir.path().join("sample.md");
    tokio::fs::write(&path, "# Sample Document\n\nThis is a sample markdown document for testing.\n").await.unwrap();

    let req = AddResourceRequest {
        path: path.to_string_lossy().into_owned(),
        target: None,
        reason: String::new(),
        instruction: String::new(),
        wait: true,
        timeout: None,
    };
    let resp = resources::add_resource(State(service.clone()), Json(req)).await.unwrap().0.result.unwrap();

    let grep_req = search::GrepRequest { uri: resp.root_uri, pattern: "SAMPLE".to_string(), case_insensitive: true, node_limit: None };
    let result = search::grep(State(service), Json(grep_req)).await.unwrap().0.result.unwrap();
    assert!(result.count >= 1);
    assert!(result.matches.iter().any(|m| m.text.to_lowercase().contains("sample")));
}

#[tokio::test]
async fn session_commit_archives_the_log_and_keeps_the_session_listed() {
    let (service, _dir) = test_service().await;
    let session_id = "sess-1";

    let user_turn = sessions::AppendMessageRequest { role: vikingfs_context::domain::types::Role::User, content: "hello".to_string() };
    sessions::append_message(State(service.clone()), axum::extract::Path(session_id.to_string()), Json(user_turn)).await.unwrap();
    let assistant_turn =
        sessions::AppendMessageRequest { role: vikingfs_context::domain::types::Role::Assistant, content: "hi there".to_string() };
    sessions::append_message(State(service.clone()), axum::extract::Path(session_id.to_string()), Json(assistant_turn)).await.unwrap();

    let outcome = sessions::commit(State(service.clone()), axum::extract::Path(session_id.to_string())).await.unwrap().0.result.unwrap();
    assert_eq!(outcome.status, "committed");
    assert!(outcome.archived);

    let messages = sessions::get(State(service.clone()), axum::extract::Path(session_id.to_string())).await.unwrap().0.result.unwrap();
    assert!(messages.is_empty());

    let list = sessions::list(State(service)).await.unwrap().0.result.unwrap();
    assert!(list.contains(&session_id.to_string()));
}

#[tokio::test]
async fn content_read_returns_written_bytes() {
    let (service, dir) = test_service().await;
    let path = dir.path().join("sample.md");
    tokio::fs::write(&path, "# Sample Document\n\nBody text.\n").await.unwrap();

    let req = AddResourceRequest {
        path: path.to_string_lossy().into_owned(),
        target: None,
        reason: String::new(),
        instruction: String::new(),
        wait: false,
        timeout: None,
    };
    let resp = resources::add_resource(State(service.clone()), Json(req)).await.unwrap().0.result.unwrap();

    // The root node of a markdown parse is a directory-like container; the
    // heading becomes its sole leaf child, which is where the content lives.
    let ls_query = fs::LsQuery { uri: resp.root_uri.clone(), simple: false, recursive: false, output: None, abs_limit: 256, show_all_hidden: false, node_limit: None };
    let entries = fs::ls(State(service.clone()), Query(ls_query)).await.unwrap().0.result.unwrap();
    let leaf_uri = entries.first().expect("markdown heading produced a child node").uri.clone();

    let read_result = content::read(State(service), Query(content::UriQuery { uri: leaf_uri.clone() })).await.unwrap().0.result.unwrap();
    assert_eq!(read_result.uri, leaf_uri);
    assert!(read_result.content.contains("Body text."));
}
