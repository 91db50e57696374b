//! Quantified invariants (P1-P8) and boundary behaviors from the testable
//! properties list, driven against the assembled service.

use crate::helpers::test_service;
use axum::extract::State;
use axum::Json;
use vikingfs_context::domain::error::ErrorCode;
use vikingfs_context::domain::uri::VikingUri;
use vikingfs_context::server::handlers::pack;

/// P1: a finalized node and its parent both stat successfully.
#[tokio::test]
async fn p1_finalized_node_and_parent_both_stat() {
    let (service, _dir) = test_service().await;
    let uri = VikingUri::parse("viking://resources/docs/readme").unwrap();
    service.vfs.write_context(&uri, Some(b"hello"), "short", "long", true).await.unwrap();

    assert!(service.vfs.stat(&uri).await.is_ok());
    let parent = uri.parent().unwrap();
    assert!(service.vfs.stat(&parent).await.is_ok());
}

/// P2: a second ingest with a colliding name resolves to a distinct URI.
#[tokio::test]
async fn p2_colliding_names_resolve_to_distinct_uris() {
    let (service, _dir) = test_service().await;
    let base = VikingUri::parse("viking://resources/docs/dup").unwrap();
    service.vfs.write_context(&base, Some(b"1"), "a", "", true).await.unwrap();

    let resolved = service.vfs.resolve_unique_uri(&base).await.unwrap();
    assert_ne!(resolved.as_str(), base.as_str());
}

/// P4: a successful `mv` leaves the source gone and the destination present.
#[tokio::test]
async fn p4_mv_moves_source_to_destination() {
    let (service, _dir) = test_service().await;
    let src = VikingUri::parse("viking://resources/docs/src").unwrap();
    let dst = VikingUri::parse("viking://resources/docs/dst").unwrap();
    service.vfs.write_context(&src, Some(b"body"), "a", "", true).await.unwrap();

    service.vfs.mv(&src, &dst).await.unwrap();

    let src_err = service.vfs.stat(&src).await.unwrap_err();
    assert_eq!(src_err.code(), ErrorCode::NotFound);
    assert!(service.vfs.stat(&dst).await.is_ok());
}

/// P5: a successful recursive `rm` leaves the subtree unfindable.
#[tokio::test]
async fn p5_rm_recursive_removes_the_whole_subtree() {
    let (service, _dir) = test_service().await;
    let dir = VikingUri::parse("viking://resources/docs").unwrap();
    let child = dir.child("child");
    service.vfs.write_context(&child, Some(b"x"), "a", "", true).await.unwrap();

    service.vfs.rm(&dir, true).await.unwrap();
    let err = service.vfs.stat(&dir).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    let found = service.search.find("x", Some(dir.as_str()), 10, None, None).await.unwrap();
    assert_eq!(found.total, 0);
}

/// P6: appended messages come back in order with the exact count.
#[tokio::test]
async fn p6_appended_messages_round_trip_in_order() {
    use vikingfs_context::domain::types::{Message, MessagePart, Role};

    let (service, _dir) = test_service().await;
    for i in 0..3 {
        let msg = Message::new(Role::User, vec![MessagePart::Text { text: format!("turn {i}") }]);
        service.sessions.append("sess-order", &msg).await.unwrap();
    }

    let messages = service.sessions.messages("sess-order").await.unwrap();
    assert_eq!(messages.len(), 3);
    for (i, msg) in messages.iter().enumerate() {
        assert_eq!(msg.text_content(), format!("turn {i}"));
    }
}

/// P7: `wait_processed` drains to zero pending, and returns immediately
/// again on an already-idle queue.
#[tokio::test]
async fn p7_wait_complete_drains_and_is_idempotent() {
    let (service, _dir) = test_service().await;
    let uri = VikingUri::parse("viking://resources/docs/note").unwrap();
    service.vfs.write_context(&uri, Some(b"body"), "abstract text", "", true).await.unwrap();
    service
        .queues
        .embedding
        .push(vikingfs_context::queue::EmbeddingJob { uri: uri.as_str().to_string(), text: "abstract text".to_string() })
        .await
        .unwrap();

    service.close().await.unwrap();
    let snapshot = service.queues.snapshot().await;
    assert!(snapshot.iter().all(|s| s.pending == 0 && s.in_flight == 0));

    // Idle queue: a second wait returns without hanging.
    service.close().await.unwrap();
}

/// R3: `link` then `unlink` round-trips `relations`.
#[tokio::test]
async fn r3_link_then_unlink_round_trips_relations() {
    let (service, _dir) = test_service().await;
    let a = VikingUri::parse("viking://resources/docs/a").unwrap();
    let b = VikingUri::parse("viking://resources/docs/b").unwrap();
    service.vfs.write_context(&a, Some(b"a"), "a", "", true).await.unwrap();
    service.vfs.write_context(&b, Some(b"b"), "b", "", true).await.unwrap();

    service.vfs.link(&a, &[b.clone()], "references").await.unwrap();
    let relations = service.vfs.relations(&a).await.unwrap();
    assert!(relations.iter().any(|r| r.uri == b.as_str()));

    service.vfs.unlink(&a, &b).await.unwrap();
    let relations = service.vfs.relations(&a).await.unwrap();
    assert!(!relations.iter().any(|r| r.uri == b.as_str()));
}

/// Boundary: an invalid URI is rejected with `INVALID_URI`.
#[tokio::test]
async fn boundary_invalid_uri_is_rejected() {
    let err = VikingUri::parse("not-a-viking-uri").unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidUri);
}

/// Boundary: `rm` on a non-empty directory without `recursive` fails
/// precondition.
#[tokio::test]
async fn boundary_rm_non_empty_without_recursive_fails_precondition() {
    let (service, _dir) = test_service().await;
    let dir = VikingUri::parse("viking://resources/docs").unwrap();
    let child = dir.child("child");
    service.vfs.write_context(&child, Some(b"x"), "a", "", true).await.unwrap();

    let err = service.vfs.rm(&dir, false).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::FailedPrecondition);
}

/// P8: two concurrent `mkdir(u, exist_ok=true)` both succeed, and exactly
/// one directory exists at the backend afterward.
#[tokio::test]
async fn p8_concurrent_mkdir_exist_ok_both_succeed() {
    let (service, _dir) = test_service().await;
    let uri = VikingUri::parse("viking://resources/docs/concurrent").unwrap();

    let vfs_a = service.vfs.clone();
    let vfs_b = service.vfs.clone();
    let uri_a = uri.clone();
    let uri_b = uri.clone();

    let (a, b) = tokio::join!(tokio::spawn(async move { vfs_a.mkdir(&uri_a, true).await }), tokio::spawn(async move {
        vfs_b.mkdir(&uri_b, true).await
    }));
    a.unwrap().unwrap();
    b.unwrap().unwrap();

    assert!(service.vfs.stat(&uri).await.is_ok());
}

/// R1: `export` then `import` round-trips the same node set (by relative
/// path) with byte-equal content.
#[tokio::test]
async fn r1_export_then_import_round_trips_the_subtree() {
    let (service, dir) = test_service().await;
    let root = VikingUri::parse("viking://resources/docs").unwrap();
    let a = root.child("a");
    let b = root.child("b");
    service.vfs.write_context(&a, Some(b"content a"), "abstract a", "", true).await.unwrap();
    service.vfs.write_context(&b, Some(b"content b"), "abstract b", "", true).await.unwrap();

    let pack_path = dir.path().join("docs.ovpack").to_string_lossy().into_owned();
    let export_req = pack::ExportRequest { uri: root.as_str().to_string(), to: pack_path.clone() };
    let export_resp = pack::export(State(service.clone()), Json(export_req)).await.unwrap().0.result.unwrap();
    assert_eq!(export_resp.node_count, 3);

    let import_req = pack::ImportRequest { file_path: pack_path, parent: "viking://resources/restored".to_string(), force: false, vectorize: false };
    let import_resp = pack::import(State(service.clone()), Json(import_req)).await.unwrap().0.result.unwrap();
    assert_eq!(import_resp.node_count, 3);

    let restored_root = VikingUri::parse(&import_resp.root_uri).unwrap();
    let restored_a = service.vfs.read(&restored_root.child("a")).await.unwrap();
    let restored_b = service.vfs.read(&restored_root.child("b")).await.unwrap();
    assert_eq!(restored_a, b"content a");
    assert_eq!(restored_b, b"content b");
}

/// Boundary: `mv` onto an existing destination fails with `ALREADY_EXISTS`.
#[tokio::test]
async fn boundary_mv_to_existing_destination_fails_already_exists() {
    let (service, _dir) = test_service().await;
    let src = VikingUri::parse("viking://resources/docs/src").unwrap();
    let dst = VikingUri::parse("viking://resources/docs/dst").unwrap();
    service.vfs.write_context(&src, Some(b"a"), "a", "", true).await.unwrap();
    service.vfs.write_context(&dst, Some(b"b"), "b", "", true).await.unwrap();

    let err = service.vfs.mv(&src, &dst).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::AlreadyExists);
}
