mod common;

use common::*;
use std::sync::Arc;

use nuclear_cert_portal::domain::upload::gateway::{
    MSG_BAD_CONTENT_TYPE, MSG_CLIENT_INIT, MSG_NO_FILE, MSG_TOO_LARGE, MSG_UPLOAD_FAILED,
};
use nuclear_cert_portal::domain::upload::{UploadGateway, MAX_UPLOAD_BYTES};
use nuclear_cert_portal::infra::storage::memory::content_id;
use nuclear_cert_portal::infra::storage::{AccountId, MemoryStorage, SpaceId, StorageNetwork};

fn leftover_files(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[tokio::test]
async fn upload_returns_content_identifier_and_cleans_up() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = Arc::new(MemoryStorage::new());
    let router = app(
        Arc::new(FakeLedger::new()),
        storage.clone(),
        &config(Some(SALT), Some(EMAIL), tmp.path()),
    );

    let (status, body) = send(router, multipart_post("/upload", "file", b"weld inspection")).await;
    assert_eq!(status, 200);
    let cid = body["cid"].as_str().unwrap().to_string();
    assert_eq!(cid, content_id(b"weld inspection"));
    assert_eq!(storage.blob(&cid).unwrap(), b"weld inspection");
    assert_eq!(storage.spaces_created(), 1);
    assert_eq!(leftover_files(tmp.path()), 0);
}

#[tokio::test]
async fn ten_mebibytes_is_accepted_one_more_byte_is_not() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = Arc::new(MemoryStorage::new());
    let router = app(
        Arc::new(FakeLedger::new()),
        storage.clone(),
        &config(Some(SALT), Some(EMAIL), tmp.path()),
    );

    let exact = vec![7u8; MAX_UPLOAD_BYTES as usize];
    let (status, _) = send(router.clone(), multipart_post("/upload", "file", &exact)).await;
    assert_eq!(status, 200);

    let over = vec![7u8; MAX_UPLOAD_BYTES as usize + 1];
    let (status, body) = send(router, multipart_post("/upload", "file", &over)).await;
    assert_eq!(status, 413);
    assert_eq!(body["error"], MSG_TOO_LARGE);
    assert!(storage.blob(&content_id(&over)).is_none());
    assert_eq!(leftover_files(tmp.path()), 0);
}

#[tokio::test]
async fn oversized_extra_field_hits_the_request_limit() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = Arc::new(MemoryStorage::new());
    let router = app(
        Arc::new(FakeLedger::new()),
        storage.clone(),
        &config(Some(SALT), Some(EMAIL), tmp.path()),
    );

    let junk = vec![0u8; MAX_UPLOAD_BYTES as usize + 1024 * 1024];
    let request = multipart_fields("/upload", &[("junk", junk.as_slice()), ("file", &b"hello"[..])]);
    let (status, body) = send(router, request).await;
    assert_eq!(status, 413);
    assert_eq!(body["error"], MSG_TOO_LARGE);
    assert!(storage.blob(&content_id(b"hello")).is_none());
    assert_eq!(storage.spaces_created(), 0);
    assert_eq!(leftover_files(tmp.path()), 0);
}

#[tokio::test]
async fn small_extra_fields_are_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    let router = app(
        Arc::new(FakeLedger::new()),
        Arc::new(MemoryStorage::new()),
        &config(Some(SALT), Some(EMAIL), tmp.path()),
    );

    let request = multipart_fields("/upload", &[("note", &b"pump 3"[..]), ("file", &b"hello"[..])]);
    let (status, body) = send(router, request).await;
    assert_eq!(status, 200);
    assert_eq!(body["cid"], content_id(b"hello"));
}

#[tokio::test]
async fn missing_file_field_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let router = app(
        Arc::new(FakeLedger::new()),
        Arc::new(MemoryStorage::new()),
        &config(Some(SALT), Some(EMAIL), tmp.path()),
    );
    let (status, body) = send(router, multipart_post("/upload", "attachment", b"x")).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], MSG_NO_FILE);
    assert_eq!(leftover_files(tmp.path()), 0);
}

#[tokio::test]
async fn non_multipart_body_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let router = app(
        Arc::new(FakeLedger::new()),
        Arc::new(MemoryStorage::new()),
        &config(Some(SALT), Some(EMAIL), tmp.path()),
    );
    let (status, body) = send(router, json_post("/upload", serde_json::json!({ "file": "x" }))).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], MSG_BAD_CONTENT_TYPE);
}

#[tokio::test]
async fn missing_login_email_is_a_configuration_error() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = Arc::new(MemoryStorage::new());
    let router = app(
        Arc::new(FakeLedger::new()),
        storage.clone(),
        &config(Some(SALT), None, tmp.path()),
    );
    let (status, body) = send(router, multipart_post("/upload", "file", b"x")).await;
    assert_eq!(status, 500);
    assert_eq!(
        body["error"],
        "Server configuration error: Storage login email missing."
    );
    assert_eq!(storage.spaces_created(), 0);
}

#[tokio::test]
async fn unverified_account_message_names_the_email() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = Arc::new(MemoryStorage::new().with_login_error("Account not verified"));
    let router = app(
        Arc::new(FakeLedger::new()),
        storage.clone(),
        &config(Some(SALT), Some(EMAIL), tmp.path()),
    );
    let (status, body) = send(router, multipart_post("/upload", "file", b"x")).await;
    assert_eq!(status, 500);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains(EMAIL), "{}", message);
    assert_ne!(message, MSG_UPLOAD_FAILED);
    assert!(body["details"].as_str().unwrap().contains("Account not verified"));
    assert_eq!(leftover_files(tmp.path()), 0);
}

#[tokio::test]
async fn other_space_setup_failures_get_a_generic_message() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = Arc::new(MemoryStorage::new().with_login_error("rate limited"));
    let gateway = UploadGateway::new(storage, Some(EMAIL.into()), tmp.path().to_path_buf());
    let err = gateway.upload_bytes(b"x").await.unwrap_err();
    assert_eq!(err.to_string(), MSG_CLIENT_INIT);
    assert!(gateway.bootstrap().cached().await.is_none());
}

#[tokio::test]
async fn upload_failure_is_distinct_from_space_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = Arc::new(MemoryStorage::new().with_upload_error("503 from gateway"));
    let router = app(
        Arc::new(FakeLedger::new()),
        storage,
        &config(Some(SALT), Some(EMAIL), tmp.path()),
    );
    let (status, body) = send(router, multipart_post("/api/upload", "file", b"x")).await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], MSG_UPLOAD_FAILED);
    assert_eq!(body["details"], "503 from gateway");
    assert_eq!(leftover_files(tmp.path()), 0);
}

#[tokio::test]
async fn concurrent_uploads_create_a_single_space() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = Arc::new(MemoryStorage::new());
    let gateway = Arc::new(UploadGateway::new(
        storage.clone(),
        Some(EMAIL.into()),
        tmp.path().to_path_buf(),
    ));

    let uploads: Vec<_> = (0..8)
        .map(|i| {
            let gateway = gateway.clone();
            tokio::spawn(async move {
                let data = format!("file {}", i);
                let cid = gateway.upload_bytes(data.as_bytes()).await;
                cid
            })
        })
        .collect();
    for upload in uploads {
        upload.await.unwrap().unwrap();
    }

    assert_eq!(storage.spaces_created(), 1);
    let space = gateway.bootstrap().cached().await.unwrap();
    assert!(space.0.starts_with("did:mem:cert-portal-"));
    let account = AccountId(format!("did:mailto:{}", EMAIL));
    assert!(storage.is_provisioned(&account, &space));
}

#[tokio::test]
async fn existing_space_is_selected_instead_of_created() {
    let tmp = tempfile::tempdir().unwrap();
    let existing = SpaceId("did:mem:existing".into());
    let storage = Arc::new(MemoryStorage::new().with_space(existing.clone()));
    let gateway = UploadGateway::new(storage.clone(), Some(EMAIL.into()), tmp.path().to_path_buf());

    gateway.upload_bytes(b"x").await.unwrap();
    assert_eq!(storage.spaces_created(), 0);
    assert_eq!(storage.current_space().await.unwrap(), Some(existing));
}

#[tokio::test]
async fn known_account_is_reused_without_login() {
    let tmp = tempfile::tempdir().unwrap();
    let account = AccountId("did:mailto:previous@plant.example".into());
    let storage = Arc::new(
        MemoryStorage::new()
            .with_account(account.clone())
            .with_login_error("login must not be attempted"),
    );
    let gateway = UploadGateway::new(storage.clone(), Some(EMAIL.into()), tmp.path().to_path_buf());

    gateway.upload_bytes(b"x").await.unwrap();
    let space = storage.current_space().await.unwrap().unwrap();
    assert!(storage.is_provisioned(&account, &space));
}

#[tokio::test]
async fn upload_over_http_with_reqwest_multipart() {
    let tmp = tempfile::tempdir().unwrap();
    let router = app(
        Arc::new(FakeLedger::new()),
        Arc::new(MemoryStorage::new()),
        &config(Some(SALT), Some(EMAIL), tmp.path()),
    );
    let base_url = spawn_server(router).await;

    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"tech file".to_vec()).file_name("tech.pdf"),
    );
    let response = reqwest::Client::new()
        .post(format!("{}/upload", base_url))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["cid"], content_id(b"tech file"));
}
