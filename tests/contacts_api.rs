// SPDX-License-Identifier: Apache-2.0

use contacts_server::{
    build_router, AppState, Contact, ContactStore, FakeStore, ServerConfig, SqliteStore,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn test_config() -> ServerConfig {
    ServerConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        database_url: None,
        production: false,
        data_dir: PathBuf::from("data"),
        assets_dir: PathBuf::from("assets"),
        admin_password: "correct-horse".to_string(),
        session_secret: "integration-test-session-secret-0123456789abcdef0123456789abcdef"
            .to_string(),
        max_body_bytes: 16 * 1024,
    }
}

async fn spawn_app(store: Arc<dyn ContactStore>) -> SocketAddr {
    let state = AppState::new(store, Arc::new(test_config()));
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve app");
    });
    addr
}

async fn sqlite_store(dir: &tempfile::TempDir) -> Arc<SqliteStore> {
    let store = SqliteStore::open(dir.path().join("contacts.sqlite"))
        .await
        .expect("open sqlite");
    store.init().await.expect("init schema");
    Arc::new(store)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("client")
}

async fn login(client: &reqwest::Client, addr: SocketAddr) {
    let response = client
        .post(format!("http://{addr}/api/admin/login"))
        .json(&json!({ "password": "correct-horse" }))
        .send()
        .await
        .expect("login request");
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn create_then_manage_contact_end_to_end() {
    let dir = tempfile::tempdir().expect("tempdir");
    let addr = spawn_app(sqlite_store(&dir).await).await;
    let client = client();

    // Anonymous submission from the public form.
    let response = client
        .post(format!("http://{addr}/api/contacts"))
        .json(&json!({ "name": "A", "phone": "123", "email": "a@b.com" }))
        .send()
        .await
        .expect("create request");
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("create body");
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["name"], json!("A"));
    let id = body["data"]["id"].as_i64().expect("created id");
    assert!(id > 0);

    login(&client, addr).await;

    let contacts: Vec<Contact> = client
        .get(format!("http://{addr}/api/contacts"))
        .send()
        .await
        .expect("list request")
        .json()
        .await
        .expect("list body");
    assert!(contacts.iter().any(|c| c.id == id && c.name == "A"));

    let response = client
        .put(format!("http://{addr}/api/contacts/{id}"))
        .json(&json!({ "name": "B", "phone": "123", "email": "a@b.com" }))
        .send()
        .await
        .expect("update request");
    assert_eq!(response.status(), 200);

    let contacts: Vec<Contact> = client
        .get(format!("http://{addr}/api/contacts"))
        .send()
        .await
        .expect("list request")
        .json()
        .await
        .expect("list body");
    let updated = contacts.iter().find(|c| c.id == id).expect("updated row");
    assert_eq!(updated.name, "B");

    let response = client
        .delete(format!("http://{addr}/api/contacts/{id}"))
        .send()
        .await
        .expect("delete request");
    assert_eq!(response.status(), 200);

    let contacts: Vec<Contact> = client
        .get(format!("http://{addr}/api/contacts"))
        .send()
        .await
        .expect("list request")
        .json()
        .await
        .expect("list body");
    assert!(!contacts.iter().any(|c| c.id == id));

    let response = client
        .delete(format!("http://{addr}/api/contacts/{id}"))
        .send()
        .await
        .expect("second delete request");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn update_and_delete_on_unknown_id_return_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let addr = spawn_app(sqlite_store(&dir).await).await;
    let client = client();
    login(&client, addr).await;

    let response = client
        .put(format!("http://{addr}/api/contacts/9999"))
        .json(&json!({ "name": "x", "phone": "1", "email": "x@y.co" }))
        .send()
        .await
        .expect("update request");
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.expect("update body");
    assert_eq!(body["error"], json!("ไม่พบข้อมูลที่ต้องการแก้ไข"));

    let response = client
        .delete(format!("http://{addr}/api/contacts/9999"))
        .send()
        .await
        .expect("delete request");
    assert_eq!(response.status(), 404);

    let contacts: Vec<Contact> = client
        .get(format!("http://{addr}/api/contacts"))
        .send()
        .await
        .expect("list request")
        .json()
        .await
        .expect("list body");
    assert!(contacts.is_empty());
}

#[tokio::test]
async fn validation_rejections_never_reach_the_store() {
    let store = Arc::new(FakeStore::default());
    let addr = spawn_app(store.clone()).await;
    let client = client();

    for (payload, expected_error) in [
        (
            json!({ "name": "", "phone": "123", "email": "a@b.com" }),
            "กรุณากรอกข้อมูลให้ครบถ้วน",
        ),
        (
            json!({ "name": "A", "phone": "   ", "email": "a@b.com" }),
            "กรุณากรอกข้อมูลให้ครบถ้วน",
        ),
        (
            json!({ "name": "A", "phone": "123" }),
            "กรุณากรอกข้อมูลให้ครบถ้วน",
        ),
        (
            json!({ "name": "A", "phone": "123", "email": "missing-at.example.com" }),
            "รูปแบบอีเมลไม่ถูกต้อง",
        ),
        (
            json!({ "name": "A", "phone": "123", "email": "a@no-dot" }),
            "รูปแบบอีเมลไม่ถูกต้อง",
        ),
    ] {
        let response = client
            .post(format!("http://{addr}/api/contacts"))
            .json(&payload)
            .send()
            .await
            .expect("create request");
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.expect("error body");
        assert_eq!(body["error"], json!(expected_error));
    }

    assert_eq!(store.calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn storage_failures_surface_as_opaque_500() {
    let store = Arc::new(FakeStore::default());
    let addr = spawn_app(store.clone()).await;
    let client = client();
    login(&client, addr).await;

    store.fail.store(true, Ordering::Relaxed);

    let response = client
        .post(format!("http://{addr}/api/contacts"))
        .json(&json!({ "name": "A", "phone": "123", "email": "a@b.com" }))
        .send()
        .await
        .expect("create request");
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.expect("error body");
    assert_eq!(body["error"], json!("เกิดข้อผิดพลาดในการบันทึกข้อมูล"));

    let response = client
        .get(format!("http://{addr}/api/contacts"))
        .send()
        .await
        .expect("list request");
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.expect("error body");
    assert_eq!(body["error"], json!("เกิดข้อผิดพลาดในการดึงข้อมูล"));
}

#[tokio::test]
async fn list_returns_empty_array_for_empty_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let addr = spawn_app(sqlite_store(&dir).await).await;
    let client = client();
    login(&client, addr).await;

    let response = client
        .get(format!("http://{addr}/api/contacts"))
        .send()
        .await
        .expect("list request");
    assert_eq!(response.status(), 200);
    let contacts: Vec<Contact> = response.json().await.expect("list body");
    assert!(contacts.is_empty());
}

#[tokio::test]
async fn healthz_and_request_id_are_served() {
    let dir = tempfile::tempdir().expect("tempdir");
    let addr = spawn_app(sqlite_store(&dir).await).await;
    let client = client();

    let response = client
        .get(format!("http://{addr}/healthz"))
        .send()
        .await
        .expect("healthz request");
    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.expect("healthz body"), "ok");
}
