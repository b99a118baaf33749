use std::io::Write;
use std::sync::Arc;

use bpb_wizard::AppError;
use bpb_wizard::config::Config;
use bpb_wizard::oauth::UrlOpener;
use bpb_wizard::wizard;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{BUNDLE, ScriptedPrompter};

struct NoBrowser;

impl UrlOpener for NoBrowser {
    fn open(&self, _url: &str) -> std::io::Result<()> {
        panic!("API-token mode must not open a browser");
    }
}

fn ok(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "errors": [],
        "messages": [],
        "result": result
    }))
}

async fn mount_account(server: &MockServer, script_status: u16) {
    Mock::given(method("GET"))
        .and(path("/accounts"))
        .and(header("authorization", "Bearer api-tok"))
        .respond_with(ok(json!([{ "id": "acc-9", "name": "Ops" }])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/accounts/acc-9/workers/scripts/demo"))
        .respond_with(ResponseTemplate::new(script_status).set_body_json(json!({
            "success": script_status == 200,
            "errors": [],
            "result": null
        })))
        .mount(server)
        .await;
}

fn config(server: &MockServer, bundle: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.cloudflare.api_base = server.uri();
    config.cloudflare.api_token = Some("api-tok".to_string());
    config.worker.bundle_path = Some(bundle.to_path_buf());
    config
}

fn bundle_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(BUNDLE.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_api_token_run_against_rest_api() {
    let server = MockServer::start().await;
    mount_account(&server, 404).await;
    Mock::given(method("POST"))
        .and(path("/accounts/acc-9/storage/kv/namespaces"))
        .and(body_json(json!({ "title": "USER_KV_demo" })))
        .respond_with(ok(json!({ "id": "kv-77", "title": "USER_KV_demo" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts/acc-9/d1/database"))
        .and(body_json(json!({ "name": "DB_demo" })))
        .respond_with(ok(json!({ "uuid": "db-77", "name": "DB_demo" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/accounts/acc-9/workers/scripts/demo"))
        .respond_with(ok(json!({ "id": "demo" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts/acc-9/workers/scripts/demo/subdomain"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "errors": [{ "code": 10041, "message": "subdomain already exists" }],
            "result": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/accounts/acc-9/workers/subdomain"))
        .respond_with(ok(json!({ "subdomain": "ops" })))
        .mount(&server)
        .await;

    let bundle = bundle_file();
    let config = config(&server, bundle.path());
    let prompter = ScriptedPrompter::new(&["demo", "k1", "1.2.3.4", "", ""], &[]);

    let report = wizard::run(
        &config,
        &reqwest::Client::new(),
        None,
        Arc::new(NoBrowser),
        &prompter,
    )
    .await
    .unwrap();

    assert_eq!(report.panel_url, "https://demo.ops.workers.dev/admin");
    assert_eq!(report.database_name, "DB_demo");

    let requests = server.received_requests().await.unwrap();
    let upload = requests
        .iter()
        .find(|r| r.method.as_str() == "PUT")
        .unwrap();
    let content_type = upload.headers.get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    let body = String::from_utf8_lossy(&upload.body);
    assert!(body.contains(r#""database_id":"db-77""#));
    assert!(body.contains(r#""namespace_id":"kv-77""#));
    assert!(body.contains(BUNDLE));
}

#[tokio::test]
async fn test_api_token_run_stops_on_taken_name() {
    let server = MockServer::start().await;
    mount_account(&server, 200).await;
    Mock::given(method("POST"))
        .respond_with(ok(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let bundle = bundle_file();
    let config = config(&server, bundle.path());
    let prompter = ScriptedPrompter::new(&["demo", "k1", "1.2.3.4", "", ""], &[]);

    let err = wizard::run(
        &config,
        &reqwest::Client::new(),
        None,
        Arc::new(NoBrowser),
        &prompter,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::NameTaken(_)));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_invalid_input_makes_no_provider_writes() {
    let server = MockServer::start().await;
    mount_account(&server, 404).await;
    Mock::given(method("POST"))
        .respond_with(ok(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let bundle = bundle_file();
    let config = config(&server, bundle.path());
    let prompter = ScriptedPrompter::new(&["demo", "", "1.2.3.4", "", ""], &[]);

    let err = wizard::run(
        &config,
        &reqwest::Client::new(),
        None,
        Arc::new(NoBrowser),
        &prompter,
    )
    .await
    .unwrap_err();

    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("admin key is required"));
}
