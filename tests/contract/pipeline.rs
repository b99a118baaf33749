use bpb_wizard::AppError;
use bpb_wizard::cloudflare::{Zone, resolve_account};
use bpb_wizard::deploy::{DeploymentSpec, ProvisionError, Step, UploadError};
use bpb_wizard::wizard::deploy;

use crate::common::{BUNDLE, FakeCloud, ScriptedPrompter, fixture, split_upload};

fn demo_spec(custom_domain: &str) -> DeploymentSpec {
    DeploymentSpec::new("demo", "k1", "1.2.3.4", "", custom_domain).unwrap()
}

fn example_zone() -> Zone {
    Zone {
        id: "zone-1".to_string(),
        name: "example.com".to_string(),
    }
}

#[tokio::test]
async fn test_minimal_deployment() {
    let fx = fixture(FakeCloud::default());
    let prompter = ScriptedPrompter::default();

    let provisioned = deploy(&fx.ctx, &demo_spec(""), &prompter).await.unwrap();

    assert_eq!(
        fx.cloud.calls(),
        [
            "script_exists",
            "create_kv_namespace",
            "create_d1_database",
            "upload_script",
            "enable_script_subdomain",
            "account_subdomain",
        ]
    );
    assert_eq!(provisioned.report.panel_url, "https://demo.acme.workers.dev/admin");
    assert!(provisioned.report.warnings.is_empty());
    assert_eq!(provisioned.resources.namespace_id(), Some("kv-1"));
    assert_eq!(provisioned.resources.database_id(), Some("db-1"));
    assert_eq!(provisioned.resources.subdomain(), Some("acme.workers.dev"));
    assert_eq!(provisioned.resources.zone_id(), None);
    assert!(prompter.asked.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_references_minted_ids() {
    let fx = fixture(FakeCloud::default());
    deploy(&fx.ctx, &demo_spec(""), &ScriptedPrompter::default())
        .await
        .unwrap();

    let uploads = fx.cloud.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].name, "demo");

    let (metadata, bundle) = split_upload(&uploads[0]);
    assert_eq!(bundle, BUNDLE);
    assert_eq!(metadata["main_module"], "worker.js");
    assert_eq!(metadata["compatibility_date"], "2025-01-01");
    assert_eq!(metadata["compatibility_flags"], serde_json::json!(["nodejs_compat"]));

    let bindings = metadata["bindings"].as_array().unwrap();
    assert_eq!(bindings.len(), 4);
    assert_eq!(bindings[0]["type"], "d1_database");
    assert_eq!(bindings[0]["database_id"], "db-1");
    assert_eq!(bindings[1]["type"], "kv_namespace");
    assert_eq!(bindings[1]["namespace_id"], "kv-1");
    assert_eq!(bindings[2]["name"], "ADMIN_KEY");
    assert_eq!(bindings[3]["name"], "PROXYIP");
}

#[tokio::test]
async fn test_root_proxy_url_adds_binding() {
    let fx = fixture(FakeCloud::default());
    let spec = DeploymentSpec::new("demo", "k1", "1.2.3.4", "https://root.example", "").unwrap();
    deploy(&fx.ctx, &spec, &ScriptedPrompter::default())
        .await
        .unwrap();

    let uploads = fx.cloud.uploads.lock().unwrap();
    let (metadata, _) = split_upload(&uploads[0]);
    let bindings = metadata["bindings"].as_array().unwrap();
    assert_eq!(bindings.len(), 5);
    assert_eq!(bindings[4]["name"], "ROOT_PROXY_URL");
    assert_eq!(bindings[4]["type"], "secret_text");
}

#[tokio::test]
async fn test_custom_domain_with_matching_zone() {
    let fx = fixture(FakeCloud {
        zones: vec![example_zone()],
        ..FakeCloud::default()
    });

    let provisioned = deploy(&fx.ctx, &demo_spec("app.example.com"), &ScriptedPrompter::default())
        .await
        .unwrap();

    assert_eq!(provisioned.report.panel_url, "https://app.example.com/admin");
    assert!(provisioned.report.warnings.is_empty());
    assert_eq!(provisioned.resources.zone_id(), Some("zone-1"));

    let attachments = fx.cloud.attachments.lock().unwrap();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].environment, "production");
    assert_eq!(attachments[0].hostname, "app.example.com");
    assert_eq!(attachments[0].service, "demo");
    assert_eq!(attachments[0].zone_id, "zone-1");

    let calls = fx.cloud.calls();
    assert_eq!(calls[calls.len() - 2..], ["list_zones", "attach_domain"]);
}

#[tokio::test]
async fn test_custom_domain_without_zone_warns() {
    let fx = fixture(FakeCloud::default());

    let provisioned = deploy(&fx.ctx, &demo_spec("app.example.com"), &ScriptedPrompter::default())
        .await
        .unwrap();

    assert_eq!(provisioned.report.panel_url, "https://demo.acme.workers.dev/admin");
    assert_eq!(provisioned.report.warnings.len(), 1);
    assert!(provisioned.report.warnings[0].contains("example.com"));
    assert!(fx.cloud.attachments.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_taken_name_aborts_before_creation() {
    let fx = fixture(FakeCloud {
        existing_scripts: vec!["taken-name".to_string()],
        ..FakeCloud::default()
    });
    let spec = DeploymentSpec::new("taken-name", "k1", "1.2.3.4", "", "").unwrap();

    let err = deploy(&fx.ctx, &spec, &ScriptedPrompter::default())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NameTaken(ref n) if n == "taken-name"));
    assert_eq!(fx.cloud.calls(), ["script_exists"]);
}

#[tokio::test]
async fn test_inconclusive_lookup_needs_confirmation() {
    let fx = fixture(FakeCloud {
        lookup_fails: true,
        ..FakeCloud::default()
    });
    let prompter = ScriptedPrompter::new(&[], &[false]);

    let err = deploy(&fx.ctx, &demo_spec(""), &prompter).await.unwrap_err();

    assert!(matches!(err, AppError::Cancelled(_)));
    assert_eq!(fx.cloud.calls(), ["script_exists"]);
}

#[tokio::test]
async fn test_inconclusive_lookup_confirmed_proceeds() {
    let fx = fixture(FakeCloud {
        lookup_fails: true,
        ..FakeCloud::default()
    });
    let prompter = ScriptedPrompter::new(&[], &[true]);

    let provisioned = deploy(&fx.ctx, &demo_spec(""), &prompter).await.unwrap();
    assert_eq!(provisioned.report.panel_url, "https://demo.acme.workers.dev/admin");
}

#[tokio::test]
async fn test_namespace_retry_then_success() {
    let fx = fixture(FakeCloud {
        kv_failures: 1.into(),
        ..FakeCloud::default()
    });
    let prompter = ScriptedPrompter::new(&[], &[true]);

    deploy(&fx.ctx, &demo_spec(""), &prompter).await.unwrap();

    let calls = fx.cloud.calls();
    assert_eq!(calls.iter().filter(|c| *c == "create_kv_namespace").count(), 2);
    assert!(prompter.asked.lock().unwrap()[0].contains("KV namespace"));
}

#[tokio::test]
async fn test_namespace_failure_abort_stops_pipeline() {
    let fx = fixture(FakeCloud {
        kv_failures: 1.into(),
        ..FakeCloud::default()
    });
    let prompter = ScriptedPrompter::new(&[], &[false]);

    let err = deploy(&fx.ctx, &demo_spec(""), &prompter).await.unwrap_err();

    assert!(matches!(
        err,
        AppError::Provision(ProvisionError::Aborted(Step::CreateNamespace))
    ));
    assert_eq!(fx.cloud.calls(), ["script_exists", "create_kv_namespace"]);
}

#[tokio::test]
async fn test_upload_failure_is_fatal() {
    let fx = fixture(FakeCloud {
        upload_fails: true,
        ..FakeCloud::default()
    });
    let prompter = ScriptedPrompter::default();

    let err = deploy(&fx.ctx, &demo_spec(""), &prompter).await.unwrap_err();

    assert!(matches!(
        err,
        AppError::Provision(ProvisionError::Upload(UploadError::Api(_)))
    ));
    let calls = fx.cloud.calls();
    assert_eq!(calls.last().map(String::as_str), Some("upload_script"));
    assert!(prompter.asked.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_bundle_fails_before_upload_call() {
    let mut fx = fixture(FakeCloud::default());
    fx.ctx.bundle_path = fx.ctx.bundle_path.with_file_name("does-not-exist.js");

    let err = deploy(&fx.ctx, &demo_spec(""), &ScriptedPrompter::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Provision(ProvisionError::Upload(UploadError::Bundle { .. }))
    ));
    assert!(!fx.cloud.calls().contains(&"upload_script".to_string()));
}

#[tokio::test]
async fn test_existing_subdomain_is_tolerated() {
    let fx = fixture(FakeCloud {
        subdomain_already_enabled: true,
        ..FakeCloud::default()
    });

    let provisioned = deploy(&fx.ctx, &demo_spec(""), &ScriptedPrompter::default())
        .await
        .unwrap();
    assert_eq!(provisioned.report.panel_url, "https://demo.acme.workers.dev/admin");
}

#[tokio::test]
async fn test_database_retry_then_success() {
    let fx = fixture(FakeCloud {
        d1_failures: 1.into(),
        ..FakeCloud::default()
    });
    let prompter = ScriptedPrompter::new(&[], &[true]);

    let provisioned = deploy(&fx.ctx, &demo_spec(""), &prompter).await.unwrap();

    let calls = fx.cloud.calls();
    assert_eq!(calls.iter().filter(|c| *c == "create_d1_database").count(), 2);
    assert_eq!(calls.iter().filter(|c| *c == "create_kv_namespace").count(), 1);
    assert!(prompter.asked.lock().unwrap()[0].contains("D1 database"));
    assert_eq!(provisioned.resources.database_id(), Some("db-1"));
}

#[tokio::test]
async fn test_database_failure_abort_keeps_namespace() {
    let fx = fixture(FakeCloud {
        d1_failures: 1.into(),
        ..FakeCloud::default()
    });
    let prompter = ScriptedPrompter::new(&[], &[false]);

    let err = deploy(&fx.ctx, &demo_spec(""), &prompter).await.unwrap_err();

    assert!(matches!(
        err,
        AppError::Provision(ProvisionError::Aborted(Step::CreateDatabase))
    ));
    assert_eq!(
        fx.cloud.calls(),
        ["script_exists", "create_kv_namespace", "create_d1_database"]
    );
}

#[tokio::test]
async fn test_subdomain_failure_is_fatal_without_prompt() {
    let fx = fixture(FakeCloud {
        subdomain_fails: true,
        ..FakeCloud::default()
    });
    let prompter = ScriptedPrompter::default();

    let err = deploy(&fx.ctx, &demo_spec(""), &prompter).await.unwrap_err();

    assert!(matches!(
        err,
        AppError::Provision(ProvisionError::Step {
            step: Step::EnableSubdomain,
            ..
        })
    ));
    assert!(prompter.asked.lock().unwrap().is_empty());
    assert_eq!(
        fx.cloud.calls().last().map(String::as_str),
        Some("enable_script_subdomain")
    );
}

#[tokio::test]
async fn test_rejected_attach_falls_back_to_workers_dev() {
    let fx = fixture(FakeCloud {
        zones: vec![example_zone()],
        attach_fails: true,
        ..FakeCloud::default()
    });

    let provisioned = deploy(&fx.ctx, &demo_spec("app.example.com"), &ScriptedPrompter::default())
        .await
        .unwrap();

    assert_eq!(provisioned.report.panel_url, "https://demo.acme.workers.dev/admin");
    assert_eq!(provisioned.report.warnings.len(), 1);
    assert!(provisioned.report.warnings[0].contains("already in use"));
    assert_eq!(provisioned.resources.zone_id(), None);

    let calls = fx.cloud.calls();
    assert_eq!(calls[calls.len() - 2..], ["list_zones", "attach_domain"]);
}

#[tokio::test]
async fn test_pinned_account_used_even_when_not_listed() {
    let cloud = FakeCloud::default();

    let account = resolve_account(&cloud, Some("pinned-acc")).await.unwrap();

    assert_eq!(account.id, "pinned-acc");
    assert_eq!(account.name, "pinned-acc");
}
