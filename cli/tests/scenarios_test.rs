#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use common::{FakeApi, PROJECT_ID, Sandbox};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const IMAGES_PATH: &str = "/v2/projects/00000000-0000-0000-0000-000000000001/regions/eu01/images";
const CLUSTERS_PATH: &str =
    "/v2/projects/00000000-0000-0000-0000-000000000001/regions/eu01/clusters";

fn project_config() -> String {
    format!("active_profile = \"default\"\n\n[profiles.default]\n\"project.id\" = \"{PROJECT_ID}\"\n")
}

#[tokio::test]
async fn test_image_list_without_results() {
    let api = FakeApi::serve(Router::new().route(
        IMAGES_PATH,
        get(|| async { Json(json!({"items": []})) }),
    ))
    .await;
    let sandbox = Sandbox::new().with_api(&api);
    sandbox.write_config(&project_config());

    let out = sandbox.run(&["image", "list"], "").await;

    assert_eq!(out.code, 0, "stderr: {}", out.stderr);
    assert_eq!(
        out.stdout,
        format!("No images found for project \"{PROJECT_ID}\"\n")
    );
    assert_eq!(api.requests(), vec![format!("GET {IMAGES_PATH}")]);
}

/// Fake IaaS that accepts an image and its upload; returns the uploaded bytes.
async fn image_api() -> (FakeApi, Arc<Mutex<Vec<u8>>>, Arc<Mutex<String>>) {
    let uploaded = Arc::new(Mutex::new(Vec::new()));
    let upload_url = Arc::new(Mutex::new(String::new()));

    let url = upload_url.clone();
    let sink = uploaded.clone();
    let router = Router::new()
        .route(
            IMAGES_PATH,
            post(move || {
                let url = url.clone();
                async move { Json(json!({"id": "img-1", "uploadUrl": url.lock().unwrap().clone()})) }
            }),
        )
        .route(
            "/upload",
            put(move |body: Bytes| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().extend_from_slice(&body);
                    StatusCode::OK
                }
            }),
        );
    let api = FakeApi::serve(router).await;
    *upload_url.lock().unwrap() = format!("{}/upload", api.base_url);
    (api, uploaded, upload_url)
}

#[tokio::test]
async fn test_image_create_uploads_the_file() {
    let (api, uploaded, _) = image_api().await;
    let sandbox = Sandbox::new()
        .with_api(&api)
        .with_env("STACKIT_PROJECT_ID", PROJECT_ID);
    let file = sandbox.path().join("x");
    std::fs::write(&file, "ABCD").unwrap();

    let out = sandbox
        .run(
            &[
                "image",
                "create",
                "--name",
                "my-img",
                "--disk-format",
                "raw",
                "--local-file-path",
                file.to_str().unwrap(),
                "--assume-yes",
            ],
            "",
        )
        .await;

    assert_eq!(out.code, 0, "stderr: {}", out.stderr);
    assert_eq!(out.stdout, "Created image \"my-img\" with id img-1\n");
    assert_eq!(uploaded.lock().unwrap().as_slice(), b"ABCD");
    assert_eq!(
        api.requests(),
        vec![format!("POST {IMAGES_PATH}"), "PUT /upload".to_string()]
    );
}

#[tokio::test]
async fn test_image_create_json_output_is_the_service_response() {
    let (api, _, upload_url) = image_api().await;
    let sandbox = Sandbox::new()
        .with_api(&api)
        .with_env("STACKIT_PROJECT_ID", PROJECT_ID);
    let file = sandbox.path().join("x");
    std::fs::write(&file, "ABCD").unwrap();

    let out = sandbox
        .run(
            &[
                "image",
                "create",
                "--name",
                "my-img",
                "--disk-format",
                "raw",
                "--local-file-path",
                file.to_str().unwrap(),
                "--assume-yes",
                "--output-format",
                "json",
            ],
            "",
        )
        .await;

    assert_eq!(out.code, 0, "stderr: {}", out.stderr);
    let document: Value = serde_json::from_str(&out.stdout).unwrap();
    let url = upload_url.lock().unwrap().clone();
    assert_eq!(document, json!({"id": "img-1", "uploadUrl": url}));
    assert!(out.stdout.find("\"id\"").unwrap() < out.stdout.find("\"uploadUrl\"").unwrap());
}

#[tokio::test]
async fn test_ttl_below_minimum_fails_before_any_call() {
    let api = FakeApi::serve(Router::new()).await;
    let sandbox = Sandbox::new()
        .with_api(&api)
        .with_env("STACKIT_PROJECT_ID", PROJECT_ID);

    let out = sandbox
        .run(
            &[
                "dns",
                "record-set",
                "create",
                "--zone-id",
                "22222222-2222-2222-2222-222222222222",
                "--name",
                "www",
                "--record",
                "1.2.3.4",
                "--ttl",
                "30s",
            ],
            "",
        )
        .await;

    assert_eq!(out.code, 2);
    assert!(
        out.stderr
            .contains("duration is below minimum: 30 seconds (minimum: 60 seconds)"),
        "stderr: {}",
        out.stderr
    );
    assert!(api.requests().is_empty());
}

#[tokio::test]
async fn test_cluster_create_reports_failed_wait() {
    let polls = Arc::new(AtomicUsize::new(0));
    let counter = polls.clone();
    let cluster_path = format!("{CLUSTERS_PATH}/my-cluster");
    let router = Router::new()
        .route(CLUSTERS_PATH, get(|| async { Json(json!({"items": []})) }))
        .route(
            "/v2/regions/eu01/provider-options",
            get(|| async {
                Json(json!({
                    "kubernetesVersions": [{"version": "1.30.2", "state": "supported"}],
                    "machineImages": [{
                        "name": "flatcar",
                        "versions": [{
                            "version": "3815.2.5",
                            "state": "supported",
                            "cri": [{"name": "containerd"}]
                        }]
                    }]
                }))
            }),
        )
        .route(
            &cluster_path,
            put(|| async {
                Json(json!({"name": "my-cluster", "status": {"aggregated": "STATE_CREATING"}}))
            })
            .get(move || {
                let counter = counter.clone();
                async move {
                    let poll = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if poll < 3 {
                        Json(json!({"name": "my-cluster", "status": {"aggregated": "STATE_CREATING"}}))
                    } else {
                        Json(json!({
                            "name": "my-cluster",
                            "status": {
                                "aggregated": "STATE_FAILED",
                                "errors": [{"code": "InsufficientQuota", "message": "quota exceeded"}]
                            }
                        }))
                    }
                }
            }),
        );
    let api = FakeApi::serve(router).await;
    let sandbox = Sandbox::new()
        .with_api(&api)
        .with_env("STACKIT_PROJECT_ID", PROJECT_ID);

    let out = sandbox
        .run(&["ske", "cluster", "create", "my-cluster", "-y"], "")
        .await;

    assert_eq!(out.code, 1, "stdout: {}", out.stdout);
    assert!(
        out.stderr
            .contains("wait for SKE cluster creation: InsufficientQuota"),
        "stderr: {}",
        out.stderr
    );
    assert_eq!(polls.load(Ordering::SeqCst), 3);
    // stderr is a pipe, so the wait runs without a spinner.
    assert!(!out.stderr.contains('\r'), "stderr: {:?}", out.stderr);
    assert!(api.requests().contains(&format!("PUT {cluster_path}")));
}

/// Login kubeconfig whose client certificate expires at `not_after`.
fn login_kubeconfig(not_after: DateTime<Utc>) -> String {
    let mut params = rcgen::CertificateParams::new(vec!["client".to_string()]);
    params.not_after = time::OffsetDateTime::from_unix_timestamp(not_after.timestamp()).unwrap();
    let certificate = rcgen::Certificate::from_params(params).unwrap();
    format!(
        "apiVersion: v1\nkind: Config\nusers:\n- name: u\n  user:\n    client-certificate-data: {}\n    client-key-data: {}\n",
        STANDARD.encode(certificate.serialize_pem().unwrap()),
        STANDARD.encode(certificate.serialize_private_key_pem())
    )
}

#[tokio::test]
async fn test_kubeconfig_login_serves_fresh_cache_without_calls() {
    let server = "https://api.c1.example.com";
    let api = FakeApi::serve(Router::new()).await;
    let sandbox = Sandbox::new().with_api(&api);

    let not_after = Utc::now().trunc_subsecs(0) + Duration::minutes(60);
    // A plain access token carries no email.
    let digest = Sha256::digest(format!("{server}\0").as_bytes());
    let key: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    std::fs::create_dir_all(sandbox.cache_dir()).unwrap();
    std::fs::write(
        sandbox.cache_dir().join(format!("ske-login-{key}")),
        login_kubeconfig(not_after),
    )
    .unwrap();

    let request = json!({
        "apiVersion": "client.authentication.k8s.io/v1",
        "kind": "ExecCredential",
        "spec": {
            "cluster": {
                "server": server,
                "config": {
                    "stackitProjectID": PROJECT_ID,
                    "clusterName": "c1",
                    "region": "eu01"
                }
            }
        }
    });
    let out = sandbox
        .run(&["ske", "kubeconfig", "login"], &request.to_string())
        .await;

    assert_eq!(out.code, 0, "stderr: {}", out.stderr);
    let credential: Value = serde_json::from_str(&out.stdout).unwrap();
    assert_eq!(credential["kind"], "ExecCredential");
    assert_eq!(credential["apiVersion"], "client.authentication.k8s.io/v1");
    assert_eq!(
        credential["status"]["expirationTimestamp"],
        (not_after - Duration::minutes(15))
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    );
    assert!(
        credential["status"]["clientCertificateData"]
            .as_str()
            .unwrap()
            .starts_with("-----BEGIN CERTIFICATE-----")
    );
    assert!(api.requests().is_empty());
}

#[tokio::test]
async fn test_malformed_positional_id_fails_before_any_call() {
    let api = FakeApi::serve(Router::new()).await;
    let sandbox = Sandbox::new()
        .with_api(&api)
        .with_env("STACKIT_PROJECT_ID", PROJECT_ID);

    let out = sandbox.run(&["image", "describe", "not-a-uuid"], "").await;

    assert_eq!(out.code, 2);
    assert!(
        out.stderr
            .contains("the provided argument \"IMAGE_ID\" is invalid"),
        "stderr: {}",
        out.stderr
    );
    assert!(api.requests().is_empty());
}

#[tokio::test]
async fn test_missing_subcommand_shows_help() {
    let out = Sandbox::new().run(&["image"], "").await;
    assert_eq!(out.code, 0);
    assert!(out.stdout.contains("Usage:") || out.stderr.contains("Usage:"));
}

#[tokio::test]
async fn test_unknown_flag_is_a_usage_error() {
    let out = Sandbox::new().run(&["image", "list", "--nope"], "").await;
    assert_eq!(out.code, 2);
}
