#![allow(clippy::unwrap_used)]
// End-to-end collection runs against a wiremock cloud.

use std::collections::HashMap;
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use owfleet_api::{Service, ServiceEndpoint};
use owfleet_core::{
    CollectOptions, CoreError, DeploymentConfig, FetchSettings, LoginCredentials, ReportWriter,
    RetryPolicy, Session, StatsFailurePolicy, collect,
};

// ── Helpers ─────────────────────────────────────────────────────────

struct Cloud {
    server: MockServer,
    dir: TempDir,
    config: DeploymentConfig,
}

async fn cloud() -> Cloud {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let port = server.address().port();
    let services: HashMap<Service, ServiceEndpoint> =
        [Service::Security, Service::Gateway, Service::Provisioning]
            .into_iter()
            .map(|svc| {
                (
                    svc,
                    ServiceEndpoint {
                        host: "127.0.0.1".into(),
                        port,
                        scheme: Some("http".into()),
                    },
                )
            })
            .collect();

    let mut config = DeploymentConfig::new("lab", services);
    config.credentials = Some(LoginCredentials {
        user_id: "ops@example.com".into(),
        password: SecretString::from("hunter2".to_string()),
    });
    config.token_cache = dir.path().join("PRIV-auth-cache.json");
    config.cache_dir = dir.path().join("cache");
    config.fetch = FetchSettings {
        page_size: 75,
        request_delay: Duration::ZERO,
    };

    Cloud {
        server,
        dir,
        config,
    }
}

fn options() -> CollectOptions {
    CollectOptions {
        stats_retry: RetryPolicy {
            attempts: 3,
            backoff: Duration::ZERO,
        },
        ..CollectOptions::default()
    }
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/oauth2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok-abcdefghijk" })),
        )
        .mount(server)
        .await;
}

async fn mount_collection(server: &MockServer, route: &str, key: &str, items: Value) {
    let count = items.as_array().map_or(0, Vec::len);
    Mock::given(method("GET"))
        .and(path(route))
        .and(query_param("countOnly", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": count })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(route))
        .and(query_param("limit", "75"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ key: items })))
        .mount(server)
        .await;
}

async fn mount_provisioning(server: &MockServer) {
    mount_collection(
        server,
        "/api/v1/inventory",
        "taglist",
        json!([
            { "id": "i1", "serialNumber": "aa0000000001", "name": "lobby", "deviceType": "eap101", "venue": "v1" },
            { "id": "i2", "serialNumber": "aa0000000002", "name": "office", "deviceType": "eap102", "venue": "v1" }
        ]),
    )
    .await;
    mount_collection(
        server,
        "/api/v1/venue",
        "venues",
        json!([{ "id": "v1", "name": "HQ", "entity": "e1" }]),
    )
    .await;
    mount_collection(
        server,
        "/api/v1/entity",
        "entities",
        json!([{ "id": "e1", "name": "Acme" }]),
    )
    .await;
}

async fn mount_devices(server: &MockServer) {
    mount_collection(
        server,
        "/api/v1/devices",
        "devicesWithStatus",
        json!([
            { "serialNumber": "aa0000000001", "connected": true, "firmware": "TIP Shasta-3.0",
              "associations_5G": 1 },
            { "serialNumber": "aa0000000002", "connected": true, "firmware": "TIP Shasta-3.0",
              "associations_5G": 1,
              "configuration": { "interfaces": [
                  { "name": "LAN", "ethernet": [ { "select-ports": ["LAN1"] } ] },
                  { "name": "IoT", "ethernet": [ { "select-ports": ["LAN1"] } ] }
              ] } },
            { "serialNumber": "aa0000000003", "connected": false }
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/devices"))
        .and(query_param("connectionStatistics", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({ "connectedDevices": 2, "averageConnectionTime": 3600 }),
        ))
        .mount(server)
        .await;
}

fn last_state(connected: i64, free: u64) -> Value {
    json!({
        "unit": {
            "localtime": chrono::Utc::now().timestamp(),
            "uptime": 86_400,
            "load": [0.1, 0.2, 0.3],
            "memory": { "free": free, "total": 1000 }
        },
        "interfaces": [ { "name": "up0v0", "vlan_id": 10, "ssids": [
            { "band": "5G", "ssid": "corp", "associations": [
                { "station": "CC:00:00:00:00:01", "connected": connected, "rssi": -55 }
            ] }
        ] } ],
        "radios": [ { "band": ["5G"], "channel": 36, "channel_width": "80",
                      "survey": [ { "channel": 36, "agg_15m": { "num_samples": 15 } } ] } ],
        "rrm-info": [
            { "mac": "cc:00:00:00:00:01", "state": 1,
              "stats": { "upsteer": { "btm": { "total": 1, "success": 1, "fail": 0 } } } }
        ]
    })
}

async fn mount_stats(server: &MockServer, mac: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/device/{mac}/statistics")))
        .and(query_param("lastOnly", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

// ── Full run ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_collect_builds_every_table() {
    let cloud = cloud().await;
    mount_login(&cloud.server).await;
    mount_provisioning(&cloud.server).await;
    mount_devices(&cloud.server).await;
    mount_stats(&cloud.server, "aa0000000001", last_state(100, 150)).await;
    mount_stats(&cloud.server, "aa0000000002", last_state(30, 210)).await;

    let session = Session::open(&cloud.config).await.unwrap();
    let run = collect(&session, &cloud.config, &options()).await.unwrap();

    assert_eq!(run.devices.len(), 2);
    assert_eq!(run.devices[0].name, "lobby");
    assert_eq!(run.devices[0].org, "Acme");
    assert_eq!(run.devices[0].firmware, "Shasta-3.0");
    assert_eq!(run.survey.len(), 2);
    assert_eq!(run.sightings.len(), 2);
    assert_eq!(run.sightings[0].client.metrics.vlan_id, "S-10");

    assert_eq!(run.clients.len(), 1);
    let client = &run.clients[0];
    assert_eq!(client.mac.as_str(), "cc:00:00:00:00:01");
    assert_eq!(client.ap_cnt, 2);
    assert_eq!(client.metrics.connected_time, 30);
    assert_eq!(client.metrics.steering.values()[0], 2);

    let summary = &run.summary;
    assert_eq!(summary.total_devices, 3);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.connection.as_ref().unwrap().connected_devices, 2);
    assert_eq!(summary.connected_clients, 1);
    assert_eq!(summary.high_memory.len(), 1);
    assert_eq!(summary.high_memory[0].device.name, "lobby");
    assert_eq!(summary.broken_lan[0].finding.dup_cnt, 1);
    assert_eq!(summary.broken_lan[0].device.to_string(), "Acme => HQ => office");
    assert!(summary.stale.is_empty());

    // Listings were cached for the next run.
    assert!(cloud.dir.path().join("cache/LAB-Devices.json").exists());
    assert!(cloud.dir.path().join("cache/LAB-ProvData.json").exists());
    let tokens = std::fs::read_to_string(&cloud.config.token_cache).unwrap();
    assert!(tokens.contains("tok-abcdefghijk"));

    let out = cloud.dir.path().join("results");
    let writer = ReportWriter::new(&out, "lab", &run.started);
    let written = run.write_reports(&writer).unwrap();
    assert_eq!(written.len(), 10);
    let clients_csv = std::fs::read_to_string(&written[9]).unwrap();
    assert_eq!(clients_csv.lines().count(), 2);
}

#[tokio::test]
async fn test_cached_token_skips_login() {
    let cloud = cloud().await;
    std::fs::write(&cloud.config.token_cache, r#"{"LAB":"cached-token"}"#).unwrap();
    Mock::given(method("POST"))
        .and(path("/api/v1/oauth2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&cloud.server)
        .await;

    let session = Session::open(&cloud.config).await.unwrap();
    assert_eq!(session.deployment(), "LAB");
}

#[tokio::test]
async fn test_org_filter_skips_devices() {
    let cloud = cloud().await;
    mount_login(&cloud.server).await;
    mount_provisioning(&cloud.server).await;
    mount_devices(&cloud.server).await;

    let session = Session::open(&cloud.config).await.unwrap();
    let opts = CollectOptions {
        org: Some("globex".into()),
        ..options()
    };
    let run = collect(&session, &cloud.config, &opts).await.unwrap();
    assert!(run.devices.is_empty());
    assert_eq!(run.summary.total_devices, 3);
}

// ── Failure handling ────────────────────────────────────────────────

#[tokio::test]
async fn test_stats_failure_aborts_by_default() {
    let cloud = cloud().await;
    mount_login(&cloud.server).await;
    mount_provisioning(&cloud.server).await;
    mount_devices(&cloud.server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/device/aa0000000001/statistics"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&cloud.server)
        .await;

    let session = Session::open(&cloud.config).await.unwrap();
    let result = collect(&session, &cloud.config, &options()).await;
    assert!(
        matches!(result, Err(CoreError::StatsUnavailable { attempts: 3, .. })),
        "expected StatsUnavailable, got: {result:?}"
    );
}

#[tokio::test]
async fn test_stats_failure_skips_device_when_asked() {
    let cloud = cloud().await;
    mount_login(&cloud.server).await;
    mount_provisioning(&cloud.server).await;
    mount_devices(&cloud.server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/device/aa0000000001/statistics"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&cloud.server)
        .await;
    mount_stats(&cloud.server, "aa0000000002", last_state(30, 500)).await;

    let session = Session::open(&cloud.config).await.unwrap();
    let opts = CollectOptions {
        stats_policy: StatsFailurePolicy::SkipDevice,
        ..options()
    };
    let run = collect(&session, &cloud.config, &opts).await.unwrap();
    assert_eq!(run.summary.processed, 1);
    assert_eq!(run.summary.skipped.len(), 1);
    assert_eq!(run.summary.skipped[0].name, "lobby");
    assert_eq!(run.devices[0].name, "office");
}

#[tokio::test]
async fn test_void_inventory_stops_the_run() {
    let cloud = cloud().await;
    mount_login(&cloud.server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/inventory"))
        .and(query_param("countOnly", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 2 })))
        .mount(&cloud.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/inventory"))
        .and(query_param("limit", "75"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&cloud.server)
        .await;
    mount_collection(&cloud.server, "/api/v1/venue", "venues", json!([])).await;
    mount_collection(&cloud.server, "/api/v1/entity", "entities", json!([])).await;
    mount_devices(&cloud.server).await;

    let session = Session::open(&cloud.config).await.unwrap();
    let result = collect(&session, &cloud.config, &options()).await;

    assert!(
        matches!(
            result,
            Err(CoreError::CollectionUnavailable {
                resource: "inventory",
                ..
            })
        ),
        "expected CollectionUnavailable, got: {result:?}"
    );
    assert!(!cloud.dir.path().join("cache/LAB-ProvData.json").exists());
    let stats_requests = cloud
        .server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path().ends_with("/statistics"))
        .count();
    assert_eq!(stats_requests, 0);
}

#[tokio::test]
async fn test_device_listing_without_count_is_fatal() {
    let cloud = cloud().await;
    mount_login(&cloud.server).await;
    mount_provisioning(&cloud.server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/devices"))
        .and(query_param("countOnly", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&cloud.server)
        .await;

    let session = Session::open(&cloud.config).await.unwrap();
    let result = collect(&session, &cloud.config, &options()).await;
    assert!(
        matches!(
            result,
            Err(CoreError::CollectionUnavailable {
                resource: "devices",
                ..
            })
        ),
        "expected CollectionUnavailable, got: {result:?}"
    );
}
