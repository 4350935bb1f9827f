//! Drives both router variants in-process against synthetic host data.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt;

use eagle_agent::agent_modules::config::AgentConfig;
use eagle_agent::agent_modules::metrics::{
    DiskError, DiskIoCounters, DiskPlatform, DiskStatsSource, LoadSource, Partition,
    SamplingError, VolumeUsage,
};
use eagle_agent::agent_modules::utils::host_name;
use eagle_agent::web::{AppState, Variant, create_axum_router};

#[derive(Default)]
struct CountingLoad {
    calls: AtomicUsize,
    fail: bool,
}

impl LoadSource for CountingLoad {
    fn load_average(&self) -> Result<[f64; 3], SamplingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SamplingError::Incomplete { reported: -1 });
        }
        Ok([0.42, 1.5, 2.25])
    }
}

#[derive(Default)]
struct OneVolume {
    listings: AtomicUsize,
}

impl DiskPlatform for OneVolume {
    fn partitions(&self) -> Result<Vec<Partition>, DiskError> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        Ok(vec![
            Partition {
                device: "/dev/nvme0n1p2".to_string(),
                mount_point: PathBuf::from("/"),
                fs_type: "ext4".to_string(),
            },
            Partition {
                device: "proc".to_string(),
                mount_point: PathBuf::from("/proc"),
                fs_type: "proc".to_string(),
            },
        ])
    }

    fn stat_mount(&self, _mount_point: &Path) -> Result<(), DiskError> {
        Ok(())
    }

    fn usage(&self, _mount_point: &Path) -> Result<VolumeUsage, DiskError> {
        Ok(VolumeUsage {
            total: 200 * 1024 * 1024,
            free: 150 * 1024 * 1024,
            used: 50 * 1024 * 1024,
        })
    }

    fn pseudo_filesystems(&self) -> Result<HashSet<String>, DiskError> {
        Ok(HashSet::from(["proc".to_string()]))
    }

    fn is_removable(&self, _block_device: &str) -> bool {
        true
    }
}

struct FixedStats;

impl DiskStatsSource for FixedStats {
    fn read(&self) -> Result<HashMap<String, DiskIoCounters>, DiskError> {
        Ok(HashMap::from([(
            "nvme0n1p2".to_string(),
            DiskIoCounters {
                reads: 10,
                sectors_read: 4,
                read_time_ms: 3,
                writes: 20,
                sectors_written: 8,
                write_time_ms: 6,
            },
        )]))
    }
}

fn credentials() -> AgentConfig {
    AgentConfig {
        username: "eagle".to_string(),
        password: "hunter2".to_string(),
        ..Default::default()
    }
}

fn app(variant: Variant, config: AgentConfig, load: Arc<CountingLoad>) -> Router {
    app_with_disk(variant, config, load, Arc::new(OneVolume::default()))
}

fn app_with_disk(
    variant: Variant,
    config: AgentConfig,
    load: Arc<CountingLoad>,
    disk: Arc<OneVolume>,
) -> Router {
    let state = AppState::new(Arc::new(config), load, disk, Arc::new(FixedStats));
    create_axum_router(variant, Arc::new(state))
}

fn get(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

fn basic(credentials: &str) -> String {
    format!("Basic {}", STANDARD.encode(credentials))
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

#[tokio::test]
async fn test_public_load_avg_returns_four_numeric_keys() {
    let load = Arc::new(CountingLoad::default());
    let response = app(Variant::Public, AgentConfig::default(), load.clone())
        .oneshot(get("/api/v1/cpu/load/avg", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );

    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    let obj = json.as_object().unwrap();
    assert_eq!(obj.len(), 4);
    assert_eq!(obj["HostName"], host_name());
    assert_eq!(obj["Loadavg1"].as_f64(), Some(0.42));
    assert_eq!(obj["Loadavg5"].as_f64(), Some(1.5));
    assert_eq!(obj["Loadavg15"].as_f64(), Some(2.25));
    assert_eq!(load.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_public_variant_has_no_disk_routes() {
    let response = app(
        Variant::Public,
        AgentConfig::default(),
        Arc::new(CountingLoad::default()),
    )
    .oneshot(get("/api/v1/disk/usage/stat", None))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_secured_load_avg_with_valid_credentials() {
    let load = Arc::new(CountingLoad::default());
    let response = app(Variant::Secured, credentials(), load.clone())
        .oneshot(get("/api/v1/cpu/load/avg", Some(&basic("eagle:hunter2"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(load.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_secured_rejects_single_character_mismatch() {
    for bad in ["eaglf:hunter2", "eagle:hunter3"] {
        let load = Arc::new(CountingLoad::default());
        let response = app(Variant::Secured, credentials(), load.clone())
            .oneshot(get("/api/v1/cpu/load/avg", Some(&basic(bad))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_bytes(response).await, b"Not authorized");
        assert_eq!(load.calls.load(Ordering::SeqCst), 0);
    }
}

// Each rejected header shape, and whether the 401 body is the fixed text.
const REJECTED_HEADERS: [(Option<&str>, bool); 4] = [
    (None, true),
    (Some("Basicxyz"), true),
    (Some("Basic %%%"), false),
    (Some("Basic ZWFnbGU="), true),
];

#[tokio::test]
async fn test_secured_rejections_never_sample_disks() {
    for (authorization, fixed_message) in REJECTED_HEADERS {
        let load = Arc::new(CountingLoad::default());
        let disk = Arc::new(OneVolume::default());
        let response = app_with_disk(
            Variant::Secured,
            credentials(),
            load.clone(),
            disk.clone(),
        )
        .oneshot(get("/api/v1/disk/usage/stat", authorization))
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{authorization:?}");
        let body = body_bytes(response).await;
        assert_eq!(body == b"Not authorized", fixed_message, "{authorization:?}");
        assert_eq!(disk.listings.load(Ordering::SeqCst), 0, "{authorization:?}");
        assert_eq!(load.calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_secured_rejections_never_sample_load() {
    for (authorization, _) in REJECTED_HEADERS {
        let load = Arc::new(CountingLoad::default());
        let response = app(Variant::Secured, credentials(), load.clone())
            .oneshot(get("/api/v1/cpu/load/avg", authorization))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{authorization:?}");
        assert_eq!(load.calls.load(Ordering::SeqCst), 0, "{authorization:?}");
    }
}

#[tokio::test]
async fn test_secured_rejects_bad_base64_with_decode_message() {
    let response = app(
        Variant::Secured,
        credentials(),
        Arc::new(CountingLoad::default()),
    )
    .oneshot(get("/api/v1/cpu/load/avg", Some("Basic %%%")))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(!body.is_empty());
    assert_ne!(body, "Not authorized");
}

#[tokio::test]
async fn test_disk_usage_report() {
    let disk = Arc::new(OneVolume::default());
    let response = app_with_disk(
        Variant::Secured,
        credentials(),
        Arc::new(CountingLoad::default()),
        disk.clone(),
    )
    .oneshot(get("/api/v1/disk/usage/stat", Some(&basic("eagle:hunter2"))))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(disk.listings.load(Ordering::SeqCst), 1);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );

    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    let volumes = json.as_array().unwrap();
    assert_eq!(volumes.len(), 1);

    let root = &volumes[0];
    assert_eq!(root["Hostname"], host_name());
    assert_eq!(root["name"], "nvme0n1p2");
    assert_eq!(root["path"], "/");
    assert_eq!(root["fstype"], "ext4");
    assert_eq!(root["total"], "200");
    assert_eq!(root["free"], "150");
    assert_eq!(root["used"], "50");
    assert_eq!(root["percent"].as_f64(), Some(25.0));
}

#[tokio::test]
async fn test_disk_io_report() {
    let response = app(
        Variant::Secured,
        credentials(),
        Arc::new(CountingLoad::default()),
    )
    .oneshot(get("/api/v1/disk/io/stat", Some(&basic("eagle:hunter2"))))
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    let devices = json.as_array().unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0]["name"], "nvme0n1p2");
    assert_eq!(devices[0]["reads"].as_u64(), Some(10));
    assert_eq!(devices[0]["bytes.read"].as_u64(), Some(4 * 512));
    assert_eq!(devices[0]["bytes.write"].as_u64(), Some(8 * 512));
}

#[tokio::test]
async fn test_load_failure_degrades_to_null_body() {
    let load = Arc::new(CountingLoad {
        fail: true,
        ..Default::default()
    });
    let response = app(Variant::Public, AgentConfig::default(), load)
        .oneshot(get("/api/v1/cpu/load/avg", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"null");
}

#[tokio::test]
async fn test_load_failure_in_strict_mode_is_unavailable() {
    let load = Arc::new(CountingLoad {
        fail: true,
        ..Default::default()
    });
    let config = AgentConfig {
        strict_sampling: true,
        ..Default::default()
    };
    let response = app(Variant::Public, config, load)
        .oneshot(get("/api/v1/cpu/load/avg", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(json["error"].as_str().unwrap().contains("loadavg"));
}

#[test]
fn test_variant_listen_addresses() {
    assert_eq!(Variant::Public.listen_address().to_string(), "0.0.0.0:3000");
    assert_eq!(Variant::Secured.listen_address().to_string(), "0.0.0.0:10052");
}
