use chrono::{Duration, Utc};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use workoutterm::data::WorkoutCache;
use workoutterm::{ApiError, Config, WorkoutAPI};

mod common;
use common::init_tracing;

fn row(id: usize, day: &str) -> Value {
    json!({
        "id": format!("w{}", id),
        "user_id": "user-1",
        "workout_type": "run",
        "duration_minutes": 30,
        "notes": null,
        "workout_date": day,
    })
}

fn page_body(rows: Vec<Value>, page: u32, limit: u32, total: u64) -> Value {
    let pages = (total as f64 / limit as f64).ceil() as u32;
    json!({
        "workouts": rows,
        "pagination": { "page": page, "limit": limit, "total": total, "pages": pages },
    })
}

fn config_for(server: &MockServer, data_dir: &std::path::Path) -> Config {
    Config {
        api_url: Some(format!("{}/api/", server.uri())),
        api_token: Some("secret-token".to_string()),
        page_size: 2,
        data_dir: Some(data_dir.to_path_buf()),
    }
}

#[tokio::test]
async fn fetch_all_workouts_walks_every_page() {
    init_tracing();
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let pages = [
        vec![row(0, "2024-01-05"), row(1, "2024-01-04")],
        vec![row(2, "2024-01-03"), row(3, "2024-01-02")],
        vec![row(4, "2024-01-01")],
    ];
    for (i, rows) in pages.into_iter().enumerate() {
        let page = (i + 1) as u32;
        Mock::given(method("GET"))
            .and(path("/api/workouts"))
            .and(query_param("page", page.to_string()))
            .and(query_param("limit", "2"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(rows, page, 2, 5)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let api = WorkoutAPI::new(config_for(&server, dir.path())).unwrap();
    let records = api.fetch_all_workouts().await.unwrap();

    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["w0", "w1", "w2", "w3", "w4"]);
}

#[tokio::test]
async fn empty_store_needs_a_single_request() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/workouts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(vec![], 1, 2, 0)))
        .expect(1)
        .mount(&server)
        .await;

    let api = WorkoutAPI::new(config_for(&server, dir.path())).unwrap();
    assert!(api.fetch_all_workouts().await.unwrap().is_empty());
}

#[tokio::test]
async fn error_status_is_reported_with_endpoint() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/workouts"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Invalid token" })))
        .mount(&server)
        .await;

    let api = WorkoutAPI::new(config_for(&server, dir.path())).unwrap();
    let err = api.test_connection().await.unwrap_err();

    match err.downcast_ref::<ApiError>() {
        Some(ApiError::RequestFailed {
            endpoint,
            status,
            message,
        }) => {
            assert_eq!(endpoint, "/workouts");
            assert_eq!(*status, 401);
            assert!(message.contains("Invalid token"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn malformed_body_is_a_parse_error() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/workouts"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let api = WorkoutAPI::new(config_for(&server, dir.path())).unwrap();
    let err = api.fetch_page(1, 2).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::ParseError { .. })
    ));
}

#[tokio::test]
async fn missing_url_is_reported_before_any_request() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        data_dir: Some(dir.path().to_path_buf()),
        page_size: 10,
        ..Config::default()
    };

    let api = WorkoutAPI::new(config).unwrap();
    let err = api.fetch_page(1, 10).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::NotConfigured("WORKOUTTERM_API_URL"))
    ));
}

#[tokio::test]
async fn fresh_cache_is_served_without_hitting_the_store() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/workouts"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_body(vec![row(0, "2024-02-01")], 1, 2, 1)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = WorkoutAPI::new(config_for(&server, dir.path())).unwrap();

    let refreshed = api.refresh_records().await.unwrap();
    assert!(refreshed.refreshed_at.is_some());
    assert!(dir.path().join("cache.json").exists());

    // Second load comes from disk; the mock's `expect(1)` verifies on drop.
    let cached = api.load_cached_or_refresh().await.unwrap();
    assert_eq!(cached.records, refreshed.records);
}

#[tokio::test]
async fn stale_cache_is_refreshed_from_the_store() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&server, dir.path());

    config
        .save_cache(&WorkoutCache {
            records: vec![],
            refreshed_at: Some(Utc::now() - Duration::hours(2)),
        })
        .unwrap();

    let mut undated = row(1, "");
    undated["workout_date"] = Value::Null;
    Mock::given(method("GET"))
        .and(path("/api/workouts"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_body(vec![row(0, "2024-02-01"), undated], 1, 2, 2)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = WorkoutAPI::new(config).unwrap();
    let cache = api.load_cached_or_refresh().await.unwrap();

    assert_eq!(cache.records.len(), 2);
    assert!(cache.refreshed_at.unwrap() > Utc::now() - Duration::minutes(1));
    assert!(cache.records[1].date().is_err());
}
