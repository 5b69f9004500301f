use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use metrics_util::debugging::DebuggingRecorder;
use serde_json::json;
use solar_sentinel::application::forecast::{ForecastRequest, ForecastService};
use solar_sentinel::cache::{CacheSweeper, ForecastStore};
use solar_sentinel::domain::location::Location;
use solar_sentinel::infra::telemetry;
use solar_sentinel::infra::upstream::OpenMeteoClient;
use solar_sentinel::util::date::iso_date;
use solar_sentinel::util::timezone::reference_today;
use time::OffsetDateTime;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn forecast_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let today = reference_today(OffsetDateTime::now_utc());
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hourly": {
                "time": [format!("{}T12:00", iso_date(today))],
                "uv_index": [6.5],
            }
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let base = Url::parse(&format!("{}/v1/forecast", server.uri())).expect("base url");
    let store = Arc::new(ForecastStore::new());
    let service = ForecastService::new(
        Arc::new(OpenMeteoClient::new(base, None).expect("client")),
        Arc::clone(&store),
    );
    let request = ForecastRequest {
        location: Location::new(40.7206, -74.3637).expect("location"),
        date: today,
    };

    // Miss, then a hit whose background refresh fails upstream.
    let miss = service.hourly(request).await.expect("miss");
    assert!(!miss.cached);
    let hit = service.hourly(request).await.expect("hit");
    assert!(hit.cached);
    service.wait_for_background().await;
    assert_eq!(store.len(), 1);

    let removed = CacheSweeper::new(Arc::clone(&store), Duration::from_secs(60)).sweep_now();
    assert_eq!(removed, 0);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "solar_sentinel_cache_hit_total",
        "solar_sentinel_cache_miss_total",
        "solar_sentinel_refresh_total",
        "solar_sentinel_refresh_failed_total",
        "solar_sentinel_upstream_request_ms",
        "solar_sentinel_cache_entries",
        "solar_sentinel_cache_sweep_evicted_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
