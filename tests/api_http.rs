// tests/api_http.rs
//
// HTTP surface tests via tower::oneshot, no live server. State is wired
// by hand so the tests own their catalog and never touch the network.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::Router;
use http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

use funding_advisor::api::{create_router, AppState};
use funding_advisor::catalog::{Catalog, CatalogHandle};
use funding_advisor::polish::DisabledPolisher;
use funding_advisor::registry::RegistryClient;
use funding_advisor::weights::HotReloadPolicy;

fn test_catalog() -> Catalog {
    Catalog::from_json_value(
        "test",
        json!([
            {
                "id": "bf-tempo",
                "name": "Tempo Funding",
                "provider": "Business Finland",
                "url": "https://example.org/tempo",
                "eligible_stages": ["pre-seed", "seed"],
                "need_types": ["RDI", "internationalization"],
                "geography_scope": "national",
                "amount_min": 10_000,
                "amount_max": 60_000
            },
            {
                "id": "foreign-fund",
                "name": "Foreign Fund",
                "provider": "Elsewhere",
                "url": "https://example.org/foreign",
                "eligible_stages": ["scale-up"],
                "need_types": ["working capital"],
                "geography_scope": "other"
            }
        ]),
    )
    .unwrap()
}

fn test_app() -> Router {
    let state = AppState {
        catalog: CatalogHandle::new(test_catalog()),
        catalog_source: "test".to_string(),
        policy: Arc::new(HotReloadPolicy::new(Some(std::path::Path::new(
            "no-such-policy.json",
        )))),
        polisher: Arc::new(DisabledPolisher),
        polish_timeout: Duration::from_secs(1),
        registry: Arc::new(RegistryClient::with_base_url("http://127.0.0.1:9")),
    };
    create_router(state)
}

async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn seed_request() -> Value {
    json!({
        "name": "Example AI Startup",
        "industry": ["software", "AI"],
        "revenue_class": "<250k",
        "employees": 5,
        "stage": "seed",
        "funding_need_types": ["RDI", "internationalization"],
        "funding_amount_min": 20_000,
        "funding_amount_max": 50_000,
        "country": "Finland"
    })
}

#[tokio::test]
async fn health_reports_catalog_count() {
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = test_app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["status"], json!("ok"));
    assert_eq!(v["instrument_count"], json!(2));
}

#[tokio::test]
async fn recommendations_rank_the_matching_instrument_first() {
    let (status, body) = post_json(test_app(), "/recommendations", seed_request()).await;
    assert_eq!(status, StatusCode::OK);

    let items = body.as_array().expect("array response");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["instrument"]["id"], json!("bf-tempo"));

    let top_score = items[0]["score"].as_f64().unwrap();
    let bottom_score = items[1]["score"].as_f64().unwrap();
    assert!(top_score > bottom_score);
    assert!((0.0..=100.0).contains(&top_score));

    assert!(items[0]["reasons"]
        .as_array()
        .map(|r| !r.is_empty())
        .unwrap_or(false));
    assert!(items[0]["explanation"]
        .as_str()
        .map(|s| !s.is_empty())
        .unwrap_or(false));
    // Polishing was not requested; the rule-based text stands.
    assert!(items[1]["explanation"].as_str().is_some());
}

#[tokio::test]
async fn min_score_and_limit_are_honored() {
    let mut req = seed_request();
    req["min_score"] = json!(99.5);
    let (status, body) = post_json(test_app(), "/recommendations", req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().len() <= 1);

    let mut req = seed_request();
    req["limit"] = json!(1);
    let (_, body) = post_json(test_app(), "/recommendations", req).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["instrument"]["id"], json!("bf-tempo"));
}

#[tokio::test]
async fn empty_needs_rejected_with_400_and_the_violated_constraint() {
    let mut req = seed_request();
    req["funding_need_types"] = json!([]);
    let (status, body) = post_json(test_app(), "/recommendations", req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let msg = body["error"].as_str().unwrap();
    assert!(msg.contains("funding_need_types"), "got: {msg}");
}

#[tokio::test]
async fn inverted_amount_range_rejected_with_400() {
    let mut req = seed_request();
    req["funding_amount_min"] = json!(500_000);
    let (status, body) = post_json(test_app(), "/recommendations", req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("inverted"));
}

#[tokio::test]
async fn unknown_stage_is_a_deserialization_error() {
    let mut req = seed_request();
    req["stage"] = json!("unicorn");
    let (status, _) = post_json(test_app(), "/recommendations", req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
