//! Axum HTTP surface: recommendation endpoints, health, and the admin
//! catalog reload. Thin layer over the pure engine — handlers validate,
//! take a catalog snapshot, score, rank, and render.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::catalog::{Catalog, CatalogHandle};
use crate::polish::{self, DynPolisher, PolishContext};
use crate::profile::{Geography, NeedType, RequestProfile, Stage};
use crate::ranker::{self, RankOptions};
use crate::registry::{ProfileSeed, RegistryClient, RegistryError};
use crate::scoring;
use crate::weights::HotReloadPolicy;

pub const DEFAULT_CATALOG_SOURCE: &str = "config/funding_instruments.json";
pub const ENV_CATALOG_SOURCE: &str = "INSTRUMENTS_SOURCE";

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogHandle,
    pub catalog_source: String,
    pub policy: Arc<HotReloadPolicy>,
    pub polisher: DynPolisher,
    pub polish_timeout: std::time::Duration,
    pub registry: Arc<RegistryClient>,
}

/// Build the full application with default wiring: catalog from
/// `INSTRUMENTS_SOURCE` (or the bundled dataset), polisher from config.
pub async fn app() -> anyhow::Result<Router> {
    let source = std::env::var(ENV_CATALOG_SOURCE)
        .unwrap_or_else(|_| DEFAULT_CATALOG_SOURCE.to_string());
    let catalog = Catalog::load(&source).await?;
    info!(source = %source, count = catalog.len(), "catalog loaded");

    let polish_cfg = polish::load_polish_config();
    let state = AppState {
        catalog: CatalogHandle::new(catalog),
        catalog_source: source,
        policy: Arc::new(HotReloadPolicy::new(None)),
        polisher: polish::build_polisher(&polish_cfg),
        polish_timeout: polish_cfg.timeout(),
        registry: Arc::new(RegistryClient::new()),
    };
    Ok(create_router(state))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/recommendations", post(recommendations))
        .route(
            "/recommendations/by-business-id",
            post(recommendations_by_business_id),
        )
        .route("/admin/reload-catalog", get(admin_reload_catalog))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn bad_request(msg: impl ToString) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: msg.to_string(),
        }),
    )
}

#[derive(Deserialize)]
struct RecommendRequest {
    name: String,
    #[serde(default)]
    business_id: Option<String>,
    #[serde(default)]
    industry: Vec<String>,
    revenue_class: String,
    employees: u32,
    stage: Stage,
    funding_need_types: Vec<NeedType>,
    #[serde(default)]
    funding_amount_min: Option<i64>,
    #[serde(default)]
    funding_amount_max: Option<i64>,
    #[serde(default = "default_country")]
    country: String,
    #[serde(default)]
    region: Option<String>,
    #[serde(flatten)]
    options: RequestOptions,
}

#[derive(Deserialize)]
struct ByBusinessIdRequest {
    business_id: String,
    stage: Stage,
    revenue_class: String,
    employees: u32,
    funding_need_types: Vec<NeedType>,
    #[serde(default)]
    funding_amount_min: Option<i64>,
    #[serde(default)]
    funding_amount_max: Option<i64>,
    #[serde(default)]
    region: Option<String>,
    #[serde(flatten)]
    options: RequestOptions,
}

/// Knobs shared by both recommendation endpoints.
#[derive(Deserialize, Default)]
struct RequestOptions {
    /// Opt-in to the text polisher; rule-based text is the fallback.
    #[serde(default)]
    polish: bool,
    #[serde(default)]
    min_score: Option<f32>,
    #[serde(default)]
    limit: Option<usize>,
}

fn default_country() -> String {
    "Finland".to_string()
}

#[derive(Serialize)]
struct InstrumentOut {
    id: String,
    name: String,
    provider: String,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    deadline: Option<NaiveDate>,
}

#[derive(Serialize)]
struct Recommendation {
    instrument: InstrumentOut,
    score: f32,
    reasons: Vec<String>,
    explanation: String,
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Funding Advisor API. POST /recommendations to rank instruments."
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let snapshot = state.catalog.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "instrument_source": state.catalog_source,
        "instrument_count": snapshot.len(),
    }))
}

async fn recommendations(
    State(state): State<AppState>,
    Json(body): Json<RecommendRequest>,
) -> Result<Json<Vec<Recommendation>>, ApiError> {
    let mut geography = Geography::new(body.country);
    geography.region = body.region;
    let profile = RequestProfile {
        name: body.name,
        business_id: body.business_id,
        industry: body.industry,
        revenue_class: body.revenue_class,
        employees: body.employees,
        stage: body.stage,
        needs: body.funding_need_types.into_iter().collect(),
        amount_min: body.funding_amount_min,
        amount_max: body.funding_amount_max,
        geography: Some(geography),
    };
    let out = recommend(&state, profile, body.options).await?;
    Ok(Json(out))
}

async fn recommendations_by_business_id(
    State(state): State<AppState>,
    Json(body): Json<ByBusinessIdRequest>,
) -> Result<Json<Vec<Recommendation>>, ApiError> {
    let seed = ProfileSeed {
        stage: body.stage,
        revenue_class: body.revenue_class,
        employees: body.employees,
        needs: body.funding_need_types.into_iter().collect(),
        amount_min: body.funding_amount_min,
        amount_max: body.funding_amount_max,
        region: body.region,
    };
    let profile = state
        .registry
        .resolve_profile(&body.business_id, seed)
        .await
        .map_err(registry_error)?;
    let out = recommend(&state, profile, body.options).await?;
    Ok(Json(out))
}

fn registry_error(err: RegistryError) -> ApiError {
    let status = match &err {
        RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
        RegistryError::RateLimited => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    };
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
}

/// Shared scoring path: validate, snapshot, score, rank, render, polish.
async fn recommend(
    state: &AppState,
    profile: RequestProfile,
    options: RequestOptions,
) -> Result<Vec<Recommendation>, ApiError> {
    profile.validate().map_err(bad_request)?;

    let snapshot = state.catalog.snapshot();
    let policy = state.policy.current();
    let today = Utc::now().date_naive();

    let results: Vec<_> = snapshot
        .records()
        .iter()
        .map(|inst| scoring::score(&profile, inst, &policy, today))
        .collect();
    let ranked = ranker::rank(
        results,
        RankOptions {
            min_score: options.min_score,
            limit: options.limit,
        },
    );

    let mut out = Vec::with_capacity(ranked.len());
    for result in ranked {
        // The id came out of this snapshot moments ago.
        let Some(inst) = snapshot.get(&result.instrument_id) else {
            continue;
        };
        let explanation = if options.polish {
            let ctx = PolishContext::new(&inst.name, &inst.provider, &result);
            polish::polish_or_fallback(
                &state.polisher,
                &result.explanation,
                &ctx,
                state.polish_timeout,
            )
            .await
        } else {
            result.explanation.clone()
        };
        out.push(Recommendation {
            instrument: InstrumentOut {
                id: inst.id.clone(),
                name: inst.name.clone(),
                provider: inst.provider.clone(),
                url: inst.url.clone(),
                deadline: inst.deadline,
            },
            score: result.score,
            reasons: result.reasons.iter().map(|r| r.phrase.clone()).collect(),
            explanation,
        });
    }
    Ok(out)
}

async fn admin_reload_catalog(State(state): State<AppState>) -> (StatusCode, String) {
    match state.catalog.reload(&state.catalog_source).await {
        Ok(count) => (StatusCode::OK, format!("reloaded: {count} instruments")),
        Err(err) => {
            // The previously validated catalog stays installed.
            error!(error = %err, "catalog reload failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("reload failed: {err}"),
            )
        }
    }
}
