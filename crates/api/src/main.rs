use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use stockcheck_core::config::Settings;
use stockcheck_core::diagnostics::{validation_suite, CheckResult};
use stockcheck_core::domain::factors::{group_weight_pct, Factor, FACTORS};
use stockcheck_core::domain::run_config::{RunConfig, RunInput};
use stockcheck_core::error::{ErrorCode, ModelError};
use stockcheck_core::storage::runs::StoredRun;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();
    let pool: Option<PgPool> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match stockcheck_core::storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
                None
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "DATABASE_URL missing; starting API in degraded mode");
            None
        }
    };

    let state = AppState {
        pool,
        settings: Arc::new(settings),
    };

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/factors", get(get_factors))
        .route("/runs", post(create_run))
        .route("/runs/latest", get(get_latest_run))
        .route("/runs/latest/diagnostics", get(get_latest_diagnostics))
        .route("/runs/:id", get(get_run_by_id))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Clone)]
struct AppState {
    pool: Option<PgPool>,
    settings: Arc<Settings>,
}

/// Error body: `{ "error": { "code", "message", "details"? } }`.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<serde_json::Value>,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    fn unavailable() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "STORAGE_UNAVAILABLE",
            "run storage is not configured",
        )
    }

    fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", "run not found")
    }

    fn internal(err: anyhow::Error) -> Self {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %format!("{err:#}"), "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", "internal error")
    }

    /// Coded model errors keep their code; config problems are the caller's fault, upstream
    /// problems are a bad gateway.
    fn from_run_error(err: anyhow::Error) -> Self {
        let coded = err
            .chain()
            .find_map(|e| e.downcast_ref::<ModelError>())
            .map(|m| (m.code, m.message.clone(), m.details.clone()));
        let Some((code, message, details)) = coded else {
            return Self::internal(err);
        };
        sentry_anyhow::capture_anyhow(&err);

        let status = match code {
            ErrorCode::ConfigInvalid => StatusCode::BAD_REQUEST,
            ErrorCode::LiveNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::LiveMissingData => StatusCode::BAD_GATEWAY,
            c if c.is_upstream() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(code = code.as_str(), error = %message, "model run failed");
        Self {
            status,
            code: code.as_str(),
            message,
            details,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut error = json!({ "code": self.code, "message": self.message });
        if let Some(details) = self.details {
            error["details"] = details;
        }
        (self.status, Json(json!({ "error": error }))).into_response()
    }
}

#[derive(Debug, Serialize)]
struct FactorView {
    #[serde(flatten)]
    factor: &'static Factor,
    group_label: &'static str,
    group_weight_pct: f64,
}

async fn get_factors() -> Json<Vec<FactorView>> {
    Json(
        FACTORS
            .iter()
            .map(|factor| FactorView {
                factor,
                group_label: factor.group.label(),
                group_weight_pct: group_weight_pct(factor.group),
            })
            .collect(),
    )
}

#[derive(Debug, Deserialize)]
struct CreateRunRequest {
    #[serde(default)]
    config: Option<RunConfig>,
    current_date: Option<String>,
    prediction_date: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateRunResponse {
    /// Absent when the API runs without storage.
    run_id: Option<Uuid>,
    #[serde(flatten)]
    result: stockcheck_core::domain::contract::RunResult,
}

async fn create_run(
    State(state): State<AppState>,
    Json(req): Json<CreateRunRequest>,
) -> Result<(StatusCode, Json<CreateRunResponse>), ApiError> {
    let config = req.config.unwrap_or_default();
    let issues = config.issues();
    if !issues.is_empty() {
        let mut err = ApiError::new(StatusCode::BAD_REQUEST, "CONFIG_INVALID", issues.join(" "));
        err.details = Some(json!({ "issues": issues }));
        return Err(err);
    }

    let dates = stockcheck_core::time::run_dates::resolve_run_dates(
        req.current_date.as_deref(),
        req.prediction_date.as_deref(),
        chrono::Utc::now(),
    )
    .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, "INVALID_DATE", format!("{e:#}")))?;

    let input = RunInput {
        config,
        current_date: dates.current_date,
        prediction_date: dates.prediction_date,
    };

    let result = stockcheck_core::run::run_model(&input, &state.settings)
        .await
        .map_err(ApiError::from_run_error)?;

    let run_id = match &state.pool {
        Some(pool) => Some(
            stockcheck_core::storage::runs::persist_run(pool, &input.config, &result)
                .await
                .map_err(ApiError::internal)?,
        ),
        None => None,
    };

    Ok((StatusCode::CREATED, Json(CreateRunResponse { run_id, result })))
}

async fn get_latest_run(State(state): State<AppState>) -> Result<Json<StoredRun>, ApiError> {
    let Some(pool) = &state.pool else {
        return Err(ApiError::unavailable());
    };

    let run = stockcheck_core::storage::runs::fetch_latest_run(pool)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(ApiError::not_found)?;

    Ok(Json(run))
}

async fn get_run_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StoredRun>, ApiError> {
    let Some(pool) = &state.pool else {
        return Err(ApiError::unavailable());
    };

    let id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, "INVALID_ID", "run id must be a UUID"))?;

    let run = stockcheck_core::storage::runs::fetch_run(pool, id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(ApiError::not_found)?;

    Ok(Json(run))
}

#[derive(Debug, Serialize)]
struct DiagnosticsResponse {
    run_id: Option<Uuid>,
    checks: Vec<CheckResult>,
}

/// Without storage or without any run yet, the suite still reports the factor matrix check.
async fn get_latest_diagnostics(
    State(state): State<AppState>,
) -> Result<Json<DiagnosticsResponse>, ApiError> {
    let latest = match &state.pool {
        Some(pool) => stockcheck_core::storage::runs::fetch_latest_run(pool)
            .await
            .map_err(ApiError::internal)?,
        None => None,
    };

    Ok(Json(DiagnosticsResponse {
        run_id: latest.as_ref().map(|r| r.id),
        checks: validation_suite(latest.as_ref().map(|r| &r.result)),
    }))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn degraded_app() -> Router {
        router(AppState {
            pool: None,
            settings: Arc::new(Settings::default()),
        })
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn post_runs(body: serde_json::Value) -> Request<Body> {
        Request::post("/runs")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn lists_the_factor_matrix() {
        let (status, body) = send(
            degraded_app(),
            Request::get("/factors").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(43));
        assert_eq!(body[0]["key"], "momentum_5d");
        assert_eq!(body[0]["group"], "momentum_price_structure");
        assert_eq!(body[0]["group_label"], "Momentum & Price Structure");
        let weight = body[0]["group_weight_pct"].as_f64().unwrap();
        assert!((weight - 18.0).abs() < 1e-9, "weight={weight}");
        assert_eq!(body[42]["group_label"], "Macro Overlay Inputs");
    }

    #[tokio::test]
    async fn oversized_mock_universe_is_rejected() {
        let (status, body) = send(
            degraded_app(),
            post_runs(json!({
                "config": { "data_mode": "MOCK", "mock_seed": 1, "mock_universe_size": 1e11 }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "CONFIG_INVALID");
        assert_eq!(
            body["error"]["details"]["issues"][0],
            "mock_universe_size must be ≤ 100000."
        );
    }

    #[tokio::test]
    async fn mock_run_works_without_storage() {
        let (status, body) = send(
            degraded_app(),
            post_runs(json!({
                "config": { "data_mode": "MOCK", "mock_seed": 42, "mock_universe_size": 1200 },
                "current_date": "2026-01-05"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["run_id"].is_null());
        assert_eq!(body["prediction_date"], "2026-01-06");
        assert_eq!(body["results"].as_array().map(Vec::len), Some(11));
        assert_eq!(body["results"][10]["Ticker"], "INTC");
    }

    #[tokio::test]
    async fn invalid_config_is_bad_request_with_issues() {
        let (status, body) = send(
            degraded_app(),
            post_runs(json!({ "config": { "data_mode": "MOCK", "mock_seed": 1, "mock_universe_size": 999 } })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "CONFIG_INVALID");
        assert_eq!(body["error"]["details"]["issues"][0], "mock_universe_size must be ≥ 1000.");
    }

    #[tokio::test]
    async fn live_without_key_reports_code() {
        let (status, body) = send(degraded_app(), post_runs(json!({}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "LIVE_NOT_CONFIGURED");
    }

    #[tokio::test]
    async fn stored_runs_need_storage() {
        let (status, _) = send(
            degraded_app(),
            Request::get("/runs/latest").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn diagnostics_without_runs_flag_missing_output() {
        let (status, body) = send(
            degraded_app(),
            Request::get("/runs/latest/diagnostics").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checks"][0]["ok"], true);
        assert_eq!(body["checks"][1]["name"], "Output available");
        assert_eq!(body["checks"][1]["ok"], false);
    }
}
