//! HTTP Controller (Driver Adapter)
//!
//! Axum-based REST API that delegates to the control service.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
};

use crate::application::ports::{DecisionOraclePort, ExchangePort, StateStorePort};
use crate::application::use_cases::ControlService;

use super::request::{admin_secret, parse_overrides};
use super::response::{ApiError, ConfigResponse, HealthResponse};

/// Application state shared across handlers.
pub struct AppState<E, O, S>
where
    E: ExchangePort,
    O: DecisionOraclePort,
    S: StateStorePort,
{
    /// Control surface.
    pub control: Arc<ControlService<E, O, S>>,
    /// Application version.
    pub version: String,
}

impl<E, O, S> Clone for AppState<E, O, S>
where
    E: ExchangePort,
    O: DecisionOraclePort,
    S: StateStorePort,
{
    fn clone(&self) -> Self {
        Self {
            control: Arc::clone(&self.control),
            version: self.version.clone(),
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<E, O, S>(state: AppState<E, O, S>) -> Router
where
    E: ExchangePort + 'static,
    O: DecisionOraclePort + 'static,
    S: StateStorePort + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/status", get(get_status))
        .route("/api/v1/run", post(run))
        .route("/api/v1/stop", post(stop))
        .route("/api/v1/tick", post(tick))
        .route("/api/v1/trades/open", get(open_trades))
        .route("/api/v1/trades/closed", get(closed_trades))
        .route("/api/v1/equity", get(equity_series))
        .route("/api/v1/logs", get(logs))
        .with_state(state)
}

async fn health_check<E, O, S>(State(state): State<AppState<E, O, S>>) -> impl IntoResponse
where
    E: ExchangePort,
    O: DecisionOraclePort,
    S: StateStorePort,
{
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
    })
}

async fn get_status<E, O, S>(
    State(state): State<AppState<E, O, S>>,
) -> Result<impl IntoResponse, ApiError>
where
    E: ExchangePort,
    O: DecisionOraclePort,
    S: StateStorePort,
{
    Ok(Json(state.control.get_status().await?))
}

/// Start trading, applying any overrides in the body.
async fn run<E, O, S>(
    State(state): State<AppState<E, O, S>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
    E: ExchangePort,
    O: DecisionOraclePort,
    S: StateStorePort,
{
    let overrides = parse_overrides(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let config = state.control.run(admin_secret(&headers), overrides).await?;
    Ok(Json(ConfigResponse { ok: true, config }))
}

async fn stop<E, O, S>(
    State(state): State<AppState<E, O, S>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError>
where
    E: ExchangePort,
    O: DecisionOraclePort,
    S: StateStorePort,
{
    let config = state.control.stop(admin_secret(&headers)).await?;
    Ok(Json(ConfigResponse { ok: true, config }))
}

/// Run one tick now. An overlapping tick answers `ok: false`.
async fn tick<E, O, S>(State(state): State<AppState<E, O, S>>) -> impl IntoResponse
where
    E: ExchangePort,
    O: DecisionOraclePort,
    S: StateStorePort,
{
    Json(state.control.tick().await)
}

async fn open_trades<E, O, S>(
    State(state): State<AppState<E, O, S>>,
) -> Result<impl IntoResponse, ApiError>
where
    E: ExchangePort,
    O: DecisionOraclePort,
    S: StateStorePort,
{
    Ok(Json(state.control.get_open_trades().await?))
}

async fn closed_trades<E, O, S>(
    State(state): State<AppState<E, O, S>>,
) -> Result<impl IntoResponse, ApiError>
where
    E: ExchangePort,
    O: DecisionOraclePort,
    S: StateStorePort,
{
    Ok(Json(state.control.get_closed_trades().await?))
}

async fn equity_series<E, O, S>(
    State(state): State<AppState<E, O, S>>,
) -> Result<impl IntoResponse, ApiError>
where
    E: ExchangePort,
    O: DecisionOraclePort,
    S: StateStorePort,
{
    Ok(Json(state.control.get_equity_series().await?))
}

async fn logs<E, O, S>(State(state): State<AppState<E, O, S>>) -> Result<impl IntoResponse, ApiError>
where
    E: ExchangePort,
    O: DecisionOraclePort,
    S: StateStorePort,
{
    Ok(Json(state.control.get_logs().await?))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use rust_decimal_macros::dec;
    use tower::ServiceExt;

    use super::*;
    use crate::application::services::{LedgerCapacities, TradeLedger};
    use crate::application::use_cases::RunTickUseCase;
    use crate::domain::EngineTuning;
    use crate::infrastructure::exchange::PaperExchange;
    use crate::infrastructure::http::request::ADMIN_SECRET_HEADER;
    use crate::infrastructure::oracle::ScriptedOracle;
    use crate::infrastructure::persistence::InMemoryStateStore;

    fn router() -> Router {
        let exchange = Arc::new(PaperExchange::new(dec!(1000)));
        let ledger = Arc::new(TradeLedger::new(
            Arc::new(InMemoryStateStore::new()),
            LedgerCapacities::default(),
        ));
        let tick = Arc::new(RunTickUseCase::new(
            exchange,
            Arc::new(ScriptedOracle::new()),
            Arc::clone(&ledger),
            &EngineTuning::default(),
        ));
        let control = Arc::new(ControlService::new(ledger, tick, Some("s3cret".to_string())));
        create_router(AppState {
            control,
            version: "test".to_string(),
        })
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_version() {
        let response = router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["version"], "test");
    }

    #[tokio::test]
    async fn status_returns_config_and_runtime() {
        let response = router()
            .oneshot(Request::builder().uri("/api/v1/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["config"]["status"], "STOPPED");
        assert!(json.get("runtime").is_some());
    }

    #[tokio::test]
    async fn run_without_secret_is_unauthorized() {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/run")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"], "unauthorized");
    }

    #[tokio::test]
    async fn run_with_secret_starts_engine() {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/run")
                    .header(ADMIN_SECRET_HEADER, "s3cret")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"leverageCap": 3}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["ok"], true);
        assert_eq!(json["config"]["status"], "RUNNING");
        assert_eq!(json["config"]["leverageCap"], 3);
    }

    #[tokio::test]
    async fn malformed_overrides_are_bad_request() {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/run")
                    .header(ADMIN_SECRET_HEADER, "s3cret")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn tick_is_open_and_reports_outcome() {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/tick")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json.get("ok").is_some());
        assert!(json.get("meta").is_some());
    }

    #[tokio::test]
    async fn read_endpoints_start_empty() {
        for uri in ["/api/v1/trades/open", "/api/v1/trades/closed", "/api/v1/equity", "/api/v1/logs"] {
            let response = router()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            let json = body_json(response).await;
            assert!(json.as_array().is_some_and(Vec::is_empty), "{uri}");
        }
    }
}
