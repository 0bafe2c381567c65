use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::clients::ServiceLocationClient;
use crate::config::ServiceConfig;
use crate::error::PredictionError;
use crate::geo::GeoCoordinate;
use crate::models::{ApproachLabel, PredictionStatus};
use crate::predictor::{ArrivalFilter, ArrivalPredictor, EtaReport, StopArrivals};
use crate::store::PredictionStore;

mod clients;
mod config;
mod error;
mod geo;
mod models;
mod predictor;
mod store;

#[derive(Clone)]
struct AppState {
    predictor: Arc<ArrivalPredictor>,
    store: PredictionStore,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

// Query parameters use one canonical camelCase spelling; anything else is
// rejected with a 400 instead of being aliased.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct EtaParams {
    bus_id: i64,
    stop_id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ArrivalsParams {
    route_id: Option<i64>,
    bus_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EtaResponse {
    bus_id: i64,
    bus_number: String,
    stop_id: i64,
    stop_name: String,
    distance: f64,
    eta: i64,
    average_speed: f64,
    bus_location: GeoCoordinate,
    stop_location: GeoCoordinate,
    status: PredictionStatus,
}

impl From<EtaReport> for EtaResponse {
    fn from(report: EtaReport) -> Self {
        let prediction = report.prediction;
        Self {
            bus_id: prediction.bus_id,
            bus_number: prediction.bus_number,
            stop_id: prediction.stop_id,
            stop_name: prediction.stop_name,
            distance: round2(prediction.distance_km),
            eta: prediction.eta_minutes,
            average_speed: report.average_speed_kmh,
            bus_location: report.bus_location,
            stop_location: report.stop_location,
            status: prediction.status,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ArrivalEntry {
    bus_id: i64,
    bus_number: String,
    route_id: i64,
    route_name: String,
    eta: i64,
    distance: f64,
    status: ApproachLabel,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ArrivalsResponse {
    stop_id: i64,
    stop_name: String,
    total_arrivals: usize,
    arrivals: Vec<ArrivalEntry>,
}

impl From<StopArrivals> for ArrivalsResponse {
    fn from(listing: StopArrivals) -> Self {
        Self {
            stop_id: listing.stop_id,
            stop_name: listing.stop_name,
            total_arrivals: listing.total_arrivals,
            arrivals: listing
                .arrivals
                .into_iter()
                .map(|arrival| ArrivalEntry {
                    bus_id: arrival.bus_id,
                    bus_number: arrival.bus_number,
                    route_id: arrival.route_id,
                    route_name: arrival.route_name,
                    eta: arrival.eta_minutes,
                    distance: round2(arrival.distance_km),
                    status: arrival.label,
                })
                .collect(),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn error_response(err: PredictionError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err {
        PredictionError::RosterUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        PredictionError::BusNotFound(_) | PredictionError::StopNotFound(_) => StatusCode::NOT_FOUND,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

// GET /eta?busId=..&stopId=..
async fn get_eta(
    State(state): State<AppState>,
    Query(params): Query<EtaParams>,
) -> Result<Json<EtaResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.predictor.predict_eta(params.bus_id, params.stop_id).await {
        Ok(report) => Ok(Json(report.into())),
        Err(err) => Err(error_response(err)),
    }
}

// GET /stops/{stopId}/arrivals[?routeId=..][&busId=..]
async fn get_stop_arrivals(
    State(state): State<AppState>,
    Path(stop_id): Path<i64>,
    Query(params): Query<ArrivalsParams>,
) -> Result<Json<ArrivalsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let filter = ArrivalFilter {
        route_id: params.route_id,
        bus_id: params.bus_id,
    };
    match state.predictor.list_approaching(stop_id, filter).await {
        Ok(listing) => Ok(Json(listing.into())),
        Err(err) => Err(error_response(err)),
    }
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let database_ok = state.store.ping().await;
    Json(json!({
        "status": if database_ok { "healthy" } else { "degraded" },
        "service": "schedule-service",
        "database": if database_ok { "connected" } else { "unreachable" },
    }))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServiceConfig::from_env();

    let store = PredictionStore::connect(&config.database_url)
        .await
        .expect("failed to open prediction database");
    store
        .init()
        .await
        .expect("failed to initialize prediction database");

    let clients =
        ServiceLocationClient::new(&config).expect("failed to build upstream HTTP client");
    let predictor = Arc::new(ArrivalPredictor::new(clients, store.clone()));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = AppState { predictor, store };

    let app = Router::new()
        .route("/eta", get(get_eta))
        .route("/stops/{stop_id}/arrivals", get(get_stop_arrivals))
        .route("/health", get(health_check))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap();

    info!(addr = %config.bind_addr, "schedule service listening");
    axum::serve(listener, app).await.unwrap();
}
