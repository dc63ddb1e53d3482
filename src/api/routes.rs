use crate::api::api_error::APIError;
use crate::api::model::{valid_dns01, Dns01Request, Http01Request, ZoneUpdateResult, ZoneView};
use crate::api::server::AppState;
use crate::error::Error;
use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::WithRejection;
use serde_json::json;
use std::net::SocketAddr;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub(super) fn new(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(health_check))
        .route("/zone", get(zone).put(replace_zone))
        .route("/challenge/http01", post(http01))
        .route("/challenge/dns01", post(dns01))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.api_timeout))
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn health_check() -> impl IntoResponse {
    Json(json!({"ok":"healthy"}))
}

#[allow(clippy::unused_async)]
async fn zone(State(state): State<AppState>) -> Json<ZoneView> {
    Json(ZoneView::from(&*state.controller.zone()))
}

#[allow(clippy::unused_async)]
async fn replace_zone(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    zone_text: String,
) -> Result<Json<ZoneUpdateResult>, APIError> {
    let client_addr = state.authorize(client_addr)?;
    let published = state.controller.update_zone(&zone_text)?;
    tracing::info!(
        "accepted zone from {client_addr}: generation {}",
        published.generation()
    );
    Ok(Json(ZoneUpdateResult::from(&*published)))
}

#[allow(clippy::unused_async)]
async fn http01(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    WithRejection(Json(payload), _): WithRejection<Json<Http01Request>, APIError>,
) -> Result<Json<ZoneUpdateResult>, APIError> {
    let client_addr = state.authorize(client_addr)?;
    let published = state
        .controller
        .update_http_challenge(payload.domains.as_slice(), &payload.ip)?;
    tracing::info!(
        "accepted HTTP-01 challenge from {client_addr} for {} domain(s): generation {}",
        payload.domains.len(),
        published.generation()
    );
    Ok(Json(ZoneUpdateResult::from(&*published)))
}

#[allow(clippy::unused_async)]
async fn dns01(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    WithRejection(Json(payload), _): WithRejection<Json<Dns01Request>, APIError>,
) -> Result<Json<ZoneUpdateResult>, APIError> {
    let client_addr = state.authorize(client_addr)?;

    if state.config.strict_dns01 {
        for entry in &payload.entries {
            if let Err(err) = valid_dns01(&entry.token) {
                tracing::debug!(
                    "rejected DNS-01 token from {client_addr} for \"{}\": {err}",
                    entry.domain
                );
                return Err(Error::InvalidDNS01(entry.domain.clone()).into());
            }
        }
    }

    let published = state.controller.update_dns_challenge(&payload.entries)?;
    tracing::info!(
        "accepted DNS-01 challenge from {client_addr} for {} domain(s): generation {}",
        payload.entries.len(),
        published.generation()
    );
    Ok(Json(ZoneUpdateResult::from(&*published)))
}
