use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::Result;
use crate::models::Property;
use crate::pipeline::TrackOutcome;
use crate::server::state::AppState;
use crate::tracker::PendingBatch;

pub async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
pub struct ProxyRequest {
    pub query: String,
    #[serde(default)]
    pub variables: Value,
}

/// Forward an arbitrary query to the upstream. Successful responses carry
/// the GraphQL envelope; upstream GraphQL errors surface as 400 via the
/// error mapping.
pub async fn graphql_proxy(
    State(state): State<AppState>,
    Json(request): Json<ProxyRequest>,
) -> Result<Json<Value>> {
    let data = state
        .service()?
        .send_raw(&request.query, request.variables)
        .await?;
    Ok(Json(json!({ "data": data })))
}

#[derive(Debug, Deserialize)]
pub struct FeaturedParams {
    #[serde(default = "default_featured_limit")]
    pub limit: usize,
}

fn default_featured_limit() -> usize {
    5
}

pub async fn featured(
    State(state): State<AppState>,
    Query(params): Query<FeaturedParams>,
) -> Result<Json<Value>> {
    let cards = state.service()?.featured(params.limit).await?;
    Ok(Json(json!({ "properties": cards })))
}

pub async fn property_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Property>> {
    let property = state.service()?.by_slug(&slug).await?;
    Ok(Json(property))
}

/// Apply a batch of queued view/share events to the upstream counters.
pub async fn track(
    State(state): State<AppState>,
    Json(batch): Json<PendingBatch>,
) -> Result<Json<TrackOutcome>> {
    debug!(events = batch.len(), "Applying tracking batch");
    let outcome = state.service()?.apply_tracking(&batch).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn location_search(
    State(state): State<AppState>,
    Query(params): Query<LocationQuery>,
) -> Result<Json<Value>> {
    // Short queries short-circuit before the upstream is consulted, so
    // they work even on an unconfigured server.
    if params.q.trim().chars().count() < 2 {
        return Ok(Json(json!({ "locations": [] })));
    }

    let locations = state.service()?.location_suggestions(&params.q).await?;
    Ok(Json(json!({ "locations": locations })))
}

pub async fn enums(State(state): State<AppState>) -> Result<Json<Value>> {
    if let Some(catalog) = state.enum_cache.get() {
        debug!("Serving enum catalog from cache");
        return Ok(Json(json!({ "enums": catalog })));
    }

    let catalog = state.service()?.enums().await?;
    state.enum_cache.put(catalog.clone());
    Ok(Json(json!({ "enums": catalog })))
}
