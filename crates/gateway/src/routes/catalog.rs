//! Catalog route handlers, served from the snapshot store.
//!
//! Each read triggers a refresh that respects the staleness window (or
//! forces one with `?refresh=true`) and then serves whatever the snapshot
//! holds. A failed refresh degrades to the previous data; only a key that
//! has never been fetched successfully turns into an error response.

use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::backend::BackendError;
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::store::{ResourceData, ResourceKey, StoreError};

/// Catalog query string.
#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    /// Force a refresh, ignoring the staleness window.
    #[serde(default)]
    pub refresh: bool,
}

/// GET /api/events
#[instrument(skip(state))]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Value>> {
    serve(&state, ResourceKey::Events, query.refresh).await
}

/// GET /api/categories
#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Value>> {
    serve(&state, ResourceKey::Categories, query.refresh).await
}

/// GET /api/locations
#[instrument(skip(state))]
pub async fn list_locations(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Value>> {
    serve(&state, ResourceKey::Locations, query.refresh).await
}

/// GET /api/orders
#[instrument(skip(state))]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Value>> {
    serve(&state, ResourceKey::Orders, query.refresh).await
}

/// GET /api/balance
///
/// Balance is caller-scoped, so this bypasses the shared store and reads
/// through with the forwarded `Authorization` header.
#[instrument(skip(state, headers))]
pub async fn get_balance(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let auth = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("authorization header is required".to_string()))?;

    let balance = state.backend().get_balance(auth).await.map_err(|err| {
        if matches!(err, BackendError::Status { status: 401 | 403, .. }) {
            AppError::Unauthorized("invalid credentials".to_string())
        } else {
            AppError::Backend(err)
        }
    })?;

    Ok(Json(json!({ "balance": balance })))
}

/// Refresh (staleness-aware) and serve one resource from the store.
async fn serve(state: &AppState, key: ResourceKey, force: bool) -> Result<Json<Value>> {
    let refreshed = if force {
        state.store().force_refresh(key).await
    } else {
        state.store().refresh(key).await
    };
    if let Err(error) = refreshed {
        tracing::warn!(%key, %error, "refresh failed, serving previous snapshot if any");
    }

    let snapshot = state.store().snapshot(key);
    match snapshot.data {
        Some(data) => Ok(Json(render(&data))),
        None => Err(AppError::Store(
            snapshot.error.unwrap_or(StoreError::Unavailable(key)),
        )),
    }
}

/// Wrap a collection in its wire envelope.
fn render(data: &ResourceData) -> Value {
    match data {
        ResourceData::Events(events) => json!({ "events": events }),
        ResourceData::Categories(categories) => json!({ "categories": categories }),
        ResourceData::Locations(locations) => json!({ "locations": locations }),
        ResourceData::Orders(orders) => json!({ "orders": orders }),
    }
}
