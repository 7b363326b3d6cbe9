//! Proxy route handlers.
//!
//! Each handler validates the documented preconditions, forwards the
//! request to the Data Service, and relays the upstream reply: the exact
//! status either way, the full body on success, and a reshaped
//! `{"error": <message>}` body on upstream failure. Transport failures are
//! the only thing that surfaces as a gateway error.

use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use segundo_lote_core::EventId;

use crate::backend::UpstreamResponse;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Delete-image request body.
#[derive(Debug, Deserialize)]
pub struct DeleteImageRequest {
    pub filename: Option<String>,
}

/// Installments query string.
#[derive(Debug, Deserialize)]
pub struct InstallmentsQuery {
    pub amount: Option<String>,
}

/// DELETE /api/events/delete-image
///
/// Requires a `filename` in the JSON body; the caller's `Authorization`
/// header travels with the forwarded request as-is.
#[instrument(skip(state, headers, body))]
pub async fn delete_event_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: std::result::Result<Json<DeleteImageRequest>, JsonRejection>,
) -> Result<Response> {
    let filename = body
        .ok()
        .and_then(|Json(request)| request.filename)
        .filter(|filename| !filename.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("filename is required".to_string()))?;

    let reply = state
        .backend()
        .forward(
            Method::DELETE,
            "/api/events/delete-image/",
            auth_header(&headers),
            Some(&json!({ "filename": filename })),
        )
        .await?;

    Ok(relay(&reply))
}

/// POST /api/payment/create
///
/// Requires an `Authorization` header; the JSON body is opaque and
/// forwarded verbatim. On upstream success the events snapshot gets an
/// optimistic ticket-count decrement when the body names an event.
#[instrument(skip(state, headers, body))]
pub async fn payment_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Response> {
    let auth = auth_header(&headers)
        .ok_or_else(|| AppError::Unauthorized("authorization header is required".to_string()))?;
    let Json(body) =
        body.map_err(|_| AppError::BadRequest("request body must be JSON".to_string()))?;

    let reply = state
        .backend()
        .forward(Method::POST, "/api/payment/create", Some(auth), Some(&body))
        .await?;

    if is_success(reply.status)
        && let Some(event_id) = body.get("event_id").and_then(Value::as_str)
    {
        let quantity = body
            .get("quantity")
            .and_then(Value::as_u64)
            .and_then(|q| u32::try_from(q).ok())
            .unwrap_or(1);
        state
            .store()
            .decrement_ticket_count(&EventId::new(event_id), quantity);
    }

    Ok(relay(&reply))
}

/// GET /api/payment/installments?amount=...
///
/// Requires the `amount` query parameter; `Authorization` is forwarded
/// when present.
#[instrument(skip(state, headers))]
pub async fn payment_installments(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<InstallmentsQuery>,
) -> Result<Response> {
    let amount = query
        .amount
        .filter(|amount| !amount.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("amount is required".to_string()))?;

    let path = format!(
        "/api/payment/installments?amount={}",
        urlencoding::encode(&amount)
    );
    let reply = state
        .backend()
        .forward(Method::GET, &path, auth_header(&headers), None)
        .await?;

    Ok(relay(&reply))
}

/// GET /api/payment/methods
///
/// No required inputs; `Authorization` is forwarded when present.
#[instrument(skip(state, headers))]
pub async fn payment_methods(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response> {
    let reply = state
        .backend()
        .forward(Method::GET, "/api/payment/methods", auth_header(&headers), None)
        .await?;

    Ok(relay(&reply))
}

/// GET /api/payment/status/{payment_id}
///
/// Requires a non-blank payment ID and an `Authorization` header.
#[instrument(skip(state, headers))]
pub async fn payment_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(payment_id): Path<String>,
) -> Result<Response> {
    if payment_id.trim().is_empty() {
        return Err(AppError::BadRequest("payment id is required".to_string()));
    }
    let auth = auth_header(&headers)
        .ok_or_else(|| AppError::Unauthorized("authorization header is required".to_string()))?;

    let path = format!(
        "/api/payment/status/{}",
        urlencoding::encode(&payment_id)
    );
    let reply = state
        .backend()
        .forward(Method::GET, &path, Some(auth), None)
        .await?;

    Ok(relay(&reply))
}

/// The caller's `Authorization` header, when readable.
fn auth_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

const fn is_success(status: u16) -> bool {
    status >= 200 && status < 300
}

/// Build the relayed response for an upstream reply.
///
/// Success bodies pass through verbatim; failure bodies are reshaped to
/// the uniform `{"error": <message>}` contract, keeping the upstream
/// status in both cases.
fn relay(reply: &UpstreamResponse) -> Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);

    if status.is_success() {
        let mut response = Response::new(Body::from(reply.body.clone()));
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        return response;
    }

    (status, Json(json!({ "error": error_message(reply) }))).into_response()
}

/// Pull a human-readable message out of an upstream error body.
fn error_message(reply: &UpstreamResponse) -> String {
    serde_json::from_slice::<Value>(&reply.body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .or_else(|| value.get("message"))
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or_else(|| format!("upstream request failed with status {}", reply.status))
}
