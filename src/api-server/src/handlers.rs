//! HTTP handlers for the managed group operations
//!
//! Each handler builds a [`RequestContext`] from the actor header and the
//! `output_fields` query parameter, then delegates to the service. The
//! context's cancellation token fires if the handler future is dropped,
//! which happens when the client disconnects.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use cretoai_managed_groups::{
    api::{
        CreateManagedGroupRequest, DeleteManagedGroupRequest, GetManagedGroupRequest,
        ListManagedGroupsRequest, ManagedGroupItem, UpdateManagedGroupRequest,
    },
    OutputFields, RequestContext,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    error::{ApiError, Result},
    state::AppState,
};

/// Header carrying the authenticated actor id
pub const ACTOR_HEADER: &str = "x-actor-id";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Query parameters shared by every operation
#[derive(Debug, Default, Deserialize)]
pub struct FieldsQuery {
    /// Comma separated output field names
    pub output_fields: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub auth_method_id: String,

    #[serde(default)]
    pub filter: String,

    pub output_fields: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateQuery {
    pub update_mask: Option<String>,

    pub output_fields: Option<String>,
}

/// Update payload; the mask may also be given as a query parameter
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBody {
    #[serde(default)]
    pub item: ManagedGroupItem,

    #[serde(default)]
    pub update_mask: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateBody {
    #[serde(default)]
    pub item: ManagedGroupItem,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
    })
}

pub async fn list_managed_groups(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse> {
    let (ctx, guard) = request_context(&headers, query.output_fields.as_deref());
    let response = state
        .service
        .list_managed_groups(
            &ctx,
            ListManagedGroupsRequest {
                auth_method_id: query.auth_method_id,
                filter: query.filter,
            },
        )
        .await;
    guard.disarm();

    Ok(Json(response?))
}

pub async fn get_managed_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<FieldsQuery>,
) -> Result<impl IntoResponse> {
    let (ctx, guard) = request_context(&headers, query.output_fields.as_deref());
    let response = state
        .service
        .get_managed_group(&ctx, GetManagedGroupRequest { id })
        .await;
    guard.disarm();

    Ok(Json(response?))
}

pub async fn create_managed_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<FieldsQuery>,
    body: std::result::Result<Json<CreateBody>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let (ctx, guard) = request_context(&headers, query.output_fields.as_deref());
    let response = state
        .service
        .create_managed_group(&ctx, CreateManagedGroupRequest { item: body.item })
        .await;
    guard.disarm();

    Ok((StatusCode::CREATED, Json(response?)))
}

pub async fn update_managed_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<UpdateQuery>,
    body: std::result::Result<Json<UpdateBody>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    // The mask translator splits comma separated paths itself
    let mut update_mask = body.update_mask;
    if let Some(paths) = query.update_mask {
        update_mask.push(paths);
    }

    let (ctx, guard) = request_context(&headers, query.output_fields.as_deref());
    let response = state
        .service
        .update_managed_group(
            &ctx,
            UpdateManagedGroupRequest {
                id,
                item: body.item,
                update_mask,
            },
        )
        .await;
    guard.disarm();

    Ok(Json(response?))
}

pub async fn delete_managed_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let (ctx, guard) = request_context(&headers, None);
    let response = state
        .service
        .delete_managed_group(&ctx, DeleteManagedGroupRequest { id })
        .await;
    guard.disarm();

    Ok(Json(response?))
}

/// Build the per-request context and a guard that cancels it on drop
fn request_context(
    headers: &HeaderMap,
    output_fields: Option<&str>,
) -> (RequestContext, tokio_util::sync::DropGuard) {
    let token = CancellationToken::new();

    let mut ctx = match headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        Some(actor) => RequestContext::new(actor),
        None => RequestContext::anonymous(),
    };
    ctx = ctx.with_cancellation(token.clone());

    if let Some(fields) = output_fields {
        ctx = ctx.with_requested_fields(OutputFields::from_fields(fields.split(',')));
    }
    debug!(user_id = %ctx.user_id, "request context built");

    (ctx, token.drop_guard())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_request_context_defaults_to_anonymous() {
        let (ctx, guard) = request_context(&HeaderMap::new(), None);
        assert_eq!(ctx.user_id, cretoai_managed_groups::ANONYMOUS_USER_ID);
        assert!(ctx.requested_fields.is_none());
        guard.disarm();
    }

    #[test]
    fn test_request_context_reads_actor_and_fields() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_HEADER, HeaderValue::from_static("u_1234567890"));

        let (ctx, guard) = request_context(&headers, Some("id, name"));
        assert_eq!(ctx.user_id, "u_1234567890");
        let fields = ctx.requested_fields.clone().unwrap();
        assert!(fields.has("id"));
        assert!(fields.has("name"));
        assert!(!fields.has("version"));
        guard.disarm();
    }

    #[test]
    fn test_dropped_guard_cancels_context() {
        let (ctx, guard) = request_context(&HeaderMap::new(), None);
        drop(guard);
        assert!(ctx.is_cancelled());
    }
}
