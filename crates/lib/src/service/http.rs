//! Router and handlers for the conflict API.
//!
//! Three endpoints back the web layer's conflict UI:
//!
//! - `POST /conflicts` — run detection, persisting a conflict on mismatch
//! - `PUT /conflicts/{id}` — apply a resolution strategy
//! - `GET /conflicts` — list conflicts, filterable and paginated
//!
//! Position operations are deliberately not exposed over HTTP; they are
//! library calls made by the host application.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Json as ExtractJson, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::conflict::{
    ConflictError, ConflictKind, ConflictOutcome, ConflictRecord, ConflictResolver, ConflictStatus,
    ResolutionStrategy,
};
use crate::content::{Id, Snapshot, Version};
use crate::{Error, store::StoreError};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<ConflictResolver>,
}

/// Builds the conflict API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/conflicts", get(list_conflicts).post(create_conflict))
        .route("/conflicts/{id}", put(resolve_conflict))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateConflictRequest {
    container_id: Id,
    subject_id: Id,
    kind: ConflictKind,
    expected_version: Version,
    local_snapshot: Snapshot,
    #[serde(default)]
    base_text: Option<String>,
    actor_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateConflictResponse {
    has_conflict: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    conflict: Option<ConflictRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_snapshot: Option<Snapshot>,
}

async fn create_conflict(
    State(state): State<AppState>,
    ExtractJson(request): ExtractJson<CreateConflictRequest>,
) -> Response {
    let outcome = state
        .resolver
        .create_conflict(
            &request.container_id,
            &request.subject_id,
            request.kind,
            request.expected_version,
            request.local_snapshot,
            request.base_text,
            &request.actor_id,
        )
        .await;
    match outcome {
        Ok(ConflictOutcome::NoConflict) => Json(CreateConflictResponse {
            has_conflict: false,
            conflict: None,
            remote_snapshot: None,
        })
        .into_response(),
        Ok(ConflictOutcome::Conflict {
            record,
            remote_snapshot,
        }) => Json(CreateConflictResponse {
            has_conflict: true,
            conflict: Some(record),
            remote_snapshot: Some(remote_snapshot),
        })
        .into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolveConflictRequest {
    strategy: ResolutionStrategy,
    #[serde(default)]
    merged_data: Option<Snapshot>,
    actor_id: String,
}

async fn resolve_conflict(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ExtractJson(request): ExtractJson<ResolveConflictRequest>,
) -> Response {
    let result = state
        .resolver
        .resolve(
            &Id::new(id),
            request.strategy,
            request.merged_data,
            &request.actor_id,
        )
        .await;
    match result {
        Ok(resulting_data) => Json(json!({ "resultingData": resulting_data })).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListConflictsQuery {
    #[serde(default)]
    container_id: Option<Id>,
    #[serde(default)]
    status: Option<ConflictStatus>,
    #[serde(default)]
    page: Option<usize>,
    #[serde(default)]
    per_page: Option<usize>,
}

async fn list_conflicts(
    State(state): State<AppState>,
    Query(query): Query<ListConflictsQuery>,
) -> Response {
    let result = state
        .resolver
        .list(
            query.container_id.as_ref(),
            query.status,
            query.page,
            query.per_page,
        )
        .await;
    match result {
        Ok(page) => Json(page).into_response(),
        Err(err) => error_response(err),
    }
}

/// Maps core errors onto HTTP statuses.
///
/// A refused automatic merge is a 409 carrying the full merge result so the
/// editor can choose lines and re-submit with explicit merged data.
fn error_response(err: Error) -> Response {
    match &err {
        Error::Conflict(ConflictError::ManualMergeRequired { result, .. }) => (
            StatusCode::CONFLICT,
            Json(json!({ "requiresManualMerge": true, "mergeResult": result })),
        )
            .into_response(),
        Error::Conflict(e) if e.is_already_resolved() => {
            status_with_message(StatusCode::CONFLICT, &err)
        }
        Error::Store(StoreError::VersionMismatch { .. }) => {
            status_with_message(StatusCode::CONFLICT, &err)
        }
        _ if err.is_not_found() => status_with_message(StatusCode::NOT_FOUND, &err),
        _ if err.is_validation() => status_with_message(StatusCode::BAD_REQUEST, &err),
        _ if err.is_retryable() => status_with_message(StatusCode::SERVICE_UNAVAILABLE, &err),
        _ => {
            tracing::error!(%err, "conflict API request failed");
            status_with_message(StatusCode::INTERNAL_SERVER_ERROR, &err)
        }
    }
}

fn status_with_message(status: StatusCode, err: &Error) -> Response {
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
