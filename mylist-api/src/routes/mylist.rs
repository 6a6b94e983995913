//! MyList REST API Routes
//!
//! Add, remove and list the caller's saved content. The caller is identified
//! by the `x-user-id` header.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};

use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiJson, ApiQuery, CurrentUser};
use crate::services::ListService;
use crate::state::AppState;
use crate::types::{AddItemRequest, ListQuery};

#[cfg(feature = "openapi")]
use mylist_core::{ListPage, MembershipRecord};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/mylist - Add content to the list
///
/// Adding content that is already listed returns the existing record.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/v1/mylist",
    tag = "MyList",
    request_body = AddItemRequest,
    params(
        ("x-user-id" = String, Header, description = "Authenticated user id"),
    ),
    responses(
        (status = 201, description = "Item added", body = MembershipRecord),
        (status = 200, description = "Item was already in the list", body = MembershipRecord),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "User, content or episode not found", body = ApiError),
        (status = 409, description = "Episode belongs to another show", body = ApiError),
    ),
))]
pub async fn add_item(
    State(service): State<ListService>,
    CurrentUser(user_id): CurrentUser,
    ApiJson(req): ApiJson<AddItemRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = service.add(user_id, &req).await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.record)))
}

/// DELETE /api/v1/mylist/{content_id} - Remove content from the list
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/api/v1/mylist/{content_id}",
    tag = "MyList",
    params(
        ("content_id" = String, Path, description = "Content id"),
        ("x-user-id" = String, Header, description = "Authenticated user id"),
    ),
    responses(
        (status = 204, description = "Item removed"),
        (status = 400, description = "Invalid content id", body = ApiError),
        (status = 404, description = "Item not in the list", body = ApiError),
    ),
))]
pub async fn remove_item(
    State(service): State<ListService>,
    CurrentUser(user_id): CurrentUser,
    Path(content_id): Path<String>,
) -> ApiResult<StatusCode> {
    if service.remove(user_id, &content_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::item_not_found(content_id))
    }
}

/// GET /api/v1/mylist - One page of the list, newest first
///
/// Pass `nextCursor` back URL-encoded; it may contain `+`, `/` and `=`.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/v1/mylist",
    tag = "MyList",
    params(
        ListQuery,
        ("x-user-id" = String, Header, description = "Authenticated user id"),
    ),
    responses(
        (status = 200, description = "Page of list items", body = ListPage),
        (status = 400, description = "Invalid cursor, limit or content type", body = ApiError),
    ),
))]
pub async fn list_items(
    State(service): State<ListService>,
    CurrentUser(user_id): CurrentUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = service.list(user_id, &query).await?;
    Ok(Json(page))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(add_item))
        .route("/:content_id", delete(remove_item))
}
