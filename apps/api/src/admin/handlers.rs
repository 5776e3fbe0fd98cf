use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::admin::accounts::{add_preauthorized, list_preauthorized, list_users, remove_preauthorized};
use crate::auth::Caller;
use crate::errors::AppError;
use crate::models::profile::{PreauthorizedEmail, Profile};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PreauthorizeRequest {
    pub email: String,
}

/// GET /api/v1/admin/users
pub async fn handle_list_users(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<ApiResponse<Vec<Profile>>>, AppError> {
    let users = list_users(state.profiles.as_ref(), &caller).await?;
    Ok(ApiResponse::ok(format!("{} users", users.len()), users))
}

/// GET /api/v1/admin/preauthorized
pub async fn handle_list_preauthorized(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<ApiResponse<Vec<PreauthorizedEmail>>>, AppError> {
    let rows = list_preauthorized(state.profiles.as_ref(), &caller).await?;
    Ok(ApiResponse::ok(format!("{} preauthorized emails", rows.len()), rows))
}

/// POST /api/v1/admin/preauthorized
pub async fn handle_add_preauthorized(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<PreauthorizeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PreauthorizedEmail>>), AppError> {
    let row = add_preauthorized(state.profiles.as_ref(), &caller, &request.email).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok("Email preauthorized", row)))
}

/// DELETE /api/v1/admin/preauthorized/:email
pub async fn handle_remove_preauthorized(
    State(state): State<AppState>,
    caller: Caller,
    Path(email): Path<String>,
) -> Result<StatusCode, AppError> {
    remove_preauthorized(state.profiles.as_ref(), &caller, &email).await?;
    Ok(StatusCode::NO_CONTENT)
}
