use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;

use crate::auth::{verify_shared_secret, Caller};
use crate::errors::AppError;
use crate::reminders::dispatch::{ReminderBatch, ReminderResult};
use crate::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/reminders/automatic
///
/// Called by the external scheduler with `Authorization: Bearer <CRON_SECRET>`.
pub async fn handle_automatic_reminders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<ReminderBatch>>, AppError> {
    verify_shared_secret(&headers, state.config.cron_secret.as_deref())?;

    let batch = state.reminders.send_automatic(Utc::now()).await?;
    let message = format!("{} of {} reminders sent", batch.sent, batch.total);
    Ok(ApiResponse::ok(message, batch))
}

/// POST /api/v1/deliveries/:id/reminders
pub async fn handle_send_reminder(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ReminderResult>>, AppError> {
    let result = state.reminders.send_manual(&caller, id, Utc::now()).await?;
    Ok(ApiResponse::ok(result.message.clone(), result))
}
