use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::auth::Caller;
use crate::models::recipient::RecipientList;
use crate::recipients::search::search_recipients;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecipientsQuery {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

fn envelope(list: RecipientList) -> Json<ApiResponse<RecipientList>> {
    // Fail-soft lookups still answer 200; the missing timestamp marks unavailability.
    let message = if list.created_at.is_some() {
        format!("{} recipients", list.entries.len())
    } else {
        "Recipient directory unavailable".to_string()
    };
    ApiResponse::ok(message, list)
}

/// GET /api/v1/recipients
pub async fn handle_get_recipients(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<RecipientsQuery>,
) -> Json<ApiResponse<RecipientList>> {
    envelope(
        state
            .recipients
            .get_recipients(&caller, params.force, Utc::now())
            .await,
    )
}

/// GET /api/v1/recipients/search
pub async fn handle_search_recipients(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<SearchQuery>,
) -> Json<ApiResponse<RecipientList>> {
    if params.q.trim().is_empty() {
        return ApiResponse::ok("Empty query", RecipientList::default());
    }
    envelope(search_recipients(&state.recipients, &caller, &params.q, Utc::now()).await)
}

/// POST /api/v1/recipients/refresh
pub async fn handle_refresh_recipients(
    State(state): State<AppState>,
    caller: Caller,
) -> Json<ApiResponse<RecipientList>> {
    envelope(state.recipients.force_refresh(&caller, Utc::now()).await)
}
