use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::auth::Caller;
use crate::deliveries::detail::{get_delivery, DeliveryDetail};
use crate::deliveries::filters::FilterSpecification;
use crate::deliveries::listing::{
    get_deliveries_paginated, DeliveryPage, PageRequest, DEFAULT_PAGE_SIZE,
};
use crate::deliveries::registration::{save_delivery, SaveDeliveryRequest};
use crate::deliveries::status::update_delivery_status;
use crate::errors::AppError;
use crate::models::delivery::{DeliveryRecord, DeliveryStatus};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub as_of: Option<DateTime<Utc>>,
    pub recipient: Option<String>,
    pub sender: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ListParams {
    fn filters(&self) -> FilterSpecification {
        FilterSpecification {
            recipient: self.recipient.clone(),
            sender: self.sender.clone(),
            status: self.status.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: DeliveryStatus,
}

/// GET /api/v1/deliveries
pub async fn handle_list_deliveries(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<DeliveryPage>>, AppError> {
    let filter = params.filters().apply()?;
    let request = PageRequest {
        page: params.page.unwrap_or(1),
        page_size: params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        as_of: params.as_of,
    };

    let page =
        get_deliveries_paginated(state.deliveries.as_ref(), &caller, request, filter, Utc::now())
            .await?;
    let message = format!("{} deliveries", page.data.len());
    Ok(ApiResponse::ok(message, page))
}

/// POST /api/v1/deliveries
pub async fn handle_save_delivery(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<SaveDeliveryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DeliveryRecord>>), AppError> {
    let record = save_delivery(state.deliveries.as_ref(), &caller, request, Utc::now()).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Delivery registered", record),
    ))
}

/// GET /api/v1/deliveries/:id
pub async fn handle_get_delivery(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<DeliveryDetail>>, AppError> {
    let detail = get_delivery(
        state.deliveries.as_ref(),
        state.reminder_logs.as_ref(),
        &caller,
        id,
    )
    .await?;
    Ok(ApiResponse::ok("Delivery found", detail))
}

/// PATCH /api/v1/deliveries/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<ApiResponse<DeliveryRecord>>, AppError> {
    let record = update_delivery_status(
        state.deliveries.as_ref(),
        &caller,
        id,
        update.status,
        Utc::now(),
    )
    .await?;
    Ok(ApiResponse::ok(
        format!("Delivery marked {}", record.status),
        record,
    ))
}
