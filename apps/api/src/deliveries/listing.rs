//! Paginated deliveries listing.
//!
//! Rows are ordered newest first with `id` as tie-break, and every page of one
//! listing is anchored at the `as_of` instant of its first page. Rows inserted
//! after the anchor are invisible to later pages, so appending page N+1 to
//! pages 1..=N never repeats or skips a row unless rows are deleted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::auth::Caller;
use crate::deliveries::filters::DeliveryFilter;
use crate::deliveries::store::{DeliveryQuery, DeliveryStore};
use crate::errors::AppError;
use crate::models::delivery::DeliveryRecord;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    /// 1-based.
    pub page: i64,
    pub page_size: i64,
    /// Anchor returned with page 1; `None` anchors at `now`.
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryPage {
    pub data: Vec<DeliveryRecord>,
    pub has_more: bool,
    pub count: Option<i64>,
    pub page: i64,
    pub as_of: DateTime<Utc>,
}

pub async fn get_deliveries_paginated(
    store: &dyn DeliveryStore,
    caller: &Caller,
    request: PageRequest,
    filter: DeliveryFilter,
    now: DateTime<Utc>,
) -> Result<DeliveryPage, AppError> {
    let PageRequest {
        page,
        page_size,
        as_of,
    } = request;

    if page < 1 {
        return Err(AppError::Validation("page must be at least 1".to_string()));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(AppError::Validation(format!(
            "page_size must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    let offset = (page - 1)
        .checked_mul(page_size)
        .ok_or_else(|| AppError::Validation("page is out of range".to_string()))?;

    let as_of = as_of.unwrap_or(now);
    let query = DeliveryQuery {
        filter,
        as_of,
        // One extra row tells whether another page exists.
        limit: page_size + 1,
        offset,
    };

    let mut result = store.query(&query).await?;
    let has_more = result.rows.len() as i64 > page_size;
    result.rows.truncate(page_size as usize);

    debug!(
        user_id = %caller.user_id,
        page,
        rows = result.rows.len(),
        has_more,
        "Listed deliveries"
    );

    Ok(DeliveryPage {
        data: result.rows,
        has_more,
        count: result.total,
        page,
        as_of,
    })
}
