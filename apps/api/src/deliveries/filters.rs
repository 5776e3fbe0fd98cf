use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::delivery::DeliveryStatus;

/// Filter fields as submitted by the deliveries list form.
///
/// `status` is a comma-separated list. Leaving it out (or empty) places no
/// restriction on status, which is not the same as the form's preselected
/// `pending,completed`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterSpecification {
    pub recipient: Option<String>,
    pub sender: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Query-ready filter. Every present field adds one conjunctive predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryFilter {
    /// Lowercased substring of the recipient email.
    pub recipient: Option<String>,
    /// Lowercased substring of the owner's email.
    pub sender: Option<String>,
    /// Empty means every status.
    pub statuses: BTreeSet<DeliveryStatus>,
    pub created_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound: the start of the day after `end_date`.
    pub created_before: Option<DateTime<Utc>>,
}

impl FilterSpecification {
    pub fn apply(&self) -> Result<DeliveryFilter, AppError> {
        let statuses = parse_statuses(self.status.as_deref())?;

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(AppError::Validation(format!(
                    "start_date {start} is after end_date {end}"
                )));
            }
        }

        Ok(DeliveryFilter {
            recipient: normalize_substring(self.recipient.as_deref()),
            sender: normalize_substring(self.sender.as_deref()),
            statuses,
            created_from: self.start_date.map(start_of_day),
            created_before: self.end_date.and_then(end_of_day),
        })
    }
}

fn normalize_substring(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

pub fn parse_statuses(raw: Option<&str>) -> Result<BTreeSet<DeliveryStatus>, AppError> {
    raw.unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<DeliveryStatus>()
                .map_err(|e| AppError::Validation(e.to_string()))
        })
        .collect()
}

/// 00:00:00 of `date`, UTC.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// 00:00:00 of the day after `date`, UTC. Every instant of `date` is strictly
/// before it, sub-second timestamps included. `None` past the calendar's end.
pub fn end_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    start_of_day(date).checked_add_signed(Duration::days(1))
}

/// Builds a `%…%` ILIKE pattern that matches `needle` literally.
pub fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
