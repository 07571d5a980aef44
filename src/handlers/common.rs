use crate::errors::ServiceError;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// 201 with a `Location` header pointing at the new resource
pub fn created_response<T: Serialize>(location: String, data: T) -> Response {
    let mut response = (StatusCode::CREATED, Json(data)).into_response();
    if let Ok(value) = HeaderValue::from_str(&location) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    response
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Unwraps a JSON body, reporting malformed payloads as validation errors
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ServiceError::ValidationError(rejection.body_text()))
}

/// Query parameters of `GET /transactions/date-range`
#[derive(Debug, Clone, Deserialize, Serialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DateRangeParams {
    /// Inclusive lower bound: RFC 3339, `YYYY-MM-DDTHH:MM:SS` (UTC) or `YYYY-MM-DD`
    #[param(example = "2024-01-02")]
    pub start_date: String,
    /// Inclusive upper bound; a bare date covers the whole day
    #[param(example = "2024-01-05")]
    pub end_date: String,
}

#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

impl DateRangeParams {
    pub fn from_query(
        query: Result<axum::extract::Query<Self>, QueryRejection>,
    ) -> Result<Self, ServiceError> {
        query
            .map(|axum::extract::Query(params)| params)
            .map_err(|rejection| ServiceError::ValidationError(rejection.body_text()))
    }

    /// Resolves both bounds to UTC instants
    pub fn to_utc_range(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), ServiceError> {
        let start = parse_bound(&self.start_date, "startDate", Bound::Start)?;
        let end = parse_bound(&self.end_date, "endDate", Bound::End)?;
        Ok((start, end))
    }
}

fn parse_bound(raw: &str, field: &str, bound: Bound) -> Result<DateTime<Utc>, ServiceError> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
        ServiceError::ValidationError(format!("Invalid {} '{}': {}", field, raw, e))
    })?;

    let naive = match bound {
        Bound::Start => date.and_hms_opt(0, 0, 0),
        Bound::End => date.and_hms_nano_opt(23, 59, 59, 999_999_999),
    }
    .ok_or_else(|| ServiceError::ValidationError(format!("Invalid {} '{}'", field, raw)))?;

    Ok(Utc.from_utc_datetime(&naive))
}
