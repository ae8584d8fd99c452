use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Uniform response envelope returned by every endpoint, success or failure.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
    pub errors: Option<Vec<String>>,
    pub status_code: u16,
    pub timestamp: DateTime<Utc>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self::success_with_status(message, data, 200)
    }

    pub fn success_with_status(message: impl Into<String>, data: T, status_code: u16) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            errors: None,
            status_code,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>, errors: Option<Vec<String>>, status_code: u16) -> Self {
        Self {
            success: false,
            data: None,
            message: message.into(),
            errors,
            status_code,
            timestamp: Utc::now(),
        }
    }
}

/// The HTTP status on the wire always comes from the envelope's own
/// `status_code`, so a 201 body is a 201 response.
impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

/// Page of results with the counts the product listing exposes.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResult<T> {
    pub data: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total_count: i64,
    pub total_pages: i64,
}

impl<T: Serialize> PaginatedResult<T> {
    pub fn new(data: Vec<T>, page: i64, page_size: i64, total_count: i64) -> Self {
        let total_pages = if page_size > 0 {
            (total_count + page_size - 1) / page_size
        } else {
            0
        };
        Self {
            data,
            page,
            page_size,
            total_count,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_status_matches_the_envelope() {
        let created = ApiResponse::success_with_status(
            "Order created successfully",
            serde_json::json!({}),
            201,
        )
        .into_response();
        assert_eq!(created.status().as_u16(), 201);

        let ok = ApiResponse::success("Orders retrieved successfully", serde_json::json!({}))
            .into_response();
        assert_eq!(ok.status().as_u16(), 200);

        let not_found =
            ApiResponse::<serde_json::Value>::error("Order not found", None, 404).into_response();
        assert_eq!(not_found.status().as_u16(), 404);
    }

    #[test]
    fn bogus_status_code_falls_back_to_ok() {
        let resp = ApiResponse::success_with_status("odd", serde_json::json!({}), 0).into_response();
        assert_eq!(resp.status().as_u16(), 200);
    }
}
