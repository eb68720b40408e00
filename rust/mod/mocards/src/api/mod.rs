pub mod appointments;
pub mod batches;
pub mod cards;
pub mod clinics;
pub mod locations;
pub mod settings;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;

use mocards_core::{ListParams, ServiceError};

use crate::service::{CardError, CardService};

/// Shared application state.
pub type AppState = Arc<CardService>;

/// Build the MOCARDS API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/mocards/v1", api_routes())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(batches::routes())
        .merge(cards::routes())
        .merge(clinics::routes())
        .merge(locations::routes())
        .merge(appointments::routes())
        .merge(settings::routes())
}

/// Standard API error response body.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: u16,
    pub kind: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(serde_json::json!({
            "error": {
                "code": self.code,
                "kind": self.kind,
                "message": self.message,
            }
        }));
        (status, body).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError {
            code: err.status_code().as_u16(),
            kind: err.error_code(),
            message: err.to_string(),
        }
    }
}

impl From<CardError> for ApiError {
    fn from(err: CardError) -> Self {
        ApiError {
            code: err.status_code().as_u16(),
            kind: err.error_code(),
            message: err.to_string(),
        }
    }
}

/// Wrap a service result into an API response.
pub(crate) fn ok_json<T: Serialize, E: Into<ApiError>>(
    result: Result<T, E>,
) -> Result<Json<T>, ApiError> {
    result.map(Json).map_err(Into::into)
}

/// Pagination from optional query values.
pub(crate) fn page(limit: Option<usize>, offset: Option<usize>) -> ListParams {
    let default = ListParams::default();
    ListParams {
        limit: limit.unwrap_or(default.limit),
        offset: offset.unwrap_or(default.offset),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::service::testing;

    pub fn app() -> axum::Router {
        super::router(std::sync::Arc::new(testing::service()))
    }

    pub async fn call(
        router: &axum::Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let body = match body {
            Some(v) => Body::from(serde_json::to_string(&v).unwrap()),
            None => Body::empty(),
        };
        let resp = router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 16 * 1024 * 1024)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }

    /// Location `MNL` (region 1) and clinic `MNL001` (#12). Returns the
    /// clinic id.
    pub async fn seed(router: &axum::Router) -> String {
        let (status, _) = call(
            router,
            "POST",
            "/mocards/v1/locations",
            Some(serde_json::json!({"code": "MNL", "regionNumber": 1, "name": "Metro Manila"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, clinic) = call(
            router,
            "POST",
            "/mocards/v1/clinics",
            Some(serde_json::json!({
                "clinicCode": "MNL001",
                "clinicNumber": 12,
                "name": "Makati Dental",
                "locationCode": "MNL",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        clinic["id"].as_str().unwrap().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_errors_keep_their_kind() {
        let e: ApiError = CardError::InvalidCount(0).into();
        assert_eq!(e.code, 400);
        assert_eq!(e.kind, "INVALID_COUNT");

        let e: ApiError = CardError::Service(ServiceError::NotFound("cards/x".into())).into();
        assert_eq!(e.code, 404);
        assert_eq!(e.kind, "NOT_FOUND");
        assert_eq!(e.message, "cards/x");
    }

    #[test]
    fn page_defaults() {
        let p = page(None, Some(20));
        assert_eq!(p.limit, 50);
        assert_eq!(p.offset, 20);
    }
}
