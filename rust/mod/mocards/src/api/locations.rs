use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use mocards_core::ListResult;

use crate::model::LocationCode;
use crate::service::location::CreateLocationInput;
use super::{ok_json, page, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/locations", post(create_location).get(list_locations))
        .route("/locations/{code}", get(get_location))
        .route("/locations/{code}/deactivate", post(deactivate_location))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateLocationBody {
    code: String,
    region_number: u8,
    name: String,
    description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationQuery {
    limit: Option<usize>,
    offset: Option<usize>,
    #[serde(default)]
    active_only: bool,
}

async fn create_location(
    State(svc): State<AppState>,
    Json(body): Json<CreateLocationBody>,
) -> Result<Json<LocationCode>, ApiError> {
    ok_json(svc.create_location(CreateLocationInput {
        code: body.code,
        region_number: body.region_number,
        name: body.name,
        description: body.description,
    }))
}

async fn list_locations(
    State(svc): State<AppState>,
    Query(q): Query<LocationQuery>,
) -> Result<Json<ListResult<LocationCode>>, ApiError> {
    ok_json(svc.list_locations(&page(q.limit, q.offset), q.active_only))
}

async fn get_location(
    State(svc): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<LocationCode>, ApiError> {
    ok_json(svc.get_location(&code))
}

async fn deactivate_location(
    State(svc): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<LocationCode>, ApiError> {
    ok_json(svc.deactivate_location(&code))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::api::testing::{app, call};

    #[tokio::test]
    async fn create_list_deactivate() {
        let r = app();
        for (code, region) in [("MNL", 1), ("CEB", 2)] {
            let (status, _) = call(
                &r,
                "POST",
                "/mocards/v1/locations",
                Some(json!({"code": code, "regionNumber": region, "name": code})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, loc) = call(&r, "POST", "/mocards/v1/locations/CEB/deactivate", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(loc["isActive"], false);

        let (_, active) = call(&r, "GET", "/mocards/v1/locations?activeOnly=true", None).await;
        assert_eq!(active["total"], 1);

        let (status, body) = call(
            &r,
            "POST",
            "/mocards/v1/locations",
            Some(json!({"code": "davao", "regionNumber": 3, "name": "Davao"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "VALIDATION_FAILED");
    }
}
