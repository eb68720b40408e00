use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::codes::CodeFormat;
use crate::model::{SystemSetting, TextLabel};
use super::{ok_json, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/labels", get(list_labels))
        .route("/labels/{key}", get(get_label).put(put_label).delete(delete_label))
        .route("/settings", get(list_settings))
        .route("/settings/{key}", get(get_setting).put(put_setting))
        .route("/code-format", get(get_code_format).put(put_code_format))
}

#[derive(Deserialize)]
struct LabelQuery {
    category: Option<String>,
}

#[derive(Deserialize)]
struct LabelBody {
    value: String,
    category: Option<String>,
}

async fn list_labels(
    State(svc): State<AppState>,
    Query(q): Query<LabelQuery>,
) -> Result<Json<Vec<TextLabel>>, ApiError> {
    ok_json(svc.list_labels(q.category.as_deref()))
}

async fn get_label(
    State(svc): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<TextLabel>, ApiError> {
    ok_json(svc.get_label(&key))
}

async fn put_label(
    State(svc): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<LabelBody>,
) -> Result<Json<TextLabel>, ApiError> {
    ok_json(svc.upsert_label(&key, &body.value, body.category.as_deref()))
}

async fn delete_label(
    State(svc): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    svc.delete_label(&key)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_settings(State(svc): State<AppState>) -> Result<Json<Vec<SystemSetting>>, ApiError> {
    ok_json(svc.list_settings())
}

async fn get_setting(
    State(svc): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<SystemSetting>, ApiError> {
    ok_json(svc.get_setting(&key))
}

async fn put_setting(
    State(svc): State<AppState>,
    Path(key): Path<String>,
    Json(value): Json<serde_json::Value>,
) -> Result<Json<SystemSetting>, ApiError> {
    ok_json(svc.set_setting(&key, value))
}

async fn get_code_format(State(svc): State<AppState>) -> Result<Json<CodeFormat>, ApiError> {
    ok_json(svc.get_code_format())
}

async fn put_code_format(
    State(svc): State<AppState>,
    Json(format): Json<CodeFormat>,
) -> Result<Json<CodeFormat>, ApiError> {
    ok_json(svc.set_code_format(&format))
}
