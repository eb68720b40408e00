use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use mocards_core::{ListResult, ServiceError};

use crate::model::{BatchStatus, CardBatch};
use crate::service::batch::{CreateBatchInput, CreateBatchWithCardsInput};
use crate::service::generator::GeneratedCards;
use crate::service::CardError;
use super::{ok_json, page, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/batches", post(create_batch).get(list_batches))
        .route("/batches/{id}", get(get_batch))
        .route("/batches/{id}/generate", post(generate_cards))
        .route("/batches/{id}/archive", post(archive_batch))
        .route("/batch-number/next", get(next_batch_number))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBatchBody {
    created_by: String,
    location_code: Option<String>,
    /// Generate this many cards right away.
    count: Option<u32>,
    notes: Option<String>,
    batch_number: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchQuery {
    limit: Option<usize>,
    offset: Option<usize>,
    status: Option<BatchStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody {
    count: u32,
    /// Defaults to the batch's own location.
    location_code: Option<String>,
}

async fn create_batch(
    State(svc): State<AppState>,
    Json(body): Json<CreateBatchBody>,
) -> Result<Response, ApiError> {
    match body.count {
        Some(count) => {
            let location_code = body.location_code.ok_or_else(|| {
                ServiceError::Validation("locationCode is required to generate cards".into())
            })?;
            let out = svc.create_batch_with_cards(CreateBatchWithCardsInput {
                created_by: body.created_by,
                location_code,
                count,
                notes: body.notes,
                batch_number: body.batch_number,
            })?;
            Ok(Json(out).into_response())
        }
        None => {
            let batch = svc.create_batch(CreateBatchInput {
                created_by: body.created_by,
                total_cards: 0,
                location_code: body.location_code,
                notes: body.notes,
                batch_number: body.batch_number,
            })?;
            Ok(Json(batch).into_response())
        }
    }
}

async fn list_batches(
    State(svc): State<AppState>,
    Query(q): Query<BatchQuery>,
) -> Result<Json<ListResult<CardBatch>>, ApiError> {
    ok_json(svc.list_batches(&page(q.limit, q.offset), q.status))
}

async fn get_batch(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CardBatch>, ApiError> {
    ok_json(svc.get_batch(&id))
}

async fn generate_cards(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<GeneratedCards>, ApiError> {
    let batch = svc.get_batch(&id)?;
    let location = body
        .location_code
        .or(batch.location_code)
        .ok_or_else(|| CardError::InvalidLocationCode(String::new()))?;
    ok_json(svc.generate_cards_for_batch(&batch.id, &batch.batch_number, &location, body.count))
}

async fn archive_batch(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CardBatch>, ApiError> {
    ok_json(svc.archive_batch(&id))
}

async fn next_batch_number(State(svc): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let number = svc.next_batch_number()?;
    Ok(Json(serde_json::json!({ "batchNumber": number })))
}
