use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use mocards_core::{parse_rfc3339, ListResult, ServiceError};

use crate::model::{Card, CardPerk, CardStatus, CardTransaction};
use crate::service::card::{AssignmentResult, CardDetails, CardFilters};
use super::{ok_json, page, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cards", get(list_cards))
        .route("/cards/assign", post(assign_cards))
        .route("/cards/expire", post(expire_cards))
        .route("/cards/lookup/{code}", get(lookup_card))
        .route("/cards/{id}", get(get_card))
        .route("/cards/{id}/activate", post(activate_card))
        .route("/cards/{id}/reassign", post(reassign_card))
        .route("/cards/{id}/suspend", post(suspend_card))
        .route("/cards/{id}/transactions", get(list_transactions))
        .route("/cards/{id}/perks", get(list_perks))
        .route("/perks/{id}/claim", post(claim_perk))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardQuery {
    limit: Option<usize>,
    offset: Option<usize>,
    batch_id: Option<String>,
    clinic_id: Option<String>,
    status: Option<CardStatus>,
    location_code: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignBody {
    card_ids: Vec<String>,
    clinic_id: String,
    performed_by: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivateBody {
    clinic_id: String,
    activated_by: String,
    activated_by_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReassignBody {
    clinic_id: String,
    performed_by: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuspendBody {
    performed_by: String,
    reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct ExpireBody {
    /// RFC 3339 cut-off; the current time when absent.
    now: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClaimBody {
    clinic_id: String,
    claimed_by: Option<String>,
}

async fn list_cards(
    State(svc): State<AppState>,
    Query(q): Query<CardQuery>,
) -> Result<Json<ListResult<Card>>, ApiError> {
    let filters = CardFilters {
        batch_id: q.batch_id,
        clinic_id: q.clinic_id,
        status: q.status,
        location_code: q.location_code,
    };
    ok_json(svc.list_cards(&page(q.limit, q.offset), &filters))
}

async fn get_card(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Card>, ApiError> {
    ok_json(svc.get_card(&id))
}

async fn lookup_card(
    State(svc): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<CardDetails>, ApiError> {
    ok_json(svc.lookup_card(&code))
}

async fn assign_cards(
    State(svc): State<AppState>,
    Json(body): Json<AssignBody>,
) -> Result<Json<AssignmentResult>, ApiError> {
    ok_json(svc.assign_cards_to_clinic(&body.card_ids, &body.clinic_id, &body.performed_by))
}

async fn activate_card(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ActivateBody>,
) -> Result<Json<Card>, ApiError> {
    ok_json(svc.activate_card(
        &id,
        &body.clinic_id,
        &body.activated_by,
        body.activated_by_name.as_deref(),
    ))
}

async fn reassign_card(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ReassignBody>,
) -> Result<Json<Card>, ApiError> {
    ok_json(svc.reassign_card(&id, &body.clinic_id, &body.performed_by))
}

async fn suspend_card(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SuspendBody>,
) -> Result<Json<Card>, ApiError> {
    ok_json(svc.suspend_card(&id, &body.performed_by, body.reason.as_deref()))
}

async fn expire_cards(
    State(svc): State<AppState>,
    body: Option<Json<ExpireBody>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let now = match body.now {
        Some(ts) => parse_rfc3339(&ts)
            .ok_or_else(|| ServiceError::Validation(format!("'{ts}' is not an RFC 3339 timestamp")))?,
        None => Utc::now(),
    };
    let expired = svc.expire_due_cards(now)?;
    Ok(Json(serde_json::json!({ "expired": expired })))
}

async fn list_transactions(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CardTransaction>>, ApiError> {
    svc.get_card(&id)?;
    ok_json(svc.list_card_transactions(&id))
}

async fn list_perks(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CardPerk>>, ApiError> {
    svc.get_card(&id)?;
    ok_json(svc.list_perks(&id))
}

async fn claim_perk(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ClaimBody>,
) -> Result<Json<CardPerk>, ApiError> {
    let claimed_by = body.claimed_by.unwrap_or_else(|| body.clinic_id.clone());
    ok_json(svc.claim_perk(&id, &body.clinic_id, &claimed_by))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::api::testing::{app, call, seed};

    async fn generate(r: &axum::Router, count: u32) -> Vec<String> {
        let (_, body) = call(
            r,
            "POST",
            "/mocards/v1/batches",
            Some(json!({"createdBy": "admin", "locationCode": "MNL", "count": count})),
        )
        .await;
        body["cards"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn full_lifecycle_over_http() {
        let r = app();
        let clinic = seed(&r).await;
        let ids = generate(&r, 2).await;

        let (status, out) = call(
            &r,
            "POST",
            "/mocards/v1/cards/assign",
            Some(json!({"cardIds": ids, "clinicId": clinic, "performedBy": "admin"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(out["assigned"].as_array().unwrap().len(), 2);
        let v2 = out["assigned"][0]["controlNumberV2"].as_str().unwrap().to_string();
        assert_eq!(v2, "MOC-01-0012-00001");

        let (status, card) = call(
            &r,
            "POST",
            &format!("/mocards/v1/cards/{}/activate", ids[0]),
            Some(json!({"clinicId": clinic, "activatedBy": "staff-1", "activatedByName": "Dr. Santos"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(card["status"], "activated");

        let (status, found) = call(&r, "GET", &format!("/mocards/v1/cards/lookup/{v2}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found["card"]["id"], ids[0].as_str());
        let perk_id = found["perks"][2]["id"].as_str().unwrap().to_string();
        assert_eq!(found["perks"][2]["perkType"], "xray");

        let (status, perk) = call(
            &r,
            "POST",
            &format!("/mocards/v1/perks/{perk_id}/claim"),
            Some(json!({"clinicId": clinic})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(perk["claimed"], true);

        let (status, again) = call(
            &r,
            "POST",
            &format!("/mocards/v1/perks/{perk_id}/claim"),
            Some(json!({"clinicId": clinic})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(again["error"]["kind"], "PERK_UNAVAILABLE");

        let (_, log) =
            call(&r, "GET", &format!("/mocards/v1/cards/{}/transactions", ids[0]), None).await;
        let kinds: Vec<_> = log.as_array().unwrap().iter().map(|t| t["transactionType"].clone()).collect();
        assert_eq!(kinds, [json!("assigned"), json!("activated"), json!("perk_claimed")]);
    }

    #[tokio::test]
    async fn activation_at_other_clinic_is_conflict() {
        let r = app();
        let clinic = seed(&r).await;
        let ids = generate(&r, 1).await;
        call(
            &r,
            "POST",
            "/mocards/v1/cards/assign",
            Some(json!({"cardIds": ids, "clinicId": clinic, "performedBy": "admin"})),
        )
        .await;

        let (status, body) = call(
            &r,
            "POST",
            &format!("/mocards/v1/cards/{}/activate", ids[0]),
            Some(json!({"clinicId": "someone-else", "activatedBy": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["kind"], "NOT_ASSIGNED_TO_CLINIC");
    }

    #[tokio::test]
    async fn unknown_lookup_is_not_found() {
        let r = app();
        let (status, body) = call(&r, "GET", "/mocards/v1/cards/lookup/MNL-0000", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], 404);
    }

    #[tokio::test]
    async fn expire_accepts_cutoff() {
        let r = app();
        let (status, body) = call(
            &r,
            "POST",
            "/mocards/v1/cards/expire",
            Some(json!({"now": "2030-01-01T00:00:00.000Z"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["expired"], json!([]));

        let (status, _) = call(&r, "POST", "/mocards/v1/cards/expire", Some(json!({"now": "soon"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let r = app();
        seed(&r).await;
        generate(&r, 3).await;
        let (_, list) = call(&r, "GET", "/mocards/v1/cards?status=unassigned&limit=2", None).await;
        assert_eq!(list["total"], 3);
        assert_eq!(list["items"].as_array().unwrap().len(), 2);
    }
}
