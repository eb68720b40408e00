use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use mocards_core::ListResult;

use crate::model::{Clinic, ClinicMessage};
use crate::service::clinic::{ClinicFilters, CreateClinicInput};
use crate::service::message::SendMessageInput;
use super::{ok_json, page, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/clinics", post(create_clinic).get(list_clinics))
        .route("/clinics/by-code/{code}", get(get_clinic_by_code))
        .route("/clinics/{id}", get(get_clinic).patch(update_clinic))
        .route("/clinics/{id}/deactivate", post(deactivate_clinic))
        .route("/clinics/{id}/messages", post(send_message).get(list_messages))
        .route("/messages/{id}/read", post(mark_read))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateClinicBody {
    clinic_code: String,
    clinic_number: u16,
    name: String,
    location_code: String,
    contact_person: Option<String>,
    contact_email: Option<String>,
    contact_phone: Option<String>,
    address: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClinicQuery {
    limit: Option<usize>,
    offset: Option<usize>,
    status: Option<String>,
    location_code: Option<String>,
}

#[derive(Deserialize)]
struct SendMessageBody {
    sender: String,
    subject: String,
    body: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageQuery {
    limit: Option<usize>,
    offset: Option<usize>,
    #[serde(default)]
    unread_only: bool,
}

async fn create_clinic(
    State(svc): State<AppState>,
    Json(body): Json<CreateClinicBody>,
) -> Result<Json<Clinic>, ApiError> {
    ok_json(svc.create_clinic(CreateClinicInput {
        clinic_code: body.clinic_code,
        clinic_number: body.clinic_number,
        name: body.name,
        location_code: body.location_code,
        contact_person: body.contact_person,
        contact_email: body.contact_email,
        contact_phone: body.contact_phone,
        address: body.address,
    }))
}

async fn list_clinics(
    State(svc): State<AppState>,
    Query(q): Query<ClinicQuery>,
) -> Result<Json<ListResult<Clinic>>, ApiError> {
    let filters = ClinicFilters {
        status: q.status,
        location_code: q.location_code,
    };
    ok_json(svc.list_clinics(&page(q.limit, q.offset), &filters))
}

async fn get_clinic(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Clinic>, ApiError> {
    ok_json(svc.get_clinic(&id))
}

async fn get_clinic_by_code(
    State(svc): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Clinic>, ApiError> {
    ok_json(svc.get_clinic_by_code(&code))
}

async fn update_clinic(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<serde_json::Value>,
) -> Result<Json<Clinic>, ApiError> {
    ok_json(svc.update_clinic(&id, patch))
}

async fn deactivate_clinic(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Clinic>, ApiError> {
    ok_json(svc.deactivate_clinic(&id))
}

async fn send_message(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SendMessageBody>,
) -> Result<Json<ClinicMessage>, ApiError> {
    ok_json(svc.send_message(SendMessageInput {
        clinic_id: id,
        sender: body.sender,
        subject: body.subject,
        body: body.body,
    }))
}

async fn list_messages(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<MessageQuery>,
) -> Result<Json<ListResult<ClinicMessage>>, ApiError> {
    ok_json(svc.list_messages(&id, &page(q.limit, q.offset), q.unread_only))
}

async fn mark_read(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClinicMessage>, ApiError> {
    ok_json(svc.mark_message_read(&id))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::api::testing::{app, call, seed};

    #[tokio::test]
    async fn duplicate_number_conflicts() {
        let r = app();
        seed(&r).await;
        let (status, body) = call(
            &r,
            "POST",
            "/mocards/v1/clinics",
            Some(json!({"clinicCode": "MNL002", "clinicNumber": 12, "name": "Other", "locationCode": "MNL"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["kind"], "ALREADY_EXISTS");
    }

    #[tokio::test]
    async fn patch_and_lookup_by_code() {
        let r = app();
        let id = seed(&r).await;
        let (status, patched) = call(
            &r,
            "PATCH",
            &format!("/mocards/v1/clinics/{id}"),
            Some(json!({"contactPerson": "Dr. Lim"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["contactPerson"], "Dr. Lim");

        let (status, found) = call(&r, "GET", "/mocards/v1/clinics/by-code/mnl001", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found["id"], id.as_str());
    }

    #[tokio::test]
    async fn messages_round_trip() {
        let r = app();
        let id = seed(&r).await;
        let (status, msg) = call(
            &r,
            "POST",
            &format!("/mocards/v1/clinics/{id}/messages"),
            Some(json!({"sender": "admin", "subject": "Welcome", "body": "Cards arrive Monday"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let msg_id = msg["id"].as_str().unwrap();

        call(&r, "POST", &format!("/mocards/v1/messages/{msg_id}/read"), None).await;
        let (_, unread) = call(
            &r,
            "GET",
            &format!("/mocards/v1/clinics/{id}/messages?unreadOnly=true"),
            None,
        )
        .await;
        assert_eq!(unread["total"], 0);
    }
}
