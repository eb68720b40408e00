use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use mocards_core::ListResult;

use crate::model::{AppointmentRequest, AppointmentStatus};
use crate::service::appointment::{AppointmentFilters, CreateAppointmentInput};
use super::{ok_json, page, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/appointments", post(create_appointment).get(list_appointments))
        .route("/appointments/{id}", get(get_appointment))
        .route("/appointments/{id}/status", post(update_status))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAppointmentBody {
    clinic_id: String,
    control_number: Option<String>,
    patient_name: String,
    patient_phone: Option<String>,
    patient_email: Option<String>,
    preferred_date: String,
    preferred_time: Option<String>,
    service_type: String,
    notes: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppointmentQuery {
    limit: Option<usize>,
    offset: Option<usize>,
    clinic_id: Option<String>,
    status: Option<AppointmentStatus>,
}

#[derive(Deserialize)]
struct StatusBody {
    status: AppointmentStatus,
    notes: Option<String>,
}

async fn create_appointment(
    State(svc): State<AppState>,
    Json(body): Json<CreateAppointmentBody>,
) -> Result<Json<AppointmentRequest>, ApiError> {
    ok_json(svc.create_appointment(CreateAppointmentInput {
        clinic_id: body.clinic_id,
        control_number: body.control_number,
        patient_name: body.patient_name,
        patient_phone: body.patient_phone,
        patient_email: body.patient_email,
        preferred_date: body.preferred_date,
        preferred_time: body.preferred_time,
        service_type: body.service_type,
        notes: body.notes,
    }))
}

async fn list_appointments(
    State(svc): State<AppState>,
    Query(q): Query<AppointmentQuery>,
) -> Result<Json<ListResult<AppointmentRequest>>, ApiError> {
    let filters = AppointmentFilters {
        clinic_id: q.clinic_id,
        status: q.status,
    };
    ok_json(svc.list_appointments(&page(q.limit, q.offset), &filters))
}

async fn get_appointment(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AppointmentRequest>, ApiError> {
    ok_json(svc.get_appointment(&id))
}

async fn update_status(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Result<Json<AppointmentRequest>, ApiError> {
    ok_json(svc.update_appointment_status(&id, body.status, body.notes))
}
