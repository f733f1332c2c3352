use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::models::{
    Appointment, NewAppointment, Practice, Resource, Service, SOURCE_PATIENT, STATUS_BOOKED,
    STATUS_CANCELLED,
};
use crate::schema::{appointments, practices, resources, services};
use crate::state::AppState;
use crate::time;

#[derive(Deserialize)]
pub struct BookAppointmentRequest {
    pub practice_id: Uuid,
    pub resource_id: Uuid,
    pub service_id: Uuid,
    /// Civil start time in the practice's zone, `YYYY-MM-DD HH:MM`.
    pub start_ts_iso_local: String,
    pub patient_email: Option<String>,
    pub patient_name: Option<String>,
}

#[derive(Deserialize)]
pub struct RescheduleRequest {
    pub new_start_ts_iso_local: String,
}

#[derive(Deserialize)]
pub struct ListAppointmentsRequest {
    pub practice_id: Uuid,
}

#[derive(Serialize)]
pub struct AppointmentResponse {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub service_id: Uuid,
    pub start_ts_utc: DateTime<Utc>,
    pub end_ts_utc: DateTime<Utc>,
    pub status: String,
}

fn to_response(appointment: Appointment) -> AppointmentResponse {
    AppointmentResponse {
        id: appointment.id,
        resource_id: appointment.resource_id,
        service_id: appointment.service_id,
        start_ts_utc: Utc.from_utc_datetime(&appointment.start_ts_utc),
        end_ts_utc: Utc.from_utc_datetime(&appointment.end_ts_utc),
        status: appointment.status,
    }
}

/// Books one generated slot for the authenticated user. Unlike slot
/// generation this path is fail-closed: mismatched references and malformed
/// times are typed 400s, conflicts are 409s. The partial unique index on
/// BOOKED (resource, start, end) is the authoritative race guard; the
/// equality pre-check only produces a friendlier error for the common case.
pub async fn book_appointment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<BookAppointmentRequest>,
) -> AppResult<Json<AppointmentResponse>> {
    let mut conn = state.db()?;

    let practice: Option<Practice> = practices::table
        .find(payload.practice_id)
        .first(&mut conn)
        .optional()?;
    let resource: Option<Resource> = resources::table
        .find(payload.resource_id)
        .filter(resources::practice_id.eq(payload.practice_id))
        .first(&mut conn)
        .optional()?;
    let service: Option<Service> = services::table
        .find(payload.service_id)
        .filter(services::practice_id.eq(payload.practice_id))
        .first(&mut conn)
        .optional()?;
    let (Some(practice), Some(_resource), Some(service)) = (practice, resource, service) else {
        return Err(AppError::bad_request("invalid practice/resource/service"));
    };

    let tz = time::resolve_zone(&practice.time_zone)?;
    let start_local = time::parse_civil(&payload.start_ts_iso_local)?;
    let end_local = start_local + Duration::minutes(i64::from(service.duration_min));
    let start_utc = time::civil_to_utc(start_local, tz);
    let end_utc = time::civil_to_utc(end_local, tz);

    let appointment = conn.transaction::<Appointment, AppError, _>(|conn| {
        let clash: Option<Uuid> = appointments::table
            .filter(appointments::resource_id.eq(payload.resource_id))
            .filter(appointments::status.eq(STATUS_BOOKED))
            .filter(appointments::start_ts_utc.eq(start_utc.naive_utc()))
            .filter(appointments::end_ts_utc.eq(end_utc.naive_utc()))
            .select(appointments::id)
            .first(conn)
            .optional()?;
        if clash.is_some() {
            return Err(AppError::conflict("slot already booked"));
        }

        let new_appointment = NewAppointment {
            id: Uuid::new_v4(),
            practice_id: payload.practice_id,
            resource_id: payload.resource_id,
            service_id: payload.service_id,
            user_id: Some(user.user_id),
            patient_email: payload.patient_email.clone(),
            patient_name: payload.patient_name.clone(),
            start_ts_utc: start_utc.naive_utc(),
            end_ts_utc: end_utc.naive_utc(),
            status: STATUS_BOOKED.to_string(),
            source: SOURCE_PATIENT.to_string(),
        };

        match diesel::insert_into(appointments::table)
            .values(&new_appointment)
            .execute(conn)
        {
            Ok(_) => {}
            Err(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )) => {
                // Lost the race between pre-check and insert.
                return Err(AppError::conflict("slot already booked"));
            }
            Err(err) => return Err(AppError::from(err)),
        }

        Ok(appointments::table.find(new_appointment.id).first(conn)?)
    })?;

    tracing::info!(
        appointment_id = %appointment.id,
        resource_id = %appointment.resource_id,
        start_ts_utc = %appointment.start_ts_utc,
        "appointment booked"
    );

    Ok(Json(to_response(appointment)))
}

/// Idempotent: cancelling an already-cancelled appointment succeeds without
/// touching the row.
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
) -> AppResult<Json<AppointmentResponse>> {
    let mut conn = state.db()?;

    let appointment: Appointment = appointments::table
        .find(appointment_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    if appointment.status == STATUS_CANCELLED {
        return Ok(Json(to_response(appointment)));
    }

    // Cancelling removes the row from the partial unique index, so unlike
    // book/reschedule there is no conflict case to translate; storage errors
    // surface as-is.
    diesel::update(appointments::table.find(appointment_id))
        .set((
            appointments::status.eq(STATUS_CANCELLED),
            appointments::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

    let updated: Appointment = appointments::table.find(appointment_id).first(&mut conn)?;
    Ok(Json(to_response(updated)))
}

pub async fn reschedule_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Json(payload): Json<RescheduleRequest>,
) -> AppResult<Json<AppointmentResponse>> {
    let mut conn = state.db()?;

    let appointment: Appointment = appointments::table
        .find(appointment_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    let practice: Option<Practice> = practices::table
        .find(appointment.practice_id)
        .first(&mut conn)
        .optional()?;
    let service: Option<Service> = services::table
        .find(appointment.service_id)
        .first(&mut conn)
        .optional()?;
    let (Some(practice), Some(service)) = (practice, service) else {
        return Err(AppError::bad_request("invalid practice/service"));
    };

    let tz = time::resolve_zone(&practice.time_zone)?;
    let new_start_local = time::parse_civil(&payload.new_start_ts_iso_local)?;
    let new_end_local = new_start_local + Duration::minutes(i64::from(service.duration_min));
    let new_start_utc = time::civil_to_utc(new_start_local, tz);
    let new_end_utc = time::civil_to_utc(new_end_local, tz);

    let updated = conn.transaction::<Appointment, AppError, _>(|conn| {
        let clash: Option<Uuid> = appointments::table
            .filter(appointments::resource_id.eq(appointment.resource_id))
            .filter(appointments::status.eq(STATUS_BOOKED))
            .filter(appointments::id.ne(appointment_id))
            .filter(appointments::start_ts_utc.eq(new_start_utc.naive_utc()))
            .filter(appointments::end_ts_utc.eq(new_end_utc.naive_utc()))
            .select(appointments::id)
            .first(conn)
            .optional()?;
        if clash.is_some() {
            return Err(AppError::conflict("new slot already booked"));
        }

        match diesel::update(appointments::table.find(appointment_id))
            .set((
                appointments::start_ts_utc.eq(new_start_utc.naive_utc()),
                appointments::end_ts_utc.eq(new_end_utc.naive_utc()),
                appointments::updated_at.eq(Utc::now()),
            ))
            .execute(conn)
        {
            Ok(_) => {}
            Err(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )) => {
                return Err(AppError::conflict("reschedule conflict"));
            }
            Err(err) => return Err(AppError::from(err)),
        }

        Ok(appointments::table.find(appointment_id).first(conn)?)
    })?;

    tracing::info!(
        appointment_id = %updated.id,
        start_ts_utc = %updated.start_ts_utc,
        "appointment rescheduled"
    );

    Ok(Json(to_response(updated)))
}

pub async fn list_appointments(
    State(state): State<AppState>,
    Query(params): Query<ListAppointmentsRequest>,
) -> AppResult<Json<Vec<AppointmentResponse>>> {
    let mut conn = state.db()?;

    let rows: Vec<Appointment> = appointments::table
        .filter(appointments::practice_id.eq(params.practice_id))
        .filter(appointments::status.eq(STATUS_BOOKED))
        .order(appointments::start_ts_utc.asc())
        .load(&mut conn)?;

    Ok(Json(rows.into_iter().map(to_response).collect()))
}
