use axum::{
    extract::{Path, Query, State},
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Practice, Resource, Service};
use crate::schema::{practices, resources, services};
use crate::slots::{self, Slot, SlotQuery, DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS};
use crate::state::AppState;

#[derive(Serialize)]
pub struct PracticeSummary {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub time_zone: String,
}

#[derive(Serialize)]
pub struct PracticeDetailResponse {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub street: Option<String>,
    pub time_zone: String,
    pub services: Vec<ServiceInfo>,
    pub resources: Vec<ResourceInfo>,
}

#[derive(Serialize)]
pub struct ServiceInfo {
    pub id: Uuid,
    pub name: String,
    pub duration_min: i32,
    pub buffer_before_min: i32,
    pub buffer_after_min: i32,
    pub active: bool,
}

#[derive(Serialize)]
pub struct ResourceInfo {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
}

#[derive(Deserialize)]
pub struct SlotsRequest {
    pub days: Option<i64>,
    pub service_id: Option<Uuid>,
    pub resource_id: Option<Uuid>,
}

pub async fn list_practices(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<PracticeSummary>>> {
    let mut conn = state.db()?;

    let rows: Vec<Practice> = practices::table
        .order(practices::name.asc())
        .load(&mut conn)?;

    let response = rows
        .into_iter()
        .map(|practice| PracticeSummary {
            id: practice.id,
            name: practice.name,
            city: practice.city,
            time_zone: practice.time_zone,
        })
        .collect();

    Ok(Json(response))
}

pub async fn practice_detail(
    State(state): State<AppState>,
    Path(practice_id): Path<Uuid>,
) -> AppResult<Json<PracticeDetailResponse>> {
    let mut conn = state.db()?;

    let practice: Practice = practices::table
        .find(practice_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    let service_rows: Vec<Service> = services::table
        .filter(services::practice_id.eq(practice_id))
        .order(services::name.asc())
        .load(&mut conn)?;
    let resource_rows: Vec<Resource> = resources::table
        .filter(resources::practice_id.eq(practice_id))
        .order(resources::name.asc())
        .load(&mut conn)?;

    Ok(Json(PracticeDetailResponse {
        id: practice.id,
        name: practice.name,
        city: practice.city,
        street: practice.street,
        time_zone: practice.time_zone,
        services: service_rows
            .into_iter()
            .map(|service| ServiceInfo {
                id: service.id,
                name: service.name,
                duration_min: service.duration_min,
                buffer_before_min: service.buffer_before_min,
                buffer_after_min: service.buffer_after_min,
                active: service.active,
            })
            .collect(),
        resources: resource_rows
            .into_iter()
            .map(|resource| ResourceInfo {
                id: resource.id,
                name: resource.name,
                active: resource.active,
            })
            .collect(),
    }))
}

pub async fn practice_slots(
    State(state): State<AppState>,
    Path(practice_id): Path<Uuid>,
    Query(params): Query<SlotsRequest>,
) -> AppResult<Json<Vec<Slot>>> {
    let mut conn = state.db()?;

    let query = SlotQuery {
        days: params.days.unwrap_or(DEFAULT_WINDOW_DAYS).clamp(1, MAX_WINDOW_DAYS),
        service_id: params.service_id,
        resource_id: params.resource_id,
    };

    let slots = slots::generate_slots(&mut conn, practice_id, &query)?;
    Ok(Json(slots))
}
