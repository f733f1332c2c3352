use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

pub const STATUS_BOOKED: &str = "BOOKED";
pub const STATUS_CANCELLED: &str = "CANCELLED";
pub const STATUS_COMPLETED: &str = "COMPLETED";
pub const STATUS_NOSHOW: &str = "NOSHOW";

pub const SOURCE_PATIENT: &str = "PATIENT";
pub const SOURCE_STAFF: &str = "STAFF";

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = practices)]
pub struct Practice {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub street: Option<String>,
    pub time_zone: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = practices)]
pub struct NewPractice {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub street: Option<String>,
    pub time_zone: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = resources)]
#[diesel(belongs_to(Practice))]
pub struct Resource {
    pub id: Uuid,
    pub practice_id: Uuid,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = resources)]
pub struct NewResource {
    pub id: Uuid,
    pub practice_id: Uuid,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = services)]
#[diesel(belongs_to(Practice))]
pub struct Service {
    pub id: Uuid,
    pub practice_id: Uuid,
    pub name: String,
    pub duration_min: i32,
    pub buffer_before_min: i32,
    pub buffer_after_min: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = services)]
pub struct NewService {
    pub id: Uuid,
    pub practice_id: Uuid,
    pub name: String,
    pub duration_min: i32,
    pub buffer_before_min: i32,
    pub buffer_after_min: i32,
    pub active: bool,
}

/// One weekly-recurring open window for a resource. `start_local` and
/// `end_local` are civil `HH:MM` strings in the owning practice's zone;
/// weekday follows ISO order with 0 = Monday.
#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = recurring_availability)]
#[diesel(belongs_to(Resource))]
pub struct RecurringAvailability {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub weekday: i16,
    pub start_local: String,
    pub end_local: String,
    pub service_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = recurring_availability)]
pub struct NewRecurringAvailability {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub weekday: i16,
    pub start_local: String,
    pub end_local: String,
    pub service_id: Option<Uuid>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = blackouts)]
#[diesel(belongs_to(Resource))]
pub struct Blackout {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub start_ts_utc: NaiveDateTime,
    pub end_ts_utc: NaiveDateTime,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = blackouts)]
pub struct NewBlackout {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub start_ts_utc: NaiveDateTime,
    pub end_ts_utc: NaiveDateTime,
    pub reason: Option<String>,
}

/// Appointment timestamps are stored as naive SQL timestamps that are UTC
/// by convention; everything above the diesel boundary carries them as
/// `DateTime<Utc>`.
#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = appointments)]
#[diesel(belongs_to(Resource))]
#[diesel(belongs_to(Service))]
pub struct Appointment {
    pub id: Uuid,
    pub practice_id: Uuid,
    pub resource_id: Uuid,
    pub service_id: Uuid,
    pub user_id: Option<Uuid>,
    pub patient_email: Option<String>,
    pub patient_name: Option<String>,
    pub start_ts_utc: NaiveDateTime,
    pub end_ts_utc: NaiveDateTime,
    pub status: String,
    pub source: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = appointments)]
pub struct NewAppointment {
    pub id: Uuid,
    pub practice_id: Uuid,
    pub resource_id: Uuid,
    pub service_id: Uuid,
    pub user_id: Option<Uuid>,
    pub patient_email: Option<String>,
    pub patient_name: Option<String>,
    pub start_ts_utc: NaiveDateTime,
    pub end_ts_utc: NaiveDateTime,
    pub status: String,
    pub source: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}
