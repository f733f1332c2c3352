use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Practice, RecurringAvailability, Resource, Service, STATUS_BOOKED};
use crate::schema::{appointments, blackouts, practices, recurring_availability, resources, services};
use crate::time;

pub const DEFAULT_WINDOW_DAYS: i64 = 14;
pub const MAX_WINDOW_DAYS: i64 = 60;

/// Half-open `[start, end)` interval of UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtcSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl UtcSpan {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn from_naive_utc(start: chrono::NaiveDateTime, end: chrono::NaiveDateTime) -> Self {
        Self {
            start: Utc.from_utc_datetime(&start),
            end: Utc.from_utc_datetime(&end),
        }
    }

    pub fn overlaps(&self, other: &UtcSpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Slot {
    pub resource_id: Uuid,
    pub service_id: Uuid,
    /// Civil `YYYY-MM-DD HH:MM` strings in the practice's zone.
    pub start_local: String,
    pub end_local: String,
    pub start_ts_utc: DateTime<Utc>,
    pub end_ts_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SlotQuery {
    pub days: i64,
    pub service_id: Option<Uuid>,
    pub resource_id: Option<Uuid>,
}

/// Read-only calendar data the engine consumes per resource. Routes get a
/// diesel-backed implementation; engine tests use an in-memory one.
pub trait AvailabilityStore {
    fn recurring_rules(&mut self, resource_id: Uuid) -> AppResult<Vec<RecurringAvailability>>;
    fn booked_spans(&mut self, resource_id: Uuid) -> AppResult<Vec<UtcSpan>>;
    fn blackout_spans(&mut self, resource_id: Uuid) -> AppResult<Vec<UtcSpan>>;
}

impl AvailabilityStore for PgConnection {
    fn recurring_rules(&mut self, resource_id: Uuid) -> AppResult<Vec<RecurringAvailability>> {
        Ok(recurring_availability::table
            .filter(recurring_availability::resource_id.eq(resource_id))
            .order((
                recurring_availability::weekday.asc(),
                recurring_availability::start_local.asc(),
            ))
            .load(self)?)
    }

    fn booked_spans(&mut self, resource_id: Uuid) -> AppResult<Vec<UtcSpan>> {
        let rows: Vec<(chrono::NaiveDateTime, chrono::NaiveDateTime)> = appointments::table
            .filter(appointments::resource_id.eq(resource_id))
            .filter(appointments::status.eq(STATUS_BOOKED))
            .select((appointments::start_ts_utc, appointments::end_ts_utc))
            .load(self)?;
        Ok(rows
            .into_iter()
            .map(|(start, end)| UtcSpan::from_naive_utc(start, end))
            .collect())
    }

    fn blackout_spans(&mut self, resource_id: Uuid) -> AppResult<Vec<UtcSpan>> {
        let rows: Vec<(chrono::NaiveDateTime, chrono::NaiveDateTime)> = blackouts::table
            .filter(blackouts::resource_id.eq(resource_id))
            .select((blackouts::start_ts_utc, blackouts::end_ts_utc))
            .load(self)?;
        Ok(rows
            .into_iter()
            .map(|(start, end)| UtcSpan::from_naive_utc(start, end))
            .collect())
    }
}

/// Computes every bookable slot for a practice over the next `query.days`
/// civil days. Deliberately fail-open: an unknown practice, an unresolvable
/// zone or empty candidate sets yield an empty list, never an error, so
/// callers can probe availability speculatively.
pub fn generate_slots(
    conn: &mut PgConnection,
    practice_id: Uuid,
    query: &SlotQuery,
) -> AppResult<Vec<Slot>> {
    let practice: Option<Practice> = practices::table
        .find(practice_id)
        .first(conn)
        .optional()?;
    let Some(practice) = practice else {
        return Ok(Vec::new());
    };

    let tz = match time::resolve_zone(&practice.time_zone) {
        Ok(tz) => tz,
        Err(err) => {
            tracing::warn!(practice_id = %practice.id, %err, "practice has unresolvable time zone");
            return Ok(Vec::new());
        }
    };

    let mut resource_query = resources::table
        .filter(resources::practice_id.eq(practice_id))
        .filter(resources::active.eq(true))
        .into_boxed();
    if let Some(resource_id) = query.resource_id {
        resource_query = resource_query.filter(resources::id.eq(resource_id));
    }
    let candidate_resources: Vec<Resource> =
        resource_query.order(resources::created_at.asc()).load(conn)?;

    let mut service_query = services::table
        .filter(services::practice_id.eq(practice_id))
        .filter(services::active.eq(true))
        .into_boxed();
    if let Some(service_id) = query.service_id {
        service_query = service_query.filter(services::id.eq(service_id));
    }
    let candidate_services: Vec<Service> =
        service_query.order(services::name.asc()).load(conn)?;

    if candidate_resources.is_empty() || candidate_services.is_empty() {
        return Ok(Vec::new());
    }

    expand_slots(
        conn,
        tz,
        Utc::now(),
        &candidate_resources,
        &candidate_services,
        query.service_id,
        query.days,
    )
}

/// Core tiling pass over an already-resolved candidate set. "Today" is the
/// current date in `tz`, not the caller's zone. Pure with respect to `store`.
pub fn expand_slots<S: AvailabilityStore + ?Sized>(
    store: &mut S,
    tz: Tz,
    now: DateTime<Utc>,
    candidate_resources: &[Resource],
    candidate_services: &[Service],
    requested_service: Option<Uuid>,
    days: i64,
) -> AppResult<Vec<Slot>> {
    let services_by_id: HashMap<Uuid, &Service> =
        candidate_services.iter().map(|s| (s.id, s)).collect();
    // A rule without a bound service narrows to one concrete service per
    // call: the requested one, or the practice's first active service by
    // name. It never fans out to all candidates.
    let default_service = match requested_service {
        Some(_) => None,
        None => candidate_services.first(),
    };
    let today = now.with_timezone(&tz).date_naive();

    let mut slots = Vec::new();
    for resource in candidate_resources {
        let rules = store.recurring_rules(resource.id)?;
        if rules.is_empty() {
            continue;
        }
        let booked = store.booked_spans(resource.id)?;
        let blocked = store.blackout_spans(resource.id)?;

        for day_offset in 0..days.max(0) {
            let date = today + Duration::days(day_offset);
            let weekday = date.weekday().num_days_from_monday() as i16;

            // Order by parsed time-of-day, not by the raw string: an
            // unpadded "9:00" would sort lexicographically after "10:00".
            let mut day_rules: Vec<&RecurringAvailability> =
                rules.iter().filter(|rule| rule.weekday == weekday).collect();
            day_rules.sort_by_key(|rule| time::parse_civil_time(&rule.start_local).ok());

            for rule in day_rules {
                let effective_service = match rule.service_id {
                    // A bound service outside the candidate set (inactive,
                    // or excluded by the service filter) disables the rule.
                    Some(id) => services_by_id.get(&id).copied(),
                    None => requested_service
                        .and_then(|id| services_by_id.get(&id).copied())
                        .or(default_service),
                };
                let Some(service) = effective_service else {
                    continue;
                };
                if service.duration_min <= 0 {
                    tracing::warn!(service_id = %service.id, "service has nonpositive duration");
                    continue;
                }

                let start_tod = match time::parse_civil_time(&rule.start_local) {
                    Ok(tod) => tod,
                    Err(err) => {
                        tracing::warn!(rule_id = %rule.id, %err, "skipping rule with malformed start_local");
                        continue;
                    }
                };
                let end_tod = match time::parse_civil_time(&rule.end_local) {
                    Ok(tod) => tod,
                    Err(err) => {
                        tracing::warn!(rule_id = %rule.id, %err, "skipping rule with malformed end_local");
                        continue;
                    }
                };
                // No wraparound across midnight.
                if start_tod >= end_tod {
                    continue;
                }

                let window = UtcSpan::new(
                    time::civil_to_utc(date.and_time(start_tod), tz),
                    time::civil_to_utc(date.and_time(end_tod), tz),
                );
                if window.start >= window.end {
                    continue;
                }

                // Tiling advances by duration_min only; service buffers
                // extend the booked span conceptually but never space slots.
                let step = Duration::minutes(i64::from(service.duration_min));
                let mut cursor = window.start;
                while cursor + step <= window.end {
                    let span = UtcSpan::new(cursor, cursor + step);
                    cursor = span.end;

                    if span.start < now {
                        continue;
                    }
                    if booked.iter().any(|taken| span.overlaps(taken)) {
                        continue;
                    }
                    if blocked.iter().any(|out| span.overlaps(out)) {
                        continue;
                    }

                    slots.push(Slot {
                        resource_id: resource.id,
                        service_id: service.id,
                        start_local: time::format_civil(time::utc_to_civil(span.start, tz)),
                        end_local: time::format_civil(time::utc_to_civil(span.end, tz)),
                        start_ts_utc: span.start,
                        end_ts_utc: span.end,
                    });
                }
            }
        }
    }

    Ok(slots)
}
