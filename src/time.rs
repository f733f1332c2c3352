use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Wire format for civil date-times: no seconds, no offset. The practice's
/// IANA zone supplies the offset at conversion time.
pub const CIVIL_FORMAT: &str = "%Y-%m-%d %H:%M";
pub const CIVIL_TIME_FORMAT: &str = "%H:%M";

pub const DEFAULT_TIME_ZONE: &str = "Europe/Berlin";

#[derive(Debug, thiserror::Error)]
pub enum TimeError {
    #[error("invalid time '{0}', expected 'YYYY-MM-DD HH:MM'")]
    InvalidTimeFormat(String),
    #[error("unknown time zone '{0}'")]
    UnknownTimeZone(String),
}

pub fn resolve_zone(name: &str) -> Result<Tz, TimeError> {
    name.parse::<Tz>()
        .map_err(|_| TimeError::UnknownTimeZone(name.to_string()))
}

pub fn parse_civil(value: &str) -> Result<NaiveDateTime, TimeError> {
    NaiveDateTime::parse_from_str(value, CIVIL_FORMAT)
        .map_err(|_| TimeError::InvalidTimeFormat(value.to_string()))
}

pub fn parse_civil_time(value: &str) -> Result<NaiveTime, TimeError> {
    NaiveTime::parse_from_str(value, CIVIL_TIME_FORMAT)
        .map_err(|_| TimeError::InvalidTimeFormat(value.to_string()))
}

pub fn format_civil(value: NaiveDateTime) -> String {
    value.format(CIVIL_FORMAT).to_string()
}

/// Maps a civil date-time in `tz` to the UTC instant it denotes, applying
/// the zone's DST rules for that calendar date. Ambiguous wall-clock times
/// (fall-back hour) resolve to the earlier offset; nonexistent ones
/// (spring-forward gap) are shifted past the gap.
pub fn civil_to_utc(local: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
        LocalResult::None => {
            let shifted = local + Duration::hours(1);
            match tz.from_local_datetime(&shifted) {
                LocalResult::Single(dt) => dt.with_timezone(&Utc),
                LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
                // No tz database gap exceeds an hour; treat as already UTC.
                LocalResult::None => Utc.from_utc_datetime(&local),
            }
        }
    }
}

pub fn utc_to_civil(instant: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    instant.with_timezone(&tz).naive_local()
}
