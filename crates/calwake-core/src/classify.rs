//! Time-window classification for timed and all-day events.
//!
//! Timed events compare raw instants. All-day events are stored with UTC
//! midnight boundaries by the calendar source regardless of device timezone,
//! so comparing their raw instants against local "now" mis-fires near day
//! boundaries in non-UTC zones. Instead each instant is reduced to a
//! comparable day ordinal and the comparison happens in ordinal space.

use chrono::{DateTime, Datelike, Duration, Local, TimeZone, Timelike, Utc};

use crate::event::EventInstance;

/// Multiplier for the year component of a day ordinal. Chosen only to exceed
/// the maximum day-of-year (366) so ordinals stay strictly increasing across
/// a year boundary; it is not a calendar length.
const ORDINAL_YEAR_SPAN: i32 = 400;

/// Reduce an instant to a totally ordered `(year, day-of-year)` ordinal.
///
/// The instant's calendar fields are read in whatever zone `t` carries, so
/// the same physical instant yields different ordinals in different zones --
/// that is the point: all-day boundaries are read in UTC, "now" in the
/// viewer's zone.
pub fn day_ordinal<Tz: TimeZone>(t: &DateTime<Tz>) -> i32 {
    t.year() * ORDINAL_YEAR_SPAN + t.ordinal() as i32
}

/// Whether `event` is active at instant `now`, reading local-day fields in
/// the zone `tz`.
///
/// Timed events: active iff `start <= now < end`.
/// All-day events: active iff the local day ordinal of `now` falls in
/// `[ord(start UTC day), ord(end UTC day))`.
pub fn is_active_in_zone<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz, event: &EventInstance) -> bool {
    if event.all_day {
        let start_ord = day_ordinal(&event.start);
        let end_ord = day_ordinal(&event.end);
        let now_ord = day_ordinal(&now.with_timezone(tz));
        now_ord >= start_ord && now_ord < end_ord
    } else {
        event.start <= now && now < event.end
    }
}

/// [`is_active_in_zone`] in the system's local zone.
pub fn is_active(now: DateTime<Utc>, event: &EventInstance) -> bool {
    is_active_in_zone(now, &Local, event)
}

/// Whether `event` overlaps the day `[day_start, day_end)`.
///
/// Timed events use physical interval overlap. All-day events match when the
/// day's local ordinal falls inside the event's UTC ordinal range.
pub fn overlaps_day_in_zone<Tz: TimeZone>(
    day_start: DateTime<Utc>,
    day_end: DateTime<Utc>,
    tz: &Tz,
    event: &EventInstance,
) -> bool {
    if event.all_day {
        let day_ord = day_ordinal(&day_start.with_timezone(tz));
        day_ord >= day_ordinal(&event.start) && day_ord < day_ordinal(&event.end)
    } else {
        event.start < day_end && event.end > day_start
    }
}

/// [`overlaps_day_in_zone`] in the system's local zone.
pub fn overlaps_day(day_start: DateTime<Utc>, day_end: DateTime<Utc>, event: &EventInstance) -> bool {
    overlaps_day_in_zone(day_start, day_end, &Local, event)
}

/// The next local midnight strictly after `now`, as a UTC instant.
///
/// Used as the end boundary of an active all-day event: the viewer observes
/// the event ending at their local midnight, not at the stored UTC boundary.
pub fn local_midnight_after_in_zone<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let local = now.with_timezone(tz);
    let day_start = local
        .with_hour(0)
        .and_then(|t| t.with_minute(0))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(local);
    (day_start + Duration::days(1)).with_timezone(&Utc)
}

/// [`local_midnight_after_in_zone`] in the system's local zone.
pub fn local_midnight_after(now: DateTime<Utc>) -> DateTime<Utc> {
    local_midnight_after_in_zone(now, &Local)
}
