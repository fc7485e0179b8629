use ulid::Ulid;

use crate::model::*;

use super::EngineError;

/// Default working day: 8:00–18:00 in 30-minute ticks.
pub const WORK_START_MIN: i64 = 8 * 60;
pub const WORK_END_MIN: i64 = 18 * 60;
pub const DEFAULT_SLOT_STEP_MIN: i64 = 30;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

pub(crate) fn validate_span(span: &Span) -> Result<(), EngineError> {
    use crate::limits::*;
    if span.start > span.end {
        return Err(EngineError::Validation("span start after end"));
    }
    if span.start < MIN_VALID_TIMESTAMP_MS || span.end > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    if span.duration_ms() > MAX_SPAN_DURATION_MS {
        return Err(EngineError::LimitExceeded("span too wide"));
    }
    Ok(())
}

/// Find the first existing appointment the candidate span collides with.
///
/// Only same-calendar-day, non-cancelled appointments count, and the
/// appointment being edited (`exclude`) never conflicts with itself.
/// Half-open semantics: touching endpoints do not conflict. A zero-length
/// span still occupies its start instant.
pub fn has_conflict<'a, I>(existing: I, candidate: Span, exclude: Option<Ulid>) -> Option<&'a Appointment>
where
    I: IntoIterator<Item = &'a Appointment>,
{
    let day = day_index(candidate.start);
    let candidate = candidate.occupied();
    existing.into_iter().find(|appt| {
        appt.blocks_time()
            && !exclude.is_some_and(|id| id == appt.id)
            && day_index(appt.span.start) == day
            && appt.span.occupied().overlaps(&candidate)
    })
}

/// Enumerate the working-day ticks of `day`, marking each occupied when its
/// instant falls inside a non-cancelled, non-excluded appointment.
///
/// Display-level only: submission is guarded by `has_conflict`, which the
/// engine re-runs on every booking and revision.
pub fn generate_slots<'a, I>(
    day: Ms,
    work_start_min: i64,
    work_end_min: i64,
    step_min: i64,
    existing: I,
    exclude: Option<Ulid>,
) -> Vec<Slot>
where
    I: IntoIterator<Item = &'a Appointment>,
{
    let midnight = day_start(day);
    let day = day_index(midnight);
    let day_appts: Vec<&Appointment> = existing
        .into_iter()
        .filter(|appt| {
            appt.blocks_time()
                && !exclude.is_some_and(|id| id == appt.id)
                && day_index(appt.span.start) == day
        })
        .collect();

    let mut slots = Vec::new();
    let mut minute = work_start_min;
    while minute < work_end_min {
        let at = midnight + minute * MINUTE_MS;
        let occupied = day_appts.iter().any(|appt| appt.span.occupied().contains_instant(at));
        slots.push(Slot { at, occupied });
        minute += step_min;
    }
    slots
}
