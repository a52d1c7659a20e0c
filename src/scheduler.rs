use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::models::{DoseStatus, HistoryEntry, Medication, ScheduleEntry};

const MILLIS_PER_HOUR: i64 = 60 * 60 * 1000;

/// Frequencies offered when registering a medication.
pub const ALLOWED_FREQUENCIES: [u32; 5] = [4, 6, 8, 12, 24];

/// Next dose due at or after `now` for a medication started at `start`
/// and taken every `frequency_hours`.
///
/// Returns `None` for a zero frequency or when the next dose falls outside
/// the representable date range. `start` may lie in the future, in which
/// case the first dose on or after `now` is returned.
pub fn next_dose_time(
    start: DateTime<Utc>,
    frequency_hours: u32,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if frequency_hours == 0 {
        return None;
    }
    let period = i64::from(frequency_hours) * MILLIS_PER_HOUR;

    let elapsed = (now - start).num_milliseconds();
    let doses_elapsed = elapsed.div_euclid(period);
    let offset = doses_elapsed.checked_add(1)?.checked_mul(period)?;
    let mut next = start.checked_add_signed(Duration::try_milliseconds(offset)?)?;

    if next < now {
        let behind = (now - next).num_milliseconds();
        let advances = (behind + period - 1) / period;
        let catch_up = Duration::try_milliseconds(advances.checked_mul(period)?)?;
        next = next.checked_add_signed(catch_up)?;
    }

    Some(next)
}

pub fn next_dose_from_clock(
    start: DateTime<Utc>,
    frequency_hours: u32,
    clock: &Clock,
) -> Option<DateTime<Utc>> {
    next_dose_time(start, frequency_hours, clock.now())
}

/// Half-open interval `[next_dose - frequency, next_dose)`. A dose marked
/// taken inside it covers `next_dose`.
pub fn dose_window(
    next_dose: DateTime<Utc>,
    frequency_hours: u32,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let period = Duration::try_hours(i64::from(frequency_hours))?;
    Some((next_dose.checked_sub_signed(period)?, next_dose))
}

pub fn is_allowed_frequency(hours: u32) -> bool {
    ALLOWED_FREQUENCIES.contains(&hours)
}

pub fn frequency_label(hours: u32) -> &'static str {
    match hours {
        4 => "Cada 4 horas",
        6 => "Cada 6 horas",
        8 => "Cada 8 horas",
        12 => "Cada 12 horas",
        24 => "Una vez al día",
        _ => "Frecuencia no especificada",
    }
}

/// `Completed` when a taken mark for `medication` falls in the window
/// leading up to `next_dose`.
pub fn dose_status(
    medication: &Medication,
    next_dose: DateTime<Utc>,
    history: &[HistoryEntry],
) -> DoseStatus {
    let Some((from, to)) = dose_window(next_dose, medication.frequency_hours) else {
        return DoseStatus::Pending;
    };
    let taken = history.iter().any(|entry| {
        entry.taken
            && entry.medication.id == medication.id
            && entry.date >= from
            && entry.date < to
    });
    if taken {
        DoseStatus::Completed
    } else {
        DoseStatus::Pending
    }
}

/// Upcoming dose for every active medication, soonest first.
pub fn build_schedule(
    medications: &[Medication],
    history: &[HistoryEntry],
    now: DateTime<Utc>,
) -> Vec<ScheduleEntry> {
    let mut entries: Vec<ScheduleEntry> = medications
        .iter()
        .filter(|m| m.is_active())
        .filter_map(|m| {
            let Some(next_dose_time) = next_dose_time(m.start_date, m.frequency_hours, now) else {
                tracing::warn!("⚠️ Medication {} has no valid frequency, skipping", m.id);
                return None;
            };
            Some(ScheduleEntry {
                medication: m.clone(),
                next_dose_time,
                status: dose_status(m, next_dose_time, history),
            })
        })
        .collect();

    entries.sort_by_key(|e| e.next_dose_time);
    entries
}
