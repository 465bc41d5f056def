//! Weekly operating schedules and the `HH:MM` window checks against them.
//!
//! Times are compared as zero-padded 24h strings, which orders the same as
//! the clock. A bound that is missing from the entry never matches.

use linecut_common::types::DaySchedule;
use serde_json::Value;

/// Today's entry from a `horario_funcionamento` map, if present and well formed.
pub fn day_entry(schedule: &Value, day_key: &str) -> Option<DaySchedule> {
    schedule.get(day_key).and_then(DaySchedule::from_value)
}

/// True when the store is marked open for the day and `hhmm` lies within
/// `[abertura, fechamento]`, both ends included.
pub fn within_opening_hours(day: Option<&DaySchedule>, hhmm: &str) -> bool {
    match day {
        Some(day) if day.aberto => {
            !day.abertura.is_empty()
                && !day.fechamento.is_empty()
                && day.abertura.as_str() <= hhmm
                && hhmm <= day.fechamento.as_str()
        }
        _ => false,
    }
}

/// True when the store should already be closed: the day is missing or not
/// an opening day, or `hhmm` is later than the closing time.
pub fn is_past_closing(day: Option<&DaySchedule>, hhmm: &str) -> bool {
    match day {
        Some(day) if day.aberto => !day.fechamento.is_empty() && hhmm > day.fechamento.as_str(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(aberto: bool, abertura: &str, fechamento: &str) -> DaySchedule {
        DaySchedule {
            aberto,
            abertura: abertura.into(),
            fechamento: fechamento.into(),
        }
    }

    #[test]
    fn window_is_inclusive_on_both_ends() {
        let d = day(true, "08:00", "18:00");
        assert!(!within_opening_hours(Some(&d), "07:59"));
        assert!(within_opening_hours(Some(&d), "08:00"));
        assert!(within_opening_hours(Some(&d), "18:00"));
        assert!(!within_opening_hours(Some(&d), "18:01"));
    }

    #[test]
    fn closed_or_missing_day_is_never_within_hours() {
        assert!(!within_opening_hours(None, "12:00"));
        assert!(!within_opening_hours(Some(&day(false, "08:00", "18:00")), "12:00"));
        assert!(!within_opening_hours(Some(&day(true, "", "18:00")), "12:00"));
    }

    #[test]
    fn past_closing_only_after_fechamento() {
        let d = day(true, "08:00", "18:00");
        assert!(!is_past_closing(Some(&d), "18:00"));
        assert!(is_past_closing(Some(&d), "18:01"));
        assert!(!is_past_closing(Some(&d), "03:00"));
        assert!(is_past_closing(None, "03:00"));
        assert!(is_past_closing(Some(&day(false, "08:00", "18:00")), "12:00"));
        assert!(!is_past_closing(Some(&day(true, "08:00", "")), "23:59"));
    }

    #[test]
    fn day_entry_skips_malformed_days() {
        let schedule = json!({
            "segunda": {"aberto": true, "abertura": "08:00", "fechamento": "18:00"},
            "terca": "fechado",
        });
        assert_eq!(day_entry(&schedule, "segunda"), Some(day(true, "08:00", "18:00")));
        assert_eq!(day_entry(&schedule, "terca"), None);
        assert_eq!(day_entry(&schedule, "quarta"), None);
    }
}
