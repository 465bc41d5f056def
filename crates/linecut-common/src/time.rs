//! Wall-clock access and the local-time views the rules evaluate against.
//!
//! Every rule works in one fixed timezone (`America/Sao_Paulo` by
//! default). The clock itself is injected so tests can pin "now".

use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc};
use chrono_tz::Tz;
use std::sync::{Arc, Mutex};

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Sao_Paulo;

/// Weekday keys used by operating schedules, indexed 0=Sunday..6=Saturday.
pub const WEEKDAY_KEYS: [&str; 7] = [
    "domingo", "segunda", "terca", "quarta", "quinta", "sexta", "sabado",
];

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// A clock paired with the timezone local dates and times are rendered in.
#[derive(Clone)]
pub struct LocalClock {
    clock: Arc<dyn Clock>,
    tz: Tz,
}

impl LocalClock {
    pub fn new(clock: Arc<dyn Clock>, tz: Tz) -> Self {
        Self { clock, tz }
    }

    pub fn system(tz: Tz) -> Self {
        Self::new(Arc::new(SystemClock), tz)
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn snapshot(&self) -> LocalNow {
        LocalNow::at(self.clock.now(), self.tz)
    }
}

/// One reading of the clock, viewed both as a UTC instant and in local time.
#[derive(Debug, Clone, Copy)]
pub struct LocalNow {
    pub utc: DateTime<Utc>,
    pub local: DateTime<Tz>,
}

impl LocalNow {
    pub fn at(utc: DateTime<Utc>, tz: Tz) -> Self {
        Self {
            utc,
            local: utc.with_timezone(&tz),
        }
    }

    /// Schedule key of the local weekday (`"domingo"` .. `"sabado"`).
    pub fn weekday_key(&self) -> &'static str {
        WEEKDAY_KEYS[self.local.weekday().num_days_from_sunday() as usize]
    }

    /// Local wall time as zero-padded 24h `HH:MM`.
    pub fn hhmm(&self) -> String {
        self.local.format("%H:%M").to_string()
    }

    pub fn local_date(&self) -> NaiveDate {
        self.local.date_naive()
    }

    /// `DD/MM/YYYY às HH:MM` in local time.
    pub fn display(&self) -> String {
        self.local.format("%d/%m/%Y às %H:%M").to_string()
    }

    /// RFC 3339 UTC instant with millisecond precision and a `Z` suffix.
    pub fn iso(&self) -> String {
        iso_timestamp(self.utc)
    }
}

pub fn iso_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Calendar date of an RFC 3339 instant as seen in `tz`.
///
/// Returns `None` for empty or unparsable input.
pub fn local_date_of(instant: &str, tz: Tz) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(instant)
        .ok()
        .map(|dt| dt.with_timezone(&tz).date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn weekday_key_uses_local_date() {
        // 2024-06-02 01:30 UTC is still Saturday 22:30 in São Paulo.
        let now = LocalNow::at(utc(2024, 6, 2, 1, 30), DEFAULT_TIMEZONE);
        assert_eq!(now.weekday_key(), "sabado");
        assert_eq!(now.hhmm(), "22:30");

        let now = LocalNow::at(utc(2024, 6, 2, 15, 0), DEFAULT_TIMEZONE);
        assert_eq!(now.weekday_key(), "domingo");
    }

    #[test]
    fn display_format() {
        let now = LocalNow::at(utc(2024, 3, 5, 12, 7), DEFAULT_TIMEZONE);
        assert_eq!(now.display(), "05/03/2024 às 09:07");
        assert_eq!(now.iso(), "2024-03-05T12:07:00.000Z");
    }

    #[test]
    fn local_date_of_shifts_into_timezone() {
        let date = local_date_of("2024-06-02T01:30:00.000Z", DEFAULT_TIMEZONE).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert!(local_date_of("", DEFAULT_TIMEZONE).is_none());
        assert!(local_date_of("yesterday", DEFAULT_TIMEZONE).is_none());
    }

    #[test]
    fn fixed_clock_moves_when_set() {
        let clock = FixedClock::new(utc(2024, 1, 1, 0, 0));
        clock.set(utc(2024, 1, 2, 0, 0));
        assert_eq!(clock.now(), utc(2024, 1, 2, 0, 0));
    }
}
