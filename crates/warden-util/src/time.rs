//! Time utilities for warden
//!
//! Everything that makes a decision based on the current time takes the
//! time from a [`Clock`], so the scheduler and the confirmation path can be
//! driven by a [`ManualClock`] in tests.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `WARDEN_MOCK_TIME` environment variable can be set
//! to shift the [`SystemClock`]. The mock time is interpreted as UTC and
//! advances at the same rate as real time.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 12:30:00`)

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Timelike, Utc};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "WARDEN_MOCK_TIME";

/// Format accepted by `WARDEN_MOCK_TIME`
pub const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Cached mock time offset from the real time when the process started.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Utc::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match NaiveDateTime::parse_from_str(&mock_time_str, MOCK_TIME_FORMAT) {
                    Ok(naive_dt) => {
                        let mock_dt = Utc.from_utc_datetime(&naive_dt);
                        let offset = mock_dt.signed_duration_since(Utc::now());
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    }
                    Err(_) => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = MOCK_TIME_FORMAT,
                            "Invalid mock time format"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock, respecting `WARDEN_MOCK_TIME` in debug builds
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
    fn now(&self) -> DateTime<Utc> {
        let real_now = Utc::now();
        match get_mock_time_offset() {
            Some(offset) => real_now + offset,
            None => real_now,
        }
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.lock() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.lock();
        *now += by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        // A poisoned clock still holds a valid timestamp
        self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }
}

/// Daily enforcement campaign.
///
/// A tick is inside the window when, in the window's fixed UTC offset,
/// `start_hour <= hour <= end_hour` and `minute >= phase_minute`. With the
/// defaults (12, 16, phase 30, UTC) that is the five half-hour slots
/// 12:30, 13:30, 14:30, 15:30 and 16:30.
///
/// Only constructible through [`EnforcementWindow::new`] or `Default`, so
/// the offset is always a valid `FixedOffset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnforcementWindow {
    start_hour: u8,
    end_hour: u8,
    phase_minute: u8,
    utc_offset_minutes: i32,
}

impl EnforcementWindow {
    /// Returns `None` for out-of-range hours/minutes, an inverted range or
    /// an offset of a day or more.
    pub fn new(start_hour: u8, end_hour: u8, phase_minute: u8, utc_offset_minutes: i32) -> Option<Self> {
        if start_hour >= 24 || end_hour >= 24 || start_hour > end_hour {
            return None;
        }
        if phase_minute >= 60 {
            return None;
        }
        FixedOffset::east_opt(utc_offset_minutes.checked_mul(60)?)?;

        Some(Self {
            start_hour,
            end_hour,
            phase_minute,
            utc_offset_minutes,
        })
    }

    pub fn start_hour(&self) -> u8 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u8 {
        self.end_hour
    }

    pub fn phase_minute(&self) -> u8 {
        self.phase_minute
    }

    pub fn utc_offset_minutes(&self) -> i32 {
        self.utc_offset_minutes
    }

    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|| {
            tracing::warn!(
                utc_offset_minutes = self.utc_offset_minutes,
                "Invalid enforcement window offset, using UTC"
            );
            Utc.fix()
        })
    }

    /// `now` expressed in the window's reference offset
    pub fn local_time(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        now.with_timezone(&self.offset())
    }

    /// Whether a tick at `now` counts as part of the campaign
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let local = self.local_time(now);
        let hour = local.hour();
        let minute = local.minute();

        (self.start_hour as u32..=self.end_hour as u32).contains(&hour)
            && minute >= self.phase_minute as u32
    }

    /// No reminders once the local hour reaches `end_hour`
    pub fn allows_reminder(&self, now: DateTime<Utc>) -> bool {
        self.local_time(now).hour() < self.end_hour as u32
    }
}

impl Default for EnforcementWindow {
    fn default() -> Self {
        Self {
            start_hour: 12,
            end_hour: 16,
            phase_minute: 30,
            utc_offset_minutes: 0,
        }
    }
}

/// Convert a possibly fractional number of hours into a duration
pub fn hours_to_duration(hours: f64) -> chrono::Duration {
    chrono::Duration::try_milliseconds((hours * 3_600_000.0).round() as i64).unwrap_or(chrono::Duration::MAX)
}

/// Helper to format durations in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 29, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_default_window_slots() {
        let window = EnforcementWindow::default();

        assert!(window.contains(at(12, 30)));
        assert!(window.contains(at(14, 45)));
        assert!(window.contains(at(16, 30)));
        assert!(window.contains(at(16, 59)));

        assert!(!window.contains(at(12, 29)));
        assert!(!window.contains(at(13, 0)));
        assert!(!window.contains(at(11, 30)));
        assert!(!window.contains(at(17, 30)));
    }

    #[test]
    fn test_window_with_offset() {
        // 18:00-22:00 at UTC+05:30 is 12:30-16:30 UTC
        let window = EnforcementWindow::new(18, 22, 0, 330).unwrap();

        assert!(window.contains(at(12, 30)));
        assert!(window.contains(at(16, 29)));
        assert!(!window.contains(at(12, 29)));
        assert!(!window.contains(at(17, 30)));
    }

    #[test]
    fn test_reminders_suppressed_in_final_hour() {
        let window = EnforcementWindow::default();

        assert!(window.allows_reminder(at(12, 30)));
        assert!(window.allows_reminder(at(15, 59)));
        assert!(!window.allows_reminder(at(16, 30)));
    }

    #[test]
    fn test_window_rejects_bad_values() {
        assert!(EnforcementWindow::new(24, 16, 30, 0).is_none());
        assert!(EnforcementWindow::new(16, 12, 30, 0).is_none());
        assert!(EnforcementWindow::new(12, 16, 60, 0).is_none());
        assert!(EnforcementWindow::new(12, 16, 30, 24 * 60).is_none());
        assert!(EnforcementWindow::new(12, 12, 0, -300).is_some());
    }

    #[test]
    fn test_window_accessors() {
        let window = EnforcementWindow::new(9, 17, 15, -300).unwrap();
        assert_eq!(window.start_hour(), 9);
        assert_eq!(window.end_hour(), 17);
        assert_eq!(window.phase_minute(), 15);
        assert_eq!(window.utc_offset_minutes(), -300);

        // 14:15 UTC is 09:15 at UTC-05:00
        assert_eq!(window.local_time(at(14, 15)).hour(), 9);
        assert!(window.contains(at(14, 15)));
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(at(12, 0));
        assert_eq!(clock.now(), at(12, 0));

        clock.advance(chrono::Duration::minutes(45));
        assert_eq!(clock.now(), at(12, 45));

        clock.set(at(16, 30));
        assert_eq!(clock.now(), at(16, 30));
    }

    #[test]
    fn test_hours_to_duration() {
        assert_eq!(hours_to_duration(1.0), chrono::Duration::hours(1));
        assert_eq!(hours_to_duration(0.5), chrono::Duration::minutes(30));
        assert_eq!(hours_to_duration(2.25), chrono::Duration::minutes(135));
        assert_eq!(hours_to_duration(f64::MAX), chrono::Duration::MAX);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m 1s");
    }

    #[test]
    fn test_system_clock_returns_time() {
        let t = SystemClock.now();
        assert!(t.timestamp() > 0);
    }

    #[test]
    fn test_parse_mock_time_format() {
        assert!(NaiveDateTime::parse_from_str("2025-12-25 12:30:00", MOCK_TIME_FORMAT).is_ok());
        assert!(NaiveDateTime::parse_from_str("2025-12-25T12:30:00", MOCK_TIME_FORMAT).is_err());
        assert!(NaiveDateTime::parse_from_str("12:30:00", MOCK_TIME_FORMAT).is_err());
    }
}
