//! Opening-hours evaluation.
//!
//! Only the local wall-clock time matters; dates are ignored. A window whose
//! closing time is not strictly after its opening time runs overnight, so
//! `22:00–02:00` is open late in the evening and in the small hours.

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;

/// Daily opening window in store-local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpeningWindow {
    opens_at: NaiveTime,
    closes_at: NaiveTime,
}

impl OpeningWindow {
    /// Create a window; `closes_at <= opens_at` means it spans midnight.
    #[must_use]
    pub const fn new(opens_at: NaiveTime, closes_at: NaiveTime) -> Self {
        Self {
            opens_at,
            closes_at,
        }
    }

    /// Local opening time.
    #[must_use]
    pub const fn opens_at(&self) -> NaiveTime {
        self.opens_at
    }

    /// Local closing time.
    #[must_use]
    pub const fn closes_at(&self) -> NaiveTime {
        self.closes_at
    }

    /// Whether the window runs past midnight.
    #[must_use]
    pub fn spans_midnight(&self) -> bool {
        self.closes_at <= self.opens_at
    }

    /// Whether `local` falls inside the window. Both bounds are inclusive.
    #[must_use]
    pub fn contains(&self, local: NaiveTime) -> bool {
        if self.spans_midnight() {
            local >= self.opens_at || local <= self.closes_at
        } else {
            self.opens_at <= local && local <= self.closes_at
        }
    }
}

/// When a store accepts orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpeningHours {
    /// No hours configured; the store never closes.
    #[default]
    AlwaysOpen,
    /// Open during a daily window.
    Window(OpeningWindow),
}

impl OpeningHours {
    /// Build hours from optional bounds. Both must be present for a window.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveTime;
    /// use deliveryzone_core::OpeningHours;
    ///
    /// let eight = NaiveTime::from_hms_opt(8, 0, 0);
    /// assert_eq!(OpeningHours::from_bounds(eight, None), OpeningHours::AlwaysOpen);
    /// assert!(matches!(
    ///     OpeningHours::from_bounds(eight, NaiveTime::from_hms_opt(22, 0, 0)),
    ///     OpeningHours::Window(_)
    /// ));
    /// ```
    #[must_use]
    pub const fn from_bounds(opens_at: Option<NaiveTime>, closes_at: Option<NaiveTime>) -> Self {
        match (opens_at, closes_at) {
            (Some(opens), Some(closes)) => Self::Window(OpeningWindow::new(opens, closes)),
            _ => Self::AlwaysOpen,
        }
    }

    /// The configured window, if any.
    #[must_use]
    pub const fn window(&self) -> Option<OpeningWindow> {
        match self {
            Self::AlwaysOpen => None,
            Self::Window(window) => Some(*window),
        }
    }

    /// Whether the store is open at `now` in `timezone`.
    #[must_use]
    pub fn is_open_at(&self, timezone: Tz, now: DateTime<Utc>) -> bool {
        match self {
            Self::AlwaysOpen => true,
            Self::Window(window) => window.contains(now.with_timezone(&timezone).time()),
        }
    }
}

/// Parse `HH:MM` or `HH:MM:SS`.
#[must_use]
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::{America::New_York, Europe::London};
    use rstest::rstest;

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
    }

    fn window(opens: (u32, u32), closes: (u32, u32)) -> OpeningHours {
        OpeningHours::Window(OpeningWindow::new(
            time(opens.0, opens.1),
            time(closes.0, closes.1),
        ))
    }

    /// Midwinter instant so London local time equals UTC.
    fn january_utc(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, hour, minute, 0)
            .single()
            .expect("valid instant")
    }

    #[rstest]
    #[case((8, 0), (22, 0), (23, 0), false)]
    #[case((8, 0), (22, 0), (12, 0), true)]
    #[case((8, 0), (22, 0), (8, 0), true)]
    #[case((8, 0), (22, 0), (22, 0), true)]
    #[case((8, 0), (22, 0), (7, 59), false)]
    #[case((22, 0), (2, 0), (23, 0), true)]
    #[case((22, 0), (2, 0), (1, 30), true)]
    #[case((22, 0), (2, 0), (2, 0), true)]
    #[case((22, 0), (2, 0), (3, 0), false)]
    #[case((22, 0), (2, 0), (12, 0), false)]
    fn evaluates_windows(
        #[case] opens: (u32, u32),
        #[case] closes: (u32, u32),
        #[case] at: (u32, u32),
        #[case] expected: bool,
    ) {
        let hours = window(opens, closes);
        assert_eq!(hours.is_open_at(London, january_utc(at.0, at.1)), expected);
    }

    #[rstest]
    fn equal_bounds_are_open_all_day() {
        let hours = window((9, 0), (9, 0));
        assert!(hours.is_open_at(London, january_utc(3, 0)));
        assert!(hours.is_open_at(London, january_utc(15, 0)));
    }

    #[rstest]
    fn always_open_ignores_the_clock() {
        assert!(OpeningHours::AlwaysOpen.is_open_at(London, january_utc(3, 0)));
    }

    #[rstest]
    fn converts_to_store_timezone() {
        // 14:00 UTC is 09:00 in New York during January.
        let hours = window((9, 0), (17, 0));
        assert!(hours.is_open_at(New_York, january_utc(14, 0)));
        assert!(!hours.is_open_at(New_York, january_utc(13, 59)));
    }

    #[rstest]
    fn applies_daylight_saving_offset() {
        // 21:30 UTC in July is 22:30 BST.
        let now = Utc
            .with_ymd_and_hms(2026, 7, 1, 21, 30, 0)
            .single()
            .expect("valid instant");
        assert!(!window((8, 0), (22, 0)).is_open_at(London, now));
        assert!(window((22, 0), (2, 0)).is_open_at(London, now));
    }

    #[rstest]
    #[case("08:00", Some(time(8, 0)))]
    #[case("22:30:00", Some(time(22, 30)))]
    #[case(" 07:15 ", Some(time(7, 15)))]
    #[case("25:00", None)]
    #[case("noon", None)]
    fn parses_time_of_day(#[case] raw: &str, #[case] expected: Option<NaiveTime>) {
        assert_eq!(parse_time_of_day(raw), expected);
    }
}
