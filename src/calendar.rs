//! Calendar arithmetic for bucketing sessions by local day, week and month.
//!
//! Bucket keys are `NaiveDate`s in the calendar's time zone. Stepping happens
//! on dates, never on instants, so a 23 or 25 hour day still yields exactly
//! one bucket. Instants are only produced at the edges, through
//! [`StatsCalendar::start_of_day`] and [`StatsCalendar::local_instant`].

use chrono::{
    DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone,
    Utc, Weekday,
};
use chrono_tz::Tz;

use crate::config::CalendarConfig;
use crate::types::DateInterval;
use crate::utils::{get_local_timezone, warn_once};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsCalendar {
    tz: Tz,
    week_start: Weekday,
}

impl StatsCalendar {
    pub fn new(tz: Tz, week_start: Weekday) -> Self {
        Self { tz, week_start }
    }

    /// UTC with ISO (Monday) weeks.
    pub fn utc() -> Self {
        Self::new(Tz::UTC, Weekday::Mon)
    }

    /// Build the calendar from config. An empty time zone means the system
    /// zone; an unknown one falls back to UTC with a warning.
    pub fn from_config(config: &CalendarConfig) -> Self {
        let name = if config.time_zone.trim().is_empty() {
            get_local_timezone()
        } else {
            config.time_zone.trim().to_string()
        };

        let tz = match name.parse::<Tz>() {
            Ok(tz) => tz,
            Err(e) => {
                warn_once(format!("Unknown time zone '{name}' ({e}), using UTC"));
                Tz::UTC
            }
        };

        let week_start = match config.week_start.trim().parse::<Weekday>() {
            Ok(day) => day,
            Err(_) => {
                warn_once(format!(
                    "Unknown week start '{}', using Monday",
                    config.week_start
                ));
                Weekday::Mon
            }
        };

        Self::new(tz, week_start)
    }

    pub fn time_zone(&self) -> Tz {
        self.tz
    }

    pub fn week_start(&self) -> Weekday {
        self.week_start
    }

    /// Local calendar day of an instant.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// Local midnight of `date` as an instant.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        self.resolve_local(date.and_time(NaiveTime::MIN))
    }

    /// Local wall-clock time on `date` as an instant. Out-of-range clock
    /// fields are clamped to 23:59:59.
    pub fn local_instant(&self, date: NaiveDate, hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
        let time = NaiveTime::from_hms_opt(hour.min(23), min.min(59), sec.min(59))
            .unwrap_or(NaiveTime::MIN);
        self.resolve_local(date.and_time(time))
    }

    /// Ambiguous local times take the earlier instant. Times inside a DST
    /// gap move forward to the first valid instant.
    fn resolve_local(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        if let Some(dt) = self.tz.from_local_datetime(&naive).earliest() {
            return dt.with_timezone(&Utc);
        }

        // Gaps are at most a couple of hours; probe forward in 15 minute steps.
        (1..=12)
            .filter_map(|step| {
                self.tz
                    .from_local_datetime(&(naive + TimeDelta::minutes(15 * step)))
                    .earliest()
            })
            .next()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
    }

    /// First day of the week containing `date`, per the configured week start.
    pub fn start_of_week(&self, date: NaiveDate) -> NaiveDate {
        Self::week_beginning(date, self.week_start)
    }

    /// Monday of the ISO week containing `date`, whatever the configured start.
    pub fn start_of_iso_week(&self, date: NaiveDate) -> NaiveDate {
        Self::week_beginning(date, Weekday::Mon)
    }

    fn week_beginning(date: NaiveDate, first: Weekday) -> NaiveDate {
        let offset = (7 + date.weekday().num_days_from_monday() - first.num_days_from_monday()) % 7;
        date.checked_sub_days(Days::new(offset as u64))
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn start_of_month(&self, date: NaiveDate) -> NaiveDate {
        date.with_day(1).unwrap_or(date)
    }

    pub fn add_days(&self, date: NaiveDate, days: u64) -> NaiveDate {
        date.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
    }

    pub fn add_weeks(&self, date: NaiveDate, weeks: u64) -> NaiveDate {
        self.add_days(date, weeks.saturating_mul(7))
    }

    pub fn add_months(&self, date: NaiveDate, months: u32) -> NaiveDate {
        date.checked_add_months(Months::new(months))
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn days_in_month(&self, date: NaiveDate) -> u64 {
        let first = self.start_of_month(date);
        let next = self.add_months(first, 1);
        next.signed_duration_since(first).num_days().max(0) as u64
    }

    /// Last local day whose midnight lies before `interval.end`, if the
    /// interval is non-empty.
    fn last_day(&self, interval: &DateInterval) -> Option<NaiveDate> {
        if interval.is_empty() {
            return None;
        }
        let mut last = self.local_date(interval.end);
        if self.start_of_day(last) >= interval.end {
            last = last.pred_opt()?;
        }
        Some(last)
    }

    /// Every local day from the day containing `interval.start` up to the
    /// last day starting before `interval.end`. Empty for an empty interval.
    pub fn days_in(&self, interval: &DateInterval) -> Vec<NaiveDate> {
        let Some(last) = self.last_day(interval) else {
            return Vec::new();
        };
        let first = self.local_date(interval.start);
        let count = last.signed_duration_since(first).num_days() + 1;
        if count <= 0 {
            return Vec::new();
        }

        first.iter_days().take(count as usize).collect()
    }

    /// Mondays of every ISO week touching the interval, ascending.
    pub fn iso_weeks_in(&self, interval: &DateInterval) -> Vec<NaiveDate> {
        let Some(last) = self.last_day(interval) else {
            return Vec::new();
        };
        let first_week = self.start_of_iso_week(self.local_date(interval.start));
        let last_week = self.start_of_iso_week(last);
        let span = last_week.signed_duration_since(first_week).num_days();
        if span < 0 {
            return Vec::new();
        }

        let count = span / 7 + 1;
        (0..count as u64)
            .map(|week| self.add_weeks(first_week, week))
            .collect()
    }
}

impl Default for StatsCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn start_of_week_honours_configured_start_day() {
        let monday = StatsCalendar::utc();
        let sunday = StatsCalendar::new(Tz::UTC, Weekday::Sun);

        // 2025-01-15 is a Wednesday.
        assert_eq!(monday.start_of_week(date(2025, 1, 15)), date(2025, 1, 13));
        assert_eq!(sunday.start_of_week(date(2025, 1, 15)), date(2025, 1, 12));
        assert_eq!(monday.start_of_week(date(2025, 1, 13)), date(2025, 1, 13));
        assert_eq!(sunday.start_of_week(date(2025, 1, 12)), date(2025, 1, 12));
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        let cal = StatsCalendar::utc();
        assert_eq!(cal.days_in_month(date(2024, 2, 10)), 29);
        assert_eq!(cal.days_in_month(date(2025, 2, 10)), 28);
        assert_eq!(cal.days_in_month(date(2025, 12, 31)), 31);
    }

    #[test]
    fn start_of_day_uses_local_midnight() {
        let cal = StatsCalendar::new(chrono_tz::Europe::Oslo, Weekday::Mon);
        let midnight = cal.start_of_day(date(2025, 1, 15));
        assert_eq!(midnight, Utc.with_ymd_and_hms(2025, 1, 14, 23, 0, 0).unwrap());
    }

    #[test]
    fn start_of_day_skips_forward_over_dst_gap() {
        // Havana springs forward at midnight: 2024-03-10 00:00 does not exist.
        let cal = StatsCalendar::new(chrono_tz::America::Havana, Weekday::Mon);
        let start = cal.start_of_day(date(2024, 3, 10));
        assert_eq!(cal.local_date(start), date(2024, 3, 10));
        assert!(start > cal.start_of_day(date(2024, 3, 9)));
    }

    #[test]
    fn days_in_excludes_day_starting_at_end() {
        let cal = StatsCalendar::utc();
        let interval = DateInterval::new(
            Utc.with_ymd_and_hms(2025, 1, 13, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 20, 0, 0, 0).unwrap(),
        );
        let days = cal.days_in(&interval);
        assert_eq!(days.len(), 7);
        assert_eq!(days.first(), Some(&date(2025, 1, 13)));
        assert_eq!(days.last(), Some(&date(2025, 1, 19)));
    }

    #[test]
    fn days_in_includes_partial_last_day() {
        let cal = StatsCalendar::utc();
        let interval = DateInterval::new(
            Utc.with_ymd_and_hms(2025, 4, 28, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 4, 30, 23, 59, 59).unwrap(),
        );
        assert_eq!(cal.days_in(&interval).len(), 3);
    }

    #[test]
    fn days_in_is_stable_across_dst_end() {
        // Oslo falls back on 2025-10-26, giving a 25 hour Sunday.
        let cal = StatsCalendar::new(chrono_tz::Europe::Oslo, Weekday::Mon);
        let start = cal.start_of_day(date(2025, 10, 20));
        let end = cal.start_of_day(date(2025, 10, 27));
        let days = cal.days_in(&DateInterval::new(start, end));
        assert_eq!(days.len(), 7);
        assert_eq!(days.last(), Some(&date(2025, 10, 26)));
    }

    #[test]
    fn empty_interval_has_no_days_or_weeks() {
        let cal = StatsCalendar::utc();
        let instant = Utc.with_ymd_and_hms(2025, 1, 13, 10, 0, 0).unwrap();
        let interval = DateInterval::new(instant, instant);
        assert!(cal.days_in(&interval).is_empty());
        assert!(cal.iso_weeks_in(&interval).is_empty());
    }

    #[test]
    fn iso_weeks_in_covers_partial_weeks_at_both_ends() {
        let cal = StatsCalendar::utc();
        // Friday 2024-11-01 .. Wednesday 2025-04-30 23:59:59
        let interval = DateInterval::new(
            Utc.with_ymd_and_hms(2024, 11, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 4, 30, 23, 59, 59).unwrap(),
        );
        let weeks = cal.iso_weeks_in(&interval);
        assert_eq!(weeks.first(), Some(&date(2024, 10, 28)));
        assert_eq!(weeks.last(), Some(&date(2025, 4, 28)));
        assert_eq!(weeks.len(), 27);
    }

    #[test]
    fn iso_weeks_ignore_configured_week_start() {
        let sunday = StatsCalendar::new(Tz::UTC, Weekday::Sun);
        // 2025-01-12 is a Sunday; its ISO week began on Monday the 6th.
        assert_eq!(sunday.start_of_week(date(2025, 1, 12)), date(2025, 1, 12));
        assert_eq!(sunday.start_of_iso_week(date(2025, 1, 12)), date(2025, 1, 6));

        let interval = DateInterval::new(
            Utc.with_ymd_and_hms(2024, 11, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 4, 30, 23, 59, 59).unwrap(),
        );
        let weeks = sunday.iso_weeks_in(&interval);
        assert_eq!(weeks.first(), Some(&date(2024, 10, 28)));
        assert_eq!(weeks.len(), 27);
        assert!(weeks.iter().all(|w| w.weekday() == Weekday::Mon));
    }

    #[test]
    fn from_config_falls_back_to_utc_for_unknown_zone() {
        let cal = StatsCalendar::from_config(&CalendarConfig {
            time_zone: "Mars/Olympus_Mons".to_string(),
            week_start: "sun".to_string(),
        });
        assert_eq!(cal.time_zone(), Tz::UTC);
        assert_eq!(cal.week_start(), Weekday::Sun);
    }
}
