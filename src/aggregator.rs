use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::calendar::StatsCalendar;
use crate::types::{
    DateInterval, Heatmap, Metric, MonthBucket, OccurrenceMap, ReportingScope, SkiSession,
    StatsReport, StatsSelection, SummaryTotals, TimeSeriesPoint,
};

/// Derives chart series, totals and snow-day heatmaps from session records.
///
/// Holds nothing but the calendar used for bucketing; every method is a pure
/// function of its arguments and recomputes from the full session slice.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsAggregator {
    calendar: StatsCalendar,
}

impl StatsAggregator {
    pub fn new(calendar: StatsCalendar) -> Self {
        Self { calendar }
    }

    /// Year in which the season containing `now` starts (its November).
    fn season_start_year(&self, now: DateTime<Utc>) -> i32 {
        let today = self.calendar.local_date(now);
        let year = today.year();
        match today.month() {
            11 | 12 => year,
            1..=4 => year - 1,
            // May through October report the season that ended in April.
            _ => year - 1,
        }
    }

    fn first_of(year: i32, month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn resolve_interval(&self, scope: ReportingScope, now: DateTime<Utc>) -> DateInterval {
        let cal = &self.calendar;
        let today = cal.local_date(now);

        match scope {
            ReportingScope::Week => {
                let start = cal.start_of_week(today);
                DateInterval::new(cal.start_of_day(start), cal.start_of_day(cal.add_days(start, 7)))
            }
            ReportingScope::Month => {
                let start = cal.start_of_month(today);
                let end = cal.add_days(start, cal.days_in_month(start));
                DateInterval::new(cal.start_of_day(start), cal.start_of_day(end))
            }
            ReportingScope::Season => {
                let year = self.season_start_year(now);
                let start = Self::first_of(year, 11);
                let last = NaiveDate::from_ymd_opt(year + 1, 4, 30).unwrap_or(NaiveDate::MAX);
                DateInterval::new(cal.start_of_day(start), cal.local_instant(last, 23, 59, 59))
            }
        }
    }

    /// Sessions starting inside the interval, in input order.
    pub fn filter_sessions(&self, sessions: &[SkiSession], interval: &DateInterval) -> Vec<SkiSession> {
        sessions
            .iter()
            .filter(|s| interval.contains(s.start_at))
            .cloned()
            .collect()
    }

    pub fn compute_totals(&self, subset: &[SkiSession]) -> SummaryTotals {
        subset.iter().fold(SummaryTotals::default(), |mut totals, s| {
            totals.total_duration_sec = totals.total_duration_sec.saturating_add(s.duration_sec);
            totals.total_distance_km += s.distance_km;
            totals.session_count += 1;
            totals
        })
    }

    fn bucket_key(&self, scope: ReportingScope, start_at: DateTime<Utc>) -> NaiveDate {
        let day = self.calendar.local_date(start_at);
        match scope {
            ReportingScope::Week | ReportingScope::Month => day,
            ReportingScope::Season => self.calendar.start_of_iso_week(day),
        }
    }

    /// Dense series over the interval: one point per day (Week, Month) or per
    /// ISO week (Season), zero where nothing was recorded.
    pub fn compute_series(
        &self,
        subset: &[SkiSession],
        interval: &DateInterval,
        scope: ReportingScope,
        metric: Metric,
    ) -> Vec<TimeSeriesPoint> {
        let grid = match scope {
            ReportingScope::Week | ReportingScope::Month => self.calendar.days_in(interval),
            ReportingScope::Season => self.calendar.iso_weeks_in(interval),
        };

        // (seconds, kilometres) per bucket
        let mut buckets: BTreeMap<NaiveDate, (u64, f64)> = BTreeMap::new();
        for session in subset.iter().filter(|s| interval.contains(s.start_at)) {
            let entry = buckets
                .entry(self.bucket_key(scope, session.start_at))
                .or_default();
            entry.0 = entry.0.saturating_add(session.duration_sec);
            entry.1 += session.distance_km;
        }

        grid.into_iter()
            .map(|date| {
                let (secs, km) = buckets.get(&date).copied().unwrap_or_default();
                let value = match metric {
                    Metric::Duration => secs as f64 / 60.0,
                    Metric::Distance => km,
                    Metric::OccurrenceCount => 0.0,
                };
                TimeSeriesPoint { date, value }
            })
            .collect()
    }

    /// Snow-day heatmap for an interval. Zero-duration sessions do not mark a day.
    pub fn build_occurrence_map(&self, interval: &DateInterval, sessions: &[SkiSession]) -> Heatmap {
        let days = self.calendar.days_in(interval);
        let mut weights = OccurrenceMap::new();

        for session in sessions
            .iter()
            .filter(|s| interval.contains(s.start_at) && s.duration_sec > 0)
        {
            *weights
                .entry(self.calendar.local_date(session.start_at))
                .or_insert(0) += session.occurrence_weight();
        }

        Heatmap { days, weights }
    }

    /// Month pages of the season containing `reference_now`, November through
    /// April, each ending no later than May 1.
    pub fn build_season_month_buckets(&self, reference_now: DateTime<Utc>) -> Vec<MonthBucket> {
        let cal = &self.calendar;
        let year = self.season_start_year(reference_now);
        let window_start = Self::first_of(year, 11);
        let window_end = Self::first_of(year + 1, 5);

        let months = (window_end.year() - window_start.year()) * 12 + window_end.month() as i32
            - window_start.month() as i32;

        (0..months.max(0) as u32)
            .map(|offset| {
                let month_start = cal.add_months(window_start, offset);
                let month_end = cal.add_months(month_start, 1).min(window_end);
                MonthBucket {
                    year: month_start.year(),
                    month: month_start.month(),
                    start: cal.start_of_day(month_start),
                    end: cal.start_of_day(month_end),
                }
            })
            .collect()
    }

    pub fn occurrence_map_for_month(&self, bucket: &MonthBucket, sessions: &[SkiSession]) -> Heatmap {
        self.build_occurrence_map(&bucket.interval(), sessions)
    }

    /// Clamps `page` to the available months and builds that month's heatmap.
    fn season_page(
        &self,
        months: &[MonthBucket],
        page: usize,
        sessions: &[SkiSession],
    ) -> (usize, Heatmap) {
        let page = page.min(months.len().saturating_sub(1));
        let heatmap = months
            .get(page)
            .map(|bucket| self.occurrence_map_for_month(bucket, sessions))
            .unwrap_or_default();
        (page, heatmap)
    }

    /// Full recompute of everything the stats screen shows for `selection`.
    ///
    /// The heatmap covers the whole interval, except for Season where it shows
    /// the selected month page. The snow-day count matches the heatmap when
    /// snow days are the selected metric, and the whole interval otherwise.
    pub fn report(
        &self,
        sessions: &[SkiSession],
        selection: &StatsSelection,
        now: DateTime<Utc>,
    ) -> StatsReport {
        let interval = self.resolve_interval(selection.scope, now);
        let in_range = self.filter_sessions(sessions, &interval);

        let totals = self.compute_totals(&in_range);
        let series = self.compute_series(&in_range, &interval, selection.scope, selection.metric);
        let full_heatmap = self.build_occurrence_map(&interval, &in_range);

        let (occurrence_days, heatmap, season_months, season_page) = match selection.scope {
            ReportingScope::Season => {
                let months = self.build_season_month_buckets(now);
                let (page, page_heatmap) =
                    self.season_page(&months, selection.season_page, sessions);
                // Snow days follow the month page while it is on screen.
                let occurrence_days = if selection.metric == Metric::OccurrenceCount {
                    page_heatmap.occurrence_days()
                } else {
                    full_heatmap.occurrence_days()
                };
                (occurrence_days, page_heatmap, months, Some(page))
            }
            ReportingScope::Week | ReportingScope::Month => {
                (full_heatmap.occurrence_days(), full_heatmap, Vec::new(), None)
            }
        };

        StatsReport {
            scope: selection.scope,
            metric: selection.metric,
            interval,
            totals,
            occurrence_days,
            series,
            heatmap: heatmap.cells(),
            season_months,
            season_page,
        }
    }

    /// Heatmap currently on screen for `selection`.
    pub fn displayed_heatmap(
        &self,
        sessions: &[SkiSession],
        selection: &StatsSelection,
        now: DateTime<Utc>,
    ) -> Heatmap {
        match selection.scope {
            ReportingScope::Season => {
                let months = self.build_season_month_buckets(now);
                self.season_page(&months, selection.season_page, sessions).1
            }
            scope => {
                let interval = self.resolve_interval(scope, now);
                self.build_occurrence_map(&interval, sessions)
            }
        }
    }
}
