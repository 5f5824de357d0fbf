//! Plain-text rendering of stats reports for the terminal.

use std::fmt::Write;

use chrono::{NaiveDate, Weekday};

use crate::calendar::StatsCalendar;
use crate::summary::SessionSummary;
use crate::types::{HeatmapCell, Metric, MonthBucket, StatsReport};
use crate::utils::{
    NumberFormatOptions, format_date_for_display, format_distance_km, format_duration_minutes,
    format_duration_secs, format_number, intensity_glyph,
};

fn weekday_initial(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "M",
        Weekday::Tue => "T",
        Weekday::Wed => "W",
        Weekday::Thu => "T",
        Weekday::Fri => "F",
        Weekday::Sat => "S",
        Weekday::Sun => "S",
    }
}

fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        _ => "December",
    }
}

/// Calendar grid of heatmap cells, one row per week, columns starting on the
/// calendar's week start.
pub fn heatmap_grid(cells: &[HeatmapCell], calendar: &StatsCalendar) -> String {
    let mut out = String::new();

    let mut day = calendar.week_start();
    for _ in 0..7 {
        let _ = write!(out, "{} ", weekday_initial(day));
        day = day.succ();
    }
    out.push('\n');

    let Some(first) = cells.first() else {
        return out;
    };

    let lead = first
        .date
        .signed_duration_since(calendar.start_of_week(first.date))
        .num_days() as usize;
    let mut column = 0;
    for _ in 0..lead {
        out.push_str("  ");
        column += 1;
    }

    for cell in cells {
        let _ = write!(out, "{} ", intensity_glyph(cell.weight));
        column += 1;
        if column == 7 {
            out.push('\n');
            column = 0;
        }
    }
    if column != 0 {
        out.push('\n');
    }
    out
}

fn series_value(metric: Metric, value: f64, options: &NumberFormatOptions) -> String {
    match metric {
        Metric::Duration => format_duration_minutes(value),
        Metric::Distance => format_distance_km(value, options),
        Metric::OccurrenceCount => "-".to_string(),
    }
}

pub fn stats_report(
    report: &StatsReport,
    calendar: &StatsCalendar,
    today: NaiveDate,
    options: &NumberFormatOptions,
) -> String {
    let mut out = String::new();
    let start = calendar.local_date(report.interval.start);
    let last = calendar
        .days_in(&report.interval)
        .last()
        .copied()
        .unwrap_or(start);

    let _ = writeln!(
        out,
        "📊 {} stats, {} to {}",
        report.scope,
        format_date_for_display(start, today),
        format_date_for_display(last, today)
    );
    let _ = writeln!(
        out,
        "   Duration:  {}",
        format_duration_secs(report.totals.total_duration_sec)
    );
    let _ = writeln!(
        out,
        "   Distance:  {}",
        format_distance_km(report.totals.total_distance_km, options)
    );
    let _ = writeln!(
        out,
        "   Snow days: {}",
        format_number(report.occurrence_days as u64, options)
    );
    let _ = writeln!(
        out,
        "   Sessions:  {}",
        format_number(report.totals.session_count as u64, options)
    );
    out.push('\n');

    if report.metric == Metric::OccurrenceCount {
        if let Some(page) = report.season_page
            && let Some(month) = report.season_months.get(page)
        {
            let _ = writeln!(
                out,
                "{} {} ({}/{})",
                month_name(month.month),
                month.year,
                page + 1,
                report.season_months.len()
            );
        }
        out.push_str(&heatmap_grid(&report.heatmap, calendar));
    } else {
        for point in &report.series {
            let _ = writeln!(
                out,
                "{:>12}  {}",
                format_date_for_display(point.date, today),
                series_value(report.metric, point.value, options)
            );
        }
    }

    out
}

pub fn season_months(months: &[MonthBucket], calendar: &StatsCalendar) -> String {
    let mut out = String::new();
    if months.is_empty() {
        out.push_str("No season months.\n");
        return out;
    }
    for (index, month) in months.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>2}  {}  {} {}  ({} to {})",
            index,
            month.id(),
            month_name(month.month),
            month.year,
            calendar.local_date(month.start),
            calendar.local_date(month.end)
        );
    }
    out
}

pub fn session_summary(summary: &SessionSummary, options: &NumberFormatOptions) -> String {
    let mut out = String::from("🎿 Session summary\n");
    for (label, value) in summary.rows(options) {
        let _ = writeln!(out, "   {label:<15} {value}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::StatsAggregator;
    use crate::types::{ReportingScope, SkiSession, StatsSelection};
    use chrono::{Datelike, TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn heatmap_grid_aligns_first_day_to_weekday() {
        let calendar = StatsCalendar::utc();
        // 2025-01-01 is a Wednesday: two blank columns first.
        let cells: Vec<HeatmapCell> = date(2025, 1, 1)
            .iter_days()
            .take(5)
            .map(|d| HeatmapCell {
                date: d,
                weight: if d.day() == 3 { 45 } else { 0 },
            })
            .collect();

        let grid = heatmap_grid(&cells, &calendar);
        let lines: Vec<&str> = grid.lines().collect();
        assert_eq!(lines[0], "M T W T F S S ");
        assert_eq!(lines[1], "    · · ▓ · · ");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn heatmap_grid_of_no_cells_is_header_only() {
        let grid = heatmap_grid(&[], &StatsCalendar::utc());
        assert_eq!(grid, "M T W T F S S \n");
    }

    #[test]
    fn stats_report_lists_series_for_duration() {
        let calendar = StatsCalendar::utc();
        let aggregator = StatsAggregator::new(calendar);
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let sessions = vec![SkiSession::new(
            Utc.with_ymd_and_hms(2025, 1, 13, 9, 0, 0).unwrap(),
            3600,
            5.0,
        )];

        let report = aggregator.report(&sessions, &StatsSelection::default(), now);
        let text = stats_report(&report, &calendar, date(2025, 1, 15), &NumberFormatOptions::default());

        assert!(text.contains("week stats"));
        assert!(text.contains("Sessions:  1"));
        assert!(text.contains("1/13/2025  1h 0m"));
        assert!(text.contains("1/15/2025*  0 min"));
    }

    #[test]
    fn stats_report_shows_season_page_title() {
        let calendar = StatsCalendar::utc();
        let aggregator = StatsAggregator::new(calendar);
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap();
        let selection = StatsSelection {
            scope: ReportingScope::Season,
            metric: Metric::OccurrenceCount,
            season_page: 1,
        };

        let report = aggregator.report(&[], &selection, now);
        let text = stats_report(&report, &calendar, date(2025, 3, 15), &NumberFormatOptions::default());
        assert!(text.contains("December 2024 (2/6)"));
    }

    #[test]
    fn season_months_lists_pages() {
        let calendar = StatsCalendar::utc();
        let months = StatsAggregator::new(calendar)
            .build_season_month_buckets(Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap());
        let text = season_months(&months, &calendar);

        assert_eq!(text.lines().count(), 6);
        assert!(text.lines().next().unwrap().contains("November 2024"));
        assert!(text.contains("(2025-04-01 to 2025-05-01)"));
    }
}
