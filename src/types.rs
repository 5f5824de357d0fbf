use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Heart-rate and energy readings taken from the platform health store for
/// the time span of a session. Either value may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_heart_rate_bpm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_energy_kcal: Option<f64>,
}

/// A recorded ski/snowboard session as exported by the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkiSession {
    #[serde(deserialize_with = "crate::utils::deserialize_utc_timestamp")]
    pub start_at: DateTime<Utc>,
    pub duration_sec: u64,
    pub distance_km: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_speed_kmh: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_drop_m: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthMetrics>,
}

impl SkiSession {
    #[cfg(test)]
    pub fn new(start_at: DateTime<Utc>, duration_sec: u64, distance_km: f64) -> Self {
        Self {
            start_at,
            duration_sec,
            distance_km,
            top_speed_kmh: None,
            elevation_drop_m: None,
            health: None,
        }
    }

    /// Heatmap weight in minutes. Any positive duration counts for at least one.
    pub fn occurrence_weight(&self) -> u64 {
        (self.duration_sec / 60).max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ReportingScope {
    Week,
    Month,
    Season,
}

impl fmt::Display for ReportingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportingScope::Week => write!(f, "week"),
            ReportingScope::Month => write!(f, "month"),
            ReportingScope::Season => write!(f, "season"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Duration,
    Distance,
    /// Snow days. Reported through the occurrence map, not the series.
    #[value(name = "occurrence")]
    OccurrenceCount,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Duration => write!(f, "duration"),
            Metric::Distance => write!(f, "distance"),
            Metric::OccurrenceCount => write!(f, "occurrence"),
        }
    }
}

/// Half-open range of instants: `start` is included, `end` is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTotals {
    pub total_duration_sec: u64,
    pub total_distance_km: f64,
    pub session_count: usize,
}

/// Local calendar day -> summed intensity weight (minutes, at least 1 per session).
pub type OccurrenceMap = BTreeMap<NaiveDate, u64>;

/// Dense day grid of an interval together with the days that saw activity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Heatmap {
    pub days: Vec<NaiveDate>,
    pub weights: OccurrenceMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapCell {
    pub date: NaiveDate,
    pub weight: u64,
}

impl Heatmap {
    /// Number of distinct days with recorded activity.
    pub fn occurrence_days(&self) -> usize {
        self.weights.values().filter(|w| **w > 0).count()
    }

    pub fn weight(&self, day: NaiveDate) -> u64 {
        self.weights.get(&day).copied().unwrap_or(0)
    }

    /// One cell per grid day, zero-weighted where nothing was recorded.
    pub fn cells(&self) -> Vec<HeatmapCell> {
        self.days
            .iter()
            .map(|day| HeatmapCell {
                date: *day,
                weight: self.weight(*day),
            })
            .collect()
    }
}

/// One page of the season calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthBucket {
    pub year: i32,
    pub month: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MonthBucket {
    pub fn interval(&self) -> DateInterval {
        DateInterval::new(self.start, self.end)
    }

    pub fn id(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }
}

/// What the stats screen is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSelection {
    pub scope: ReportingScope,
    pub metric: Metric,
    /// Season month page. Ignored for other scopes; clamped to the available pages.
    pub season_page: usize,
}

impl Default for StatsSelection {
    fn default() -> Self {
        Self {
            scope: ReportingScope::Week,
            metric: Metric::Duration,
            season_page: 0,
        }
    }
}

/// Everything the stats screen renders for one selection, recomputed as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub scope: ReportingScope,
    pub metric: Metric,
    pub interval: DateInterval,
    pub totals: SummaryTotals,
    pub occurrence_days: usize,
    pub series: Vec<TimeSeriesPoint>,
    pub heatmap: Vec<HeatmapCell>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub season_months: Vec<MonthBucket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season_page: Option<usize>,
}
