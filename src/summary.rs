use serde::Serialize;

use crate::types::{HealthMetrics, SkiSession};
use crate::utils::{NumberFormatOptions, format_distance_km, format_duration_secs};

/// Values shown on the end-of-session summary card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub distance_km: f64,
    pub avg_speed_kmh: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_speed_kmh: Option<f64>,
    pub duration_sec: u64,
    pub duration_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation_drop_m: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_heart_rate_bpm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_energy_kcal: Option<f64>,
}

impl SessionSummary {
    pub fn from_session(session: &SkiSession) -> Self {
        let avg_speed_kmh = if session.duration_sec > 0 {
            session.distance_km / (session.duration_sec as f64 / 3600.0)
        } else {
            0.0
        };
        let health = session.health.clone().unwrap_or_default();

        Self {
            distance_km: session.distance_km,
            avg_speed_kmh,
            top_speed_kmh: session.top_speed_kmh,
            duration_sec: session.duration_sec,
            duration_text: format_duration_secs(session.duration_sec),
            elevation_drop_m: session.elevation_drop_m,
            avg_heart_rate_bpm: health.avg_heart_rate_bpm,
            active_energy_kcal: health.active_energy_kcal,
        }
    }

    /// Replace the health readings, e.g. after a late health-store query.
    /// Missing readings leave the current values alone.
    pub fn with_health(mut self, health: &HealthMetrics) -> Self {
        if health.avg_heart_rate_bpm.is_some() {
            self.avg_heart_rate_bpm = health.avg_heart_rate_bpm;
        }
        if health.active_energy_kcal.is_some() {
            self.active_energy_kcal = health.active_energy_kcal;
        }
        self
    }

    /// `(label, value)` rows in card order. Absent readings are left out.
    pub fn rows(&self, options: &NumberFormatOptions) -> Vec<(&'static str, String)> {
        let prec = options.decimal_places;
        let mut rows = vec![
            ("Distance", format_distance_km(self.distance_km, options)),
            ("Avg speed", format!("{:.prec$} km/h", self.avg_speed_kmh)),
        ];
        if let Some(top) = self.top_speed_kmh {
            rows.push(("Top speed", format!("{top:.prec$} km/h")));
        }
        rows.push(("Duration", self.duration_text.clone()));
        if let Some(drop) = self.elevation_drop_m {
            rows.push(("Vertical drop", format!("{drop} m")));
        }
        if let Some(bpm) = self.avg_heart_rate_bpm {
            rows.push(("Avg heart rate", format!("{bpm:.0} bpm")));
        }
        if let Some(kcal) = self.active_energy_kcal {
            rows.push(("Active energy", format!("{kcal:.0} kcal")));
        }
        rows
    }
}
