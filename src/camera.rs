//! Camera placement for route snapshots: centre the route's bounding box and
//! pick the Web-Mercator zoom that fits it inside the padded viewport.

use serde::{Deserialize, Serialize};

const TILE_SIZE: f64 = 512.0;
const MAX_ZOOM: f64 = 22.0;
const SINGLE_POINT_ZOOM: f64 = 15.0;
const ZERO_SPAN_ZOOM: f64 = 16.0;
const MIN_SPAN: f64 = 1e-9;

pub const DEFAULT_PADDING: f64 = 70.0;

/// Deserializes from a `[lat, lon]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(c: Coordinate) -> Self {
        [c.lat, c.lon]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            padding: DEFAULT_PADDING,
        }
    }

    fn usable(&self) -> (f64, f64) {
        (
            (self.width - self.padding * 2.0).max(1.0),
            (self.height - self.padding * 2.0).max(1.0),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraFit {
    pub center: Option<Coordinate>,
    pub zoom: f64,
}

fn x_norm(lon: f64) -> f64 {
    (lon + 180.0) / 360.0
}

fn y_norm(lat: f64) -> f64 {
    let s = lat.to_radians().sin();
    let y = 0.5 - ((1.0 + s) / (1.0 - s)).ln() / (4.0 * std::f64::consts::PI);
    y.clamp(0.0, 1.0)
}

pub fn fit_camera(coords: &[Coordinate], viewport: &Viewport) -> CameraFit {
    if coords.len() < 2 {
        return CameraFit {
            center: coords.first().copied(),
            zoom: SINGLE_POINT_ZOOM,
        };
    }

    let (mut min_lat, mut max_lat) = (90.0_f64, -90.0_f64);
    let (mut min_lon, mut max_lon) = (180.0_f64, -180.0_f64);
    for c in coords {
        min_lat = min_lat.min(c.lat);
        max_lat = max_lat.max(c.lat);
        min_lon = min_lon.min(c.lon);
        max_lon = max_lon.max(c.lon);
    }

    let center = Coordinate::new((min_lat + max_lat) / 2.0, (min_lon + max_lon) / 2.0);

    let dx = (x_norm(max_lon) - x_norm(min_lon)).abs();
    let dy = (y_norm(max_lat) - y_norm(min_lat)).abs();

    let zoom = if dx < MIN_SPAN && dy < MIN_SPAN {
        ZERO_SPAN_ZOOM
    } else {
        let (usable_w, usable_h) = viewport.usable();
        let scale = (usable_w / dx.max(MIN_SPAN)).min(usable_h / dy.max(MIN_SPAN));
        (scale / TILE_SIZE).log2().clamp(0.0, MAX_ZOOM)
    };

    CameraFit {
        center: Some(center),
        zoom,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_route_has_no_center() {
        let fit = fit_camera(&[], &Viewport::new(600.0, 400.0));
        assert_eq!(fit.center, None);
        assert_eq!(fit.zoom, 15.0);
    }

    #[test]
    fn single_point_is_centered_at_default_zoom() {
        let point = Coordinate::new(61.1, 10.4);
        let fit = fit_camera(&[point], &Viewport::new(600.0, 400.0));
        assert_eq!(fit.center, Some(point));
        assert_eq!(fit.zoom, 15.0);
    }

    #[test]
    fn repeated_point_uses_close_zoom() {
        let point = Coordinate::new(61.1, 10.4);
        let fit = fit_camera(&[point, point, point], &Viewport::new(600.0, 400.0));
        assert_eq!(fit.center, Some(point));
        assert_eq!(fit.zoom, 16.0);
    }

    #[test]
    fn east_west_route_is_limited_by_width() {
        let coords = [Coordinate::new(46.0, 7.0), Coordinate::new(46.0, 7.01)];
        let fit = fit_camera(&coords, &Viewport::new(600.0, 600.0));

        // usable 460 px over 0.01/360 of the world, in 512 px tiles
        let expected = (460.0 / (0.01 / 360.0) / 512.0_f64).log2();
        assert!((fit.zoom - expected).abs() < 1e-6, "zoom {}", fit.zoom);
        let center = fit.center.unwrap();
        assert!((center.lon - 7.005).abs() < 1e-9);
        assert_eq!(center.lat, 46.0);
    }

    #[test]
    fn whole_world_clamps_to_zero() {
        let coords = [Coordinate::new(-80.0, -179.0), Coordinate::new(80.0, 179.0)];
        let fit = fit_camera(&coords, &Viewport::new(300.0, 200.0));
        assert_eq!(fit.zoom, 0.0);
    }

    #[test]
    fn tiny_viewport_still_fits() {
        let coords = [Coordinate::new(46.0, 7.0), Coordinate::new(46.001, 7.001)];
        let fit = fit_camera(&coords, &Viewport::new(100.0, 100.0));
        assert!(fit.zoom >= 0.0 && fit.zoom <= 22.0);
    }

    #[test]
    fn coordinates_parse_from_pairs() {
        let mut json = b"[[46.0, 7.0], [46.5, 7.25]]".to_vec();
        let coords: Vec<Coordinate> = simd_json::serde::from_slice(&mut json).unwrap();
        assert_eq!(coords, vec![Coordinate::new(46.0, 7.0), Coordinate::new(46.5, 7.25)]);
    }
}
