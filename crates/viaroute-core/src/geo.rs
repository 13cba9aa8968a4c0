//! Geographic primitives shared by the ramp linker, associator, detector,
//! optimizer and cost calculator: a lon/lat point type, haversine distance,
//! point-to-segment projection and bounding-box arithmetic.
//!
//! Distances returned by [`closest_point_on_segment`] and [`haversine_m`] are
//! in meters; [`haversine_km`] is a convenience wrapper for the cost model.

use serde::{Deserialize, Serialize};

/// A longitude/latitude coordinate pair, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BBox {
    pub fn from_points(points: &[LonLat]) -> Option<Self> {
        let mut iter = points.iter();
        let first = iter.next()?;
        let mut bbox = BBox {
            min_lon: first.lon,
            min_lat: first.lat,
            max_lon: first.lon,
            max_lat: first.lat,
        };
        for p in iter {
            bbox.min_lon = bbox.min_lon.min(p.lon);
            bbox.min_lat = bbox.min_lat.min(p.lat);
            bbox.max_lon = bbox.max_lon.max(p.lon);
            bbox.max_lat = bbox.max_lat.max(p.lat);
        }
        Some(bbox)
    }

    pub fn expanded(&self, margin_deg: f64) -> Self {
        Self {
            min_lon: self.min_lon - margin_deg,
            min_lat: self.min_lat - margin_deg,
            max_lon: self.max_lon + margin_deg,
            max_lat: self.max_lat + margin_deg,
        }
    }

    pub fn contains(&self, p: LonLat) -> bool {
        p.lon >= self.min_lon && p.lon <= self.max_lon && p.lat >= self.min_lat && p.lat <= self.max_lat
    }
}

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points, in meters.
pub fn haversine_m(a: LonLat, b: LonLat) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().asin();
    EARTH_RADIUS_M * c
}

/// Great-circle distance between two points, in kilometers.
pub fn haversine_km(a: LonLat, b: LonLat) -> f64 {
    haversine_m(a, b) / 1000.0
}

/// The nearest point on segment `a -> b` to `p`, expressed as a fraction `t`
/// along the segment, the projected point itself, and the distance from `p`
/// to that point (in meters, using a local equirectangular approximation --
/// adequate at motorway-segment scale, a few hundred meters at most).
#[derive(Debug, Clone, Copy)]
pub struct ClosestPoint {
    pub t: f64,
    pub point: LonLat,
    pub dist_m: f64,
}

pub fn clamp01(v: f64) -> f64 {
    if v < 0.0 {
        0.0
    } else if v > 1.0 {
        1.0
    } else {
        v
    }
}

/// Projects `p` onto segment `a -> b`. Uses an equirectangular projection
/// centered on the segment's latitude to turn degrees into locally-flat
/// meters before solving the usual vector projection, then measures the
/// resulting point with [`haversine_m`] so results line up with other
/// distance computations in this crate.
pub fn closest_point_on_segment(p: LonLat, a: LonLat, b: LonLat) -> ClosestPoint {
    let lat0 = ((a.lat + b.lat) / 2.0).to_radians();
    let cos_lat0 = lat0.cos();

    let to_xy = |q: LonLat| -> (f64, f64) { (q.lon * cos_lat0, q.lat) };

    let (ax, ay) = to_xy(a);
    let (bx, by) = to_xy(b);
    let (px, py) = to_xy(p);

    let abx = bx - ax;
    let aby = by - ay;
    let ab2 = abx * abx + aby * aby;

    let t = if ab2 == 0.0 {
        0.0
    } else {
        clamp01(((px - ax) * abx + (py - ay) * aby) / ab2)
    };

    let point = LonLat::new(a.lon + (b.lon - a.lon) * t, a.lat + (b.lat - a.lat) * t);
    let dist_m = haversine_m(p, point);

    ClosestPoint { t, point, dist_m }
}

/// Minimum distance (meters) and nearest-point index from `p` to a polyline,
/// along with the fractional position within that segment (used to derive a
/// normalized position along the whole route).
#[derive(Debug, Clone, Copy)]
pub struct PolylineProjection {
    pub segment_index: usize,
    pub dist_m: f64,
    pub t: f64,
}

/// Projects `p` onto every segment of `polyline` and returns the closest.
/// `polyline` must have at least 2 points.
pub fn project_onto_polyline(p: LonLat, polyline: &[LonLat]) -> Option<PolylineProjection> {
    if polyline.len() < 2 {
        return None;
    }
    let mut best: Option<PolylineProjection> = None;
    for (i, pair) in polyline.windows(2).enumerate() {
        let cp = closest_point_on_segment(p, pair[0], pair[1]);
        let better = match &best {
            None => true,
            Some(b) => cp.dist_m < b.dist_m,
        };
        if better {
            best = Some(PolylineProjection {
                segment_index: i,
                dist_m: cp.dist_m,
                t: cp.t,
            });
        }
    }
    best
}

/// Cumulative length (meters) of a polyline up to and including segment
/// `projection.segment_index`, interpolated by `projection.t`. Used to turn a
/// [`PolylineProjection`] into a normalized `[0, 1]` position along the route.
pub fn normalized_position(polyline: &[LonLat], projection: &PolylineProjection) -> f64 {
    let total: f64 = polyline.windows(2).map(|w| haversine_m(w[0], w[1])).sum();
    if total == 0.0 {
        return 0.0;
    }
    let mut accum = 0.0;
    for (i, pair) in polyline.windows(2).enumerate() {
        let seg_len = haversine_m(pair[0], pair[1]);
        if i < projection.segment_index {
            accum += seg_len;
        } else if i == projection.segment_index {
            accum += seg_len * projection.t;
            break;
        }
    }
    clamp01(accum / total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_paris_lyon_is_about_390km() {
        let paris = LonLat::new(2.3522, 48.8566);
        let lyon = LonLat::new(4.8357, 45.7640);
        let d = haversine_km(paris, lyon);
        assert!((d - 392.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn projection_onto_segment_midpoint() {
        let a = LonLat::new(0.0, 0.0);
        let b = LonLat::new(0.0, 1.0);
        let p = LonLat::new(0.001, 0.5);
        let cp = closest_point_on_segment(p, a, b);
        assert!((cp.t - 0.5).abs() < 1e-6);
        assert!(cp.dist_m > 0.0 && cp.dist_m < 200.0);
    }

    #[test]
    fn projection_clamps_to_endpoints() {
        let a = LonLat::new(0.0, 0.0);
        let b = LonLat::new(0.0, 1.0);
        let p = LonLat::new(0.0, -5.0);
        let cp = closest_point_on_segment(p, a, b);
        assert_eq!(cp.t, 0.0);
    }

    #[test]
    fn bbox_expands_symmetrically() {
        let pts = [LonLat::new(1.0, 1.0), LonLat::new(2.0, 3.0)];
        let bbox = BBox::from_points(&pts).unwrap().expanded(0.1);
        assert!((bbox.min_lon - 0.9).abs() < 1e-9);
        assert!((bbox.max_lat - 3.1).abs() < 1e-9);
    }

    #[test]
    fn normalized_position_is_monotonic_along_polyline() {
        let polyline = vec![
            LonLat::new(0.0, 0.0),
            LonLat::new(0.0, 1.0),
            LonLat::new(0.0, 2.0),
        ];
        let near_start = project_onto_polyline(LonLat::new(0.0, 0.1), &polyline).unwrap();
        let near_end = project_onto_polyline(LonLat::new(0.0, 1.9), &polyline).unwrap();
        let pos_start = normalized_position(&polyline, &near_start);
        let pos_end = normalized_position(&polyline, &near_end);
        assert!(pos_start < pos_end);
    }
}
