//! Finds the toll booths on or near a route (§4.6): a spatial bbox
//! prefilter, precise segment-projection scoring, then ordering and
//! deduplication. Pure and deterministic — running it twice on the same
//! route yields the same output.

use crate::config::Tolerances;
use crate::geo::{haversine_m, project_onto_polyline, BBox, LonLat};
use crate::model::{DetectedToll, RouteProbe, TollBooth};
use crate::spatial::BoothIndex;

pub struct DetectOutput {
    pub on_route: Vec<DetectedToll>,
    pub nearby: Vec<DetectedToll>,
}

/// Runs the three-phase detector against `probe` (§4.6).
pub fn detect_tolls(probe: &RouteProbe, booths: &[TollBooth], index: &BoothIndex, tol: &Tolerances) -> DetectOutput {
    let polyline = &probe.polyline;

    let Some(bbox) = BBox::from_points(polyline) else {
        return DetectOutput {
            on_route: Vec::new(),
            nearby: Vec::new(),
        };
    };
    let prefiltered = index.query_bbox(bbox.expanded(tol.detector_prefilter_deg));

    let mut on_route = Vec::new();
    let mut nearby = Vec::new();

    for booth_id in prefiltered {
        let booth = &booths[booth_id as usize];
        let Some(projection) = project_onto_polyline(booth.point, polyline) else {
            continue;
        };
        if projection.dist_m <= tol.detector_on_route_m {
            on_route.push(DetectedToll {
                booth: booth_id,
                route_point_index: projection.segment_index,
                distance_m: projection.dist_m,
                position: crate::geo::normalized_position(polyline, &projection),
            });
        } else if projection.dist_m <= tol.detector_nearby_m {
            nearby.push(DetectedToll {
                booth: booth_id,
                route_point_index: projection.segment_index,
                distance_m: projection.dist_m,
                position: crate::geo::normalized_position(polyline, &projection),
            });
        }
    }

    on_route.sort_by(|a, b| a.position.partial_cmp(&b.position).expect("positions are finite"));
    let on_route = dedup_on_route(on_route, booths, tol.detector_dedup_m);

    DetectOutput { on_route, nearby }
}

fn identifier_completeness(booth: &TollBooth) -> u32 {
    let mut score = 0;
    if booth.name.is_some() {
        score += 2;
    }
    if booth.operator.is_some() {
        score += 2;
    }
    if booth.highway.is_some() {
        score += 1;
    }
    if !booth.id.is_empty() {
        score += 1;
    }
    score
}

fn substring_overlap(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

fn semantically_similar(a: &TollBooth, b: &TollBooth) -> bool {
    let operator_match = match (&a.operator, &b.operator) {
        (Some(x), Some(y)) => x == y,
        _ => true,
    };
    let highway_match = match (&a.highway, &b.highway) {
        (Some(x), Some(y)) => x == y,
        _ => true,
    };
    let kind_match = a.kind == b.kind;
    let name_match = match (&a.name, &b.name) {
        (Some(x), Some(y)) => substring_overlap(x, y),
        _ => true,
    };
    operator_match && highway_match && kind_match && name_match
}

/// Collapses booths within `dedup_m` of each other that are also
/// semantically similar, keeping the one closest to the route; ties break
/// on identifier-completeness then lowest id (§4.6 step 3).
fn dedup_on_route(sorted: Vec<DetectedToll>, booths: &[TollBooth], dedup_m: f64) -> Vec<DetectedToll> {
    let mut out: Vec<DetectedToll> = Vec::new();

    'next: for candidate in sorted {
        let candidate_booth = &booths[candidate.booth as usize];
        for kept in out.iter_mut() {
            let kept_booth = &booths[kept.booth as usize];
            let gc_dist = haversine_m(candidate_booth.point, kept_booth.point);
            if gc_dist > dedup_m || !semantically_similar(candidate_booth, kept_booth) {
                continue;
            }

            let better = better_duplicate(&candidate, candidate_booth, kept, kept_booth);
            if better {
                *kept = candidate;
            }
            continue 'next;
        }
        out.push(candidate);
    }

    out
}

fn better_duplicate(a: &DetectedToll, a_booth: &TollBooth, b: &DetectedToll, b_booth: &TollBooth) -> bool {
    if a.distance_m != b.distance_m {
        return a.distance_m < b.distance_m;
    }
    let score_a = identifier_completeness(a_booth);
    let score_b = identifier_completeness(b_booth);
    if score_a != score_b {
        return score_a > score_b;
    }
    a_booth.id < b_booth.id
}
