//! R-tree spatial indices over toll booths and ramp endpoints (§4.5). Built
//! once from a finished [`crate::Model`] and queried read-only afterwards;
//! every handle stored in the tree is a dense index into the model's arenas,
//! never a pointer.

use rstar::primitives::GeomWithData;
use rstar::{RTree, AABB};

use crate::geo::{BBox, LonLat};
use crate::model::{BoothId, CompleteRamp, RampId, RampType, TollBooth};

type BoothPoint = GeomWithData<[f64; 2], BoothId>;
type RampEndpoint = GeomWithData<[f64; 2], RampId>;

fn to_xy(p: LonLat) -> [f64; 2] {
    [p.lon, p.lat]
}

fn bbox_to_aabb(bbox: BBox) -> AABB<[f64; 2]> {
    AABB::from_corners([bbox.min_lon, bbox.min_lat], [bbox.max_lon, bbox.max_lat])
}

/// Indexes every [`TollBooth`] by its point.
pub struct BoothIndex {
    tree: RTree<BoothPoint>,
}

impl BoothIndex {
    pub fn build(booths: &[TollBooth]) -> Self {
        let items = booths
            .iter()
            .enumerate()
            .map(|(i, b)| GeomWithData::new(to_xy(b.point), i as BoothId))
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    /// All booth handles whose point falls within `bbox`.
    pub fn query_bbox(&self, bbox: BBox) -> Vec<BoothId> {
        self.tree
            .locate_in_envelope(&bbox_to_aabb(bbox))
            .map(|item| item.data)
            .collect()
    }

    /// Booth handles within `radius_m` (approximated via an equirectangular
    /// degree margin) of `center`, ordered nearest-first.
    pub fn query_radius(&self, center: LonLat, radius_m: f64) -> Vec<BoothId> {
        let margin_deg = radius_m / 111_000.0;
        let envelope = bbox_to_aabb(BBox {
            min_lon: center.lon - margin_deg,
            min_lat: center.lat - margin_deg,
            max_lon: center.lon + margin_deg,
            max_lat: center.lat + margin_deg,
        });
        let mut candidates: Vec<(f64, BoothId)> = self
            .tree
            .locate_in_envelope(&envelope)
            .map(|item| {
                let p = LonLat::new(item.geom()[0], item.geom()[1]);
                (crate::geo::haversine_m(center, p), item.data)
            })
            .filter(|(d, _)| *d <= radius_m)
            .collect();
        candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).expect("distances are finite"));
        candidates.into_iter().map(|(_, id)| id).collect()
    }
}

/// Indexes ramps by endpoint, partitioned by ramp type: `Exit` ramps by
/// their start point (for exit lookups, §4.8), `Entry` ramps by their end
/// point (for entry lookups). A ramp never appears in the tree for the
/// other role.
pub struct RampEndpointIndex {
    by_start: RTree<RampEndpoint>,
    by_end: RTree<RampEndpoint>,
}

impl RampEndpointIndex {
    pub fn build(ramps: &[CompleteRamp]) -> Self {
        let starts = ramps
            .iter()
            .filter(|r| r.ramp_type == RampType::Exit)
            .map(|r| GeomWithData::new(to_xy(r.start_point()), r.id))
            .collect();
        let ends = ramps
            .iter()
            .filter(|r| r.ramp_type == RampType::Entry)
            .map(|r| GeomWithData::new(to_xy(r.end_point()), r.id))
            .collect();
        Self {
            by_start: RTree::bulk_load(starts),
            by_end: RTree::bulk_load(ends),
        }
    }

    /// Ramp handles whose *end* point (the point an entry ramp feeds traffic
    /// onto the mainline from) lies within `radius_m` of `center`.
    pub fn entries_near(&self, center: LonLat, radius_m: f64) -> Vec<RampId> {
        Self::query(&self.by_end, center, radius_m)
    }

    /// Ramp handles whose *start* point (where an exit ramp leaves the
    /// mainline) lies within `radius_m` of `center`.
    pub fn exits_near(&self, center: LonLat, radius_m: f64) -> Vec<RampId> {
        Self::query(&self.by_start, center, radius_m)
    }

    fn query(tree: &RTree<RampEndpoint>, center: LonLat, radius_m: f64) -> Vec<RampId> {
        let margin_deg = radius_m / 111_000.0;
        let envelope = bbox_to_aabb(BBox {
            min_lon: center.lon - margin_deg,
            min_lat: center.lat - margin_deg,
            max_lon: center.lon + margin_deg,
            max_lat: center.lat + margin_deg,
        });
        let mut candidates: Vec<(f64, RampId)> = tree
            .locate_in_envelope(&envelope)
            .map(|item| {
                let p = LonLat::new(item.geom()[0], item.geom()[1]);
                (crate::geo::haversine_m(center, p), item.data)
            })
            .filter(|(d, _)| *d <= radius_m)
            .collect();
        candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).expect("distances are finite"));
        candidates.into_iter().map(|(_, id)| id).collect()
    }
}
