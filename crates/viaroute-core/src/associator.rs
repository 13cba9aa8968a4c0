//! Associates each [`CompleteRamp`] with at most one [`TollBooth`] (§4.3):
//! candidates come from a bounding-box scan of the ramp's polyline, the
//! closest one within epsilon wins, and a booth already claimed by a closer
//! ramp is never reassigned.

use crate::geo::{project_onto_polyline, BBox};
use crate::model::{BoothId, CompleteRamp, TollBooth};

struct Claim {
    ramp_index: usize,
    dist_m: f64,
}

/// Associates booths to ramps in place, setting `associated_booth` and
/// `booth_distance_m` on each [`CompleteRamp`]. `epsilon_m` and
/// `bbox_margin_deg` come from [`crate::config::Tolerances`].
pub fn associate_booths(ramps: &mut [CompleteRamp], booths: &[TollBooth], epsilon_m: f64, bbox_margin_deg: f64) {
    let mut claims: std::collections::HashMap<BoothId, Claim> = std::collections::HashMap::new();

    for (ramp_index, ramp) in ramps.iter().enumerate() {
        let polyline = ramp.polyline();
        let Some(bbox) = BBox::from_points(&polyline) else {
            continue;
        };
        let envelope = bbox.expanded(bbox_margin_deg);

        let mut best: Option<(BoothId, f64)> = None;
        for (booth_id, booth) in booths.iter().enumerate() {
            let booth_id = booth_id as BoothId;
            if !envelope.contains(booth.point) {
                continue;
            }
            let Some(projection) = project_onto_polyline(booth.point, &polyline) else {
                continue;
            };
            if projection.dist_m > epsilon_m {
                continue;
            }
            let better = match &best {
                None => true,
                Some((best_id, best_dist)) => {
                    projection.dist_m < *best_dist
                        || (projection.dist_m == *best_dist && booth.id < booths[*best_id as usize].id)
                }
            };
            if better {
                best = Some((booth_id, projection.dist_m));
            }
        }

        let Some((booth_id, dist_m)) = best else {
            continue;
        };

        let should_claim = match claims.get(&booth_id) {
            None => true,
            Some(existing) => dist_m < existing.dist_m,
        };
        if should_claim {
            claims.insert(booth_id, Claim { ramp_index, dist_m });
        }
    }

    for (booth_id, claim) in claims {
        ramps[claim.ramp_index].associated_booth = Some(booth_id);
        ramps[claim.ramp_index].booth_distance_m = Some(claim.dist_m);
    }
}
