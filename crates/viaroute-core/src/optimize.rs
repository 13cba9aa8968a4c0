//! Replaces a closed booth by a cheaper nearby entry-ramp booth (§4.8): the
//! driver exits the motorway before the closed booth and re-enters via a
//! ramp whose associated toll is on the route between the previous kept
//! booth and the one being replaced.

use crate::error::NoRampMatch;
use crate::geo::{closest_point_on_segment, project_onto_polyline, LonLat};
use crate::model::{BoothId, CompleteRamp, RampId, TollBooth};
use crate::spatial::RampEndpointIndex;

pub struct OptimizeContext<'a> {
    pub route_polyline: &'a [LonLat],
    pub booths: &'a [TollBooth],
    pub ramps: &'a [CompleteRamp],
    pub ramp_index: &'a RampEndpointIndex,
    pub radius_m: f64,
    pub corridor_m: f64,
}

/// A substitute found for a closed booth: the ramp used, the booth
/// associated with that ramp (used for pricing) and the *effective*
/// coordinate the driver actually crosses at (the ramp's endpoint, not the
/// associated booth's own point — §4.8 step 5).
#[derive(Debug, Clone)]
pub struct Substitute {
    pub ramp_id: RampId,
    pub booth_id: BoothId,
    pub effective_point: LonLat,
}

/// Finds a substitute for `closed_booth`, whose route position is
/// `closed_pos` (normalized `[0, 1]`). `prev_booth` is the previously kept
/// booth and its route position, or `None` if `closed_booth` is first in the
/// sequence.
pub fn find_substitute(
    closed_booth: &TollBooth,
    closed_pos: f64,
    prev_booth: Option<(&TollBooth, f64)>,
    ctx: &OptimizeContext,
) -> Result<Substitute, NoRampMatch> {
    let prev_point = prev_booth.map(|(b, _)| b.point).unwrap_or(ctx.route_polyline[0]);
    let prev_pos = prev_booth.map(|(_, p)| p).unwrap_or(0.0);

    let candidate_ramp_ids = ctx.ramp_index.entries_near(closed_booth.point, ctx.radius_m);

    let mut best: Option<(RampId, BoothId, f64)> = None;

    for ramp_id in candidate_ramp_ids {
        let ramp = &ctx.ramps[ramp_id as usize];
        let Some(booth_id) = ramp.associated_booth else {
            continue;
        };
        let candidate_booth = &ctx.booths[booth_id as usize];

        let Some(projection) = project_onto_polyline(candidate_booth.point, ctx.route_polyline) else {
            continue;
        };
        let candidate_pos = crate::geo::normalized_position(ctx.route_polyline, &projection);

        let between = candidate_pos > prev_pos.min(closed_pos) && candidate_pos < prev_pos.max(closed_pos);
        if !between {
            continue;
        }

        let corridor = closest_point_on_segment(candidate_booth.point, prev_point, closed_booth.point);
        if corridor.dist_m > ctx.corridor_m {
            continue;
        }

        let dist_to_closed = (candidate_pos - closed_pos).abs();
        let better = match &best {
            None => true,
            Some((_, _, best_dist)) => dist_to_closed < *best_dist,
        };
        if better {
            best = Some((ramp_id, booth_id, dist_to_closed));
        }
    }

    match best {
        Some((ramp_id, booth_id, _)) => {
            let ramp = &ctx.ramps[ramp_id as usize];
            Ok(Substitute {
                ramp_id,
                booth_id,
                effective_point: ramp.end_point(),
            })
        }
        None => {
            tracing::debug!(closed_booth_id = %closed_booth.id, "optimizer.no_substitute");
            Err(NoRampMatch {
                closed_booth_id: closed_booth.id.clone(),
            })
        }
    }
}
