//! Builds [`CompleteRamp`]s out of the raw entry/exit/indeterminate segments
//! (§4.2): indeterminate segments are chained by exact endpoint equality,
//! then entries and exits attach to whichever chain their free end matches.
//! Leftover chains and segments are kept as orphans for offline inspection,
//! never surfaced through the query API.

use crate::geo::LonLat;
use crate::model::{CompleteRamp, RampId, RampSegment, RampType};

fn point_key(p: LonLat) -> (u64, u64) {
    (p.lon.to_bits(), p.lat.to_bits())
}

fn points_equal(a: LonLat, b: LonLat) -> bool {
    point_key(a) == point_key(b)
}

/// Output of the ramp linker (§4.2, step 5): usable ramps plus everything
/// that could not be chained or attached, kept for debugging only.
pub struct LinkResult {
    pub ramps: Vec<CompleteRamp>,
    pub orphan_chains: Vec<Vec<RampSegment>>,
}

/// Chains indeterminate segments by exact coordinate match: a segment
/// extends a chain's head or tail iff the matching endpoints are bit-for-bit
/// equal. Segments are visited in id order so repeated runs on identical
/// input produce identical chains (§4.2 determinism note).
fn build_indeterminate_chains(mut segments: Vec<RampSegment>) -> Vec<Vec<RampSegment>> {
    segments.sort_by(|a, b| a.id.cmp(&b.id));
    let n = segments.len();
    let mut claimed = vec![false; n];
    let mut chains = Vec::new();

    for start_idx in 0..n {
        if claimed[start_idx] {
            continue;
        }
        claimed[start_idx] = true;
        let mut chain = vec![segments[start_idx].clone()];

        loop {
            let head = chain.first().expect("chain is never empty").first();
            let tail = chain.last().expect("chain is never empty").last();
            let mut extended = false;

            for i in 0..n {
                if claimed[i] {
                    continue;
                }
                let seg = &segments[i];
                if points_equal(seg.first(), tail) {
                    chain.push(seg.clone());
                    claimed[i] = true;
                    extended = true;
                    break;
                }
                if points_equal(seg.last(), head) {
                    chain.insert(0, seg.clone());
                    claimed[i] = true;
                    extended = true;
                    break;
                }
            }

            if !extended {
                break;
            }
        }

        chains.push(chain);
    }

    chains
}

/// Links entries, exits and indeterminate segments into [`CompleteRamp`]s
/// (§4.2). `entries` and `exits` are each sorted by id before attachment so
/// the result is deterministic regardless of input order.
pub fn link_ramps(
    entries: Vec<RampSegment>,
    exits: Vec<RampSegment>,
    indeterminate: Vec<RampSegment>,
) -> LinkResult {
    let chains = build_indeterminate_chains(indeterminate);
    let mut chain_used = vec![false; chains.len()];
    let mut ramps = Vec::new();

    let mut sorted_entries = entries;
    sorted_entries.sort_by(|a, b| a.id.cmp(&b.id));
    for entry in sorted_entries {
        let attach_idx = chains.iter().enumerate().position(|(i, chain)| {
            !chain_used[i] && points_equal(chain.last().expect("chain is never empty").last(), entry.first())
        });

        let segments = match attach_idx {
            Some(i) => {
                chain_used[i] = true;
                let mut segs = chains[i].clone();
                segs.push(entry);
                segs
            }
            None => vec![entry],
        };

        ramps.push(unplaced_ramp(RampType::Entry, segments));
    }

    let mut sorted_exits = exits;
    sorted_exits.sort_by(|a, b| a.id.cmp(&b.id));
    for exit in sorted_exits {
        let attach_idx = chains.iter().enumerate().position(|(i, chain)| {
            !chain_used[i] && points_equal(chain.first().expect("chain is never empty").first(), exit.last())
        });

        let segments = match attach_idx {
            Some(i) => {
                chain_used[i] = true;
                let mut segs = vec![exit];
                segs.extend(chains[i].iter().cloned());
                segs
            }
            None => vec![exit],
        };

        ramps.push(unplaced_ramp(RampType::Exit, segments));
    }

    let orphan_chains = chains
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !chain_used[*i])
        .map(|(_, chain)| chain)
        .collect();

    for (index, ramp) in ramps.iter_mut().enumerate() {
        ramp.id = index as RampId;
    }

    LinkResult { ramps, orphan_chains }
}

fn unplaced_ramp(ramp_type: RampType, segments: Vec<RampSegment>) -> CompleteRamp {
    CompleteRamp {
        id: 0,
        ramp_type,
        segments,
        associated_booth: None,
        booth_distance_m: None,
    }
}
