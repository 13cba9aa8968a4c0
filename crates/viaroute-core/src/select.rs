//! Reduces a detected toll list to satisfy a count target or a budget
//! (§4.7), always upholding the closed-pair rule: a Selection with exactly
//! one closed booth is never returned. The selector never fails; an
//! infeasible request degrades to a `toll-free-fallback` Selection.

use crate::config::RuntimeConfig;
use crate::cost::calculate_cost;
use crate::geo::LonLat;
use crate::model::{BoothId, CompleteRamp, DetectedToll, PricingGrid, Selection, SelectionReason, TollBooth, TollKind, VehicleClass};
use crate::optimize::{find_substitute, OptimizeContext};
use crate::spatial::RampEndpointIndex;

pub struct SelectContext<'a> {
    pub route_polyline: &'a [LonLat],
    pub booths: &'a [TollBooth],
    pub ramps: &'a [CompleteRamp],
    pub ramp_index: &'a RampEndpointIndex,
    pub pricing: &'a PricingGrid,
    pub config: &'a RuntimeConfig,
    pub class: VehicleClass,
}

fn is_closed(ctx: &SelectContext, d: &DetectedToll) -> bool {
    matches!(ctx.booths[d.booth as usize].kind, TollKind::Closed)
}

fn cost_of(ctx: &SelectContext, kept: &[DetectedToll]) -> f64 {
    let pairs: Vec<(BoothId, &TollBooth)> = kept.iter().map(|d| (d.booth, &ctx.booths[d.booth as usize])).collect();
    calculate_cost(&pairs, ctx.class, ctx.pricing, ctx.config).total
}

fn toll_free(reason: SelectionReason) -> Selection {
    tracing::debug!(?reason, "selector.fallback");
    Selection::toll_free(reason)
}

/// Finds the first index in `kept` whose removal would not leave exactly
/// one closed booth. Closed booths (earliest along the route first) are
/// tried before open booths, per §4.7.2 step 4.
fn pick_drop_index(ctx: &SelectContext, kept: &[DetectedToll]) -> Option<usize> {
    let mut closed_order: Vec<usize> = Vec::new();
    let mut open_order: Vec<usize> = Vec::new();
    for (i, d) in kept.iter().enumerate() {
        if is_closed(ctx, d) {
            closed_order.push(i);
        } else {
            open_order.push(i);
        }
    }

    for &idx in closed_order.iter().chain(open_order.iter()) {
        let remaining_closed = kept
            .iter()
            .enumerate()
            .filter(|(i, d)| *i != idx && is_closed(ctx, d))
            .count();
        if remaining_closed != 1 {
            return Some(idx);
        }
    }
    None
}

/// Count-mode selection (§4.7.2).
pub fn select_by_count(ctx: &SelectContext, l: &[DetectedToll], target: usize) -> Selection {
    if target == 0 {
        return toll_free(SelectionReason::TollFreeFallback);
    }

    if l.len() <= target {
        let closed_count = l.iter().filter(|d| is_closed(ctx, d)).count();
        if closed_count == 1 {
            return toll_free(SelectionReason::TollFreeFallback);
        }
        let total = cost_of(ctx, l);
        return Selection {
            kept: l.to_vec(),
            substitutions: Vec::new(),
            total_cost: total,
            reason: SelectionReason::CountMet,
        };
    }

    if target == 1 && !l.iter().any(|d| !is_closed(ctx, d)) {
        return toll_free(SelectionReason::TollFreeFallback);
    }

    let mut kept = l.to_vec();
    while kept.len() > target {
        match pick_drop_index(ctx, &kept) {
            Some(idx) => {
                kept.remove(idx);
            }
            None => return toll_free(SelectionReason::TollFreeFallback),
        }
    }

    let mut substitutions = Vec::new();

    // §4.7.2 step 5: if the trailing kept booth is closed and the original
    // list had booths after it that were dropped, try to improve it with a
    // cheaper entry-ramp substitute instead of leaving a bare closed exit.
    if let Some(last) = kept.last().cloned() {
        let last_was_original_last = l.last().map(|d| d.booth) == Some(last.booth);
        if is_closed(ctx, &last) && !last_was_original_last {
            let closed_booth = &ctx.booths[last.booth as usize];
            let prev = kept.len().checked_sub(2).map(|i| {
                let d = &kept[i];
                (&ctx.booths[d.booth as usize], d.position)
            });
            let opt_ctx = OptimizeContext {
                route_polyline: ctx.route_polyline,
                booths: ctx.booths,
                ramps: ctx.ramps,
                ramp_index: ctx.ramp_index,
                radius_m: ctx.config.tolerances.optimizer_radius_m,
                corridor_m: ctx.config.tolerances.optimizer_corridor_m,
            };
            if let Ok(sub) = find_substitute(closed_booth, last.position, prev, &opt_ctx) {
                substitutions.push((last.booth, sub.booth_id));
                let idx = kept.len() - 1;
                kept[idx] = DetectedToll {
                    booth: sub.booth_id,
                    route_point_index: last.route_point_index,
                    distance_m: 0.0,
                    position: last.position,
                };
            }
        }
    }

    let total = cost_of(ctx, &kept);
    Selection {
        kept,
        substitutions,
        total_cost: total,
        reason: SelectionReason::CountReduced,
    }
}

/// Budget-mode selection (§4.7.3).
pub fn select_by_budget(ctx: &SelectContext, l: &[DetectedToll], budget: f64) -> Selection {
    let base_cost = cost_of(ctx, l);
    if base_cost <= budget {
        return Selection {
            kept: l.to_vec(),
            substitutions: Vec::new(),
            total_cost: base_cost,
            reason: SelectionReason::BudgetMet,
        };
    }

    let mut kept = l.to_vec();
    let mut substitutions = Vec::new();
    let closed_indices: Vec<usize> = kept.iter().enumerate().filter(|(_, d)| is_closed(ctx, d)).map(|(i, _)| i).collect();

    for idx in closed_indices {
        let current = kept[idx].clone();
        let closed_booth = &ctx.booths[current.booth as usize];
        let prev = idx.checked_sub(1).map(|i| {
            let d = &kept[i];
            (&ctx.booths[d.booth as usize], d.position)
        });
        let opt_ctx = OptimizeContext {
            route_polyline: ctx.route_polyline,
            booths: ctx.booths,
            ramps: ctx.ramps,
            ramp_index: ctx.ramp_index,
            radius_m: ctx.config.tolerances.optimizer_radius_m,
            corridor_m: ctx.config.tolerances.optimizer_corridor_m,
        };

        if let Ok(sub) = find_substitute(closed_booth, current.position, prev, &opt_ctx) {
            kept[idx] = DetectedToll {
                booth: sub.booth_id,
                route_point_index: current.route_point_index,
                distance_m: 0.0,
                position: current.position,
            };
            substitutions.push((current.booth, sub.booth_id));

            let total = cost_of(ctx, &kept);
            if total <= budget {
                return Selection {
                    kept,
                    substitutions,
                    total_cost: total,
                    reason: SelectionReason::BudgetExitSubstitution,
                };
            }
        }
    }

    let all_open: Vec<DetectedToll> = l.iter().filter(|d| !is_closed(ctx, d)).cloned().collect();
    let open_cost = cost_of(ctx, &all_open);
    if !all_open.is_empty() && open_cost <= budget {
        return Selection {
            kept: all_open,
            substitutions: Vec::new(),
            total_cost: open_cost,
            reason: SelectionReason::BudgetMet,
        };
    }

    toll_free(SelectionReason::TollFreeFallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use std::collections::BTreeMap;

    fn booth(id: &str, kind: TollKind) -> TollBooth {
        TollBooth {
            id: id.to_string(),
            point: LonLat::new(0.0, 0.0),
            name: None,
            operator: Some("APRR".to_string()),
            highway: None,
            kind,
        }
    }

    fn detected(booth: BoothId, position: f64) -> DetectedToll {
        DetectedToll {
            booth,
            route_point_index: 0,
            distance_m: 0.0,
            position,
        }
    }

    fn test_ctx<'a>(
        booths: &'a [TollBooth],
        route: &'a [LonLat],
        ramps: &'a [CompleteRamp],
        ramp_index: &'a RampEndpointIndex,
        pricing: &'a PricingGrid,
        config: &'a RuntimeConfig,
    ) -> SelectContext<'a> {
        SelectContext {
            route_polyline: route,
            booths,
            ramps,
            ramp_index,
            pricing,
            config,
            class: VehicleClass::C1,
        }
    }

    #[test]
    fn count_zero_is_toll_free_fallback() {
        let booths = vec![booth("a", TollKind::Open)];
        let route = vec![LonLat::new(0.0, 0.0), LonLat::new(1.0, 1.0)];
        let ramps: Vec<CompleteRamp> = Vec::new();
        let ramp_index = RampEndpointIndex::build(&ramps);
        let pricing = PricingGrid::default();
        let config = RuntimeConfig::default();
        let ctx = test_ctx(&booths, &route, &ramps, &ramp_index, &pricing, &config);

        let l = vec![detected(0, 0.5)];
        let selection = select_by_count(&ctx, &l, 0);
        assert_eq!(selection.reason, SelectionReason::TollFreeFallback);
        assert!(selection.kept.is_empty());
    }

    #[test]
    fn already_under_target_returns_count_met() {
        let booths = vec![booth("a", TollKind::Open), booth("b", TollKind::Open)];
        let route = vec![LonLat::new(0.0, 0.0), LonLat::new(1.0, 1.0)];
        let ramps: Vec<CompleteRamp> = Vec::new();
        let ramp_index = RampEndpointIndex::build(&ramps);
        let pricing = PricingGrid::default();
        let config = RuntimeConfig::default();
        let ctx = test_ctx(&booths, &route, &ramps, &ramp_index, &pricing, &config);

        let l = vec![detected(0, 0.2), detected(1, 0.8)];
        let selection = select_by_count(&ctx, &l, 10);
        assert_eq!(selection.reason, SelectionReason::CountMet);
        assert_eq!(selection.kept.len(), 2);
    }

    #[test]
    fn single_isolated_closed_booth_under_target_falls_back_to_toll_free() {
        let booths = vec![booth("a", TollKind::Closed)];
        let route = vec![LonLat::new(0.0, 0.0), LonLat::new(1.0, 1.0)];
        let ramps: Vec<CompleteRamp> = Vec::new();
        let ramp_index = RampEndpointIndex::build(&ramps);
        let pricing = PricingGrid::default();
        let config = RuntimeConfig::default();
        let ctx = test_ctx(&booths, &route, &ramps, &ramp_index, &pricing, &config);

        let l = vec![detected(0, 0.5)];
        let selection = select_by_count(&ctx, &l, 5);
        assert_eq!(selection.reason, SelectionReason::TollFreeFallback);
        assert!(selection.kept.is_empty());
    }

    #[test]
    fn reduction_never_leaves_exactly_one_closed() {
        let booths = vec![
            booth("open1", TollKind::Open),
            booth("closed1", TollKind::Closed),
            booth("closed2", TollKind::Closed),
            booth("closed3", TollKind::Closed),
            booth("open2", TollKind::Open),
        ];
        let route = vec![LonLat::new(0.0, 0.0), LonLat::new(1.0, 1.0)];
        let ramps: Vec<CompleteRamp> = Vec::new();
        let ramp_index = RampEndpointIndex::build(&ramps);
        let pricing = PricingGrid::default();
        let config = RuntimeConfig::default();
        let ctx = test_ctx(&booths, &route, &ramps, &ramp_index, &pricing, &config);

        let l = vec![
            detected(0, 0.1),
            detected(1, 0.3),
            detected(2, 0.5),
            detected(3, 0.7),
            detected(4, 0.9),
        ];
        let selection = select_by_count(&ctx, &l, 3);
        let closed_count = selection.kept.iter().filter(|d| is_closed(&ctx, d)).count();
        assert!(closed_count == 0 || closed_count >= 2, "got {closed_count}");
    }

    #[test]
    fn budget_met_without_substitution() {
        let mut flat = BTreeMap::new();
        flat.insert("Open".to_string(), [10.0, 0.0, 0.0, 0.0, 0.0]);
        let pricing = PricingGrid {
            per_km: BTreeMap::new(),
            flat,
        };
        let booths = vec![TollBooth {
            id: "Open".to_string(),
            point: LonLat::new(0.0, 0.0),
            name: Some("Open".to_string()),
            operator: Some("APRR".to_string()),
            highway: None,
            kind: TollKind::Open,
        }];
        let route = vec![LonLat::new(0.0, 0.0), LonLat::new(1.0, 1.0)];
        let ramps: Vec<CompleteRamp> = Vec::new();
        let ramp_index = RampEndpointIndex::build(&ramps);
        let config = RuntimeConfig::default();
        let ctx = test_ctx(&booths, &route, &ramps, &ramp_index, &pricing, &config);

        let l = vec![detected(0, 0.5)];
        let selection = select_by_budget(&ctx, &l, 50.0);
        assert_eq!(selection.reason, SelectionReason::BudgetMet);
        assert!(selection.total_cost <= 50.0);
    }
}
