//! The single entry point a caller drives (§4.10): detect, reduce, price.
//! Both query modes share the same pipeline shape and differ only in the
//! reduction step.

use std::time::{Duration, Instant};

use crate::config::RuntimeConfig;
use crate::cost::{calculate_cost, CostBreakdown};
use crate::detect::detect_tolls;
use crate::error::CoreError;
use crate::geo::LonLat;
use crate::model::{BoothId, DetectedToll, RouteProbe, Selection, SelectionReason, TollBooth, VehicleClass};
use crate::routing::{RoutingEngine, RoutingEngineError};
use crate::select::{select_by_budget, select_by_count, SelectContext};
use crate::Model;

/// A priced route: the engine's polyline plus the Selection and its cost
/// breakdown (§6.4).
#[derive(Debug, Clone)]
pub struct RouteWithPricing {
    pub polyline: Vec<LonLat>,
    pub distance_m: f64,
    pub duration_s: f64,
    pub selection: Selection,
    pub breakdown: CostBreakdown,
}

fn check_finite(points: &[LonLat]) -> Result<(), CoreError> {
    if points.iter().all(LonLat::is_finite) {
        Ok(())
    } else {
        Err(CoreError::InvalidInput("endpoint coordinates must be finite".to_string()))
    }
}

fn remaining(deadline: Instant) -> Result<Duration, CoreError> {
    let now = Instant::now();
    if now >= deadline {
        return Err(CoreError::DeadlineExceeded { elapsed_ms: 0, budget_ms: 0 });
    }
    Ok(deadline - now)
}

fn map_engine_error(e: RoutingEngineError) -> CoreError {
    match e {
        RoutingEngineError::EngineFailure(msg) => CoreError::RoutingUnavailable(msg),
        RoutingEngineError::TimedOut => CoreError::DeadlineExceeded { elapsed_ms: 0, budget_ms: 0 },
    }
}

fn booth_pairs<'a>(model: &'a Model, kept: &[DetectedToll]) -> Vec<(BoothId, &'a TollBooth)> {
    kept.iter().map(|d| (d.booth, &model.booths[d.booth as usize])).collect()
}

fn waypoints_for(model: &Model, baseline: &[LonLat], selection: &Selection) -> Vec<LonLat> {
    if selection.kept.is_empty() {
        return vec![baseline[0], *baseline.last().expect("baseline has >= 1 point")];
    }
    let mut points = vec![baseline[0]];
    for d in &selection.kept {
        points.push(model.booths[d.booth as usize].point);
    }
    points.push(*baseline.last().expect("baseline has >= 1 point"));
    points
}

fn select_context<'a>(model: &'a Model, config: &'a RuntimeConfig, polyline: &'a [LonLat], class: VehicleClass) -> SelectContext<'a> {
    SelectContext {
        route_polyline: polyline,
        booths: &model.booths,
        ramps: &model.ramps,
        ramp_index: &model.ramp_index,
        pricing: &model.pricing,
        config,
        class,
    }
}

enum ReductionOutcome {
    ToRequestTollFree,
    Selection(Selection),
}

fn run_pipeline(
    model: &Model,
    config: &RuntimeConfig,
    engine: &dyn RoutingEngine,
    start: LonLat,
    end: LonLat,
    class: VehicleClass,
    deadline: Instant,
    reduce: impl FnOnce(&SelectContext, &[DetectedToll]) -> ReductionOutcome,
) -> Result<RouteWithPricing, CoreError> {
    check_finite(&[start, end])?;

    let budget = remaining(deadline)?;
    let baseline = engine
        .route(&[start, end], false, true, budget)
        .map_err(map_engine_error)?;

    let probe = RouteProbe {
        polyline: baseline.polyline.clone(),
        tollway_segments: baseline.tollway_segments.clone(),
    };
    let detected = detect_tolls(&probe, &model.booths, &model.booth_index, &config.tolerances);

    let ctx = select_context(model, config, &probe.polyline, class);
    let outcome = reduce(&ctx, &detected.on_route);

    let selection = match outcome {
        ReductionOutcome::ToRequestTollFree => {
            let budget = remaining(deadline)?;
            let _toll_free = engine.route(&[start, end], true, false, budget).map_err(map_engine_error)?;
            Selection::toll_free(SelectionReason::TollFreeFallback)
        }
        ReductionOutcome::Selection(s) => s,
    };

    let final_route = if matches!(selection.reason, SelectionReason::TollFreeFallback) && selection.kept.is_empty() {
        engine.route(&[start, end], true, false, remaining(deadline)?).map_err(map_engine_error)?
    } else {
        let waypoints = waypoints_for(model, &probe.polyline, &selection);
        engine
            .route(&waypoints, false, false, remaining(deadline)?)
            .map_err(map_engine_error)?
    };

    let breakdown = calculate_cost(&booth_pairs(model, &selection.kept), class, &model.pricing, config);

    Ok(RouteWithPricing {
        polyline: final_route.polyline,
        distance_m: final_route.distance_m,
        duration_s: final_route.duration_s,
        selection,
        breakdown,
    })
}

/// §4.10 count-mode entry point.
pub fn find_route_count(
    model: &Model,
    config: &RuntimeConfig,
    engine: &dyn RoutingEngine,
    start: LonLat,
    end: LonLat,
    target: usize,
    class: VehicleClass,
    deadline: Instant,
) -> Result<RouteWithPricing, CoreError> {
    run_pipeline(model, config, engine, start, end, class, deadline, |ctx, on_route| {
        if target == 0 {
            return ReductionOutcome::ToRequestTollFree;
        }
        let selection = select_by_count(ctx, on_route, target);
        if matches!(selection.reason, SelectionReason::TollFreeFallback) {
            ReductionOutcome::ToRequestTollFree
        } else {
            ReductionOutcome::Selection(selection)
        }
    })
}

/// §4.10 budget-mode entry point.
pub fn find_route_budget(
    model: &Model,
    config: &RuntimeConfig,
    engine: &dyn RoutingEngine,
    start: LonLat,
    end: LonLat,
    budget_eur: f64,
    class: VehicleClass,
    deadline: Instant,
) -> Result<RouteWithPricing, CoreError> {
    if budget_eur < 0.0 {
        return Err(CoreError::InvalidInput("budget must be >= 0".to_string()));
    }
    run_pipeline(model, config, engine, start, end, class, deadline, |ctx, on_route| {
        let selection = select_by_budget(ctx, on_route, budget_eur);
        if matches!(selection.reason, SelectionReason::TollFreeFallback) {
            ReductionOutcome::ToRequestTollFree
        } else {
            ReductionOutcome::Selection(selection)
        }
    })
}
