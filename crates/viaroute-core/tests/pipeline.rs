//! End-to-end exercises of the pipeline against small synthetic models,
//! covering the concrete scenarios enumerated for the toll selector, cost
//! calculator and routing facade.

use std::time::{Duration, Instant};

use viaroute_core::associator::associate_booths;
use viaroute_core::config::RuntimeConfig;
use viaroute_core::facade::{find_route_budget, find_route_count};
use viaroute_core::geo::LonLat;
use viaroute_core::linker::link_ramps;
use viaroute_core::model::{PricingGrid, RampRole, RampSegment, SelectionReason, TollBooth, TollKind, VehicleClass};
use viaroute_core::routing::StraightLineStub;
use viaroute_core::spatial::{BoothIndex, RampEndpointIndex};
use viaroute_core::Model;

fn booth(id: &str, lon: f64, lat: f64, kind: TollKind, operator: &str, name: Option<&str>) -> TollBooth {
    TollBooth {
        id: id.to_string(),
        point: LonLat::new(lon, lat),
        name: name.map(|s| s.to_string()),
        operator: Some(operator.to_string()),
        highway: Some("A1".to_string()),
        kind,
    }
}

fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(5)
}

fn empty_model() -> Model {
    let pricing = PricingGrid::default();
    Model {
        booths: Vec::new(),
        ramps: Vec::new(),
        pricing,
        booth_index: BoothIndex::build(&[]),
        ramp_index: RampEndpointIndex::build(&[]),
    }
}

#[test]
fn zero_toll_request_falls_back_to_toll_free() {
    let model = empty_model();
    let config = RuntimeConfig::default();
    let engine = StraightLineStub;

    let paris = LonLat::new(2.3522, 48.8566);
    let lyon = LonLat::new(4.8357, 45.7640);

    let result = find_route_count(&model, &config, &engine, paris, lyon, 0, VehicleClass::C1, deadline()).unwrap();
    assert_eq!(result.selection.reason, SelectionReason::TollFreeFallback);
    assert!(result.selection.kept.is_empty());
    assert_eq!(result.breakdown.total, 0.0);
}

#[test]
fn detected_count_below_target_is_count_met() {
    // Exact linear interpolations between Paris and Lyon, so they sit
    // essentially on the straight-line stub route's polyline.
    let a = booth("a", 3.09725, 47.92882, TollKind::Closed, "APRR", None);
    let b = booth("b", 4.09065, 46.69178, TollKind::Closed, "APRR", None);
    let mut booths = vec![a, b];

    let booth_index = BoothIndex::build(&booths);
    let config = RuntimeConfig::default();

    let model = Model {
        ramps: Vec::new(),
        ramp_index: RampEndpointIndex::build(&[]),
        booth_index,
        pricing: {
            let mut per_km = std::collections::BTreeMap::new();
            per_km.insert("APRR".to_string(), [0.08, 0.12, 0.12, 0.18, 0.06]);
            PricingGrid {
                per_km,
                flat: std::collections::BTreeMap::new(),
            }
        },
        booths: std::mem::take(&mut booths),
    };

    let engine = StraightLineStub;
    let paris = LonLat::new(2.3522, 48.8566);
    let lyon = LonLat::new(4.8357, 45.7640);

    let result = find_route_count(&model, &config, &engine, paris, lyon, 10, VehicleClass::C1, deadline()).unwrap();
    assert_eq!(result.selection.reason, SelectionReason::CountMet);
    assert_eq!(result.selection.kept.len(), 2);
}

#[test]
fn budget_mode_returns_baseline_when_already_under_budget() {
    let mut flat = std::collections::BTreeMap::new();
    flat.insert("Open1".to_string(), [5.0, 0.0, 0.0, 0.0, 0.0]);
    let pricing = PricingGrid {
        per_km: std::collections::BTreeMap::new(),
        flat,
    };
    let paris = LonLat::new(2.3522, 48.8566);
    let lyon = LonLat::new(4.8357, 45.7640);
    let b = booth("Open1", 3.59395, 47.3103, TollKind::Open, "APRR", Some("Open1"));
    let booths = vec![b];
    let booth_index = BoothIndex::build(&booths);

    let model = Model {
        booths,
        ramps: Vec::new(),
        ramp_index: RampEndpointIndex::build(&[]),
        booth_index,
        pricing,
    };
    let config = RuntimeConfig::default();
    let engine = StraightLineStub;

    let result = find_route_budget(&model, &config, &engine, paris, lyon, 50.0, VehicleClass::C1, deadline()).unwrap();
    assert_eq!(result.selection.reason, SelectionReason::BudgetMet);
    assert!(result.breakdown.total <= 50.0);
}

#[test]
fn ramp_linker_and_associator_round_trip_into_a_model() {
    let indeterminate = vec![RampSegment {
        id: "m1".to_string(),
        coords: vec![LonLat::new(3.0, 47.0), LonLat::new(3.01, 47.0)],
        role: RampRole::Indeterminate,
        destination: None,
    }];
    let entries = vec![RampSegment {
        id: "e1".to_string(),
        coords: vec![LonLat::new(3.01, 47.0), LonLat::new(3.02, 47.0)],
        role: RampRole::Entry,
        destination: Some("Paris".to_string()),
    }];

    let link_result = link_ramps(entries, Vec::new(), indeterminate);
    assert_eq!(link_result.ramps.len(), 1);

    let mut ramps = link_result.ramps;
    let booths = vec![booth("b1", 3.015, 47.0, TollKind::Open, "APRR", Some("b1"))];
    associate_booths(&mut ramps, &booths, 2000.0, 0.5);
    assert_eq!(ramps[0].associated_booth, Some(0));
}
