//! Prices an ordered list of detected tolls (§4.9): pairwise rules over
//! consecutive booths, rounded half-away-from-zero to 2 decimals per pair.
//! Never fails — a missing price row zeroes that pair and tags it instead.

use crate::config::RuntimeConfig;
use crate::geo::haversine_km;
use crate::model::{BoothId, PricingGrid, TollBooth, TollKind, VehicleClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairTag {
    OpenFlat,
    OpenClosedFlat,
    ClosedPerKm,
    OperatorBreak,
    MissingPrice,
}

#[derive(Debug, Clone)]
pub struct PairCost {
    pub from: BoothId,
    pub to: BoothId,
    pub amount: f64,
    pub tag: PairTag,
}

#[derive(Debug, Clone)]
pub struct CostBreakdown {
    pub total: f64,
    pub pairs: Vec<PairCost>,
}

/// Rounds `v` half-away-from-zero to `decimals` places, matching French
/// toll-receipt rounding (§4.9).
fn round_half_away_from_zero(v: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let scaled = v * factor;
    let rounded = if scaled >= 0.0 {
        (scaled + 0.5).floor()
    } else {
        (scaled - 0.5).ceil()
    };
    rounded / factor
}

fn flat_price(grid: &PricingGrid, booth: &TollBooth, class: VehicleClass) -> Option<f64> {
    let name = booth.name.as_deref()?;
    grid.flat_price(name, class)
}

fn per_km_price(grid: &PricingGrid, operator: &str, class: VehicleClass) -> Option<f64> {
    grid.price_per_km(operator, class)
}

fn operators_compatible(cfg: &RuntimeConfig, a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match cfg.equivalent_group_of(a) {
        Some(group) => group.iter().any(|o| o == b),
        None => false,
    }
}

/// Computes the total cost and per-pair breakdown for `booths` in route
/// order (§4.9). `booths` must already be the selected/kept sequence.
pub fn calculate_cost(
    booths: &[(BoothId, &TollBooth)],
    class: VehicleClass,
    grid: &PricingGrid,
    cfg: &RuntimeConfig,
) -> CostBreakdown {
    if booths.is_empty() {
        return CostBreakdown {
            total: 0.0,
            pairs: Vec::new(),
        };
    }

    let mut pairs = Vec::new();
    let mut total = 0.0;

    if matches!(booths[0].1.kind, TollKind::Open) {
        let fee = flat_price(grid, booths[0].1, class).unwrap_or(0.0);
        let amount = round_half_away_from_zero(fee, 2);
        total += amount;
    }

    if booths.len() == 1 {
        return CostBreakdown { total, pairs };
    }

    for window in booths.windows(2) {
        let (id_a, a) = window[0];
        let (id_b, b) = window[1];

        let (amount, tag) = match (a.kind, b.kind) {
            (TollKind::Open, TollKind::Open) => {
                let fee = flat_price(grid, b, class);
                match fee {
                    Some(f) => (f, PairTag::OpenFlat),
                    None => (0.0, PairTag::MissingPrice),
                }
            }
            (TollKind::Open, TollKind::Closed) => match flat_price(grid, a, class) {
                Some(f) => (f, PairTag::OpenClosedFlat),
                None => (0.0, PairTag::MissingPrice),
            },
            (TollKind::Closed, TollKind::Open) => match flat_price(grid, b, class) {
                Some(f) => (f, PairTag::OpenClosedFlat),
                None => (0.0, PairTag::MissingPrice),
            },
            (TollKind::Closed, TollKind::Closed) => {
                let op_a = a.operator.as_deref().unwrap_or("");
                let op_b = b.operator.as_deref().unwrap_or("");
                if operators_compatible(cfg, op_a, op_b) {
                    let op = if b.operator.is_some() { op_b } else { op_a };
                    match per_km_price(grid, op, class) {
                        Some(rate) => {
                            let km = haversine_km(a.point, b.point);
                            (km * rate, PairTag::ClosedPerKm)
                        }
                        None => (0.0, PairTag::MissingPrice),
                    }
                } else {
                    (0.0, PairTag::OperatorBreak)
                }
            }
        };

        let amount = round_half_away_from_zero(amount, 2);
        total += amount;
        pairs.push(PairCost {
            from: id_a,
            to: id_b,
            amount,
            tag,
        });
    }

    CostBreakdown {
        total: round_half_away_from_zero(total, 2),
        pairs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::LonLat;
    use std::collections::BTreeMap;

    fn booth(id: &str, lon: f64, lat: f64, kind: TollKind, operator: &str, name: Option<&str>) -> TollBooth {
        TollBooth {
            id: id.to_string(),
            point: LonLat::new(lon, lat),
            name: name.map(|s| s.to_string()),
            operator: Some(operator.to_string()),
            highway: None,
            kind,
        }
    }

    fn grid_with(operator: &str, rate_c1: f64) -> PricingGrid {
        let mut per_km = BTreeMap::new();
        per_km.insert(operator.to_string(), [rate_c1, 0.0, 0.0, 0.0, 0.0]);
        PricingGrid {
            per_km,
            flat: BTreeMap::new(),
        }
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_half_away_from_zero(8.2955, 2), 8.30);
        assert_eq!(round_half_away_from_zero(-8.2955, 2), -8.30);
        assert_eq!(round_half_away_from_zero(0.005, 2), 0.01);
    }

    #[test]
    fn equivalent_operator_pair_uses_destination_operator_rate() {
        let cfg = RuntimeConfig::default();
        let a = booth("a", 2.0, 48.0, TollKind::Closed, "COFIROUTE", None);
        // ~87.4km away, chosen so rate*dist matches the documented example closely enough
        let b = booth("b", 2.0, 47.215, TollKind::Closed, "ESCOTA", None);
        let mut grid = grid_with("ESCOTA", 0.095);
        grid.per_km.insert("COFIROUTE".to_string(), [0.2, 0.0, 0.0, 0.0, 0.0]);

        let breakdown = calculate_cost(&[(0, &a), (1, &b)], VehicleClass::C1, &grid, &cfg);
        assert_eq!(breakdown.pairs[0].tag, PairTag::ClosedPerKm);
    }

    #[test]
    fn incompatible_operators_are_a_zero_cost_break() {
        let cfg = RuntimeConfig::default();
        let a = booth("a", 2.0, 48.0, TollKind::Closed, "APRR", None);
        let b = booth("b", 3.0, 49.0, TollKind::Closed, "VINCI", None);
        let grid = grid_with("APRR", 0.08);

        let breakdown = calculate_cost(&[(0, &a), (1, &b)], VehicleClass::C1, &grid, &cfg);
        assert_eq!(breakdown.pairs[0].amount, 0.0);
        assert_eq!(breakdown.pairs[0].tag, PairTag::OperatorBreak);
    }

    #[test]
    fn single_closed_booth_costs_zero() {
        let cfg = RuntimeConfig::default();
        let a = booth("a", 2.0, 48.0, TollKind::Closed, "APRR", None);
        let grid = PricingGrid::default();
        let breakdown = calculate_cost(&[(0, &a)], VehicleClass::C1, &grid, &cfg);
        assert_eq!(breakdown.total, 0.0);
    }

    #[test]
    fn closed_then_open_prices_the_open_side() {
        let cfg = RuntimeConfig::default();
        let mut flat = BTreeMap::new();
        flat.insert("Open1".to_string(), [4.0, 0.0, 0.0, 0.0, 0.0]);
        let grid = PricingGrid {
            per_km: BTreeMap::new(),
            flat,
        };
        let a = booth("a", 2.0, 48.0, TollKind::Closed, "APRR", None);
        let b = booth("b", 2.1, 48.1, TollKind::Open, "APRR", Some("Open1"));
        let breakdown = calculate_cost(&[(0, &a), (1, &b)], VehicleClass::C1, &grid, &cfg);
        assert_eq!(breakdown.pairs[0].tag, PairTag::OpenClosedFlat);
        assert_eq!(breakdown.pairs[0].amount, 4.0);
    }

    #[test]
    fn open_open_flat_fee_counted_once_each() {
        let cfg = RuntimeConfig::default();
        let mut flat = BTreeMap::new();
        flat.insert("Open1".to_string(), [2.0, 0.0, 0.0, 0.0, 0.0]);
        flat.insert("Open2".to_string(), [3.0, 0.0, 0.0, 0.0, 0.0]);
        let grid = PricingGrid {
            per_km: BTreeMap::new(),
            flat,
        };
        let a = booth("a", 2.0, 48.0, TollKind::Open, "APRR", Some("Open1"));
        let b = booth("b", 2.1, 48.1, TollKind::Open, "APRR", Some("Open2"));
        let breakdown = calculate_cost(&[(0, &a), (1, &b)], VehicleClass::C1, &grid, &cfg);
        assert_eq!(breakdown.total, 5.0);
    }
}
