//! Core data types for the offline toll model (§3 of the design spec):
//! [`TollBooth`], [`RampSegment`], [`CompleteRamp`] and [`PricingGrid`] are
//! built once and shared read-only for the process lifetime. [`RouteProbe`],
//! [`DetectedToll`] and [`Selection`] are query-scoped values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geo::LonLat;

/// Dense handle into [`crate::Model::booths`]. Cheap to copy, stable for the
/// lifetime of a `Model`.
pub type BoothId = u32;
/// Dense handle into [`crate::Model::ramps`].
pub type RampId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TollKind {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RampRole {
    Entry,
    Exit,
    Indeterminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RampType {
    Entry,
    Exit,
}

/// One of the five French toll vehicle classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VehicleClass {
    C1,
    C2,
    C3,
    C4,
    C5,
}

impl VehicleClass {
    pub fn index(self) -> usize {
        match self {
            VehicleClass::C1 => 0,
            VehicleClass::C2 => 1,
            VehicleClass::C3 => 2,
            VehicleClass::C4 => 3,
            VehicleClass::C5 => 4,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c1" | "1" => Some(VehicleClass::C1),
            "c2" | "2" => Some(VehicleClass::C2),
            "c3" | "3" => Some(VehicleClass::C3),
            "c4" | "4" => Some(VehicleClass::C4),
            "c5" | "5" => Some(VehicleClass::C5),
            _ => None,
        }
    }
}

/// Immutable toll booth built at ingest time. Ordering and equality follow
/// the stable `id`, never the in-process `BoothId` handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TollBooth {
    pub id: String,
    pub point: LonLat,
    pub name: Option<String>,
    pub operator: Option<String>,
    pub highway: Option<String>,
    pub kind: TollKind,
}

impl TollBooth {
    pub fn is_open(&self) -> bool {
        matches!(self.kind, TollKind::Open)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.kind, TollKind::Closed)
    }
}

/// A short oriented polyline from the source GeoJSON, before chaining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RampSegment {
    pub id: String,
    pub coords: Vec<LonLat>,
    pub role: RampRole,
    pub destination: Option<String>,
}

impl RampSegment {
    pub fn first(&self) -> LonLat {
        self.coords[0]
    }

    pub fn last(&self) -> LonLat {
        *self.coords.last().expect("segment has >= 2 coords")
    }
}

/// A fully reconstructed on-ramp or off-ramp: one or more [`RampSegment`]s
/// joined head-to-tail (§4.2), with at most one associated [`TollBooth`]
/// (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteRamp {
    pub id: RampId,
    pub ramp_type: RampType,
    pub segments: Vec<RampSegment>,
    pub associated_booth: Option<BoothId>,
    pub booth_distance_m: Option<f64>,
}

impl CompleteRamp {
    /// Concatenated polyline across all segments, in order.
    pub fn polyline(&self) -> Vec<LonLat> {
        let mut out = Vec::new();
        for (i, seg) in self.segments.iter().enumerate() {
            if i == 0 {
                out.extend_from_slice(&seg.coords);
            } else {
                out.extend_from_slice(&seg.coords[1..]);
            }
        }
        out
    }

    pub fn start_point(&self) -> LonLat {
        self.segments.first().expect("ramp has >= 1 segment").first()
    }

    pub fn end_point(&self) -> LonLat {
        self.segments.last().expect("ramp has >= 1 segment").last()
    }
}

/// Per-vehicle-class prices, indexed `[c1, c2, c3, c4, c5]`.
pub type PriceRow = [f64; 5];

/// Pricing tables loaded from `open_tolls.csv` and `price_per_km.csv`
/// (§6.1), immutable after load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingGrid {
    /// operator code -> per-km price row
    pub per_km: BTreeMap<String, PriceRow>,
    /// open-booth name -> flat per-passage price row
    pub flat: BTreeMap<String, PriceRow>,
}

impl PricingGrid {
    pub fn price_per_km(&self, operator: &str, class: VehicleClass) -> Option<f64> {
        self.per_km.get(operator).map(|row| row[class.index()])
    }

    pub fn flat_price(&self, open_booth_name: &str, class: VehicleClass) -> Option<f64> {
        self.flat.get(open_booth_name).map(|row| row[class.index()])
    }
}

/// A candidate polyline returned by the external routing engine, plus
/// optional tollway-segment annotations (§3, §6.2). Query-scoped, never
/// persisted.
#[derive(Debug, Clone)]
pub struct RouteProbe {
    pub polyline: Vec<LonLat>,
    pub tollway_segments: Option<Vec<(usize, usize, bool)>>,
}

/// A toll booth found on or near a [`RouteProbe`] (§4.6). Query-scoped.
#[derive(Debug, Clone)]
pub struct DetectedToll {
    pub booth: BoothId,
    pub route_point_index: usize,
    pub distance_m: f64,
    pub position: f64,
}

/// Why the selector returned the [`Selection`] it did (§3, §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionReason {
    CountMet,
    CountReduced,
    BudgetMet,
    BudgetExitSubstitution,
    TollFreeFallback,
    Infeasible,
}

/// The selector's output (§3, §4.7): an ordered, closed-pair-valid subset of
/// the detected tolls, any entry-ramp substitutions applied, and the
/// resulting cost.
#[derive(Debug, Clone)]
pub struct Selection {
    pub kept: Vec<DetectedToll>,
    /// original booth id -> replacement entry-ramp booth id
    pub substitutions: Vec<(BoothId, BoothId)>,
    pub total_cost: f64,
    pub reason: SelectionReason,
}

impl Selection {
    pub fn toll_free(reason: SelectionReason) -> Self {
        Self {
            kept: Vec::new(),
            substitutions: Vec::new(),
            total_cost: 0.0,
            reason,
        }
    }
}
