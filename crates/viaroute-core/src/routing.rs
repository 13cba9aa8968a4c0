//! The routing-engine seam (§6.2): the core never depends on a concrete
//! HTTP client or routing product, only this trait. Call sites treat engine
//! errors and timeouts as recoverable, always surfacing `RoutingUnavailable`
//! or `DeadlineExceeded` rather than panicking.

use std::time::Duration;

use crate::geo::LonLat;

#[derive(Debug, Clone)]
pub struct RouteResult {
    pub polyline: Vec<LonLat>,
    /// `(start_index, end_index, is_tollway)` per annotated segment, when the
    /// engine can tell tollway from free road. `None` means "treat the whole
    /// polyline as one unknown segment" (§6.2).
    pub tollway_segments: Option<Vec<(usize, usize, bool)>>,
    pub distance_m: f64,
    pub duration_s: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum RoutingEngineError {
    #[error("routing engine returned an error: {0}")]
    EngineFailure(String),
    #[error("routing engine timed out")]
    TimedOut,
}

/// Black-box routing backend (§6.2). Implementations talk to whatever
/// produces polylines; the core only ever sees this trait.
pub trait RoutingEngine: Send + Sync {
    fn route(
        &self,
        waypoints: &[LonLat],
        avoid_tolls: bool,
        include_tollway_flags: bool,
        deadline: Duration,
    ) -> Result<RouteResult, RoutingEngineError>;
}

/// An in-memory stub used only by the CLI harness and integration tests
/// (§6.2) — never a production routing backend. It ignores `avoid_tolls` and
/// always returns the straight line through its waypoints, annotated as a
/// single tollway segment.
pub struct StraightLineStub;

impl RoutingEngine for StraightLineStub {
    fn route(
        &self,
        waypoints: &[LonLat],
        _avoid_tolls: bool,
        include_tollway_flags: bool,
        _deadline: Duration,
    ) -> Result<RouteResult, RoutingEngineError> {
        if waypoints.len() < 2 {
            return Err(RoutingEngineError::EngineFailure("need at least 2 waypoints".to_string()));
        }

        let distance_m: f64 = waypoints.windows(2).map(|w| crate::geo::haversine_m(w[0], w[1])).sum();
        let tollway_segments = if include_tollway_flags {
            Some(vec![(0, waypoints.len() - 1, true)])
        } else {
            None
        };

        Ok(RouteResult {
            polyline: waypoints.to_vec(),
            tollway_segments,
            distance_m,
            duration_s: distance_m / 25.0,
        })
    }
}
