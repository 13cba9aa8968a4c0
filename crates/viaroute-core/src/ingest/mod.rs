//! Reads the four source GeoJSON files and the two pricing CSVs (§6.1) into
//! the typed records of [`crate::model`]. A single malformed feature is
//! logged and skipped (§4.1, §7); the ingest as a whole never fails unless a
//! source file is entirely unreadable.

pub mod geojson;
pub mod pricing;

use crate::config::SourcePaths;
use crate::model::{RampRole, RampSegment, TollBooth, TollKind};

/// A toll booth as read straight off the GeoJSON, before its [`TollKind`] is
/// known. Classification needs the open-tolls roster (§3), which is loaded
/// independently, so it happens as a second pass in [`classify_booths`].
#[derive(Debug, Clone)]
pub struct RawBooth {
    pub id: String,
    pub point: crate::geo::LonLat,
    pub name: Option<String>,
    pub operator: Option<String>,
    pub highway: Option<String>,
}

/// Ingest counts surfaced in cache metadata (§6.3) for data-quality monitoring.
#[derive(Debug, Clone, Default)]
pub struct IngestCounts {
    pub booths_parsed: usize,
    pub booths_skipped: usize,
    pub empty_operator_dropped: usize,
    pub entries_parsed: usize,
    pub exits_parsed: usize,
    pub indeterminate_parsed: usize,
    pub ramp_segments_skipped: usize,
}

/// Runs all four GeoJSON ingests and both CSV pricing ingests. The four
/// GeoJSON reads touch disjoint outputs (§5) so they are safe to parallelize;
/// the reference implementation fans them out with `rayon::join`.
pub struct IngestOutput {
    pub booths: Vec<TollBooth>,
    pub entries: Vec<RampSegment>,
    pub exits: Vec<RampSegment>,
    pub indeterminate: Vec<RampSegment>,
    pub pricing: crate::model::PricingGrid,
    pub counts: IngestCounts,
}

pub fn ingest_all(paths: &SourcePaths) -> anyhow::Result<IngestOutput> {
    let mut counts = IngestCounts::default();

    let pricing = pricing::load_pricing_grid(&paths.open_tolls_csv, &paths.price_per_km_csv)?;

    let (raw_booths_result, (entries_result, (exits_result, indeterminate_result))) = rayon::join(
        || geojson::parse_booths(&paths.toll_booths_geojson),
        || {
            rayon::join(
                || geojson::parse_ramp_segments(&paths.motorway_entries_geojson, RampRole::Entry),
                || {
                    rayon::join(
                        || geojson::parse_ramp_segments(&paths.motorway_exits_geojson, RampRole::Exit),
                        || {
                            geojson::parse_ramp_segments(
                                &paths.motorway_indeterminate_geojson,
                                RampRole::Indeterminate,
                            )
                        },
                    )
                },
            )
        },
    );

    let (raw_booths, booths_skipped) = raw_booths_result?;
    let (entries, entries_skipped) = entries_result?;
    let (exits, exits_skipped) = exits_result?;
    let (indeterminate, indeterminate_skipped) = indeterminate_result?;

    counts.booths_parsed = raw_booths.len();
    counts.booths_skipped = booths_skipped;
    counts.entries_parsed = entries.len();
    counts.exits_parsed = exits.len();
    counts.indeterminate_parsed = indeterminate.len();
    counts.ramp_segments_skipped = entries_skipped + exits_skipped + indeterminate_skipped;

    let (booths, empty_operator_dropped) = classify_booths(raw_booths, &pricing);
    counts.empty_operator_dropped = empty_operator_dropped;

    Ok(IngestOutput {
        booths,
        entries,
        exits,
        indeterminate,
        pricing,
        counts,
    })
}

/// Classifies raw booths into final [`TollBooth`]s: a booth is [`TollKind::Open`]
/// iff its name matches an entry in the open-tolls roster (§3); a booth with
/// an empty operator string is dropped entirely (§9).
fn classify_booths(raw: Vec<RawBooth>, pricing: &crate::model::PricingGrid) -> (Vec<TollBooth>, usize) {
    let mut dropped = 0usize;
    let mut out = Vec::with_capacity(raw.len());

    for booth in raw {
        let operator_is_empty = booth
            .operator
            .as_deref()
            .map(|s| s.trim().is_empty())
            .unwrap_or(true);
        if operator_is_empty {
            dropped += 1;
            tracing::debug!(booth_id = %booth.id, "ingest.empty_operator_dropped");
            continue;
        }

        let kind = match &booth.name {
            Some(name) if pricing.flat.contains_key(name) => TollKind::Open,
            _ => TollKind::Closed,
        };

        out.push(TollBooth {
            id: booth.id,
            point: booth.point,
            name: booth.name,
            operator: booth.operator,
            highway: booth.highway,
            kind,
        });
    }

    (out, dropped)
}
