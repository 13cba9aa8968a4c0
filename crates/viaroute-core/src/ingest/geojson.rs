//! Parses the four FeatureCollection files using the `geojson` crate.
//! Every feature is handled independently: one bad geometry or missing
//! property skips that feature and logs a `ParseSkip`, never aborts the
//! whole file (§4.1).

use std::path::Path;

use geojson::{GeoJson, Value as GeomValue};
use serde_json::Map as JsonMap;

use crate::error::ParseSkip;
use crate::geo::LonLat;
use crate::model::RampRole;

use super::RawBooth;
use crate::model::RampSegment;

fn read_feature_collection(path: &Path) -> anyhow::Result<Vec<geojson::Feature>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))?;
    let parsed: GeoJson = text
        .parse()
        .map_err(|e| anyhow::anyhow!("parsing {}: {e}", path.display()))?;
    match parsed {
        GeoJson::FeatureCollection(fc) => Ok(fc.features),
        GeoJson::Feature(f) => Ok(vec![f]),
        GeoJson::Geometry(_) => {
            anyhow::bail!("{} is a bare Geometry, expected a FeatureCollection", path.display())
        }
    }
}

fn string_prop(props: &JsonMap<String, serde_json::Value>, key: &str) -> Option<String> {
    props.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn feature_stable_id(feature: &geojson::Feature, index: usize, fallback_prefix: &str) -> String {
    if let Some(id) = &feature.id {
        return match id {
            geojson::feature::Id::String(s) => s.clone(),
            geojson::feature::Id::Number(n) => n.to_string(),
        };
    }
    if let Some(props) = &feature.properties {
        if let Some(id) = string_prop(props, "id") {
            return id;
        }
    }
    format!("{fallback_prefix}-{index}")
}

/// Parses `toll_booths.geojson` into [`RawBooth`] records. Returns the
/// parsed booths and a count of features skipped for a missing/invalid
/// Point geometry.
pub fn parse_booths(path: &Path) -> anyhow::Result<(Vec<RawBooth>, usize)> {
    let features = read_feature_collection(path)?;
    let mut out = Vec::with_capacity(features.len());
    let mut skipped = 0usize;

    for (index, feature) in features.into_iter().enumerate() {
        match parse_booth_feature(&feature, index) {
            Ok(booth) => out.push(booth),
            Err(skip) => {
                skipped += 1;
                tracing::debug!(source = "toll_booths.geojson", %skip, "ingest.parse_skip");
            }
        }
    }

    Ok((out, skipped))
}

fn parse_booth_feature(feature: &geojson::Feature, index: usize) -> Result<RawBooth, ParseSkip> {
    let source = "toll_booths.geojson";
    let geometry = feature.geometry.as_ref().ok_or_else(|| ParseSkip::Malformed {
        index,
        source_name: source,
        reason: "missing geometry".to_string(),
    })?;

    let coords = match &geometry.value {
        GeomValue::Point(c) => c,
        other => {
            return Err(ParseSkip::Malformed {
                index,
                source_name: source,
                reason: format!("expected Point, got {other:?}"),
            })
        }
    };

    if coords.len() < 2 {
        return Err(ParseSkip::Malformed {
            index,
            source_name: source,
            reason: "Point coordinates has fewer than 2 components".to_string(),
        });
    }

    let point = LonLat::new(coords[0], coords[1]);
    if !point.is_finite() {
        return Err(ParseSkip::Malformed {
            index,
            source_name: source,
            reason: "non-finite coordinates".to_string(),
        });
    }

    let props = feature.properties.clone().unwrap_or_default();
    let id = feature_stable_id(feature, index, "booth");

    Ok(RawBooth {
        id,
        point,
        name: string_prop(&props, "name"),
        operator: string_prop(&props, "operator"),
        highway: string_prop(&props, "highway"),
    })
}

/// Parses one of the three ramp GeoJSON files into [`RampSegment`]s tagged
/// with `role`. Returns the parsed segments and a count skipped for a
/// missing/invalid LineString geometry.
pub fn parse_ramp_segments(path: &Path, role: RampRole) -> anyhow::Result<(Vec<RampSegment>, usize)> {
    let features = read_feature_collection(path)?;
    let mut out = Vec::with_capacity(features.len());
    let mut skipped = 0usize;
    let source_name = match role {
        RampRole::Entry => "motorway_entries.geojson",
        RampRole::Exit => "motorway_exits.geojson",
        RampRole::Indeterminate => "motorway_indeterminate.geojson",
    };

    for (index, feature) in features.into_iter().enumerate() {
        match parse_ramp_feature(&feature, index, role, source_name) {
            Ok(seg) => out.push(seg),
            Err(skip) => {
                skipped += 1;
                tracing::debug!(source = source_name, %skip, "ingest.parse_skip");
            }
        }
    }

    Ok((out, skipped))
}

fn parse_ramp_feature(
    feature: &geojson::Feature,
    index: usize,
    role: RampRole,
    source: &'static str,
) -> Result<RampSegment, ParseSkip> {
    let geometry = feature.geometry.as_ref().ok_or_else(|| ParseSkip::Malformed {
        index,
        source_name: source,
        reason: "missing geometry".to_string(),
    })?;

    let coords = match &geometry.value {
        GeomValue::LineString(c) => c,
        other => {
            return Err(ParseSkip::Malformed {
                index,
                source_name: source,
                reason: format!("expected LineString, got {other:?}"),
            })
        }
    };

    if coords.len() < 2 {
        return Err(ParseSkip::Malformed {
            index,
            source_name: source,
            reason: "LineString has fewer than 2 points".to_string(),
        });
    }

    let mut points = Vec::with_capacity(coords.len());
    for pair in coords {
        if pair.len() < 2 {
            return Err(ParseSkip::Malformed {
                index,
                source_name: source,
                reason: "coordinate pair has fewer than 2 components".to_string(),
            });
        }
        let p = LonLat::new(pair[0], pair[1]);
        if !p.is_finite() {
            return Err(ParseSkip::Malformed {
                index,
                source_name: source,
                reason: "non-finite coordinates".to_string(),
            });
        }
        points.push(p);
    }

    let props = feature.properties.clone().unwrap_or_default();
    let id = feature_stable_id(feature, index, "ramp");

    Ok(RampSegment {
        id,
        coords: points,
        role,
        destination: string_prop(&props, "destination"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("viaroute-test-{name}-{:p}.geojson", contents.as_ptr()));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn parses_valid_booth_and_skips_bad_one() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "id": "b1", "properties": {"name": "Saint-Arnoult", "operator": "APRR"},
                 "geometry": {"type": "Point", "coordinates": [2.0, 48.0]}},
                {"type": "Feature", "properties": {"name": "Bad"},
                 "geometry": {"type": "LineString", "coordinates": [[0,0],[1,1]]}}
            ]
        }"#;
        let path = write_temp("booths", json);
        let (booths, skipped) = parse_booths(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(booths.len(), 1);
        assert_eq!(skipped, 1);
        assert_eq!(booths[0].id, "b1");
        assert_eq!(booths[0].operator.as_deref(), Some("APRR"));
    }

    #[test]
    fn parses_ramp_linestring_with_role() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "id": "r1", "properties": {"destination": "Paris"},
                 "geometry": {"type": "LineString", "coordinates": [[2.0, 48.0], [2.1, 48.1]]}}
            ]
        }"#;
        let path = write_temp("ramps", json);
        let (segs, skipped) = parse_ramp_segments(&path, RampRole::Entry).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(skipped, 0);
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].role, RampRole::Entry);
        assert_eq!(segs[0].destination.as_deref(), Some("Paris"));
        assert_eq!(segs[0].coords.len(), 2);
    }
}
