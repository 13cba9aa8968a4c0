//! Ambient runtime configuration (§3, §4.12). Loaded once at startup from a
//! TOML file with `VIAROUTE_`-prefixed environment overrides, then threaded
//! read-only into model construction and query handling — the same layering
//! every production Rust service in this corpus uses for its settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Source file locations consumed by [`crate::ingest`] (§6.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePaths {
    pub toll_booths_geojson: PathBuf,
    pub motorway_entries_geojson: PathBuf,
    pub motorway_exits_geojson: PathBuf,
    pub motorway_indeterminate_geojson: PathBuf,
    pub open_tolls_csv: PathBuf,
    pub price_per_km_csv: PathBuf,
}

/// Tolerances and thresholds named throughout §4; every one of them has a
/// spec-mandated default so a config file only needs to override what it
/// means to change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tolerances {
    /// §4.3 — max booth-to-ramp-polyline distance for an association.
    pub associator_epsilon_m: f64,
    /// §4.3 — bbox envelope margin around a ramp polyline, in degrees.
    pub associator_bbox_margin_deg: f64,
    /// §4.6 — a booth within this distance of the route counts as `on_route`.
    pub detector_on_route_m: f64,
    /// §4.6 — a booth within this distance (but farther than `on_route`) is `nearby`.
    pub detector_nearby_m: f64,
    /// §4.6 — route bbox prefilter expansion, in degrees (~1.5 km).
    pub detector_prefilter_deg: f64,
    /// §4.6 — duplicate booths within this great-circle distance collapse to one.
    pub detector_dedup_m: f64,
    /// §4.8 — exit-optimizer search radius around the closed booth being replaced.
    pub optimizer_radius_m: f64,
    /// §4.8 — corridor tolerance: max projection distance onto the surrounding segment.
    pub optimizer_corridor_m: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            associator_epsilon_m: 2.0,
            associator_bbox_margin_deg: 0.02,
            detector_on_route_m: 50.0,
            detector_nearby_m: 1000.0,
            detector_prefilter_deg: 0.015,
            detector_dedup_m: 1.0,
            optimizer_radius_m: 5000.0,
            optimizer_corridor_m: 1000.0,
        }
    }
}

/// The full runtime configuration (§3, §4.12).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub sources: SourcePaths,
    pub cache_dir: PathBuf,
    pub tolerances: Tolerances,
    /// Operator codes treated as interchangeable for closed-to-closed
    /// pricing (§4.9, §9 Open Questions). Defaults to the original
    /// implementation's hard-coded `{ASF, COFIROUTE, ESCOTA}` group.
    pub equivalent_operators: Vec<Vec<String>>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            sources: SourcePaths {
                toll_booths_geojson: PathBuf::from("data/toll_booths.geojson"),
                motorway_entries_geojson: PathBuf::from("data/motorway_entries.geojson"),
                motorway_exits_geojson: PathBuf::from("data/motorway_exits.geojson"),
                motorway_indeterminate_geojson: PathBuf::from("data/motorway_indeterminate.geojson"),
                open_tolls_csv: PathBuf::from("data/open_tolls.csv"),
                price_per_km_csv: PathBuf::from("data/price_per_km.csv"),
            },
            cache_dir: PathBuf::from(".viaroute-cache"),
            tolerances: Tolerances::default(),
            equivalent_operators: vec![vec![
                "ASF".to_string(),
                "COFIROUTE".to_string(),
                "ESCOTA".to_string(),
            ]],
        }
    }
}

impl RuntimeConfig {
    /// Loads a config, starting from [`RuntimeConfig::default`], then
    /// merging `path` (if it exists) as TOML, then applying `VIAROUTE_*`
    /// environment overrides. Never fails on a missing file: this mirrors
    /// how most of the corpus treats config as "defaults + optional layers".
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut cfg = if path.exists() {
            let text = std::fs::read_to_string(path)?;
            toml::from_str(&text)?
        } else {
            RuntimeConfig::default()
        };

        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("VIAROUTE_CACHE_DIR") {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("VIAROUTE_DATA_DIR") {
            let dir = PathBuf::from(dir);
            self.sources.toll_booths_geojson = dir.join("toll_booths.geojson");
            self.sources.motorway_entries_geojson = dir.join("motorway_entries.geojson");
            self.sources.motorway_exits_geojson = dir.join("motorway_exits.geojson");
            self.sources.motorway_indeterminate_geojson = dir.join("motorway_indeterminate.geojson");
            self.sources.open_tolls_csv = dir.join("open_tolls.csv");
            self.sources.price_per_km_csv = dir.join("price_per_km.csv");
        }
    }

    /// The flattened set of operators considered mutually equivalent to
    /// `operator`, including itself. Empty if `operator` appears in no
    /// configured group.
    pub fn equivalent_group_of<'a>(&'a self, operator: &str) -> Option<&'a [String]> {
        self.equivalent_operators
            .iter()
            .find(|group| group.iter().any(|o| o == operator))
            .map(|group| group.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_on_disk_dependency() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.tolerances.associator_epsilon_m, 2.0);
        assert!(cfg.equivalent_group_of("ESCOTA").is_some());
        assert!(cfg.equivalent_group_of("APRR").is_none());
    }

    #[test]
    fn env_override_replaces_cache_dir() {
        // SAFETY: tests in this module run single-threaded-enough that this
        // env var isn't touched elsewhere; still, scope it tightly.
        unsafe {
            std::env::set_var("VIAROUTE_CACHE_DIR", "/tmp/viaroute-test-cache");
        }
        let mut cfg = RuntimeConfig::default();
        cfg.apply_env_overrides();
        assert_eq!(cfg.cache_dir, PathBuf::from("/tmp/viaroute-test-cache"));
        unsafe {
            std::env::remove_var("VIAROUTE_CACHE_DIR");
        }
    }
}
