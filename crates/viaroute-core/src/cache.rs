//! Persists the built [`Model`](crate::Model) to disk and validates it
//! against source-file fingerprints on load (§4.4, §6.3). Grounded on the
//! same SHA-256 content-hash pattern the rest of this codebase uses for
//! change detection, applied here to the six source inputs instead of a
//! single dataset file.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CacheLoadError;
use crate::ingest::IngestCounts;
use crate::model::{CompleteRamp, PricingGrid, TollBooth};

const FORMAT_VERSION: u32 = 1;
const COMPRESSION_KIND: &str = "deflate";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFingerprint {
    pub path: String,
    pub size: u64,
    pub mtime_unix: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheCounts {
    pub booths: usize,
    pub complete_ramps: usize,
    pub ramp_segments: usize,
    pub associations: usize,
    pub empty_operator_dropped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub version: u32,
    pub created_at_unix: u64,
    pub compression: String,
    pub sources: BTreeMap<String, SourceFingerprint>,
    pub counts: CacheCounts,
}

/// The serializable payload written to `cache_data.bin` (§6.3).
#[derive(Debug, Serialize, Deserialize)]
pub struct CachePayload {
    pub booths: Vec<TollBooth>,
    pub ramps: Vec<CompleteRamp>,
    pub pricing: PricingGrid,
}

fn fingerprint_file(path: &Path) -> std::io::Result<SourceFingerprint> {
    let metadata = std::fs::metadata(path)?;
    let mtime_unix = metadata
        .modified()?
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(SourceFingerprint {
        path: path.display().to_string(),
        size: metadata.len(),
        mtime_unix,
        sha256: hex::encode(hasher.finalize()),
    })
}

pub fn fingerprint_sources(paths: &[&Path]) -> std::io::Result<BTreeMap<String, SourceFingerprint>> {
    let mut out = BTreeMap::new();
    for path in paths {
        let fp = fingerprint_file(path)?;
        out.insert(path.display().to_string(), fp);
    }
    Ok(out)
}

fn metadata_path(cache_dir: &Path) -> std::path::PathBuf {
    cache_dir.join("metadata.json")
}

fn data_path(cache_dir: &Path) -> std::path::PathBuf {
    cache_dir.join("cache_data.bin")
}

fn orphans_path(cache_dir: &Path) -> std::path::PathBuf {
    cache_dir.join("orphaned_segments.json")
}

/// Writes metadata, the compressed payload, and the orphan sidecar to
/// `cache_dir`, creating it if necessary.
pub fn write_cache(
    cache_dir: &Path,
    source_paths: &[&Path],
    payload: &CachePayload,
    counts: &IngestCounts,
    orphan_chains: &[Vec<crate::model::RampSegment>],
) -> anyhow::Result<()> {
    std::fs::create_dir_all(cache_dir)?;

    let sources = fingerprint_sources(source_paths)?;
    let created_at_unix = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let metadata = CacheMetadata {
        version: FORMAT_VERSION,
        created_at_unix,
        compression: COMPRESSION_KIND.to_string(),
        sources,
        counts: CacheCounts {
            booths: payload.booths.len(),
            complete_ramps: payload.ramps.len(),
            ramp_segments: payload.ramps.iter().map(|r| r.segments.len()).sum(),
            associations: payload.ramps.iter().filter(|r| r.associated_booth.is_some()).count(),
            empty_operator_dropped: counts.empty_operator_dropped,
        },
    };

    let metadata_json = serde_json::to_vec_pretty(&metadata)?;
    std::fs::write(metadata_path(cache_dir), metadata_json)?;

    let encoded = bincode::serialize(payload)?;
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&encoded)?;
    let compressed = encoder.finish()?;
    std::fs::write(data_path(cache_dir), compressed)?;

    let orphans_json = serde_json::to_vec_pretty(orphan_chains)?;
    std::fs::write(orphans_path(cache_dir), orphans_json)?;

    tracing::info!(
        booths = metadata.counts.booths,
        ramps = metadata.counts.complete_ramps,
        "cache.rebuilt"
    );

    Ok(())
}

/// Loads and validates the cache at `cache_dir` against `source_paths`.
/// Returns `Err(CacheLoadError)` on a stale fingerprint or a corrupt blob;
/// the caller (§4.4) treats both as "must rebuild", never surfacing them.
pub fn load_cache(cache_dir: &Path, source_paths: &[&Path]) -> Result<CachePayload, CacheLoadError> {
    let metadata_bytes = std::fs::read(metadata_path(cache_dir))
        .map_err(|e| CacheLoadError::Stale(format!("no metadata: {e}")))?;
    let metadata: CacheMetadata = serde_json::from_slice(&metadata_bytes)
        .map_err(|e| CacheLoadError::Corrupt(format!("metadata parse failed: {e}")))?;

    let current_sources =
        fingerprint_sources(source_paths).map_err(|e| CacheLoadError::Stale(format!("cannot fingerprint sources: {e}")))?;

    if current_sources.len() != metadata.sources.len() {
        return Err(CacheLoadError::Stale("source set changed".to_string()));
    }
    for (key, fp) in &current_sources {
        match metadata.sources.get(key) {
            Some(recorded) if recorded.size == fp.size && recorded.mtime_unix == fp.mtime_unix && recorded.sha256 == fp.sha256 => {}
            _ => {
                tracing::debug!(source = %key, "cache.stale");
                return Err(CacheLoadError::Stale(format!("fingerprint mismatch for {key}")));
            }
        }
    }

    let compressed =
        std::fs::read(data_path(cache_dir)).map_err(|e| CacheLoadError::Corrupt(format!("reading blob: {e}")))?;
    let mut decoder = flate2::read::GzDecoder::new(compressed.as_slice());
    let mut decoded = Vec::new();
    decoder
        .read_to_end(&mut decoded)
        .map_err(|e| CacheLoadError::Corrupt(format!("decompressing blob: {e}")))?;

    let payload: CachePayload =
        bincode::deserialize(&decoded).map_err(|e| CacheLoadError::Corrupt(format!("deserializing blob: {e}")))?;

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PricingGrid;
    use std::io::Write as _;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("viaroute-cache-test-{name}-{}", std::process::id()));
        p
    }

    #[test]
    fn round_trips_an_empty_payload() {
        let dir = temp_dir("roundtrip");
        std::fs::create_dir_all(&dir).unwrap();

        let source_file = dir.join("source.geojson");
        std::fs::File::create(&source_file).unwrap().write_all(b"{}").unwrap();

        let payload = CachePayload {
            booths: Vec::new(),
            ramps: Vec::new(),
            pricing: PricingGrid::default(),
        };
        let counts = IngestCounts::default();
        let sources = [source_file.as_path()];

        write_cache(&dir, &sources, &payload, &counts, &[]).unwrap();
        let loaded = load_cache(&dir, &sources).unwrap();
        assert_eq!(loaded.booths.len(), 0);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn stale_after_source_content_changes() {
        let dir = temp_dir("stale");
        std::fs::create_dir_all(&dir).unwrap();

        let source_file = dir.join("source.geojson");
        std::fs::File::create(&source_file).unwrap().write_all(b"{}").unwrap();

        let payload = CachePayload {
            booths: Vec::new(),
            ramps: Vec::new(),
            pricing: PricingGrid::default(),
        };
        let counts = IngestCounts::default();
        let sources = [source_file.as_path()];
        write_cache(&dir, &sources, &payload, &counts, &[]).unwrap();

        std::fs::File::create(&source_file).unwrap().write_all(b"{\"changed\":true}").unwrap();

        let result = load_cache(&dir, &sources);
        assert!(result.is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
