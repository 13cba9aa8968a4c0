//! Offline French motorway toll model: ingest, link ramps, associate toll
//! booths, cache, index, and serve pricing queries against a route.
//!
//! [`Model`] is built once (§5) and shared read-only for the process
//! lifetime — there is no interior mutability anywhere in it, so an
//! `Arc<Model>` can be handed to every concurrent query without locking.

pub mod associator;
pub mod cache;
pub mod config;
pub mod cost;
pub mod detect;
pub mod error;
pub mod facade;
pub mod geo;
pub mod ingest;
pub mod linker;
pub mod model;
pub mod optimize;
pub mod routing;
pub mod select;
pub mod spatial;

use std::path::Path;

use config::RuntimeConfig;
use error::CoreError;
use model::{CompleteRamp, PricingGrid, TollBooth};
use spatial::{BoothIndex, RampEndpointIndex};

/// The full in-memory offline model (§3, §5): built once from source files
/// or a valid cache, then shared read-only across every query.
pub struct Model {
    pub booths: Vec<TollBooth>,
    pub ramps: Vec<CompleteRamp>,
    pub pricing: PricingGrid,
    pub booth_index: BoothIndex,
    pub ramp_index: RampEndpointIndex,
}

fn source_path_list(sources: &config::SourcePaths) -> Vec<&Path> {
    vec![
        sources.toll_booths_geojson.as_path(),
        sources.motorway_entries_geojson.as_path(),
        sources.motorway_exits_geojson.as_path(),
        sources.motorway_indeterminate_geojson.as_path(),
        sources.open_tolls_csv.as_path(),
        sources.price_per_km_csv.as_path(),
    ]
}

fn build_from_sources(config: &RuntimeConfig) -> anyhow::Result<(Model, ingest::IngestCounts, Vec<Vec<model::RampSegment>>)> {
    let ingested = ingest::ingest_all(&config.sources)?;

    let link_result = linker::link_ramps(ingested.entries, ingested.exits, ingested.indeterminate);
    let mut ramps = link_result.ramps;

    associator::associate_booths(
        &mut ramps,
        &ingested.booths,
        config.tolerances.associator_epsilon_m,
        config.tolerances.associator_bbox_margin_deg,
    );

    let booth_index = BoothIndex::build(&ingested.booths);
    let ramp_index = RampEndpointIndex::build(&ramps);

    let model = Model {
        booths: ingested.booths,
        ramps,
        pricing: ingested.pricing,
        booth_index,
        ramp_index,
    };

    Ok((model, ingested.counts, link_result.orphan_chains))
}

fn rebuild_and_persist(config: &RuntimeConfig) -> anyhow::Result<Model> {
    let (model, counts, orphan_chains) = build_from_sources(config)?;

    let payload = cache::CachePayload {
        booths: model.booths.clone(),
        ramps: model.ramps.clone(),
        pricing: model.pricing.clone(),
    };
    let sources = source_path_list(&config.sources);
    cache::write_cache(&config.cache_dir, &sources, &payload, &counts, &orphan_chains)?;

    Ok(model)
}

fn model_from_payload(payload: cache::CachePayload) -> Model {
    let booth_index = BoothIndex::build(&payload.booths);
    let ramp_index = RampEndpointIndex::build(&payload.ramps);
    Model {
        booths: payload.booths,
        ramps: payload.ramps,
        pricing: payload.pricing,
        booth_index,
        ramp_index,
    }
}

/// Loads the model from a valid cache, or rebuilds it from source files
/// (§4.4). A rebuild that fails twice in a row escalates to
/// [`CoreError::Internal`] rather than looping forever.
pub fn load_or_build_model(config: &RuntimeConfig) -> Result<Model, CoreError> {
    let sources = source_path_list(&config.sources);

    match cache::load_cache(&config.cache_dir, &sources) {
        Ok(payload) => return Ok(model_from_payload(payload)),
        Err(e) => tracing::debug!(reason = %e, "cache.stale"),
    }

    for attempt in 0..2 {
        match rebuild_and_persist(config) {
            Ok(model) => return Ok(model),
            Err(e) if attempt == 0 => {
                tracing::warn!(error = %e, "first cache rebuild attempt failed, retrying");
            }
            Err(e) => {
                return Err(CoreError::Internal(format!("cache rebuild failed twice: {e}")));
            }
        }
    }

    unreachable!("loop above always returns")
}

pub use model::VehicleClass;
