mod args;

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use viaroute_core::config::RuntimeConfig;
use viaroute_core::geo::LonLat;
use viaroute_core::model::VehicleClass;
use viaroute_core::routing::StraightLineStub;
use viaroute_core::{facade, load_or_build_model};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("viaroute=info".parse().unwrap()))
        .init();
}

fn parse_class(s: &str) -> Result<VehicleClass> {
    VehicleClass::parse(s).ok_or_else(|| anyhow::anyhow!("unknown vehicle class: {s}"))
}

fn main() -> Result<()> {
    init_tracing();
    let cli = args::Cli::parse();
    let config = RuntimeConfig::load(Path::new(&cli.config)).context("loading config")?;

    match cli.cmd {
        args::Commands::Build => run_build(&config),
        args::Commands::RouteCount {
            from_lon,
            from_lat,
            to_lon,
            to_lat,
            target,
            class,
            deadline_ms,
        } => run_route_count(&config, from_lon, from_lat, to_lon, to_lat, target, &class, deadline_ms),
        args::Commands::RouteBudget {
            from_lon,
            from_lat,
            to_lon,
            to_lat,
            budget,
            class,
            deadline_ms,
        } => run_route_budget(&config, from_lon, from_lat, to_lon, to_lat, budget, &class, deadline_ms),
    }
}

fn run_build(config: &RuntimeConfig) -> Result<()> {
    let model = load_or_build_model(config).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    println!(
        "model ready: {} booths, {} ramps",
        model.booths.len(),
        model.ramps.len()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_route_count(
    config: &RuntimeConfig,
    from_lon: f64,
    from_lat: f64,
    to_lon: f64,
    to_lat: f64,
    target: usize,
    class: &str,
    deadline_ms: u64,
) -> Result<()> {
    let model = load_or_build_model(config).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let class = parse_class(class)?;
    let engine = StraightLineStub;
    let deadline = Instant::now() + Duration::from_millis(deadline_ms);

    let result = facade::find_route_count(
        &model,
        config,
        &engine,
        LonLat::new(from_lon, from_lat),
        LonLat::new(to_lon, to_lat),
        target,
        class,
        deadline,
    )
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    print_result(&result);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_route_budget(
    config: &RuntimeConfig,
    from_lon: f64,
    from_lat: f64,
    to_lon: f64,
    to_lat: f64,
    budget: f64,
    class: &str,
    deadline_ms: u64,
) -> Result<()> {
    let model = load_or_build_model(config).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let class = parse_class(class)?;
    let engine = StraightLineStub;
    let deadline = Instant::now() + Duration::from_millis(deadline_ms);

    let result = facade::find_route_budget(
        &model,
        config,
        &engine,
        LonLat::new(from_lon, from_lat),
        LonLat::new(to_lon, to_lat),
        budget,
        class,
        deadline,
    )
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    print_result(&result);
    Ok(())
}

fn print_result(result: &viaroute_core::facade::RouteWithPricing) {
    println!("reason: {:?}", result.selection.reason);
    println!("booths kept: {}", result.selection.kept.len());
    println!("total cost: {:.2} EUR", result.breakdown.total);
    println!("distance: {:.1} m, duration: {:.0} s", result.distance_m, result.duration_s);
    if !result.selection.substitutions.is_empty() {
        println!("substitutions: {:?}", result.selection.substitutions);
    }
}
