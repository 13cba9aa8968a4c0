use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "viaroute",
    version,
    about = "Offline French motorway toll-routing engine",
    long_about = "\
Builds and queries an offline model of French motorway toll booths and
ramps, pricing a route either to a fixed number of paid crossings or to a
budget.
"
)]
pub struct Cli {
    /// Path to the TOML config file (defaults baked in if absent)
    #[arg(long, default_value = "viaroute.toml")]
    pub config: String,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Force a cache rebuild from the configured source files
    Build,

    /// Route between two points, keeping at most N paid crossings
    RouteCount {
        #[arg(long, allow_hyphen_values = true)]
        from_lon: f64,
        #[arg(long, allow_hyphen_values = true)]
        from_lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        to_lon: f64,
        #[arg(long, allow_hyphen_values = true)]
        to_lat: f64,
        #[arg(long)]
        target: usize,
        #[arg(long, default_value = "c1")]
        class: String,
        #[arg(long, default_value_t = 10_000)]
        deadline_ms: u64,
    },

    /// Route between two points, keeping total toll cost under a budget
    RouteBudget {
        #[arg(long, allow_hyphen_values = true)]
        from_lon: f64,
        #[arg(long, allow_hyphen_values = true)]
        from_lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        to_lon: f64,
        #[arg(long, allow_hyphen_values = true)]
        to_lat: f64,
        #[arg(long)]
        budget: f64,
        #[arg(long, default_value = "c1")]
        class: String,
        #[arg(long, default_value_t = 10_000)]
        deadline_ms: u64,
    },
}
