use structopt::StructOpt;

/// Superblock planner core — HTTP façade and offline CLI, matching the
/// `structopt`-based entry points used throughout the teacher workspace
/// (`headless`, `updater`, `convert_osm`).
#[derive(StructOpt, Debug)]
#[structopt(name = "sb-server")]
pub enum Opt {
    /// Runs the HTTP server exposing /partition, /partition/stream, /route.
    Serve {
        #[structopt(long, default_value = "8080")]
        port: u16,
    },
    /// Computes one partition directly from the command line and prints
    /// the resulting JSON, without starting a server.
    Partition {
        #[structopt(long)]
        north: f64,
        #[structopt(long)]
        south: f64,
        #[structopt(long)]
        east: f64,
        #[structopt(long)]
        west: f64,
        #[structopt(long, default_value = "10.0")]
        target_size_hectares: f64,
        #[structopt(long, default_value = "4.0")]
        min_area_hectares: f64,
        #[structopt(long, default_value = "20.0")]
        max_area_hectares: f64,
        #[structopt(long, default_value = "4")]
        num_sectors: u32,
        #[structopt(long)]
        no_constraints: bool,
    },
}
