mod cli;
mod http;
mod network;

use structopt::StructOpt;

use sb_core::orchestrator::{orchestrate, PartitionRequest};
use sb_core::progress::{channel, CancellationToken};
use sb_core::{Config, Error};
use sb_geom::BoundingBox;

use cli::Opt;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opt = Opt::from_args();
    let exit_code = match opt {
        Opt::Serve { port } => run_serve(port).await,
        Opt::Partition {
            north,
            south,
            east,
            west,
            target_size_hectares,
            min_area_hectares,
            max_area_hectares,
            num_sectors,
            no_constraints,
        } => run_partition(
            BoundingBox { north, south, east, west },
            target_size_hectares,
            min_area_hectares,
            max_area_hectares,
            num_sectors,
            !no_constraints,
        ),
    };
    std::process::exit(exit_code);
}

async fn run_serve(port: u16) -> i32 {
    let config = Config::from_env();
    let state = http::AppState::new(config);
    let addr = ([0, 0, 0, 0], port).into();
    match http::serve(addr, state).await {
        Ok(()) => 0,
        Err(e) => {
            log::error!("server error: {e:#}");
            3
        }
    }
}

fn run_partition(
    bbox: BoundingBox,
    target_size_hectares: f64,
    min_area_hectares: f64,
    max_area_hectares: f64,
    num_sectors: u32,
    enforce_constraints: bool,
) -> i32 {
    let config = Config::from_env();
    let req = PartitionRequest {
        bbox,
        target_size_hectares,
        min_area_hectares,
        max_area_hectares,
        enforce_constraints,
        num_sectors,
    };

    let graph = network::fetch_network_stub(&req.bbox);
    let (progress, rx) = channel();
    let cancel = CancellationToken::new();

    std::thread::spawn(move || {
        for event in rx.try_iter() {
            log::debug!("{event:?}");
        }
    });

    match orchestrate(&graph, &req, &config, &progress, &cancel) {
        Ok((partition, _graph, _interior)) => {
            match serde_json::to_writer_pretty(std::io::stdout(), &partition) {
                Ok(()) => 0,
                Err(e) => {
                    log::error!("failed to serialize partition: {e}");
                    3
                }
            }
        }
        Err(e) => {
            log::error!("{e}");
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(e: &Error) -> i32 {
    e.exit_code()
}
