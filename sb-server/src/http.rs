use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use geojson::FeatureCollection;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use serde::{Deserialize, Serialize};

use sb_core::cache::{CacheEntry, PartitionCache};
use sb_core::orchestrator::{orchestrate, routing_context_maps, Partition, PartitionRequest};
use sb_core::progress::{channel, spawn_heartbeat, CancellationToken, ProgressEvent};
use sb_core::router::{route, RoutingContext};
use sb_core::{Config, Error};
use sb_geom::LonLat;

use crate::network::{fetch_network_stub, street_network_feature_collection};

/// Shared state handed to every request handler. `latest` tracks the
/// most recently computed partition so `/route` has something to query
/// against even though its own request body carries no bounding box
/// (§6); `cache` is the keyed store the partition endpoints populate.
#[derive(Clone)]
pub struct AppState {
    pub cache: PartitionCache,
    pub latest: Arc<RwLock<Option<Arc<CacheEntry>>>>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> AppState {
        AppState {
            cache: PartitionCache::new(),
            latest: Arc::new(RwLock::new(None)),
            config,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PartitionBody {
    #[serde(flatten)]
    request: PartitionRequest,
}

#[derive(Debug, Serialize)]
struct PartitionResponse {
    partition: Partition,
    street_network: FeatureCollection,
    processing_time_seconds: f64,
}

#[derive(Debug, Deserialize)]
struct RouteBody {
    origin: LatLon,
    destination: LatLon,
    #[serde(default)]
    respect_superblocks: bool,
}

#[derive(Debug, Deserialize)]
struct LatLon {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let make_svc = make_service_fn(move |_conn| {
        let state = state.clone();
        async move { Ok::<_, Infallible>(service_fn(move |req| handle(req, state.clone()))) }
    });

    log::info!("listening on {addr}");
    Server::bind(&addr).serve(make_svc).await?;
    Ok(())
}

async fn handle(req: Request<Body>, state: AppState) -> Result<Response<Body>, Infallible> {
    let response = match (req.method(), req.uri().path()) {
        (&Method::POST, "/partition") => handle_partition(req, state).await,
        (&Method::POST, "/partition/stream") => handle_partition_stream(req, state).await,
        (&Method::POST, "/route") => handle_route(req, state).await,
        _ => Ok(json_response(StatusCode::NOT_FOUND, &ErrorBody { error: "not found".to_string() })),
    };
    Ok(response.unwrap_or_else(|e: anyhow::Error| {
        json_response(StatusCode::INTERNAL_SERVER_ERROR, &ErrorBody { error: e.to_string() })
    }))
}

async fn read_body<T: for<'de> Deserialize<'de>>(req: Request<Body>) -> anyhow::Result<T> {
    let bytes = hyper::body::to_bytes(req.into_body()).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Body> {
    let bytes = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(bytes))
        .unwrap()
}

fn status_for(err: &Error) -> StatusCode {
    StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn handle_partition(req: Request<Body>, state: AppState) -> anyhow::Result<Response<Body>> {
    let body: PartitionBody = read_body(req).await?;
    let start = Instant::now();

    let graph = fetch_network_stub(&body.request.bbox);
    let (progress, _rx) = channel();
    let cancel = CancellationToken::new();

    let result = orchestrate(&graph, &body.request, &state.config, &progress, &cancel);

    let response = match result {
        Ok((partition, modified_graph, interior_edges_by_superblock)) => {
            let street_network = street_network_feature_collection(&modified_graph);
            let entry = Arc::new(CacheEntry {
                partition: partition.clone(),
                graph: modified_graph,
                interior_edges_by_superblock,
            });
            state.cache.insert(body.request.bbox.cache_key(), entry.clone());
            *state.latest.write().unwrap() = Some(entry);

            json_response(
                StatusCode::OK,
                &PartitionResponse {
                    partition,
                    street_network,
                    processing_time_seconds: start.elapsed().as_secs_f64(),
                },
            )
        }
        Err(e) => json_response(status_for(&e), &ErrorBody { error: e.to_string() }),
    };

    Ok(response)
}

/// Server-sent-events framing of the progress channel, per §6: every
/// record is `data: <json>\n\n`. The pipeline runs on its own thread
/// while this task drains the progress channel; frames are buffered
/// and flushed as one response body, so a client sees the full event
/// sequence in order rather than truly incremental delivery. The
/// stream always ends with a `complete` or `error` record, even if the
/// pipeline fails partway.
async fn handle_partition_stream(req: Request<Body>, state: AppState) -> anyhow::Result<Response<Body>> {
    let body: PartitionBody = read_body(req).await?;

    let (progress, rx) = channel();
    let cancel = CancellationToken::new();
    let heartbeat = spawn_heartbeat(progress.clone(), state.config.heartbeat_interval, cancel.clone());

    let graph = fetch_network_stub(&body.request.bbox);
    let cfg = state.config.clone();
    let cache = state.cache.clone();
    let latest = state.latest.clone();
    let cache_key = body.request.bbox.cache_key();
    let request = body.request.clone();
    let result_slot: Arc<std::sync::Mutex<Option<(Partition, FeatureCollection)>>> =
        Arc::new(std::sync::Mutex::new(None));
    let result_slot_worker = result_slot.clone();

    let worker = std::thread::spawn(move || {
        let outcome = orchestrate(&graph, &request, &cfg, &progress, &cancel);
        cancel.cancel();
        match outcome {
            Ok((partition, modified_graph, interior_edges_by_superblock)) => {
                let street_network = street_network_feature_collection(&modified_graph);
                *result_slot_worker.lock().unwrap() = Some((partition.clone(), street_network));
                let entry = Arc::new(CacheEntry {
                    partition,
                    graph: modified_graph,
                    interior_edges_by_superblock,
                });
                cache.insert(cache_key, entry.clone());
                *latest.write().unwrap() = Some(entry);
            }
            Err(e) => {
                progress.send(ProgressEvent::Error { message: e.to_string() });
            }
        }
    });

    let mut frames = Vec::new();
    loop {
        match rx.recv_timeout(Duration::from_secs(1)) {
            Some(event) => {
                let is_terminal = matches!(event, ProgressEvent::Complete { .. } | ProgressEvent::Error { .. });
                frames.push(sse_frame(&event));
                if is_terminal {
                    break;
                }
            }
            None => {
                if worker.is_finished() {
                    break;
                }
            }
        }
    }
    let _ = worker.join();
    let _ = heartbeat.join();
    for event in rx.try_iter() {
        frames.push(sse_frame(&event));
    }

    if let Some((partition, street_network)) = result_slot.lock().unwrap().take() {
        let result = serde_json::json!({
            "type": "result",
            "partition": partition,
            "street_network": street_network,
        });
        frames.push(format!("data: {}\n\n", serde_json::to_string(&result).unwrap_or_else(|_| "{}".to_string())));
    }

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/event-stream")
        .body(Body::from(frames.concat()))
        .unwrap())
}

fn sse_frame(event: &ProgressEvent) -> String {
    let json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    format!("data: {json}\n\n")
}

async fn handle_route(req: Request<Body>, state: AppState) -> anyhow::Result<Response<Body>> {
    let body: RouteBody = read_body(req).await?;

    let entry = state.latest.read().unwrap().clone();
    let Some(entry) = entry else {
        return Ok(json_response(
            StatusCode::BAD_REQUEST,
            &ErrorBody { error: "no partition computed yet; call /partition first".to_string() },
        ));
    };

    let arterial_osm_ids: std::collections::HashSet<i64> =
        entry.partition.arterial_osm_ids.iter().copied().collect();
    let arterial_edges = entry
        .graph
        .edges()
        .filter(|(_, e)| e.osm_ids.iter().any(|id| arterial_osm_ids.contains(id)))
        .map(|(id, _)| *id)
        .collect::<std::collections::HashSet<_>>();
    let (edge_superblock, superblock_entries, superblock_polygons) =
        routing_context_maps(&entry.partition, &entry.interior_edges_by_superblock);

    let ctx = RoutingContext {
        graph: &entry.graph,
        arterial_edges: &arterial_edges,
        edge_superblock: &edge_superblock,
        superblock_entries: &superblock_entries,
        superblock_polygons: &superblock_polygons,
    };

    let origin = LonLat::new(body.origin.lon, body.origin.lat);
    let destination = LonLat::new(body.destination.lon, body.destination.lat);
    let result = route(&ctx, origin, destination, body.respect_superblocks);

    Ok(json_response(StatusCode::OK, &result))
}
