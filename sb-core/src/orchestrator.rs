use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use sb_geom::{BoundingBox, LonLat};
use sb_graph::{EdgeId, Graph, NodeId};

use crate::arterial;
use crate::cell::{self, Cell};
use crate::centrality;
use crate::config::Config;
use crate::constraint;
use crate::error::{Error, Result};
use crate::modification::{self, Modification};
use crate::progress::{CancellationToken, ProgressSender};
use crate::reachability::{self, UnreachableAddress};
use crate::sector;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntryPoint {
    pub node_id: NodeId,
    pub sector: u32,
    pub coords: LonLat,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Superblock {
    pub id: String,
    pub polygon_geojson: serde_json::Value,
    pub area_hectares: f64,
    pub num_sectors: u32,
    pub boundary_osm_ids: Vec<i64>,
    pub entries: Vec<EntryPoint>,
    pub modifications: Vec<Modification>,
    pub constraint_validated: bool,
    pub unreachable_nodes: Vec<UnreachableAddress>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ModificationCounts {
    pub modal_filter: u32,
    pub one_way: u32,
    pub full_closure: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Partition {
    pub superblocks: Vec<Superblock>,
    pub arterial_osm_ids: Vec<i64>,
    pub bbox: BoundingBox,
    pub total_hectares: f64,
    pub coverage_percent: f64,
    pub modification_counts: ModificationCounts,
    pub unreachable_count: usize,
}

impl Partition {
    fn empty(bbox: BoundingBox) -> Partition {
        Partition {
            superblocks: Vec::new(),
            arterial_osm_ids: Vec::new(),
            bbox,
            total_hectares: 0.0,
            coverage_percent: 0.0,
            modification_counts: ModificationCounts::default(),
            unreachable_count: 0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct PartitionRequest {
    pub bbox: BoundingBox,
    pub target_size_hectares: f64,
    pub min_area_hectares: f64,
    pub max_area_hectares: f64,
    pub enforce_constraints: bool,
    pub num_sectors: u32,
}

fn polygon_to_geojson(polygon: &geo::Polygon<f64>) -> serde_json::Value {
    let geom: geojson::Geometry = geojson::Geometry::new(geojson::Value::from(polygon));
    serde_json::to_value(geom).unwrap_or(serde_json::Value::Null)
}

fn fresh_superblock_id(index: usize) -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!("sb-{index}-{suffix:08x}")
}

fn build_simple_superblock(graph: &Graph, index: usize, cell: &Cell, num_sectors: u32) -> Superblock {
    let sectors = sector::sectorize(graph, cell, num_sectors);
    let entries = sectors
        .iter()
        .filter_map(|(n, s)| {
            graph.node(*n).map(|node| EntryPoint {
                node_id: *n,
                sector: *s,
                coords: node.pos,
            })
        })
        .collect();
    Superblock {
        id: fresh_superblock_id(index),
        polygon_geojson: polygon_to_geojson(&cell.polygon),
        area_hectares: cell.area_hectares,
        num_sectors,
        boundary_osm_ids: boundary_osm_ids(graph, cell),
        entries,
        modifications: Vec::new(),
        // Vacuously true: fewer than two entry sectors in play, so there
        // is no cross-sector path to guard against (§4.12 / §7).
        constraint_validated: true,
        unreachable_nodes: Vec::new(),
    }
}

fn boundary_osm_ids(graph: &Graph, cell: &Cell) -> Vec<i64> {
    let mut ids: std::collections::BTreeSet<i64> = std::collections::BTreeSet::new();
    for id in &cell.boundary_edges {
        if let Some(edge) = graph.edge(*id) {
            ids.extend(edge.osm_ids.iter().copied());
        }
    }
    ids.into_iter().collect()
}

fn build_enforced_superblock(
    graph: &Graph,
    modified_graph: &mut Graph,
    index: usize,
    cell: &Cell,
    num_sectors: u32,
) -> Superblock {
    let sectors = sector::sectorize(graph, cell, num_sectors);
    if cell.entry_nodes.len() < 2 || cell.interior_edges.is_empty() {
        return build_simple_superblock(graph, index, cell, num_sectors);
    }

    let interior = graph.subgraph(cell.interior_edges.iter().copied());
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        constraint::enforce_constraints(&interior, &sectors)
    }));

    let Ok(result) = result else {
        log::warn!("constraint enforcement panicked for cell {index}, falling back to simple superblock");
        return build_simple_superblock(graph, index, cell, num_sectors);
    };

    modification::apply_all(modified_graph, &result.modifications);

    let mut scratch = interior.clone();
    modification::apply_all(&mut scratch, &result.modifications);
    let unreachable = reachability::find_unreachable(&scratch, &cell.entry_nodes, &sectors);

    let entries = sectors
        .iter()
        .filter_map(|(n, s)| {
            graph.node(*n).map(|node| EntryPoint {
                node_id: *n,
                sector: *s,
                coords: node.pos,
            })
        })
        .collect();

    Superblock {
        id: fresh_superblock_id(index),
        polygon_geojson: polygon_to_geojson(&cell.polygon),
        area_hectares: cell.area_hectares,
        num_sectors,
        boundary_osm_ids: boundary_osm_ids(graph, cell),
        entries,
        modifications: result.modifications,
        constraint_validated: result.validated,
        unreachable_nodes: unreachable,
    }
}

fn tally(counts: &mut ModificationCounts, mods: &[Modification]) {
    for m in mods {
        match m.kind {
            modification::ModificationKind::ModalFilter => counts.modal_filter += 1,
            modification::ModificationKind::OneWay { .. } => counts.one_way += 1,
            modification::ModificationKind::FullClosure => counts.full_closure += 1,
        }
    }
}

/// Drives the full pipeline: prepare, centrality, arterialize, build
/// cells, size-optimize, enforce constraints per cell, assemble
/// statistics. Returns the finished `Partition`, the fully-modified graph
/// the router should use afterward (§4.12), and each superblock's
/// interior edge set (for `routing_context_maps`).
pub fn orchestrate(
    graph: &Graph,
    req: &PartitionRequest,
    cfg: &Config,
    progress: &ProgressSender,
    cancel: &CancellationToken,
) -> Result<(Partition, Graph, HashMap<String, Vec<EdgeId>>)> {
    req.bbox.validate().map_err(|e| Error::InvalidBoundingBox(e.to_string()))?;

    progress.stage("network", 5.0, "graph loaded");
    if graph.edge_count() == 0 {
        log::info!("empty network for bbox {:?}", req.bbox);
        return Ok((Partition::empty(req.bbox), graph.clone(), HashMap::new()));
    }
    if cancel.is_cancelled() {
        return Err(Error::Internal(anyhow::anyhow!("cancelled")));
    }

    let mut graph = graph.clone();
    progress.stage("arterials", 20.0, "computing centrality");
    let scores = centrality::compute_centrality(&graph, cfg, |elapsed| {
        progress.stage("arterials", 25.0, &format!("centrality in progress, {:.0}s elapsed", elapsed.as_secs_f64()));
    });
    centrality::apply_centrality(&mut graph, &scores);

    let arterials = arterial::identify_arterials(&graph, cfg);
    progress.stage("arterials", 35.0, &format!("{} arterial edges identified", arterials.edges.len()));

    if cancel.is_cancelled() {
        return Err(Error::Internal(anyhow::anyhow!("cancelled")));
    }

    progress.stage("cells", 45.0, "polygonizing");
    let cells = cell::build_cells(&graph, &arterials, &req.bbox);
    if cells.is_empty() {
        log::warn!("degenerate partition: polygonize produced no acceptable cells for {:?}", req.bbox);
        return Ok((Partition::empty(req.bbox), graph, HashMap::new()));
    }

    let cells = crate::sizer::optimize_cell_sizes(
        &graph,
        &arterials,
        cells,
        req.min_area_hectares,
        req.max_area_hectares,
        req.target_size_hectares,
    );
    progress.stage("cells", 60.0, &format!("{} cells after sizing", cells.len()));

    let mut modified_graph = graph.clone();
    let mut superblocks = Vec::with_capacity(cells.len());
    let mut interior_edges_by_superblock = HashMap::new();
    let total = cells.len();
    for (index, cell) in cells.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(Error::Internal(anyhow::anyhow!("cancelled")));
        }
        let sb = if req.enforce_constraints {
            build_enforced_superblock(&graph, &mut modified_graph, index, cell, req.num_sectors)
        } else {
            build_simple_superblock(&graph, index, cell, req.num_sectors)
        };
        progress.send(crate::progress::ProgressEvent::Progress {
            stage: "constraints".to_string(),
            percent: 60.0 + 30.0 * ((index + 1) as f64 / total as f64),
            message: format!("enforced cell {}/{}", index + 1, total),
            current_superblock: Some(index as u32),
            total_superblocks: Some(total as u32),
        });
        interior_edges_by_superblock.insert(sb.id.clone(), cell.interior_edges.iter().copied().collect());
        superblocks.push(sb);
    }

    let total_hectares: f64 = superblocks.iter().map(|s| s.area_hectares).sum();
    let bbox_area = sb_geom::area::area_hectares(&req.bbox.to_polygon());
    let coverage_percent = if bbox_area > 0.0 { total_hectares / bbox_area * 100.0 } else { 0.0 };

    let mut counts = ModificationCounts::default();
    let mut unreachable_count = 0;
    for sb in &superblocks {
        tally(&mut counts, &sb.modifications);
        unreachable_count += sb.unreachable_nodes.len();
    }

    let partition = Partition {
        superblocks,
        arterial_osm_ids: arterials.osm_ids,
        bbox: req.bbox,
        total_hectares,
        coverage_percent,
        modification_counts: counts,
        unreachable_count,
    };

    progress.send(crate::progress::ProgressEvent::Complete {
        message: "partition complete".to_string(),
    });

    Ok((partition, modified_graph, interior_edges_by_superblock))
}

/// Builds the edge→superblock ownership map and entry/polygon lookups the
/// router needs, from a finished partition and its cell interior-edge
/// sets (kept alongside the partition by the caller since `Superblock`
/// itself doesn't retain edge ids after GeoJSON serialization).
pub fn routing_context_maps(
    partition: &Partition,
    interior_edges_by_superblock: &HashMap<String, Vec<EdgeId>>,
) -> (HashMap<EdgeId, String>, HashMap<String, Vec<NodeId>>, HashMap<String, geo::Polygon<f64>>) {
    let mut edge_superblock = HashMap::new();
    let mut entries = HashMap::new();
    let mut polygons = HashMap::new();

    for sb in &partition.superblocks {
        if let Some(edges) = interior_edges_by_superblock.get(&sb.id) {
            for e in edges {
                edge_superblock.insert(*e, sb.id.clone());
            }
        }
        entries.insert(sb.id.clone(), sb.entries.iter().map(|e| e.node_id).collect());
        if let Ok(geom) = geojson::Geometry::from_json_value(sb.polygon_geojson.clone()) {
            if let Ok(poly) = geo_types::Geometry::<f64>::try_from(geom) {
                if let geo_types::Geometry::Polygon(p) = poly {
                    polygons.insert(sb.id.clone(), p);
                }
            }
        }
    }

    (edge_superblock, entries, polygons)
}
