use geo::{BooleanOps, Intersects};

use sb_graph::{EdgeId, Graph};

use crate::arterial::Arterials;
use crate::cell::{self, Cell};

const MAX_ITERATIONS: usize = 10;

/// Iteratively merges undersized cells and splits oversized ones until
/// neither pass changes anything, or 10 iterations, whichever comes
/// first (§4.6). Ties within either pass are broken by ascending OSM id
/// for determinism.
pub fn optimize_cell_sizes(
    graph: &Graph,
    arterials: &Arterials,
    mut cells: Vec<Cell>,
    min_area: f64,
    max_area: f64,
    target_area: f64,
) -> Vec<Cell> {
    for _ in 0..MAX_ITERATIONS {
        let (merged, changed_merge) = merge_pass(graph, arterials, cells, min_area, max_area, target_area);
        cells = merged;
        let (split, changed_split) = split_pass(graph, arterials, cells, min_area, max_area);
        cells = split;
        if !changed_merge && !changed_split {
            break;
        }
    }
    cells
}

fn min_osm_id(graph: &Graph, edges: &std::collections::HashSet<EdgeId>) -> i64 {
    edges
        .iter()
        .filter_map(|id| graph.edge(*id))
        .flat_map(|e| e.osm_ids.iter().copied())
        .min()
        .unwrap_or(i64::MAX)
}

fn adjacent(a: &Cell, b: &Cell) -> bool {
    a.polygon.exterior().intersects(b.polygon.exterior())
}

fn merge_pass(
    graph: &Graph,
    arterials: &Arterials,
    cells: Vec<Cell>,
    min_area: f64,
    max_area: f64,
    target_area: f64,
) -> (Vec<Cell>, bool) {
    let mut cells = cells;
    let mut changed = false;

    let mut i = 0;
    while i < cells.len() {
        if cells[i].area_hectares >= min_area {
            i += 1;
            continue;
        }
        let mut best: Option<(usize, f64, i64)> = None;
        for j in 0..cells.len() {
            if i == j || !adjacent(&cells[i], &cells[j]) {
                continue;
            }
            let combined = cells[i].area_hectares + cells[j].area_hectares;
            if combined > max_area {
                continue;
            }
            let score = (combined - target_area).abs();
            let tie = min_osm_id(graph, &cells[j].boundary_edges);
            let better = match best {
                None => true,
                Some((_, bscore, btie)) => score < bscore || (score == bscore && tie < btie),
            };
            if better {
                best = Some((j, score, tie));
            }
        }

        match best {
            Some((j, _, _)) => {
                let merged = merge_two(graph, arterials, &cells[i], &cells[j]);
                let (lo, hi) = if i < j { (i, j) } else { (j, i) };
                cells.remove(hi);
                cells.remove(lo);
                cells.push(merged);
                changed = true;
                i = 0;
            }
            None => {
                i += 1;
            }
        }
    }

    (cells, changed)
}

fn merge_two(graph: &Graph, arterials: &Arterials, a: &Cell, b: &Cell) -> Cell {
    let union = a.polygon.union(&b.polygon);
    let polygon = union
        .0
        .into_iter()
        .max_by(|x, y| {
            sb_geom::area::area_hectares(x)
                .partial_cmp(&sb_geom::area::area_hectares(y))
                .unwrap()
        })
        .unwrap_or_else(|| a.polygon.clone());

    let ha = sb_geom::area::area_hectares(&polygon);
    let (boundary_edges, interior_edges) = cell::classify_edges(graph, arterials, &polygon);
    let entry_nodes = rederive_entries(graph, &boundary_edges, &interior_edges, &polygon);

    Cell {
        polygon,
        area_hectares: ha,
        boundary_edges,
        interior_edges,
        entry_nodes,
    }
}

fn rederive_entries(
    graph: &Graph,
    boundary: &std::collections::HashSet<EdgeId>,
    interior: &std::collections::HashSet<EdgeId>,
    polygon: &geo::Polygon<f64>,
) -> std::collections::HashSet<sb_graph::NodeId> {
    // Reuses the same rule as CellBuilder's entry-node derivation.
    let boundary_nodes: std::collections::HashSet<_> =
        boundary.iter().flat_map(|id| [id.u, id.v]).collect();
    let interior_nodes: std::collections::HashSet<_> =
        interior.iter().flat_map(|id| [id.u, id.v]).collect();
    let mut entries: std::collections::HashSet<_> =
        boundary_nodes.intersection(&interior_nodes).copied().collect();
    for n in &interior_nodes {
        if entries.contains(n) {
            continue;
        }
        if let Some(node) = graph.node(*n) {
            let mut best = f64::INFINITY;
            let coords: Vec<_> = polygon.exterior().coords().collect();
            for w in coords.windows(2) {
                let d = point_segment_distance(node.pos.lon, node.pos.lat, w[0].x, w[0].y, w[1].x, w[1].y);
                if d < best {
                    best = d;
                }
            }
            if best <= 1e-4 {
                entries.insert(*n);
            }
        }
    }
    entries
}

fn point_segment_distance(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let dx = bx - ax;
    let dy = by - ay;
    let len2 = dx * dx + dy * dy;
    if len2 <= 1e-18 {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }
    let t = (((px - ax) * dx + (py - ay) * dy) / len2).clamp(0.0, 1.0);
    let cx = ax + t * dx;
    let cy = ay + t * dy;
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

fn split_pass(
    graph: &Graph,
    arterials: &Arterials,
    cells: Vec<Cell>,
    min_area: f64,
    max_area: f64,
) -> (Vec<Cell>, bool) {
    let mut out = Vec::with_capacity(cells.len());
    let mut changed = false;

    for cell in cells {
        if cell.area_hectares <= max_area {
            out.push(cell);
            continue;
        }
        match best_split(graph, arterials, &cell, min_area) {
            Some((a, b)) => {
                out.push(a);
                out.push(b);
                changed = true;
            }
            None => out.push(cell),
        }
    }

    (out, changed)
}

fn best_split(graph: &Graph, arterials: &Arterials, cell: &Cell, min_area: f64) -> Option<(Cell, Cell)> {
    let mut candidate_edges: Vec<EdgeId> = cell
        .interior_edges
        .iter()
        .copied()
        .filter(|id| graph.edge(*id).map_or(false, |e| e.highway.hierarchy() <= 5))
        .collect();
    candidate_edges.sort_by_key(|id| {
        graph
            .edge(*id)
            .and_then(|e| e.osm_ids.iter().min().copied())
            .unwrap_or(i64::MAX)
    });

    let mut best: Option<(Cell, Cell, f64)> = None;
    for id in candidate_edges {
        let Some(edge) = graph.edge(id) else { continue };
        let coords: Vec<_> = edge.geometry.coords().collect();
        if coords.len() < 2 {
            continue;
        }
        let through = *coords.last().unwrap();
        let dir = (through.x - coords[0].x, through.y - coords[0].y);
        let midpoint = geo::Coord {
            x: (coords[0].x + through.x) / 2.0,
            y: (coords[0].y + through.y) / 2.0,
        };

        let Some(chord) = sb_geom::split::extend_and_clip_chord(&cell.polygon, midpoint, dir) else {
            continue;
        };
        let Some((poly_a, poly_b)) = sb_geom::split::split_polygon_with_chord(&cell.polygon, chord) else {
            continue;
        };

        let ha_a = sb_geom::area::area_hectares(&poly_a);
        let ha_b = sb_geom::area::area_hectares(&poly_b);
        if ha_a < min_area || ha_b < min_area {
            continue;
        }

        let balance = (ha_a - ha_b).abs();
        if best.as_ref().map_or(true, |(_, _, b)| balance < *b) {
            let (ba, ia) = cell::classify_edges(graph, arterials, &poly_a);
            let ea = rederive_entries(graph, &ba, &ia, &poly_a);
            let cell_a = Cell {
                polygon: poly_a,
                area_hectares: ha_a,
                boundary_edges: ba,
                interior_edges: ia,
                entry_nodes: ea,
            };
            let (bb, ib) = cell::classify_edges(graph, arterials, &poly_b);
            let eb = rederive_entries(graph, &bb, &ib, &poly_b);
            let cell_b = Cell {
                polygon: poly_b,
                area_hectares: ha_b,
                boundary_edges: bb,
                interior_edges: ib,
                entry_nodes: eb,
            };
            best = Some((cell_a, cell_b, balance));
        }
    }

    best.map(|(a, b, _)| (a, b))
}
