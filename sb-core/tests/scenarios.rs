use std::collections::{HashMap, HashSet};

use geo::line_string;
use sb_core::constraint::enforce_constraints;
use sb_core::modification::{apply_all, ModificationKind};
use sb_core::router::{route, RoutingContext};
use sb_core::sector::sectorize;
use sb_core::cell::Cell;
use sb_graph::{Edge, Graph, HighwayClass, Node, NodeId};
use sb_geom::LonLat;

fn residential_edge(geometry: geo::LineString<f64>, length_m: f64) -> Edge {
    Edge {
        geometry,
        length_m,
        highway: HighwayClass::Residential,
        lanes: 1,
        one_way: false,
        osm_ids: vec![1],
        centrality: 0.0,
        vehicle_blocked: false,
    }
}

/// A 5x5 grid of residential streets with four entry points at the side
/// midpoints, mirroring scenario S2 ("Cross-sector cut"): a grid whose
/// only connectivity between opposite sides must be severed to satisfy
/// four sectors.
fn build_cross_grid() -> (Graph, Cell) {
    let mut g = Graph::new();
    let size = 5i64;
    for y in 0..size {
        for x in 0..size {
            let id = y * size + x;
            g.add_node(Node {
                id,
                pos: LonLat::new(x as f64 * 0.001, y as f64 * 0.001),
            });
        }
    }
    let ls = line_string![(x: 0.0, y: 0.0), (x: 0.001, y: 0.0)];
    for y in 0..size {
        for x in 0..size {
            let id = y * size + x;
            if x + 1 < size {
                let right = id + 1;
                g.add_edge(id, right, 0, residential_edge(ls.clone(), 100.0)).unwrap();
                g.add_edge(right, id, 0, residential_edge(ls.clone(), 100.0)).unwrap();
            }
            if y + 1 < size {
                let down = id + size;
                g.add_edge(id, down, 0, residential_edge(ls.clone(), 100.0)).unwrap();
                g.add_edge(down, id, 0, residential_edge(ls.clone(), 100.0)).unwrap();
            }
        }
    }

    let polygon = geo::Polygon::new(
        line_string![
            (x: -0.0005, y: -0.0005),
            (x: 0.0045, y: -0.0005),
            (x: 0.0045, y: 0.0045),
            (x: -0.0005, y: 0.0045),
            (x: -0.0005, y: -0.0005),
        ],
        vec![],
    );

    // Entry points at the four side midpoints of the grid.
    let mid = size / 2;
    let entry_nodes: HashSet<NodeId> = [mid, mid * size, mid * size + (size - 1), (size - 1) * size + mid]
        .into_iter()
        .collect();

    let interior_edges: HashSet<_> = g.edges().map(|(id, _)| *id).collect();
    let cell = Cell {
        polygon,
        area_hectares: 10.0,
        boundary_edges: HashSet::new(),
        interior_edges,
        entry_nodes,
    };
    (g, cell)
}

#[test]
fn cross_grid_gets_validated_after_enforcement() {
    let (graph, cell) = build_cross_grid();
    let sectors = sectorize(&graph, &cell, 4);
    assert_eq!(sectors.len(), 4, "expected one entry per sector");

    let interior = graph.subgraph(cell.interior_edges.iter().copied());
    let result = enforce_constraints(&interior, &sectors);

    assert!(result.validated, "residual violations: {:?}", result.residual_violations);
    assert!(!result.modifications.is_empty(), "expected at least one modification to sever sectors");
}

#[test]
fn modifications_are_idempotent() {
    let (graph, cell) = build_cross_grid();
    let sectors = sectorize(&graph, &cell, 4);
    let interior = graph.subgraph(cell.interior_edges.iter().copied());
    let result = enforce_constraints(&interior, &sectors);

    let mut once = interior.clone();
    apply_all(&mut once, &result.modifications);
    let mut twice = once.clone();
    apply_all(&mut twice, &result.modifications);

    let edges_once: HashSet<_> = once.edges().map(|(id, e)| (*id, e.vehicle_blocked)).collect();
    let edges_twice: HashSet<_> = twice.edges().map(|(id, e)| (*id, e.vehicle_blocked)).collect();
    assert_eq!(edges_once, edges_twice);
}

/// Scenario S6 ("Route blocked by modal filter"): origin and destination
/// share a cell whose sole interior path crosses a modal filter.
#[test]
fn route_blocked_by_modal_filter() {
    let mut g = Graph::new();
    for id in 0..3 {
        g.add_node(Node {
            id,
            pos: LonLat::new(id as f64 * 0.001, 0.0),
        });
    }
    let ls = line_string![(x: 0.0, y: 0.0), (x: 0.001, y: 0.0)];
    g.add_edge(0, 1, 0, residential_edge(ls.clone(), 100.0)).unwrap();
    g.add_edge(1, 0, 0, residential_edge(ls.clone(), 100.0)).unwrap();
    g.add_edge(1, 2, 0, residential_edge(ls.clone(), 100.0)).unwrap();
    g.add_edge(2, 1, 0, residential_edge(ls.clone(), 100.0)).unwrap();

    // Modal filter blocks the only link between the two halves.
    for id in g.out_edges(1).to_vec() {
        if id.v == 2 {
            g.edge_mut(id).unwrap().vehicle_blocked = true;
        }
    }
    for id in g.out_edges(2).to_vec() {
        if id.v == 1 {
            g.edge_mut(id).unwrap().vehicle_blocked = true;
        }
    }

    let arterial_edges = HashSet::new();
    let edge_superblock = HashMap::new();
    let superblock_entries = HashMap::new();
    let superblock_polygons = HashMap::new();
    let ctx = RoutingContext {
        graph: &g,
        arterial_edges: &arterial_edges,
        edge_superblock: &edge_superblock,
        superblock_entries: &superblock_entries,
        superblock_polygons: &superblock_polygons,
    };

    let result = route(&ctx, LonLat::new(0.0, 0.0), LonLat::new(0.002, 0.0), false);
    assert!(!result.success);
    assert!(result.blocked_reason.is_some());
}
