use std::collections::HashMap;
use std::f64::consts::PI;

use sb_graph::{Graph, NodeId};

use crate::cell::Cell;

/// Assigns each of a cell's entry nodes to one of `num_sectors` equal
/// angular slices of 2π around the cell centroid, with sector 0
/// straddling the positive-x ray (§4.7).
pub fn sectorize(graph: &Graph, cell: &Cell, num_sectors: u32) -> HashMap<NodeId, u32> {
    assert!(num_sectors >= 3);
    let centroid = cell.centroid();
    let s = num_sectors as f64;
    let slice = 2.0 * PI / s;

    let mut assignment = HashMap::new();
    for n in &cell.entry_nodes {
        let Some(node) = graph.node(*n) else { continue };
        let theta = normalize_angle((node.pos.lat - centroid.lat).atan2(node.pos.lon - centroid.lon));
        let shifted = normalize_angle(theta + PI / s);
        let sector = ((shifted / slice).floor() as i64).rem_euclid(num_sectors as i64) as u32;
        assignment.insert(*n, sector);
    }
    assignment
}

fn normalize_angle(theta: f64) -> f64 {
    let two_pi = 2.0 * PI;
    let mut a = theta % two_pi;
    if a < 0.0 {
        a += two_pi;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_on_positive_x_axis_is_sector_zero() {
        // centroid at origin, node due east: theta=0, shifted by pi/s stays
        // within sector 0's slice which straddles the positive-x ray.
        let shifted = normalize_angle(0.0 + PI / 4.0);
        let slice = 2.0 * PI / 4.0;
        let sector = (shifted / slice).floor() as u32;
        assert_eq!(sector, 0);
    }
}
