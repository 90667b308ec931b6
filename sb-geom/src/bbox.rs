use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::pt::LonLat;

/// A geographic bounding box. Validation rule per the external interface
/// contract: north > south, east > west, and a maximum 0.5 degree span on
/// each axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

const MAX_SPAN_DEG: f64 = 0.5;

impl BoundingBox {
    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.north) || !(-90.0..=90.0).contains(&self.south) {
            bail!("latitude out of range");
        }
        if !(-180.0..=180.0).contains(&self.east) || !(-180.0..=180.0).contains(&self.west) {
            bail!("longitude out of range");
        }
        if self.north <= self.south {
            bail!("north must be greater than south");
        }
        if self.east <= self.west {
            bail!("east must be greater than west");
        }
        if self.north - self.south > MAX_SPAN_DEG || self.east - self.west > MAX_SPAN_DEG {
            bail!("bounding box span exceeds {} degrees", MAX_SPAN_DEG);
        }
        Ok(())
    }

    pub fn center(&self) -> LonLat {
        LonLat::new((self.east + self.west) / 2.0, (self.north + self.south) / 2.0)
    }

    /// Key the partition cache by a canonicalized (rounded) representation
    /// so near-identical float bboxes hit the same cache entry.
    pub fn cache_key(&self) -> String {
        format!(
            "{:.6},{:.6},{:.6},{:.6}",
            self.north, self.south, self.east, self.west
        )
    }

    pub fn to_ring(&self) -> geo::LineString<f64> {
        geo::LineString::from(vec![
            (self.west, self.south),
            (self.east, self.south),
            (self.east, self.north),
            (self.west, self.north),
            (self.west, self.south),
        ])
    }

    pub fn to_polygon(&self) -> geo::Polygon<f64> {
        geo::Polygon::new(self.to_ring(), vec![])
    }
}
