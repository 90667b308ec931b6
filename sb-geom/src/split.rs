use geo::{Coord, LineString, Polygon};

/// Extends a directed line through `through` with direction `(dx, dy)`
/// until it exits `polygon`, then clips it to the two boundary crossing
/// points that bracket `through`. Returns `None` if the line doesn't
/// cross the boundary on both sides (e.g. it's tangent or parallel to an
/// edge at `through`).
pub fn extend_and_clip_chord(
    polygon: &Polygon<f64>,
    through: Coord<f64>,
    direction: (f64, f64),
) -> Option<(Coord<f64>, Coord<f64>)> {
    let (dx, dy) = direction;
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-12 {
        return None;
    }
    let (dx, dy) = (dx / len, dy / len);

    let ring = polygon.exterior();
    let coords: Vec<Coord<f64>> = ring.coords().copied().collect();

    let mut best_neg: Option<(f64, Coord<f64>)> = None;
    let mut best_pos: Option<(f64, Coord<f64>)> = None;

    for w in coords.windows(2) {
        if let Some((t, pt)) = line_segment_intersection(through, (dx, dy), w[0], w[1]) {
            if t < 0.0 {
                if best_neg.map_or(true, |(bt, _)| t > bt) {
                    best_neg = Some((t, pt));
                }
            } else if t > 0.0 {
                if best_pos.map_or(true, |(bt, _)| t < bt) {
                    best_pos = Some((t, pt));
                }
            }
        }
    }

    match (best_neg, best_pos) {
        (Some((_, a)), Some((_, b))) => Some((a, b)),
        _ => None,
    }
}

/// Intersection of the infinite line through `origin` with direction
/// `dir` against segment `a`-`b`. Returns the parametric distance along
/// `dir` (in the same units as `origin`) and the intersection point.
fn line_segment_intersection(
    origin: Coord<f64>,
    dir: (f64, f64),
    a: Coord<f64>,
    b: Coord<f64>,
) -> Option<(f64, Coord<f64>)> {
    let (dx, dy) = dir;
    let (ex, ey) = (b.x - a.x, b.y - a.y);
    let denom = dx * ey - dy * ex;
    if denom.abs() < 1e-14 {
        return None;
    }
    let t = ((a.x - origin.x) * ey - (a.y - origin.y) * ex) / denom;
    let u = ((a.x - origin.x) * dy - (a.y - origin.y) * dx) / denom;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let pt = Coord {
        x: origin.x + t * dx,
        y: origin.y + t * dy,
    };
    Some((t, pt))
}

/// Splits a simple polygon (no holes) with a chord whose endpoints both
/// lie on its boundary, returning the two resulting polygons. This walks
/// the exterior ring from each chord endpoint to the other and closes
/// with the chord, rather than relying on a general boolean-ops crate
/// (none in the corpus provides polygon-by-line splitting directly).
pub fn split_polygon_with_chord(
    polygon: &Polygon<f64>,
    chord: (Coord<f64>, Coord<f64>),
) -> Option<(Polygon<f64>, Polygon<f64>)> {
    let ring: Vec<Coord<f64>> = polygon.exterior().coords().copied().collect();
    let (p1, p2) = chord;

    let (seg1, ins1) = insert_on_ring(&ring, p1)?;
    let (seg2, ins2) = insert_on_ring(&ring, p2)?;

    let mut augmented = ring.clone();
    // Insert the later segment index first so earlier indices stay valid.
    if seg1 <= seg2 {
        augmented.insert(seg2 + 1, ins2);
        augmented.insert(seg1 + 1, ins1);
    } else {
        augmented.insert(seg1 + 1, ins1);
        augmented.insert(seg2 + 1, ins2);
    }
    // Drop the duplicated closing point before rotating.
    if augmented.first() == augmented.last() {
        augmented.pop();
    }

    let idx1 = augmented.iter().position(|c| coord_eq(*c, ins1))?;
    let idx2 = augmented.iter().position(|c| coord_eq(*c, ins2))?;

    let part_a = ring_between(&augmented, idx1, idx2);
    let part_b = ring_between(&augmented, idx2, idx1);

    Some((close_ring(part_a), close_ring(part_b)))
}

fn insert_on_ring(ring: &[Coord<f64>], pt: Coord<f64>) -> Option<(usize, Coord<f64>)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, w) in ring.windows(2).enumerate() {
        let d = point_segment_dist2(pt, w[0], w[1]);
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| (i, pt))
}

fn point_segment_dist2(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    if len2 < 1e-18 {
        return (p.x - a.x).powi(2) + (p.y - a.y).powi(2);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    let cx = a.x + t * dx;
    let cy = a.y + t * dy;
    (p.x - cx).powi(2) + (p.y - cy).powi(2)
}

fn coord_eq(a: Coord<f64>, b: Coord<f64>) -> bool {
    (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
}

fn ring_between(ring: &[Coord<f64>], from: usize, to: usize) -> Vec<Coord<f64>> {
    let n = ring.len();
    let mut out = Vec::new();
    let mut i = from;
    loop {
        out.push(ring[i]);
        if i == to {
            break;
        }
        i = (i + 1) % n;
    }
    out
}

fn close_ring(mut pts: Vec<Coord<f64>>) -> Polygon<f64> {
    if pts.first() != pts.last() {
        pts.push(pts[0]);
    }
    Polygon::new(LineString::new(pts), vec![])
}
