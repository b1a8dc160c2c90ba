use imageproc::geometry::approximate_polygon_dp;
use imageproc::point::Point;

/// Distance from `p` to the infinite line through `a` and `b`
fn line_distance(p: &Point<i32>, a: &Point<i32>, b: &Point<i32>) -> f64 {
    let (px, py) = (p.x as f64, p.y as f64);
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (dx, dy) = (b.x as f64 - ax, b.y as f64 - ay);
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }
    ((px - ax) * dy - (py - ay) * dx).abs() / len
}

/// Simplify a closed curve to a polygon whose vertices deviate from the curve
/// by at most `epsilon`.
///
/// Douglas-Peucker only ever splits between the curve's first and last point,
/// so a start point in the middle of an edge survives as a vertex. A second
/// pass removes any vertex within `epsilon` of the segment joining its
/// neighbours.
pub fn approximate_closed_polygon(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    let mut unique: Vec<Point<i32>> = Vec::with_capacity(points.len());
    for p in points {
        if unique.last() != Some(p) {
            unique.push(*p);
        }
    }
    // A repeated start point would make the first split line degenerate
    while unique.len() > 1 && unique.first() == unique.last() {
        unique.pop();
    }
    if unique.len() < 3 || epsilon <= 0.0 {
        return unique;
    }

    drop_collinear(approximate_polygon_dp(&unique, epsilon, true), epsilon)
}

fn drop_collinear(mut polygon: Vec<Point<i32>>, epsilon: f64) -> Vec<Point<i32>> {
    let mut changed = true;
    while changed && polygon.len() > 3 {
        changed = false;
        let n = polygon.len();
        for i in 0..n {
            let prev = polygon[(i + n - 1) % n];
            let next = polygon[(i + 1) % n];
            if line_distance(&polygon[i], &prev, &next) <= epsilon {
                polygon.remove(i);
                changed = true;
                break;
            }
        }
    }
    polygon
}

/// Axis-aligned bounding rectangle as (x, y, width, height), inclusive of the
/// extreme pixels
pub fn bounding_rect(points: &[Point<i32>]) -> Option<(i32, i32, i32, i32)> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some((min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}
