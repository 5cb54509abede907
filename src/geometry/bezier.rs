use super::Point;

/// Flattens a cubic Bezier curve into a polyline by adaptive midpoint
/// subdivision, appending every point after `start` to `out`
///
/// `tolerance` is the maximum distance, in the same units as the control
/// points, between the curve and its polyline approximation
pub fn flatten_cubic(
    start: Point,
    control_one: Point,
    control_two: Point,
    end: Point,
    tolerance: f64,
    out: &mut Vec<Point>,
) {
    subdivide(start, control_one, control_two, end, tolerance, 0, out);
    out.push(end);
}

fn subdivide(
    p0: Point,
    p1: Point,
    p2: Point,
    p3: Point,
    tolerance: f64,
    depth: u32,
    out: &mut Vec<Point>,
) {
    const MAX_DEPTH: u32 = 16;

    if depth >= MAX_DEPTH || is_flat(p0, p1, p2, p3, tolerance) {
        return;
    }

    // de Casteljau split at t = 1/2
    let p01 = p0.midpoint(p1);
    let p12 = p1.midpoint(p2);
    let p23 = p2.midpoint(p3);
    let p012 = p01.midpoint(p12);
    let p123 = p12.midpoint(p23);
    let mid = p012.midpoint(p123);

    subdivide(p0, p01, p012, mid, tolerance, depth + 1, out);
    out.push(mid);
    subdivide(mid, p123, p23, p3, tolerance, depth + 1, out);
}

/// True when both control points lie within `tolerance` of the chord
fn is_flat(p0: Point, p1: Point, p2: Point, p3: Point, tolerance: f64) -> bool {
    let chord = p3 - p0;
    let chord_len = chord.distance_from_origin();

    if chord_len < f64::EPSILON {
        return p1.euclidean_distance(p0) < tolerance && p2.euclidean_distance(p0) < tolerance;
    }

    let dist = |p: Point| {
        let v = p - p0;
        (v.x * chord.y - v.y * chord.x).abs() / chord_len
    };

    dist(p1) <= tolerance && dist(p2) <= tolerance
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn straight_curve_stays_straight() {
        let mut out = vec![Point::origin()];

        flatten_cubic(
            Point::origin(),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(3.0, 0.0),
            0.1,
            &mut out,
        );

        assert_eq!(out.last(), Some(&Point::new(3.0, 0.0)));

        for p in &out {
            assert_eq!(p.y, 0.0);
        }
    }

    #[test]
    fn flattened_points_stay_near_curve() {
        let p0 = Point::origin();
        let p1 = Point::new(0.0, 10.0);
        let p2 = Point::new(10.0, 10.0);
        let p3 = Point::new(10.0, 0.0);

        let mut out = vec![p0];
        flatten_cubic(p0, p1, p2, p3, 0.05, &mut out);

        // the curve peaks at y = 7.5; every sample must stay in its hull
        assert!(out.len() > 4);

        for p in &out {
            assert!(p.y <= 10.0 + f64::EPSILON);
            assert!(p.y >= 0.0 - f64::EPSILON);
            assert!((0.0..=10.0).contains(&p.x));
        }
    }
}
