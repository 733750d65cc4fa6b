//! Vector geometry for overlays and distance queries.
//!
//! Points and vectors are plain `&[f64]` slices of any dimension, so the same
//! helpers serve 2D overlays and N-D data coordinates. Nothing here guards
//! against degenerate input: coincident points produce `NaN` or infinities
//! exactly as the arithmetic dictates.

use crate::constants::BISECTOR_EPSILON;

// ============================================================================
// Primitives
// ============================================================================

/// Length of a vector.
pub fn magnitude(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// Vector of unit length pointing the same way as `v`.
pub fn unit(v: &[f64]) -> Vec<f64> {
    let len = magnitude(v);
    v.iter().map(|c| c / len).collect()
}

/// Dot product over the common dimensions of `a` and `b`.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Z component of the cross product of two 2D vectors.
pub fn cross2d(a: &[f64], b: &[f64]) -> f64 {
    a[0] * b[1] - a[1] * b[0]
}

/// Component-wise sum.
pub fn add(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}

/// Component-wise difference `a - b`.
pub fn sub(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

/// Scalar multiple of a vector.
pub fn scale(v: &[f64], s: f64) -> Vec<f64> {
    v.iter().map(|c| c * s).collect()
}

/// Exact component-wise equality.
pub fn equal(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
}

/// Whether `b` is exactly `-a`.
pub fn opposite(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| *x == -*y)
}

// ============================================================================
// Distances
// ============================================================================

/// Euclidean distance between two points.
pub fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Euclidean distance after scaling each axis difference by `scale`.
///
/// Used to measure in physical units (e.g. microns) rather than pixels. Axes
/// without a scale factor are taken as unscaled.
pub fn distance_scaled(a: &[f64], b: &[f64], scale: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .enumerate()
        .map(|(i, (x, y))| {
            let d = (x - y) * scale.get(i).copied().unwrap_or(1.0);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Project `v` onto the line through `a` and `b`.
///
/// With `segment` set, a projection that lands outside the segment is
/// clamped to an endpoint. Axes are checked in order and the first axis on
/// which the projected coordinate lies beyond both endpoints decides which
/// endpoint is returned.
pub fn project(a: &[f64], b: &[f64], v: &[f64], segment: bool) -> Vec<f64> {
    let ab = sub(b, a);
    let av = sub(v, a);
    let t = dot(&av, &ab) / dot(&ab, &ab);
    let p = add(a, &scale(&ab, t));

    if segment {
        for (i, &c) in p.iter().enumerate() {
            if c > a[i] && c > b[i] {
                return if a[i] > b[i] { a.to_vec() } else { b.to_vec() };
            }
            if c < a[i] && c < b[i] {
                return if a[i] < b[i] { a.to_vec() } else { b.to_vec() };
            }
        }
    }
    p
}

/// Closest approach of a point to a polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    /// Distance from the query point to the polyline
    pub distance: f64,
    /// Index of the segment holding the closest point (segment `i` joins
    /// nodes `i` and `i + 1`)
    pub segment: usize,
    /// Position of the closest point along that segment, 0 at its start and
    /// 1 at its end
    pub weight: f64,
}

/// Find the point of an open polyline nearest to `point`.
///
/// Returns `None` for an empty polyline. A single node degenerates to the
/// plain point distance with segment 0 and weight 0. Ties keep the earlier
/// segment.
pub fn dist_seg_wt<P: AsRef<[f64]>>(nodes: &[P], point: &[f64]) -> Option<SegmentHit> {
    match nodes {
        [] => None,
        [only] => Some(SegmentHit {
            distance: distance(only.as_ref(), point),
            segment: 0,
            weight: 0.0,
        }),
        _ => {
            // NaN distances from zero-length segments never compare below the
            // running best, so they only surface when every segment is one.
            let mut best = SegmentHit {
                distance: f64::NAN,
                segment: 0,
                weight: f64::NAN,
            };
            let mut best_distance = f64::INFINITY;
            for (i, pair) in nodes.windows(2).enumerate() {
                let a = pair[0].as_ref();
                let b = pair[1].as_ref();
                let p = project(a, b, point, true);
                let d = distance(&p, point);
                if d < best_distance {
                    best_distance = d;
                    best = SegmentHit {
                        distance: d,
                        segment: i,
                        weight: distance(a, &p) / distance(a, b),
                    };
                }
            }
            Some(best)
        }
    }
}

// ============================================================================
// Orientation
// ============================================================================

/// Signed orientation of the path `a -> b -> c`.
///
/// Positive when the path bends left (counterclockwise), negative when it
/// bends right, zero when the three points are collinear.
pub fn orient2d(a: &[f64], b: &[f64], c: &[f64]) -> f64 {
    cross2d(&sub(b, a), &sub(c, b))
}

/// Unit bisector at `vertex`, on the right-hand side of the path
/// `prev -> vertex -> next`.
pub fn right_bisector(prev: &[f64], vertex: &[f64], next: &[f64]) -> [f64; 2] {
    let back = unit(&sub(prev, vertex));
    let ahead = unit(&sub(next, vertex));
    let avg = scale(&add(&back, &ahead), 0.5);
    let orient = orient2d(prev, vertex, next);

    if dot(&avg, &avg) < BISECTOR_EPSILON || orient == 0.0 {
        // straight or folded back: perpendicular to the outgoing edge
        let dir = if ahead.iter().all(|c| c.is_finite()) {
            ahead
        } else {
            scale(&back, -1.0)
        };
        return [dir[1], -dir[0]];
    }

    // avg points into the bend; a left bend puts that on the left
    let right = if orient > 0.0 { scale(&avg, -1.0) } else { avg };
    let u = unit(&right);
    [u[0], u[1]]
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_distance_345() {
        assert!(approx_eq(distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0));
    }

    #[test]
    fn test_distance_scaled_uses_calibration() {
        // 10 pixels at 0.5 microns per pixel
        let d = distance_scaled(&[0.0, 0.0], &[10.0, 0.0], &[0.5, 2.0]);
        assert!(approx_eq(d, 5.0));

        // missing factors count as 1
        let d = distance_scaled(&[0.0, 0.0, 0.0], &[0.0, 0.0, 7.0], &[0.5]);
        assert!(approx_eq(d, 7.0));
    }

    #[test]
    fn test_project_onto_line_unconstrained() {
        let p = project(&[0.0, 0.0], &[10.0, 0.0], &[15.0, 3.0], false);
        assert!(approx_eq(p[0], 15.0));
        assert!(approx_eq(p[1], 0.0));
    }

    #[test]
    fn test_project_clamps_to_segment_ends() {
        let a = [0.0, 0.0];
        let b = [10.0, 0.0];

        assert_eq!(project(&a, &b, &[15.0, 3.0], true), vec![10.0, 0.0]);
        assert_eq!(project(&a, &b, &[-4.0, -2.0], true), vec![0.0, 0.0]);

        // reversed segment clamps to the same physical ends
        assert_eq!(project(&b, &a, &[15.0, 3.0], true), vec![10.0, 0.0]);
    }

    #[test]
    fn test_project_inside_segment_is_untouched() {
        let p = project(&[0.0, 0.0], &[4.0, 4.0], &[0.0, 4.0], true);
        assert!(approx_eq(p[0], 2.0));
        assert!(approx_eq(p[1], 2.0));
    }

    #[test]
    fn test_project_first_axis_decides() {
        // segment constant on y: only x can trigger the clamp
        let p = project(&[0.0, 1.0, 0.0], &[2.0, 1.0, 2.0], &[5.0, 1.0, 5.0], true);
        assert_eq!(p, vec![2.0, 1.0, 2.0]);
    }

    #[test]
    fn test_dist_seg_wt_midpoint() {
        let nodes = [[0.0, 0.0], [10.0, 0.0]];
        let hit = dist_seg_wt(&nodes, &[5.0, 5.0]).unwrap();
        assert!(approx_eq(hit.distance, 5.0));
        assert_eq!(hit.segment, 0);
        assert!(approx_eq(hit.weight, 0.5));
    }

    #[test]
    fn test_dist_seg_wt_single_node() {
        let nodes = [[3.0, 4.0]];
        let hit = dist_seg_wt(&nodes, &[0.0, 0.0]).unwrap();
        assert!(approx_eq(hit.distance, 5.0));
        assert_eq!(hit.segment, 0);
        assert_eq!(hit.weight, 0.0);
    }

    #[test]
    fn test_dist_seg_wt_picks_nearest_segment() {
        let nodes = vec![
            vec![0.0, 0.0],
            vec![10.0, 0.0],
            vec![10.0, 10.0],
            vec![0.0, 10.0],
        ];
        let hit = dist_seg_wt(&nodes, &[12.0, 7.5]).unwrap();
        assert!(approx_eq(hit.distance, 2.0));
        assert_eq!(hit.segment, 1);
        assert!(approx_eq(hit.weight, 0.75));
    }

    #[test]
    fn test_dist_seg_wt_beyond_end_clamps_weight() {
        let nodes = [[0.0, 0.0], [10.0, 0.0]];
        let hit = dist_seg_wt(&nodes, &[13.0, 4.0]).unwrap();
        assert!(approx_eq(hit.distance, 5.0));
        assert!(approx_eq(hit.weight, 1.0));
    }

    #[test]
    fn test_dist_seg_wt_empty() {
        let nodes: [[f64; 2]; 0] = [];
        assert!(dist_seg_wt(&nodes, &[0.0, 0.0]).is_none());
    }

    #[test]
    fn test_dist_seg_wt_skips_repeated_node() {
        let nodes = [[0.0, 0.0], [0.0, 0.0], [10.0, 0.0]];
        let hit = dist_seg_wt(&nodes, &[5.0, 5.0]).unwrap();
        assert!(approx_eq(hit.distance, 5.0));
        assert_eq!(hit.segment, 1);
        assert!(approx_eq(hit.weight, 0.5));
    }

    #[test]
    fn test_dist_seg_wt_all_segments_degenerate() {
        let nodes = [[2.0, 2.0], [2.0, 2.0]];
        let hit = dist_seg_wt(&nodes, &[0.0, 0.0]).unwrap();
        assert!(hit.distance.is_nan());
        assert_eq!(hit.segment, 0);
    }

    #[test]
    fn test_coincident_segment_is_nan() {
        let p = project(&[1.0, 1.0], &[1.0, 1.0], &[2.0, 2.0], false);
        assert!(p.iter().all(|c| c.is_nan()));
    }

    #[test]
    fn test_orientation_sign() {
        assert!(orient2d(&[0.0, 0.0], &[1.0, 0.0], &[1.0, 1.0]) > 0.0);
        assert!(orient2d(&[0.0, 0.0], &[1.0, 0.0], &[1.0, -1.0]) < 0.0);
        assert_eq!(orient2d(&[0.0, 0.0], &[1.0, 0.0], &[2.0, 0.0]), 0.0);
    }

    #[test]
    fn test_right_bisector_left_turn() {
        let b = right_bisector(&[0.0, 0.0], &[1.0, 0.0], &[1.0, 1.0]);
        let h = std::f64::consts::FRAC_1_SQRT_2;
        assert!(approx_eq(b[0], h));
        assert!(approx_eq(b[1], -h));
    }

    #[test]
    fn test_right_bisector_right_turn() {
        let b = right_bisector(&[0.0, 0.0], &[1.0, 0.0], &[1.0, -1.0]);
        let h = std::f64::consts::FRAC_1_SQRT_2;
        assert!(approx_eq(b[0], -h));
        assert!(approx_eq(b[1], -h));
    }

    #[test]
    fn test_right_bisector_straight_line() {
        let b = right_bisector(&[0.0, 0.0], &[1.0, 0.0], &[2.0, 0.0]);
        assert!(approx_eq(b[0], 0.0));
        assert!(approx_eq(b[1], -1.0));
    }

    #[test]
    fn test_vector_primitives() {
        assert!(approx_eq(magnitude(&[3.0, 4.0]), 5.0));
        let u = unit(&[0.0, 2.0]);
        assert_eq!(u, vec![0.0, 1.0]);
        assert_eq!(dot(&[1.0, 2.0], &[3.0, 4.0]), 11.0);
        assert_eq!(cross2d(&[1.0, 0.0], &[0.0, 1.0]), 1.0);
        assert_eq!(add(&[1.0, 2.0], &[3.0, 4.0]), vec![4.0, 6.0]);
        assert_eq!(scale(&[1.0, -2.0], 3.0), vec![3.0, -6.0]);
        assert!(equal(&[1.0, 2.0], &[1.0, 2.0]));
        assert!(!equal(&[1.0, 2.0], &[1.0, 2.0 + 1e-15]));
        assert!(opposite(&[1.0, -2.0], &[-1.0, 2.0]));
        assert!(!opposite(&[1.0, 2.0], &[1.0, 2.0]));
    }
}
