//! Convex hull pruning for boundary point sets.
//!
//! Distance scans over a task only ever touch the extreme points of each
//! observation zone's sampled boundary, so interior samples are dropped
//! before the scan. Works entirely in the flat task plane.

use crate::projection::SearchPoint;

/// Cross product of `(b - a)` and `(c - a)`; positive for a left turn.
fn cross(a: &SearchPoint, b: &SearchPoint, c: &SearchPoint) -> f64 {
    let ab = a.flat().vector_to(b.flat());
    let ac = a.flat().vector_to(c.flat());
    ab.x * ac.y - ab.y * ac.x
}

/// Removes all points strictly inside the convex hull of `points`,
/// returning the hull in counter-clockwise order starting from the
/// lexicographically smallest point.
///
/// Points on the hull edges are kept: a boundary sample that happens to be
/// collinear is still a legitimate scan candidate. Exact duplicates are
/// dropped. Returns whether anything was removed.
pub fn prune_interior(points: &mut Vec<SearchPoint>) -> bool {
    let before = points.len();
    if before < 3 {
        return false;
    }

    // sort by (x, y) and drop exact duplicates
    points.sort_by(|a, b| {
        (a.flat().x(), a.flat().y())
            .partial_cmp(&(b.flat().x(), b.flat().y()))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    points.dedup_by(|a, b| a.flat() == b.flat());

    if points.len() >= 3 {
        *points = monotone_chain(points);
    }
    points.len() != before
}

/// Andrew's monotone chain over points pre-sorted by (x, y). Pops only on
/// strict right turns so collinear boundary points survive.
fn monotone_chain(points: &[SearchPoint]) -> Vec<SearchPoint> {
    let mut lower: Vec<SearchPoint> = Vec::with_capacity(points.len());
    for p in points {
        while lower.len() >= 2
            && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) < 0.0
        {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<SearchPoint> = Vec::with_capacity(points.len());
    for p in points.iter().rev() {
        while upper.len() >= 2
            && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) < 0.0
        {
            upper.pop();
        }
        upper.push(*p);
    }

    // each chain ends where the other begins
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}
