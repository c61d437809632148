//! Post-solve spatial assignment.
//!
//! Fields declared `assignment: spatial` are bound here, after the solver
//! has picked the candidate set: one-to-one slots (a step's diagram) via
//! minimum-cost bipartite matching, sequence slots (a step's arrows) by
//! attaching each child to its lowest-cost eligible parent. Costs come
//! from page geometry: distance with a top-left position preference, and
//! pairings crossing a divider are rejected outright.

use crate::core::geometry::BBox;

/// Cost ceiling marking an invalid pairing inside the matching matrix.
///
/// Finite so the potential-based matching arithmetic stays well defined;
/// assignments at or above half this value are discarded afterwards.
const BIG: f64 = 1e12;

/// Configuration for spatial pairing costs.
#[derive(Debug, Clone)]
pub struct PairingConfig {
    /// Maximum distance between a parent and child for a valid pairing.
    pub max_distance: f64,
    /// Weight of the position-preference score.
    pub position_weight: f64,
    /// Weight of the distance score.
    pub distance_weight: f64,
    /// Distance tolerance for the top-left position preference.
    pub top_left_tolerance: f64,
    /// Whether pairings crossing a divider are rejected.
    pub check_dividers: bool,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            max_distance: 500.0,
            position_weight: 0.5,
            distance_weight: 0.5,
            top_left_tolerance: 100.0,
            check_dividers: true,
        }
    }
}

/// Scores how well a parent anchor sits at the top-left of a target.
///
/// Step numbers sit to the left of and above their diagram; the score
/// decays as the anchor drifts right of or below the target's center,
/// with a bonus for being near the target's top-left corner.
pub fn position_score(anchor: &BBox, target: &BBox, tolerance: f64) -> f64 {
    let (ax, ay) = anchor.center();
    let (tx, ty) = target.center();

    let axis_score = |offset: f64| -> f64 {
        if offset <= 0.0 {
            1.0
        } else if offset <= tolerance {
            1.0 - (offset / tolerance) * 0.5
        } else {
            (0.5 - ((offset - tolerance) / tolerance) * 0.5).max(0.0)
        }
    };
    let x_score = axis_score(ax - tx);
    let y_score = axis_score(ay - ty);

    let corner_distance = ((ax - target.x0).powi(2) + (ay - target.y0).powi(2)).sqrt();
    let corner_bonus = if corner_distance <= tolerance {
        0.2 * (1.0 - corner_distance / tolerance)
    } else {
        0.0
    };

    ((x_score * y_score).sqrt() + corner_bonus).min(1.0)
}

/// Scores proximity from the anchor center to the nearest point of the
/// target, decaying linearly to zero at `max_distance`.
pub fn distance_score(anchor: &BBox, target: &BBox, max_distance: f64) -> f64 {
    let distance = anchor.center_to_nearest_point(target);
    if distance > max_distance {
        return 0.0;
    }
    1.0 - distance / max_distance
}

/// Checks whether a divider separates the two boxes.
///
/// A divider fully contained in either box is internal and ignored.
pub fn has_divider_between(a: &BBox, b: &BBox, dividers: &[BBox]) -> bool {
    let ca = a.center();
    let cb = b.center();
    dividers.iter().any(|divider| {
        !divider.fully_inside(a) && !divider.fully_inside(b) && divider.segment_intersects(ca, cb)
    })
}

/// Cost of pairing a parent anchor with a child target.
///
/// Lower is better; `None` marks an invalid pairing (too far, wrong side,
/// or separated by a divider).
pub fn pairing_cost(
    anchor: &BBox,
    target: &BBox,
    config: &PairingConfig,
    dividers: &[BBox],
) -> Option<f64> {
    if config.check_dividers && has_divider_between(anchor, target, dividers) {
        return None;
    }
    let position = position_score(anchor, target, config.top_left_tolerance);
    let distance = distance_score(anchor, target, config.max_distance);
    if position <= 0.0 || distance <= 0.0 {
        return None;
    }
    Some(-(config.position_weight * position + config.distance_weight * distance))
}

/// Minimum-cost one-to-one assignment over a rectangular cost matrix.
///
/// `cost[i][j]` is the cost of assigning row `i` to column `j`; `None`
/// marks an invalid pairing. Returns, per row, the assigned column (or
/// `None`). Every returned pairing is valid; the total cost over valid
/// pairings is minimal. Deterministic for equal-cost alternatives.
pub fn min_cost_assignment(cost: &[Vec<Option<f64>>]) -> Vec<Option<usize>> {
    let rows = cost.len();
    let cols = cost.first().map(Vec::len).unwrap_or(0);
    if rows == 0 || cols == 0 {
        return vec![None; rows];
    }

    if rows > cols {
        // Transpose so the potential method sees rows <= cols.
        let transposed: Vec<Vec<Option<f64>>> = (0..cols)
            .map(|j| (0..rows).map(|i| cost[i][j]).collect())
            .collect();
        let by_col = min_cost_assignment(&transposed);
        let mut by_row = vec![None; rows];
        for (col, row) in by_col.into_iter().enumerate() {
            if let Some(row) = row {
                by_row[row] = Some(col);
            }
        }
        return by_row;
    }

    // Shortest augmenting path with potentials (1-based internals).
    let n = rows;
    let m = cols;
    let at = |i: usize, j: usize| cost[i - 1][j - 1].unwrap_or(BIG);

    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; m + 1];
    let mut matched_row = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        matched_row[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];
        loop {
            used[j0] = true;
            let i0 = matched_row[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0usize;
            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let reduced = at(i0, j) - u[i0] - v[j];
                if reduced < minv[j] {
                    minv[j] = reduced;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }
            for j in 0..=m {
                if used[j] {
                    u[matched_row[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if matched_row[j0] == 0 {
                break;
            }
        }
        loop {
            let j1 = way[j0];
            matched_row[j0] = matched_row[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut result = vec![None; rows];
    for j in 1..=m {
        let i = matched_row[j];
        if i != 0 && cost[i - 1][j - 1].is_some() {
            result[i - 1] = Some(j - 1);
        }
    }
    result
}

/// Attaches each child to its lowest-cost parent.
///
/// The many-children-per-parent companion to [`min_cost_assignment`]:
/// sequence fields place no capacity limit on the parent, so each child
/// independently picks the cheapest valid parent. Returns, per child, the
/// chosen parent index (or `None`). Ties break toward the lower parent
/// index.
pub fn attach_to_nearest(
    parents: &[BBox],
    children: &[BBox],
    config: &PairingConfig,
    dividers: &[BBox],
) -> Vec<Option<usize>> {
    children
        .iter()
        .map(|child| {
            let mut best: Option<(f64, usize)> = None;
            for (index, parent) in parents.iter().enumerate() {
                let Some(cost) = pairing_cost(parent, child, config, dividers) else {
                    continue;
                };
                let better = match best {
                    Some((best_cost, _)) => cost < best_cost,
                    None => true,
                };
                if better {
                    best = Some((cost, index));
                }
            }
            best.map(|(_, index)| index)
        })
        .collect()
}
