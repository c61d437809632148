//! Scoring helpers shared by the rule-based classifiers.
//!
//! All helpers return values in `[0.0, 1.0]` unless otherwise noted.

/// Triangular score peaking at `ideal`.
///
/// Returns 0.0 outside `[min, max]`, ramps linearly up to 1.0 at `ideal`
/// and back down to 0.0 at `max`.
pub fn score_triangular(val: f64, min: f64, ideal: f64, max: f64) -> f64 {
    if val < min || val > max {
        return 0.0;
    }
    if val < ideal {
        if ideal == min {
            return 1.0;
        }
        (val - min) / (ideal - min)
    } else {
        if max == ideal {
            return 1.0;
        }
        1.0 - (val - ideal) / (max - ideal)
    }
}

/// Linear interpolation of the score between two value anchors.
pub fn score_linear(val: f64, min_val: f64, max_val: f64, min_score: f64, max_score: f64) -> f64 {
    if val <= min_val {
        return min_score;
    }
    if val >= max_val {
        return max_score;
    }
    let fraction = (val - min_val) / (max_val - min_val);
    min_score + fraction * (max_score - min_score)
}

/// Exponential decay score: `exp(-val / scale)`.
pub fn score_exponential_decay(val: f64, scale: f64) -> f64 {
    (-val / scale).exp()
}

/// A piecewise-linear mapping from values to scores.
///
/// Anchors are `(value, score)` pairs sorted by value; values outside the
/// anchor range clamp to the nearest anchor's score. Used for font-size
/// proximity curves (zero at the edges, 1.0 at the hinted size) and the
/// page-value preference.
#[derive(Debug, Clone)]
pub struct LinearScale {
    anchors: Vec<(f64, f64)>,
}

impl LinearScale {
    /// Creates a scale from anchors. Anchors are sorted by value; at least
    /// one anchor is required.
    pub fn new(mut anchors: Vec<(f64, f64)>) -> Self {
        debug_assert!(!anchors.is_empty(), "LinearScale needs at least one anchor");
        anchors.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { anchors }
    }

    /// A triangular scale: 0.0 at `ideal * lo_factor`, 1.0 at `ideal`,
    /// 0.0 at `ideal * hi_factor`.
    pub fn around(ideal: f64, lo_factor: f64, hi_factor: f64) -> Self {
        Self::new(vec![
            (ideal * lo_factor, 0.0),
            (ideal, 1.0),
            (ideal * hi_factor, 0.0),
        ])
    }

    /// Evaluates the scale at `val`.
    pub fn apply(&self, val: f64) -> f64 {
        let first = self.anchors[0];
        if val <= first.0 {
            return first.1;
        }
        let last = self.anchors[self.anchors.len() - 1];
        if val >= last.0 {
            return last.1;
        }
        for pair in self.anchors.windows(2) {
            let (x0, s0) = (pair[0].0, pair[0].1);
            let (x1, s1) = (pair[1].0, pair[1].1);
            if val >= x0 && val <= x1 {
                if x1 == x0 {
                    return s1;
                }
                let t = (val - x0) / (x1 - x0);
                return s0 + t * (s1 - s0);
            }
        }
        last.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_triangular() {
        assert_eq!(score_triangular(5.0, 0.0, 5.0, 10.0), 1.0);
        assert_eq!(score_triangular(0.0, 0.0, 5.0, 10.0), 0.0);
        assert_eq!(score_triangular(2.5, 0.0, 5.0, 10.0), 0.5);
        assert_eq!(score_triangular(7.5, 0.0, 5.0, 10.0), 0.5);
        assert_eq!(score_triangular(11.0, 0.0, 5.0, 10.0), 0.0);
        // Degenerate ramps.
        assert_eq!(score_triangular(0.0, 0.0, 0.0, 8.0), 1.0);
        assert_eq!(score_triangular(8.0, 0.0, 8.0, 8.0), 1.0);
    }

    #[test]
    fn test_score_linear() {
        assert_eq!(score_linear(-1.0, 0.0, 10.0, 0.0, 1.0), 0.0);
        assert_eq!(score_linear(5.0, 0.0, 10.0, 0.0, 1.0), 0.5);
        assert_eq!(score_linear(20.0, 0.0, 10.0, 0.0, 1.0), 1.0);
        // Descending score range.
        assert_eq!(score_linear(5.0, 0.0, 10.0, 1.0, 0.0), 0.5);
    }

    #[test]
    fn test_score_exponential_decay() {
        assert_eq!(score_exponential_decay(0.0, 10.0), 1.0);
        assert!((score_exponential_decay(10.0, 10.0) - (-1.0f64).exp()).abs() < 1e-12);
        assert!(score_exponential_decay(100.0, 10.0) < 0.001);
    }

    #[test]
    fn test_linear_scale() {
        let scale = LinearScale::new(vec![(0.0, 1.0), (10.0, 0.0)]);
        assert_eq!(scale.apply(0.0), 1.0);
        assert_eq!(scale.apply(5.0), 0.5);
        assert_eq!(scale.apply(10.0), 0.0);
        assert_eq!(scale.apply(15.0), 0.0);
        assert_eq!(scale.apply(-5.0), 1.0);
    }

    #[test]
    fn test_linear_scale_around() {
        let scale = LinearScale::around(12.0, 0.5, 1.5);
        assert_eq!(scale.apply(12.0), 1.0);
        assert_eq!(scale.apply(6.0), 0.0);
        assert_eq!(scale.apply(18.0), 0.0);
        assert!((scale.apply(9.0) - 0.5).abs() < 1e-9);
    }
}
