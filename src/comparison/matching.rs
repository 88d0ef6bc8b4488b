// src/comparison/matching.rs
//
// Greedy one-directional matching between two unordered sets.
//
// Every item of the first set independently picks its best partner in the
// second set; partners may be reused and no global assignment is solved.
// The result therefore depends on which set drives the matching:
// sim(A, B) and sim(B, A) agree only approximately.

/// Accumulated scores (or distances) of the items that found a partner.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Matches {
    pub total: f64,
    pub count: usize,
}

impl Matches {
    fn add(&mut self, value: f64) {
        self.total += value;
        self.count += 1;
    }

    /// Mean over matched items, `None` when nothing matched.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.total / self.count as f64)
    }
}

/// For each item of `a`, the highest similarity against any compatible
/// item of `b` (`similarity` returns `None` for incompatible pairs). An
/// item counts as matched when its best similarity exceeds `threshold`.
pub fn best_similarity<A, B, F>(a: &[A], b: &[B], threshold: f64, similarity: F) -> Matches
where
    F: Fn(&A, &B) -> Option<f64>,
{
    let mut matches = Matches::default();
    for x in a {
        let best = b
            .iter()
            .filter_map(|y| similarity(x, y))
            .fold(0.0_f64, f64::max);
        if best > threshold {
            matches.add(best);
        }
    }
    matches
}

/// For each item of `a`, the distance to its nearest item of `b`. An item
/// counts as matched when that distance is below `max_distance`.
pub fn nearest_distance<A, B, F>(a: &[A], b: &[B], max_distance: f64, distance: F) -> Matches
where
    F: Fn(&A, &B) -> f64,
{
    let mut matches = Matches::default();
    for x in a {
        let nearest = b.iter().map(|y| distance(x, y)).fold(f64::INFINITY, f64::min);
        if nearest.is_finite() && nearest < max_distance {
            matches.add(nearest);
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abs_diff(a: &f64, b: &f64) -> f64 {
        (a - b).abs()
    }

    #[test]
    fn test_nearest_distance_threshold() {
        let m = nearest_distance(&[0.0, 100.0], &[1.0, 3.0], 10.0, abs_diff);
        assert_eq!(m.count, 1);
        assert_eq!(m.total, 1.0);
        assert_eq!(m.mean(), Some(1.0));
    }

    #[test]
    fn test_partners_are_reused() {
        // Both items pick the same partner.
        let m = nearest_distance(&[0.0, 2.0], &[1.0], 10.0, abs_diff);
        assert_eq!(m.count, 2);
        assert_eq!(m.total, 2.0);
    }

    #[test]
    fn test_matching_is_one_directional() {
        let a = [0.0, 1.0, 2.0];
        let b = [0.0];
        let ab = nearest_distance(&a, &b, 10.0, abs_diff).mean();
        let ba = nearest_distance(&b, &a, 10.0, abs_diff).mean();
        assert_eq!(ab, Some(1.0));
        assert_eq!(ba, Some(0.0));
    }

    #[test]
    fn test_incompatible_pairs_are_skipped() {
        let sim = |x: &(char, f64), y: &(char, f64)| {
            (x.0 == y.0).then(|| 1.0 - (x.1 - y.1).abs())
        };
        let m = best_similarity(&[('a', 0.5), ('b', 0.5)], &[('a', 0.4)], 0.3, sim);
        assert_eq!(m.count, 1);
        assert!((m.total - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_empty_sets_never_match() {
        assert_eq!(best_similarity(&[1.0], &[] as &[f64], 0.0, |_, _| Some(1.0)).mean(), None);
        assert_eq!(nearest_distance(&[] as &[f64], &[1.0], 5.0, abs_diff).count, 0);
    }
}
