//! Envelope operations on [`PiecewiseCost`] values.
//!
//! The pointwise minimum of two functions merges the "continue the current
//! segment" and "start a new segment" hypotheses. The running minima from the
//! left and from the right turn the previous segment's cost into the best cost
//! reachable when the new mean must be at least (resp. at most) the old one.

use crate::piecewise::{Piece, PiecewiseCost};
use crate::roots::{ExpLinear, RootSolver};

/// A log-mean strictly inside `(lo, hi)`; `hi` must be finite.
fn interior_point(lo: f64, hi: f64) -> f64 {
    if lo.is_finite() {
        0.5 * (lo + hi)
    } else {
        hi - 1.0
    }
}

/// Push the pointwise minimum of `p` and `q` over `[lo, hi]`.
fn push_min_pieces(p: &Piece, q: &Piece, lo: f64, hi: f64, solver: &RootSolver, out: &mut Vec<Piece>) {
    match (p.feasible, q.feasible) {
        (false, false) => out.push(Piece::infeasible(lo, hi)),
        (true, false) => out.push(p.clipped(lo, hi)),
        (false, true) => out.push(q.clipped(lo, hi)),
        (true, true) => {
            let diff = ExpLinear::difference(p, q);

            // Split at the extremum of p - q so each part is monotone and
            // crosses zero at most once.
            let mut monotone_ends = Vec::with_capacity(2);
            if let Some(turn) = diff.stationary_point() {
                if lo < turn && turn < hi {
                    monotone_ends.push(turn);
                }
            }
            monotone_ends.push(hi);

            let mut cuts = Vec::with_capacity(4);
            let mut start = lo;
            for end in monotone_ends {
                if let Some(root) = solver.solve(&diff, start, end) {
                    if start < root && root < end {
                        cuts.push(root);
                    }
                }
                cuts.push(end);
                start = end;
            }

            let mut from = lo;
            for to in cuts {
                if from < to {
                    let winner = if diff.eval(interior_point(from, to)) <= 0.0 {
                        p
                    } else {
                        q
                    };
                    out.push(winner.clipped(from, to));
                }
                from = to;
            }
        }
    }
}

impl PiecewiseCost {
    /// Pointwise minimum of `self` and `other`.
    ///
    /// Both functions must tile the same domain. Where they tie, `self` wins.
    pub fn min_envelope(&self, other: &PiecewiseCost, solver: &RootSolver) -> PiecewiseCost {
        let (left, right) = (self.pieces(), other.pieces());
        let mut out = Vec::with_capacity(left.len() + right.len());
        let (mut i, mut j) = (0, 0);

        while i < left.len() && j < right.len() {
            let (p, q) = (&left[i], &right[j]);
            let lo = p.min_log_mean.max(q.min_log_mean);
            let hi = p.max_log_mean.min(q.max_log_mean);
            if lo < hi {
                push_min_pieces(p, q, lo, hi, solver, &mut out);
            }
            if p.max_log_mean <= hi {
                i += 1;
            }
            if q.max_log_mean <= hi {
                j += 1;
            }
        }

        PiecewiseCost::from_pieces(out)
    }

    /// Running minimum from the left: `h(m) = min over m' <= m of f(m')`.
    ///
    /// Where `h` follows `f` the previous mean is tied to the new one; on the
    /// flat stretches it is pinned at the running minimizer.
    pub fn min_less(&self, solver: &RootSolver) -> PiecewiseCost {
        let mut out = Vec::with_capacity(2 * self.len());
        let mut best: Option<(f64, f64)> = None;

        for piece in self.pieces() {
            let (lo, hi) = (piece.min_log_mean, piece.max_log_mean);
            if !piece.feasible {
                out.push(match best {
                    Some((cost, at)) => Piece::flat(cost, lo, hi, at),
                    None => Piece::infeasible(lo, hi),
                });
                continue;
            }

            let argmin = piece.argmin();
            let min_cost = piece.cost_at(argmin);
            match best {
                Some((cost, at)) if piece.cost_at(lo) > cost => {
                    if min_cost < cost {
                        let crossing = solver
                            .solve(&ExpLinear::offset(piece, cost), lo, argmin)
                            .unwrap_or(lo);
                        out.push(Piece::flat(cost, lo, crossing, at));
                        out.push(piece.tied(crossing, argmin));
                    } else {
                        out.push(Piece::flat(cost, lo, hi, at));
                        continue;
                    }
                }
                _ => out.push(piece.tied(lo, argmin)),
            }

            let (cost, at) = match best {
                Some((cost, at)) if cost <= min_cost => (cost, at),
                _ => (min_cost, argmin),
            };
            best = Some((cost, at));
            out.push(Piece::flat(cost, argmin, hi, at));
        }

        PiecewiseCost::from_pieces(out)
    }

    /// Running minimum from the right: `h(m) = min over m' >= m of f(m')`.
    pub fn min_more(&self, solver: &RootSolver) -> PiecewiseCost {
        let mut reversed = Vec::with_capacity(2 * self.len());
        let mut best: Option<(f64, f64)> = None;

        for piece in self.pieces().iter().rev() {
            let (lo, hi) = (piece.min_log_mean, piece.max_log_mean);
            if !piece.feasible {
                reversed.push(match best {
                    Some((cost, at)) => Piece::flat(cost, lo, hi, at),
                    None => Piece::infeasible(lo, hi),
                });
                continue;
            }

            let argmin = piece.argmin();
            let min_cost = piece.cost_at(argmin);
            match best {
                Some((cost, at)) if piece.cost_at(hi) > cost => {
                    if min_cost < cost {
                        let crossing = solver
                            .solve(&ExpLinear::offset(piece, cost), argmin, hi)
                            .unwrap_or(hi);
                        reversed.push(Piece::flat(cost, crossing, hi, at));
                        reversed.push(piece.tied(argmin, crossing));
                    } else {
                        reversed.push(Piece::flat(cost, lo, hi, at));
                        continue;
                    }
                }
                _ => reversed.push(piece.tied(argmin, hi)),
            }

            let (cost, at) = match best {
                Some((cost, at)) if cost <= min_cost => (cost, at),
                _ => (min_cost, argmin),
            };
            best = Some((cost, at));
            reversed.push(Piece::flat(cost, lo, argmin, at));
        }

        reversed.reverse();
        PiecewiseCost::from_pieces(reversed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piecewise::{LogMeanDomain, PrevLogMean, NO_PREDECESSOR};
    use approx::assert_relative_eq;

    fn domain(lo: f64, hi: f64) -> LogMeanDomain {
        LogMeanDomain {
            min_log_mean: lo,
            max_log_mean: hi,
        }
    }

    fn grid(lo: f64, hi: f64, n: usize) -> Vec<f64> {
        (0..=n)
            .map(|k| lo + (hi - lo) * k as f64 / n as f64)
            .collect()
    }

    #[test]
    fn test_min_less_of_single_piece() {
        let d = domain(0.0, 10f64.ln());
        let f = PiecewiseCost::initial(3, d);
        let h = f.min_less(&RootSolver::default());

        assert_eq!(h.len(), 2);
        let (decreasing, flat) = (&h.pieces()[0], &h.pieces()[1]);
        assert_eq!(decreasing.prev_log_mean, PrevLogMean::Tied);
        assert_relative_eq!(decreasing.max_log_mean, 3f64.ln(), epsilon = 1e-12);
        assert_eq!(flat.mean_coef, 0.0);
        assert_relative_eq!(flat.constant, 3.0 - 3.0 * 3f64.ln(), epsilon = 1e-12);
        match flat.prev_log_mean {
            PrevLogMean::Pinned(at) => assert_relative_eq!(at, 3f64.ln(), epsilon = 1e-12),
            PrevLogMean::Tied => panic!("flat stretch must pin the previous mean"),
        }
    }

    #[test]
    fn test_min_more_of_single_piece() {
        let d = domain(0.0, 10f64.ln());
        let f = PiecewiseCost::initial(3, d);
        let h = f.min_more(&RootSolver::default());

        assert_eq!(h.len(), 2);
        let (flat, increasing) = (&h.pieces()[0], &h.pieces()[1]);
        assert_eq!(flat.min_log_mean, 0.0);
        assert!(matches!(flat.prev_log_mean, PrevLogMean::Pinned(_)));
        assert_eq!(increasing.prev_log_mean, PrevLogMean::Tied);
        assert_relative_eq!(increasing.min_log_mean, 3f64.ln(), epsilon = 1e-12);
        assert_eq!(increasing.max_log_mean, 10f64.ln());
    }

    #[test]
    fn test_running_minima_bound_function() {
        // e^m - 3m wins below 1.5, the shifted e^m - 20m above it: a shallow
        // dip at ln 3 followed by a deeper one at ln 20.
        let d = domain(0.0, 4.0);
        let f = PiecewiseCost::initial(3, d).min_envelope(
            &{
                let mut g = PiecewiseCost::initial(20, d);
                g.add_penalty(25.5, 1.0, 2);
                g
            },
            &RootSolver::default(),
        );
        assert_eq!(f.len(), 2);
        let solver = RootSolver::default();
        let less = f.min_less(&solver);
        let more = f.min_more(&solver);

        let points = grid(0.0, 4.0, 400);
        let mut prev_less = f64::INFINITY;
        let mut prev_more = f64::NEG_INFINITY;
        for &m in &points {
            let l = less.cost_at(m);
            let r = more.cost_at(m);
            assert!(l <= f.cost_at(m) + 1e-9);
            assert!(r <= f.cost_at(m) + 1e-9);
            assert!(l <= prev_less + 1e-9, "min_less must not increase");
            assert!(r >= prev_more - 1e-9, "min_more must not decrease");
            prev_less = l;
            prev_more = r;
        }

        // Running minima agree with brute force on the grid.
        for (k, &m) in points.iter().enumerate() {
            let left_best = points[..=k]
                .iter()
                .map(|&x| f.cost_at(x))
                .fold(f64::INFINITY, f64::min);
            assert!(less.cost_at(m) <= left_best + 1e-9);
            assert!(less.cost_at(m) >= left_best - 0.05);
        }
    }

    #[test]
    fn test_min_envelope_single_crossing() {
        let d = domain(-1.0, 3.0);
        let mut f = PiecewiseCost::initial(2, d);
        f.add_penalty(0.0, 1.0, 4);
        let mut g = PiecewiseCost::initial(8, d);
        g.add_penalty(0.0, 1.0, 6);

        let h = f.min_envelope(&g, &RootSolver::default());
        assert_eq!(h.len(), 2);
        assert_eq!(h.pieces()[0].prev_seg_end, 4);
        assert_eq!(h.pieces()[1].prev_seg_end, 6);
        assert_relative_eq!(h.pieces()[0].max_log_mean, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_min_envelope_double_crossing() {
        let d = domain(0.0, 3.0);
        let f = PiecewiseCost::initial(3, d);
        let g = PiecewiseCost::from_pieces(vec![Piece::flat(0.0, 0.0, 3.0, 1.0)]);

        let h = f.min_envelope(&g, &RootSolver::default());
        assert_eq!(h.len(), 3);
        assert_eq!(h.pieces()[0].mean_coef, 0.0);
        assert_eq!(h.pieces()[1].mean_coef, 1.0);
        assert_eq!(h.pieces()[2].mean_coef, 0.0);
        for piece in &h.pieces()[1..] {
            assert_relative_eq!(f.cost_at(piece.min_log_mean), 0.0, epsilon = 1e-9);
        }

        for m in grid(0.0, 3.0, 300) {
            let expected = f.cost_at(m).min(g.cost_at(m));
            assert_relative_eq!(h.cost_at(m), expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_min_envelope_prefers_first_on_ties() {
        let d = domain(0.0, 2.0);
        let mut f = PiecewiseCost::initial(4, d);
        f.add_penalty(0.0, 1.0, 1);
        let mut g = PiecewiseCost::initial(4, d);
        g.add_penalty(0.0, 1.0, 7);

        let h = f.min_envelope(&g, &RootSolver::default());
        assert_eq!(h.len(), 1);
        assert_eq!(h.pieces()[0].prev_seg_end, 1);
    }

    #[test]
    fn test_min_envelope_with_infeasible_parts() {
        let d = domain(0.0, 2.0);
        let f = PiecewiseCost::from_pieces(vec![
            Piece::infeasible(0.0, 1.0),
            Piece::poisson(2, d, 3).clipped(1.0, 2.0),
        ]);
        let g = PiecewiseCost::from_pieces(vec![
            Piece::poisson(5, d, 8).clipped(0.0, 1.5),
            Piece::infeasible(1.5, 2.0),
        ]);

        let h = f.min_envelope(&g, &RootSolver::default());
        assert!(h.pieces().iter().all(|p| p.feasible));
        assert_eq!(h.pieces()[0].prev_seg_end, 8);
        assert_eq!(h.pieces().last().unwrap().prev_seg_end, 3);

        let both = PiecewiseCost::infeasible(d).min_envelope(&PiecewiseCost::infeasible(d), &RootSolver::default());
        assert_eq!(both.len(), 1);
        assert!(!both.is_feasible());
    }

    #[test]
    fn test_min_less_keeps_infeasible_prefix() {
        let d = domain(0.0, 2.0);
        let f = PiecewiseCost::from_pieces(vec![
            Piece::infeasible(0.0, 0.5),
            Piece::poisson(3, d, NO_PREDECESSOR).clipped(0.5, 2.0),
        ]);
        let less = f.min_less(&RootSolver::default());
        assert!(!less.pieces()[0].feasible);
        assert_eq!(less.pieces()[0].max_log_mean, 0.5);

        let more = f.min_more(&RootSolver::default());
        assert!(more.pieces().iter().all(|p| p.feasible));
        assert_eq!(more.pieces()[0].mean_coef, 0.0);
    }

    #[test]
    fn test_running_minima_with_zero_count_domain() {
        let d = domain(f64::NEG_INFINITY, 5f64.ln());
        let solver = RootSolver::default();
        let mut f = PiecewiseCost::initial(0, d);
        f.adjust_weights(0.0, 1.0, 1.0, 0);
        f.adjust_weights(1.0, 2.0, 1.0, 5);

        let less = f.min_less(&solver);
        let more = f.min_more(&solver);
        let best = f.minimize().unwrap();
        assert_relative_eq!(best.mean(), 2.5, epsilon = 1e-12);
        assert_relative_eq!(less.minimize().unwrap().cost, best.cost, epsilon = 1e-12);
        assert_relative_eq!(more.minimize().unwrap().cost, best.cost, epsilon = 1e-12);
        assert_eq!(less.pieces()[0].min_log_mean, f64::NEG_INFINITY);
        assert_eq!(more.pieces()[0].min_log_mean, f64::NEG_INFINITY);
    }
}
