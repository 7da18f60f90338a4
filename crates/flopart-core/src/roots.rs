//! Bracketed root finding for `a * exp(m) + b * m + c`.

use crate::piecewise::{eval_terms, Piece};

/// Doublings tried when pulling an infinite lower bound in to a finite one.
const MAX_BRACKET_EXPANSIONS: usize = 64;

/// Function `mean_coef * exp(m) + log_mean_coef * m + constant`, usually the
/// difference of two pieces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ExpLinear {
    pub mean_coef: f64,
    pub log_mean_coef: f64,
    pub constant: f64,
}

impl ExpLinear {
    /// `p - q` on their common interval.
    pub fn difference(p: &Piece, q: &Piece) -> Self {
        Self {
            mean_coef: p.mean_coef - q.mean_coef,
            log_mean_coef: p.log_mean_coef - q.log_mean_coef,
            constant: p.constant - q.constant,
        }
    }

    /// `p - level`.
    pub fn offset(p: &Piece, level: f64) -> Self {
        Self {
            mean_coef: p.mean_coef,
            log_mean_coef: p.log_mean_coef,
            constant: p.constant - level,
        }
    }

    pub fn eval(&self, log_mean: f64) -> f64 {
        eval_terms(self.mean_coef, self.log_mean_coef, self.constant, log_mean)
    }

    fn derivative(&self, log_mean: f64) -> f64 {
        self.mean_coef * log_mean.exp() + self.log_mean_coef
    }

    /// Where the derivative vanishes, if anywhere.
    pub fn stationary_point(&self) -> Option<f64> {
        if self.mean_coef == 0.0 {
            return None;
        }
        let ratio = -self.log_mean_coef / self.mean_coef;
        if ratio > 0.0 && ratio.is_finite() {
            Some(ratio.ln())
        } else {
            None
        }
    }
}

fn opposite_signs(u: f64, v: f64) -> bool {
    (u < 0.0 && v > 0.0) || (u > 0.0 && v < 0.0)
}

/// Safeguarded Newton iteration with bisection fallback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootSolver {
    /// Relative width at which a bracket counts as converged.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for RootSolver {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations: 100,
        }
    }
}

impl RootSolver {
    /// Root of `g` inside `[lo, hi]`, where `g` must be monotone.
    ///
    /// Returns `None` unless `g(lo)` and `g(hi)` have strictly opposite signs.
    /// `lo` may be `-inf`; `hi` must be finite.
    pub(crate) fn solve(&self, g: &ExpLinear, lo: f64, hi: f64) -> Option<f64> {
        let g_lo = g.eval(lo);
        let g_hi = g.eval(hi);
        if !opposite_signs(g_lo, g_hi) {
            return None;
        }
        let lower_is_negative = g_lo < 0.0;

        let mut lo = if lo.is_finite() {
            lo
        } else {
            match self.finite_lower_bound(g, hi, lower_is_negative) {
                Bound::Finite(bound) => bound,
                Bound::Root(root) => return Some(root),
                Bound::Missing => return None,
            }
        };
        let mut hi = hi;

        let mut x = 0.5 * (lo + hi);
        for _ in 0..self.max_iterations {
            let gx = g.eval(x);
            if gx == 0.0 {
                return Some(x);
            }
            if (gx < 0.0) == lower_is_negative {
                lo = x;
            } else {
                hi = x;
            }
            if hi - lo <= self.tolerance * (1.0 + x.abs()) {
                return Some(0.5 * (lo + hi));
            }

            let slope = g.derivative(x);
            let newton = x - gx / slope;
            if slope != 0.0 && newton > lo && newton < hi {
                if (newton - x).abs() <= self.tolerance * (1.0 + x.abs()) {
                    return Some(newton);
                }
                x = newton;
            } else {
                x = 0.5 * (lo + hi);
            }
        }
        Some(x.max(lo).min(hi))
    }

    /// Walk left from `hi` until `g` takes the sign it has at `-inf`.
    fn finite_lower_bound(&self, g: &ExpLinear, hi: f64, lower_is_negative: bool) -> Bound {
        let mut step = 1.0;
        for _ in 0..MAX_BRACKET_EXPANSIONS {
            let candidate = hi - step;
            let value = g.eval(candidate);
            if value == 0.0 {
                return Bound::Root(candidate);
            }
            if (value < 0.0) == lower_is_negative {
                return Bound::Finite(candidate);
            }
            step *= 2.0;
        }
        Bound::Missing
    }
}

enum Bound {
    Finite(f64),
    Root(f64),
    Missing,
}
