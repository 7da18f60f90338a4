//! Piecewise Poisson cost functions of the segment log-mean.
//!
//! Every piece holds `cost(m) = mean_coef * exp(m) + log_mean_coef * m + constant`
//! over a closed interval of log-means. Pieces are stored in increasing order and
//! tile the whole [`LogMeanDomain`]; neighbouring pieces share their boundary.
//! A piece that is not feasible stands for `+inf` over its interval.

use std::fmt;

use crate::error::{FlopartError, Result};

/// Boundary index stored on pieces whose segment starts at the first data point.
pub const NO_PREDECESSOR: isize = -1;

/// Which monotone run the current segment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// The segment mean went up (or stayed) at the last changepoint.
    Up,
    /// The segment mean went down (or stayed) at the last changepoint.
    Down,
}

impl RunState {
    /// The state of the segment before a changepoint.
    pub fn opposite(self) -> Self {
        match self {
            RunState::Up => RunState::Down,
            RunState::Down => RunState::Up,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Up => write!(f, "up"),
            RunState::Down => write!(f, "down"),
        }
    }
}

/// Mean of the previous segment, as recorded on a piece for backtracking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrevLogMean {
    /// The previous segment shares the mean of the segment being decoded.
    Tied,
    /// The previous segment sits at this log-mean.
    Pinned(f64),
}

impl PrevLogMean {
    /// Log-mean of the previous segment given the current segment's log-mean.
    pub fn resolve(self, current_log_mean: f64) -> f64 {
        match self {
            PrevLogMean::Tied => current_log_mean,
            PrevLogMean::Pinned(log_mean) => log_mean,
        }
    }
}

/// Closed interval of candidate log-means, spanning the observed counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogMeanDomain {
    pub min_log_mean: f64,
    /// Always finite and strictly greater than `min_log_mean`.
    pub max_log_mean: f64,
}

impl LogMeanDomain {
    /// Compute the domain from the counts.
    ///
    /// A zero count gives a lower bound of `-inf`. Fails with
    /// [`FlopartError::DegenerateInput`] when every count is identical.
    pub fn from_counts(counts: &[u32]) -> Result<Self> {
        if counts.is_empty() {
            return Err(FlopartError::InvalidInput(
                "counts must contain at least one value".into(),
            ));
        }

        let (min_log_mean, max_log_mean) = counts.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), &count| {
                let log_count = f64::from(count).ln();
                (lo.min(log_count), hi.max(log_count))
            },
        );

        if min_log_mean == max_log_mean {
            return Err(FlopartError::DegenerateInput {
                log_mean: min_log_mean,
            });
        }

        Ok(Self {
            min_log_mean,
            max_log_mean,
        })
    }
}

/// Evaluate `mean_coef * exp(m) + log_mean_coef * m + constant`.
///
/// Zero coefficients are skipped so that `m = -inf` yields the limit instead of NaN.
pub(crate) fn eval_terms(mean_coef: f64, log_mean_coef: f64, constant: f64, log_mean: f64) -> f64 {
    let mut value = constant;
    if mean_coef != 0.0 {
        value += mean_coef * log_mean.exp();
    }
    if log_mean_coef != 0.0 {
        value += log_mean_coef * log_mean;
    }
    value
}

/// One interval of a [`PiecewiseCost`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Piece {
    pub mean_coef: f64,
    pub log_mean_coef: f64,
    pub constant: f64,
    pub min_log_mean: f64,
    pub max_log_mean: f64,
    /// Last index of the previous segment when this piece is optimal.
    pub prev_seg_end: isize,
    pub prev_log_mean: PrevLogMean,
    pub feasible: bool,
}

impl Piece {
    /// Unweighted Poisson loss `exp(m) - count * m` of a single observation.
    pub fn poisson(count: u32, domain: LogMeanDomain, prev_seg_end: isize) -> Self {
        Self {
            mean_coef: 1.0,
            log_mean_coef: -f64::from(count),
            constant: 0.0,
            min_log_mean: domain.min_log_mean,
            max_log_mean: domain.max_log_mean,
            prev_seg_end,
            prev_log_mean: PrevLogMean::Tied,
            feasible: true,
        }
    }

    /// Constant piece whose previous segment is pinned at `pinned_log_mean`.
    pub fn flat(cost: f64, min_log_mean: f64, max_log_mean: f64, pinned_log_mean: f64) -> Self {
        Self {
            mean_coef: 0.0,
            log_mean_coef: 0.0,
            constant: cost,
            min_log_mean,
            max_log_mean,
            prev_seg_end: NO_PREDECESSOR,
            prev_log_mean: PrevLogMean::Pinned(pinned_log_mean),
            feasible: true,
        }
    }

    pub fn infeasible(min_log_mean: f64, max_log_mean: f64) -> Self {
        Self {
            mean_coef: 0.0,
            log_mean_coef: 0.0,
            constant: f64::INFINITY,
            min_log_mean,
            max_log_mean,
            prev_seg_end: NO_PREDECESSOR,
            prev_log_mean: PrevLogMean::Tied,
            feasible: false,
        }
    }

    /// Copy of this piece restricted to `[min_log_mean, max_log_mean]`.
    pub fn clipped(&self, min_log_mean: f64, max_log_mean: f64) -> Self {
        Self {
            min_log_mean,
            max_log_mean,
            ..*self
        }
    }

    /// Copy of this piece's function whose previous segment is tied to the current one.
    pub(crate) fn tied(&self, min_log_mean: f64, max_log_mean: f64) -> Self {
        Self {
            prev_log_mean: PrevLogMean::Tied,
            ..self.clipped(min_log_mean, max_log_mean)
        }
    }

    pub fn cost_at(&self, log_mean: f64) -> f64 {
        if !self.feasible {
            return f64::INFINITY;
        }
        eval_terms(self.mean_coef, self.log_mean_coef, self.constant, log_mean)
    }

    /// Minimizer of the piece restricted to its interval.
    pub fn argmin(&self) -> f64 {
        let unclamped = if self.mean_coef > 0.0 {
            if self.log_mean_coef < 0.0 {
                (-self.log_mean_coef / self.mean_coef).ln()
            } else {
                f64::NEG_INFINITY
            }
        } else if self.log_mean_coef < 0.0 {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        };
        unclamped.max(self.min_log_mean).min(self.max_log_mean)
    }

    pub fn contains(&self, log_mean: f64) -> bool {
        self.min_log_mean <= log_mean && log_mean <= self.max_log_mean
    }

    fn distance_to(&self, log_mean: f64) -> f64 {
        if log_mean < self.min_log_mean {
            self.min_log_mean - log_mean
        } else if log_mean > self.max_log_mean {
            log_mean - self.max_log_mean
        } else {
            0.0
        }
    }

    /// True when `next` extends this piece with the same function and provenance.
    fn continues_into(&self, next: &Piece) -> bool {
        if self.max_log_mean != next.min_log_mean || self.feasible != next.feasible {
            return false;
        }
        if !self.feasible {
            return true;
        }
        self.mean_coef == next.mean_coef
            && self.log_mean_coef == next.log_mean_coef
            && self.constant == next.constant
            && self.prev_seg_end == next.prev_seg_end
            && self.prev_log_mean == next.prev_log_mean
    }
}

/// Outcome of minimizing a cost function, or of locating a mean in it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimizeResult {
    pub cost: f64,
    pub log_mean: f64,
    pub prev_seg_end: isize,
    pub prev_log_mean: PrevLogMean,
}

impl MinimizeResult {
    /// Segment mean on the count scale.
    pub fn mean(&self) -> f64 {
        self.log_mean.exp()
    }
}

/// Ordered list of pieces tiling the log-mean domain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PiecewiseCost {
    pieces: Vec<Piece>,
}

impl PiecewiseCost {
    /// Cost of the first observation over the whole domain.
    pub fn initial(count: u32, domain: LogMeanDomain) -> Self {
        Self {
            pieces: vec![Piece::poisson(count, domain, NO_PREDECESSOR)],
        }
    }

    /// `+inf` over the whole domain.
    pub fn infeasible(domain: LogMeanDomain) -> Self {
        Self {
            pieces: vec![Piece::infeasible(
                domain.min_log_mean,
                domain.max_log_mean,
            )],
        }
    }

    /// Build from ordered pieces, dropping empty intervals and merging
    /// neighbours that carry the same function.
    pub fn from_pieces(pieces: impl IntoIterator<Item = Piece>) -> Self {
        let mut merged: Vec<Piece> = Vec::new();
        for piece in pieces {
            if !(piece.min_log_mean < piece.max_log_mean) {
                continue;
            }
            match merged.last_mut() {
                Some(last) if last.continues_into(&piece) => {
                    last.max_log_mean = piece.max_log_mean;
                }
                _ => merged.push(piece),
            }
        }
        Self { pieces: merged }
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// True when at least one piece is feasible.
    pub fn is_feasible(&self) -> bool {
        self.pieces.iter().any(|p| p.feasible)
    }

    /// Value at `log_mean`; on a shared boundary the smaller side wins.
    pub fn cost_at(&self, log_mean: f64) -> f64 {
        self.pieces
            .iter()
            .filter(|p| p.contains(log_mean))
            .map(|p| p.cost_at(log_mean))
            .fold(f64::INFINITY, f64::min)
    }

    /// Global minimum over the feasible pieces.
    ///
    /// Returns `None` when every piece is infeasible. Ties keep the piece with
    /// the smallest log-mean.
    pub fn minimize(&self) -> Option<MinimizeResult> {
        let mut best: Option<MinimizeResult> = None;
        for piece in self.pieces.iter().filter(|p| p.feasible) {
            let log_mean = piece.argmin();
            let cost = piece.cost_at(log_mean);
            if best.map_or(true, |b| cost < b.cost) {
                best = Some(MinimizeResult {
                    cost,
                    log_mean,
                    prev_seg_end: piece.prev_seg_end,
                    prev_log_mean: piece.prev_log_mean,
                });
            }
        }
        best
    }

    /// Locate the feasible piece holding `log_mean` and report its provenance.
    ///
    /// Rounding can leave a propagated mean a hair outside every feasible
    /// piece; the nearest feasible piece is used then. Returns `None` only when
    /// the function has no feasible piece.
    pub fn find_mean(&self, log_mean: f64) -> Option<MinimizeResult> {
        let piece = self
            .pieces
            .iter()
            .find(|p| p.feasible && p.contains(log_mean))
            .or_else(|| {
                self.pieces
                    .iter()
                    .filter(|p| p.feasible)
                    .min_by(|a, b| a.distance_to(log_mean).total_cmp(&b.distance_to(log_mean)))
            })?;

        Some(MinimizeResult {
            cost: piece.cost_at(log_mean),
            log_mean,
            prev_seg_end: piece.prev_seg_end,
            prev_log_mean: piece.prev_log_mean,
        })
    }

    /// Charge a changepoint and record where the previous segment ended.
    ///
    /// The function is on the average-cost scale of `cum_weight`, so the
    /// penalty is divided by it.
    pub fn add_penalty(&mut self, penalty: f64, cum_weight: f64, prev_seg_end: isize) {
        let increment = penalty / cum_weight;
        for piece in &mut self.pieces {
            piece.prev_seg_end = prev_seg_end;
            if piece.feasible {
                piece.constant += increment;
            }
        }
    }

    /// Fold one weighted observation into the average cost.
    ///
    /// Before the call the coefficients describe the cost divided by
    /// `cum_weight_before`; afterwards they describe the cost including
    /// `weight * (exp(m) - count * m)`, divided by `cum_weight_after`.
    pub fn adjust_weights(
        &mut self,
        cum_weight_before: f64,
        cum_weight_after: f64,
        weight: f64,
        count: u32,
    ) {
        let count = f64::from(count);
        for piece in self.pieces.iter_mut().filter(|p| p.feasible) {
            piece.mean_coef = (piece.mean_coef * cum_weight_before + weight) / cum_weight_after;
            piece.log_mean_coef =
                (piece.log_mean_coef * cum_weight_before - weight * count) / cum_weight_after;
            piece.constant = piece.constant * cum_weight_before / cum_weight_after;
        }
    }
}
