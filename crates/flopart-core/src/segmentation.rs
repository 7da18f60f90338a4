//! Labeled Poisson segmentation: entry points and result types.

use crate::backtrack::{decode, DecodedSegment};
use crate::driver::{forward_pass, FlopartOptions, StepObserver};
use crate::error::Result;
use crate::labels::Label;
use crate::piecewise::{PiecewiseCost, RunState};

/// Sentinel written to unused `end_vec` slots.
pub const END_SENTINEL: i32 = -2;

/// Role of a segment in the fitted peak model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentStatus {
    /// Reached by an upward change.
    Peak,
    Background,
}

impl From<RunState> for SegmentStatus {
    fn from(state: RunState) -> Self {
        match state {
            RunState::Up => SegmentStatus::Peak,
            RunState::Down => SegmentStatus::Background,
        }
    }
}

/// A segment in data order; `start` and `end` are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
    pub mean: f64,
    pub status: SegmentStatus,
}

impl Segment {
    /// Number of data points covered.
    pub fn width(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Result of a segmentation run.
#[derive(Debug, Clone, PartialEq)]
pub struct FlopartResult {
    /// Minimum of the up cost function at each index (average-cost scale,
    /// `+inf` where the state is infeasible).
    pub up_cost: Vec<f64>,
    pub down_cost: Vec<f64>,
    /// Piece count of the up cost function at each index.
    pub up_intervals: Vec<usize>,
    pub down_intervals: Vec<usize>,
    /// Segments in backward order, last segment first.
    pub decoded: Vec<DecodedSegment>,
    /// Optimal cost divided by `total_weight`.
    pub best_cost: f64,
    pub total_weight: f64,
}

impl FlopartResult {
    pub fn data_count(&self) -> usize {
        self.up_cost.len()
    }

    /// Penalized cost on the scale of the weighted data.
    pub fn total_cost(&self) -> f64 {
        self.best_cost * self.total_weight
    }

    /// Previous-segment ends in decoded order, padded with [`END_SENTINEL`].
    pub fn end_vec(&self) -> Vec<i32> {
        let mut out = vec![END_SENTINEL; self.data_count()];
        for (slot, segment) in out.iter_mut().zip(&self.decoded) {
            *slot = segment.prev_seg_end as i32;
        }
        out
    }

    /// Segment means in decoded order, padded with `+inf`.
    pub fn mean_vec(&self) -> Vec<f64> {
        let mut out = vec![f64::INFINITY; self.data_count()];
        for (slot, segment) in out.iter_mut().zip(&self.decoded) {
            *slot = segment.mean;
        }
        out
    }

    /// Column-major `data_count x 2` matrix: up costs, then down costs.
    pub fn cost_matrix(&self) -> Vec<f64> {
        self.up_cost
            .iter()
            .chain(&self.down_cost)
            .copied()
            .collect()
    }

    /// Column-major `data_count x 2` matrix of piece counts.
    pub fn intervals_matrix(&self) -> Vec<i32> {
        self.up_intervals
            .iter()
            .chain(&self.down_intervals)
            .map(|&n| n as i32)
            .collect()
    }

    pub fn max_intervals(&self) -> usize {
        self.up_intervals
            .iter()
            .chain(&self.down_intervals)
            .copied()
            .max()
            .unwrap_or(0)
    }

    /// Segments in data order.
    pub fn segments(&self) -> Vec<Segment> {
        let last = self.data_count().saturating_sub(1);
        let mut segments: Vec<Segment> = self
            .decoded
            .iter()
            .enumerate()
            .map(|(k, segment)| {
                let end = if k == 0 {
                    last
                } else {
                    self.decoded[k - 1].prev_seg_end as usize
                };
                Segment {
                    start: (segment.prev_seg_end + 1) as usize,
                    end,
                    mean: segment.mean,
                    status: segment.state.into(),
                }
            })
            .collect();
        segments.reverse();
        segments
    }

    pub fn peaks(&self) -> Vec<Segment> {
        self.segments()
            .into_iter()
            .filter(|s| s.status == SegmentStatus::Peak)
            .collect()
    }

    /// First index of every segment but the first, ascending.
    pub fn changepoints(&self) -> Vec<usize> {
        let mut changepoints: Vec<usize> = self
            .decoded
            .iter()
            .filter(|s| s.prev_seg_end >= 0)
            .map(|s| (s.prev_seg_end + 1) as usize)
            .collect();
        changepoints.reverse();
        changepoints
    }

    /// Fitted mean at every data index.
    pub fn fitted_means(&self) -> Vec<f64> {
        let mut fitted = Vec::with_capacity(self.data_count());
        for segment in self.segments() {
            fitted.extend(std::iter::repeat(segment.mean).take(segment.width()));
        }
        fitted
    }
}

/// Optimal labeled segmentation of weighted counts.
pub fn flopart(
    counts: &[u32],
    weights: &[f64],
    labels: &[Label],
    options: &FlopartOptions,
) -> Result<FlopartResult> {
    run(counts, weights, labels, options, None)
}

/// [`flopart`] reporting every forward step to `observer`.
pub fn flopart_with_observer(
    counts: &[u32],
    weights: &[f64],
    labels: &[Label],
    options: &FlopartOptions,
    observer: StepObserver<'_>,
) -> Result<FlopartResult> {
    run(counts, weights, labels, options, Some(observer))
}

/// [`flopart`] with unit weights.
pub fn flopart_unweighted(
    counts: &[u32],
    labels: &[Label],
    options: &FlopartOptions,
) -> Result<FlopartResult> {
    let weights = vec![1.0; counts.len()];
    flopart(counts, &weights, labels, options)
}

fn run(
    counts: &[u32],
    weights: &[f64],
    labels: &[Label],
    options: &FlopartOptions,
    observer: Option<StepObserver<'_>>,
) -> Result<FlopartResult> {
    let pass = forward_pass(counts, weights, labels, options, observer)?;
    let decoding = decode(&pass)?;

    let minimum = |f: &PiecewiseCost| f.minimize().map_or(f64::INFINITY, |m| m.cost);
    Ok(FlopartResult {
        up_cost: pass.up.iter().map(minimum).collect(),
        down_cost: pass.down.iter().map(minimum).collect(),
        up_intervals: pass.up.iter().map(|f| f.len()).collect(),
        down_intervals: pass.down.iter().map(|f| f.len()).collect(),
        decoded: decoding.segments,
        best_cost: decoding.best_cost,
        total_weight: pass.total_weight,
    })
}
