//! Labeled optimal partitioning of Poisson count data.
//!
//! This crate fits piecewise-constant means to non-negative counts under a
//! Poisson loss and a per-changepoint penalty, with segments alternating
//! between upward and downward changes so that peaks have an up-down shape.
//! Interval labels (`NoPeak`, `PeakStart`, `PeakEnd`) restrict where changes
//! may occur. Costs are kept as piecewise functions of the segment log-mean
//! and pruned with pointwise minima (functional pruning).

pub mod backtrack;
pub mod driver;
pub mod envelope;
pub mod error;
pub mod labels;
pub mod loss;
pub mod piecewise;
pub mod roots;
pub mod segmentation;

// Re-exports for convenience
pub use backtrack::{decode, DecodedSegment, Decoding};
pub use driver::{
    forward_pass, validate_inputs, FlopartOptions, ForwardPass, StepObserver, StepTrace,
};
pub use error::{FlopartError, Result};
pub use labels::{
    down_transition, up_transition, validate_labels, Label, LabelContext, LabelCursor, LabelKind,
    Transition,
};
pub use loss::{poisson_loss, weighted_mean, weighted_poisson_loss, SegmentationLoss};
pub use piecewise::{
    LogMeanDomain, MinimizeResult, Piece, PiecewiseCost, PrevLogMean, RunState, NO_PREDECESSOR,
};
pub use roots::RootSolver;
pub use segmentation::{
    flopart, flopart_unweighted, flopart_with_observer, FlopartResult, Segment, SegmentStatus,
    END_SENTINEL,
};
