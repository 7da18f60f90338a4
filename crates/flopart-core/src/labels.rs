//! Interval labels and the up/down transition rules they impose.
//!
//! A `PeakStart` region must contain exactly one upward change, a `PeakEnd`
//! region exactly one downward change, and a `NoPeak` region must stay in the
//! down state with no change after its first point.

use crate::error::{FlopartError, Result};

/// Kind of a labeled region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    NoPeak,
    PeakStart,
    PeakEnd,
}

impl LabelKind {
    /// Integer code used at the C boundary.
    pub fn code(self) -> i32 {
        match self {
            LabelKind::NoPeak => 0,
            LabelKind::PeakStart => 1,
            LabelKind::PeakEnd => -1,
        }
    }
}

impl TryFrom<i32> for LabelKind {
    type Error = FlopartError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            0 => Ok(LabelKind::NoPeak),
            1 => Ok(LabelKind::PeakStart),
            -1 => Ok(LabelKind::PeakEnd),
            other => Err(FlopartError::InvalidInput(format!(
                "unknown label type code {other}; expected 1 (peakStart), 0 (noPeak) or -1 (peakEnd)"
            ))),
        }
    }
}

/// Labeled region `[start, end]` (inclusive, zero-based data indices).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label {
    pub start: usize,
    pub end: usize,
    pub kind: LabelKind,
}

impl Label {
    pub fn new(start: usize, end: usize, kind: LabelKind) -> Self {
        Self { start, end, kind }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index <= self.end
    }
}

/// Check that labels are well formed, sorted and disjoint.
pub fn validate_labels(labels: &[Label], data_count: usize) -> Result<()> {
    for (index, label) in labels.iter().enumerate() {
        if label.start > label.end {
            return Err(FlopartError::InvalidLabel {
                index,
                reason: format!("start {} is after end {}", label.start, label.end),
            });
        }
        if label.end >= data_count {
            return Err(FlopartError::InvalidLabel {
                index,
                reason: format!(
                    "end {} is outside the data (data count {})",
                    label.end, data_count
                ),
            });
        }
        if index > 0 && label.start <= labels[index - 1].end {
            return Err(FlopartError::InvalidLabel {
                index,
                reason: format!(
                    "starts at {} but the previous label ends at {}; labels must be sorted and disjoint",
                    label.start,
                    labels[index - 1].end
                ),
            });
        }
    }
    Ok(())
}

/// Label state of one data index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LabelContext {
    /// `None` outside every label.
    pub kind: Option<LabelKind>,
    /// First index of the current label.
    pub at_beginning: bool,
    /// Last index of the current label.
    pub at_end: bool,
}

/// Single forward pass over sorted labels, in step with the data index.
#[derive(Debug, Clone)]
pub struct LabelCursor<'a> {
    labels: &'a [Label],
    next: usize,
}

impl<'a> LabelCursor<'a> {
    pub fn new(labels: &'a [Label]) -> Self {
        Self { labels, next: 0 }
    }

    /// Context of `index`. Indices must be visited in increasing order.
    pub fn context_at(&mut self, index: usize) -> LabelContext {
        let Some(label) = self.labels.get(self.next) else {
            return LabelContext::default();
        };
        if !label.contains(index) {
            return LabelContext::default();
        }

        let at_end = index == label.end;
        if at_end {
            self.next += 1;
        }
        LabelContext {
            kind: Some(label.kind),
            at_beginning: index == label.start,
            at_end,
        }
    }
}

/// How one of the two cost functions is produced at a data index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// First data point: single-observation cost.
    Initial,
    /// Previous function, unchanged: no change into this state here.
    Carry,
    /// This state is forbidden here.
    Infeasible,
    /// Continue the current run or pay the penalty to switch into it.
    Change,
}

/// Rule for the up cost at a non-initial index.
pub fn up_transition(context: LabelContext) -> Transition {
    use LabelKind::{NoPeak, PeakEnd, PeakStart};

    match (context.kind, context.at_beginning, context.at_end) {
        (None, _, _) => Transition::Change,
        (Some(NoPeak), _, _) => Transition::Infeasible,
        (Some(PeakStart), true, _) => Transition::Infeasible,
        (Some(PeakStart), false, _) => Transition::Change,
        (Some(PeakEnd), _, true) => Transition::Infeasible,
        (Some(PeakEnd), true, false) => Transition::Change,
        (Some(PeakEnd), false, false) => Transition::Carry,
    }
}

/// Rule for the down cost at a non-initial index.
pub fn down_transition(context: LabelContext) -> Transition {
    use LabelKind::{NoPeak, PeakEnd, PeakStart};

    match (context.kind, context.at_beginning, context.at_end) {
        (None, _, _) => Transition::Change,
        (Some(NoPeak), true, _) => Transition::Change,
        (Some(NoPeak), false, _) => Transition::Carry,
        (Some(PeakStart), _, true) => Transition::Infeasible,
        (Some(PeakStart), true, false) => Transition::Change,
        (Some(PeakStart), false, false) => Transition::Carry,
        (Some(PeakEnd), true, _) => Transition::Infeasible,
        (Some(PeakEnd), false, _) => Transition::Change,
    }
}
