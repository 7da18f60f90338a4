//! Forward pass of the labeled up/down functional-pruning recursion.
//!
//! At every data index two cost functions of the last segment's log-mean are
//! kept: the best cost when that segment was reached by an upward change
//! ("up") and by a downward change ("down"). Labels decide per index whether a
//! state may be entered, must be carried over unchanged, or is forbidden.

use tracing::{debug, trace};

use crate::error::{FlopartError, Result};
use crate::labels::{
    down_transition, up_transition, validate_labels, Label, LabelContext, LabelCursor, Transition,
};
use crate::piecewise::{LogMeanDomain, PiecewiseCost, RunState};
use crate::roots::RootSolver;

/// Parameters of a segmentation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlopartOptions {
    /// Cost charged per changepoint.
    pub penalty: f64,
    /// Relative bracket width at which crossing searches stop.
    pub root_tolerance: f64,
    /// Iteration cap for crossing searches.
    pub max_root_iterations: usize,
}

impl FlopartOptions {
    pub fn new(penalty: f64) -> Self {
        let solver = RootSolver::default();
        Self {
            penalty,
            root_tolerance: solver.tolerance,
            max_root_iterations: solver.max_iterations,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.penalty.is_finite() || self.penalty < 0.0 {
            return Err(FlopartError::invalid_parameter(
                "penalty",
                self.penalty,
                "must be finite and non-negative",
            ));
        }
        if !self.root_tolerance.is_finite() || self.root_tolerance <= 0.0 {
            return Err(FlopartError::invalid_parameter(
                "root_tolerance",
                self.root_tolerance,
                "must be finite and positive",
            ));
        }
        if self.max_root_iterations == 0 {
            return Err(FlopartError::invalid_parameter(
                "max_root_iterations",
                self.max_root_iterations,
                "must be at least 1",
            ));
        }
        Ok(())
    }

    pub(crate) fn solver(&self) -> RootSolver {
        RootSolver {
            tolerance: self.root_tolerance,
            max_iterations: self.max_root_iterations,
        }
    }
}

/// What happened at one data index of the forward pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepTrace {
    pub index: usize,
    pub label: LabelContext,
    pub up: Transition,
    pub down: Transition,
    pub up_pieces: usize,
    pub down_pieces: usize,
    /// Total weight of observations `0..=index`.
    pub cum_weight: f64,
}

/// Callback receiving a [`StepTrace`] after every data index.
pub type StepObserver<'a> = &'a mut dyn FnMut(&StepTrace);

/// Stored up/down cost functions for every data index.
#[derive(Debug, Clone)]
pub struct ForwardPass {
    pub domain: LogMeanDomain,
    pub up: Vec<PiecewiseCost>,
    pub down: Vec<PiecewiseCost>,
    pub total_weight: f64,
}

impl ForwardPass {
    pub fn len(&self) -> usize {
        self.up.len()
    }

    pub fn is_empty(&self) -> bool {
        self.up.is_empty()
    }

    pub fn cost(&self, state: RunState, index: usize) -> &PiecewiseCost {
        match state {
            RunState::Up => &self.up[index],
            RunState::Down => &self.down[index],
        }
    }
}

/// Reject inputs the recursion cannot run on.
pub fn validate_inputs(
    counts: &[u32],
    weights: &[f64],
    labels: &[Label],
    options: &FlopartOptions,
) -> Result<()> {
    if counts.is_empty() {
        return Err(FlopartError::InvalidInput(
            "counts must contain at least one value".into(),
        ));
    }
    if counts.len() != weights.len() {
        return Err(FlopartError::InvalidInput(format!(
            "counts and weights must have the same length ({} vs {})",
            counts.len(),
            weights.len()
        )));
    }
    if let Some((index, &weight)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| !(w.is_finite() && **w > 0.0))
    {
        return Err(FlopartError::invalid_parameter(
            &format!("weights[{index}]"),
            weight,
            "must be finite and positive",
        ));
    }
    options.validate()?;
    validate_labels(labels, counts.len())
}

/// Run the recursion over all data points.
pub fn forward_pass(
    counts: &[u32],
    weights: &[f64],
    labels: &[Label],
    options: &FlopartOptions,
    mut observer: Option<StepObserver<'_>>,
) -> Result<ForwardPass> {
    validate_inputs(counts, weights, labels, options)?;
    let domain = LogMeanDomain::from_counts(counts)?;
    let solver = options.solver();
    debug!(
        data_count = counts.len(),
        label_count = labels.len(),
        min_log_mean = domain.min_log_mean,
        max_log_mean = domain.max_log_mean,
        penalty = options.penalty,
        "starting forward pass"
    );

    let n = counts.len();
    let mut up: Vec<PiecewiseCost> = Vec::with_capacity(n);
    let mut down: Vec<PiecewiseCost> = Vec::with_capacity(n);
    let mut cursor = LabelCursor::new(labels);
    let mut cum_weight = 0.0;

    for (index, (&count, &weight)) in counts.iter().zip(weights).enumerate() {
        let label = cursor.context_at(index);
        let cum_weight_before = cum_weight;
        cum_weight += weight;

        let (up_rule, down_rule, mut up_cost, mut down_cost) = if index == 0 {
            (
                Transition::Initial,
                Transition::Initial,
                PiecewiseCost::initial(count, domain),
                PiecewiseCost::initial(count, domain),
            )
        } else {
            let (up_prev, down_prev) = (&up[index - 1], &down[index - 1]);
            // A change into a state restricts the opposite state's previous cost
            // to means on the right side of the new one.
            let advance = |rule: Transition,
                           same_prev: &PiecewiseCost,
                           other_prev: &PiecewiseCost,
                           restrict: fn(&PiecewiseCost, &RootSolver) -> PiecewiseCost| {
                match rule {
                    Transition::Initial | Transition::Carry => same_prev.clone(),
                    Transition::Infeasible => PiecewiseCost::infeasible(domain),
                    Transition::Change => {
                        let mut change = restrict(other_prev, &solver);
                        change.add_penalty(options.penalty, cum_weight_before, index as isize - 1);
                        same_prev.min_envelope(&change, &solver)
                    }
                }
            };

            let up_rule = up_transition(label);
            let down_rule = down_transition(label);
            let up_cost = advance(up_rule, up_prev, down_prev, PiecewiseCost::min_less);
            let down_cost = advance(down_rule, down_prev, up_prev, PiecewiseCost::min_more);
            (up_rule, down_rule, up_cost, down_cost)
        };

        up_cost.adjust_weights(cum_weight_before, cum_weight, weight, count);
        down_cost.adjust_weights(cum_weight_before, cum_weight, weight, count);

        if !up_cost.is_feasible() && !down_cost.is_feasible() {
            return Err(FlopartError::InfeasibleLabeling { index, state: None });
        }

        let step = StepTrace {
            index,
            label,
            up: up_rule,
            down: down_rule,
            up_pieces: up_cost.len(),
            down_pieces: down_cost.len(),
            cum_weight,
        };
        trace!(
            index,
            up_pieces = step.up_pieces,
            down_pieces = step.down_pieces,
            "step"
        );
        if let Some(observe) = observer.as_deref_mut() {
            observe(&step);
        }

        up.push(up_cost);
        down.push(down_cost);
    }

    Ok(ForwardPass {
        domain,
        up,
        down,
        total_weight: cum_weight,
    })
}
