//! Decoding the optimal segmentation from the stored cost functions.

use tracing::debug;

use crate::driver::ForwardPass;
use crate::error::{FlopartError, Result};
use crate::piecewise::{MinimizeResult, RunState};

/// One segment as recovered by the decoder, last segment first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedSegment {
    /// Segment mean on the count scale.
    pub mean: f64,
    pub log_mean: f64,
    /// Last index of the preceding segment, negative for the first segment.
    pub prev_seg_end: isize,
    pub state: RunState,
}

/// Output of [`decode`].
#[derive(Debug, Clone, PartialEq)]
pub struct Decoding {
    /// Minimum of the final cost functions (average-cost scale).
    pub best_cost: f64,
    /// Segments in backward order: the segment ending at the last data point comes first.
    pub segments: Vec<DecodedSegment>,
}

/// Pick the better terminal state; up wins exact ties.
fn terminal(pass: &ForwardPass) -> Result<(RunState, MinimizeResult)> {
    let last = pass.len().checked_sub(1).ok_or_else(|| {
        FlopartError::InvalidInput("cannot decode an empty forward pass".into())
    })?;

    let up = pass.up[last].minimize();
    let down = pass.down[last].minimize();
    match (up, down) {
        (Some(u), Some(d)) if d.cost < u.cost => Ok((RunState::Down, d)),
        (Some(u), _) => Ok((RunState::Up, u)),
        (None, Some(d)) => Ok((RunState::Down, d)),
        (None, None) => Err(FlopartError::InfeasibleLabeling {
            index: last,
            state: None,
        }),
    }
}

/// Walk back from the best terminal state to the first data point.
///
/// Each step looks up, in the opposite state's function at the previous
/// segment end, the piece holding the previous mean: the current mean when the
/// boundary tied them, the recorded optimum otherwise.
pub fn decode(pass: &ForwardPass) -> Result<Decoding> {
    let (mut state, best) = terminal(pass)?;
    debug!(
        %state,
        best_cost = best.cost,
        total_cost = best.cost * pass.total_weight,
        "terminal state"
    );

    let mut segments = vec![DecodedSegment {
        mean: best.mean(),
        log_mean: best.log_mean,
        prev_seg_end: best.prev_seg_end,
        state,
    }];
    let mut current = best;

    while current.prev_seg_end >= 0 {
        let index = current.prev_seg_end as usize;
        state = state.opposite();
        let log_mean = current.prev_log_mean.resolve(current.log_mean);
        let found = pass
            .cost(state, index)
            .find_mean(log_mean)
            .ok_or(FlopartError::InfeasibleLabeling {
                index,
                state: Some(state),
            })?;
        debug_assert!(found.prev_seg_end < current.prev_seg_end);

        segments.push(DecodedSegment {
            mean: log_mean.exp(),
            log_mean,
            prev_seg_end: found.prev_seg_end,
            state,
        });
        current = found;
    }

    debug!(segments = segments.len(), "decoded segmentation");
    Ok(Decoding {
        best_cost: best.cost,
        segments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{forward_pass, FlopartOptions};
    use crate::piecewise::NO_PREDECESSOR;
    use approx::assert_relative_eq;

    fn decode_counts(counts: &[u32], penalty: f64) -> Decoding {
        let weights = vec![1.0; counts.len()];
        let pass = forward_pass(counts, &weights, &[], &FlopartOptions::new(penalty), None).unwrap();
        decode(&pass).unwrap()
    }

    #[test]
    fn test_decode_single_segment() {
        let decoding = decode_counts(&[3, 5, 4], 100.0);
        assert_eq!(decoding.segments.len(), 1);
        assert_eq!(decoding.segments[0].prev_seg_end, NO_PREDECESSOR);
        assert_relative_eq!(decoding.segments[0].mean, 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_decode_peak() {
        let decoding = decode_counts(&[1, 1, 1, 10, 10, 10, 1, 1, 1], 1.0);
        let ends: Vec<isize> = decoding.segments.iter().map(|s| s.prev_seg_end).collect();
        assert_eq!(ends, vec![5, 2, NO_PREDECESSOR]);

        let means: Vec<f64> = decoding.segments.iter().map(|s| s.mean).collect();
        assert_relative_eq!(means[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(means[1], 10.0, epsilon = 1e-9);
        assert_relative_eq!(means[2], 1.0, epsilon = 1e-9);

        let states: Vec<RunState> = decoding.segments.iter().map(|s| s.state).collect();
        assert_eq!(states, vec![RunState::Down, RunState::Up, RunState::Down]);
    }

    #[test]
    fn test_terminal_tie_prefers_up() {
        // A prohibitive penalty leaves both states with the single-segment function.
        let pass = forward_pass(&[0, 2], &[1.0, 1.0], &[], &FlopartOptions::new(1e9), None).unwrap();
        let (state, _) = terminal(&pass).unwrap();
        assert_eq!(state, RunState::Up);
    }
}
