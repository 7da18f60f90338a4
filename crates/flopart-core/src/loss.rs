//! Poisson loss of a fitted segmentation.

use statrs::function::factorial::ln_factorial;

use crate::error::{FlopartError, Result};
use crate::segmentation::{FlopartResult, SegmentStatus};

/// Poisson negative log-likelihood of `count` at `mean`, without the `ln(count!)` term.
///
/// `0 * ln(0)` is taken as 0, so a zero mean is free for a zero count.
pub fn poisson_loss(count: u32, mean: f64) -> f64 {
    if count == 0 {
        mean
    } else {
        mean - f64::from(count) * mean.ln()
    }
}

/// Weighted Poisson loss of a run of counts sharing one mean.
pub fn weighted_poisson_loss(counts: &[u32], weights: &[f64], mean: f64) -> f64 {
    counts
        .iter()
        .zip(weights)
        .map(|(&y, &w)| w * poisson_loss(y, mean))
        .sum()
}

/// Weighted mean of a run of counts, the unconstrained optimum of its loss.
pub fn weighted_mean(counts: &[u32], weights: &[f64]) -> f64 {
    let (total, weight) = counts
        .iter()
        .zip(weights)
        .fold((0.0, 0.0), |(total, weight), (&y, &w)| {
            (total + w * f64::from(y), weight + w)
        });
    total / weight
}

/// Goodness of fit of a segmentation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentationLoss {
    /// Weighted Poisson loss without the `ln(y!)` terms.
    pub total_loss: f64,
    /// `total_loss + penalty * changepoints`.
    pub penalized_cost: f64,
    /// Full weighted Poisson log-likelihood.
    pub log_likelihood: f64,
    pub n_segments: usize,
    pub n_peaks: usize,
    pub n_changepoints: usize,
}

impl FlopartResult {
    /// Evaluate the decoded segmentation against the data it was fitted to.
    pub fn summarize(&self, counts: &[u32], weights: &[f64], penalty: f64) -> Result<SegmentationLoss> {
        if counts.len() != self.data_count() || weights.len() != counts.len() {
            return Err(FlopartError::InvalidInput(format!(
                "expected {} counts and weights, got {} and {}",
                self.data_count(),
                counts.len(),
                weights.len()
            )));
        }

        let segments = self.segments();
        let total_loss: f64 = segments
            .iter()
            .map(|s| {
                let range = s.start..=s.end;
                weighted_poisson_loss(&counts[range.clone()], &weights[range], s.mean)
            })
            .sum();
        let log_factorials: f64 = counts
            .iter()
            .zip(weights)
            .map(|(&y, &w)| w * ln_factorial(u64::from(y)))
            .sum();

        let n_changepoints = segments.len().saturating_sub(1);
        Ok(SegmentationLoss {
            total_loss,
            penalized_cost: total_loss + penalty * n_changepoints as f64,
            log_likelihood: -total_loss - log_factorials,
            n_segments: segments.len(),
            n_peaks: segments
                .iter()
                .filter(|s| s.status == SegmentStatus::Peak)
                .count(),
            n_changepoints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::FlopartOptions;
    use crate::segmentation::flopart;
    use approx::assert_relative_eq;

    #[test]
    fn test_poisson_loss() {
        assert_eq!(poisson_loss(0, 2.5), 2.5);
        assert_eq!(poisson_loss(0, 0.0), 0.0);
        assert_relative_eq!(poisson_loss(4, 4.0), 4.0 - 4.0 * 4f64.ln());
        assert_eq!(poisson_loss(3, 0.0), f64::INFINITY);
    }

    #[test]
    fn test_weighted_mean_minimizes_loss() {
        let counts = [2, 7, 4];
        let weights = [1.0, 0.5, 2.0];
        let mean = weighted_mean(&counts, &weights);
        assert_relative_eq!(mean, (2.0 + 3.5 + 8.0) / 3.5);

        let at_mean = weighted_poisson_loss(&counts, &weights, mean);
        for shift in [-0.1, 0.1] {
            assert!(weighted_poisson_loss(&counts, &weights, mean + shift) > at_mean);
        }
    }

    #[test]
    fn test_summary_agrees_with_total_cost() {
        let counts = [0, 1, 0, 6, 9, 7, 8, 2, 1, 0];
        let weights = [1.0, 2.0, 1.0, 1.0, 0.5, 1.0, 1.0, 2.0, 1.0, 1.0];
        let penalty = 2.0;
        let result = flopart(&counts, &weights, &[], &FlopartOptions::new(penalty)).unwrap();
        let summary = result.summarize(&counts, &weights, penalty).unwrap();

        assert_relative_eq!(summary.penalized_cost, result.total_cost(), epsilon = 1e-8);
        assert_eq!(summary.n_segments, result.segments().len());
        assert_eq!(summary.n_changepoints, result.changepoints().len());
        assert!(summary.n_peaks >= 1);
        assert!(summary.log_likelihood < 0.0);
    }

    #[test]
    fn test_summary_rejects_mismatched_data() {
        let counts = [1, 5, 1];
        let result = flopart(&counts, &[1.0; 3], &[], &FlopartOptions::new(1.0)).unwrap();
        assert!(matches!(
            result.summarize(&counts[..2], &[1.0; 2], 1.0),
            Err(FlopartError::InvalidInput(_))
        ));
    }
}
