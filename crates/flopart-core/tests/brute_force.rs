//! Agreement with an exhaustive O(n^2) optimal partitioning reference.

use approx::assert_relative_eq;
use flopart_core::{
    flopart, flopart_unweighted, poisson_loss, weighted_mean, weighted_poisson_loss,
    FlopartOptions,
};
use statrs::distribution::{Discrete, Poisson};
use statrs::function::factorial::ln_factorial;

/// Optimal unconstrained segmentation: penalized cost and segment means.
fn brute_force(counts: &[u32], weights: &[f64], penalty: f64) -> (f64, Vec<f64>) {
    let n = counts.len();
    let mut best = vec![f64::INFINITY; n + 1];
    let mut last_start = vec![0usize; n + 1];
    best[0] = -penalty;

    for end in 1..=n {
        for start in 0..end {
            let mean = weighted_mean(&counts[start..end], &weights[start..end]);
            let cost = best[start]
                + penalty
                + weighted_poisson_loss(&counts[start..end], &weights[start..end], mean);
            if cost < best[end] {
                best[end] = cost;
                last_start[end] = start;
            }
        }
    }

    let mut means = Vec::new();
    let mut end = n;
    while end > 0 {
        let start = last_start[end];
        means.push(weighted_mean(&counts[start..end], &weights[start..end]));
        end = start;
    }
    means.reverse();
    (best[n], means)
}

/// True when consecutive changes alternate between up and down.
fn alternates(means: &[f64]) -> bool {
    means
        .windows(3)
        .all(|w| (w[1] - w[0]).signum() != (w[2] - w[1]).signum())
}

fn lcg_counts(seed: u64, n: usize, max: u32) -> Vec<u32> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            ((state >> 33) % u64::from(max + 1)) as u32
        })
        .collect()
}

#[test]
fn test_single_peak_matches_brute_force() {
    let counts = [1, 1, 1, 10, 10, 10, 1, 1, 1];
    let weights = [1.0; 9];
    let (expected, means) = brute_force(&counts, &weights, 1.0);
    assert_eq!(means.len(), 3);

    let result = flopart_unweighted(&counts, &[], &FlopartOptions::new(1.0)).unwrap();
    assert_relative_eq!(result.total_cost(), expected, epsilon = 1e-8);
    assert_eq!(result.changepoints(), vec![3, 6]);
}

#[test]
fn test_two_peaks_match_brute_force() {
    let counts = [2, 3, 2, 15, 18, 16, 3, 2, 25, 27, 24, 2, 1];
    let weights = vec![1.0; counts.len()];
    let penalty = 5.0;
    let (expected, means) = brute_force(&counts, &weights, penalty);
    assert!(alternates(&means), "reference optimum must have up-down shape");

    let result = flopart(&counts, &weights, &[], &FlopartOptions::new(penalty)).unwrap();
    assert_relative_eq!(result.total_cost(), expected, epsilon = 1e-8);

    let segments = result.segments();
    assert_eq!(segments.len(), means.len());
    for (segment, mean) in segments.iter().zip(&means) {
        assert_relative_eq!(segment.mean, *mean, epsilon = 1e-6);
    }
    assert_eq!(result.peaks().len(), 2);
}

#[test]
fn test_weighted_peak_with_zeros_matches_brute_force() {
    let counts = [0, 1, 0, 9, 12, 10, 0, 1];
    let weights = [1.0, 2.0, 1.0, 1.0, 0.5, 2.0, 1.0, 1.0];
    let penalty = 3.0;
    let (expected, means) = brute_force(&counts, &weights, penalty);
    assert!(alternates(&means), "reference optimum must have up-down shape");

    let result = flopart(&counts, &weights, &[], &FlopartOptions::new(penalty)).unwrap();
    assert_relative_eq!(result.total_cost(), expected, epsilon = 1e-8);
}

#[test]
fn test_never_below_unconstrained_optimum() {
    for seed in 1..=12u64 {
        let counts = lcg_counts(seed, 30, 20);
        let weights = vec![1.0; counts.len()];
        for penalty in [0.5, 3.0, 10.0] {
            let (unconstrained, means) = brute_force(&counts, &weights, penalty);
            let result = flopart(&counts, &weights, &[], &FlopartOptions::new(penalty)).unwrap();
            let tolerance = 1e-7 * (1.0 + unconstrained.abs());

            assert!(
                result.total_cost() >= unconstrained - tolerance,
                "seed {seed}, penalty {penalty}: {} < {}",
                result.total_cost(),
                unconstrained
            );
            if alternates(&means) {
                assert_relative_eq!(result.total_cost(), unconstrained, epsilon = tolerance);
            }
        }
    }
}

#[test]
fn test_decoded_means_reproduce_cost() {
    for seed in 20..=25u64 {
        let counts = lcg_counts(seed, 40, 15);
        let weights: Vec<f64> = (0..counts.len()).map(|i| 0.5 + (i % 3) as f64).collect();
        let penalty = 4.0;
        let result = flopart(&counts, &weights, &[], &FlopartOptions::new(penalty)).unwrap();
        let summary = result.summarize(&counts, &weights, penalty).unwrap();
        assert_relative_eq!(
            summary.penalized_cost,
            result.total_cost(),
            epsilon = 1e-7 * (1.0 + result.total_cost().abs())
        );
    }
}

#[test]
fn test_poisson_loss_matches_statrs() {
    for &(count, mean) in &[(0u32, 0.5), (1, 1.0), (4, 2.5), (17, 20.0), (120, 95.5)] {
        let poisson = Poisson::new(mean).unwrap();
        let expected = -poisson.ln_pmf(u64::from(count)) - ln_factorial(u64::from(count));
        assert_relative_eq!(
            poisson_loss(count, mean),
            expected,
            epsilon = 1e-9,
            max_relative = 1e-12
        );
    }
}

#[test]
fn test_log_likelihood_matches_statrs() {
    let counts = [1, 1, 1, 10, 10, 10, 1, 1, 1];
    let weights = [1.0; 9];
    let result = flopart(&counts, &weights, &[], &FlopartOptions::new(1.0)).unwrap();
    let summary = result.summarize(&counts, &weights, 1.0).unwrap();

    let expected: f64 = counts
        .iter()
        .zip(result.fitted_means())
        .map(|(&y, mean)| Poisson::new(mean).unwrap().ln_pmf(u64::from(y)))
        .sum();
    assert_relative_eq!(summary.log_likelihood, expected, epsilon = 1e-8);
    assert_eq!(summary.n_peaks, 1);
}
