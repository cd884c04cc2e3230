//! Point estimates and confidence intervals across replications

use serde::{Deserialize, Serialize};

/// Two-sided 95% confidence interval around a sample mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    /// The zero-width interval reported for a single replication.
    pub fn degenerate(point: f64) -> Self {
        Self {
            lower: point,
            upper: point,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    pub fn half_width(&self) -> f64 {
        (self.upper - self.lower) / 2.0
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation with the n - 1 correction; zero below two
/// samples.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let squared: f64 = values.iter().map(|x| (x - m) * (x - m)).sum();
    (squared / (values.len() - 1) as f64).sqrt()
}

/// Upper 0.975 quantile of Student's t distribution.
///
/// Tabulated through 30 degrees of freedom, the standard breakpoints after
/// that, and the normal limit beyond 120.
pub fn t_quantile_975(df: usize) -> f64 {
    const TABLE: [f64; 30] = [
        12.706, 4.303, 3.182, 2.776, 2.571, 2.447, 2.365, 2.306, 2.262, 2.228, 2.201, 2.179,
        2.160, 2.145, 2.131, 2.120, 2.110, 2.101, 2.093, 2.086, 2.080, 2.074, 2.069, 2.064,
        2.060, 2.056, 2.052, 2.048, 2.045, 2.042,
    ];
    match df {
        0 => f64::INFINITY,
        1..=30 => TABLE[df - 1],
        31..=40 => 2.021,
        41..=60 => 2.000,
        61..=120 => 1.980,
        _ => 1.960,
    }
}

/// Sample mean and its 95% confidence interval,
/// `mean ± t_{0.975, n-1} * s / sqrt(n)`. A single observation yields the
/// degenerate interval; an empty slice yields zeros.
pub fn mean_and_ci(values: &[f64]) -> (f64, ConfidenceInterval) {
    if values.is_empty() {
        return (0.0, ConfidenceInterval::degenerate(0.0));
    }
    let point = mean(values);
    if values.len() == 1 {
        return (point, ConfidenceInterval::degenerate(point));
    }
    let margin =
        t_quantile_975(values.len() - 1) * sample_std_dev(values) / (values.len() as f64).sqrt();
    (
        point,
        ConfidenceInterval {
            lower: point - margin,
            upper: point + margin,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_std_dev_basics() {
        let values = [1.0, 2.0, 3.0];
        assert_eq!(mean(&values), 2.0);
        assert!((sample_std_dev(&values) - 1.0).abs() < 1e-12);
        assert_eq!(sample_std_dev(&[5.0]), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn quantile_table_matches_reference_points() {
        assert_eq!(t_quantile_975(1), 12.706);
        assert_eq!(t_quantile_975(9), 2.262);
        assert_eq!(t_quantile_975(30), 2.042);
        assert_eq!(t_quantile_975(50), 2.000);
        assert_eq!(t_quantile_975(1000), 1.960);
    }

    #[test]
    fn ci_matches_a_hand_computed_case() {
        // n = 3, mean 2, s = 1: margin = 4.303 / sqrt(3).
        let (point, ci) = mean_and_ci(&[1.0, 2.0, 3.0]);
        let margin = 4.303 / 3.0_f64.sqrt();
        assert_eq!(point, 2.0);
        assert!((ci.lower - (2.0 - margin)).abs() < 1e-9);
        assert!((ci.upper - (2.0 + margin)).abs() < 1e-9);
        assert!(ci.contains(point));
    }

    #[test]
    fn single_observation_yields_a_degenerate_interval() {
        let (point, ci) = mean_and_ci(&[7.5]);
        assert_eq!(point, 7.5);
        assert_eq!(ci, ConfidenceInterval::degenerate(7.5));
        assert_eq!(ci.half_width(), 0.0);
    }

    #[test]
    fn identical_observations_collapse_the_interval() {
        let (point, ci) = mean_and_ci(&[4.0, 4.0, 4.0, 4.0]);
        assert_eq!(point, 4.0);
        assert_eq!(ci.lower, 4.0);
        assert_eq!(ci.upper, 4.0);
    }
}
