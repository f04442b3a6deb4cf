//! Statistical Features Computation

/// Statistical features for a signal
#[derive(Debug, Clone, Default)]
pub struct StatisticalFeatures {
    /// Mean value
    pub mean: f64,
    /// Standard deviation (population)
    pub std_dev: f64,
    /// Skewness (asymmetry)
    pub skewness: f64,
    /// Kurtosis (tailedness)
    pub kurtosis: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// Mean absolute change between consecutive samples
    pub rate_of_change: f64,
    /// Number of crossings of the mean
    pub zero_crossings: usize,
}

impl StatisticalFeatures {
    /// Compute statistical features from a slice of values
    pub fn compute(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;

        let mean = values.iter().sum::<f64>() / n;

        let min = values.iter().cloned().fold(f64::MAX, f64::min);
        let max = values.iter().cloned().fold(f64::MIN, f64::max);

        // Variance and higher moments
        let mut m2 = 0.0;
        let mut m3 = 0.0;
        let mut m4 = 0.0;

        for &v in values {
            let d = v - mean;
            m2 += d * d;
            m3 += d * d * d;
            m4 += d * d * d * d;
        }

        let variance = m2 / n;
        let std_dev = variance.sqrt();

        // Skewness: E[(X-μ)³] / σ³
        let skewness = if std_dev > 0.0 {
            (m3 / n) / (std_dev * std_dev * std_dev)
        } else {
            0.0
        };

        // Kurtosis: E[(X-μ)⁴] / σ⁴ - 3 (excess kurtosis)
        let kurtosis = if std_dev > 0.0 {
            (m4 / n) / (variance * variance) - 3.0
        } else {
            0.0
        };

        let rate_of_change = if values.len() >= 2 {
            let total_change: f64 = values.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
            total_change / (values.len() - 1) as f64
        } else {
            0.0
        };

        let zero_crossings = values
            .windows(2)
            .filter(|w| {
                let prev = w[0] - mean;
                let curr = w[1] - mean;
                prev.signum() != curr.signum() && prev != 0.0 && curr != 0.0
            })
            .count();

        Self {
            mean,
            std_dev,
            skewness,
            kurtosis,
            min,
            max,
            rate_of_change,
            zero_crossings,
        }
    }

    /// Absolute time derivatives |Δv / Δt| between consecutive samples.
    ///
    /// Steps with a non-positive time delta are skipped.
    pub fn abs_derivative(values: &[f64], times_secs: &[f64]) -> Vec<f64> {
        values
            .windows(2)
            .zip(times_secs.windows(2))
            .filter_map(|(v, t)| {
                let dt = t[1] - t[0];
                (dt > 0.0).then(|| ((v[1] - v[0]) / dt).abs())
            })
            .collect()
    }

    /// Fraction of samples satisfying `predicate`
    pub fn ratio<F>(values: &[f64], predicate: F) -> f64
    where
        F: Fn(f64) -> bool,
    {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().filter(|&&v| predicate(v)).count() as f64 / values.len() as f64
    }

    /// Number of times consecutive samples differ
    pub fn changes(values: &[f64]) -> usize {
        values.windows(2).filter(|w| w[0] != w[1]).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_computation() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let stats = StatisticalFeatures::compute(&values);
        assert!((stats.mean - 3.0).abs() < 0.001);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
    }

    #[test]
    fn test_std_dev_computation() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats = StatisticalFeatures::compute(&values);
        assert!((stats.std_dev - 2.0).abs() < 0.1);
    }

    #[test]
    fn test_zero_crossings() {
        // Values oscillating around mean of 5
        let values = vec![3.0, 7.0, 4.0, 8.0, 2.0, 6.0];
        let stats = StatisticalFeatures::compute(&values);
        assert!(stats.zero_crossings >= 2);
    }

    #[test]
    fn test_empty_values() {
        let stats = StatisticalFeatures::compute(&[]);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.rate_of_change, 0.0);
    }

    #[test]
    fn test_abs_derivative_skips_zero_dt() {
        let values = [0.0, 1.0, 3.0, 2.0];
        let times = [0.0, 0.5, 0.5, 1.0];
        let d = StatisticalFeatures::abs_derivative(&values, &times);
        assert_eq!(d, vec![2.0, 2.0]);
    }

    #[test]
    fn test_ratio_and_changes() {
        let gears = [1.0, 1.0, 2.0, 2.0, 3.0, 2.0];
        assert_eq!(StatisticalFeatures::changes(&gears), 3);
        assert!((StatisticalFeatures::ratio(&gears, |g| g >= 2.0) - 4.0 / 6.0).abs() < 1e-12);
        assert_eq!(StatisticalFeatures::ratio(&[], |_| true), 0.0);
    }
}
