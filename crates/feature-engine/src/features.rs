//! Feature Vector Assembly

use crate::fft::FftAnalyzer;
use crate::statistics::StatisticalFeatures;
use crate::FeatureError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use window_buffer::{CapturedFrame, WindowSnapshot};

/// Names produced by [`FeatureAggregator::aggregate`], in output order
pub const FEATURE_NAMES: [&str; 32] = [
    "speed_mean",
    "speed_std",
    "speed_min",
    "speed_max",
    "speed_skew",
    "rpm_mean",
    "rpm_std",
    "rpm_ratio_mean",
    "throttle_mean",
    "throttle_std",
    "throttle_full_ratio",
    "throttle_step_mean",
    "brake_mean",
    "brake_std",
    "brake_active_ratio",
    "steer_abs_mean",
    "steer_std",
    "steer_rate_mean",
    "steer_zero_crossings",
    "long_accel_mean",
    "long_accel_std",
    "long_accel_kurtosis",
    "lat_accel_abs_mean",
    "lat_accel_max",
    "jerk_mean",
    "gear_changes",
    "tire_slip_mean",
    "steer_low_band_power",
    "steer_medium_band_power",
    "steer_high_band_power",
    "steer_dominant_freq",
    "steer_total_power",
];

/// Throttle fraction counted as flat out
const FULL_THROTTLE: f64 = 0.95;
/// Brake fraction counted as braking
const BRAKE_ACTIVE: f64 = 0.05;

/// Named feature values for one window evaluation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: BTreeMap<String, f64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a feature, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Feature names in lexical order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Aggregates a window of frames into a [`FeatureVector`]
#[derive(Default)]
pub struct FeatureAggregator {
    fft_analyzer: FftAnalyzer,
}

impl FeatureAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute every feature in [`FEATURE_NAMES`] over the window.
    ///
    /// Non-finite results are replaced with 0.0.
    pub fn aggregate(&mut self, window: &WindowSnapshot<'_>) -> Result<FeatureVector, FeatureError> {
        let first = window.first().ok_or(FeatureError::EmptyWindow)?;
        let origin = first.capture_time;

        let times: Vec<f64> = window.signal(|f| {
            (f.capture_time - origin)
                .num_microseconds()
                .map_or(0.0, |us| us as f64 / 1_000_000.0)
        });
        let speed = window.signal(|f| f.frame.speed());
        let rpm = window.signal(|f| f.frame.rpm());
        let rpm_ratio = window.signal(rpm_ratio);
        let throttle = window.signal(|f| f.frame.throttle());
        let brake = window.signal(|f| f.frame.brake());
        let steer = window.signal(|f| f.frame.steer());
        let long_accel = window.signal(|f| f.frame.sled.acceleration[2] as f64);
        let lat_accel = window.signal(|f| f.frame.sled.acceleration[0] as f64);
        let gear = window.signal(|f| f.frame.gear() as f64);
        let slip = window.signal(|f| f.frame.sled.tire_combined_slip.mean() as f64);

        let speed_stats = StatisticalFeatures::compute(&speed);
        let rpm_stats = StatisticalFeatures::compute(&rpm);
        let throttle_stats = StatisticalFeatures::compute(&throttle);
        let brake_stats = StatisticalFeatures::compute(&brake);
        let steer_stats = StatisticalFeatures::compute(&steer);
        let long_stats = StatisticalFeatures::compute(&long_accel);
        let lat_abs: Vec<f64> = lat_accel.iter().map(|v| v.abs()).collect();
        let lat_stats = StatisticalFeatures::compute(&lat_abs);

        let steer_rate = mean(&StatisticalFeatures::abs_derivative(&steer, &times));
        let jerk = mean(&StatisticalFeatures::abs_derivative(&long_accel, &times));

        let span_secs = times.last().copied().unwrap_or(0.0);
        let sample_rate = if span_secs > 0.0 {
            (window.len() - 1) as f64 / span_secs
        } else {
            0.0
        };
        let steer_spectrum = self.fft_analyzer.analyze(&steer, sample_rate);

        debug!(
            "Aggregating {} frames over {:.2}s ({:.1} Hz)",
            window.len(),
            span_secs,
            sample_rate
        );

        let values = [
            speed_stats.mean,
            speed_stats.std_dev,
            speed_stats.min,
            speed_stats.max,
            speed_stats.skewness,
            rpm_stats.mean,
            rpm_stats.std_dev,
            mean(&rpm_ratio),
            throttle_stats.mean,
            throttle_stats.std_dev,
            StatisticalFeatures::ratio(&throttle, |t| t >= FULL_THROTTLE),
            throttle_stats.rate_of_change,
            brake_stats.mean,
            brake_stats.std_dev,
            StatisticalFeatures::ratio(&brake, |b| b > BRAKE_ACTIVE),
            mean(&steer.iter().map(|s| s.abs()).collect::<Vec<_>>()),
            steer_stats.std_dev,
            steer_rate,
            steer_stats.zero_crossings as f64,
            long_stats.mean,
            long_stats.std_dev,
            long_stats.kurtosis,
            lat_stats.mean,
            lat_stats.max,
            jerk,
            StatisticalFeatures::changes(&gear) as f64,
            mean(&slip),
            steer_spectrum.power_low,
            steer_spectrum.power_medium,
            steer_spectrum.power_high,
            steer_spectrum.dominant_frequency,
            steer_spectrum.total_power,
        ];

        Ok(FEATURE_NAMES
            .iter()
            .zip(values)
            .map(|(&name, value)| (name, if value.is_finite() { value } else { 0.0 }))
            .collect())
    }
}

fn rpm_ratio(f: &CapturedFrame) -> f64 {
    let max = f.frame.sled.engine_max_rpm as f64;
    if max > 0.0 {
        f.frame.rpm() / max
    } else {
        0.0
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
