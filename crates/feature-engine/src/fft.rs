//! FFT-based Frequency Analysis

use rustfft::{num_complex::Complex, FftPlanner};

/// Frequency band definitions (Hz)
#[derive(Debug, Clone, Copy)]
pub struct FrequencyBands {
    /// Low frequency band (smooth, deliberate inputs)
    pub low: (f64, f64),
    /// Medium frequency band
    pub medium: (f64, f64),
    /// High frequency band (corrections, sawing at the wheel)
    pub high: (f64, f64),
}

impl Default for FrequencyBands {
    fn default() -> Self {
        Self {
            low: (0.0, 1.0),
            medium: (1.0, 3.0),
            high: (3.0, f64::INFINITY),
        }
    }
}

/// FFT Analyzer for frequency domain features
pub struct FftAnalyzer {
    /// FFT planner, caches plans per signal length
    planner: FftPlanner<f64>,
    /// Frequency bands to analyze
    bands: FrequencyBands,
}

/// Power spectral density in frequency bands
#[derive(Debug, Clone, Default)]
pub struct SpectralFeatures {
    /// Power in low frequency band
    pub power_low: f64,
    /// Power in medium frequency band
    pub power_medium: f64,
    /// Power in high frequency band
    pub power_high: f64,
    /// Dominant frequency
    pub dominant_frequency: f64,
    /// Total spectral power
    pub total_power: f64,
}

impl FftAnalyzer {
    /// Create a new FFT analyzer
    pub fn new(bands: FrequencyBands) -> Self {
        Self {
            planner: FftPlanner::new(),
            bands,
        }
    }

    /// Apply Hamming window to reduce spectral leakage
    fn apply_hamming_window(signal: &mut [f64]) {
        let n = signal.len();
        for (i, value) in signal.iter_mut().enumerate() {
            let window =
                0.54 - 0.46 * (2.0 * std::f64::consts::PI * i as f64 / (n - 1) as f64).cos();
            *value *= window;
        }
    }

    /// Compute spectral features of a signal sampled at `sample_rate` Hz.
    ///
    /// The mean is removed first so a constant offset does not land in the
    /// low band.
    pub fn analyze(&mut self, signal: &[f64], sample_rate: f64) -> SpectralFeatures {
        if signal.len() < 2 || !(sample_rate > 0.0) {
            return SpectralFeatures::default();
        }

        let n = signal.len();
        let mean = signal.iter().sum::<f64>() / n as f64;

        let mut windowed: Vec<f64> = signal.iter().map(|v| v - mean).collect();
        Self::apply_hamming_window(&mut windowed);

        let mut buffer: Vec<Complex<f64>> = windowed
            .iter()
            .map(|&v| Complex::new(v, 0.0))
            .collect();

        let fft = self.planner.plan_fft_forward(n);
        fft.process(&mut buffer);

        // Positive frequencies only, magnitude squared normalized by length
        let power_spectrum: Vec<f64> = buffer
            .iter()
            .take(n / 2)
            .map(|c| c.norm_sqr() / n as f64)
            .collect();

        let freq_resolution = sample_rate / n as f64;

        let mut power_low = 0.0;
        let mut power_medium = 0.0;
        let mut power_high = 0.0;
        let mut max_power = 0.0;
        let mut dominant_freq_idx = 0;

        for (i, &power) in power_spectrum.iter().enumerate() {
            let freq = i as f64 * freq_resolution;

            if freq >= self.bands.low.0 && freq < self.bands.low.1 {
                power_low += power;
            } else if freq >= self.bands.medium.0 && freq < self.bands.medium.1 {
                power_medium += power;
            } else if freq >= self.bands.high.0 && freq < self.bands.high.1 {
                power_high += power;
            }

            if power > max_power {
                max_power = power;
                dominant_freq_idx = i;
            }
        }

        SpectralFeatures {
            power_low,
            power_medium,
            power_high,
            dominant_frequency: dominant_freq_idx as f64 * freq_resolution,
            total_power: power_spectrum.iter().sum(),
        }
    }
}

impl Default for FftAnalyzer {
    fn default() -> Self {
        Self::new(FrequencyBands::default())
    }
}
