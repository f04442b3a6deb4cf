//! Rate-limited console report

use inference_engine::StylePrediction;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use window_buffer::CapturedFrame;

/// Prints a one-line status at most once per interval.
///
/// Only the console output is throttled; callers keep writing every point.
#[derive(Debug)]
pub struct ConsoleReporter {
    interval: Duration,
    last_report: Option<Instant>,
    suppressed: u64,
}

impl ConsoleReporter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_report: None,
            suppressed: 0,
        }
    }

    /// Whether a report may be printed at `now`. Marks it printed if so.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_report {
            if now.saturating_duration_since(last) < self.interval {
                self.suppressed += 1;
                return false;
            }
        }
        self.last_report = Some(now);
        true
    }

    /// Print the status line for one iteration unless throttled
    pub fn report(
        &mut self,
        now: Instant,
        captured: &CapturedFrame,
        window_len: usize,
        prediction: Option<&StylePrediction>,
    ) -> bool {
        if !self.try_acquire(now) {
            return false;
        }

        let frame = &captured.frame;
        match prediction {
            Some(p) => info!(
                "speed={:.1} rpm={:.0} gear={} window={} style={} ({:.0}%)",
                frame.speed(),
                frame.rpm(),
                frame.gear(),
                window_len,
                p.style,
                p.confidence * 100.0
            ),
            None => info!(
                "speed={:.1} rpm={:.0} gear={} window={} style=buffering",
                frame.speed(),
                frame.rpm(),
                frame.gear(),
                window_len
            ),
        }
        debug!("{} reports suppressed so far", self.suppressed);
        true
    }

    /// Reports skipped because of the interval
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use forza_protocol::TelemetryFrame;

    #[test]
    fn test_first_report_always_prints() {
        let mut reporter = ConsoleReporter::new(Duration::from_millis(500));
        assert!(reporter.try_acquire(Instant::now()));
    }

    #[test]
    fn test_throttles_within_interval() {
        let mut reporter = ConsoleReporter::new(Duration::from_millis(500));
        let start = Instant::now();

        assert!(reporter.try_acquire(start));
        assert!(!reporter.try_acquire(start + Duration::from_millis(100)));
        assert!(!reporter.try_acquire(start + Duration::from_millis(499)));
        assert!(reporter.try_acquire(start + Duration::from_millis(500)));
        assert!(!reporter.try_acquire(start + Duration::from_millis(900)));
        assert!(reporter.try_acquire(start + Duration::from_millis(1000)));
        assert_eq!(reporter.suppressed(), 3);
    }

    #[test]
    fn test_report_with_and_without_prediction() {
        let mut reporter = ConsoleReporter::new(Duration::ZERO);
        let captured = CapturedFrame::new(TelemetryFrame::default(), Utc::now());
        let prediction = StylePrediction::from_probabilities(&[0.7, 0.1, 0.1, 0.1]).unwrap();
        let now = Instant::now();

        assert!(reporter.report(now, &captured, 0, None));
        assert!(reporter.report(now, &captured, 3, Some(&prediction)));
    }
}
