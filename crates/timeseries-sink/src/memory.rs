//! In-memory sink

use crate::point::Point;
use crate::{SinkError, TelemetrySink};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// Default retention (points)
const DEFAULT_MAX_POINTS: usize = 100_000;

/// Sink keeping points in memory, oldest dropped past retention
pub struct MemorySink {
    points: Mutex<VecDeque<Point>>,
    max_points: usize,
    /// Writes left to fail before accepting again
    failures_pending: AtomicUsize,
}

impl MemorySink {
    /// Create a new in-memory sink
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_POINTS)
    }

    /// Create a sink retaining at most `max_points`
    pub fn with_capacity(max_points: usize) -> Self {
        Self {
            points: Mutex::new(VecDeque::new()),
            max_points: max_points.max(1),
            failures_pending: AtomicUsize::new(0),
        }
    }

    /// Make the next `count` writes fail
    pub fn fail_next(&self, count: usize) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    /// All retained points, oldest first
    pub fn points(&self) -> Vec<Point> {
        self.points
            .lock()
            .map(|p| p.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Retained points for one measurement, oldest first
    pub fn points_for(&self, measurement: &str) -> Vec<Point> {
        self.points
            .lock()
            .map(|p| {
                p.iter()
                    .filter(|point| point.measurement() == measurement)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.points.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut points) = self.points.lock() {
            points.clear();
        }
    }

    fn take_failure(&self) -> bool {
        self.failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn insert(&self, point: &Point) -> Result<(), SinkError> {
        if self.take_failure() {
            return Err(SinkError::Unavailable("injected failure".to_string()));
        }
        // Same validation a real server applies
        point.to_line_protocol()?;

        let mut points = self
            .points
            .lock()
            .map_err(|e| SinkError::Unavailable(format!("Lock error: {}", e)))?;
        while points.len() >= self.max_points {
            points.pop_front();
        }
        points.push_back(point.clone());
        debug!("Stored {} point ({} retained)", point.measurement(), points.len());
        Ok(())
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySink for MemorySink {
    async fn write(&self, point: &Point) -> Result<(), SinkError> {
        self.insert(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(i: i64) -> Point {
        Point::new("car_telemetry").field("gear", i)
    }

    #[tokio::test]
    async fn test_write_and_read_back() {
        let sink = MemorySink::new();
        sink.write(&point(1)).await.unwrap();
        sink.write(&Point::new("ml_prediction").field("confidence", 0.9f64))
            .await
            .unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.points_for("car_telemetry").len(), 1);
        assert_eq!(sink.points()[1].measurement(), "ml_prediction");
    }

    #[tokio::test]
    async fn test_retention_limit() {
        let sink = MemorySink::with_capacity(5);
        for i in 0..10 {
            sink.write(&point(i)).await.unwrap();
        }

        let points = sink.points();
        assert_eq!(points.len(), 5);
        assert_eq!(points[0].get_field("gear").and_then(|f| f.as_i64()), Some(5));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let sink = MemorySink::new();
        sink.fail_next(2);

        assert!(sink.write(&point(1)).await.is_err());
        assert!(sink.write(&point(2)).await.is_err());
        assert!(sink.write(&point(3)).await.is_ok());
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_point_rejected() {
        let sink = MemorySink::new();
        let result = sink.write(&Point::new("empty")).await;
        assert!(matches!(result, Err(SinkError::InvalidPoint(_))));
        assert!(sink.is_empty());
    }
}
