//! Ingestion Loop
//!
//! Receives telemetry datagrams, keeps the trailing window, and writes one
//! raw point per frame plus one prediction point per classified window.
//! Every per-datagram failure is logged and counted; the next datagram is
//! processed as if nothing happened.

use crate::error::PipelineError;
use crate::points::{prediction_point, telemetry_point};
use crate::reporter::ConsoleReporter;
use crate::session::SessionId;
use chrono::{DateTime, Utc};
use feature_engine::{reconcile, FeatureAggregator, SchemaDrift, FEATURE_NAMES};
use forza_protocol::{decode, PacketFormat, MAX_DATAGRAM_BYTES};
use inference_engine::{StyleClassifier, StylePrediction};
use metrics::counter;
use std::future::Future;
use std::time::{Duration, Instant};
use timeseries_sink::TelemetrySink;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use window_buffer::{CapturedFrame, TimeWindow};

/// Loop tuning taken from the pipeline configuration
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub format: PacketFormat,
    /// Trailing window length
    pub window: Duration,
    /// Frames required before classifying
    pub min_frames: usize,
    pub recv_timeout: Duration,
    /// Minimum gap between console reports
    pub report_interval: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            format: PacketFormat::Fh4,
            window: Duration::from_secs(2),
            min_frames: 1,
            recv_timeout: Duration::from_secs(2),
            report_interval: Duration::from_millis(500),
        }
    }
}

/// Counters for one drive session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub datagrams: u64,
    pub decode_failures: u64,
    pub feature_failures: u64,
    pub inference_failures: u64,
    pub sink_failures: u64,
    pub receive_failures: u64,
    pub telemetry_points: u64,
    pub prediction_points: u64,
    pub timeouts: u64,
}

/// Result of one successfully processed datagram
#[derive(Debug, Clone, PartialEq)]
pub enum IterationOutcome {
    /// Fewer frames than required; only the raw point was written
    Buffering { window_len: usize },
    /// Window classified and both points written
    Classified(StylePrediction),
}

/// Owns all per-session state: window, aggregator, classifier and sink
pub struct IngestionLoop<S, C> {
    session: SessionId,
    settings: LoopSettings,
    window: TimeWindow,
    aggregator: FeatureAggregator,
    classifier: C,
    sink: S,
    reporter: ConsoleReporter,
    stats: LoopStats,
}

impl<S, C> IngestionLoop<S, C>
where
    S: TelemetrySink,
    C: StyleClassifier,
{
    pub fn new(
        session: SessionId,
        settings: LoopSettings,
        classifier: C,
        sink: S,
    ) -> Result<Self, PipelineError> {
        let window = TimeWindow::new(settings.window).map_err(crate::config::ConfigError::from)?;

        let drift = SchemaDrift::between(&FEATURE_NAMES[..], classifier.feature_names());
        if !drift.is_empty() {
            warn!(
                "Feature schema drift: {} missing (filled with 0.0): {:?}, {} extra (dropped): {:?}",
                drift.missing.len(),
                drift.missing,
                drift.extra.len(),
                drift.extra
            );
        }

        Ok(Self {
            session,
            reporter: ConsoleReporter::new(settings.report_interval),
            settings,
            window,
            aggregator: FeatureAggregator::new(),
            classifier,
            sink,
            stats: LoopStats::default(),
        })
    }

    /// Process one datagram received at `captured_at`
    pub async fn handle_datagram(
        &mut self,
        raw: &[u8],
        captured_at: DateTime<Utc>,
    ) -> Result<IterationOutcome, PipelineError> {
        self.stats.datagrams += 1;
        counter!("pipeline_datagrams_total").increment(1);

        let result = self.process(raw, captured_at).await;
        if let Err(e) = &result {
            self.record_failure(e);
        }
        result
    }

    async fn process(
        &mut self,
        raw: &[u8],
        captured_at: DateTime<Utc>,
    ) -> Result<IterationOutcome, PipelineError> {
        let frame = decode(raw, self.settings.format)?;
        let captured = CapturedFrame::new(frame, captured_at);

        self.window.insert_and_evict(captured.clone());
        // Clamping may have moved the capture time forward
        let captured = match self.window.snapshot().last() {
            Some(stored) => stored.clone(),
            None => captured,
        };

        let raw_point = telemetry_point(&self.session, &captured);
        self.sink.write(&raw_point).await?;
        self.stats.telemetry_points += 1;
        counter!("pipeline_points_total", "measurement" => "car_telemetry").increment(1);

        let window_len = self.window.len();
        if window_len < self.settings.min_frames {
            debug!("Buffering: {}/{} frames", window_len, self.settings.min_frames);
            self.reporter.report(Instant::now(), &captured, window_len, None);
            return Ok(IterationOutcome::Buffering { window_len });
        }

        let features = self.aggregator.aggregate(&self.window.snapshot())?;
        let input = reconcile(&features, self.classifier.feature_names());
        let probabilities = self.classifier.predict_proba(&input)?;
        let prediction = StylePrediction::from_probabilities(&probabilities)?;

        let point = prediction_point(&self.session, &prediction, captured.capture_time);
        self.sink.write(&point).await?;
        self.stats.prediction_points += 1;
        counter!("pipeline_points_total", "measurement" => "ml_prediction").increment(1);

        self.reporter
            .report(Instant::now(), &captured, window_len, Some(&prediction));
        Ok(IterationOutcome::Classified(prediction))
    }

    fn record_failure(&mut self, error: &PipelineError) {
        match error {
            PipelineError::Decode(_) => self.stats.decode_failures += 1,
            PipelineError::Feature(_) => self.stats.feature_failures += 1,
            PipelineError::Inference(_) => self.stats.inference_failures += 1,
            PipelineError::Sink(_) => self.stats.sink_failures += 1,
            PipelineError::Io(_) => self.stats.receive_failures += 1,
            PipelineError::Config(_) => {}
        }
        counter!("pipeline_failures_total", "stage" => error.stage()).increment(1);
    }

    /// Receive and process datagrams until `shutdown` resolves.
    ///
    /// Shutdown is only observed between iterations.
    pub async fn run<F>(&mut self, socket: UdpSocket, shutdown: F) -> LoopStats
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut buf = vec![0u8; MAX_DATAGRAM_BYTES];
        let recv_timeout = self.settings.recv_timeout;

        match socket.local_addr() {
            Ok(addr) => info!(
                "Listening for {} telemetry on {} (session {})",
                self.settings.format, addr, self.session
            ),
            Err(e) => warn!("Socket has no local address: {}", e),
        }

        loop {
            let received = tokio::select! {
                biased;
                _ = &mut shutdown => None,
                r = timeout(recv_timeout, socket.recv_from(&mut buf)) => Some(r),
            };

            match received {
                None => break,
                Some(Err(_)) => {
                    self.stats.timeouts += 1;
                    counter!("pipeline_receive_timeouts_total").increment(1);
                    info!("Waiting for telemetry...");
                }
                Some(Ok(Err(e))) => {
                    let error = PipelineError::from(e);
                    warn!("{}", error);
                    self.record_failure(&error);
                }
                Some(Ok(Ok((len, peer)))) => {
                    let captured_at = Utc::now();
                    if let Err(e) = self.handle_datagram(&buf[..len], captured_at).await {
                        warn!("Dropped {} byte datagram from {}: {}", len, peer, e);
                    }
                }
            }
        }

        let window = self.window.stats();
        info!(
            "Drive session {} ended: {} datagrams, {} telemetry points, {} predictions, {} timeouts, {} clamped",
            self.session,
            self.stats.datagrams,
            self.stats.telemetry_points,
            self.stats.prediction_points,
            self.stats.timeouts,
            window.clamped
        );
        self.stats
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn reporter(&self) -> &ConsoleReporter {
        &self.reporter
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inference_engine::{DrivingStyle, InferenceError};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use timeseries_sink::{FieldValue, MemorySink};
    use tokio::sync::oneshot;

    /// Classifier with a fixed output that counts its calls
    struct FixedClassifier {
        names: Vec<String>,
        probabilities: Vec<f64>,
        calls: AtomicUsize,
        fail: AtomicBool,
        last_input: std::sync::Mutex<Vec<f64>>,
    }

    impl FixedClassifier {
        fn new(names: &[&str], probabilities: &[f64]) -> Self {
            Self {
                names: names.iter().map(|n| n.to_string()).collect(),
                probabilities: probabilities.to_vec(),
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                last_input: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl StyleClassifier for FixedClassifier {
        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_input.lock().unwrap() = features.to_vec();
            if self.fail.load(Ordering::SeqCst) {
                return Err(InferenceError::InferenceFailed("test failure".to_string()));
            }
            Ok(self.probabilities.clone())
        }
    }

    fn datagram(speed: f32, rpm: f32, gear: u8) -> Vec<u8> {
        let format = PacketFormat::Fh4;
        let mut buf = vec![0u8; format.datagram_len()];
        buf[0..4].copy_from_slice(&1i32.to_le_bytes());
        buf[16..20].copy_from_slice(&rpm.to_le_bytes());
        let dash = format.dash_offset().unwrap();
        buf[dash + 12..dash + 16].copy_from_slice(&speed.to_le_bytes());
        buf[dash + 75] = gear;
        buf
    }

    fn pipeline(
        min_frames: usize,
        classifier: FixedClassifier,
    ) -> IngestionLoop<MemorySink, FixedClassifier> {
        let settings = LoopSettings {
            min_frames,
            ..Default::default()
        };
        IngestionLoop::new(SessionId::new(), settings, classifier, MemorySink::new()).unwrap()
    }

    fn default_classifier() -> FixedClassifier {
        FixedClassifier::new(&["speed_mean", "rpm_mean"], &[0.1, 0.6, 0.2, 0.1])
    }

    fn at(base: DateTime<Utc>, millis: i64) -> DateTime<Utc> {
        base + chrono::Duration::milliseconds(millis)
    }

    #[tokio::test]
    async fn test_end_to_end_three_frames() {
        let mut pipeline = pipeline(1, default_classifier());
        let t = Utc::now();

        for (i, offset) in [0, 100, 200].into_iter().enumerate() {
            let outcome = pipeline
                .handle_datagram(&datagram(20.0 + i as f32, 3000.0, 3), at(t, offset))
                .await
                .unwrap();
            assert!(matches!(outcome, IterationOutcome::Classified(_)));
        }

        assert_eq!(pipeline.window_len(), 3);
        let sink = pipeline.sink();
        let telemetry = sink.points_for("car_telemetry");
        let predictions = sink.points_for("ml_prediction");
        assert_eq!(telemetry.len(), 3);
        assert_eq!(predictions.len(), 3);

        let session = pipeline.session().to_string();
        for (raw, prediction) in telemetry.iter().zip(&predictions) {
            assert_eq!(raw.timestamp(), prediction.timestamp());
            assert_eq!(raw.get_tag("session_id"), Some(session.as_str()));
            assert_eq!(prediction.get_tag("session_id"), Some(session.as_str()));
            assert_eq!(prediction.get_tag("driving_style"), Some("assertive"));
            assert_eq!(
                prediction.get_field("driving_style_id"),
                Some(&FieldValue::Integer(1))
            );
        }
        assert_eq!(telemetry[2].get_field("speed"), Some(&FieldValue::Float(22.0)));
        assert_eq!(telemetry[2].get_field("gear"), Some(&FieldValue::Integer(3)));

        let stats = pipeline.stats();
        assert_eq!(stats.datagrams, 3);
        assert_eq!(stats.telemetry_points, 3);
        assert_eq!(stats.prediction_points, 3);
    }

    #[tokio::test]
    async fn test_min_frames_gates_inference() {
        let mut pipeline = pipeline(3, default_classifier());
        let t = Utc::now();

        for offset in [0, 100] {
            let outcome = pipeline
                .handle_datagram(&datagram(10.0, 2000.0, 2), at(t, offset))
                .await
                .unwrap();
            assert!(matches!(outcome, IterationOutcome::Buffering { .. }));
        }
        assert_eq!(pipeline.classifier().calls(), 0);
        assert_eq!(pipeline.sink().points_for("car_telemetry").len(), 2);
        assert!(pipeline.sink().points_for("ml_prediction").is_empty());

        let outcome = pipeline
            .handle_datagram(&datagram(10.0, 2000.0, 2), at(t, 200))
            .await
            .unwrap();
        assert!(matches!(outcome, IterationOutcome::Classified(_)));
        assert_eq!(pipeline.classifier().calls(), 1);
    }

    #[tokio::test]
    async fn test_stale_frames_leave_window() {
        let mut pipeline = pipeline(1, default_classifier());
        let t = Utc::now();

        pipeline.handle_datagram(&datagram(10.0, 2000.0, 2), t).await.unwrap();
        pipeline.handle_datagram(&datagram(10.0, 2000.0, 2), at(t, 1000)).await.unwrap();
        let outcome = pipeline
            .handle_datagram(&datagram(10.0, 2000.0, 2), at(t, 2500))
            .await
            .unwrap();

        assert!(matches!(outcome, IterationOutcome::Classified(_)));
        assert_eq!(pipeline.window_len(), 2);
    }

    #[tokio::test]
    async fn test_features_reconciled_to_classifier_order() {
        let classifier =
            FixedClassifier::new(&["rpm_mean", "not_a_feature", "speed_mean"], &[1.0, 0.0, 0.0, 0.0]);
        let mut pipeline = pipeline(1, classifier);

        let outcome = pipeline
            .handle_datagram(&datagram(25.0, 4000.0, 4), Utc::now())
            .await
            .unwrap();

        match outcome {
            IterationOutcome::Classified(p) => assert_eq!(p.style, DrivingStyle::Aggressive),
            other => panic!("expected classification, got {:?}", other),
        }
        let input = pipeline.classifier().last_input.lock().unwrap().clone();
        assert_eq!(input, vec![4000.0, 0.0, 25.0]);
    }

    #[tokio::test]
    async fn test_decode_failure_does_not_affect_next_datagram() {
        let mut pipeline = pipeline(1, default_classifier());
        let t = Utc::now();

        let result = pipeline.handle_datagram(&[0u8; 10], t).await;
        assert!(matches!(result, Err(PipelineError::Decode(_))));
        assert!(pipeline.sink().is_empty());
        assert_eq!(pipeline.window_len(), 0);

        let outcome = pipeline
            .handle_datagram(&datagram(10.0, 2000.0, 2), at(t, 100))
            .await
            .unwrap();
        assert!(matches!(outcome, IterationOutcome::Classified(_)));
        assert_eq!(pipeline.stats().decode_failures, 1);
        assert_eq!(pipeline.sink().len(), 2);
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_affect_next_datagram() {
        let mut pipeline = pipeline(1, default_classifier());
        let t = Utc::now();

        pipeline.sink().fail_next(1);
        let result = pipeline.handle_datagram(&datagram(10.0, 2000.0, 2), t).await;
        assert!(matches!(result, Err(PipelineError::Sink(_))));

        let outcome = pipeline
            .handle_datagram(&datagram(10.0, 2000.0, 2), at(t, 100))
            .await
            .unwrap();
        assert!(matches!(outcome, IterationOutcome::Classified(_)));
        assert_eq!(pipeline.stats().sink_failures, 1);
        assert_eq!(pipeline.sink().points_for("car_telemetry").len(), 1);
        assert_eq!(pipeline.sink().points_for("ml_prediction").len(), 1);
    }

    #[tokio::test]
    async fn test_inference_failure_keeps_raw_point() {
        let mut pipeline = pipeline(1, default_classifier());
        let t = Utc::now();

        pipeline.classifier().fail.store(true, Ordering::SeqCst);
        let result = pipeline.handle_datagram(&datagram(10.0, 2000.0, 2), t).await;
        assert!(matches!(result, Err(PipelineError::Inference(_))));
        assert_eq!(pipeline.sink().points_for("car_telemetry").len(), 1);
        assert!(pipeline.sink().points_for("ml_prediction").is_empty());

        pipeline.classifier().fail.store(false, Ordering::SeqCst);
        let outcome = pipeline
            .handle_datagram(&datagram(10.0, 2000.0, 2), at(t, 100))
            .await
            .unwrap();
        assert!(matches!(outcome, IterationOutcome::Classified(_)));
        assert_eq!(pipeline.stats().inference_failures, 1);
    }

    #[tokio::test]
    async fn test_reporter_throttling_never_skips_writes() {
        let mut pipeline = pipeline(1, default_classifier());
        let t = Utc::now();

        // Processed well inside one report interval
        for i in 0..20 {
            pipeline
                .handle_datagram(&datagram(10.0, 2000.0, 2), at(t, i))
                .await
                .unwrap();
        }

        assert_eq!(pipeline.sink().points_for("car_telemetry").len(), 20);
        assert_eq!(pipeline.sink().points_for("ml_prediction").len(), 20);
        assert!(pipeline.reporter().suppressed() > 0);
        assert_eq!(pipeline.stats().telemetry_points, 20);
        assert_eq!(pipeline.stats().prediction_points, 20);
    }

    #[tokio::test]
    async fn test_non_finite_speed_still_writes_raw_point() {
        let mut pipeline = pipeline(1, default_classifier());
        let t = Utc::now();

        let outcome = pipeline
            .handle_datagram(&datagram(f32::NAN, 3000.0, 3), t)
            .await
            .unwrap();
        assert!(matches!(outcome, IterationOutcome::Classified(_)));
        assert_eq!(pipeline.window_len(), 1);

        let telemetry = pipeline.sink().points_for("car_telemetry");
        assert_eq!(telemetry.len(), 1);
        let line = telemetry[0].to_line_protocol().unwrap();
        assert!(!line.contains("speed="));
        assert!(line.contains("rpm=3000"));
        assert!(line.contains("gear=3i"));
        assert_eq!(pipeline.sink().points_for("ml_prediction").len(), 1);
        assert_eq!(pipeline.stats().sink_failures, 0);

        // Later frames are unaffected
        let outcome = pipeline
            .handle_datagram(&datagram(12.0, 3100.0, 3), at(t, 100))
            .await
            .unwrap();
        assert!(matches!(outcome, IterationOutcome::Classified(_)));
        assert_eq!(pipeline.sink().points_for("car_telemetry").len(), 2);
    }

    #[tokio::test]
    async fn test_sled_frames_default_speed_and_gear() {
        let settings = LoopSettings {
            format: PacketFormat::Sled,
            ..Default::default()
        };
        let mut pipeline =
            IngestionLoop::new(SessionId::new(), settings, default_classifier(), MemorySink::new())
                .unwrap();

        let mut raw = vec![0u8; PacketFormat::Sled.datagram_len()];
        raw[16..20].copy_from_slice(&3500.0f32.to_le_bytes());
        pipeline.handle_datagram(&raw, Utc::now()).await.unwrap();

        let points = pipeline.sink().points_for("car_telemetry");
        assert_eq!(points[0].get_field("speed"), Some(&FieldValue::Float(0.0)));
        assert_eq!(points[0].get_field("rpm"), Some(&FieldValue::Float(3500.0)));
        assert_eq!(points[0].get_field("gear"), Some(&FieldValue::Integer(0)));
    }

    #[tokio::test]
    async fn test_udp_loop_until_shutdown() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let settings = LoopSettings {
            recv_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let mut pipeline =
            IngestionLoop::new(SessionId::new(), settings, default_classifier(), MemorySink::new())
                .unwrap();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let sender = tokio::spawn(async move {
            let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            for _ in 0..3 {
                client.send_to(&datagram(15.0, 2500.0, 3), addr).await.unwrap();
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            client.send_to(&[1, 2, 3], addr).await.unwrap();
            // Let the loop drain the socket and hit a receive timeout
            tokio::time::sleep(Duration::from_millis(200)).await;
            stop_tx.send(()).ok();
        });

        let stats = pipeline
            .run(socket, async {
                stop_rx.await.ok();
            })
            .await;
        sender.await.unwrap();

        assert_eq!(stats.datagrams, 4);
        assert_eq!(stats.decode_failures, 1);
        assert_eq!(stats.telemetry_points, 3);
        assert_eq!(stats.prediction_points, 3);
        assert!(stats.timeouts >= 1);
        assert_eq!(pipeline.window_len(), 3);
    }
}
