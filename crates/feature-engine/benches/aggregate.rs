//! Aggregation cost over a full two-second window at 60 Hz

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use feature_engine::{reconcile, FeatureAggregator, FEATURE_NAMES};
use forza_protocol::{DashData, TelemetryFrame};
use window_buffer::{CapturedFrame, TimeWindow};

fn full_window() -> TimeWindow {
    let start = Utc::now();
    let mut window = TimeWindow::new(std::time::Duration::from_secs(2)).unwrap();
    for i in 0..120 {
        let mut frame = TelemetryFrame::default();
        frame.sled.engine_max_rpm = 8000.0;
        frame.sled.current_engine_rpm = 3000.0 + (i % 40) as f32 * 50.0;
        frame.sled.acceleration = [(i as f32 * 0.1).sin(), 0.0, (i as f32 * 0.05).cos()];
        frame.dash = Some(DashData {
            speed: 20.0 + i as f32 * 0.1,
            accel: (i * 2) as u8,
            steer: ((i as f32 * 0.3).sin() * 100.0) as i8,
            gear: 3,
            ..Default::default()
        });
        window.insert_and_evict(CapturedFrame::new(
            frame,
            start + Duration::microseconds(i * 16_667),
        ));
    }
    window
}

fn bench_aggregate(c: &mut Criterion) {
    let window = full_window();
    let mut aggregator = FeatureAggregator::new();

    c.bench_function("aggregate_120_frames", |b| {
        b.iter(|| {
            let features = aggregator.aggregate(black_box(&window.snapshot())).unwrap();
            black_box(reconcile(&features, &FEATURE_NAMES))
        })
    });
}

criterion_group!(benches, bench_aggregate);
criterion_main!(benches);
