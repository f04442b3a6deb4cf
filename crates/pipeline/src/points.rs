//! Point construction for the two measurements written per frame

use crate::session::SessionId;
use chrono::{DateTime, Utc};
use inference_engine::StylePrediction;
use timeseries_sink::Point;
use window_buffer::CapturedFrame;

/// Raw per-frame telemetry
pub const TELEMETRY_MEASUREMENT: &str = "car_telemetry";
/// Per-window classification
pub const PREDICTION_MEASUREMENT: &str = "ml_prediction";

/// One `car_telemetry` point, timestamped with the frame's capture time
pub fn telemetry_point(session: &SessionId, captured: &CapturedFrame) -> Point {
    Point::new(TELEMETRY_MEASUREMENT)
        .tag("session_id", session.to_string())
        .field("speed", captured.frame.speed())
        .field("rpm", captured.frame.rpm())
        .field("gear", captured.frame.gear())
        .time(captured.capture_time)
}

/// One `ml_prediction` point for the winning label
pub fn prediction_point(
    session: &SessionId,
    prediction: &StylePrediction,
    timestamp: DateTime<Utc>,
) -> Point {
    Point::new(PREDICTION_MEASUREMENT)
        .tag("session_id", session.to_string())
        .tag("driving_style", prediction.style.as_str())
        .field("driving_style_id", prediction.index() as i64)
        .field("confidence", prediction.confidence)
        .time(timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use forza_protocol::{DashData, TelemetryFrame};
    use inference_engine::DrivingStyle;
    use timeseries_sink::FieldValue;

    fn captured(dash: Option<DashData>) -> CapturedFrame {
        let mut frame = TelemetryFrame {
            dash,
            ..Default::default()
        };
        frame.sled.current_engine_rpm = 5200.0;
        CapturedFrame::new(frame, Utc::now())
    }

    #[test]
    fn test_telemetry_point_fields() {
        let session = SessionId::new();
        let dash = DashData {
            speed: 31.5,
            gear: 3,
            ..Default::default()
        };
        let captured = captured(Some(dash));
        let point = telemetry_point(&session, &captured);

        assert_eq!(point.measurement(), "car_telemetry");
        assert_eq!(point.get_tag("session_id"), Some(session.to_string().as_str()));
        assert_eq!(point.get_field("speed"), Some(&FieldValue::Float(31.5)));
        assert_eq!(point.get_field("rpm"), Some(&FieldValue::Float(5200.0)));
        assert_eq!(point.get_field("gear"), Some(&FieldValue::Integer(3)));
        assert_eq!(point.timestamp(), Some(captured.capture_time));
    }

    #[test]
    fn test_sled_frame_defaults() {
        let point = telemetry_point(&SessionId::new(), &captured(None));
        assert_eq!(point.get_field("speed"), Some(&FieldValue::Float(0.0)));
        assert_eq!(point.get_field("gear"), Some(&FieldValue::Integer(0)));
        assert_eq!(point.get_field("rpm"), Some(&FieldValue::Float(5200.0)));
    }

    #[test]
    fn test_prediction_point_fields() {
        let session = SessionId::new();
        let prediction = StylePrediction::from_probabilities(&[0.25, 0.25, 0.3, 0.2]).unwrap();
        let ts = Utc::now();
        let point = prediction_point(&session, &prediction, ts);

        assert_eq!(point.measurement(), "ml_prediction");
        assert_eq!(point.get_tag("driving_style"), Some("defensive"));
        assert_eq!(prediction.style, DrivingStyle::Defensive);
        assert_eq!(point.get_field("driving_style_id"), Some(&FieldValue::Integer(2)));
        assert_eq!(point.get_field("confidence"), Some(&FieldValue::Float(0.3)));
        assert_eq!(point.timestamp(), Some(ts));
    }
}
