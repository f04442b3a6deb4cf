//! Telemetry Frame Definitions and Datagram Decoding
//!
//! Field order follows the published Forza "Data Out" layout. The sled
//! section is always present; the dash section only in extended layouts.

use crate::error::DecodeError;
use crate::format::PacketFormat;
use crate::reader::Reader;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Per-wheel values in front-left, front-right, rear-left, rear-right order
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Wheels<T> {
    pub front_left: T,
    pub front_right: T,
    pub rear_left: T,
    pub rear_right: T,
}

impl<T: Copy> Wheels<T> {
    /// Values as an array in FL, FR, RL, RR order
    pub fn to_array(&self) -> [T; 4] {
        [self.front_left, self.front_right, self.rear_left, self.rear_right]
    }
}

impl Wheels<f32> {
    /// Average across all four wheels
    pub fn mean(&self) -> f32 {
        self.to_array().iter().sum::<f32>() / 4.0
    }
}

/// Physics section shared by every layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SledData {
    /// Non-zero while the player is driving (not in menus)
    pub is_race_on: i32,
    /// Game timestamp (ms, wraps)
    pub timestamp_ms: u32,
    pub engine_max_rpm: f32,
    pub engine_idle_rpm: f32,
    pub current_engine_rpm: f32,
    /// Local-space acceleration (m/s²): x = right, y = up, z = forward
    pub acceleration: [f32; 3],
    /// Local-space velocity (m/s)
    pub velocity: [f32; 3],
    /// Local-space angular velocity (rad/s)
    pub angular_velocity: [f32; 3],
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    /// 0.0 = max stretch, 1.0 = max compression
    pub normalized_suspension_travel: Wheels<f32>,
    pub tire_slip_ratio: Wheels<f32>,
    /// Wheel rotation speed (rad/s)
    pub wheel_rotation_speed: Wheels<f32>,
    pub wheel_on_rumble_strip: Wheels<i32>,
    pub wheel_in_puddle_depth: Wheels<f32>,
    pub surface_rumble: Wheels<f32>,
    pub tire_slip_angle: Wheels<f32>,
    pub tire_combined_slip: Wheels<f32>,
    pub suspension_travel_meters: Wheels<f32>,
    pub car_ordinal: i32,
    /// 0 (D) to 7 (X)
    pub car_class: i32,
    pub car_performance_index: i32,
    /// 0 = FWD, 1 = RWD, 2 = AWD
    pub drivetrain_type: i32,
    pub num_cylinders: i32,
}

/// Dash section of the extended layouts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashData {
    pub position: [f32; 3],
    /// Vehicle speed (m/s)
    pub speed: f32,
    /// Engine power (W)
    pub power: f32,
    /// Engine torque (Nm)
    pub torque: f32,
    pub tire_temp: Wheels<f32>,
    pub boost: f32,
    pub fuel: f32,
    pub distance_traveled: f32,
    pub best_lap_time: f32,
    pub last_lap_time: f32,
    pub current_lap_time: f32,
    pub current_race_time: f32,
    pub lap_number: u16,
    pub race_position: u8,
    /// Throttle 0-255
    pub accel: u8,
    /// Brake 0-255
    pub brake: u8,
    pub clutch: u8,
    pub handbrake: u8,
    /// 0 = reverse, 1+ = forward gears, 11 = neutral on some cars
    pub gear: u8,
    /// Steering -127 (full left) to 127 (full right)
    pub steer: i8,
    pub normalized_driving_line: i8,
    pub normalized_ai_brake_difference: i8,
}

/// One decoded telemetry datagram
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    pub sled: SledData,
    /// Absent for the sled-only layout
    pub dash: Option<DashData>,
}

impl TelemetryFrame {
    /// Vehicle speed in m/s (0.0 when the layout has no dash)
    pub fn speed(&self) -> f64 {
        self.dash.as_ref().map_or(0.0, |d| d.speed as f64)
    }

    /// Current engine RPM
    pub fn rpm(&self) -> f64 {
        self.sled.current_engine_rpm as f64
    }

    /// Current gear (0 when the layout has no dash)
    pub fn gear(&self) -> i64 {
        self.dash.as_ref().map_or(0, |d| d.gear as i64)
    }

    /// Throttle as a 0.0-1.0 fraction
    pub fn throttle(&self) -> f64 {
        self.dash.as_ref().map_or(0.0, |d| d.accel as f64 / 255.0)
    }

    /// Brake as a 0.0-1.0 fraction
    pub fn brake(&self) -> f64 {
        self.dash.as_ref().map_or(0.0, |d| d.brake as f64 / 255.0)
    }

    /// Steering as a -1.0 to 1.0 fraction
    pub fn steer(&self) -> f64 {
        self.dash.as_ref().map_or(0.0, |d| d.steer as f64 / 127.0)
    }

    /// Whether the game reports active driving
    pub fn is_race_on(&self) -> bool {
        self.sled.is_race_on != 0
    }
}

/// Decode a raw datagram in the given layout
pub fn decode(raw: &[u8], format: PacketFormat) -> Result<TelemetryFrame, DecodeError> {
    let expected = format.min_len();
    if raw.len() < expected {
        return Err(DecodeError::Truncated {
            format,
            expected,
            actual: raw.len(),
        });
    }
    if raw.len() > format.datagram_len() {
        trace!(
            "Ignoring {} trailing bytes in {} datagram",
            raw.len() - format.datagram_len(),
            format
        );
    }

    let sled = decode_sled(&mut Reader::new(raw, 0));
    let dash = format
        .dash_offset()
        .map(|offset| decode_dash(&mut Reader::new(raw, offset)));

    Ok(TelemetryFrame { sled, dash })
}

fn decode_sled(r: &mut Reader<'_>) -> SledData {
    SledData {
        is_race_on: r.i32(),
        timestamp_ms: r.u32(),
        engine_max_rpm: r.f32(),
        engine_idle_rpm: r.f32(),
        current_engine_rpm: r.f32(),
        acceleration: [r.f32(), r.f32(), r.f32()],
        velocity: [r.f32(), r.f32(), r.f32()],
        angular_velocity: [r.f32(), r.f32(), r.f32()],
        yaw: r.f32(),
        pitch: r.f32(),
        roll: r.f32(),
        normalized_suspension_travel: r.wheels_f32(),
        tire_slip_ratio: r.wheels_f32(),
        wheel_rotation_speed: r.wheels_f32(),
        wheel_on_rumble_strip: r.wheels_i32(),
        wheel_in_puddle_depth: r.wheels_f32(),
        surface_rumble: r.wheels_f32(),
        tire_slip_angle: r.wheels_f32(),
        tire_combined_slip: r.wheels_f32(),
        suspension_travel_meters: r.wheels_f32(),
        car_ordinal: r.i32(),
        car_class: r.i32(),
        car_performance_index: r.i32(),
        drivetrain_type: r.i32(),
        num_cylinders: r.i32(),
    }
}

fn decode_dash(r: &mut Reader<'_>) -> DashData {
    DashData {
        position: [r.f32(), r.f32(), r.f32()],
        speed: r.f32(),
        power: r.f32(),
        torque: r.f32(),
        tire_temp: r.wheels_f32(),
        boost: r.f32(),
        fuel: r.f32(),
        distance_traveled: r.f32(),
        best_lap_time: r.f32(),
        last_lap_time: r.f32(),
        current_lap_time: r.f32(),
        current_race_time: r.f32(),
        lap_number: r.u16(),
        race_position: r.u8(),
        accel: r.u8(),
        brake: r.u8(),
        clutch: r.u8(),
        handbrake: r.u8(),
        gear: r.u8(),
        steer: r.i8(),
        normalized_driving_line: r.i8(),
        normalized_ai_brake_difference: r.i8(),
    }
}
