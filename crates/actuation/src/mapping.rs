use serde::{Deserialize, Serialize};

/// Linear interpolation of `x` from `[in_min, in_max]` onto `[out_min, out_max]`.
///
/// Ranges may be inverted (`in_min > in_max`); no clamping happens here.
pub fn map_range(x: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// A declared input range and the duty-cycle range it maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearMap {
    pub in_min: f64,
    pub in_max: f64,
    pub out_min: f64,
    pub out_max: f64,
}

/// Left stick X axis `[0, 255]` onto servo duty `[7.7, 11.7]` percent.
pub const STEERING_MAP: LinearMap = LinearMap::new(0.0, 255.0, 7.7, 11.7);
/// Right stick axis `[128, 0]` (pushed forward = lower values) onto motor duty `[0, 80]` percent.
pub const THROTTLE_MAP: LinearMap = LinearMap::new(128.0, 0.0, 0.0, 80.0);

impl LinearMap {
    pub const fn new(in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> Self {
        Self {
            in_min,
            in_max,
            out_min,
            out_max,
        }
    }

    pub fn map(&self, x: f64) -> f64 {
        map_range(x, self.in_min, self.in_max, self.out_min, self.out_max)
    }

    /// Output range as `(low, high)` regardless of declaration order.
    pub fn output_bounds(&self) -> (f64, f64) {
        (
            self.out_min.min(self.out_max),
            self.out_min.max(self.out_max),
        )
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.in_min, self.in_max, self.out_min, self.out_max]
    }

    pub fn is_valid(&self) -> bool {
        self.as_array().iter().all(|v| v.is_finite()) && self.in_min != self.in_max
    }
}

/// Most recent raw axis values read from the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSample {
    pub steering: i32,
    pub throttle: i32,
}

impl ControlSample {
    /// Stick centered, motor stopped.
    pub const NEUTRAL: ControlSample = ControlSample {
        steering: 128,
        throttle: 128,
    };

    pub const fn new(steering: i32, throttle: i32) -> Self {
        Self { steering, throttle }
    }
}

impl Default for ControlSample {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Duty cycles in percent (0..=100).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DutyCycles {
    pub servo: f64,
    pub motor: f64,
}

/// Steering and throttle range maps applied independently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlMapping {
    pub steering: LinearMap,
    pub throttle: LinearMap,
}

impl Default for ControlMapping {
    fn default() -> Self {
        Self {
            steering: STEERING_MAP,
            throttle: THROTTLE_MAP,
        }
    }
}

impl ControlMapping {
    /// Servo duty for a raw steering value, held inside the declared output range.
    pub fn servo_duty(&self, steering_raw: i32) -> f64 {
        let (lo, hi) = self.steering.output_bounds();
        self.steering.map(steering_raw as f64).clamp(lo, hi)
    }

    /// Motor duty for a raw throttle value. Reverse (negative) becomes 0.
    pub fn motor_duty(&self, throttle_raw: i32) -> f64 {
        let (_, hi) = self.throttle.output_bounds();
        let duty = self.throttle.map(throttle_raw as f64);
        if duty < 0.0 {
            0.0
        } else {
            duty.min(hi)
        }
    }

    pub fn duties(&self, sample: ControlSample) -> DutyCycles {
        DutyCycles {
            servo: self.servo_duty(sample.steering),
            motor: self.motor_duty(sample.throttle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_range_hits_endpoints() {
        assert_eq!(map_range(0.0, 0.0, 255.0, 7.7, 11.7), 7.7);
        assert!((map_range(255.0, 0.0, 255.0, 7.7, 11.7) - 11.7).abs() < 1e-12);
        assert_eq!(map_range(128.0, 128.0, 0.0, 0.0, 80.0), 0.0);
        assert_eq!(map_range(0.0, 128.0, 0.0, 0.0, 80.0), 80.0);
    }

    #[test]
    fn neutral_sample_stops_motor() {
        let mapping = ControlMapping::default();
        let duties = mapping.duties(ControlSample::NEUTRAL);
        assert_eq!(duties.motor, 0.0);
        assert!((duties.servo - 9.7).abs() < 0.02);
    }

    #[test]
    fn steering_outside_axis_range_is_clamped() {
        let mapping = ControlMapping::default();
        assert_eq!(mapping.servo_duty(-40), 7.7);
        assert_eq!(mapping.servo_duty(400), 11.7);
    }

    #[test]
    fn degenerate_map_is_invalid() {
        assert!(STEERING_MAP.is_valid());
        assert!(!LinearMap::new(5.0, 5.0, 0.0, 1.0).is_valid());
        assert!(!LinearMap::new(0.0, f64::NAN, 0.0, 1.0).is_valid());
    }
}
