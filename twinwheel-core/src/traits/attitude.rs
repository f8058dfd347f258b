//! Attitude sensor trait and cache
//!
//! The inertial subsystem is consumed only as a source of readings. The
//! [`AttitudeCache`] rate-limits reads and keeps the last good value so a
//! missing or failing sensor never stalls the display.

use core::f32::consts::PI;

/// One attitude reading
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Attitude {
    /// Yaw in radians
    pub yaw: f32,
    /// Pitch in radians
    pub pitch: f32,
    /// Roll in radians
    pub roll: f32,
    /// Raw accelerometer axes
    pub accel: [f32; 3],
    /// Raw gyroscope axes
    pub gyro: [f32; 3],
}

impl Attitude {
    /// Yaw, pitch and roll in degrees
    pub fn degrees(&self) -> [f32; 3] {
        [self.yaw, self.pitch, self.roll].map(|r| r * 180.0 / PI)
    }
}

/// Sensor errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// No sensor fitted or bring-up failed
    NotPresent,
    /// Bus transfer failed
    Bus,
    /// No new data yet
    NotReady,
}

/// Source of attitude readings
pub trait AttitudeSensor {
    /// Read the current attitude
    fn read(&mut self) -> Result<Attitude, SensorError>;
}

/// Stand-in for a board without a sensor
#[derive(Debug, Clone, Copy, Default)]
pub struct AbsentSensor;

impl AttitudeSensor for AbsentSensor {
    fn read(&mut self) -> Result<Attitude, SensorError> {
        Err(SensorError::NotPresent)
    }
}

/// Rate-limited attitude reader that keeps the last good reading
#[derive(Debug)]
pub struct AttitudeCache<S> {
    sensor: S,
    min_interval_ms: u32,
    last_attempt_ms: Option<u32>,
    attitude: Attitude,
    last_error: Option<SensorError>,
}

impl<S: AttitudeSensor> AttitudeCache<S> {
    pub fn new(sensor: S, min_interval_ms: u32) -> Self {
        Self {
            sensor,
            min_interval_ms,
            last_attempt_ms: None,
            attitude: Attitude::default(),
            last_error: None,
        }
    }

    /// Read the sensor if the refresh interval has passed
    ///
    /// Failed reads keep the previous value (zeros before the first good
    /// read). Returns the cached attitude either way.
    pub fn refresh(&mut self, now_ms: u32) -> Attitude {
        let due = match self.last_attempt_ms {
            None => true,
            Some(last) => now_ms.wrapping_sub(last) >= self.min_interval_ms,
        };
        if due {
            self.last_attempt_ms = Some(now_ms);
            match self.sensor.read() {
                Ok(attitude) => {
                    self.attitude = attitude;
                    self.last_error = None;
                }
                Err(e) => self.last_error = Some(e),
            }
        }
        self.attitude
    }

    /// Error from the most recent read attempt, if it failed
    pub fn last_error(&self) -> Option<SensorError> {
        self.last_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedSensor {
        reads: u32,
        fail: bool,
    }

    impl AttitudeSensor for ScriptedSensor {
        fn read(&mut self) -> Result<Attitude, SensorError> {
            self.reads += 1;
            if self.fail {
                Err(SensorError::Bus)
            } else {
                Ok(Attitude {
                    yaw: self.reads as f32,
                    ..Attitude::default()
                })
            }
        }
    }

    #[test]
    fn test_refresh_is_rate_limited() {
        let mut cache = AttitudeCache::new(ScriptedSensor { reads: 0, fail: false }, 10);
        assert_eq!(cache.refresh(0).yaw, 1.0);
        assert_eq!(cache.refresh(5).yaw, 1.0);
        assert_eq!(cache.refresh(10).yaw, 2.0);
        assert_eq!(cache.sensor.reads, 2);
    }

    #[test]
    fn test_failed_read_keeps_last_value() {
        let mut cache = AttitudeCache::new(ScriptedSensor { reads: 0, fail: false }, 10);
        cache.refresh(0);
        cache.sensor.fail = true;
        assert_eq!(cache.refresh(20).yaw, 1.0);
        assert_eq!(cache.last_error(), Some(SensorError::Bus));
    }

    #[test]
    fn test_absent_sensor_reads_zeros() {
        let mut cache = AttitudeCache::new(AbsentSensor, 10);
        assert_eq!(cache.refresh(0), Attitude::default());
        assert_eq!(cache.last_error(), Some(SensorError::NotPresent));
    }

    #[test]
    fn test_degrees() {
        let attitude = Attitude {
            yaw: PI,
            pitch: PI / 2.0,
            roll: 0.0,
            ..Attitude::default()
        };
        let [yaw, pitch, roll] = attitude.degrees();
        assert!((yaw - 180.0).abs() < 1e-3);
        assert!((pitch - 90.0).abs() < 1e-3);
        assert_eq!(roll, 0.0);
    }
}
