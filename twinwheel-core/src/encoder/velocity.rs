//! Velocity estimation
//!
//! Converts the pulse count of one sampling window into wheel speed:
//!
//! ```text
//! raw      = |pulses| * 60_000_000 / (ppr * elapsed_us)     [RPM]
//! filtered = alpha * raw + (1 - alpha) * filtered_prev
//! ```
//!
//! The filter starts from zero, so the first filtered value is `alpha * raw`.

/// Rotation direction of a wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Forward,
    Backward,
    #[default]
    Stopped,
}

impl Direction {
    /// Sign of the direction (+1, -1, 0)
    pub fn signum(self) -> f32 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
            Direction::Stopped => 0.0,
        }
    }

    /// Integer code used on the plotter stream (1, -1, 0)
    pub fn code(self) -> i8 {
        self.signum() as i8
    }

    /// Single-letter label for the display
    pub fn label(self) -> &'static str {
        match self {
            Direction::Forward => "F",
            Direction::Backward => "B",
            Direction::Stopped => "S",
        }
    }
}

/// Result of one sampling window
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VelocityEstimate {
    /// Unfiltered speed magnitude (RPM)
    pub raw_rpm: f32,
    /// Low-pass filtered speed magnitude (RPM)
    pub filtered_rpm: f32,
    pub direction: Direction,
}

impl VelocityEstimate {
    /// Filtered speed with the direction sign applied
    pub fn signed_rpm(&self) -> f32 {
        self.filtered_rpm * self.direction.signum()
    }
}

/// Rejected samples; the estimator state is left unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EstimateError {
    /// Window shorter than the configured minimum
    IntervalTooShort,
    /// Pulses per revolution was zero
    InvalidResolution,
}

/// Per-channel velocity estimator with EWMA smoothing
#[derive(Debug, Clone)]
pub struct VelocityEstimator {
    alpha: f32,
    inverted: bool,
    min_interval_us: u32,
    estimate: VelocityEstimate,
}

impl VelocityEstimator {
    /// Create an estimator
    ///
    /// `alpha` is clamped into (0, 1]; a non-finite value falls back to 1
    /// (no smoothing).
    pub fn new(alpha: f32, inverted: bool, min_interval_us: u32) -> Self {
        let alpha = if alpha.is_finite() && alpha > 0.0 {
            alpha.min(1.0)
        } else {
            1.0
        };
        Self {
            alpha,
            inverted,
            min_interval_us,
            estimate: VelocityEstimate::default(),
        }
    }

    /// Smoothing factor in use
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Check whether a window of this length would be accepted
    pub fn accepts(&self, elapsed_us: u32) -> bool {
        elapsed_us > 0 && elapsed_us >= self.min_interval_us
    }

    /// Fold one window into the estimate
    ///
    /// Zero pulses always read as stopped with a raw speed of 0, even over a
    /// window too short to estimate from; such a window leaves the filter
    /// untouched.
    pub fn sample(
        &mut self,
        pulses: i32,
        elapsed_us: u32,
        pulses_per_rev: u16,
    ) -> Result<VelocityEstimate, EstimateError> {
        if pulses_per_rev == 0 {
            return Err(EstimateError::InvalidResolution);
        }
        if !self.accepts(elapsed_us) {
            if pulses != 0 {
                return Err(EstimateError::IntervalTooShort);
            }
            self.estimate.raw_rpm = 0.0;
            self.estimate.direction = Direction::Stopped;
            return Ok(self.estimate);
        }

        let raw_rpm = if pulses == 0 {
            0.0
        } else {
            // f64 keeps the product exact for any realistic window
            let num = pulses.unsigned_abs() as f64 * 60_000_000.0;
            let den = pulses_per_rev as f64 * elapsed_us as f64;
            (num / den) as f32
        };

        let direction = match (pulses.signum(), self.inverted) {
            (0, _) => Direction::Stopped,
            (1, false) | (-1, true) => Direction::Forward,
            _ => Direction::Backward,
        };

        let filtered_rpm = self.alpha * raw_rpm + (1.0 - self.alpha) * self.estimate.filtered_rpm;

        self.estimate = VelocityEstimate {
            raw_rpm,
            filtered_rpm,
            direction,
        };
        Ok(self.estimate)
    }

    /// Latest accepted estimate
    pub fn estimate(&self) -> VelocityEstimate {
        self.estimate
    }

    /// Clear the filter state
    pub fn reset(&mut self) {
        self.estimate = VelocityEstimate::default();
    }
}
