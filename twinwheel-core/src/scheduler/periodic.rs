//! Drift-free periodic timer
//!
//! Deadlines are multiples of the period from the start time, so a late
//! poll never shifts later deadlines. When a poll comes more than one period
//! late, the missed deadlines are counted as overruns and skipped instead of
//! being replayed back to back.

/// Periodic deadline tracker (microsecond time base)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeriodicTimer {
    period_us: u64,
    next_due_us: u64,
    overruns: u32,
}

impl PeriodicTimer {
    /// Create a timer whose first deadline is one period after `start_us`
    ///
    /// A zero period is raised to 1 µs.
    pub const fn new(period_us: u64, start_us: u64) -> Self {
        let period_us = if period_us == 0 { 1 } else { period_us };
        Self {
            period_us,
            next_due_us: start_us + period_us,
            overruns: 0,
        }
    }

    pub fn period_us(&self) -> u64 {
        self.period_us
    }

    /// Next deadline
    pub fn next_due_us(&self) -> u64 {
        self.next_due_us
    }

    /// Deadlines skipped because the timer was polled too late
    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    /// Check whether the deadline has passed without consuming it
    pub fn is_due(&self, now_us: u64) -> bool {
        now_us >= self.next_due_us
    }

    /// Consume the current deadline if it has passed
    pub fn poll(&mut self, now_us: u64) -> bool {
        if !self.is_due(now_us) {
            return false;
        }
        self.next_due_us += self.period_us;
        if now_us >= self.next_due_us {
            let missed = (now_us - self.next_due_us) / self.period_us + 1;
            self.overruns = self.overruns.saturating_add(missed.min(u32::MAX as u64) as u32);
            self.next_due_us += missed * self.period_us;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_on_period_boundaries() {
        let mut timer = PeriodicTimer::new(10_000, 0);
        assert!(!timer.poll(9_999));
        assert!(timer.poll(10_000));
        assert!(!timer.poll(10_001));
        assert!(timer.poll(20_000));
    }

    #[test]
    fn test_late_poll_does_not_drift() {
        let mut timer = PeriodicTimer::new(10_000, 0);
        assert!(timer.poll(13_000));
        // Next deadline is still on the grid
        assert_eq!(timer.next_due_us(), 20_000);
        assert_eq!(timer.overruns(), 0);
    }

    #[test]
    fn test_overrun_skips_missed_deadlines() {
        let mut timer = PeriodicTimer::new(10_000, 0);
        assert!(timer.poll(35_000));
        assert_eq!(timer.overruns(), 2);
        assert_eq!(timer.next_due_us(), 40_000);
        assert!(!timer.poll(39_999));
    }

    #[test]
    fn test_zero_period_raised() {
        let timer = PeriodicTimer::new(0, 5);
        assert_eq!(timer.period_us(), 1);
        assert_eq!(timer.next_due_us(), 6);
    }
}
