//! Stage ordering
//!
//! Each stage has its own [`PeriodicTimer`]. A poll returns the due stages in
//! a fixed order (sampling, control, telemetry, display), so a sample that
//! falls due together with a control step is always taken first. Control is
//! held back until the first sampling window has been handed out.

use heapless::Vec;

use super::periodic::PeriodicTimer;
use crate::config::PeriodConfig;

/// Number of stages
pub const STAGE_COUNT: usize = 4;

/// Periodic activities, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage {
    Sample,
    Control,
    Telemetry,
    Display,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Stage; STAGE_COUNT] = [Stage::Sample, Stage::Control, Stage::Telemetry, Stage::Display];

    fn slot(self) -> usize {
        self as usize
    }

    fn period_ms(self, periods: &PeriodConfig) -> u32 {
        match self {
            Stage::Sample => periods.sample_ms,
            Stage::Control => periods.control_ms,
            Stage::Telemetry => periods.telemetry_ms,
            Stage::Display => periods.display_ms,
        }
    }
}

/// Stages due in one poll, in execution order
pub type DueStages = Vec<Stage, STAGE_COUNT>;

/// Cooperative scheduler for a subset of the stages
#[derive(Debug, Clone)]
pub struct StageScheduler {
    timers: [Option<PeriodicTimer>; STAGE_COUNT],
    sampled: bool,
}

impl StageScheduler {
    /// Schedule `stages` with their configured periods, starting at `start_us`
    ///
    /// If [`Stage::Control`] is scheduled without [`Stage::Sample`], the
    /// sampling gate is considered open from the start.
    pub fn new(periods: &PeriodConfig, stages: &[Stage], start_us: u64) -> Self {
        let mut timers = [None; STAGE_COUNT];
        for &stage in stages {
            let period_us = stage.period_ms(periods) as u64 * 1_000;
            timers[stage.slot()] = Some(PeriodicTimer::new(period_us, start_us));
        }
        let sampled = timers[Stage::Sample.slot()].is_none();
        Self { timers, sampled }
    }

    /// Collect the stages whose deadline has passed
    ///
    /// A control deadline reached before the first sample is consumed but
    /// not returned.
    pub fn poll(&mut self, now_us: u64) -> DueStages {
        let mut due = DueStages::new();
        for stage in Stage::ALL {
            let Some(timer) = self.timers[stage.slot()].as_mut() else {
                continue;
            };
            if !timer.poll(now_us) {
                continue;
            }
            match stage {
                Stage::Sample => self.sampled = true,
                Stage::Control if !self.sampled => continue,
                _ => {}
            }
            // Capacity equals the stage count
            let _ = due.push(stage);
        }
        due
    }

    /// Earliest pending deadline across the scheduled stages
    pub fn next_deadline_us(&self) -> Option<u64> {
        self.timers.iter().flatten().map(|t| t.next_due_us()).min()
    }

    /// Overruns recorded for a stage (0 if not scheduled)
    pub fn overruns(&self, stage: Stage) -> u32 {
        self.timers[stage.slot()].map_or(0, |t| t.overruns())
    }
}
