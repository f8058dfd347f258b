//! Page implementations
//!
//! Each page follows the same cycle: `update` copies what it needs from the
//! current [`PageContext`], `render` formats it, `on_input` reacts to the page
//! button. [`PageSet`] owns the pages and switches between them.

use core::fmt;

use super::Screen;
use crate::control::{TelemetrySnapshot, WHEELS};
use crate::encoder::Direction;
use crate::traits::Attitude;

/// Inputs routed to pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PageInput {
    /// Switch to the next page
    Next,
    /// Page-local action
    Select,
}

/// Everything a page may show
#[derive(Debug, Clone, Copy, Default)]
pub struct PageContext {
    pub telemetry: TelemetrySnapshot,
    pub attitude: Attitude,
    /// Whether the run gate is open
    pub running: bool,
}

/// A display page
pub trait Page {
    fn title(&self) -> &'static str;

    /// Take a copy of the data to show
    fn update(&mut self, ctx: &PageContext);

    /// Format the page into `screen`
    fn render(&self, screen: &mut Screen) -> fmt::Result;

    /// Handle an input; returns true if the page consumed it
    fn on_input(&mut self, _input: PageInput) -> bool {
        false
    }
}

/// Per-wheel duty, speed and direction
#[derive(Debug, Default)]
pub struct MotorPage {
    wheels: [(i16, f32, Direction); WHEELS],
    target: f32,
    running: bool,
}

impl Page for MotorPage {
    fn title(&self) -> &'static str {
        "Motors"
    }

    fn update(&mut self, ctx: &PageContext) {
        for (slot, wheel) in self.wheels.iter_mut().zip(ctx.telemetry.wheels.iter()) {
            *slot = (wheel.duty, wheel.rpm, wheel.direction);
        }
        self.target = ctx.telemetry.target_rpm;
        self.running = ctx.running;
    }

    fn render(&self, screen: &mut Screen) -> fmt::Result {
        screen.clear();
        screen.set_title(self.title());
        for (i, (duty, rpm, dir)) in self.wheels.iter().enumerate() {
            screen.push_line(format_args!("M{} {:>4} {:>6.1} {}", i + 1, duty, rpm, dir.label()))?;
        }
        let state = if self.running { "RUN" } else { "STOP" };
        screen.push_line(format_args!("T:{:.0} {}", self.target, state))
    }
}

/// Gain selected on the debug page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParamCursor {
    #[default]
    None,
    Kp,
    Ki,
    Kd,
}

impl ParamCursor {
    fn next(self) -> Self {
        match self {
            ParamCursor::None => ParamCursor::Kp,
            ParamCursor::Kp => ParamCursor::Ki,
            ParamCursor::Ki => ParamCursor::Kd,
            ParamCursor::Kd => ParamCursor::None,
        }
    }

    fn marker(self, at: ParamCursor) -> char {
        if self == at {
            '>'
        } else {
            ' '
        }
    }
}

/// Target, measurement, output and gains with a parameter cursor
#[derive(Debug, Default)]
pub struct DebugPage {
    telemetry: TelemetrySnapshot,
    cursor: ParamCursor,
}

impl DebugPage {
    pub fn cursor(&self) -> ParamCursor {
        self.cursor
    }
}

impl Page for DebugPage {
    fn title(&self) -> &'static str {
        "PID Debug"
    }

    fn update(&mut self, ctx: &PageContext) {
        self.telemetry = ctx.telemetry;
    }

    fn render(&self, screen: &mut Screen) -> fmt::Result {
        let t = &self.telemetry;
        let c = self.cursor;
        screen.clear();
        screen.set_title(self.title());
        screen.push_line(format_args!("T:{:.0} C:{:.0}", t.target_rpm, t.measured_rpm))?;
        screen.push_line(format_args!("Out:{:.0} Err:{:.0}", t.output, t.error()))?;
        screen.push_line(format_args!(
            "{}P{:.2}{}I{:.2}{}D{:.2}",
            c.marker(ParamCursor::Kp),
            t.gains.kp,
            c.marker(ParamCursor::Ki),
            t.gains.ki,
            c.marker(ParamCursor::Kd),
            t.gains.kd
        ))
    }

    fn on_input(&mut self, input: PageInput) -> bool {
        match input {
            PageInput::Select => {
                self.cursor = self.cursor.next();
                true
            }
            PageInput::Next => false,
        }
    }
}

/// Yaw, pitch and roll in degrees
#[derive(Debug, Default)]
pub struct AttitudePage {
    degrees: [f32; 3],
}

impl Page for AttitudePage {
    fn title(&self) -> &'static str {
        "Attitude"
    }

    fn update(&mut self, ctx: &PageContext) {
        self.degrees = ctx.attitude.degrees();
    }

    fn render(&self, screen: &mut Screen) -> fmt::Result {
        let [yaw, pitch, roll] = self.degrees;
        screen.clear();
        screen.set_title(self.title());
        screen.push_line(format_args!("Yaw:   {:>7.1}", yaw))?;
        screen.push_line(format_args!("Pitch: {:>7.1}", pitch))?;
        screen.push_line(format_args!("Roll:  {:>7.1}", roll))
    }
}

/// The page carousel
#[derive(Debug, Default)]
pub struct PageSet {
    motor: MotorPage,
    debug: DebugPage,
    attitude: AttitudePage,
    active: usize,
}

impl PageSet {
    const COUNT: usize = 3;

    pub fn new() -> Self {
        Self::default()
    }

    /// Currently shown page
    pub fn active(&self) -> &dyn Page {
        match self.active {
            0 => &self.motor,
            1 => &self.debug,
            _ => &self.attitude,
        }
    }

    fn active_mut(&mut self) -> &mut dyn Page {
        match self.active {
            0 => &mut self.motor,
            1 => &mut self.debug,
            _ => &mut self.attitude,
        }
    }

    /// Route an input: the active page first, then page switching
    pub fn on_input(&mut self, input: PageInput) {
        if self.active_mut().on_input(input) {
            return;
        }
        if input == PageInput::Next {
            self.active = (self.active + 1) % Self::COUNT;
        }
    }

    /// Update and render the active page
    pub fn refresh(&mut self, ctx: &PageContext, screen: &mut Screen) -> fmt::Result {
        let page = self.active_mut();
        page.update(ctx);
        page.render(screen)
    }

    pub fn debug(&self) -> &DebugPage {
        &self.debug
    }
}
