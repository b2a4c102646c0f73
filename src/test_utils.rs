//! Recording doubles for the digital outputs and the delay provider.
//!
//! Every pin write and delay lands in one shared [`EventLog`], so a test can
//! check the exact order of the waveform the driver produced.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorKind, ErrorType, OutputPin};

use crate::config::ActuatorConfig;
use crate::driver::{ActuatorPins, PositionDriver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Enable,
    Step,
    Direction,
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    High(Line),
    Low(Line),
    DelayUs(u32),
    DelayMs(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinFault;

impl digital::Error for PinFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<Event>>>,
    failing: Rc<Cell<Option<Line>>>,
}

impl EventLog {
    fn push(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    pub fn count(&self, event: Event) -> usize {
        self.events.borrow().iter().filter(|e| **e == event).count()
    }

    /// Number of rising edges on the STEP line.
    pub fn pulses(&self) -> usize {
        self.count(Event::High(Line::Step))
    }

    /// Pulses emitted while DIR was held high.
    pub fn closing_pulses(&self) -> usize {
        let mut dir_high = false;
        let mut pulses = 0;
        for event in self.events.borrow().iter() {
            match event {
                Event::High(Line::Direction) => dir_high = true,
                Event::Low(Line::Direction) => dir_high = false,
                Event::High(Line::Step) if dir_high => pulses += 1,
                _ => {}
            }
        }
        pulses
    }

    /// Writes to `line` fail from now on.
    pub fn fail_line(&self, line: Line) {
        self.failing.set(Some(line));
    }

    pub fn heal(&self) {
        self.failing.set(None);
    }

    pub fn pin(&self, line: Line) -> RecordingPin {
        RecordingPin {
            line,
            log: self.clone(),
        }
    }

    pub fn pins(&self) -> ActuatorPins<RecordingPin> {
        ActuatorPins {
            enable: self.pin(Line::Enable),
            step: self.pin(Line::Step),
            direction: self.pin(Line::Direction),
            busy: self.pin(Line::Busy),
        }
    }

    pub fn delay(&self) -> RecordingDelay {
        RecordingDelay { log: self.clone() }
    }
}

pub struct RecordingPin {
    line: Line,
    log: EventLog,
}

impl RecordingPin {
    fn write(&mut self, event: Event) -> Result<(), PinFault> {
        if self.log.failing.get() == Some(self.line) {
            return Err(PinFault);
        }
        self.log.push(event);
        Ok(())
    }
}

impl ErrorType for RecordingPin {
    type Error = PinFault;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(Event::Low(self.line))
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(Event::High(self.line))
    }
}

pub struct RecordingDelay {
    log: EventLog,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.log.push(Event::DelayUs(ns / 1_000));
    }

    fn delay_us(&mut self, us: u32) {
        self.log.push(Event::DelayUs(us));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.log.push(Event::DelayMs(ms));
    }
}

/// 600 full steps, 32 microsteps, 0..=1000 scale.
pub fn reference_config() -> ActuatorConfig {
    ActuatorConfig {
        velocity: 100,
        microsteps: 32,
        total_steps: 600,
        overdrive_steps: 20,
        init_overdrive_steps: 60,
        high_time_us: 5,
        max_rel_position: 1000,
        holding_time_ms: 150,
    }
}

/// Short travel so waveform assertions stay readable.
pub fn small_config() -> ActuatorConfig {
    ActuatorConfig {
        velocity: 100,
        microsteps: 2,
        total_steps: 10,
        overdrive_steps: 2,
        init_overdrive_steps: 3,
        high_time_us: 5,
        max_rel_position: 100,
        holding_time_ms: 50,
    }
}

pub fn recording_driver(
    config: ActuatorConfig,
) -> (PositionDriver<RecordingPin, RecordingDelay>, EventLog) {
    let log = EventLog::default();
    let driver = match PositionDriver::new(config, log.pins(), log.delay()) {
        Ok(driver) => driver,
        Err(e) => panic!("test config rejected: {:?}", e),
    };
    log.clear();
    (driver, log)
}
