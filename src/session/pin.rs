use std::time::{Duration, Instant};

use crate::config::SessionSettings;

/// Number of digits in an unlock PIN.
pub const PIN_LENGTH: usize = 4;

/// Delays applied by the PIN pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinTimings {
    /// Pause between the last digit and the comparison.
    pub check_delay: Duration,
    /// How long the success feedback stays up before unlocking.
    pub accept_delay: Duration,
    /// How long the error feedback stays up before the buffer clears.
    pub reject_delay: Duration,
}

impl From<&SessionSettings> for PinTimings {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            check_delay: settings.check_delay(),
            accept_delay: settings.accept_delay(),
            reject_delay: settings.reject_delay(),
        }
    }
}

/// Keyboard or keypad input accepted by the pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinKey {
    Digit(u8),
    /// Backspace or Delete. Clears the whole buffer.
    Clear,
    Enter,
    Escape,
}

/// Visual feedback the lock screen should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinFeedback {
    Neutral,
    Success,
    Error,
}

/// Result of feeding input or time into the pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinOutcome {
    Pending,
    Accepted,
    Dismissed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Entering,
    Checking { due: Instant },
    Accepted { until: Instant },
    Rejected { until: Instant },
}

/// Four-digit PIN entry with delayed checking and timed feedback.
///
/// The pad never sleeps. Callers pass the current time to
/// [`PinPad::press`] and [`PinPad::tick`], and schedule a repaint for
/// [`PinPad::next_deadline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinPad {
    expected: String,
    buffer: String,
    phase: Phase,
    timings: PinTimings,
}

impl PinPad {
    pub fn new(expected: impl Into<String>, timings: PinTimings) -> Self {
        Self {
            expected: expected.into(),
            buffer: String::with_capacity(PIN_LENGTH),
            phase: Phase::Entering,
            timings,
        }
    }

    /// Number of digits currently entered.
    pub fn entered(&self) -> usize {
        self.buffer.len()
    }

    pub fn feedback(&self) -> PinFeedback {
        match self.phase {
            Phase::Entering | Phase::Checking { .. } => PinFeedback::Neutral,
            Phase::Accepted { .. } => PinFeedback::Success,
            Phase::Rejected { .. } => PinFeedback::Error,
        }
    }

    /// Instant at which [`PinPad::tick`] will next change something.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Entering => None,
            Phase::Checking { due } => Some(due),
            Phase::Accepted { until } | Phase::Rejected { until } => Some(until),
        }
    }

    pub fn press(&mut self, key: PinKey, now: Instant) -> PinOutcome {
        if key == PinKey::Escape {
            return PinOutcome::Dismissed;
        }
        match (self.phase, key) {
            (Phase::Entering, PinKey::Digit(digit)) if digit <= 9 => {
                self.buffer.push(char::from(b'0' + digit));
                if self.buffer.len() == PIN_LENGTH {
                    self.phase = Phase::Checking {
                        due: now + self.timings.check_delay,
                    };
                }
            }
            (Phase::Entering, PinKey::Clear) => self.buffer.clear(),
            (Phase::Checking { .. }, PinKey::Enter) => self.check(now),
            (Phase::Checking { .. }, PinKey::Clear) => {
                self.buffer.clear();
                self.phase = Phase::Entering;
            }
            _ => {}
        }
        PinOutcome::Pending
    }

    /// Advance timed phases up to `now`.
    pub fn tick(&mut self, now: Instant) -> PinOutcome {
        if let Phase::Checking { due } = self.phase
            && now >= due
        {
            self.check(due);
        }
        match self.phase {
            Phase::Accepted { until } if now >= until => PinOutcome::Accepted,
            Phase::Rejected { until } if now >= until => {
                self.buffer.clear();
                self.phase = Phase::Entering;
                PinOutcome::Pending
            }
            _ => PinOutcome::Pending,
        }
    }

    fn check(&mut self, now: Instant) {
        self.phase = if self.buffer == self.expected {
            Phase::Accepted {
                until: now + self.timings.accept_delay,
            }
        } else {
            Phase::Rejected {
                until: now + self.timings.reject_delay,
            }
        };
    }
}
