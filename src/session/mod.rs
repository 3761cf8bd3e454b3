//! Screen lock state machine.
//!
//! ```text
//! Locked --request_show--> Authenticating --pin accepted--> Unlocked
//!   ^                          |                              |  |
//!   +------- dismissed --------+                              |  |
//!   +------------- idle expiry / hide ------------------------+  |
//!                                       Terminated <--exit-------+
//! ```
//!
//! The controller is owned by the UI thread and never reads the clock
//! itself; every operation takes the current [`Instant`].

mod idle;
mod pin;

use std::time::{Duration, Instant};

use crate::config::SessionSettings;

pub use idle::IdleTimer;
pub use pin::{PIN_LENGTH, PinFeedback, PinKey, PinOutcome, PinPad, PinTimings};

/// Lifecycle state of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Locked,
    Authenticating(PinPad),
    Unlocked,
    Terminated,
}

/// Observable change produced by a controller call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    PinPadOpened,
    Unlocked,
    Dismissed,
    /// Idle expiry or an explicit hide.
    Locked(LockReason),
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockReason {
    Idle,
    Hidden,
}

/// PIN lock with idle auto-lock.
#[derive(Debug, Clone)]
pub struct SessionController {
    state: SessionState,
    pin: String,
    timings: PinTimings,
    idle: IdleTimer,
    last_activity_at: Instant,
}

impl SessionController {
    /// Start locked and hidden.
    pub fn new(settings: &SessionSettings, now: Instant) -> Self {
        Self {
            state: SessionState::Locked,
            pin: settings.pin.clone(),
            timings: PinTimings::from(settings),
            idle: IdleTimer::new(settings.idle_timeout()),
            last_activity_at: now,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Unlocked)
    }

    /// Whether the main window is shown. The PIN pad is not the main window.
    pub fn is_visible(&self) -> bool {
        matches!(self.state, SessionState::Unlocked)
    }

    pub fn idle_timer_armed(&self) -> bool {
        self.idle.is_armed()
    }

    pub fn last_activity_at(&self) -> Instant {
        self.last_activity_at
    }

    pub fn pin_pad(&self) -> Option<&PinPad> {
        match &self.state {
            SessionState::Authenticating(pad) => Some(pad),
            _ => None,
        }
    }

    /// Time left before the idle lock fires.
    pub fn idle_remaining(&self, now: Instant) -> Option<Duration> {
        self.idle
            .deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Earliest instant at which [`SessionController::tick`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match &self.state {
            SessionState::Authenticating(pad) => pad.next_deadline(),
            SessionState::Unlocked => self.idle.deadline(),
            _ => None,
        }
    }

    /// Tray click or any other request to bring the window up.
    pub fn request_show(&mut self) -> Option<Transition> {
        match self.state {
            SessionState::Locked => {
                self.state =
                    SessionState::Authenticating(PinPad::new(self.pin.clone(), self.timings));
                Some(Transition::PinPadOpened)
            }
            _ => None,
        }
    }

    /// Feed a key to the PIN pad.
    pub fn press_key(&mut self, key: PinKey, now: Instant) -> Option<Transition> {
        let SessionState::Authenticating(pad) = &mut self.state else {
            return None;
        };
        let outcome = pad.press(key, now);
        self.apply_pin_outcome(outcome, now)
    }

    /// Closing the PIN dialog without unlocking.
    pub fn dismiss(&mut self) -> Option<Transition> {
        match self.state {
            SessionState::Authenticating(_) => {
                self.state = SessionState::Locked;
                Some(Transition::Dismissed)
            }
            _ => None,
        }
    }

    /// Input seen while unlocked. Restarts the idle countdown unless the
    /// deadline has already passed; the next tick locks in that case.
    pub fn record_activity(&mut self, now: Instant) {
        if matches!(self.state, SessionState::Unlocked) && !self.idle.expired(now) {
            self.last_activity_at = now;
            self.idle.arm(now);
        }
    }

    /// Hide to tray. Same effect as an idle expiry.
    pub fn hide(&mut self) -> Option<Transition> {
        self.lock(LockReason::Hidden)
    }

    pub fn request_exit(&mut self) -> Option<Transition> {
        match self.state {
            SessionState::Unlocked => {
                self.idle.disarm();
                self.state = SessionState::Terminated;
                Some(Transition::Terminated)
            }
            _ => None,
        }
    }

    /// Advance timers. Call on every frame and when a deadline passes.
    pub fn tick(&mut self, now: Instant) -> Option<Transition> {
        match &mut self.state {
            SessionState::Authenticating(pad) => {
                let outcome = pad.tick(now);
                self.apply_pin_outcome(outcome, now)
            }
            SessionState::Unlocked if self.idle.expired(now) => self.lock(LockReason::Idle),
            _ => None,
        }
    }

    fn apply_pin_outcome(&mut self, outcome: PinOutcome, now: Instant) -> Option<Transition> {
        match outcome {
            PinOutcome::Pending => None,
            PinOutcome::Dismissed => self.dismiss(),
            PinOutcome::Accepted => {
                self.state = SessionState::Unlocked;
                self.last_activity_at = now;
                self.idle.arm(now);
                Some(Transition::Unlocked)
            }
        }
    }

    fn lock(&mut self, reason: LockReason) -> Option<Transition> {
        match self.state {
            SessionState::Unlocked => {
                self.idle.disarm();
                self.state = SessionState::Locked;
                Some(Transition::Locked(reason))
            }
            _ => None,
        }
    }
}
