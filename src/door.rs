use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::mpsc;

use crate::gpio::{DoorIo, LimitSensor, Relay};
use crate::messages::{ControllerMessage, PIN_LED_EXTEND, PIN_LED_RETRACT};
use crate::schedule::{Schedule, TimeOfDay};

/// Maximum travel time per direction before the safety cutoff disengages
/// both relays. The sole safety net against a jammed actuator.
pub const MAX_TRAVEL: Duration = Duration::from_secs(45);

/// Retract travel ends at the "closed" limit switch; the wiring of this rig
/// maps the retract direction to the closed notification and extend to the
/// opened one. Keep the mapping as wired.
pub const NOTIFY_CLOSED: &str = "Chicken coop Closed!";
pub const NOTIFY_OPENED: &str = "Chicken coop Opened!";
pub const NOTIFY_TRAVEL_FAULT: &str = "Chicken coop door fault: travel limit hit, relays disengaged";

/// Door travel state, derived from the relay flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorState {
    Idle,
    Retracting,
    Extending,
}

/// Label shown on the dashboard LCD, derived from whichever daily trigger
/// fired last. Nothing is shown before the first transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorLabel {
    Open,
    Closed,
}

impl DoorLabel {
    pub fn text(self) -> &'static str {
        match self {
            DoorLabel::Open => "OPEN",
            DoorLabel::Closed => "CLOSED",
        }
    }

    /// LCD column centering the label on a 16-column row.
    pub fn column(self) -> u8 {
        match self {
            DoorLabel::Open => 6,
            DoorLabel::Closed => 5,
        }
    }
}

/// Door controller: drives the two actuator relays from the daily schedule,
/// the limit sensors and remote commands, and pushes notifications and
/// indicator updates onto the outbound dashboard channel.
pub struct DoorController<I: DoorIo> {
    io: I,
    schedule: Schedule,
    /// Latch set when the morning open trigger fires; cleared by the night
    /// trigger. Prevents re-triggering within the matching minute.
    morning_open: bool,
    /// Latch set when the night close trigger fires; cleared by the morning
    /// trigger.
    night_close: bool,
    retract_on: bool,
    extend_on: bool,
    retract_started: Option<Instant>,
    extend_started: Option<Instant>,
    outbound: mpsc::UnboundedSender<ControllerMessage>,
}

impl<I: DoorIo> DoorController<I> {
    pub fn new(io: I, schedule: Schedule, outbound: mpsc::UnboundedSender<ControllerMessage>) -> Self {
        Self {
            io,
            schedule,
            morning_open: false,
            night_close: false,
            retract_on: false,
            extend_on: false,
            retract_started: None,
            extend_started: None,
            outbound,
        }
    }

    pub fn state(&self) -> DoorState {
        if self.retract_on {
            DoorState::Retracting
        } else if self.extend_on {
            DoorState::Extending
        } else {
            DoorState::Idle
        }
    }

    pub fn door_label(&self) -> Option<DoorLabel> {
        if self.morning_open {
            Some(DoorLabel::Open)
        } else if self.night_close {
            Some(DoorLabel::Closed)
        } else {
            None
        }
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    pub fn set_schedule(&mut self, schedule: Schedule) {
        self.schedule = schedule;
    }

    /// One pass of the polling loop: fire due schedule triggers, stop on an
    /// active limit sensor, enforce the travel ceiling.
    pub fn tick(&mut self, wall: TimeOfDay, now: Instant) -> Result<()> {
        if self.schedule.open_due(wall) && !self.morning_open {
            self.morning_open = true;
            self.night_close = false;
            tracing::info!("open time {} reached", self.schedule.open);
            self.start_retract(now)?;
        }
        if self.schedule.close_due(wall) && !self.night_close {
            self.night_close = true;
            self.morning_open = false;
            tracing::info!("close time {} reached", self.schedule.close);
            self.start_extend(now)?;
        }

        // A sensor stop only fires while its relay is energized, so a switch
        // already resting at the active position cannot produce spurious
        // stops from idle.
        if self.retract_on && self.io.sensor_active(LimitSensor::Open)? {
            self.stop_retract()?;
        }
        if self.extend_on && self.io.sensor_active(LimitSensor::Close)? {
            self.stop_extend()?;
        }

        if self.retract_on {
            if let Some(started) = self.retract_started {
                let elapsed = now.duration_since(started);
                tracing::debug!("retract elapsed: {:?}", elapsed);
                if elapsed >= MAX_TRAVEL {
                    self.travel_fault("retract")?;
                }
            }
        }
        if self.extend_on {
            if let Some(started) = self.extend_started {
                let elapsed = now.duration_since(started);
                tracing::debug!("extend elapsed: {:?}", elapsed);
                if elapsed >= MAX_TRAVEL {
                    self.travel_fault("extend")?;
                }
            }
        }

        Ok(())
    }

    /// Energize the retract relay (door travels toward open). Refused while
    /// the extend relay is on: at most one relay may be energized at a time.
    pub fn start_retract(&mut self, now: Instant) -> Result<()> {
        if self.extend_on {
            tracing::warn!("not retracting: extend relay is energized");
            return Ok(());
        }
        if self.retract_on {
            tracing::debug!("already retracting");
            return Ok(());
        }
        self.io.set_relay(Relay::Retract, true)?;
        self.retract_on = true;
        self.retract_started = Some(now);
        self.send(ControllerMessage::Led {
            pin: PIN_LED_RETRACT,
            on: true,
        });
        tracing::info!("retract started (door opening)");
        Ok(())
    }

    /// Energize the extend relay (door travels toward closed); same
    /// one-relay-at-a-time rule as [`Self::start_retract`].
    pub fn start_extend(&mut self, now: Instant) -> Result<()> {
        if self.retract_on {
            tracing::warn!("not extending: retract relay is energized");
            return Ok(());
        }
        if self.extend_on {
            tracing::debug!("already extending");
            return Ok(());
        }
        self.io.set_relay(Relay::Extend, true)?;
        self.extend_on = true;
        self.extend_started = Some(now);
        self.send(ControllerMessage::Led {
            pin: PIN_LED_EXTEND,
            on: true,
        });
        tracing::info!("extend started (door closing)");
        Ok(())
    }

    /// Force both relays off unconditionally. Used by the remote reset
    /// command to recover from a stuck or ambiguous state; sends no
    /// notification.
    pub fn halt(&mut self) -> Result<()> {
        self.io.set_relay(Relay::Retract, false)?;
        self.io.set_relay(Relay::Extend, false)?;
        self.retract_on = false;
        self.extend_on = false;
        self.retract_started = None;
        self.extend_started = None;
        self.send(ControllerMessage::Led {
            pin: PIN_LED_RETRACT,
            on: false,
        });
        self.send(ControllerMessage::Led {
            pin: PIN_LED_EXTEND,
            on: false,
        });
        Ok(())
    }

    fn stop_retract(&mut self) -> Result<()> {
        self.io.set_relay(Relay::Retract, false)?;
        self.retract_on = false;
        self.retract_started = None;
        self.send(ControllerMessage::Led {
            pin: PIN_LED_RETRACT,
            on: false,
        });
        self.send(ControllerMessage::Notify {
            message: NOTIFY_CLOSED.to_string(),
        });
        tracing::info!("retract stopped at limit switch");
        Ok(())
    }

    fn stop_extend(&mut self) -> Result<()> {
        self.io.set_relay(Relay::Extend, false)?;
        self.extend_on = false;
        self.extend_started = None;
        self.send(ControllerMessage::Led {
            pin: PIN_LED_EXTEND,
            on: false,
        });
        self.send(ControllerMessage::Notify {
            message: NOTIFY_OPENED.to_string(),
        });
        tracing::info!("extend stopped at limit switch");
        Ok(())
    }

    /// Travel ceiling hit: disengage both relays and report a fault rather
    /// than a normal stop.
    fn travel_fault(&mut self, direction: &str) -> Result<()> {
        tracing::warn!(
            "{} ran for {}s without reaching a limit switch, disengaging relays",
            direction,
            MAX_TRAVEL.as_secs()
        );
        self.halt()?;
        self.send(ControllerMessage::Notify {
            message: NOTIFY_TRAVEL_FAULT.to_string(),
        });
        Ok(())
    }

    fn send(&self, message: ControllerMessage) {
        // Dropped only during shutdown, when the dashboard half is gone.
        let _ = self.outbound.send(message);
    }

    #[cfg(test)]
    pub(crate) fn io_mut(&mut self) -> &mut I {
        &mut self.io
    }
}
