use anyhow::{Context, Result};
use rppal::gpio::{Gpio, InputPin, OutputPin};

/// BCM pin driving the retract relay (door travels toward the open limit).
pub const RETRACT_RELAY_PIN: u8 = 2;
/// BCM pin driving the extend relay (door travels toward the close limit).
pub const EXTEND_RELAY_PIN: u8 = 3;
/// BCM pin of the limit switch reached at the end of retract travel.
pub const OPEN_LIMIT_PIN: u8 = 21;
/// BCM pin of the limit switch reached at the end of extend travel.
pub const CLOSE_LIMIT_PIN: u8 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relay {
    Retract,
    Extend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitSensor {
    /// End of retract travel.
    Open,
    /// End of extend travel.
    Close,
}

/// The digital I/O the door controller drives. Implemented by the rppal
/// wrapper on real hardware and by an in-memory double in tests.
pub trait DoorIo {
    fn set_relay(&mut self, relay: Relay, on: bool) -> Result<()>;
    fn sensor_active(&mut self, sensor: LimitSensor) -> Result<bool>;
}

/// Raspberry Pi GPIO implementation of [`DoorIo`].
pub struct RppalDoorIo {
    retract_relay: OutputPin,
    extend_relay: OutputPin,
    open_limit: InputPin,
    close_limit: InputPin,
}

impl RppalDoorIo {
    pub fn new() -> Result<Self> {
        let gpio = Gpio::new().context("Failed to acquire GPIO peripheral")?;

        let mut retract_relay = gpio
            .get(RETRACT_RELAY_PIN)
            .with_context(|| format!("Failed to claim retract relay pin {}", RETRACT_RELAY_PIN))?
            .into_output();
        let mut extend_relay = gpio
            .get(EXTEND_RELAY_PIN)
            .with_context(|| format!("Failed to claim extend relay pin {}", EXTEND_RELAY_PIN))?
            .into_output();
        let open_limit = gpio
            .get(OPEN_LIMIT_PIN)
            .with_context(|| format!("Failed to claim open limit pin {}", OPEN_LIMIT_PIN))?
            .into_input();
        let close_limit = gpio
            .get(CLOSE_LIMIT_PIN)
            .with_context(|| format!("Failed to claim close limit pin {}", CLOSE_LIMIT_PIN))?
            .into_input();

        // Both relays de-energized before the controller takes over.
        retract_relay.set_low();
        extend_relay.set_low();

        Ok(Self {
            retract_relay,
            extend_relay,
            open_limit,
            close_limit,
        })
    }
}

impl DoorIo for RppalDoorIo {
    fn set_relay(&mut self, relay: Relay, on: bool) -> Result<()> {
        let pin = match relay {
            Relay::Retract => &mut self.retract_relay,
            Relay::Extend => &mut self.extend_relay,
        };
        if on {
            pin.set_high();
        } else {
            pin.set_low();
        }
        Ok(())
    }

    fn sensor_active(&mut self, sensor: LimitSensor) -> Result<bool> {
        let pin = match sensor {
            LimitSensor::Open => &self.open_limit,
            LimitSensor::Close => &self.close_limit,
        };
        Ok(pin.is_high())
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;

    /// In-memory [`DoorIo`] double recording relay levels and replaying
    /// scripted sensor readings.
    #[derive(Debug, Default)]
    pub struct MockIo {
        pub retract_relay: bool,
        pub extend_relay: bool,
        pub open_limit: bool,
        pub close_limit: bool,
    }

    impl DoorIo for MockIo {
        fn set_relay(&mut self, relay: Relay, on: bool) -> Result<()> {
            match relay {
                Relay::Retract => self.retract_relay = on,
                Relay::Extend => self.extend_relay = on,
            }
            Ok(())
        }

        fn sensor_active(&mut self, sensor: LimitSensor) -> Result<bool> {
            Ok(match sensor {
                LimitSensor::Open => self.open_limit,
                LimitSensor::Close => self.close_limit,
            })
        }
    }
}
