use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schedule::TimeOfDay;

/// Virtual pin layout on the dashboard. V0-V2 and V6-V7 carry inbound
/// commands; V3-V5 address the outbound indicator and LCD widgets.
pub const PIN_MANUAL_CLOSE: u8 = 0;
pub const PIN_MANUAL_OPEN: u8 = 1;
pub const PIN_RESET: u8 = 2;
pub const PIN_LED_EXTEND: u8 = 3;
pub const PIN_LED_RETRACT: u8 = 4;
pub const PIN_OPEN_TIME: u8 = 6;
pub const PIN_CLOSE_TIME: u8 = 7;

/// Dashboard-to-controller messages
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardMessage {
    /// A virtual pin written on the dashboard (button press, time widget).
    PinWrite { pin: u8, value: i64 },
    /// No operation (keep-alive)
    Noop,
}

/// Controller-to-dashboard messages
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerMessage {
    /// Sent once after connecting, before anything else.
    Auth { token: String, version: String },
    /// Push notification to the dashboard owner.
    Notify { message: String },
    /// Clear the LCD widget (V5).
    LcdClear,
    /// Render text on the LCD widget (V5) at the given cell.
    LcdPrint { column: u8, row: u8, text: String },
    /// Switch a LED widget (V3/V4) on or off.
    Led { pin: u8, on: bool },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("no command is mapped to virtual pin V{0}")]
    UnknownPin(u8),
    #[error("time of day {0} is outside 0..86400 seconds since midnight")]
    TimeOutOfRange(i64),
}

/// A decoded remote command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ManualOpen,
    ManualClose,
    Reset,
    SetOpenTime(TimeOfDay),
    SetCloseTime(TimeOfDay),
    /// A button release (zero-value write); nothing to do.
    Ignored,
}

impl Command {
    /// Map a virtual pin write onto a command. The manual buttons only
    /// trigger on a non-zero value (press, not release); reset fires on any
    /// value; the time widgets carry seconds since midnight and are range
    /// checked before they can reach the schedule.
    pub fn from_pin_write(pin: u8, value: i64) -> Result<Self, CommandError> {
        match pin {
            PIN_MANUAL_CLOSE if value != 0 => Ok(Command::ManualClose),
            PIN_MANUAL_OPEN if value != 0 => Ok(Command::ManualOpen),
            PIN_MANUAL_CLOSE | PIN_MANUAL_OPEN => Ok(Command::Ignored),
            PIN_RESET => Ok(Command::Reset),
            PIN_OPEN_TIME => TimeOfDay::from_day_seconds(value)
                .map(Command::SetOpenTime)
                .ok_or(CommandError::TimeOutOfRange(value)),
            PIN_CLOSE_TIME => TimeOfDay::from_day_seconds(value)
                .map(Command::SetCloseTime)
                .ok_or(CommandError::TimeOutOfRange(value)),
            other => Err(CommandError::UnknownPin(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_manual_buttons_on_press_only() {
        assert_eq!(
            Command::from_pin_write(PIN_MANUAL_OPEN, 1),
            Ok(Command::ManualOpen)
        );
        assert_eq!(
            Command::from_pin_write(PIN_MANUAL_OPEN, 0),
            Ok(Command::Ignored)
        );
        assert_eq!(
            Command::from_pin_write(PIN_MANUAL_CLOSE, 1),
            Ok(Command::ManualClose)
        );
        assert_eq!(
            Command::from_pin_write(PIN_MANUAL_CLOSE, 0),
            Ok(Command::Ignored)
        );
    }

    #[test]
    fn reset_fires_on_any_value() {
        assert_eq!(Command::from_pin_write(PIN_RESET, 0), Ok(Command::Reset));
        assert_eq!(Command::from_pin_write(PIN_RESET, 1), Ok(Command::Reset));
    }

    #[test]
    fn decodes_time_widgets() {
        assert_eq!(
            Command::from_pin_write(PIN_OPEN_TIME, 25_200),
            Ok(Command::SetOpenTime(TimeOfDay::new(7, 0)))
        );
        assert_eq!(
            Command::from_pin_write(PIN_CLOSE_TIME, 70_200),
            Ok(Command::SetCloseTime(TimeOfDay::new(19, 30)))
        );
    }

    #[test]
    fn rejects_out_of_range_times() {
        assert_eq!(
            Command::from_pin_write(PIN_OPEN_TIME, 86_400),
            Err(CommandError::TimeOutOfRange(86_400))
        );
        assert_eq!(
            Command::from_pin_write(PIN_CLOSE_TIME, -5),
            Err(CommandError::TimeOutOfRange(-5))
        );
    }

    #[test]
    fn rejects_unknown_pins() {
        assert_eq!(
            Command::from_pin_write(12, 1),
            Err(CommandError::UnknownPin(12))
        );
        // The outbound widget pins carry no inbound commands either.
        assert_eq!(
            Command::from_pin_write(PIN_LED_EXTEND, 1),
            Err(CommandError::UnknownPin(PIN_LED_EXTEND))
        );
    }

    #[test]
    fn parses_pin_write_frames() {
        let frame: DashboardMessage =
            serde_json::from_str(r#"{"type":"pin_write","pin":6,"value":25200}"#).unwrap();
        match frame {
            DashboardMessage::PinWrite { pin, value } => {
                assert_eq!(pin, PIN_OPEN_TIME);
                assert_eq!(value, 25_200);
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn serializes_notifications() {
        let json = serde_json::to_string(&ControllerMessage::Notify {
            message: "Chicken coop Opened!".to_string(),
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"type":"notify","message":"Chicken coop Opened!"}"#
        );
    }
}
