use tokio::sync::mpsc;

use crate::door::DoorLabel;
use crate::messages::ControllerMessage;
use crate::schedule::Schedule;

/// Ticks between renders; at the 250 ms loop interval this is once a second.
const RENDER_EVERY_TICKS: u64 = 4;

/// Re-renders the door label and schedule line onto the dashboard LCD widget
/// once a second, gated by a modulo check on the loop tick counter, and
/// echoes the same line to the log. Never blocks: everything goes through
/// the outbound channel.
pub struct StatusReporter {
    ticks: u64,
    outbound: mpsc::UnboundedSender<ControllerMessage>,
}

impl StatusReporter {
    pub fn new(outbound: mpsc::UnboundedSender<ControllerMessage>) -> Self {
        Self { ticks: 0, outbound }
    }

    pub fn tick(&mut self, label: Option<DoorLabel>, schedule: Schedule) {
        self.ticks = self.ticks.wrapping_add(1);
        if self.ticks % RENDER_EVERY_TICKS != 0 {
            return;
        }

        let _ = self.outbound.send(ControllerMessage::LcdClear);
        if let Some(label) = label {
            let _ = self.outbound.send(ControllerMessage::LcdPrint {
                column: label.column(),
                row: 0,
                text: label.text().to_string(),
            });
        }
        let line = schedule.to_string();
        let _ = self.outbound.send(ControllerMessage::LcdPrint {
            column: 3,
            row: 1,
            text: line.clone(),
        });

        tracing::info!(
            "door {} | schedule {}",
            label.map(DoorLabel::text).unwrap_or("-"),
            line
        );
    }
}
