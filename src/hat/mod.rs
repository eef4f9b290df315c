// Hat module - drivers that stand in for the Sense HAT (8×8 LED matrix + joystick)
//
// A driver owns the sending half of the joystick channel and a receiver of the
// display channel, which only ever holds the latest frame. The controller
// starts it, publishes frames, and
// on shutdown calls `stop()` and waits until the joystick channel closes,
// which is the driver's acknowledgment that it released its resources.

mod terminal;

pub use terminal::TerminalHat;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot, watch};

use crate::events::{DisplayMessage, HatEvent};

/// Hardware driver lifecycle
pub trait Hat: Send {
    /// Begin reading input and drawing frames
    fn start(&mut self) -> Result<()>;

    /// Ask the driver to shut down; it answers by closing its event channel
    fn stop(&mut self);
}

/// Channels owned by a driver until its task ends
pub(crate) struct HatChannels {
    pub events: mpsc::Sender<HatEvent>,
    pub screen: watch::Receiver<DisplayMessage>,
}

/// Driver without input that only logs the frames it receives
pub struct HeadlessHat {
    channels: Option<HatChannels>,
    done: Option<oneshot::Sender<()>>,
}

impl HeadlessHat {
    pub fn new(events: mpsc::Sender<HatEvent>, screen: watch::Receiver<DisplayMessage>) -> Self {
        Self {
            channels: Some(HatChannels { events, screen }),
            done: None,
        }
    }
}

impl Hat for HeadlessHat {
    fn start(&mut self) -> Result<()> {
        let Some(HatChannels { events, mut screen }) = self.channels.take() else {
            return Ok(());
        };
        let (done_tx, mut done_rx) = oneshot::channel();
        self.done = Some(done_tx);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut done_rx => break,
                    changed = screen.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let frame = screen.borrow_and_update();
                        tracing::debug!(
                            "Display frame, cursor at ({}, {})",
                            frame.cursor_x,
                            frame.cursor_y
                        );
                    }
                }
            }
            // Closing the event channel tells the controller we are done
            drop(events);
            tracing::debug!("Headless display stopped");
        });

        Ok(())
    }

    fn stop(&mut self) {
        // Never started: dropping the channels is the whole shutdown
        self.channels = None;
        if let Some(done) = self.done.take() {
            let _ = done.send(());
        }
    }
}
