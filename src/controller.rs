// Controller - the single writer of the canvas state
//
// One task owns the `State` and waits on every input at once with
// `tokio::select!`: the shutdown future, joystick events from the hat driver,
// and client events from the web layer. Each wake-up performs at most one
// state mutation. A non-empty Change is turned into a display frame (published
// on a watch channel, so a slow display only ever skips stale frames) and a
// JSON payload broadcast through the notifier.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::events::{ClientEvent, DisplayMessage, HatEvent, Registration};
use crate::hat::Hat;
use crate::notifier::Notifier;
use crate::state::{Change, State};

pub struct Controller {
    hat: Box<dyn Hat>,
    joystick_events: mpsc::Receiver<HatEvent>,
    screen_events: watch::Sender<DisplayMessage>,
    client_events: mpsc::Receiver<ClientEvent>,
    state: State,
    notifier: Arc<Notifier>,
}

impl Controller {
    pub fn new(
        hat: Box<dyn Hat>,
        joystick_events: mpsc::Receiver<HatEvent>,
        screen_events: watch::Sender<DisplayMessage>,
        client_events: mpsc::Receiver<ClientEvent>,
        state: State,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            hat,
            joystick_events,
            screen_events,
            client_events,
            state,
            notifier,
        }
    }

    /// Spawn the event loop
    ///
    /// Returns the task handle and a "done" receiver that resolves once the
    /// loop has exited and the hat driver has released its resources.
    pub fn start<F>(self, shutdown: F) -> (JoinHandle<Result<()>>, oneshot::Receiver<()>)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let result = self.run(shutdown).await;
            // Dropping the sender is the done signal, whatever the outcome
            drop(done_tx);
            result
        });
        (handle, done_rx)
    }

    async fn run<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        self.hat.start()?;
        let canvas = self.state.canvas();
        let cursor = self.state.cursor();
        tracing::info!(
            "Controller started: canvas {}x{}, cursor at ({}, {})",
            canvas.width(),
            canvas.height(),
            cursor.x,
            cursor.y
        );
        self.send_display_frame();

        tokio::pin!(shutdown);
        loop {
            let change = tokio::select! {
                _ = &mut shutdown => break,

                Some(event) = self.joystick_events.recv() => self.on_joystick(event),

                Some(event) = self.client_events.recv() => self.on_client(event),

                else => {
                    tracing::warn!("All event sources closed");
                    break;
                }
            };

            if let Some(change) = change.filter(|c| !c.is_empty()) {
                self.update(&change);
            }
        }

        self.stop().await;
        Ok(())
    }

    fn on_joystick(&mut self, event: HatEvent) -> Option<Change> {
        let change = match event {
            HatEvent::MoveUp => self.state.go_up(),
            HatEvent::MoveDown => self.state.go_down(),
            HatEvent::MoveLeft => self.state.go_left(),
            HatEvent::MoveRight => self.state.go_right(),
            HatEvent::Pressed => self.state.paint(),
        };
        let (cursor, window) = (self.state.cursor(), self.state.window());
        tracing::trace!(
            "{:?}: cursor ({}, {}), window ({}, {})",
            event,
            cursor.x,
            cursor.y,
            window.x,
            window.y
        );
        change
    }

    fn on_client(&mut self, event: ClientEvent) -> Option<Change> {
        match event {
            ClientEvent::Registered(registration) => {
                self.register(registration);
                None
            }
            ClientEvent::SetColor(color) => {
                let change = self.state.set_color(color);
                tracing::debug!("Color is {}", self.state.color());
                change
            }
            ClientEvent::SetTool(name) => match self.state.set_tool(&name) {
                Ok(change) => {
                    tracing::debug!("Tool is {}", self.state.tool());
                    change
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    None
                }
            },
            ClientEvent::Reset(true) => {
                tracing::info!("Canvas reset");
                Some(self.state.reset())
            }
            ClientEvent::Undo(true) => {
                let change = self.state.undo();
                tracing::debug!("Undo, {} step(s) left", self.state.undo_depth());
                change
            }
            ClientEvent::Reset(false) | ClientEvent::Undo(false) => None,
            ClientEvent::Download(request) => {
                request.respond(self.state.canvas_clone());
                None
            }
        }
    }

    /// Push a fresh frame to the display and broadcast the change
    fn update(&self, change: &Change) {
        self.send_display_frame();

        match change.to_payload() {
            Ok(payload) => self.notifier.notify_all(payload),
            Err(e) => tracing::error!("Failed to serialize change: {}", e),
        }
    }

    /// Add a subscriber with the full snapshot as its first message
    fn register(&self, registration: Registration) {
        match self.state.full_change().to_payload() {
            Ok(snapshot) => {
                let id = registration.accept(&self.notifier, snapshot);
                tracing::debug!("Sent snapshot to client {}", id);
            }
            // Dropping the registration fails the client's request
            Err(e) => tracing::error!("Failed to serialize snapshot: {}", e),
        }
    }

    /// Replace the pending frame; a frame the driver has not drawn yet is
    /// superseded rather than queued
    fn send_display_frame(&self) {
        self.screen_events.send_replace(self.state.create_display_message());
    }

    /// Stop the hat and wait for it to close its event channel
    async fn stop(&mut self) {
        tracing::info!("Controller stopping");
        self.hat.stop();
        // Drain whatever was still queued until the driver hangs up
        while self.joystick_events.recv().await.is_some() {}
        tracing::info!("Hat driver stopped");
    }
}
