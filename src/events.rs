// Events that flow into the controller and frames that flow out to the display
//
// Two producers feed the controller: the hardware driver (joystick) and the
// web clients. Using enums allows pattern matching in the controller loop and
// keeps the communication between async tasks type-safe.

use anyhow::{anyhow, Context, Result};
use tokio::sync::{mpsc, oneshot};

use bytes::Bytes;

use crate::color::Color;
use crate::notifier::{Notifier, SubscriberTx};
use crate::state::Canvas;

/// Side of the square physical display, in cells
pub const WINDOW_SIZE: u8 = 8;

/// Row-major 8×8 window contents
pub type Screen = [[Color; WINDOW_SIZE as usize]; WINDOW_SIZE as usize];

/// Joystick events produced by a hardware driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HatEvent {
    Pressed,
    MoveUp,
    MoveLeft,
    MoveDown,
    MoveRight,
}

/// One frame for the display: the viewport contents plus the cursor position
/// relative to the viewport origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
    pub screen: Screen,
    pub cursor_x: u8,
    pub cursor_y: u8,
}

impl DisplayMessage {
    pub fn new(screen: Screen, cursor_x: u8, cursor_y: u8) -> Self {
        Self {
            screen,
            cursor_x,
            cursor_y,
        }
    }

    /// Color to draw at (x, y), with the cursor cell shown inverted
    pub fn cell(&self, x: u8, y: u8) -> Color {
        let color = self.screen[usize::from(y)][usize::from(x)];
        if x == self.cursor_x && y == self.cursor_y {
            color.inverted()
        } else {
            color
        }
    }
}

/// Requests coming from web clients
#[derive(Debug)]
pub enum ClientEvent {
    /// A new subscriber wants in; it is added together with its snapshot
    Registered(Registration),
    SetColor(Color),
    SetTool(String),
    Reset(bool),
    Undo(bool),
    Download(DownloadRequest),
}

/// Pending request for a copy of the canvas
///
/// The controller answers it with [`DownloadRequest::respond`]; the requester
/// holds the matching [`DownloadReply`].
#[derive(Debug)]
pub struct DownloadRequest {
    reply: oneshot::Sender<Canvas>,
}

impl DownloadRequest {
    pub fn new() -> (Self, DownloadReply) {
        let (tx, rx) = oneshot::channel();
        (Self { reply: tx }, DownloadReply { rx })
    }

    /// Deliver the canvas; a requester that already went away is not an error
    pub fn respond(self, canvas: Canvas) {
        if self.reply.send(canvas).is_err() {
            tracing::debug!("Download requester dropped before the reply");
        }
    }
}

/// Pending subscription for a new web client
///
/// The controller completes it with [`Registration::accept`], which adds the
/// channel to the notifier and queues the full snapshot in the same step, so
/// no broadcast can reach the subscriber ahead of its snapshot.
#[derive(Debug)]
pub struct Registration {
    tx: SubscriberTx,
    reply: oneshot::Sender<u64>,
}

impl Registration {
    pub fn new(tx: SubscriberTx) -> (Self, oneshot::Receiver<u64>) {
        let (reply, rx) = oneshot::channel();
        (Self { tx, reply }, rx)
    }

    /// Subscribe, deliver `snapshot` first, and report the id back
    pub fn accept(self, notifier: &Notifier, snapshot: Bytes) -> u64 {
        let id = notifier.subscribe(self.tx);
        notifier.notify_one(id, snapshot);
        if self.reply.send(id).is_err() {
            tracing::debug!("Client {} left before registration finished", id);
            notifier.unsubscribe(id);
        }
        id
    }
}

/// Receiving side of a [`DownloadRequest`]
#[derive(Debug)]
pub struct DownloadReply {
    rx: oneshot::Receiver<Canvas>,
}

impl DownloadReply {
    pub async fn wait(self) -> Result<Canvas> {
        self.rx
            .await
            .context("Controller dropped the download request")
    }
}

/// Typed front door to the controller for the transport layer
#[derive(Debug, Clone)]
pub struct ClientHandle {
    tx: mpsc::Sender<ClientEvent>,
}

impl ClientHandle {
    pub fn new(tx: mpsc::Sender<ClientEvent>) -> Self {
        Self { tx }
    }

    async fn send(&self, event: ClientEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| anyhow!("Controller is not running"))
    }

    /// Subscribe `tx` through the controller; returns the subscriber id once
    /// the snapshot is queued on `tx`
    pub async fn register(&self, tx: SubscriberTx) -> Result<u64> {
        let (registration, reply) = Registration::new(tx);
        self.send(ClientEvent::Registered(registration)).await?;
        reply
            .await
            .context("Controller dropped the registration")
    }

    pub async fn set_color(&self, color: Color) -> Result<()> {
        self.send(ClientEvent::SetColor(color)).await
    }

    pub async fn set_tool(&self, name: impl Into<String>) -> Result<()> {
        self.send(ClientEvent::SetTool(name.into())).await
    }

    pub async fn reset(&self, reset: bool) -> Result<()> {
        self.send(ClientEvent::Reset(reset)).await
    }

    pub async fn undo(&self, undo: bool) -> Result<()> {
        self.send(ClientEvent::Undo(undo)).await
    }

    /// Ask the controller for a snapshot of the canvas and wait for it
    pub async fn download(&self) -> Result<Canvas> {
        let (request, reply) = DownloadRequest::new();
        self.send(ClientEvent::Download(request)).await?;
        reply.wait().await
    }
}
