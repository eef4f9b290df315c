// hatdraw - shared pixel canvas for the Sense HAT and web clients
//
// An 8×8 LED matrix with a joystick and any number of browsers draw on the
// same canvas. The display shows a scrolling 8×8 window of a larger canvas.
//
// Architecture:
// - Controller: single task that owns the canvas state and applies events
// - Hat driver: joystick events in, display frames out (terminal or headless)
// - Web server (axum): HTTP requests become client events, WebSockets get
//   every change through the notifier
// - Event system: mpsc channels carry events, a watch channel carries the
//   latest display frame

mod cli;
mod color;
mod config;
mod controller;
mod events;
mod hat;
mod logging;
mod notifier;
mod state;
mod web;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::{mpsc, oneshot, watch};

use cli::Cli;
use config::{Config, DisplayMode};
use controller::Controller;
use events::ClientHandle;
use hat::{Hat, HeadlessHat, TerminalHat};
use logging::LogBuffer;
use notifier::Notifier;
use state::State;
use web::WebState;

/// Client events waiting for the controller
const CLIENT_EVENT_BUFFER: usize = 64;
/// Joystick events waiting for the controller
const HAT_EVENT_BUFFER: usize = 32;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli::handle_cli(&cli) {
        return Ok(());
    }

    Config::ensure_config_exists();
    let config = Config::load(&cli.overrides())?;

    // The terminal display owns the screen, so logs go to its buffer
    let log_buffer = LogBuffer::new();
    let capture = config.display == DisplayMode::Terminal;
    let _log_guard = logging::init(&config.logging, capture, &log_buffer)?;

    tracing::info!(
        "hatdraw {} starting: canvas {}x{}, display {}",
        config::VERSION,
        config.canvas_width,
        config.canvas_height,
        config.display.as_str()
    );

    let state = State::new(config.canvas_width, config.canvas_height);
    let notifier = Arc::new(Notifier::new());
    let (client_tx, client_rx) = mpsc::channel(CLIENT_EVENT_BUFFER);
    let (joystick_tx, joystick_rx) = mpsc::channel(HAT_EVENT_BUFFER);
    // The display only needs the newest frame, so a watch channel holds it
    let (screen_tx, screen_rx) = watch::channel(state.create_display_message());
    let (quit_tx, quit_rx) = oneshot::channel();

    let hat: Box<dyn Hat> = match config.display {
        DisplayMode::Terminal => Box::new(TerminalHat::new(
            joystick_tx,
            screen_rx,
            quit_tx,
            log_buffer.clone(),
        )),
        DisplayMode::Headless => {
            drop(quit_tx);
            Box::new(HeadlessHat::new(joystick_tx, screen_rx))
        }
    };

    let controller = Controller::new(
        hat,
        joystick_rx,
        screen_tx,
        client_rx,
        state,
        notifier.clone(),
    );
    let (abort_tx, abort_rx) = oneshot::channel();
    let (controller_handle, done_rx) = controller.start(shutdown_signal(quit_rx, abort_rx));

    let web_state = WebState::new(
        notifier.clone(),
        ClientHandle::new(client_tx),
        config.subscriber_buffer,
    );
    let server_notifier = notifier.clone();
    let server = web::start_server(config.bind_addr, web_state, async move {
        let _ = done_rx.await;
        // Ends every WebSocket session so the server can drain
        server_notifier.close();
    })
    .await;

    if let Err(e) = &server {
        tracing::error!("Web server failed: {:#}", e);
        let _ = abort_tx.send(());
    }

    match controller_handle.await {
        Ok(Ok(())) => tracing::info!("Controller stopped"),
        Ok(Err(e)) => tracing::error!("Controller failed: {:#}", e),
        Err(e) => tracing::error!("Controller task panicked: {}", e),
    }
    notifier.close();

    server
}

/// Resolve on Ctrl+C, SIGTERM, a quit key in the terminal display, or an
/// internal abort
async fn shutdown_signal(quit: oneshot::Receiver<()>, abort: oneshot::Receiver<()>) {
    // A dropped sender means that source will never fire
    let quit = async {
        if quit.await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let abort = async {
        if abort.await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("Received Ctrl+C, shutting down");
        }
        _ = terminate() => tracing::info!("Received SIGTERM, shutting down"),
        _ = quit => tracing::info!("Quit from the display, shutting down"),
        _ = abort => tracing::info!("Shutting down after a fatal error"),
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::error!("Failed to listen for SIGTERM: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
