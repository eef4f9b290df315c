//! Terminal emulation of the Sense HAT
//!
//! Arrow keys move the cursor, Enter or Space presses the joystick, `q` or
//! Ctrl+C asks the whole process to shut down. The 8×8 window is drawn as
//! colored blocks with the cursor cell inverted, followed by the tail of the
//! captured log.

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color as TermColor, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};

use super::{Hat, HatChannels};
use crate::events::{DisplayMessage, HatEvent, WINDOW_SIZE};
use crate::logging::LogBuffer;

type Term = Terminal<CrosstermBackend<io::Stdout>>;

/// Keyboard poll / log refresh period
const TICK: Duration = Duration::from_millis(100);

pub struct TerminalHat {
    channels: Option<HatChannels>,
    quit: Option<oneshot::Sender<()>>,
    log_buffer: LogBuffer,
    done: Option<oneshot::Sender<()>>,
}

impl TerminalHat {
    pub fn new(
        events: mpsc::Sender<HatEvent>,
        screen: watch::Receiver<DisplayMessage>,
        quit: oneshot::Sender<()>,
        log_buffer: LogBuffer,
    ) -> Self {
        Self {
            channels: Some(HatChannels { events, screen }),
            quit: Some(quit),
            log_buffer,
            done: None,
        }
    }
}

impl Hat for TerminalHat {
    fn start(&mut self) -> Result<()> {
        let Some(channels) = self.channels.take() else {
            return Ok(());
        };

        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("Failed to setup terminal")?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))
            .context("Failed to create terminal")?;

        let (done_tx, done_rx) = oneshot::channel();
        self.done = Some(done_tx);
        let quit = self.quit.take();
        let log_buffer = self.log_buffer.clone();

        tokio::spawn(async move {
            let mut terminal = terminal;
            let mut channels = channels;
            if let Err(e) = run(&mut terminal, &mut channels, done_rx, quit, &log_buffer).await {
                tracing::error!("Terminal display error: {:?}", e);
            }
            if let Err(e) = restore(&mut terminal) {
                tracing::error!("Failed to restore terminal: {:?}", e);
            }
            // The terminal is usable again before the controller hears we stopped
            drop(channels);
        });

        Ok(())
    }

    fn stop(&mut self) {
        self.channels = None;
        if let Some(done) = self.done.take() {
            let _ = done.send(());
        }
    }
}

fn restore(terminal: &mut Term) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to restore terminal")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Driver loop: draw, forward keys, until stopped or the display closes
async fn run(
    terminal: &mut Term,
    channels: &mut HatChannels,
    mut done: oneshot::Receiver<()>,
    mut quit: Option<oneshot::Sender<()>>,
    log_buffer: &LogBuffer,
) -> Result<()> {
    let HatChannels { events, screen } = channels;
    let mut frame = screen.borrow_and_update().clone();
    let mut tick = tokio::time::interval(TICK);

    loop {
        terminal
            .draw(|f| draw(f, &frame, log_buffer))
            .context("Failed to draw terminal")?;

        tokio::select! {
            _ = &mut done => break,
            // Only the latest frame matters; older ones are skipped
            changed = screen.changed() => match changed {
                Ok(()) => frame = screen.borrow_and_update().clone(),
                Err(_) => break,
            },
            _ = tick.tick() => {
                while event::poll(Duration::ZERO).context("Failed to poll terminal")? {
                    let Event::Key(key) = event::read().context("Failed to read terminal")? else {
                        continue;
                    };
                    if is_quit(&key) {
                        if let Some(quit) = quit.take() {
                            tracing::info!("Quit requested from the terminal");
                            let _ = quit.send(());
                        }
                        continue;
                    }
                    if let Some(hat_event) = map_key(&key) {
                        tracing::debug!("Joystick event: {:?}", hat_event);
                        if events.send(hat_event).await.is_err() {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

fn is_quit(key: &KeyEvent) -> bool {
    key.kind == KeyEventKind::Press
        && (key.code == KeyCode::Char('q')
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)))
}

/// Translate a key press into a joystick event
fn map_key(key: &KeyEvent) -> Option<HatEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Up => Some(HatEvent::MoveUp),
        KeyCode::Down => Some(HatEvent::MoveDown),
        KeyCode::Left => Some(HatEvent::MoveLeft),
        KeyCode::Right => Some(HatEvent::MoveRight),
        KeyCode::Enter | KeyCode::Char(' ') => Some(HatEvent::Pressed),
        _ => None,
    }
}

fn draw(f: &mut Frame, frame: &DisplayMessage, log_buffer: &LogBuffer) {
    let grid_height = u16::from(WINDOW_SIZE) + 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(grid_height),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(f.area());

    // Two terminal columns per cell keeps the cells roughly square
    let grid_width = u16::from(WINDOW_SIZE) * 2 + 2;
    let grid_area = ratatui::layout::Rect {
        width: grid_width.min(chunks[0].width),
        ..chunks[0]
    };
    let lines: Vec<Line> = (0..WINDOW_SIZE)
        .map(|y| {
            Line::from(
                (0..WINDOW_SIZE)
                    .map(|x| {
                        let (r, g, b) = frame.cell(x, y).to_rgb();
                        Span::styled("  ", Style::default().bg(TermColor::Rgb(r, g, b)))
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect();
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" hatdraw ")),
        grid_area,
    );

    f.render_widget(
        Paragraph::new("arrows: move  enter/space: paint  q: quit"),
        chunks[1],
    );

    let log_lines: Vec<Line> = log_buffer
        .tail(usize::from(chunks[2].height))
        .iter()
        .map(|entry| Line::from(entry.format_line()))
        .collect();
    f.render_widget(Paragraph::new(log_lines), chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(map_key(&press(KeyCode::Up)), Some(HatEvent::MoveUp));
        assert_eq!(map_key(&press(KeyCode::Down)), Some(HatEvent::MoveDown));
        assert_eq!(map_key(&press(KeyCode::Left)), Some(HatEvent::MoveLeft));
        assert_eq!(map_key(&press(KeyCode::Right)), Some(HatEvent::MoveRight));
        assert_eq!(map_key(&press(KeyCode::Enter)), Some(HatEvent::Pressed));
        assert_eq!(map_key(&press(KeyCode::Char(' '))), Some(HatEvent::Pressed));
        assert_eq!(map_key(&press(KeyCode::Char('x'))), None);
    }

    #[test]
    fn test_release_is_ignored() {
        let mut key = press(KeyCode::Up);
        key.kind = KeyEventKind::Release;
        assert_eq!(map_key(&key), None);
    }

    #[test]
    fn test_quit_keys() {
        assert!(is_quit(&press(KeyCode::Char('q'))));
        assert!(is_quit(&KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL
        )));
        assert!(!is_quit(&press(KeyCode::Char('c'))));
    }
}
