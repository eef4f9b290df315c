// State module - the canvas engine
//
// `State` owns the canvas, the cursor, the 8×8 viewport, the active tool and
// color, and the undo stack. It is only ever driven from the controller task,
// so none of it is shared or locked. Every mutating operation returns the
// sparse Change that observers need, or None when nothing changed.

mod canvas;
mod change;
mod tool;

pub use canvas::Canvas;
pub use change::{Change, Pixel, Point, UndoStack};
pub use tool::Tool;

use std::fmt;

use crate::color::Color;
use crate::events::{DisplayMessage, Screen, WINDOW_SIZE};

/// Smallest supported canvas side
pub const MIN_CANVAS_SIZE: u8 = WINDOW_SIZE;
/// Largest supported canvas side
pub const MAX_CANVAS_SIZE: u8 = 40;

/// Color written by the eraser and by reset
pub const BACKGROUND_COLOR: Color = Color::BLACK;
/// Paint color after construction and reset
pub const DEFAULT_COLOR: Color = Color::WHITE;

/// Invalid input rejected by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    UnknownTool(String),
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::UnknownTool(name) => write!(f, "unknown tool \"{}\"", name),
        }
    }
}

impl std::error::Error for StateError {}

/// Canvas state engine
#[derive(Debug)]
pub struct State {
    canvas: Canvas,
    cursor: Point,
    window: Point,
    tool: Tool,
    color: Color,
    undo: UndoStack,
}

/// Viewport origin on one axis that centers on `cursor` but stays inside the
/// canvas
fn centered_origin(cursor: u8, size: u8) -> u8 {
    let max_origin = size.saturating_sub(WINDOW_SIZE);
    cursor.saturating_sub(WINDOW_SIZE / 2).min(max_origin)
}

impl State {
    /// Create an engine with a blank canvas; sides are clamped to 8..=40
    pub fn new(width: u8, height: u8) -> Self {
        let width = width.clamp(MIN_CANVAS_SIZE, MAX_CANVAS_SIZE);
        let height = height.clamp(MIN_CANVAS_SIZE, MAX_CANVAS_SIZE);
        let cursor = Point::new(width / 2, height / 2);

        Self {
            canvas: Canvas::new(width, height, BACKGROUND_COLOR),
            cursor,
            window: Point::new(
                centered_origin(cursor.x, width),
                centered_origin(cursor.y, height),
            ),
            tool: Tool::default(),
            color: DEFAULT_COLOR,
            undo: UndoStack::default(),
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn cursor(&self) -> Point {
        self.cursor
    }

    pub fn window(&self) -> Point {
        self.window
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Deep copy of the canvas for consumers outside the engine
    pub fn canvas_clone(&self) -> Canvas {
        self.canvas.clone()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reset & undo
    // ─────────────────────────────────────────────────────────────────────

    /// Clear the canvas and restore the default cursor, viewport, tool and
    /// color. The old canvas is kept on the undo stack.
    pub fn reset(&mut self) -> Change {
        let fresh = Self::new(self.canvas.width(), self.canvas.height());
        let previous = std::mem::replace(&mut self.canvas, fresh.canvas);
        self.undo.push(Change::with_canvas(previous));

        self.cursor = fresh.cursor;
        self.window = fresh.window;
        self.tool = fresh.tool;
        self.color = fresh.color;

        self.full_change()
    }

    /// Revert the most recent undoable mutation and return the Change that
    /// describes the restored cells
    pub fn undo(&mut self) -> Option<Change> {
        let change = self.undo.pop()?;

        if let Some(canvas) = &change.canvas {
            self.canvas = canvas.clone();
        } else {
            for pixel in &change.pixels {
                if self.canvas.set(pixel.x, pixel.y, pixel.color).is_none() {
                    tracing::warn!(
                        "Undo pixel ({}, {}) is out of the canvas",
                        pixel.x,
                        pixel.y
                    );
                }
            }
        }

        Some(change)
    }

    /// Every field populated; used to synchronize a new observer
    pub fn full_change(&self) -> Change {
        Change {
            canvas: Some(self.canvas.clone()),
            cursor: Some(self.cursor),
            window: Some(self.window),
            tool_name: Some(self.tool),
            color: Some(self.color),
            pixels: Vec::new(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Cursor movement
    //
    // The viewport scrolls only when the cursor would leave it: moving below
    // the low edge snaps the origin to the cursor, moving past the high edge
    // advances the origin by one.
    // ─────────────────────────────────────────────────────────────────────

    pub fn go_up(&mut self) -> Option<Change> {
        if self.cursor.y == 0 {
            return None;
        }
        self.cursor.y -= 1;
        if self.cursor.y < self.window.y {
            self.window.y = self.cursor.y;
        }
        Some(self.position_change())
    }

    pub fn go_left(&mut self) -> Option<Change> {
        if self.cursor.x == 0 {
            return None;
        }
        self.cursor.x -= 1;
        if self.cursor.x < self.window.x {
            self.window.x = self.cursor.x;
        }
        Some(self.position_change())
    }

    pub fn go_down(&mut self) -> Option<Change> {
        if self.cursor.y + 1 >= self.canvas.height() {
            return None;
        }
        self.cursor.y += 1;
        if self.cursor.y > self.window.y + WINDOW_SIZE - 1 {
            self.window.y += 1;
        }
        Some(self.position_change())
    }

    pub fn go_right(&mut self) -> Option<Change> {
        if self.cursor.x + 1 >= self.canvas.width() {
            return None;
        }
        self.cursor.x += 1;
        if self.cursor.x > self.window.x + WINDOW_SIZE - 1 {
            self.window.x += 1;
        }
        Some(self.position_change())
    }

    fn position_change(&self) -> Change {
        Change {
            cursor: Some(self.cursor),
            window: Some(self.window),
            ..Default::default()
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tool & color
    // ─────────────────────────────────────────────────────────────────────

    pub fn set_color(&mut self, color: Color) -> Option<Change> {
        if self.color == color {
            return None;
        }
        self.color = color;
        Some(Change {
            color: Some(color),
            ..Default::default()
        })
    }

    /// Switch tools by name; unknown names leave the state untouched
    pub fn set_tool(&mut self, name: &str) -> Result<Option<Change>, StateError> {
        let tool: Tool = name.parse()?;
        if tool == self.tool {
            return Ok(None);
        }
        self.tool = tool;
        Ok(Some(Change {
            tool_name: Some(tool),
            ..Default::default()
        }))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Painting
    // ─────────────────────────────────────────────────────────────────────

    /// Apply the active tool at the cursor
    pub fn paint(&mut self) -> Option<Change> {
        match self.tool {
            Tool::Pen => self.paint_single_pixel(self.color),
            Tool::Eraser => self.paint_single_pixel(BACKGROUND_COLOR),
            Tool::Bucket => self.bucket_fill(),
        }
    }

    fn paint_single_pixel(&mut self, color: Color) -> Option<Change> {
        let Point { x, y } = self.cursor;
        let (after, before) = self.paint_pixel(color, x, y)?;

        self.undo.push(Change::with_pixels(vec![before]));
        Some(Change::with_pixels(vec![after]))
    }

    /// Flood-fill the 4-connected region sharing the cursor cell's color
    ///
    /// Uses an explicit worklist. A repainted cell no longer matches the
    /// target color, so it is never filled twice.
    fn bucket_fill(&mut self) -> Option<Change> {
        let Point { x, y } = self.cursor;
        let Some(target) = self.canvas.get(x, y) else {
            tracing::warn!("Cursor ({}, {}) is out of the canvas", x, y);
            return None;
        };
        if target == self.color {
            return None;
        }

        let mut after = Vec::new();
        let mut before = Vec::new();
        let mut pending = vec![(x, y)];

        while let Some((x, y)) = pending.pop() {
            if self.canvas.get(x, y) != Some(target) {
                continue;
            }
            if let Some((painted, original)) = self.paint_pixel(self.color, x, y) {
                after.push(painted);
                before.push(original);
            }

            if y > 0 {
                pending.push((x, y - 1));
            }
            if x > 0 {
                pending.push((x - 1, y));
            }
            if y + 1 < self.canvas.height() {
                pending.push((x, y + 1));
            }
            if x + 1 < self.canvas.width() {
                pending.push((x + 1, y));
            }
        }

        if after.is_empty() {
            return None;
        }
        self.undo.push(Change::with_pixels(before));
        Some(Change::with_pixels(after))
    }

    /// Write one cell; returns (new pixel, old pixel) when the color changed
    fn paint_pixel(&mut self, color: Color, x: u8, y: u8) -> Option<(Pixel, Pixel)> {
        let Some(current) = self.canvas.get(x, y) else {
            tracing::warn!("Cursor ({}, {}) is out of the canvas", x, y);
            return None;
        };
        if current == color {
            return None;
        }

        self.canvas.set(x, y, color);
        Some((Pixel { x, y, color }, Pixel { x, y, color: current }))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Display
    // ─────────────────────────────────────────────────────────────────────

    /// Crop the viewport for the 8×8 display
    pub fn create_display_message(&self) -> DisplayMessage {
        let mut screen: Screen = [[BACKGROUND_COLOR; WINDOW_SIZE as usize]; WINDOW_SIZE as usize];
        for (dy, row) in screen.iter_mut().enumerate() {
            for (dx, cell) in row.iter_mut().enumerate() {
                let x = self.window.x + dx as u8;
                let y = self.window.y + dy as u8;
                *cell = self.canvas.get(x, y).unwrap_or(BACKGROUND_COLOR);
            }
        }

        DisplayMessage::new(
            screen,
            self.cursor.x - self.window.x,
            self.cursor.y - self.window.y,
        )
    }
}
