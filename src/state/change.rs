//! Change diffs and the undo stack
//!
//! A [`Change`] is a sparse description of what one operation altered. Absent
//! fields mean "unchanged", so the same type serves as the broadcast payload
//! and as an undo record (an undo record is simply the Change that puts the
//! old values back).

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::canvas::Canvas;
use super::tool::Tool;
use crate::color::Color;

/// A grid coordinate, used for both the cursor and the viewport origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: u8,
    pub y: u8,
}

impl Point {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }
}

/// One cell and the color it now holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pixel {
    pub x: u8,
    pub y: u8,
    pub color: Color,
}

/// Sparse state diff
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canvas: Option<Canvas>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pixels: Vec<Pixel>,
}

impl Change {
    pub fn with_pixels(pixels: Vec<Pixel>) -> Self {
        Self {
            pixels,
            ..Default::default()
        }
    }

    pub fn with_canvas(canvas: Canvas) -> Self {
        Self {
            canvas: Some(canvas),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.canvas.is_none()
            && self.cursor.is_none()
            && self.window.is_none()
            && self.tool_name.is_none()
            && self.color.is_none()
            && self.pixels.is_empty()
    }

    /// Encode as the JSON payload sent to subscribers
    pub fn to_payload(&self) -> serde_json::Result<Bytes> {
        serde_json::to_vec(self).map(Bytes::from)
    }
}

/// LIFO of inverse changes
///
/// Each entry reverses exactly one user-visible mutation. There is no
/// capacity bound; a canvas is at most 40×40 cells.
#[derive(Debug, Default)]
pub struct UndoStack {
    entries: Vec<Change>,
}

impl UndoStack {
    pub fn push(&mut self, change: Change) {
        self.entries.push(change);
    }

    pub fn pop(&mut self) -> Option<Change> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
