//! Canvas grid storage

use serde::de::Error as _;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::color::Color;

/// A width×height grid of colors stored row-major
///
/// Serialized as a 2-D array of rows, e.g. `[["#000000", ...], ...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u8,
    height: u8,
    cells: Vec<Color>,
}

impl Canvas {
    /// Allocate a canvas where every cell holds `fill`
    pub fn new(width: u8, height: u8, fill: Color) -> Self {
        Self {
            width,
            height,
            cells: vec![fill; usize::from(width) * usize::from(height)],
        }
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    pub fn contains(&self, x: u8, y: u8) -> bool {
        x < self.width && y < self.height
    }

    fn index(&self, x: u8, y: u8) -> Option<usize> {
        self.contains(x, y)
            .then(|| usize::from(y) * usize::from(self.width) + usize::from(x))
    }

    /// Color at (x, y), or None outside the grid
    pub fn get(&self, x: u8, y: u8) -> Option<Color> {
        self.index(x, y).map(|i| self.cells[i])
    }

    /// Overwrite (x, y) and return the previous color, or None outside the grid
    pub fn set(&mut self, x: u8, y: u8, color: Color) -> Option<Color> {
        let i = self.index(x, y)?;
        Some(std::mem::replace(&mut self.cells[i], color))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Color]> {
        self.cells.chunks(usize::from(self.width.max(1)))
    }
}

impl Serialize for Canvas {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(usize::from(self.height)))?;
        for row in self.rows() {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Canvas {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows: Vec<Vec<Color>> = Vec::deserialize(deserializer)?;
        let height = u8::try_from(rows.len()).map_err(D::Error::custom)?;
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|row| row.len() != width) {
            return Err(D::Error::custom("canvas rows must all have the same length"));
        }
        let width = u8::try_from(width).map_err(D::Error::custom)?;

        Ok(Self {
            width,
            height,
            cells: rows.into_iter().flatten().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_bounds() {
        let mut canvas = Canvas::new(10, 8, Color::BLACK);
        assert_eq!(canvas.get(9, 7), Some(Color::BLACK));
        assert_eq!(canvas.get(10, 0), None);
        assert_eq!(canvas.get(0, 8), None);

        assert_eq!(canvas.set(3, 2, Color::WHITE), Some(Color::BLACK));
        assert_eq!(canvas.get(3, 2), Some(Color::WHITE));
        assert_eq!(canvas.set(10, 2, Color::WHITE), None);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut canvas = Canvas::new(8, 8, Color::BLACK);
        let snapshot = canvas.clone();
        canvas.set(1, 1, Color::WHITE);
        assert_eq!(snapshot.get(1, 1), Some(Color::BLACK));
    }

    #[test]
    fn test_serializes_as_rows() {
        let mut canvas = Canvas::new(2, 3, Color::BLACK);
        canvas.set(1, 2, Color::new(0xABCDEF));

        let json = serde_json::to_value(&canvas).unwrap();
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].as_array().unwrap().len(), 2);
        assert_eq!(rows[2][1], "#abcdef");

        let parsed: Canvas = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, canvas);
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let result: Result<Canvas, _> =
            serde_json::from_str(r##"[["#000000", "#000000"], ["#000000"]]"##);
        assert!(result.is_err());
    }
}
