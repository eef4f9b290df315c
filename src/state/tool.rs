//! Drawing tools

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::StateError;

/// The active drawing tool, dispatched by `State::paint`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Paint the cursor cell with the current color
    #[default]
    Pen,
    /// Paint the cursor cell with the background color
    Eraser,
    /// Flood-fill the region under the cursor with the current color
    Bucket,
}

impl Tool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Pen => "pen",
            Tool::Eraser => "eraser",
            Tool::Bucket => "bucket",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pen" => Ok(Tool::Pen),
            "eraser" => Ok(Tool::Eraser),
            "bucket" => Ok(Tool::Bucket),
            other => Err(StateError::UnknownTool(other.to_string())),
        }
    }
}
