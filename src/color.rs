// Color - 24-bit RGB value shared by the canvas, the display and the wire format
//
// On the wire a color is a lower-case HTML hex string ("#rrggbb"). Anything
// above the low 24 bits is dropped when a Color is built, so it never shows up
// in the encoded form.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Mask for the 24 bits a Color actually carries
const RGB_MASK: u32 = 0x00FF_FFFF;

/// A packed 0xRRGGBB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(u32);

impl Color {
    pub const BLACK: Color = Color(0x000000);
    pub const WHITE: Color = Color(0xFFFFFF);

    /// Build a color, discarding any bits above 0xFFFFFF
    pub const fn new(value: u32) -> Self {
        Self(value & RGB_MASK)
    }

    /// Split into (red, green, blue) components
    pub fn to_rgb(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }

    /// Bitwise complement within 24 bits, used to highlight the cursor cell
    pub fn inverted(self) -> Self {
        Self::new(!self.0)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

/// Reasons a hex color string can be rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    MissingHash,
    WrongLength(usize),
    InvalidHex(String),
}

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorParseError::MissingHash => write!(f, "color must start with '#'"),
            ColorParseError::WrongLength(len) => {
                write!(f, "color must have 6 hex digits, got {}", len)
            }
            ColorParseError::InvalidHex(s) => write!(f, "invalid hex color \"{}\"", s),
        }
    }
}

impl std::error::Error for ColorParseError {}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('#').ok_or(ColorParseError::MissingHash)?;
        if digits.len() != 6 {
            return Err(ColorParseError::WrongLength(digits.len()));
        }
        // from_str_radix accepts a leading '+', which is not a hex digit
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ColorParseError::InvalidHex(s.to_string()));
        }
        u32::from_str_radix(digits, 16)
            .map(Color::new)
            .map_err(|_| ColorParseError::InvalidHex(s.to_string()))
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_colors() {
        assert_eq!(serde_json::to_string(&Color::BLACK).unwrap(), "\"#000000\"");
        assert_eq!(serde_json::to_string(&Color::WHITE).unwrap(), "\"#ffffff\"");

        let colors = vec![
            Color::new(0xFF0000),
            Color::new(0x00FF00),
            Color::new(0x0000FF),
        ];
        assert_eq!(
            serde_json::to_string(&colors).unwrap(),
            r##"["#ff0000","#00ff00","#0000ff"]"##
        );
    }

    #[test]
    fn test_high_byte_is_ignored() {
        let color = Color::new(0xFFFF_FFFF);
        assert_eq!(color, Color::WHITE);
        assert_eq!(color.to_string(), "#ffffff");
    }

    #[test]
    fn test_decode_colors() {
        let color: Color = serde_json::from_str("\"#ffffff\"").unwrap();
        assert_eq!(color, Color::WHITE);

        let colors: Vec<Color> =
            serde_json::from_str(r##"["#ff0000", "#00FF00", "#0000ff"]"##).unwrap();
        assert_eq!(
            colors,
            vec![
                Color::new(0xFF0000),
                Color::new(0x00FF00),
                Color::new(0x0000FF)
            ]
        );
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(serde_json::from_str::<Color>("\"#ff0000").is_err());
        assert!(serde_json::from_str::<Vec<Color>>(r#"["ff0000"]"#).is_err());
        assert_eq!(
            "#ff00".parse::<Color>(),
            Err(ColorParseError::WrongLength(4))
        );
        assert_eq!("ff0000".parse::<Color>(), Err(ColorParseError::MissingHash));
        assert!(matches!(
            "#+f0000".parse::<Color>(),
            Err(ColorParseError::InvalidHex(_))
        ));
        assert!(matches!(
            "#gg0000".parse::<Color>(),
            Err(ColorParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_rgb_and_inversion() {
        let color = Color::new(0x123456);
        assert_eq!(color.to_rgb(), (0x12, 0x34, 0x56));
        assert_eq!(Color::BLACK.inverted(), Color::WHITE);
        assert_eq!(color.inverted(), Color::new(0xEDCBA9));
    }
}
