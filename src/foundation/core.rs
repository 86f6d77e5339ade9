use std::{
    fmt,
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::foundation::error::{PathlightError, PathlightResult};

pub use kurbo::{BezPath, Point, Vec2};

/// RGB8 frame, tightly packed, row-major. Every effect consumes and produces these.
pub type Frame = image::RgbImage;

/// 0-based tick counter within one animation run.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Center and diameter (or side) of the focus region at one tick, in source pixel space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Focus {
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

impl Focus {
    pub fn new(x: f64, y: f64, size: f64) -> Self {
        Self { x, y, size }
    }

    pub fn center(self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Cooperative cancellation flag shared between a run and whoever started it.
///
/// Polled at tick boundaries and by sinks that may block.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Straight-alpha RGB color, serialized as `#RRGGBB`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Parse `#RRGGBB` (the leading `#` is optional, case-insensitive).
    pub fn from_hex(s: &str) -> PathlightResult<Self> {
        let s = s.trim();
        let s = s.strip_prefix('#').unwrap_or(s);
        if s.len() != 6 || !s.is_ascii() {
            return Err(PathlightError::validation(format!(
                "color \"{s}\" must be #RRGGBB"
            )));
        }

        fn hex_byte(pair: &str) -> PathlightResult<u8> {
            u8::from_str_radix(pair, 16)
                .map_err(|_| PathlightError::validation(format!("invalid hex byte \"{pair}\"")))
        }

        Ok(Self::new(
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
        ))
    }
}

impl fmt::Display for Rgb8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb8 {
    type Err = PathlightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl serde::Serialize for Rgb8 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Rgb8 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parses_with_and_without_hash() {
        assert_eq!(Rgb8::from_hex("#FF00ff").unwrap(), Rgb8::new(255, 0, 255));
        assert_eq!(Rgb8::from_hex("00ff00").unwrap(), Rgb8::new(0, 255, 0));
        assert!(Rgb8::from_hex("#FFF").is_err());
        assert!(Rgb8::from_hex("#GG0000").is_err());
    }

    #[test]
    fn serde_uses_hex_strings() {
        let c = Rgb8::new(1, 2, 254);
        let s = serde_json::to_string(&c).unwrap();
        assert_eq!(s, "\"#0102FE\"");
        let back: Rgb8 = serde_json::from_str(&s).unwrap();
        assert_eq!(back, c);
    }
}
