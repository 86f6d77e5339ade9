use std::{fmt, str::FromStr};

use crate::foundation::error::{PathlightError, PathlightResult};

/// Export resolution presets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputProfile {
    /// Keep the source image size.
    #[default]
    Original,
    Sd480,
    Hd720,
    Hd1080,
    VerticalHd,
    Uhd4k,
}

impl OutputProfile {
    pub const ALL: [Self; 6] = [
        Self::Original,
        Self::Sd480,
        Self::Hd720,
        Self::Hd1080,
        Self::VerticalHd,
        Self::Uhd4k,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Sd480 => "sd480",
            Self::Hd720 => "hd720",
            Self::Hd1080 => "hd1080",
            Self::VerticalHd => "vertical_hd",
            Self::Uhd4k => "uhd4k",
        }
    }

    /// Fixed `(width, height)`, or `None` to keep the source size.
    pub fn dimensions(self) -> Option<(u32, u32)> {
        match self {
            Self::Original => None,
            Self::Sd480 => Some((640, 480)),
            Self::Hd720 => Some((1280, 720)),
            Self::Hd1080 => Some((1920, 1080)),
            Self::VerticalHd => Some((720, 1280)),
            Self::Uhd4k => Some((3840, 2160)),
        }
    }

    /// Encoder-ready output size for a `source` of the given size.
    pub fn resolve(self, source: (u32, u32)) -> PathlightResult<(u32, u32)> {
        let (w, h) = even_dimensions(self.dimensions().unwrap_or(source));
        if w == 0 || h == 0 {
            return Err(PathlightError::validation(format!(
                "output size {}x{} is too small to encode",
                source.0, source.1
            )));
        }
        Ok((w, h))
    }
}

/// Round both dimensions down to even values.
pub fn even_dimensions((w, h): (u32, u32)) -> (u32, u32) {
    (w & !1, h & !1)
}

impl fmt::Display for OutputProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputProfile {
    type Err = PathlightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        let alias = match key.as_str() {
            "480p" => Some(Self::Sd480),
            "720p" => Some(Self::Hd720),
            "1080p" => Some(Self::Hd1080),
            "4k" | "2160p" => Some(Self::Uhd4k),
            "vertical" => Some(Self::VerticalHd),
            _ => None,
        };
        alias
            .or_else(|| Self::ALL.into_iter().find(|p| p.name() == key))
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|p| p.name()).collect();
                PathlightError::validation(format!(
                    "unknown output profile \"{s}\" (expected one of: {})",
                    known.join(", ")
                ))
            })
    }
}
