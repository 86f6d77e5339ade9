//! Per-frame focus effects.
//!
//! Every effect is a pure function of the (optionally sharpened) source frame, the pre-darkened
//! background, the focus at the current tick and the run's [`EffectParams`]. Effects are
//! selected by name through [`EffectKind`].

use std::{fmt, str::FromStr};

use crate::{
    foundation::core::{Focus, Frame},
    foundation::error::{PathlightError, PathlightResult},
};

pub mod blur;
pub mod blur_focus;
pub mod composite;
pub mod lens;
pub mod mask;
pub mod params;
pub mod spotlight;
pub mod vignette;

pub use params::{EffectParams, ParamValue, Shape};

/// Borrowed inputs for one effect invocation.
#[derive(Clone, Copy, Debug)]
pub struct EffectInput<'a> {
    pub source: &'a Frame,
    /// `source` scaled by the brightness factor, same size.
    pub darkened: &'a Frame,
    pub focus: Focus,
    /// Output frame size. Only effects that compose at output size read it.
    pub target: (u32, u32),
}

/// The closed set of registered effects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    #[default]
    #[serde(alias = "Spotlight Classic", alias = "Highlight")]
    Spotlight,
    #[serde(alias = "Spotlight avec Glow")]
    SpotlightGlow,
    #[serde(alias = "Vignette Animée")]
    Vignette,
    #[serde(alias = "Color Grading")]
    ColorGrading,
    #[serde(alias = "Zoom/Lens")]
    ZoomLens,
    #[serde(alias = "Blur Focus")]
    BlurFocus,
    #[serde(alias = "TuboVision (Zoom)")]
    TuboZoom,
    #[serde(alias = "TuboVision (Déformé)")]
    TuboDistorted,
}

impl EffectKind {
    pub const ALL: [Self; 8] = [
        Self::Spotlight,
        Self::SpotlightGlow,
        Self::Vignette,
        Self::ColorGrading,
        Self::ZoomLens,
        Self::BlurFocus,
        Self::TuboZoom,
        Self::TuboDistorted,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Spotlight => "spotlight",
            Self::SpotlightGlow => "spotlight_glow",
            Self::Vignette => "vignette",
            Self::ColorGrading => "color_grading",
            Self::ZoomLens => "zoom_lens",
            Self::BlurFocus => "blur_focus",
            Self::TuboZoom => "tubo_zoom",
            Self::TuboDistorted => "tubo_distorted",
        }
    }

    /// Display names older projects stored instead of [`EffectKind::name`].
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Spotlight => &["Spotlight Classic", "Highlight"],
            Self::SpotlightGlow => &["Spotlight avec Glow"],
            Self::Vignette => &["Vignette Animée"],
            Self::ColorGrading => &["Color Grading"],
            Self::ZoomLens => &["Zoom/Lens"],
            Self::BlurFocus => &["Blur Focus"],
            Self::TuboZoom => &["TuboVision (Zoom)"],
            Self::TuboDistorted => &["TuboVision (Déformé)"],
        }
    }

    /// Case-insensitive lookup by canonical name or alias.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|k| {
            k.name().eq_ignore_ascii_case(name)
                || k.aliases().iter().any(|a| a.to_lowercase() == name.to_lowercase())
        })
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Spotlight => "hard-edged focus over a darkened background",
            Self::SpotlightGlow => "focus with a linear glow falloff at its edge",
            Self::Vignette => "radial darkening away from the focus center",
            Self::ColorGrading => "hard focus tinted with a solid color",
            Self::ZoomLens => "circular magnifier over the darkened background",
            Self::BlurFocus => "sharp focus over a blurred background",
            Self::TuboZoom => "focus crop enlarged into a centered tunnel on black",
            Self::TuboDistorted => "tunnel view with radial lens distortion",
        }
    }

    /// Settings keys this effect reads from [`EffectParams`].
    pub fn params(self) -> &'static [&'static str] {
        match self {
            Self::Spotlight => &["shape", "brightness"],
            Self::SpotlightGlow => &["shape", "brightness", "glow_intensity"],
            Self::Vignette => &["brightness", "vignette_radius"],
            Self::ColorGrading => &["shape", "brightness", "effect_color", "color_intensity"],
            Self::ZoomLens => &["brightness", "zoom_intensity"],
            Self::BlurFocus => &["shape", "blur_intensity"],
            Self::TuboZoom => &["shape"],
            Self::TuboDistorted => &["shape", "distortion"],
        }
    }

    /// Tunnel effects build their output at the target size; the rest compose at source size
    /// and are resized afterwards.
    pub fn composes_at_output_size(self) -> bool {
        matches!(self, Self::TuboZoom | Self::TuboDistorted)
    }

    pub fn apply(self, input: &EffectInput<'_>, params: &EffectParams) -> PathlightResult<Frame> {
        match self {
            Self::Spotlight => spotlight::spotlight(input, params),
            Self::SpotlightGlow => spotlight::spotlight_glow(input, params),
            Self::Vignette => vignette::vignette(input, params),
            Self::ColorGrading => spotlight::color_grading(input, params),
            Self::ZoomLens => lens::zoom_lens(input, params),
            Self::BlurFocus => blur_focus::blur_focus(input, params),
            Self::TuboZoom => lens::tubo(input, params, false),
            Self::TuboDistorted => lens::tubo(input, params, true),
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectKind {
    type Err = PathlightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|k| k.name()).collect();
            PathlightError::validation(format!(
                "unknown effect \"{s}\" (expected one of: {})",
                known.join(", ")
            ))
        })
    }
}
