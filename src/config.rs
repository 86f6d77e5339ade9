use crate::{
    effects::{EffectKind, EffectParams, Shape},
    foundation::core::Rgb8,
    foundation::error::{PathlightError, PathlightResult},
};

/// Flat user settings as stored in project files.
///
/// Missing keys take their defaults and unknown keys are ignored, so files written by older
/// editions load unchanged.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    pub effect: EffectKind,
    pub shape: Shape,
    /// Pixels per second along the path.
    pub speed: f64,
    /// Focus size given to newly added points.
    pub size: f64,
    /// Background brightness in percent.
    pub brightness: f64,
    pub fps: f64,
    /// Path smoothing in percent.
    pub smoothing: f64,
    pub glow_intensity: f64,
    pub vignette_radius: f64,
    pub effect_color: Rgb8,
    pub color_intensity: f64,
    pub zoom_intensity: f64,
    pub blur_intensity: f64,
    pub distortion: f64,
    pub trace_color: Rgb8,
    pub shape_color: Rgb8,
    pub sharpen: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let p = EffectParams::default();
        Self {
            effect: EffectKind::Spotlight,
            shape: p.shape,
            speed: 500.0,
            size: 250.0,
            brightness: p.brightness,
            fps: 50.0,
            smoothing: 50.0,
            glow_intensity: p.glow_intensity,
            vignette_radius: p.vignette_radius,
            effect_color: p.effect_color,
            color_intensity: p.color_intensity,
            zoom_intensity: p.zoom_intensity,
            blur_intensity: p.blur_intensity,
            distortion: p.distortion,
            trace_color: Rgb8::new(255, 255, 0),
            shape_color: Rgb8::new(0, 255, 255),
            sharpen: p.sharpen,
        }
    }
}

fn positive(name: &str, v: f64) -> PathlightResult<()> {
    if !v.is_finite() || v <= 0.0 {
        return Err(PathlightError::validation(format!(
            "{name} must be > 0, got {v}"
        )));
    }
    Ok(())
}

fn percent(name: &str, v: f64) -> PathlightResult<()> {
    if !(0.0..=100.0).contains(&v) {
        return Err(PathlightError::validation(format!(
            "{name} must be within 0..=100, got {v}"
        )));
    }
    Ok(())
}

impl Settings {
    pub fn from_json_str(s: &str) -> PathlightResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn to_json_pretty(&self) -> PathlightResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> PathlightResult<()> {
        positive("speed", self.speed)?;
        positive("size", self.size)?;
        positive("fps", self.fps)?;
        percent("brightness", self.brightness)?;
        percent("smoothing", self.smoothing)?;
        Ok(())
    }

    /// Immutable parameter snapshot for one run.
    pub fn effect_params(&self) -> EffectParams {
        EffectParams {
            shape: self.shape,
            brightness: self.brightness,
            glow_intensity: self.glow_intensity,
            vignette_radius: self.vignette_radius,
            effect_color: self.effect_color,
            color_intensity: self.color_intensity,
            zoom_intensity: self.zoom_intensity,
            blur_intensity: self.blur_intensity,
            distortion: self.distortion,
            sharpen: self.sharpen,
        }
    }
}
