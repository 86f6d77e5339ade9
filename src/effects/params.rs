use crate::foundation::core::Rgb8;

/// Outline of the focus region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    #[default]
    #[serde(alias = "Cercle", alias = "Circle")]
    Circle,
    #[serde(alias = "Carré", alias = "Square")]
    Square,
}

/// Immutable parameter snapshot for one run. Effects read the fields they declare and ignore
/// the rest.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectParams {
    pub shape: Shape,
    /// Background brightness in percent, `0..=100`.
    pub brightness: f64,
    /// Glow width as a percentage of the core radius.
    pub glow_intensity: f64,
    /// Pixels from the center at which the vignette becomes fully dark.
    pub vignette_radius: f64,
    pub effect_color: Rgb8,
    /// Tint strength in percent.
    pub color_intensity: f64,
    /// Extra magnification in percent (`50` means ×1.5).
    pub zoom_intensity: f64,
    pub blur_intensity: f64,
    /// Lens distortion in percent; the radial coefficient is `-distortion / 200`.
    pub distortion: f64,
    pub sharpen: bool,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            shape: Shape::Circle,
            brightness: 50.0,
            glow_intensity: 50.0,
            vignette_radius: 300.0,
            effect_color: Rgb8::new(255, 0, 255),
            color_intensity: 50.0,
            zoom_intensity: 50.0,
            blur_intensity: 50.0,
            distortion: 20.0,
            sharpen: false,
        }
    }
}

/// A single named parameter value, for listing what an effect consumes.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Color(Rgb8),
    Shape(Shape),
    Flag(bool),
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Color(c) => write!(f, "{c}"),
            Self::Shape(Shape::Circle) => f.write_str("circle"),
            Self::Shape(Shape::Square) => f.write_str("square"),
            Self::Flag(b) => write!(f, "{b}"),
        }
    }
}

impl EffectParams {
    /// Look a parameter up by its settings key.
    pub fn get(&self, name: &str) -> Option<ParamValue> {
        let v = match name {
            "shape" => ParamValue::Shape(self.shape),
            "brightness" => ParamValue::Number(self.brightness),
            "glow_intensity" => ParamValue::Number(self.glow_intensity),
            "vignette_radius" => ParamValue::Number(self.vignette_radius),
            "effect_color" => ParamValue::Color(self.effect_color),
            "color_intensity" => ParamValue::Number(self.color_intensity),
            "zoom_intensity" => ParamValue::Number(self.zoom_intensity),
            "blur_intensity" => ParamValue::Number(self.blur_intensity),
            "distortion" => ParamValue::Number(self.distortion),
            "sharpen" => ParamValue::Flag(self.sharpen),
            _ => return None,
        };
        Some(v)
    }

    /// Background multiplier in `[0, 1]`.
    pub fn brightness_factor(&self) -> f32 {
        (self.brightness / 100.0).clamp(0.0, 1.0) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_accepts_legacy_names() {
        let s: Shape = serde_json::from_str("\"Cercle\"").unwrap();
        assert_eq!(s, Shape::Circle);
        let s: Shape = serde_json::from_str("\"Carré\"").unwrap();
        assert_eq!(s, Shape::Square);
        assert_eq!(serde_json::to_string(&Shape::Square).unwrap(), "\"square\"");
    }

    #[test]
    fn lookup_by_key() {
        let p = EffectParams::default();
        assert_eq!(p.get("zoom_intensity"), Some(ParamValue::Number(50.0)));
        assert_eq!(p.get("shape"), Some(ParamValue::Shape(Shape::Circle)));
        assert_eq!(p.get("speed"), None);
    }

    #[test]
    fn brightness_factor_is_clamped() {
        let p = EffectParams {
            brightness: 140.0,
            ..EffectParams::default()
        };
        assert_eq!(p.brightness_factor(), 1.0);
    }
}
