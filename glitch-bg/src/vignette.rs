use crate::config::GlitchConfig;

/// Class names the page stylesheet keys on. The host only creates the
/// elements; positioning and gradients come from the page.
pub const CANVAS_CLASS: &str = "hero-background__canvas";
pub const SCRIM_CLASS: &str = "hero-background__scrim";
pub const OUTER_CLASS: &str = "hero-background__outer-vignette";
pub const CENTER_CLASS: &str = "hero-background__center-vignette";

/// Black radial overlays stacked over the glyphs.
///
/// Both gradients are circles sized to the farthest corner, so a radius of
/// `1.0` is the distance from the center to a corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Vignette {
    pub outer: bool,
    pub center: bool,
}

impl Vignette {
    pub fn from_config(config: &GlitchConfig) -> Self {
        Self {
            outer: config.outer_vignette,
            center: config.center_vignette,
        }
    }

    /// Darkens the edges: clear up to 60% of the radius, opaque at the corners.
    pub fn outer_alpha(radius: f64) -> f64 {
        ((radius - 0.6) / 0.4).clamp(0.0, 1.0)
    }

    /// Darkens the middle: 0.8 at the center fading out by 60% of the radius.
    pub fn center_alpha(radius: f64) -> f64 {
        (0.8 * (1.0 - radius / 0.6)).clamp(0.0, 0.8)
    }

    /// Combined overlay alpha at pixel `(x, y)` of a `width` by `height` box.
    pub fn alpha_at(&self, x: f64, y: f64, width: f64, height: f64) -> f64 {
        if !self.outer && !self.center {
            return 0.0;
        }

        let (cx, cy) = (width / 2.0, height / 2.0);
        let corner = (cx * cx + cy * cy).sqrt();
        if corner <= 0.0 {
            return 0.0;
        }

        let radius = ((x - cx).powi(2) + (y - cy).powi(2)).sqrt() / corner;

        let mut clear = 1.0;
        if self.outer {
            clear *= 1.0 - Self::outer_alpha(radius);
        }
        if self.center {
            clear *= 1.0 - Self::center_alpha(radius);
        }

        1.0 - clear
    }

    /// Classes of the overlay elements stacked above the canvas, bottom
    /// first. The scrim is always there.
    pub fn overlay_classes(&self) -> Vec<&'static str> {
        let mut layers = vec![SCRIM_CLASS];
        if self.outer {
            layers.push(OUTER_CLASS);
        }
        if self.center {
            layers.push(CENTER_CLASS);
        }
        layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_is_transparent() {
        assert_eq!(Vignette::default().alpha_at(0.0, 0.0, 100.0, 100.0), 0.0);
    }

    #[test]
    fn outer_darkens_corners_only() {
        let v = Vignette { outer: true, center: false };

        assert_eq!(v.alpha_at(50.0, 50.0, 100.0, 100.0), 0.0);
        assert!((v.alpha_at(0.0, 0.0, 100.0, 100.0) - 1.0).abs() < 1e-9);
        assert!(v.alpha_at(5.0, 50.0, 100.0, 100.0) > 0.0);
    }

    #[test]
    fn center_darkens_middle_only() {
        let v = Vignette { outer: false, center: true };

        assert!((v.alpha_at(50.0, 50.0, 100.0, 100.0) - 0.8).abs() < 1e-9);
        assert_eq!(v.alpha_at(0.0, 0.0, 100.0, 100.0), 0.0);
    }

    #[test]
    fn layers_follow_toggles() {
        let both = Vignette { outer: true, center: true };
        assert_eq!(
            both.overlay_classes(),
            [
                "hero-background__scrim",
                "hero-background__outer-vignette",
                "hero-background__center-vignette",
            ]
        );

        let center = Vignette { outer: false, center: true };
        assert_eq!(center.overlay_classes(), [SCRIM_CLASS, CENTER_CLASS]);
    }

    #[test]
    fn scrim_survives_with_vignettes_off() {
        assert_eq!(Vignette::default().overlay_classes(), ["hero-background__scrim"]);
        assert_eq!(CANVAS_CLASS, "hero-background__canvas");
    }

    #[test]
    fn default_config_has_outer_only() {
        let v = Vignette::from_config(&GlitchConfig::default());
        assert_eq!(v, Vignette { outer: true, center: false });
    }
}
