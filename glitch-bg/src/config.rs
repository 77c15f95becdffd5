use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

pub const DEFAULT_CHARACTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ!@#$&*()-_+=/[]{};:<>.,0123456789";

/// Everything the animator can be tuned with. Missing JSON fields take the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlitchConfig {
    pub colors: Vec<String>,
    pub mutation_interval_ms: u64,
    pub smooth: bool,
    pub characters: String,
    pub outer_vignette: bool,
    pub center_vignette: bool,
    pub mutation_fraction: f64,
    pub transition_step: f32,
    pub cell_width: u32,
    pub cell_height: u32,
    pub font_size: u32,
    pub opacity: f64,
    pub resize_debounce_ms: u64,
}

impl Default for GlitchConfig {
    fn default() -> Self {
        Self {
            colors: vec!["#2b4539".into(), "#61dca3".into(), "#61b3dc".into()],
            mutation_interval_ms: 50,
            smooth: true,
            characters: DEFAULT_CHARACTERS.into(),
            outer_vignette: true,
            center_vignette: false,
            mutation_fraction: 0.05,
            transition_step: 0.05,
            cell_width: 10,
            cell_height: 20,
            font_size: 16,
            opacity: 0.65,
            resize_debounce_ms: 100,
        }
    }
}

impl GlitchConfig {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Colors are not checked here; the palette filters them.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.cell_width == 0 {
            return Err(ConfigError::invalid("cell_width", "must be positive"));
        }
        if self.cell_height == 0 {
            return Err(ConfigError::invalid("cell_height", "must be positive"));
        }
        if self.font_size == 0 {
            return Err(ConfigError::invalid("font_size", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.mutation_fraction) {
            return Err(ConfigError::invalid(
                "mutation_fraction",
                format!("{} is not within [0, 1]", self.mutation_fraction),
            ));
        }
        if !(self.transition_step > 0.0 && self.transition_step <= 1.0) {
            return Err(ConfigError::invalid(
                "transition_step",
                format!("{} is not within (0, 1]", self.transition_step),
            ));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(ConfigError::invalid(
                "opacity",
                format!("{} is not within [0, 1]", self.opacity),
            ));
        }

        Ok(())
    }

    pub fn mutation_interval(&self) -> Duration {
        Duration::from_millis(self.mutation_interval_ms)
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    /// Glyphs to draw from; an empty set means the default one.
    pub fn glyphs(&self) -> Vec<char> {
        let source = if self.characters.is_empty() {
            DEFAULT_CHARACTERS
        } else {
            &self.characters
        };

        source.chars().collect()
    }

    pub fn font(&self) -> String {
        format!("{}px monospace", self.font_size)
    }
}
