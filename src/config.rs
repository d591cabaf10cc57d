//! Engine configuration
//!
//! All tunables live here: plane size, zoom limits, momentum decay, autopan
//! band, placement sampling and centering timing. Configuration files may be
//! YAML (`.yaml`, `.yml`) or JSON (`.json`); every section is optional and
//! falls back to its defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::io::{DocumentFormat, IoError, read_document};

/// Errors that can occur while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read or parsed
    #[error(transparent)]
    Io(#[from] IoError),

    /// The configuration parsed but violates an invariant
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Size of the wrap-around plane, in plane units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaneConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for PlaneConfig {
    fn default() -> Self {
        Self {
            width: 3000.0,
            height: 3000.0,
        }
    }
}

/// Zoom limits and eased-transition smoothing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Smallest allowed scale
    pub min_scale: f32,
    /// Largest allowed scale
    pub max_scale: f32,
    /// Fraction of the remaining distance covered per frame by eased
    /// transitions (higher = faster)
    pub smoothing: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 10.0,
            smoothing: 0.12,
        }
    }
}

/// Gesture interpretation tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// How strongly a pinch ratio is amplified: `1 + (ratio - 1) * k`
    pub pinch_amplification: f32,
    /// Scale factor for one wheel notch towards the user (zoom out)
    pub wheel_zoom_out: f32,
    /// Scale factor for one wheel notch away from the user (zoom in)
    pub wheel_zoom_in: f32,
    /// Zoom steps ease towards their target instead of jumping
    pub ease_zoom: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            pinch_amplification: 2.0,
            wheel_zoom_out: 0.9,
            wheel_zoom_in: 1.1,
            ease_zoom: true,
        }
    }
}

/// Post-release inertia
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumConfig {
    /// Ease-out window measured from the gesture start, in milliseconds
    pub window_ms: f64,
    /// Multiplier from velocity (units/ms) to per-frame displacement
    pub gain: f32,
    /// Per-frame velocity decay; must be strictly inside (0, 1)
    pub damping: f32,
    /// Momentum stops once both displacement components fall below this
    pub epsilon: f32,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            window_ms: 300.0,
            gain: 10.0,
            damping: 0.92,
            epsilon: 0.1,
        }
    }
}

/// Edge autopan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopanConfig {
    pub enabled: bool,
    /// Thickness of the band along each screen edge, in pixels
    pub band: f32,
    /// Nudge per pixel of penetration into the band, per frame
    pub gain: f32,
}

impl Default for AutopanConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            band: 200.0,
            gain: 0.05,
        }
    }
}

/// What happens to known placements when the entry collection is replaced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReshufflePolicy {
    /// Ids that survive a refresh keep their placement
    #[default]
    Preserve,
    /// Every refresh draws new placements for every id
    Regenerate,
}

/// Placement sampling for the toroidal layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Seed mixed into every per-entry placement draw
    pub seed: u64,
    /// Lower bound (inclusive) of the parallax speed band
    pub speed_min: f32,
    /// Upper bound (exclusive) of the parallax speed band
    pub speed_max: f32,
    /// Maximum number of entries positioned at once
    pub render_cap: Option<usize>,
    pub reshuffle: ReshufflePolicy,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed_d81f,
            speed_min: 0.2,
            speed_max: 2.0,
            render_cap: None,
            reshuffle: ReshufflePolicy::Preserve,
        }
    }
}

/// Centering animation and card hit-testing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CenteringConfig {
    pub duration_ms: f64,
    /// Zoom used when centering on a newly registered entry
    pub newest_scale: f32,
    /// Zoom used when centering on a selected entry
    pub select_scale: f32,
    /// Jump straight to the target instead of tweening
    pub reduced_motion: bool,
    /// Card box used for selection hit-testing, in screen pixels
    pub card_width: f32,
    pub card_height: f32,
}

impl Default for CenteringConfig {
    fn default() -> Self {
        Self {
            duration_ms: 500.0,
            newest_scale: 1.5,
            select_scale: 1.5,
            reduced_motion: false,
            card_width: 192.0,
            card_height: 120.0,
        }
    }
}

/// Kind of device the engine drives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceProfile {
    #[default]
    Desktop,
    /// Touch-first, constrained device: no hover pointer, capped rendering
    Touch,
}

/// Render cap applied on touch devices when none is configured
pub const TOUCH_RENDER_CAP: usize = 50;

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub device: DeviceProfile,
    pub plane: PlaneConfig,
    pub viewport: ViewportConfig,
    pub input: InputConfig,
    pub momentum: MomentumConfig,
    pub autopan: AutopanConfig,
    pub layout: LayoutConfig,
    pub centering: CenteringConfig,
}

impl EngineConfig {
    /// Defaults tuned for the given device
    pub fn for_device(device: DeviceProfile) -> Self {
        Self {
            device,
            ..Default::default()
        }
    }

    /// Render cap after applying the device profile
    pub fn effective_render_cap(&self) -> Option<usize> {
        match self.device {
            DeviceProfile::Desktop => self.layout.render_cap,
            DeviceProfile::Touch => Some(self.layout.render_cap.unwrap_or(TOUCH_RENDER_CAP)),
        }
    }

    /// Whether edge autopan runs at all
    pub fn autopan_enabled(&self) -> bool {
        self.autopan.enabled && self.device == DeviceProfile::Desktop
    }

    /// Load configuration from a YAML or JSON file, chosen by extension
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let config: Self = read_document(path)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded engine configuration");
        Ok(config)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = DocumentFormat::Yaml.parse(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: Self = DocumentFormat::Json.parse(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the engine relies on
    pub fn validate(&self) -> ConfigResult<()> {
        fn positive(name: &str, value: f64) -> ConfigResult<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!(
                    "{name} must be positive and finite, got {value}"
                )))
            }
        }

        positive("plane.width", self.plane.width.into())?;
        positive("plane.height", self.plane.height.into())?;
        positive("viewport.min_scale", self.viewport.min_scale.into())?;
        positive("viewport.max_scale", self.viewport.max_scale.into())?;
        if self.viewport.min_scale > self.viewport.max_scale {
            return Err(ConfigError::Invalid(format!(
                "viewport.min_scale ({}) exceeds viewport.max_scale ({})",
                self.viewport.min_scale, self.viewport.max_scale
            )));
        }
        if !(self.viewport.smoothing > 0.0 && self.viewport.smoothing <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "viewport.smoothing must be in (0, 1], got {}",
                self.viewport.smoothing
            )));
        }

        positive("input.pinch_amplification", self.input.pinch_amplification.into())?;
        positive("input.wheel_zoom_out", self.input.wheel_zoom_out.into())?;
        positive("input.wheel_zoom_in", self.input.wheel_zoom_in.into())?;

        // Momentum only terminates if damping is below 1
        if !(self.momentum.damping > 0.0 && self.momentum.damping < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "momentum.damping must be strictly between 0 and 1, got {}",
                self.momentum.damping
            )));
        }
        positive("momentum.gain", self.momentum.gain.into())?;
        positive("momentum.window_ms", self.momentum.window_ms)?;
        positive("momentum.epsilon", self.momentum.epsilon.into())?;

        if self.autopan.band < 0.0 || !self.autopan.band.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "autopan.band must be non-negative, got {}",
                self.autopan.band
            )));
        }
        if self.autopan.gain < 0.0 || !self.autopan.gain.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "autopan.gain must be non-negative, got {}",
                self.autopan.gain
            )));
        }

        if !(self.layout.speed_min.is_finite()
            && self.layout.speed_max.is_finite()
            && self.layout.speed_min < self.layout.speed_max)
        {
            return Err(ConfigError::Invalid(format!(
                "layout speed band [{}, {}) is empty",
                self.layout.speed_min, self.layout.speed_max
            )));
        }
        positive("layout.speed_min", self.layout.speed_min.into())?;

        positive("centering.duration_ms", self.centering.duration_ms)?;
        positive("centering.newest_scale", self.centering.newest_scale.into())?;
        positive("centering.select_scale", self.centering.select_scale.into())?;
        positive("centering.card_width", self.centering.card_width.into())?;
        positive("centering.card_height", self.centering.card_height.into())?;

        Ok(())
    }
}
