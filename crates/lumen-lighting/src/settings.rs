use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::Path;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneMapping {
    #[default]
    None,
    Reinhard,
    ReinhardExtended,
    ReinhardJodie,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityMapping {
    #[default]
    Linear,
    Smoothstep,
    SmoothstepSquared,
}

/// Inputs to one light recomputation. Jobs capture an `Arc` of this at start
/// and never observe a later change mid-computation.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LightingSettings {
    /// When false every cell is published fully bright.
    pub enabled: bool,
    pub tone_mapping: ToneMapping,
    /// Input level mapped to 1.0 by `reinhard_extended`.
    pub white_point: f32,
    pub intensity_mapping: IntensityMapping,
    pub intensity_multiplier: f32,
    /// Scale tinted sources up to the energy of white light.
    pub tint_compensation: bool,
    pub occlusion: bool,
    /// Source search radius in blocks, also the falloff distance.
    pub lookup_radius: u32,
    /// Averages at or below this level publish as dark.
    pub darkness_floor: f32,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tone_mapping: ToneMapping::None,
            white_point: 4.0,
            intensity_mapping: IntensityMapping::Linear,
            intensity_multiplier: 1.0,
            tint_compensation: true,
            occlusion: true,
            lookup_radius: 8,
            darkness_floor: 0.0,
        }
    }
}

impl LightingSettings {
    #[inline]
    pub fn radius(&self) -> i32 {
        self.lookup_radius as i32
    }

    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.lookup_radius == 0 {
            return Err("lookup_radius must be positive".into());
        }
        if self.lookup_radius > 64 {
            return Err(format!("lookup_radius {} exceeds 64", self.lookup_radius).into());
        }
        if !(self.intensity_multiplier >= 0.0) {
            return Err(format!(
                "intensity_multiplier must be non-negative, got {}",
                self.intensity_multiplier
            )
            .into());
        }
        if !(self.white_point > 0.0) {
            return Err(format!("white_point must be positive, got {}", self.white_point).into());
        }
        if !(0.0..1.0).contains(&self.darkness_floor) {
            return Err(format!(
                "darkness_floor must be in [0, 1), got {}",
                self.darkness_floor
            )
            .into());
        }
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> Result<Self, Box<dyn Error>> {
        let settings: LightingSettings = toml::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }
}
