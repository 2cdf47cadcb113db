use crate::CONFY_APP_NAME;
use crate::animation::RotationInterpolation;
use crate::deform::Smoothing;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationSettings {
    pub rotation: RotationInterpolation,
    pub playback_speed: f32,
    pub looping: bool,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            rotation: RotationInterpolation::Slerp,
            playback_speed: 1.0,
            looping: true,
        }
    }
}

impl AnimationSettings {
    pub fn load() -> Self {
        confy::load(CONFY_APP_NAME, "animation").unwrap_or_default()
    }

    pub fn save(&self) {
        if let Err(e) = confy::store(CONFY_APP_NAME, "animation", self) {
            log::warn!("failed to store animation settings: {e}");
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeformSettings {
    pub smoothing: Smoothing,
    /// Soft-constraint weight; larger values pin constrained vertices harder
    pub penalty: f64,
}

impl Default for DeformSettings {
    fn default() -> Self {
        Self {
            smoothing: Smoothing::BiLaplacian,
            penalty: 1e6,
        }
    }
}

impl DeformSettings {
    pub fn load() -> Self {
        confy::load(CONFY_APP_NAME, "deform").unwrap_or_default()
    }

    pub fn save(&self) {
        if let Err(e) = confy::store(CONFY_APP_NAME, "deform", self) {
            log::warn!("failed to store deform settings: {e}");
        }
    }
}

// Aggregate struct for convenience
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub animation: AnimationSettings,
    pub deform: DeformSettings,
}

impl Settings {
    pub fn load() -> Self {
        Self {
            animation: AnimationSettings::load(),
            deform: DeformSettings::load(),
        }
    }

    pub fn save(&self) {
        self.animation.save();
        self.deform.save();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_serde() {
        let settings = Settings::default();
        let text = serde_json::to_string(&settings.deform).unwrap();
        let back: DeformSettings = serde_json::from_str(&text).unwrap();
        assert_eq!(back.smoothing, Smoothing::BiLaplacian);
        assert_eq!(back.penalty, 1e6);
        assert_eq!(settings.animation.rotation, RotationInterpolation::Slerp);
    }
}
