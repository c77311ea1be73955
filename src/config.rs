//! Tunable constants for the walkthrough.
//!
//! Defaults reproduce the classic pointer-lock walkthrough feel: strong
//! damping, a heavy fall and a large jump impulse, all in scene units.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::controller::input::KeyBindings;
use crate::error::{self, Result, WalkthroughError};

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "WALKTHROUGH_CONFIG";

/// Locomotion constants used by the integrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    /// Horizontal velocity decay rate per second (friction / air drag).
    pub damping: f32,
    /// Gravity term; multiplied by `mass` to get the fall acceleration.
    pub gravity: f32,
    /// Scaling factor on gravity, not a physical mass.
    pub mass: f32,
    /// Horizontal acceleration while a movement key is held.
    pub acceleration: f32,
    /// Vertical velocity added by a jump.
    pub jump_impulse: f32,
    /// Lowest permissible observer height.
    pub floor_height: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            damping: 5.0,
            gravity: 9.8,
            mass: 150.0,
            acceleration: 400.0,
            jump_impulse: 350.0,
            floor_height: -23.0,
        }
    }
}

impl LocomotionConfig {
    /// Effective downward acceleration.
    pub fn fall_acceleration(&self) -> f32 {
        self.gravity * self.mass
    }
}

/// Mouse-look parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookConfig {
    /// Radians per pointer unit.
    pub sensitivity: f32,
    /// Extra multiplier on top of `sensitivity`.
    pub pointer_speed: f32,
    /// Absolute pitch bound in radians, kept below π/2.
    pub pitch_limit: f32,
}

impl Default for LookConfig {
    fn default() -> Self {
        Self {
            sensitivity: 0.002,
            pointer_speed: 1.0,
            pitch_limit: std::f32::consts::FRAC_PI_2 - 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Upper bound on a single frame delta in seconds.
    pub max_dt: f32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self { max_dt: 0.1 }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkthroughConfig {
    pub locomotion: LocomotionConfig,
    pub look: LookConfig,
    pub clock: ClockConfig,
    pub bindings: KeyBindings,
    pub spawn: [f32; 3],
    pub spawn_yaw: f32,
    /// Keep integrating while pointer capture is released.
    pub simulate_while_released: bool,
    /// Optional scene manifest path; the built-in scene is used otherwise.
    pub scene: Option<String>,
}

impl Default for WalkthroughConfig {
    fn default() -> Self {
        Self {
            locomotion: LocomotionConfig::default(),
            look: LookConfig::default(),
            clock: ClockConfig::default(),
            bindings: KeyBindings::default(),
            spawn: [0.0, 0.0, 0.0],
            spawn_yaw: 0.0,
            simulate_while_released: false,
            scene: None,
        }
    }
}

impl WalkthroughConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = error::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Load from `$WALKTHROUGH_CONFIG`, falling back to defaults.
    pub fn from_env() -> Self {
        let Ok(path) = std::env::var(CONFIG_ENV) else {
            return Self::default();
        };
        match Self::load(&path) {
            Ok(config) => {
                tracing::info!(%path, "loaded config");
                config
            }
            Err(e) => {
                tracing::warn!(%path, error = %e, "config rejected, using defaults");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let loco = &self.locomotion;
        let non_negative = [
            ("locomotion.damping", loco.damping),
            ("locomotion.gravity", loco.gravity),
            ("locomotion.mass", loco.mass),
            ("locomotion.acceleration", loco.acceleration),
            ("locomotion.jump_impulse", loco.jump_impulse),
            ("look.sensitivity", self.look.sensitivity),
            ("look.pointer_speed", self.look.pointer_speed),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(WalkthroughError::InvalidConfig(format!(
                    "{name} must be finite and >= 0, got {value}"
                )));
            }
        }
        if !loco.floor_height.is_finite() {
            return Err(WalkthroughError::InvalidConfig(
                "locomotion.floor_height must be finite".into(),
            ));
        }
        let limit = self.look.pitch_limit;
        if !(limit > 0.0 && limit < std::f32::consts::FRAC_PI_2) {
            return Err(WalkthroughError::InvalidConfig(format!(
                "look.pitch_limit must be in (0, pi/2), got {limit}"
            )));
        }
        let max_dt = self.clock.max_dt;
        if !max_dt.is_finite() || max_dt <= 0.0 {
            return Err(WalkthroughError::InvalidConfig(format!(
                "clock.max_dt must be finite and > 0, got {max_dt}"
            )));
        }
        if self.spawn.iter().chain([&self.spawn_yaw]).any(|v| !v.is_finite()) {
            return Err(WalkthroughError::InvalidConfig("spawn must be finite".into()));
        }
        Ok(())
    }
}
