use serde::{Deserialize, Serialize};

use crate::algorithms::{Force, ForceContext};
use crate::error::{PhysicsError, Result};
use crate::Vec3;

pub const DEFAULT_TIMESTEP: f64 = 1.0 / 60.0;
pub const DEFAULT_MAX_VELOCITY: f64 = 1000.0;
pub const DEFAULT_RESTITUTION: f64 = 0.75;
pub const DEFAULT_EPSILON: f64 = 1.0e-2;

/// Axis-aligned simulation box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    fn validate(&self, plane_2d: bool) -> Result<()> {
        let axes = if plane_2d { 2 } else { 3 };
        for axis in 0..axes {
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if !lo.is_finite() || !hi.is_finite() || lo >= hi {
                return Err(PhysicsError::InvalidConfig(format!(
                    "bounds axis {axis}: min ({lo}) must be below max ({hi})"
                )));
            }
        }
        Ok(())
    }
}

/// Dynamics parameters. Topology (bodies, springs) lives elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationConfig {
    /// Ambient gravity, applied as `mass * gravity` to every body.
    pub gravity: Vec3,
    /// Ambient linear drag coefficient.
    pub drag: f64,
    pub bounds: Option<Bounds>,
    /// Seconds advanced per tick.
    pub timestep: f64,
    pub active_forces: Vec<Force>,
    /// Preset these values came from, cleared when they are edited.
    pub preset: Option<String>,
    /// Speed cap applied after every velocity update.
    pub max_velocity: f64,
    /// Fraction of the normal velocity kept after hitting a bound.
    pub restitution: f64,
    /// Floor on squared distance for 1/d² forces.
    pub epsilon: f64,
    /// Keep bodies in the z = 0 plane.
    #[serde(rename = "plane2d")]
    pub plane_2d: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::zeros(),
            drag: 0.0,
            bounds: None,
            timestep: DEFAULT_TIMESTEP,
            active_forces: Vec::new(),
            preset: None,
            max_velocity: DEFAULT_MAX_VELOCITY,
            restitution: DEFAULT_RESTITUTION,
            epsilon: DEFAULT_EPSILON,
            plane_2d: true,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(PhysicsError::InvalidConfig(msg));

        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return invalid(format!("timestep must be positive, got {}", self.timestep));
        }
        if !self.gravity.iter().all(|c| c.is_finite()) {
            return invalid("gravity must be finite".to_string());
        }
        if !self.drag.is_finite() || self.drag < 0.0 {
            return invalid(format!("drag must be non-negative, got {}", self.drag));
        }
        if !self.max_velocity.is_finite() || self.max_velocity <= 0.0 {
            return invalid(format!(
                "maxVelocity must be positive, got {}",
                self.max_velocity
            ));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return invalid(format!(
                "restitution must lie in [0, 1], got {}",
                self.restitution
            ));
        }
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return invalid(format!("epsilon must be positive, got {}", self.epsilon));
        }
        if let Some(bounds) = &self.bounds {
            bounds.validate(self.plane_2d)?;
        }
        for force in &self.active_forces {
            force.validate()?;
        }
        Ok(())
    }

    /// Apply `patch` on a copy and validate it. `self` is never modified.
    pub fn merged(&self, patch: &ConfigPatch) -> Result<Self> {
        let mut next = self.clone();
        let mut dynamics_changed = false;

        if let Some(g) = patch.gravity {
            next.gravity = g;
            dynamics_changed = true;
        }
        if let Some(d) = patch.drag {
            next.drag = d;
            dynamics_changed = true;
        }
        if let Some(forces) = &patch.active_forces {
            next.active_forces = forces.clone();
            dynamics_changed = true;
        }
        if patch.clear_bounds {
            next.bounds = None;
        }
        if let Some(b) = patch.bounds {
            next.bounds = Some(b);
        }
        if let Some(dt) = patch.timestep {
            next.timestep = dt;
        }
        if let Some(v) = patch.max_velocity {
            next.max_velocity = v;
        }
        if let Some(r) = patch.restitution {
            next.restitution = r;
        }
        if let Some(e) = patch.epsilon {
            next.epsilon = e;
        }
        if let Some(p) = patch.plane_2d {
            next.plane_2d = p;
        }
        if dynamics_changed {
            next.preset = None;
        }

        next.validate()?;
        Ok(next)
    }

    pub fn force_context(&self) -> ForceContext {
        ForceContext {
            epsilon: self.epsilon,
            gravity: self.gravity,
            drag: self.drag,
        }
    }
}

/// Partial config update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigPatch {
    pub gravity: Option<Vec3>,
    pub drag: Option<f64>,
    pub bounds: Option<Bounds>,
    /// Remove the bounds (applied before `bounds`).
    pub clear_bounds: bool,
    pub timestep: Option<f64>,
    pub active_forces: Option<Vec<Force>>,
    pub max_velocity: Option<f64>,
    pub restitution: Option<f64>,
    pub epsilon: Option<f64>,
    #[serde(rename = "plane2d")]
    pub plane_2d: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = SimulationConfig::default();
        cfg.validate().unwrap();
        assert!((cfg.timestep - 1.0 / 60.0).abs() < 1e-15);
    }

    #[test]
    fn non_positive_timestep_rejected() {
        let cfg = SimulationConfig::default();
        let patch = ConfigPatch {
            timestep: Some(0.0),
            ..Default::default()
        };
        assert!(matches!(cfg.merged(&patch), Err(PhysicsError::InvalidConfig(_))));
    }

    #[test]
    fn malformed_bounds_rejected() {
        let cfg = SimulationConfig::default();
        let patch = ConfigPatch {
            bounds: Some(Bounds::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 10.0, 0.0))),
            ..Default::default()
        };
        assert!(cfg.merged(&patch).is_err());
    }

    #[test]
    fn flat_bounds_allowed_on_z_in_plane_mode() {
        let cfg = SimulationConfig::default();
        let patch = ConfigPatch {
            bounds: Some(Bounds::new(Vec3::zeros(), Vec3::new(10.0, 10.0, 0.0))),
            ..Default::default()
        };
        assert!(cfg.merged(&patch).is_ok());

        let patch_3d = ConfigPatch {
            plane_2d: Some(false),
            ..patch
        };
        assert!(cfg.merged(&patch_3d).is_err());
    }

    #[test]
    fn editing_dynamics_clears_preset_label() {
        let cfg = SimulationConfig {
            preset: Some("force-directed".to_string()),
            ..Default::default()
        };
        let timestep_only = cfg
            .merged(&ConfigPatch {
                timestep: Some(0.01),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(timestep_only.preset.as_deref(), Some("force-directed"));

        let drag = cfg
            .merged(&ConfigPatch {
                drag: Some(0.3),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(drag.preset, None);
    }

    #[test]
    fn patch_deserializes_from_camel_case() {
        let patch: ConfigPatch =
            serde_json::from_str(r#"{"maxVelocity":50.0,"plane2d":false,"clearBounds":true}"#)
                .unwrap();
        assert_eq!(patch.max_velocity, Some(50.0));
        assert_eq!(patch.plane_2d, Some(false));
        assert!(patch.clear_bounds);
    }
}
