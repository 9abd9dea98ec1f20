//! Force generators and their composition.
//!
//! Every active [`Force`] adds a contribution into a per-body net-force
//! buffer; the stepper divides by mass afterwards. Contributions are summed
//! in list order, so reordering the list only changes rounding, never the
//! physics.

pub mod fields;
pub mod pairwise;
pub mod springs;

use serde::{Deserialize, Serialize};

use crate::body::BodyRegistry;
use crate::error::{PhysicsError, Result};
use crate::spring::SpringTable;
use crate::Vec3;

/// One force rule. Adding a variant forces every `match` below to handle it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Force {
    /// Pairwise push-apart, magnitude `strength * q_i * q_j / max(d², ε)`.
    Repulsion {
        strength: f64,
        /// Pairs farther apart than this are ignored.
        #[serde(default)]
        cutoff: Option<f64>,
    },
    /// Implicit spring force from the spring table.
    Springs,
    /// Linear pull `strength * (target - position)`.
    CenterAttraction { target: Vec3, strength: f64 },
    /// `-coefficient * velocity`.
    LinearDrag { coefficient: f64 },
    /// Constant `mass * vector`.
    UniformGravity { vector: Vec3 },
    /// Pairwise attraction `constant * m_i * m_j / max(d², ε)`.
    NBodyGravity { constant: f64 },
}

impl Force {
    pub fn label(&self) -> &'static str {
        match self {
            Force::Repulsion { .. } => "repulsion",
            Force::Springs => "springs",
            Force::CenterAttraction { .. } => "center-attraction",
            Force::LinearDrag { .. } => "linear-drag",
            Force::UniformGravity { .. } => "uniform-gravity",
            Force::NBodyGravity { .. } => "n-body-gravity",
        }
    }

    pub fn validate(&self) -> Result<()> {
        let bad = |what: &str| {
            Err(PhysicsError::InvalidConfig(format!(
                "{}: {what}",
                self.label()
            )))
        };
        match self {
            Force::Repulsion { strength, cutoff } => {
                if !strength.is_finite() {
                    return bad("strength must be finite");
                }
                if let Some(c) = cutoff {
                    if !c.is_finite() || *c <= 0.0 {
                        return bad("cutoff must be finite and positive");
                    }
                }
            }
            Force::Springs => {}
            Force::CenterAttraction { target, strength } => {
                if !strength.is_finite() || !target.iter().all(|c| c.is_finite()) {
                    return bad("target and strength must be finite");
                }
            }
            Force::LinearDrag { coefficient } => {
                if !coefficient.is_finite() || *coefficient < 0.0 {
                    return bad("coefficient must be finite and non-negative");
                }
            }
            Force::UniformGravity { vector } => {
                if !vector.iter().all(|c| c.is_finite()) {
                    return bad("vector must be finite");
                }
            }
            Force::NBodyGravity { constant } => {
                if !constant.is_finite() {
                    return bad("constant must be finite");
                }
            }
        }
        Ok(())
    }
}

/// Scalars shared by every force during one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceContext {
    /// Floor on squared distance for the 1/d² kernels.
    pub epsilon: f64,
    /// Ambient gravity from the config, applied as `mass * gravity`.
    pub gravity: Vec3,
    /// Ambient linear drag from the config.
    pub drag: f64,
}

/// Ordered list of active forces.
#[derive(Debug, Clone, Default)]
pub struct ForceComposer {
    forces: Vec<Force>,
}

impl ForceComposer {
    pub fn new(forces: Vec<Force>) -> Self {
        Self { forces }
    }

    pub fn forces(&self) -> &[Force] {
        &self.forces
    }

    pub fn set_forces(&mut self, forces: Vec<Force>) {
        self.forces = forces;
    }

    /// Write the net force on every body into `out` (resized to fit).
    ///
    /// Fixed bodies receive contributions like any other; the stepper
    /// decides what to do with them.
    pub fn accumulate(
        &self,
        bodies: &BodyRegistry,
        springs: &SpringTable,
        ctx: &ForceContext,
        out: &mut Vec<Vec3>,
    ) {
        out.clear();
        out.resize(bodies.len(), Vec3::zeros());
        if bodies.is_empty() {
            return;
        }
        let slice = bodies.as_slice();

        for force in &self.forces {
            match force {
                Force::Repulsion { strength, cutoff } => {
                    pairwise::repulsion(slice, *strength, *cutoff, ctx.epsilon, out)
                }
                Force::Springs => springs::apply(bodies, springs, out),
                Force::CenterAttraction { target, strength } => {
                    fields::center_attraction(slice, target, *strength, out)
                }
                Force::LinearDrag { coefficient } => fields::linear_drag(slice, *coefficient, out),
                Force::UniformGravity { vector } => fields::uniform_gravity(slice, vector, out),
                Force::NBodyGravity { constant } => {
                    pairwise::n_body(slice, *constant, ctx.epsilon, out)
                }
            }
        }

        if ctx.gravity != Vec3::zeros() {
            fields::uniform_gravity(slice, &ctx.gravity, out);
        }
        if ctx.drag > 0.0 {
            fields::linear_drag(slice, ctx.drag, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;

    fn ctx() -> ForceContext {
        ForceContext {
            epsilon: 1e-2,
            gravity: Vec3::zeros(),
            drag: 0.0,
        }
    }

    fn two_bodies(dx: f64) -> BodyRegistry {
        let mut reg = BodyRegistry::new();
        reg.add(Body::new("a", Vec3::zeros())).unwrap();
        reg.add(Body::new("b", Vec3::new(dx, 0.0, 0.0))).unwrap();
        reg
    }

    #[test]
    fn order_of_forces_does_not_change_sum() {
        let mut reg = two_bodies(3.0);
        reg.get_mut("b").unwrap().velocity = Vec3::new(0.5, -1.0, 0.0);
        let springs = SpringTable::new();

        let forces = vec![
            Force::Repulsion {
                strength: 10.0,
                cutoff: None,
            },
            Force::CenterAttraction {
                target: Vec3::new(1.0, 1.0, 0.0),
                strength: 0.25,
            },
            Force::LinearDrag { coefficient: 0.5 },
            Force::UniformGravity {
                vector: Vec3::new(0.0, 2.0, 0.0),
            },
        ];
        let mut reversed = forces.clone();
        reversed.reverse();

        let mut out_a = Vec::new();
        let mut out_b = Vec::new();
        ForceComposer::new(forces).accumulate(&reg, &springs, &ctx(), &mut out_a);
        ForceComposer::new(reversed).accumulate(&reg, &springs, &ctx(), &mut out_b);

        for (a, b) in out_a.iter().zip(out_b.iter()) {
            assert!((a - b).norm() < 1e-12);
        }
    }

    #[test]
    fn ambient_gravity_and_drag_are_added() {
        let mut reg = two_bodies(1.0);
        reg.get_mut("a").unwrap().velocity = Vec3::new(2.0, 0.0, 0.0);
        let springs = SpringTable::new();
        let c = ForceContext {
            epsilon: 1e-2,
            gravity: Vec3::new(0.0, -10.0, 0.0),
            drag: 0.5,
        };

        let mut out = Vec::new();
        ForceComposer::default().accumulate(&reg, &springs, &c, &mut out);
        assert_eq!(out[0], Vec3::new(-1.0, -10.0, 0.0));
        assert_eq!(out[1], Vec3::new(0.0, -10.0, 0.0));
    }

    #[test]
    fn invalid_force_parameters_rejected() {
        assert!(Force::LinearDrag { coefficient: -1.0 }.validate().is_err());
        assert!(
            Force::Repulsion {
                strength: 1.0,
                cutoff: Some(0.0)
            }
            .validate()
            .is_err()
        );
        assert!(Force::NBodyGravity { constant: f64::NAN }.validate().is_err());
        assert!(Force::Springs.validate().is_ok());
    }

    #[test]
    fn force_serializes_with_type_tag() {
        let f: Force = serde_json::from_str(r#"{"type":"repulsion","strength":30.0}"#).unwrap();
        assert_eq!(
            f,
            Force::Repulsion {
                strength: 30.0,
                cutoff: None
            }
        );
        let g: Force = serde_json::from_str(r#"{"type":"springs"}"#).unwrap();
        assert_eq!(g, Force::Springs);
    }
}
