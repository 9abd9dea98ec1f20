//! Semi-implicit Euler stepper.

use crate::algorithms::ForceComposer;
use crate::body::{Body, BodyId, BodyRegistry};
use crate::config::{Bounds, SimulationConfig};
use crate::spring::SpringTable;
use crate::Vec3;

/// Outcome of one integration step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Bodies that went non-finite and were restored.
    pub recovered: Vec<BodyId>,
    /// Σ ½ m v² over moving bodies after the step.
    pub kinetic_energy: f64,
    /// Number of non-fixed bodies.
    pub moving: usize,
}

/// Advances bodies by one timestep. Holds the net-force buffer so ticks
/// do not allocate.
#[derive(Debug, Default)]
pub struct Stepper {
    forces: Vec<Vec3>,
}

impl Stepper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute forces for the current state, then integrate every
    /// non-fixed body. Force evaluation completes before any body moves.
    pub fn step(
        &mut self,
        bodies: &mut BodyRegistry,
        springs: &SpringTable,
        composer: &ForceComposer,
        config: &SimulationConfig,
    ) -> StepReport {
        let ctx = config.force_context();
        composer.accumulate(bodies, springs, &ctx, &mut self.forces);

        let mut report = StepReport::default();
        for (body, force) in bodies.as_mut_slice().iter_mut().zip(self.forces.iter()) {
            if body.fixed {
                continue;
            }
            report.moving += 1;
            if !integrate(body, force, config) {
                report.recovered.push(body.id.clone());
            }
            report.kinetic_energy += body.kinetic_energy();
        }
        report
    }
}

/// Integrate one body. Returns false if the body went non-finite and was
/// restored to its pre-step position at rest.
fn integrate(body: &mut Body, force: &Vec3, config: &SimulationConfig) -> bool {
    let dt = config.timestep;
    let start = body.position;

    let acc = force / body.mass;
    if !acc.iter().all(|c| c.is_finite()) {
        restore(body, start);
        return false;
    }
    body.acceleration = acc;

    body.velocity += acc * dt;
    if body.damping > 0.0 {
        body.velocity *= 1.0 - body.damping;
    }
    clamp_speed(&mut body.velocity, config.max_velocity);
    body.position += body.velocity * dt;

    if config.plane_2d {
        body.position.z = 0.0;
        body.velocity.z = 0.0;
        body.acceleration.z = 0.0;
    }
    if let Some(bounds) = &config.bounds {
        collide(body, bounds, config.restitution, config.plane_2d);
    }

    if !body.is_finite() {
        restore(body, start);
        return false;
    }
    true
}

fn restore(body: &mut Body, position: Vec3) {
    body.position = position;
    body.velocity = Vec3::zeros();
    body.acceleration = Vec3::zeros();
}

pub(crate) fn clamp_speed(v: &mut Vec3, max: f64) {
    let speed = v.norm();
    if speed > max && speed.is_finite() {
        *v *= max / speed;
    }
}

/// Clamp to the box and bounce the normal velocity back inward, keeping
/// `restitution` of it.
fn collide(body: &mut Body, bounds: &Bounds, restitution: f64, plane_2d: bool) {
    let axes = if plane_2d { 2 } else { 3 };
    for axis in 0..axes {
        let lo = bounds.min[axis] + body.radius;
        let hi = bounds.max[axis] - body.radius;
        if lo > hi {
            // wider than the box on this axis: park it in the middle
            body.position[axis] = 0.5 * (bounds.min[axis] + bounds.max[axis]);
            body.velocity[axis] = 0.0;
        } else if body.position[axis] < lo {
            body.position[axis] = lo;
            body.velocity[axis] = restitution * body.velocity[axis].abs();
        } else if body.position[axis] > hi {
            body.position[axis] = hi;
            body.velocity[axis] = -restitution * body.velocity[axis].abs();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::Force;

    fn registry(bodies: Vec<Body>) -> BodyRegistry {
        let mut reg = BodyRegistry::new();
        for b in bodies {
            reg.add(b).unwrap();
        }
        reg
    }

    #[test]
    fn semi_implicit_euler_uses_updated_velocity() {
        let mut reg = registry(vec![Body::new("a", Vec3::zeros())]);
        let composer = ForceComposer::new(vec![Force::UniformGravity {
            vector: Vec3::new(0.0, 10.0, 0.0),
        }]);
        let cfg = SimulationConfig {
            timestep: 0.1,
            ..Default::default()
        };

        Stepper::new().step(&mut reg, &SpringTable::new(), &composer, &cfg);
        let a = reg.get("a").unwrap();
        assert!((a.velocity.y - 1.0).abs() < 1e-12);
        assert!((a.position.y - 0.1).abs() < 1e-12);
        assert_eq!(a.acceleration, Vec3::new(0.0, 10.0, 0.0));
    }

    #[test]
    fn fixed_body_untouched_but_still_pushes() {
        let mut reg = registry(vec![
            Body::new("pin", Vec3::zeros()).pinned(),
            Body::new("free", Vec3::new(1.0, 0.0, 0.0)),
        ]);
        let composer = ForceComposer::new(vec![Force::Repulsion {
            strength: 1.0,
            cutoff: None,
        }]);
        let cfg = SimulationConfig::default();

        let mut stepper = Stepper::new();
        for _ in 0..10 {
            stepper.step(&mut reg, &SpringTable::new(), &composer, &cfg);
        }
        let pin = reg.get("pin").unwrap();
        assert_eq!(pin.position, Vec3::zeros());
        assert_eq!(pin.velocity, Vec3::zeros());
        assert!(reg.get("free").unwrap().position.x > 1.0);
    }

    #[test]
    fn speed_is_clamped() {
        let mut reg = registry(vec![Body::new("a", Vec3::zeros())]);
        let composer = ForceComposer::new(vec![Force::UniformGravity {
            vector: Vec3::new(1.0e9, 0.0, 0.0),
        }]);
        let cfg = SimulationConfig {
            max_velocity: 5.0,
            ..Default::default()
        };
        Stepper::new().step(&mut reg, &SpringTable::new(), &composer, &cfg);
        assert!((reg.get("a").unwrap().velocity.norm() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn upper_bound_reflects_downward() {
        let mut reg = registry(vec![
            Body::new("a", Vec3::new(9.9, 5.0, 0.0)).with_velocity(Vec3::new(60.0, 0.0, 0.0)),
        ]);
        let cfg = SimulationConfig {
            bounds: Some(Bounds::new(Vec3::zeros(), Vec3::new(10.0, 10.0, 0.0))),
            ..Default::default()
        };
        Stepper::new().step(&mut reg, &SpringTable::new(), &ForceComposer::default(), &cfg);
        let a = reg.get("a").unwrap();
        assert_eq!(a.position.x, 10.0);
        assert_eq!(a.velocity.x, -cfg.restitution * 60.0);
    }

    #[test]
    fn oversized_body_rests_at_box_center() {
        let mut reg = registry(vec![
            Body::new("a", Vec3::new(2.0, 7.0, 0.0))
                .with_radius(6.0)
                .with_velocity(Vec3::new(3.0, -4.0, 0.0)),
        ]);
        let cfg = SimulationConfig {
            bounds: Some(Bounds::new(Vec3::zeros(), Vec3::new(10.0, 10.0, 0.0))),
            ..Default::default()
        };
        let mut stepper = Stepper::new();
        for _ in 0..5 {
            stepper.step(&mut reg, &SpringTable::new(), &ForceComposer::default(), &cfg);
            let a = reg.get("a").unwrap();
            assert_eq!(a.position, Vec3::new(5.0, 5.0, 0.0));
            assert_eq!(a.velocity, Vec3::zeros());
        }
    }

    #[test]
    fn non_finite_force_is_recovered() {
        let mut reg = registry(vec![Body::new("a", Vec3::new(1.0, 2.0, 0.0))]);
        let composer = ForceComposer::new(vec![Force::UniformGravity {
            vector: Vec3::new(f64::INFINITY, 0.0, 0.0),
        }]);
        let report = Stepper::new().step(
            &mut reg,
            &SpringTable::new(),
            &composer,
            &SimulationConfig::default(),
        );
        assert_eq!(report.recovered, vec![BodyId::from("a")]);
        let a = reg.get("a").unwrap();
        assert_eq!(a.position, Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(a.velocity, Vec3::zeros());
    }

    #[test]
    fn per_body_damping_scales_velocity() {
        let mut reg = registry(vec![
            Body::new("a", Vec3::zeros())
                .with_velocity(Vec3::new(10.0, 0.0, 0.0))
                .with_damping(0.5),
        ]);
        Stepper::new().step(
            &mut reg,
            &SpringTable::new(),
            &ForceComposer::default(),
            &SimulationConfig::default(),
        );
        assert!((reg.get("a").unwrap().velocity.x - 5.0).abs() < 1e-12);
    }
}
