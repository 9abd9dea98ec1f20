//! Per-body field forces that do not depend on other bodies.

use crate::body::Body;
use crate::Vec3;

pub fn center_attraction(bodies: &[Body], target: &Vec3, strength: f64, out: &mut [Vec3]) {
    for (b, f) in bodies.iter().zip(out.iter_mut()) {
        *f += (target - b.position) * strength;
    }
}

pub fn linear_drag(bodies: &[Body], coefficient: f64, out: &mut [Vec3]) {
    for (b, f) in bodies.iter().zip(out.iter_mut()) {
        *f -= b.velocity * coefficient;
    }
}

pub fn uniform_gravity(bodies: &[Body], g: &Vec3, out: &mut [Vec3]) {
    for (b, f) in bodies.iter().zip(out.iter_mut()) {
        *f += g * b.mass;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_attraction_is_linear_in_offset() {
        let bodies = vec![
            Body::new("near", Vec3::new(1.0, 0.0, 0.0)),
            Body::new("far", Vec3::new(4.0, 0.0, 0.0)),
        ];
        let mut out = vec![Vec3::zeros(); 2];
        center_attraction(&bodies, &Vec3::zeros(), 0.5, &mut out);
        assert_eq!(out[0], Vec3::new(-0.5, 0.0, 0.0));
        assert_eq!(out[1], Vec3::new(-2.0, 0.0, 0.0));
    }

    #[test]
    fn gravity_scales_with_mass() {
        let bodies = vec![Body::new("heavy", Vec3::zeros()).with_mass(3.0)];
        let mut out = vec![Vec3::zeros()];
        uniform_gravity(&bodies, &Vec3::new(0.0, -2.0, 0.0), &mut out);
        assert_eq!(out[0], Vec3::new(0.0, -6.0, 0.0));
    }

    #[test]
    fn drag_opposes_velocity() {
        let bodies = vec![Body::new("a", Vec3::zeros()).with_velocity(Vec3::new(3.0, -1.0, 0.0))];
        let mut out = vec![Vec3::zeros()];
        linear_drag(&bodies, 2.0, &mut out);
        assert_eq!(out[0], Vec3::new(-6.0, 2.0, 0.0));
    }
}
