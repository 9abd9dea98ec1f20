//! Damped Hooke springs from the spring table.

use crate::body::BodyRegistry;
use crate::spring::{Spring, SpringTable};
use crate::Vec3;

/// Force exerted on `body_a` by the spring; `body_b` receives the negation.
///
/// A stretched spring pulls the endpoints together, a compressed one
/// pushes them apart. Coincident endpoints yield zero force.
pub fn spring_force(spring: &Spring, xa: Vec3, xb: Vec3, va: Vec3, vb: Vec3) -> Vec3 {
    let d = xb - xa;
    let len = d.norm();
    if len == 0.0 {
        return Vec3::zeros();
    }
    let dir = d / len;
    let stretch = spring.stiffness * (len - spring.rest_length);
    let closing = spring.damping * (vb - va).dot(&dir);
    dir * (stretch + closing)
}

pub fn apply(bodies: &BodyRegistry, springs: &SpringTable, out: &mut [Vec3]) {
    let slice = bodies.as_slice();
    for spring in springs.iter() {
        // The table only holds springs whose endpoints exist.
        let (Some(ia), Some(ib)) = (
            bodies.index_of(spring.body_a.as_str()),
            bodies.index_of(spring.body_b.as_str()),
        ) else {
            continue;
        };
        let a = &slice[ia];
        let b = &slice[ib];
        let f = spring_force(spring, a.position, b.position, a.velocity, b.velocity);
        out[ia] += f;
        out[ib] -= f;
    }
}
