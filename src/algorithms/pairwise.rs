//! O(n²) pairwise forces: repulsion and n-body gravity.
//!
//! Each body sums its partners in registry order. The same per-body sum is
//! used by the sequential and the `parallel` paths, so both produce
//! identical results.

use crate::body::Body;
use crate::Vec3;

/// Squared distances below this are treated as coincident.
const COINCIDENT_D2: f64 = 1.0e-24;

/// Add pairwise repulsion to `out`.
pub fn repulsion(bodies: &[Body], strength: f64, cutoff: Option<f64>, eps: f64, out: &mut [Vec3]) {
    let cutoff2 = cutoff.map(|c| c * c);
    accumulate(bodies, out, |i, j| {
        let bi = &bodies[i];
        let bj = &bodies[j];
        let d = bi.position - bj.position;
        let d2 = d.norm_squared();
        if let Some(c2) = cutoff2 {
            if d2 > c2 {
                return Vec3::zeros();
            }
        }
        let magnitude = repulsion_magnitude(strength * bi.charge * bj.charge, d2, eps);
        let dir = if d2 < COINCIDENT_D2 {
            // Stacked bodies: split them along x by registry order.
            if i < j {
                Vec3::new(-1.0, 0.0, 0.0)
            } else {
                Vec3::new(1.0, 0.0, 0.0)
            }
        } else {
            d / d2.sqrt()
        };
        dir * magnitude
    });
}

/// Magnitude of the repulsion kernel at squared distance `d2`.
pub fn repulsion_magnitude(strength: f64, d2: f64, eps: f64) -> f64 {
    strength / d2.max(eps)
}

/// Add pairwise gravitational attraction to `out`.
pub fn n_body(bodies: &[Body], constant: f64, eps: f64, out: &mut [Vec3]) {
    accumulate(bodies, out, |i, j| {
        let bi = &bodies[i];
        let bj = &bodies[j];
        let d = bj.position - bi.position;
        let d2 = d.norm_squared();
        if d2 < COINCIDENT_D2 {
            return Vec3::zeros();
        }
        let magnitude = constant * bi.mass * bj.mass / d2.max(eps);
        d / d2.sqrt() * magnitude
    });
}

fn partner_sum<F>(i: usize, n: usize, kernel: &F) -> Vec3
where
    F: Fn(usize, usize) -> Vec3,
{
    let mut sum = Vec3::zeros();
    for j in 0..n {
        if j != i {
            sum += kernel(i, j);
        }
    }
    sum
}

#[cfg(not(feature = "parallel"))]
fn accumulate<F>(bodies: &[Body], out: &mut [Vec3], kernel: F)
where
    F: Fn(usize, usize) -> Vec3 + Sync,
{
    let n = bodies.len();
    for (i, slot) in out.iter_mut().enumerate().take(n) {
        *slot += partner_sum(i, n, &kernel);
    }
}

#[cfg(feature = "parallel")]
fn accumulate<F>(bodies: &[Body], out: &mut [Vec3], kernel: F)
where
    F: Fn(usize, usize) -> Vec3 + Sync,
{
    use rayon::prelude::*;
    let n = bodies.len();
    out[..n]
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, slot)| *slot += partner_sum(i, n, &kernel));
}
