//! Bridge to a remote 3D physics service.
//!
//! The remote service owns its own simulation; this side only mirrors its
//! periodic state into a [`BodyRegistry`] and forwards commands.

pub mod connection;
pub mod messages;

use std::collections::HashMap;

use nalgebra::{Quaternion, UnitQuaternion};
use tracing::{debug, warn};

use crate::body::{Body, BodyId, BodyRegistry};
use crate::Vec3;

pub use connection::{BridgeConnection, ConnectionState, ReconnectPolicy, Transport};
pub use messages::{BridgeCommand, PhysicsUpdate, RemoteBodyState, RemoteMetrics};

/// Local mirror of the remote simulation.
#[derive(Debug, Default)]
pub struct RemoteScene {
    bodies: BodyRegistry,
    orientations: HashMap<BodyId, UnitQuaternion<f64>>,
    last_timestamp: Option<f64>,
    metrics: Option<RemoteMetrics>,
}

impl RemoteScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bodies(&self) -> &BodyRegistry {
        &self.bodies
    }

    pub fn orientation(&self, id: &str) -> Option<UnitQuaternion<f64>> {
        self.orientations.get(id).copied()
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }

    pub fn remote_metrics(&self) -> Option<&RemoteMetrics> {
        self.metrics.as_ref()
    }

    /// Fold an update into the mirror. Returns false if it was older than
    /// the last one applied.
    ///
    /// Bodies present in the update are upserted; bodies missing from it
    /// are dropped.
    pub fn apply(&mut self, update: PhysicsUpdate) -> bool {
        if self.last_timestamp.is_some_and(|t| update.timestamp < t) {
            debug!(timestamp = update.timestamp, "stale update skipped");
            return false;
        }
        self.last_timestamp = Some(update.timestamp);

        let mut present: Vec<BodyId> = Vec::with_capacity(update.bodies.len());
        for state in update.bodies {
            let position = Vec3::from(state.position);
            let velocity = state.velocity.map(Vec3::from).unwrap_or_else(Vec3::zeros);
            if !position.iter().chain(velocity.iter()).all(|c| c.is_finite()) {
                warn!(body = %state.id, "non-finite remote state ignored");
                // still listed by the server: keep the last good state
                present.push(state.id);
                continue;
            }

            match self.bodies.get_mut(state.id.as_str()) {
                Some(body) => {
                    body.position = position;
                    body.velocity = velocity;
                    if !state.metadata.is_null() {
                        body.metadata = state.metadata;
                    }
                }
                None => {
                    let body = Body::new(state.id.clone(), position)
                        .with_velocity(velocity)
                        .with_metadata(state.metadata);
                    if let Err(e) = self.bodies.add(body) {
                        warn!(body = %state.id, error = %e, "remote body rejected");
                        continue;
                    }
                }
            }
            self.orientations
                .insert(state.id.clone(), rotation_from_xyzw(state.rotation));
            present.push(state.id);
        }

        let stale: Vec<BodyId> = self
            .bodies
            .iter()
            .filter(|b| !present.contains(&b.id))
            .map(|b| b.id.clone())
            .collect();
        for id in stale {
            self.bodies.remove(id.as_str());
            self.orientations.remove(id.as_str());
        }

        if update.metrics.is_some() {
            self.metrics = update.metrics;
        }
        true
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Degenerate quaternions fall back to identity.
fn rotation_from_xyzw([x, y, z, w]: [f64; 4]) -> UnitQuaternion<f64> {
    let q = Quaternion::new(w, x, y, z);
    let norm = q.norm();
    if norm.is_finite() && norm > f64::EPSILON {
        UnitQuaternion::from_quaternion(q)
    } else {
        UnitQuaternion::identity()
    }
}
