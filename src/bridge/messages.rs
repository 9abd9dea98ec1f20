//! JSON frames exchanged with the remote physics service.

use serde::{Deserialize, Serialize};

use crate::body::{Body, BodyId};
use crate::error::BridgeError;
use crate::spring::Spring;
use crate::Vec3;

/// One body as reported by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteBodyState {
    pub id: BodyId,
    pub position: [f64; 3],
    /// Quaternion as `[x, y, z, w]`.
    #[serde(default = "identity_rotation")]
    pub rotation: [f64; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<[f64; 3]>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

fn identity_rotation() -> [f64; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteMetrics {
    pub fps: f64,
    pub body_count: usize,
    pub constraint_count: usize,
    pub simulation_time: f64,
}

/// Periodic state broadcast from the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsUpdate {
    pub timestamp: f64,
    #[serde(default)]
    pub bodies: Vec<RemoteBodyState>,
    #[serde(default)]
    pub metrics: Option<RemoteMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RemoteShape {
    Sphere { radius: f64 },
    Box { size: [f64; 3] },
}

/// Body description for `add_body`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteBodySpec {
    pub id: BodyId,
    #[serde(flatten)]
    pub shape: RemoteShape,
    pub mass: f64,
    pub position: [f64; 3],
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl From<&Body> for RemoteBodySpec {
    fn from(body: &Body) -> Self {
        Self {
            id: body.id.clone(),
            shape: RemoteShape::Sphere {
                radius: body.radius,
            },
            mass: body.mass,
            position: body.position.into(),
            metadata: body.metadata.clone(),
        }
    }
}

/// Spring description for `add_constraint`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConstraint {
    pub id: String,
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub stiffness: f64,
    pub damping: f64,
    pub rest_length: f64,
}

impl From<&Spring> for RemoteConstraint {
    fn from(spring: &Spring) -> Self {
        Self {
            id: spring.id.to_string(),
            body_a: spring.body_a.clone(),
            body_b: spring.body_b.clone(),
            stiffness: spring.stiffness,
            damping: spring.damping,
            rest_length: spring.rest_length,
        }
    }
}

/// Outbound command frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeCommand {
    ApplyForce { body_id: BodyId, force: [f64; 3] },
    SetPosition { body_id: BodyId, position: [f64; 3] },
    SetVelocity { body_id: BodyId, velocity: [f64; 3] },
    AddBody { body: RemoteBodySpec },
    RemoveBody { body_id: BodyId },
    AddConstraint { constraint: RemoteConstraint },
    LoadPreset { preset: String },
    Reset,
    Pause,
    Resume,
}

impl BridgeCommand {
    pub fn apply_force(body_id: impl Into<BodyId>, force: Vec3) -> Self {
        Self::ApplyForce {
            body_id: body_id.into(),
            force: force.into(),
        }
    }

    pub fn set_position(body_id: impl Into<BodyId>, position: Vec3) -> Self {
        Self::SetPosition {
            body_id: body_id.into(),
            position: position.into(),
        }
    }

    pub fn set_velocity(body_id: impl Into<BodyId>, velocity: Vec3) -> Self {
        Self::SetVelocity {
            body_id: body_id.into(),
            velocity: velocity.into(),
        }
    }

    pub fn encode(&self) -> Result<String, BridgeError> {
        Ok(serde_json::to_string(self)?)
    }
}

pub fn decode_update(frame: &str) -> Result<PhysicsUpdate, BridgeError> {
    Ok(serde_json::from_str(frame)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_force_frame() {
        let frame = BridgeCommand::apply_force("atom_1", Vec3::new(0.0, 1.5, 0.0))
            .encode()
            .unwrap();
        insta::assert_snapshot!(frame, @r#"{"type":"apply_force","body_id":"atom_1","force":[0.0,1.5,0.0]}"#);
    }

    #[test]
    fn unit_commands_carry_only_the_tag() {
        insta::assert_snapshot!(BridgeCommand::Reset.encode().unwrap(), @r#"{"type":"reset"}"#);
        insta::assert_snapshot!(BridgeCommand::Pause.encode().unwrap(), @r#"{"type":"pause"}"#);
    }

    #[test]
    fn add_body_frame_flattens_shape() {
        let body = Body::new("ball", Vec3::new(1.0, 2.0, 0.0))
            .with_mass(2.0)
            .with_radius(0.5);
        let frame = BridgeCommand::AddBody {
            body: RemoteBodySpec::from(&body),
        }
        .encode()
        .unwrap();
        insta::assert_snapshot!(frame, @r#"{"type":"add_body","body":{"id":"ball","type":"sphere","radius":0.5,"mass":2.0,"position":[1.0,2.0,0.0]}}"#);
    }

    #[test]
    fn add_constraint_frame() {
        let spring = Spring::new("cc", "c0", "c1")
            .with_rest_length(1.4)
            .with_stiffness(600.0);
        let frame = BridgeCommand::AddConstraint {
            constraint: RemoteConstraint::from(&spring),
        }
        .encode()
        .unwrap();
        insta::assert_snapshot!(frame, @r#"{"type":"add_constraint","constraint":{"id":"cc","body_a":"c0","body_b":"c1","stiffness":600.0,"damping":0.0,"rest_length":1.4}}"#);
    }

    #[test]
    fn decodes_server_update() {
        let frame = r#"{
            "timestamp": 1712.5,
            "bodies": [
                {"id": "water_O", "position": [0, 0, 0], "rotation": [0, 0, 0, 1],
                 "velocity": [0.1, 0, 0], "metadata": {"element": "O"}},
                {"id": "water_H1", "position": [0.75, -0.58, 0]}
            ],
            "annotations": null,
            "metrics": {"fps": 60.0, "bodyCount": 2, "constraintCount": 1, "simulationTime": 3.0}
        }"#;
        let update = decode_update(frame).unwrap();
        assert_eq!(update.bodies.len(), 2);
        assert_eq!(update.bodies[0].velocity, Some([0.1, 0.0, 0.0]));
        assert_eq!(update.bodies[1].rotation, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(update.metrics.unwrap().constraint_count, 1);
    }

    #[test]
    fn garbage_frame_is_a_decode_error() {
        assert!(matches!(decode_update("{not json"), Err(BridgeError::Decode(_))));
    }
}
