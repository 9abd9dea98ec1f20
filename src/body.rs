use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, Result};
use crate::Vec3;

/// Stable identifier of a body (diagram node id, STEM object id, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BodyId(pub String);

impl BodyId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BodyId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for BodyId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for BodyId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

fn default_mass() -> f64 {
    1.0
}

fn default_charge() -> f64 {
    1.0
}

/// A simulated point mass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    pub id: BodyId,
    pub position: Vec3,
    #[serde(default)]
    pub velocity: Vec3,
    /// Acceleration computed on the last tick (read-only for consumers).
    #[serde(default)]
    pub acceleration: Vec3,
    #[serde(default = "default_mass")]
    pub mass: f64,
    #[serde(default)]
    pub radius: f64,
    /// Excluded from integration, still exerts and receives forces.
    #[serde(default)]
    pub fixed: bool,
    /// Per-tick velocity damping in [0, 1].
    #[serde(default)]
    pub damping: f64,
    /// Scales pairwise repulsion.
    #[serde(default = "default_charge")]
    pub charge: f64,
    /// Opaque payload owned by the caller.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Body {
    pub fn new(id: impl Into<BodyId>, position: Vec3) -> Self {
        Self {
            id: id.into(),
            position,
            velocity: Vec3::zeros(),
            acceleration: Vec3::zeros(),
            mass: default_mass(),
            radius: 0.0,
            fixed: false,
            damping: 0.0,
            charge: default_charge(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_charge(mut self, charge: f64) -> Self {
        self.charge = charge;
        self
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn pinned(mut self) -> Self {
        self.fixed = true;
        self
    }

    /// Whether position and velocity hold only finite values.
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|c| c.is_finite()) && self.velocity.iter().all(|c| c.is_finite())
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.norm_squared()
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| PhysicsError::InvalidBody {
            id: self.id.to_string(),
            reason: reason.to_string(),
        };

        if self.id.0.is_empty() {
            return Err(invalid("id must not be empty"));
        }
        if !self.is_finite() {
            return Err(invalid("position and velocity must be finite"));
        }
        if !self.mass.is_finite() || self.mass < 0.0 {
            return Err(invalid("mass must be finite and non-negative"));
        }
        if !self.fixed && self.mass <= 0.0 {
            return Err(invalid("mass must be positive unless the body is fixed"));
        }
        if !self.radius.is_finite() || self.radius < 0.0 {
            return Err(invalid("radius must be finite and non-negative"));
        }
        if !(0.0..=1.0).contains(&self.damping) {
            return Err(invalid("damping must lie in [0, 1]"));
        }
        if !self.charge.is_finite() {
            return Err(invalid("charge must be finite"));
        }
        Ok(())
    }
}

/// Partial update for [`Body`]; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BodyPatch {
    pub position: Option<Vec3>,
    pub velocity: Option<Vec3>,
    pub mass: Option<f64>,
    pub radius: Option<f64>,
    pub fixed: Option<bool>,
    pub damping: Option<f64>,
    pub charge: Option<f64>,
    pub metadata: Option<serde_json::Value>,
}

impl BodyPatch {
    fn apply_to(&self, body: &mut Body) {
        if let Some(p) = self.position {
            body.position = p;
        }
        if let Some(v) = self.velocity {
            body.velocity = v;
        }
        if let Some(m) = self.mass {
            body.mass = m;
        }
        if let Some(r) = self.radius {
            body.radius = r;
        }
        if let Some(f) = self.fixed {
            body.fixed = f;
        }
        if let Some(d) = self.damping {
            body.damping = d;
        }
        if let Some(c) = self.charge {
            body.charge = c;
        }
        if let Some(meta) = &self.metadata {
            body.metadata = meta.clone();
        }
    }
}

/// Authoritative set of bodies, kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct BodyRegistry {
    bodies: Vec<Body>,
    index: HashMap<BodyId, usize>,
}

impl BodyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Insert a new body. Id collisions are rejected, never overwritten.
    pub fn add(&mut self, body: Body) -> Result<BodyId> {
        if self.index.contains_key(body.id.as_str()) {
            return Err(PhysicsError::DuplicateId(body.id.to_string()));
        }
        body.validate()?;
        let id = body.id.clone();
        self.index.insert(id.clone(), self.bodies.len());
        self.bodies.push(body);
        Ok(id)
    }

    /// Remove a body, returning it if it was present.
    ///
    /// Springs are not touched here; the engine cascades through the
    /// spring table.
    pub fn remove(&mut self, id: &str) -> Option<Body> {
        let idx = self.index.remove(id)?;
        let body = self.bodies.remove(idx);
        for b in &self.bodies[idx..] {
            if let Some(slot) = self.index.get_mut(b.id.as_str()) {
                *slot -= 1;
            }
        }
        Some(body)
    }

    pub fn get(&self, id: &str) -> Option<&Body> {
        self.index.get(id).map(|&i| &self.bodies[i])
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Body> {
        let i = *self.index.get(id)?;
        Some(&mut self.bodies[i])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Apply a partial update. The patched body must still be valid.
    pub fn update(&mut self, id: &str, patch: &BodyPatch) -> Result<()> {
        let body = self
            .get_mut(id)
            .ok_or_else(|| PhysicsError::NotFound(id.to_string()))?;
        let mut patched = body.clone();
        patch.apply_to(&mut patched);
        patched.validate()?;
        *body = patched;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
        self.index.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Body> {
        self.bodies.iter()
    }

    pub fn as_slice(&self) -> &[Body] {
        &self.bodies
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Body] {
        &mut self.bodies
    }

    /// Owned copy of every body in insertion order.
    pub fn snapshot(&self) -> Vec<Body> {
        self.bodies.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(id: &str, x: f64) -> Body {
        Body::new(id, Vec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn duplicate_id_is_rejected_and_registry_unchanged() {
        let mut reg = BodyRegistry::new();
        reg.add(body("a", 1.0)).unwrap();

        let err = reg.add(body("a", 5.0)).unwrap_err();
        assert_eq!(err, PhysicsError::DuplicateId("a".to_string()));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("a").unwrap().position.x, 1.0);
    }

    #[test]
    fn non_positive_mass_rejected_unless_fixed() {
        let mut reg = BodyRegistry::new();
        let err = reg.add(body("a", 0.0).with_mass(0.0)).unwrap_err();
        assert!(matches!(err, PhysicsError::InvalidBody { .. }));

        reg.add(body("anchor", 0.0).with_mass(0.0).pinned()).unwrap();
        assert!(reg.contains("anchor"));
    }

    #[test]
    fn remove_keeps_order_and_index_consistent() {
        let mut reg = BodyRegistry::new();
        for (i, id) in ["a", "b", "c", "d"].iter().enumerate() {
            reg.add(body(id, i as f64)).unwrap();
        }

        let removed = reg.remove("b").unwrap();
        assert_eq!(removed.id.as_str(), "b");
        assert!(reg.remove("b").is_none());

        let ids: Vec<_> = reg.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "d"]);
        assert_eq!(reg.index_of("c"), Some(1));
        assert_eq!(reg.index_of("d"), Some(2));
        assert_eq!(reg.get("d").unwrap().position.x, 3.0);
    }

    #[test]
    fn update_applies_patch_and_validates() {
        let mut reg = BodyRegistry::new();
        reg.add(body("a", 0.0)).unwrap();

        let patch = BodyPatch {
            position: Some(Vec3::new(4.0, 2.0, 0.0)),
            charge: Some(3.0),
            ..Default::default()
        };
        reg.update("a", &patch).unwrap();
        let a = reg.get("a").unwrap();
        assert_eq!(a.position, Vec3::new(4.0, 2.0, 0.0));
        assert_eq!(a.charge, 3.0);

        let bad = BodyPatch {
            damping: Some(2.0),
            ..Default::default()
        };
        assert!(reg.update("a", &bad).is_err());
        assert_eq!(reg.get("a").unwrap().damping, 0.0);

        assert_eq!(
            reg.update("missing", &patch),
            Err(PhysicsError::NotFound("missing".to_string()))
        );
    }

    #[test]
    fn snapshot_does_not_alias_live_state() {
        let mut reg = BodyRegistry::new();
        reg.add(body("a", 1.0)).unwrap();
        let snap = reg.snapshot();

        reg.get_mut("a").unwrap().position.x = 99.0;
        assert_eq!(snap[0].position.x, 1.0);
    }

    #[test]
    fn body_deserializes_with_defaults() {
        let json = r#"{"id":"n1","position":[1.0,2.0,0.0]}"#;
        let b: Body = serde_json::from_str(json).unwrap();
        assert_eq!(b.mass, 1.0);
        assert_eq!(b.charge, 1.0);
        assert!(!b.fixed);
        assert_eq!(b.velocity, Vec3::zeros());
    }
}
