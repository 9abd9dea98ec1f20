use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::body::{BodyId, BodyRegistry};
use crate::error::{PhysicsError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpringId(pub String);

impl SpringId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpringId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpringId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SpringId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for SpringId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

fn default_stiffness() -> f64 {
    1.0
}

/// Pairwise connection pulling two bodies toward `rest_length`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spring {
    pub id: SpringId,
    pub body_a: BodyId,
    pub body_b: BodyId,
    #[serde(default)]
    pub rest_length: f64,
    #[serde(default = "default_stiffness")]
    pub stiffness: f64,
    #[serde(default)]
    pub damping: f64,
}

impl Spring {
    pub fn new(id: impl Into<SpringId>, body_a: impl Into<BodyId>, body_b: impl Into<BodyId>) -> Self {
        Self {
            id: id.into(),
            body_a: body_a.into(),
            body_b: body_b.into(),
            rest_length: 0.0,
            stiffness: default_stiffness(),
            damping: 0.0,
        }
    }

    pub fn with_rest_length(mut self, rest_length: f64) -> Self {
        self.rest_length = rest_length;
        self
    }

    pub fn with_stiffness(mut self, stiffness: f64) -> Self {
        self.stiffness = stiffness;
        self
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    pub fn touches(&self, body: &str) -> bool {
        self.body_a.as_str() == body || self.body_b.as_str() == body
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| PhysicsError::InvalidSpring {
            id: self.id.to_string(),
            reason: reason.to_string(),
        };
        if self.id.0.is_empty() {
            return Err(invalid("id must not be empty"));
        }
        if self.body_a == self.body_b {
            return Err(invalid("endpoints must be distinct bodies"));
        }
        for (name, value) in [
            ("restLength", self.rest_length),
            ("stiffness", self.stiffness),
            ("damping", self.damping),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(&format!("{name} must be finite and non-negative")));
            }
        }
        Ok(())
    }
}

/// Springs keyed by id, iterated in insertion order.
#[derive(Debug, Clone, Default)]
pub struct SpringTable {
    springs: Vec<Spring>,
    index: HashMap<SpringId, usize>,
}

impl SpringTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.springs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.springs.is_empty()
    }

    /// Insert a spring whose endpoints both exist in `bodies`.
    pub fn add(&mut self, spring: Spring, bodies: &BodyRegistry) -> Result<SpringId> {
        if self.index.contains_key(spring.id.as_str()) {
            return Err(PhysicsError::DuplicateId(spring.id.to_string()));
        }
        spring.validate()?;
        for endpoint in [&spring.body_a, &spring.body_b] {
            if !bodies.contains(endpoint.as_str()) {
                return Err(PhysicsError::InvalidReference {
                    spring: spring.id.to_string(),
                    body: endpoint.to_string(),
                });
            }
        }
        let id = spring.id.clone();
        self.index.insert(id.clone(), self.springs.len());
        self.springs.push(spring);
        Ok(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Spring> {
        let idx = self.index.remove(id)?;
        let spring = self.springs.remove(idx);
        self.reindex();
        Some(spring)
    }

    /// Drop every spring attached to `body`; returns how many were removed.
    pub fn remove_attached(&mut self, body: &str) -> usize {
        let before = self.springs.len();
        self.springs.retain(|s| !s.touches(body));
        let removed = before - self.springs.len();
        if removed > 0 {
            self.reindex();
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<&Spring> {
        self.index.get(id).map(|&i| &self.springs[i])
    }

    pub fn clear(&mut self) {
        self.springs.clear();
        self.index.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Spring> {
        self.springs.iter()
    }

    pub fn snapshot(&self) -> Vec<Spring> {
        self.springs.clone()
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, s) in self.springs.iter().enumerate() {
            self.index.insert(s.id.clone(), i);
        }
    }
}
