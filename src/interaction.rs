//! Externally driven state changes (drag, overrides, impulses).
//!
//! Commands are queued and drained at the start of a tick, before any
//! force is evaluated. Anything queued while a tick runs (for example from
//! a subscriber callback) lands on the next tick.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};

use serde::{Deserialize, Serialize};

use crate::body::{BodyId, BodyRegistry};
use crate::error::{PhysicsError, Result};
use crate::Vec3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    SetPosition { id: BodyId, position: Vec3 },
    SetVelocity { id: BodyId, velocity: Vec3 },
    ApplyImpulse { id: BodyId, impulse: Vec3 },
    /// Pin the body and stop it.
    BeginDrag { id: BodyId },
    /// Move a dragged body, discarding any momentum.
    Drag { id: BodyId, position: Vec3 },
    /// Release the body at rest.
    EndDrag { id: BodyId },
}

impl Command {
    pub fn body(&self) -> &BodyId {
        match self {
            Command::SetPosition { id, .. }
            | Command::SetVelocity { id, .. }
            | Command::ApplyImpulse { id, .. }
            | Command::BeginDrag { id }
            | Command::Drag { id, .. }
            | Command::EndDrag { id } => id,
        }
    }

    fn vector(&self) -> Option<Vec3> {
        match self {
            Command::SetPosition { position: v, .. }
            | Command::SetVelocity { velocity: v, .. }
            | Command::ApplyImpulse { impulse: v, .. }
            | Command::Drag { position: v, .. } => Some(*v),
            Command::BeginDrag { .. } | Command::EndDrag { .. } => None,
        }
    }

    /// Check that the command would apply cleanly, without touching state.
    pub fn check(&self, bodies: &BodyRegistry) -> Result<()> {
        self.check_pinned(bodies, None)
    }

    /// Like [`Command::check`], with `pinned` standing in for the body's
    /// current `fixed` flag.
    fn check_pinned(&self, bodies: &BodyRegistry, pinned: Option<bool>) -> Result<()> {
        let id = self.body();
        let body = bodies
            .get(id.as_str())
            .ok_or_else(|| PhysicsError::NotFound(id.to_string()))?;

        if let Some(v) = self.vector() {
            if !v.iter().all(|c| c.is_finite()) {
                return Err(PhysicsError::InvalidBody {
                    id: id.to_string(),
                    reason: "command vector must be finite".to_string(),
                });
            }
        }
        let fixed = pinned.unwrap_or(body.fixed);
        match self {
            Command::ApplyImpulse { .. } | Command::SetVelocity { .. } if fixed => {
                Err(PhysicsError::BodyFixed(id.to_string()))
            }
            Command::EndDrag { .. } if body.mass <= 0.0 => Err(PhysicsError::InvalidBody {
                id: id.to_string(),
                reason: "cannot release a massless body".to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Apply to the registry immediately.
    pub fn apply(&self, bodies: &mut BodyRegistry, plane_2d: bool) -> Result<()> {
        self.check(bodies)?;
        let id = self.body();
        let body = bodies
            .get_mut(id.as_str())
            .ok_or_else(|| PhysicsError::NotFound(id.to_string()))?;

        let flatten = |mut v: Vec3| {
            if plane_2d {
                v.z = 0.0;
            }
            v
        };

        match self {
            Command::SetPosition { position, .. } => body.position = flatten(*position),
            Command::SetVelocity { velocity, .. } => body.velocity = flatten(*velocity),
            Command::ApplyImpulse { impulse, .. } => body.velocity += flatten(*impulse),
            Command::BeginDrag { .. } => {
                body.fixed = true;
                body.velocity = Vec3::zeros();
            }
            Command::Drag { position, .. } => {
                body.position = flatten(*position);
                body.velocity = Vec3::zeros();
            }
            Command::EndDrag { .. } => {
                body.fixed = false;
                body.velocity = Vec3::zeros();
            }
        }
        Ok(())
    }
}

/// Cloneable handle for queueing commands from outside the engine.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: Sender<Command>,
}

impl CommandSender {
    /// Queue a command. Returns false once the engine has been dropped.
    pub fn send(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn set_position(&self, id: impl Into<BodyId>, position: Vec3) -> bool {
        self.send(Command::SetPosition {
            id: id.into(),
            position,
        })
    }

    pub fn set_velocity(&self, id: impl Into<BodyId>, velocity: Vec3) -> bool {
        self.send(Command::SetVelocity {
            id: id.into(),
            velocity,
        })
    }

    pub fn apply_impulse(&self, id: impl Into<BodyId>, impulse: Vec3) -> bool {
        self.send(Command::ApplyImpulse {
            id: id.into(),
            impulse,
        })
    }

    pub fn begin_drag(&self, id: impl Into<BodyId>) -> bool {
        self.send(Command::BeginDrag { id: id.into() })
    }

    pub fn drag(&self, id: impl Into<BodyId>, position: Vec3) -> bool {
        self.send(Command::Drag {
            id: id.into(),
            position,
        })
    }

    pub fn end_drag(&self, id: impl Into<BodyId>) -> bool {
        self.send(Command::EndDrag { id: id.into() })
    }
}

/// Result of draining the queue at a tick boundary.
#[derive(Debug, Default)]
pub struct DrainReport {
    pub applied: usize,
    pub rejected: Vec<(Command, PhysicsError)>,
}

/// Owns the command queue.
#[derive(Debug)]
pub struct InteractionController {
    tx: Sender<Command>,
    rx: Receiver<Command>,
    /// Pin state queued drags will leave each body in. Only commands
    /// passed to [`InteractionController::enqueue`] are tracked.
    pinned: HashMap<BodyId, bool>,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionController {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            pinned: HashMap::new(),
        }
    }

    pub fn sender(&self) -> CommandSender {
        CommandSender {
            tx: self.tx.clone(),
        }
    }

    /// Check `command` against the registry as it will be once the queue
    /// has drained.
    pub fn check(&self, command: &Command, bodies: &BodyRegistry) -> Result<()> {
        let pinned = self.pinned.get(command.body().as_str()).copied();
        command.check_pinned(bodies, pinned)
    }

    pub fn enqueue(&mut self, command: Command) {
        match &command {
            Command::BeginDrag { id } => {
                self.pinned.insert(id.clone(), true);
            }
            Command::EndDrag { id } => {
                self.pinned.insert(id.clone(), false);
            }
            _ => {}
        }
        // The receiver lives in `self`, so the send cannot fail.
        let _ = self.tx.send(command);
    }

    /// Apply everything queued so far, in order.
    pub fn drain(&mut self, bodies: &mut BodyRegistry, plane_2d: bool) -> DrainReport {
        let mut report = DrainReport::default();
        self.pinned.clear();
        let pending: Vec<Command> = self.rx.try_iter().collect();
        for command in pending {
            match command.apply(bodies, plane_2d) {
                Ok(()) => report.applied += 1,
                Err(e) => report.rejected.push((command, e)),
            }
        }
        report
    }

    /// Drop all queued commands without applying them.
    pub fn discard(&mut self) -> usize {
        self.pinned.clear();
        self.rx.try_iter().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;

    fn registry() -> BodyRegistry {
        let mut reg = BodyRegistry::new();
        reg.add(Body::new("a", Vec3::new(1.0, 1.0, 0.0)).with_velocity(Vec3::new(3.0, 0.0, 0.0)))
            .unwrap();
        reg
    }

    #[test]
    fn drag_lifecycle() {
        let mut reg = registry();
        let id = BodyId::from("a");

        Command::BeginDrag { id: id.clone() }.apply(&mut reg, true).unwrap();
        let a = reg.get("a").unwrap();
        assert!(a.fixed);
        assert_eq!(a.velocity, Vec3::zeros());

        Command::Drag {
            id: id.clone(),
            position: Vec3::new(7.0, 8.0, 9.0),
        }
        .apply(&mut reg, true)
        .unwrap();
        assert_eq!(reg.get("a").unwrap().position, Vec3::new(7.0, 8.0, 0.0));

        Command::EndDrag { id }.apply(&mut reg, true).unwrap();
        let a = reg.get("a").unwrap();
        assert!(!a.fixed);
        assert_eq!(a.velocity, Vec3::zeros());
        assert_eq!(a.position, Vec3::new(7.0, 8.0, 0.0));
    }

    #[test]
    fn impulse_on_fixed_body_is_an_error() {
        let mut reg = registry();
        Command::BeginDrag { id: "a".into() }.apply(&mut reg, true).unwrap();
        let err = Command::ApplyImpulse {
            id: "a".into(),
            impulse: Vec3::new(1.0, 0.0, 0.0),
        }
        .apply(&mut reg, true)
        .unwrap_err();
        assert_eq!(err, PhysicsError::BodyFixed("a".to_string()));
    }

    #[test]
    fn set_velocity_on_fixed_body_is_an_error() {
        let mut reg = registry();
        Command::BeginDrag { id: "a".into() }.apply(&mut reg, true).unwrap();
        let err = Command::SetVelocity {
            id: "a".into(),
            velocity: Vec3::new(1.0, 0.0, 0.0),
        }
        .apply(&mut reg, true)
        .unwrap_err();
        assert_eq!(err, PhysicsError::BodyFixed("a".to_string()));
        assert_eq!(reg.get("a").unwrap().velocity, Vec3::zeros());
    }

    #[test]
    fn check_sees_pins_from_queued_drags() {
        let mut ctl = InteractionController::new();
        let reg = registry();
        let impulse = Command::ApplyImpulse {
            id: "a".into(),
            impulse: Vec3::new(5.0, 0.0, 0.0),
        };
        assert!(ctl.check(&impulse, &reg).is_ok());

        ctl.enqueue(Command::BeginDrag { id: "a".into() });
        assert_eq!(
            ctl.check(&impulse, &reg),
            Err(PhysicsError::BodyFixed("a".to_string()))
        );

        ctl.enqueue(Command::EndDrag { id: "a".into() });
        assert!(ctl.check(&impulse, &reg).is_ok());
    }

    #[test]
    fn drain_forgets_queued_pins() {
        let mut ctl = InteractionController::new();
        let mut reg = registry();
        ctl.enqueue(Command::BeginDrag { id: "a".into() });
        ctl.drain(&mut reg, true);
        Command::EndDrag { id: "a".into() }.apply(&mut reg, true).unwrap();

        let impulse = Command::ApplyImpulse {
            id: "a".into(),
            impulse: Vec3::new(5.0, 0.0, 0.0),
        };
        assert!(ctl.check(&impulse, &reg).is_ok());
    }

    #[test]
    fn queued_commands_apply_only_on_drain() {
        let mut ctl = InteractionController::new();
        let mut reg = registry();
        let sender = ctl.sender();

        assert!(sender.apply_impulse("a", Vec3::new(0.0, 2.0, 0.0)));
        ctl.enqueue(Command::SetVelocity {
            id: "missing".into(),
            velocity: Vec3::zeros(),
        });
        assert_eq!(reg.get("a").unwrap().velocity, Vec3::new(3.0, 0.0, 0.0));

        let report = ctl.drain(&mut reg, true);
        assert_eq!(report.applied, 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(reg.get("a").unwrap().velocity, Vec3::new(3.0, 2.0, 0.0));
    }

    #[test]
    fn discard_empties_queue() {
        let mut ctl = InteractionController::new();
        let mut reg = registry();
        ctl.enqueue(Command::BeginDrag { id: "a".into() });
        ctl.enqueue(Command::EndDrag { id: "a".into() });

        assert_eq!(ctl.discard(), 2);
        assert_eq!(ctl.drain(&mut reg, true).applied, 0);
    }

    #[test]
    fn non_finite_override_rejected() {
        let mut reg = registry();
        let err = Command::SetPosition {
            id: "a".into(),
            position: Vec3::new(f64::NAN, 0.0, 0.0),
        }
        .apply(&mut reg, true)
        .unwrap_err();
        assert!(matches!(err, PhysicsError::InvalidBody { .. }));
        assert_eq!(reg.get("a").unwrap().position, Vec3::new(1.0, 1.0, 0.0));
    }
}
