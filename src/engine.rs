//! Simulation engine: owns topology and dynamics, advances one tick per
//! external scheduling callback and pushes snapshots to subscribers.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::algorithms::{Force, ForceComposer};
use crate::body::{Body, BodyId, BodyPatch, BodyRegistry};
use crate::config::{ConfigPatch, SimulationConfig};
use crate::error::{PhysicsError, Result};
use crate::interaction::{Command, CommandSender, InteractionController};
use crate::metrics::{Clock, Metrics, MetricsTracker, SystemClock};
use crate::models::scenes;
use crate::presets;
use crate::sim::Stepper;
use crate::spring::{Spring, SpringId, SpringTable};
use crate::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EngineState {
    #[default]
    Stopped,
    Running,
    Paused,
}

/// Returned by [`Engine::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

type Subscriber = Box<dyn FnMut(&[Body], &Metrics)>;

pub struct Engine {
    state: EngineState,
    bodies: BodyRegistry,
    springs: SpringTable,
    composer: ForceComposer,
    config: SimulationConfig,
    stepper: Stepper,
    interaction: InteractionController,
    metrics: MetricsTracker,
    clock: Box<dyn Clock>,
    subscribers: Vec<(SubscriptionHandle, Subscriber)>,
    next_handle: u64,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_clock(SystemClock::default())
    }

    /// Engine reading wall time from `clock` (used for fps and tick timing).
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            state: EngineState::Stopped,
            bodies: BodyRegistry::new(),
            springs: SpringTable::new(),
            composer: ForceComposer::default(),
            config: SimulationConfig::default(),
            stepper: Stepper::new(),
            interaction: InteractionController::new(),
            metrics: MetricsTracker::new(),
            clock: Box::new(clock),
            subscribers: Vec::new(),
            next_handle: 0,
        }
    }

    pub fn with_config(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let mut engine = Self::new();
        engine.composer.set_forces(config.active_forces.clone());
        engine.config = config;
        Ok(engine)
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    // ---- topology ----

    pub fn add_body(&mut self, mut body: Body) -> Result<BodyId> {
        if self.config.plane_2d {
            body.position.z = 0.0;
            body.velocity.z = 0.0;
        }
        let id = self.bodies.add(body)?;
        trace!(body = %id, "body added");
        self.refresh_counts();
        Ok(id)
    }

    /// Remove a body and every spring attached to it. No-op if absent.
    pub fn remove_body(&mut self, id: &str) -> Option<Body> {
        let body = self.bodies.remove(id)?;
        let dropped = self.springs.remove_attached(id);
        trace!(body = id, springs = dropped, "body removed");
        self.refresh_counts();
        Some(body)
    }

    pub fn get_body(&self, id: &str) -> Option<Body> {
        self.bodies.get(id).cloned()
    }

    /// Copy of every body in insertion order.
    pub fn get_bodies(&self) -> Vec<Body> {
        self.bodies.snapshot()
    }

    pub fn update_body(&mut self, id: &str, patch: &BodyPatch) -> Result<()> {
        let mut patch = patch.clone();
        if self.config.plane_2d {
            if let Some(p) = patch.position.as_mut() {
                p.z = 0.0;
            }
            if let Some(v) = patch.velocity.as_mut() {
                v.z = 0.0;
            }
        }
        self.bodies.update(id, &patch)
    }

    pub fn add_spring(&mut self, spring: Spring) -> Result<SpringId> {
        let id = self.springs.add(spring, &self.bodies)?;
        trace!(spring = %id, "spring added");
        self.refresh_counts();
        Ok(id)
    }

    pub fn remove_spring(&mut self, id: &str) -> Option<Spring> {
        let spring = self.springs.remove(id)?;
        self.refresh_counts();
        Some(spring)
    }

    pub fn get_springs(&self) -> Vec<Spring> {
        self.springs.snapshot()
    }

    /// Drop all bodies and springs, keeping config and state.
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.springs.clear();
        self.refresh_counts();
    }

    // ---- dynamics ----

    /// Replace the active force list. Clears the preset label.
    pub fn set_active_forces(&mut self, forces: Vec<Force>) -> Result<()> {
        self.update_config(&ConfigPatch {
            active_forces: Some(forces),
            ..Default::default()
        })
    }

    /// Swap in a preset's forces, gravity and drag. Topology is kept.
    pub fn load_preset(&mut self, name: &str) -> Result<()> {
        let preset = presets::build(name)?;
        self.config.active_forces = preset.active_forces;
        self.config.gravity = preset.gravity;
        self.config.drag = preset.drag;
        self.config.preset = Some(preset.id.to_string());
        self.composer.set_forces(self.config.active_forces.clone());
        debug!(preset = preset.id, "preset loaded");
        Ok(())
    }

    /// Replace the topology with a built-in scene and its dynamics.
    ///
    /// Queued commands are discarded since they name the old bodies. On
    /// error the engine is left untouched.
    pub fn load_scene(&mut self, name: &str) -> Result<()> {
        let scene = scenes::build(name)?;
        let preset = presets::build(scene.preset)?;

        let mut bodies = BodyRegistry::new();
        for mut body in scene.bodies {
            if self.config.plane_2d {
                body.position.z = 0.0;
                body.velocity.z = 0.0;
            }
            bodies.add(body)?;
        }
        let mut springs = SpringTable::new();
        for spring in scene.springs {
            springs.add(spring, &bodies)?;
        }

        let mut config = self.config.clone();
        config.active_forces = preset.active_forces;
        config.gravity = preset.gravity;
        config.drag = preset.drag;
        config.preset = Some(preset.id.to_string());
        let config = config.merged(&scene.tweaks)?;

        self.bodies = bodies;
        self.springs = springs;
        self.composer.set_forces(config.active_forces.clone());
        self.config = config;
        let dropped = self.interaction.discard();
        self.refresh_counts();
        debug!(
            scene = scene.id,
            bodies = self.bodies.len(),
            springs = self.springs.len(),
            dropped_commands = dropped,
            "scene loaded"
        );
        Ok(())
    }

    /// Merge `patch` into the config. On error the old config is kept.
    pub fn update_config(&mut self, patch: &ConfigPatch) -> Result<()> {
        let next = self.config.merged(patch)?;
        if next.plane_2d && !self.config.plane_2d {
            self.flatten_to_plane();
        }
        self.composer.set_forces(next.active_forces.clone());
        self.config = next;
        debug!(preset = ?self.config.preset, "config updated");
        Ok(())
    }

    fn flatten_to_plane(&mut self) {
        for body in self.bodies.as_mut_slice() {
            body.position.z = 0.0;
            body.velocity.z = 0.0;
            body.acceleration.z = 0.0;
        }
    }

    // ---- lifecycle ----

    pub fn start(&mut self) {
        if self.state == EngineState::Running {
            return;
        }
        debug!(from = ?self.state, "engine started");
        self.state = EngineState::Running;
        self.metrics.resume();
    }

    /// Pause a running engine. Idempotent; does nothing when stopped.
    pub fn stop(&mut self) {
        if self.state == EngineState::Running {
            self.state = EngineState::Paused;
            debug!("engine paused");
        }
    }

    /// Clear bodies, springs, queued commands and metrics, then stop.
    /// Config and subscriptions survive.
    pub fn reset(&mut self) {
        self.bodies.clear();
        self.springs.clear();
        let dropped = self.interaction.discard();
        self.metrics.reset();
        self.state = EngineState::Stopped;
        debug!(dropped_commands = dropped, "engine reset");
    }

    /// Advance one tick if running. Returns whether a tick happened.
    pub fn tick(&mut self) -> bool {
        if self.state != EngineState::Running {
            return false;
        }
        let started = self.clock.now_ms();

        let drained = self.interaction.drain(&mut self.bodies, self.config.plane_2d);
        for (command, err) in &drained.rejected {
            warn!(body = %command.body(), error = %err, "queued command rejected");
        }
        self.metrics.record_rejected(drained.rejected.len());

        let report = self
            .stepper
            .step(&mut self.bodies, &self.springs, &self.composer, &self.config);
        for id in &report.recovered {
            warn!(error = %PhysicsError::NumericInstability(id.to_string()), "numeric instability");
        }

        let finished = self.clock.now_ms();
        self.refresh_counts();
        self.metrics
            .record_tick(started, finished, self.config.timestep, &report);
        trace!(
            tick = self.metrics.metrics().tick_count,
            applied = drained.applied,
            kinetic_energy = report.kinetic_energy,
            "tick"
        );

        self.notify();
        true
    }

    fn notify(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.bodies.snapshot();
        let metrics = self.metrics.metrics().clone();
        for (_, callback) in self.subscribers.iter_mut() {
            callback(&snapshot, &metrics);
        }
    }

    // ---- interaction ----

    /// Route a command: queued for the next tick while running, applied at
    /// once otherwise. Always validated against the current registry, with
    /// pins from drags already queued this frame taken into account.
    ///
    /// A queued command can still fail when the next tick drains it, e.g. if
    /// its body is removed first. Such failures are only logged with `warn!`
    /// and counted in [`Metrics::rejected_commands`].
    pub fn issue(&mut self, command: Command) -> Result<()> {
        if self.state == EngineState::Running {
            self.interaction.check(&command, &self.bodies)?;
            self.interaction.enqueue(command);
            Ok(())
        } else {
            command.apply(&mut self.bodies, self.config.plane_2d)
        }
    }

    pub fn set_position(&mut self, id: &str, position: Vec3) -> Result<()> {
        self.issue(Command::SetPosition {
            id: id.into(),
            position,
        })
    }

    pub fn set_velocity(&mut self, id: &str, velocity: Vec3) -> Result<()> {
        self.issue(Command::SetVelocity {
            id: id.into(),
            velocity,
        })
    }

    /// Add `impulse` (a velocity change) to a non-fixed body.
    pub fn apply_impulse(&mut self, id: &str, impulse: Vec3) -> Result<()> {
        self.issue(Command::ApplyImpulse {
            id: id.into(),
            impulse,
        })
    }

    pub fn begin_drag(&mut self, id: &str) -> Result<()> {
        self.issue(Command::BeginDrag { id: id.into() })
    }

    pub fn drag(&mut self, id: &str, position: Vec3) -> Result<()> {
        self.issue(Command::Drag {
            id: id.into(),
            position,
        })
    }

    pub fn end_drag(&mut self, id: &str) -> Result<()> {
        self.issue(Command::EndDrag { id: id.into() })
    }

    /// Handle for queueing commands from inside subscriber callbacks.
    pub fn command_sender(&self) -> CommandSender {
        self.interaction.sender()
    }

    // ---- observation ----

    pub fn get_metrics(&self) -> Metrics {
        self.metrics.metrics().clone()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionHandle
    where
        F: FnMut(&[Body], &Metrics) + 'static,
    {
        let handle = SubscriptionHandle(self.next_handle);
        self.next_handle += 1;
        self.subscribers.push((handle, Box::new(callback)));
        handle
    }

    /// Returns false if the handle was not subscribed.
    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(h, _)| *h != handle);
        self.subscribers.len() != before
    }

    /// Whether the mean kinetic energy per moving body is below `threshold`.
    pub fn is_settled(&self, threshold: f64) -> bool {
        let (moving, energy) = self
            .bodies
            .iter()
            .filter(|b| !b.fixed)
            .fold((0usize, 0.0), |(n, e), b| (n + 1, e + b.kinetic_energy()));
        moving == 0 || energy / (moving as f64) < threshold
    }

    fn refresh_counts(&mut self) {
        self.metrics.set_counts(self.bodies.len(), self.springs.len());
    }
}
