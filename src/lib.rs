//! Real-time physics core for interactive diagrams and STEM scenes.
//!
//! Bodies and springs live in an [`Engine`], which composes pluggable forces,
//! integrates them with semi-implicit Euler and pushes a snapshot to its
//! subscribers after every tick.

pub mod algorithms;
pub mod body;
pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod interaction;
pub mod metrics;
pub mod models;
pub mod presets;
pub mod sim;
pub mod spring;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub type Vec3 = nalgebra::Vector3<f64>;

pub use algorithms::{Force, ForceComposer};
pub use body::{Body, BodyId, BodyPatch, BodyRegistry};
pub use config::{Bounds, ConfigPatch, SimulationConfig};
pub use engine::{Engine, EngineState, SubscriptionHandle};
pub use error::{BridgeError, PhysicsError, Result};
pub use interaction::{Command, CommandSender};
pub use metrics::{Clock, ManualClock, Metrics, SystemClock};
pub use spring::{Spring, SpringId, SpringTable};
