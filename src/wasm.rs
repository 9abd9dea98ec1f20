#![cfg(target_arch = "wasm32")]

use std::collections::HashMap;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::algorithms::Force;
use crate::body::{Body, BodyPatch};
use crate::config::ConfigPatch;
use crate::engine::{Engine, EngineState, SubscriptionHandle};
use crate::error::PhysicsError;
use crate::interaction::CommandSender;
use crate::models::scenes::{self, SceneInfo};
use crate::presets::{self, PresetInfo};
use crate::spring::Spring;
use crate::Vec3;

#[wasm_bindgen]
pub fn available_presets() -> js_sys::Array {
    let out = js_sys::Array::new();
    for info in presets::catalog() {
        out.push(&preset_info_to_js(info));
    }
    out
}

#[wasm_bindgen]
pub fn available_scenes() -> js_sys::Array {
    let out = js_sys::Array::new();
    for info in scenes::catalog() {
        out.push(&scene_info_to_js(info));
    }
    out
}

fn info_object(id: &str, name: &str, description: &str) -> js_sys::Object {
    let obj = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&obj, &JsValue::from_str("id"), &JsValue::from_str(id));
    let _ = js_sys::Reflect::set(&obj, &JsValue::from_str("name"), &JsValue::from_str(name));
    let _ = js_sys::Reflect::set(
        &obj,
        &JsValue::from_str("description"),
        &JsValue::from_str(description),
    );
    obj
}

fn preset_info_to_js(info: &PresetInfo) -> JsValue {
    JsValue::from(info_object(info.id, info.name, info.description))
}

fn scene_info_to_js(info: &SceneInfo) -> JsValue {
    JsValue::from(info_object(info.id, info.name, info.description))
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> JsValue {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    value.serialize(&serializer).unwrap_or(JsValue::NULL)
}

fn from_js<T: serde::de::DeserializeOwned>(value: JsValue, what: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("invalid {}: {}", what, e)))
}

fn err(e: PhysicsError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen]
pub struct WasmEngine {
    engine: Engine,
    handles: HashMap<u32, SubscriptionHandle>,
    next_handle: u32,
}

#[wasm_bindgen]
impl WasmEngine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmEngine {
        WasmEngine {
            engine: Engine::new(),
            handles: HashMap::new(),
            next_handle: 0,
        }
    }

    /// Engine preloaded with a built-in scene.
    #[wasm_bindgen(js_name = "withScene")]
    pub fn with_scene(scene_id: &str) -> Result<WasmEngine, JsValue> {
        let mut out = WasmEngine::new();
        out.engine.load_scene(scene_id).map_err(err)?;
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.engine.get_bodies().len()
    }

    pub fn state(&self) -> String {
        match self.engine.state() {
            EngineState::Stopped => "stopped",
            EngineState::Running => "running",
            EngineState::Paused => "paused",
        }
        .to_string()
    }

    pub fn start(&mut self) {
        self.engine.start();
    }

    pub fn stop(&mut self) {
        self.engine.stop();
    }

    pub fn reset(&mut self) {
        self.engine.reset();
    }

    /// Advance one tick; call once per animation frame.
    pub fn tick(&mut self) -> bool {
        self.engine.tick()
    }

    #[wasm_bindgen(js_name = "addBody")]
    pub fn add_body(&mut self, body: JsValue) -> Result<String, JsValue> {
        let body: Body = from_js(body, "body")?;
        self.engine.add_body(body).map(|id| id.0).map_err(err)
    }

    #[wasm_bindgen(js_name = "removeBody")]
    pub fn remove_body(&mut self, id: &str) -> bool {
        self.engine.remove_body(id).is_some()
    }

    #[wasm_bindgen(js_name = "updateBody")]
    pub fn update_body(&mut self, id: &str, patch: JsValue) -> Result<(), JsValue> {
        let patch: BodyPatch = from_js(patch, "body patch")?;
        self.engine.update_body(id, &patch).map_err(err)
    }

    #[wasm_bindgen(js_name = "getBody")]
    pub fn get_body(&self, id: &str) -> JsValue {
        self.engine.get_body(id).map(|b| to_js(&b)).unwrap_or(JsValue::UNDEFINED)
    }

    #[wasm_bindgen(js_name = "addSpring")]
    pub fn add_spring(&mut self, spring: JsValue) -> Result<String, JsValue> {
        let spring: Spring = from_js(spring, "spring")?;
        self.engine.add_spring(spring).map(|id| id.0).map_err(err)
    }

    #[wasm_bindgen(js_name = "removeSpring")]
    pub fn remove_spring(&mut self, id: &str) -> bool {
        self.engine.remove_spring(id).is_some()
    }

    #[wasm_bindgen(js_name = "setActiveForces")]
    pub fn set_active_forces(&mut self, forces: JsValue) -> Result<(), JsValue> {
        let forces: Vec<Force> = from_js(forces, "forces")?;
        self.engine.set_active_forces(forces).map_err(err)
    }

    #[wasm_bindgen(js_name = "loadPreset")]
    pub fn load_preset(&mut self, name: &str) -> Result<(), JsValue> {
        self.engine.load_preset(name).map_err(err)
    }

    #[wasm_bindgen(js_name = "loadScene")]
    pub fn load_scene(&mut self, name: &str) -> Result<(), JsValue> {
        self.engine.load_scene(name).map_err(err)
    }

    #[wasm_bindgen(js_name = "updateConfig")]
    pub fn update_config(&mut self, patch: JsValue) -> Result<(), JsValue> {
        let patch: ConfigPatch = from_js(patch, "config")?;
        self.engine.update_config(&patch).map_err(err)
    }

    pub fn config(&self) -> JsValue {
        to_js(self.engine.config())
    }

    #[wasm_bindgen(js_name = "setPosition")]
    pub fn set_position(&mut self, id: &str, x: f64, y: f64, z: f64) -> Result<(), JsValue> {
        self.engine.set_position(id, Vec3::new(x, y, z)).map_err(err)
    }

    #[wasm_bindgen(js_name = "setVelocity")]
    pub fn set_velocity(&mut self, id: &str, x: f64, y: f64, z: f64) -> Result<(), JsValue> {
        self.engine.set_velocity(id, Vec3::new(x, y, z)).map_err(err)
    }

    #[wasm_bindgen(js_name = "applyImpulse")]
    pub fn apply_impulse(&mut self, id: &str, x: f64, y: f64, z: f64) -> Result<(), JsValue> {
        self.engine.apply_impulse(id, Vec3::new(x, y, z)).map_err(err)
    }

    #[wasm_bindgen(js_name = "beginDrag")]
    pub fn begin_drag(&mut self, id: &str) -> Result<(), JsValue> {
        self.engine.begin_drag(id).map_err(err)
    }

    pub fn drag(&mut self, id: &str, x: f64, y: f64, z: f64) -> Result<(), JsValue> {
        self.engine.drag(id, Vec3::new(x, y, z)).map_err(err)
    }

    #[wasm_bindgen(js_name = "endDrag")]
    pub fn end_drag(&mut self, id: &str) -> Result<(), JsValue> {
        self.engine.end_drag(id).map_err(err)
    }

    #[wasm_bindgen(js_name = "getBodies")]
    pub fn get_bodies(&self) -> JsValue {
        to_js(&self.engine.get_bodies())
    }

    #[wasm_bindgen(js_name = "getSprings")]
    pub fn get_springs(&self) -> JsValue {
        to_js(&self.engine.get_springs())
    }

    #[wasm_bindgen(js_name = "getMetrics")]
    pub fn get_metrics(&self) -> JsValue {
        to_js(&self.engine.get_metrics())
    }

    /// Flat `[x, y, z, ...]` in body order, for direct upload to a buffer.
    pub fn positions(&self) -> Vec<f32> {
        let bodies = self.engine.get_bodies();
        let mut out = Vec::with_capacity(bodies.len() * 3);
        for b in &bodies {
            out.push(b.position.x as f32);
            out.push(b.position.y as f32);
            out.push(b.position.z as f32);
        }
        out
    }

    #[wasm_bindgen(js_name = "isSettled")]
    pub fn is_settled(&self, threshold: f64) -> bool {
        self.engine.is_settled(threshold)
    }

    /// Handle for queueing commands from inside a subscriber callback, where
    /// the engine itself is still borrowed by `tick`.
    #[wasm_bindgen(js_name = "commandSender")]
    pub fn command_sender(&self) -> WasmCommandSender {
        WasmCommandSender {
            inner: self.engine.command_sender(),
        }
    }

    /// Call `callback(bodies, metrics)` after every tick.
    pub fn subscribe(&mut self, callback: js_sys::Function) -> u32 {
        let handle = self.engine.subscribe(move |bodies, metrics| {
            let _ = callback.call2(&JsValue::NULL, &to_js(bodies), &to_js(metrics));
        });
        let id = self.next_handle;
        self.next_handle += 1;
        self.handles.insert(id, handle);
        id
    }

    pub fn unsubscribe(&mut self, id: u32) -> bool {
        match self.handles.remove(&id) {
            Some(handle) => self.engine.unsubscribe(handle),
            None => false,
        }
    }
}

/// Queues commands for the next tick. Every method returns false once the
/// engine is gone; other failures are counted in `rejectedCommands`.
#[wasm_bindgen]
pub struct WasmCommandSender {
    inner: CommandSender,
}

#[wasm_bindgen]
impl WasmCommandSender {
    #[wasm_bindgen(js_name = "setPosition")]
    pub fn set_position(&self, id: &str, x: f64, y: f64, z: f64) -> bool {
        self.inner.set_position(id, Vec3::new(x, y, z))
    }

    #[wasm_bindgen(js_name = "setVelocity")]
    pub fn set_velocity(&self, id: &str, x: f64, y: f64, z: f64) -> bool {
        self.inner.set_velocity(id, Vec3::new(x, y, z))
    }

    #[wasm_bindgen(js_name = "applyImpulse")]
    pub fn apply_impulse(&self, id: &str, x: f64, y: f64, z: f64) -> bool {
        self.inner.apply_impulse(id, Vec3::new(x, y, z))
    }

    #[wasm_bindgen(js_name = "beginDrag")]
    pub fn begin_drag(&self, id: &str) -> bool {
        self.inner.begin_drag(id)
    }

    pub fn drag(&self, id: &str, x: f64, y: f64, z: f64) -> bool {
        self.inner.drag(id, Vec3::new(x, y, z))
    }

    #[wasm_bindgen(js_name = "endDrag")]
    pub fn end_drag(&self, id: &str) -> bool {
        self.inner.end_drag(id)
    }
}

impl Default for WasmEngine {
    fn default() -> Self {
        Self::new()
    }
}
