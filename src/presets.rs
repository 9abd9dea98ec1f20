use serde::Serialize;

use crate::algorithms::Force;
use crate::error::{PhysicsError, Result};
use crate::Vec3;

pub const PRESET_FORCE_DIRECTED: &str = "force-directed";
pub const PRESET_GRAVITY_WELL: &str = "gravity-well";
pub const PRESET_N_BODY: &str = "n-body";
pub const PRESET_MOLECULAR: &str = "molecular";
pub const PRESET_NONE: &str = "none";

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PresetInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

/// Dynamics bundle swapped in by `load_preset`.
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub id: &'static str,
    pub active_forces: Vec<Force>,
    pub gravity: Vec3,
    pub drag: f64,
}

pub fn catalog() -> &'static [PresetInfo] {
    &[
        PresetInfo {
            id: PRESET_FORCE_DIRECTED,
            name: "Force-directed",
            description: "Node repulsion, edge springs and a weak pull to the origin. Settles into a legible graph layout.",
        },
        PresetInfo {
            id: PRESET_GRAVITY_WELL,
            name: "Gravity well",
            description: "Uniform downward gravity with repulsion and springs; nodes hang like a mobile.",
        },
        PresetInfo {
            id: PRESET_N_BODY,
            name: "N-body",
            description: "Mutual gravitational attraction with light drag. Springs are ignored.",
        },
        PresetInfo {
            id: PRESET_MOLECULAR,
            name: "Molecular",
            description: "Stiff bonds with short-range repulsion and no gravity.",
        },
        PresetInfo {
            id: PRESET_NONE,
            name: "No forces",
            description: "Bodies coast on their current velocity.",
        },
    ]
}

pub fn normalize_preset_id(id: &str) -> Option<&'static str> {
    catalog().iter().find(|p| p.id == id).map(|p| p.id)
}

pub fn build(id: &str) -> Result<Preset> {
    let id = normalize_preset_id(id).ok_or_else(|| PhysicsError::UnknownPreset(id.to_string()))?;
    let (active_forces, drag) = match id {
        PRESET_FORCE_DIRECTED => (
            vec![
                Force::Repulsion {
                    strength: 3000.0,
                    cutoff: None,
                },
                Force::Springs,
                Force::CenterAttraction {
                    target: Vec3::zeros(),
                    strength: 0.5,
                },
            ],
            2.0,
        ),
        PRESET_GRAVITY_WELL => (
            vec![
                Force::UniformGravity {
                    vector: Vec3::new(0.0, -9.81, 0.0),
                },
                Force::Repulsion {
                    strength: 800.0,
                    cutoff: None,
                },
                Force::Springs,
            ],
            0.8,
        ),
        PRESET_N_BODY => (vec![Force::NBodyGravity { constant: 1.0 }], 0.01),
        PRESET_MOLECULAR => (
            vec![
                Force::Springs,
                Force::Repulsion {
                    strength: 50.0,
                    cutoff: Some(10.0),
                },
            ],
            0.5,
        ),
        _ => (Vec::new(), 0.0),
    };
    Ok(Preset {
        id,
        active_forces,
        gravity: Vec3::zeros(),
        drag,
    })
}
