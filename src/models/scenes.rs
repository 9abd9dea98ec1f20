use std::f64::consts::PI;

use serde::Serialize;
use serde_json::json;

use crate::algorithms::Force;
use crate::body::Body;
use crate::config::ConfigPatch;
use crate::error::{PhysicsError, Result};
use crate::presets::{PRESET_FORCE_DIRECTED, PRESET_MOLECULAR, PRESET_N_BODY, PRESET_NONE};
use crate::spring::Spring;
use crate::Vec3;

pub const SCENE_RING: &str = "ring";
pub const SCENE_LATTICE: &str = "lattice";
pub const SCENE_PENDULUM: &str = "pendulum";
pub const SCENE_SPRING_CHAIN: &str = "spring-chain";
pub const SCENE_WATER: &str = "water-molecule";
pub const SCENE_BENZENE: &str = "benzene-ring";
pub const SCENE_SOLAR: &str = "solar-system";
pub const SCENE_CONCEPT_MAP: &str = "concept-map";

pub const RING_COUNT: usize = 20;
const EARTH_GRAVITY: f64 = -9.81;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SceneInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

/// Topology plus the dynamics it is meant to run under.
#[derive(Debug, Clone)]
pub struct Scene {
    pub id: &'static str,
    pub preset: &'static str,
    /// Applied on top of the preset.
    pub tweaks: ConfigPatch,
    pub bodies: Vec<Body>,
    pub springs: Vec<Spring>,
}

pub fn catalog() -> &'static [SceneInfo] {
    &[
        SceneInfo {
            id: SCENE_RING,
            name: "Ring",
            description: "Unconnected nodes on a wobbly ring; repulsion spreads them out.",
        },
        SceneInfo {
            id: SCENE_LATTICE,
            name: "Lattice",
            description: "3×3 grid of nodes linked to their neighbours.",
        },
        SceneInfo {
            id: SCENE_PENDULUM,
            name: "Pendulum",
            description: "Bob on a stiff spring below a fixed anchor, under gravity.",
        },
        SceneInfo {
            id: SCENE_SPRING_CHAIN,
            name: "Spring chain",
            description: "Five masses hanging from a pinned head.",
        },
        SceneInfo {
            id: SCENE_WATER,
            name: "Water molecule",
            description: "Oxygen with two hydrogen atoms at 104.5°.",
        },
        SceneInfo {
            id: SCENE_BENZENE,
            name: "Benzene ring",
            description: "Six carbons in a hexagon, each with one hydrogen.",
        },
        SceneInfo {
            id: SCENE_SOLAR,
            name: "Solar system",
            description: "Three planets on circular orbits around a heavy sun.",
        },
        SceneInfo {
            id: SCENE_CONCEPT_MAP,
            name: "Concept map",
            description: "Central topic with two levels of sub-topics.",
        },
    ]
}

pub fn build(id: &str) -> Result<Scene> {
    match id {
        SCENE_RING => Ok(ring(RING_COUNT)),
        SCENE_LATTICE => Ok(lattice(3)),
        SCENE_PENDULUM => Ok(pendulum(2.0, 30.0)),
        SCENE_SPRING_CHAIN => Ok(spring_chain(5)),
        SCENE_WATER => Ok(water_molecule()),
        SCENE_BENZENE => Ok(benzene_ring()),
        SCENE_SOLAR => Ok(solar_system()),
        SCENE_CONCEPT_MAP => Ok(concept_map(4, 2)),
        other => Err(PhysicsError::UnknownScene(other.to_string())),
    }
}

fn node(id: String, x: f64, y: f64) -> Body {
    Body::new(id, Vec3::new(x, y, 0.0)).with_radius(8.0)
}

/// Ring with a radial wobble so repulsion has something to even out.
pub fn ring(count: usize) -> Scene {
    let mut bodies = Vec::with_capacity(count);
    let count_f = count.max(1) as f64;
    for i in 0..count {
        let i_f = i as f64;
        let angle = (i_f / count_f) * 2.0 * PI;
        let wobble = 0.6 + 0.4 * (i_f * 0.7).sin();
        let r = 150.0 * wobble;
        bodies.push(node(format!("ring_{i}"), r * angle.cos(), r * angle.sin()));
    }
    Scene {
        id: SCENE_RING,
        preset: PRESET_FORCE_DIRECTED,
        tweaks: ConfigPatch::default(),
        bodies,
        springs: Vec::new(),
    }
}

/// `side × side` grid with springs between horizontal and vertical
/// neighbours.
pub fn lattice(side: usize) -> Scene {
    let spacing = 60.0;
    let origin = (side as f64 - 1.0) * spacing * 0.5;
    let name = |ix: usize, iy: usize| format!("cell_{ix}_{iy}");

    let mut bodies = Vec::with_capacity(side * side);
    let mut springs = Vec::new();
    for ix in 0..side {
        for iy in 0..side {
            bodies.push(node(
                name(ix, iy),
                ix as f64 * spacing - origin,
                iy as f64 * spacing - origin,
            ));
            if ix > 0 {
                springs.push(
                    Spring::new(format!("h_{ix}_{iy}"), name(ix - 1, iy), name(ix, iy))
                        .with_rest_length(spacing)
                        .with_stiffness(1.0),
                );
            }
            if iy > 0 {
                springs.push(
                    Spring::new(format!("v_{ix}_{iy}"), name(ix, iy - 1), name(ix, iy))
                        .with_rest_length(spacing)
                        .with_stiffness(1.0),
                );
            }
        }
    }
    Scene {
        id: SCENE_LATTICE,
        preset: PRESET_FORCE_DIRECTED,
        tweaks: ConfigPatch::default(),
        bodies,
        springs,
    }
}

pub fn pendulum(length: f64, initial_angle_deg: f64) -> Scene {
    let angle = initial_angle_deg.to_radians();
    let anchor = Vec3::new(0.0, 2.0, 0.0);
    let bob = anchor + Vec3::new(length * angle.sin(), -length * angle.cos(), 0.0);

    Scene {
        id: SCENE_PENDULUM,
        preset: PRESET_NONE,
        tweaks: ConfigPatch {
            gravity: Some(Vec3::new(0.0, EARTH_GRAVITY, 0.0)),
            active_forces: Some(vec![Force::Springs]),
            ..Default::default()
        },
        bodies: vec![
            Body::new("pendulum_anchor", anchor)
                .with_radius(0.1)
                .with_mass(0.0)
                .pinned()
                .with_metadata(json!({ "name": "Anchor Point" })),
            Body::new("pendulum_bob", bob)
                .with_radius(0.2)
                .with_metadata(json!({ "name": "Pendulum Bob" })),
        ],
        springs: vec![
            Spring::new("pendulum_rod", "pendulum_anchor", "pendulum_bob")
                .with_rest_length(length)
                .with_stiffness(500.0)
                .with_damping(0.5),
        ],
    }
}

pub fn spring_chain(links: usize) -> Scene {
    let rest = 1.0;
    let mut bodies = vec![Body::new("chain_0", Vec3::zeros()).with_radius(0.1).pinned()];
    let mut springs = Vec::with_capacity(links);
    for i in 1..=links {
        bodies.push(Body::new(format!("chain_{i}"), Vec3::new(i as f64 * rest, 0.0, 0.0)).with_radius(0.1));
        springs.push(
            Spring::new(format!("link_{i}"), format!("chain_{}", i - 1), format!("chain_{i}"))
                .with_rest_length(rest)
                .with_stiffness(50.0)
                .with_damping(0.5),
        );
    }
    Scene {
        id: SCENE_SPRING_CHAIN,
        preset: PRESET_NONE,
        tweaks: ConfigPatch {
            gravity: Some(Vec3::new(0.0, EARTH_GRAVITY, 0.0)),
            drag: Some(0.2),
            active_forces: Some(vec![Force::Springs]),
            ..Default::default()
        },
        bodies,
        springs,
    }
}

pub fn water_molecule() -> Scene {
    let bond = 0.96;
    let half_angle = (104.5_f64 / 2.0).to_radians();
    let hx = bond * half_angle.sin();
    let hy = -bond * half_angle.cos();

    let atom = |id: &str, element: &str, mass: f64, radius: f64, x: f64, y: f64| {
        Body::new(id, Vec3::new(x, y, 0.0))
            .with_mass(mass)
            .with_radius(radius)
            .with_metadata(json!({ "element": element }))
    };

    Scene {
        id: SCENE_WATER,
        preset: PRESET_MOLECULAR,
        tweaks: ConfigPatch::default(),
        bodies: vec![
            atom("water_O", "O", 16.0, 0.66, 0.0, 0.0),
            atom("water_H1", "H", 1.008, 0.31, hx, hy),
            atom("water_H2", "H", 1.008, 0.31, -hx, hy),
        ],
        springs: vec![
            Spring::new("water_bond_OH1", "water_O", "water_H1")
                .with_rest_length(bond)
                .with_stiffness(500.0)
                .with_damping(1.0),
            Spring::new("water_bond_OH2", "water_O", "water_H2")
                .with_rest_length(bond)
                .with_stiffness(500.0)
                .with_damping(1.0),
        ],
    }
}

pub fn benzene_ring() -> Scene {
    let cc = 1.4;
    let ch = 1.1;
    let mut bodies = Vec::with_capacity(12);
    let mut springs = Vec::with_capacity(12);

    for i in 0..6 {
        let angle = i as f64 * PI / 3.0;
        let (s, c) = angle.sin_cos();
        bodies.push(
            Body::new(format!("benzene_C{i}"), Vec3::new(cc * c, cc * s, 0.0))
                .with_mass(12.011)
                .with_radius(0.7)
                .with_metadata(json!({ "element": "C" })),
        );
        bodies.push(
            Body::new(format!("benzene_H{i}"), Vec3::new((cc + ch) * c, (cc + ch) * s, 0.0))
                .with_mass(1.008)
                .with_radius(0.31)
                .with_metadata(json!({ "element": "H" })),
        );
        springs.push(
            Spring::new(format!("benzene_CH{i}"), format!("benzene_C{i}"), format!("benzene_H{i}"))
                .with_rest_length(ch)
                .with_stiffness(400.0)
                .with_damping(1.0),
        );
    }
    for i in 0..6 {
        let next = (i + 1) % 6;
        springs.push(
            Spring::new(
                format!("benzene_CC{i}"),
                format!("benzene_C{i}"),
                format!("benzene_C{next}"),
            )
            .with_rest_length(cc)
            .with_stiffness(600.0)
            .with_damping(1.0),
        );
    }

    Scene {
        id: SCENE_BENZENE,
        preset: PRESET_MOLECULAR,
        tweaks: ConfigPatch::default(),
        bodies,
        springs,
    }
}

/// Planets start on circular orbits for G = 1 (the n-body preset).
pub fn solar_system() -> Scene {
    let sun_mass = 1000.0;
    let mut bodies = vec![
        Body::new("sun", Vec3::zeros())
            .with_mass(sun_mass)
            .with_radius(5.0)
            .pinned(),
    ];
    for (name, r) in [("mercury", 50.0), ("venus", 80.0), ("earth", 120.0)] {
        let speed = (sun_mass / r).sqrt();
        bodies.push(
            Body::new(name, Vec3::new(r, 0.0, 0.0))
                .with_velocity(Vec3::new(0.0, speed, 0.0))
                .with_mass(0.01)
                .with_radius(1.0),
        );
    }
    Scene {
        id: SCENE_SOLAR,
        preset: PRESET_N_BODY,
        tweaks: ConfigPatch {
            drag: Some(0.0),
            ..Default::default()
        },
        bodies,
        springs: Vec::new(),
    }
}

/// Hub node with `children` sub-topics, each with `grandchildren` leaves.
pub fn concept_map(children: usize, grandchildren: usize) -> Scene {
    let mut bodies = vec![node("topic".to_string(), 0.0, 0.0).with_radius(16.0)];
    let mut springs = Vec::new();

    for c in 0..children {
        let angle = c as f64 / children.max(1) as f64 * 2.0 * PI;
        let child = format!("topic_{c}");
        bodies.push(node(child.clone(), 100.0 * angle.cos(), 100.0 * angle.sin()));
        springs.push(
            Spring::new(format!("edge_{c}"), "topic", child.clone())
                .with_rest_length(100.0)
                .with_stiffness(1.0),
        );
        for g in 0..grandchildren {
            let spread = angle + (g as f64 - (grandchildren as f64 - 1.0) / 2.0) * 0.4;
            let leaf = format!("topic_{c}_{g}");
            bodies.push(node(leaf.clone(), 180.0 * spread.cos(), 180.0 * spread.sin()));
            springs.push(
                Spring::new(format!("edge_{c}_{g}"), child.clone(), leaf)
                    .with_rest_length(70.0)
                    .with_stiffness(1.0),
            );
        }
    }

    Scene {
        id: SCENE_CONCEPT_MAP,
        preset: PRESET_FORCE_DIRECTED,
        tweaks: ConfigPatch::default(),
        bodies,
        springs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyRegistry;
    use crate::spring::SpringTable;

    #[test]
    fn every_scene_builds_into_valid_topology() {
        for info in catalog() {
            let scene = build(info.id).unwrap();
            assert_eq!(scene.id, info.id);

            let mut bodies = BodyRegistry::new();
            for b in scene.bodies {
                bodies.add(b).unwrap();
            }
            let mut springs = SpringTable::new();
            for s in scene.springs {
                springs.add(s, &bodies).unwrap();
            }
            assert!(crate::presets::normalize_preset_id(scene.preset).is_some());
        }
    }

    #[test]
    fn lattice_links_neighbours_only() {
        let scene = lattice(3);
        assert_eq!(scene.bodies.len(), 9);
        // 2 * side * (side - 1)
        assert_eq!(scene.springs.len(), 12);
    }

    #[test]
    fn concept_map_is_a_tree() {
        let scene = concept_map(4, 2);
        assert_eq!(scene.bodies.len(), 13);
        assert_eq!(scene.springs.len(), scene.bodies.len() - 1);
    }

    #[test]
    fn unknown_scene_rejected() {
        assert!(matches!(build("dyson-sphere"), Err(PhysicsError::UnknownScene(_))));
    }
}
