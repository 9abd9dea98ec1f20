use praxis_physics::models::scenes;
use praxis_physics::{Engine, ManualClock};

fn loaded(scene: &str) -> Engine {
    let mut engine = Engine::with_clock(ManualClock::new());
    engine.load_scene(scene).unwrap();
    engine.start();
    engine
}

#[test]
fn every_scene_runs_without_blowing_up() {
    for info in scenes::catalog() {
        let mut engine = loaded(info.id);
        for _ in 0..600 {
            engine.tick();
        }
        let m = engine.get_metrics();
        assert_eq!(m.unstable_recoveries, 0, "scene {}", info.id);
        for body in engine.get_bodies() {
            assert!(body.is_finite(), "scene {} body {}", info.id, body.id);
        }
    }
}

#[test]
fn pendulum_keeps_its_length() {
    let mut engine = loaded(scenes::SCENE_PENDULUM);
    let mut lowest = f64::INFINITY;
    for _ in 0..300 {
        engine.tick();
        let anchor = engine.get_body("pendulum_anchor").unwrap();
        let bob = engine.get_body("pendulum_bob").unwrap();
        let len = (bob.position - anchor.position).norm();
        assert!((len - 2.0).abs() < 0.2, "rod length {len}");
        lowest = lowest.min(bob.position.y);
    }
    // swings through the bottom of the arc
    assert!(lowest < 2.0 - 2.0 * 30.0_f64.to_radians().cos());
}

#[test]
fn planets_stay_on_their_orbits() {
    let mut engine = loaded(scenes::SCENE_SOLAR);
    for _ in 0..600 {
        engine.tick();
    }
    for (planet, radius) in [("mercury", 50.0), ("venus", 80.0), ("earth", 120.0)] {
        let r = engine.get_body(planet).unwrap().position.norm();
        assert!((r - radius).abs() < 2.0, "{planet} drifted to r = {r}");
    }
    assert_eq!(engine.get_body("sun").unwrap().position.norm(), 0.0);
}

#[test]
fn force_directed_layout_settles() {
    let mut engine = loaded(scenes::SCENE_CONCEPT_MAP);
    for _ in 0..3000 {
        engine.tick();
        if engine.is_settled(1e-4) {
            return;
        }
    }
    panic!("layout still moving: {:?}", engine.get_metrics());
}
