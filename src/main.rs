//! Headless demo: load a scene, run it for a fixed number of ticks and
//! print the final bodies as JSON.
//!
//! ```text
//! praxis-physics --scene lattice --ticks 600
//! praxis-physics --scene ring --preset gravity-well --config tweaks.json
//! RUST_LOG=debug praxis-physics --list
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use praxis_physics::models::scenes;
use praxis_physics::{presets, ConfigPatch, Engine};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Run a built-in scene headlessly.
#[derive(Parser, Debug)]
#[command(name = "praxis-physics")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Scene template to load
    #[arg(short, long, default_value = scenes::SCENE_RING)]
    scene: String,

    /// Preset to apply after the scene's own
    #[arg(short, long)]
    preset: Option<String>,

    /// Number of ticks to run
    #[arg(short, long, default_value = "600")]
    ticks: u64,

    /// JSON file holding a config patch
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log a progress line every N ticks (0 disables)
    #[arg(long, default_value = "120")]
    every: u64,

    /// Stop early once mean kinetic energy per body drops below this
    #[arg(long)]
    settle: Option<f64>,

    /// List scenes and presets, then exit
    #[arg(long)]
    list: bool,
}

fn list() {
    println!("scenes:");
    for s in scenes::catalog() {
        println!("  {:<16} {}", s.id, s.description);
    }
    println!("presets:");
    for p in presets::catalog() {
        println!("  {:<16} {}", p.id, p.description);
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.list {
        list();
        return Ok(());
    }

    let mut engine = Engine::new();
    engine
        .load_scene(&cli.scene)
        .with_context(|| format!("loading scene '{}'", cli.scene))?;
    if let Some(preset) = &cli.preset {
        engine
            .load_preset(preset)
            .with_context(|| format!("loading preset '{preset}'"))?;
    }
    if let Some(path) = &cli.config {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let patch: ConfigPatch = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        engine.update_config(&patch)?;
    }

    info!(
        scene = %cli.scene,
        preset = ?engine.config().preset,
        bodies = engine.get_bodies().len(),
        springs = engine.get_springs().len(),
        "starting"
    );

    engine.start();
    for _ in 0..cli.ticks {
        engine.tick();
        let m = engine.get_metrics();
        if cli.every > 0 && m.tick_count % cli.every == 0 {
            info!(
                tick = m.tick_count,
                sim_time = m.simulation_time,
                kinetic_energy = m.kinetic_energy,
                tick_ms = m.tick_duration_ms,
                "progress"
            );
        }
        if cli.settle.is_some_and(|t| engine.is_settled(t)) {
            info!(tick = m.tick_count, "settled");
            break;
        }
    }
    engine.stop();

    let m = engine.get_metrics();
    info!(
        ticks = m.tick_count,
        recoveries = m.unstable_recoveries,
        rejected = m.rejected_commands,
        "finished"
    );
    println!("{}", serde_json::to_string_pretty(&engine.get_bodies())?);
    Ok(())
}
