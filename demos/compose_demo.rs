//! # Projection Composition Demo
//!
//! Simulates a few frames of a game drawing a 3D world, a sky and a HUD,
//! and prints what each eye would be given.
//!
//! Run with: `cargo run --example compose_demo`

use anyhow::{Context, Result};

use hmd_projection::projection::{decompose, orthographic_matrix, perspective_matrix};
use hmd_projection::{
    ComposedProjection, DrawCall, FovPortHmd, Matrix4, SkyboxMode, ViewportType, VrConfig, VrPipeline,
};

fn main() -> Result<()> {
    hmd_projection::init_logging();

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║           HMD Projection Demo                              ║");
    println!("╠════════════════════════════════════════════════════════════╣");
    println!("║ A game draws sky, world and HUD for 4 frames. The camera   ║");
    println!("║ zooms in on frame 3, which starts a new scene on frame 4.  ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();

    let config = VrConfig {
        units_per_metre: 10.0,
        skybox_mode: SkyboxMode::Locked,
        camera_forward: 0.2,
        ..VrConfig::comfort()
    };
    let hmd = FovPortHmd::symmetric(100.0, 100.0, 0.064).context("Failed to create headset")?;
    let mut pipeline = VrPipeline::with_config(config)
        .context("Invalid configuration")?
        .with_hmd(Box::new(hmd))
        .context("Failed to attach headset")?;

    let reader = pipeline.publisher();

    println!("🎮 Headset: {}", pipeline.hmd_name().unwrap_or("none"));
    println!();

    for frame in 0..4 {
        // Narrow camera from frame 3 on: a sniper scope
        let world = if frame >= 2 {
            perspective_matrix(8.0, 4.5, 1.0, 5000.0)
        } else {
            perspective_matrix(60.0, 34.0, 1.0, 5000.0)
        };
        let calls = [
            DrawCall::new(perspective_matrix(60.0, 34.0, 1.0, 10.0), ViewportType::Skybox),
            DrawCall::new(world, ViewportType::Fullscreen),
            DrawCall::new(orthographic_matrix(0.0, 640.0, 480.0, 0.0, -1.0, 1.0), ViewportType::HudElement),
        ];

        let new_scene = pipeline.begin_frame();
        println!("🖼️  Frame {}{}", frame + 1, if new_scene { " (new scene)" } else { "" });

        let composed = pipeline.compose_frame(&calls);
        for (call, out) in calls.iter().zip(&composed) {
            print_call(call, out);
        }

        let published = pipeline.end_frame();
        println!("   Published frame {} with world eyes: {}", published.frame_index, published.eyes.is_some());
        println!();
    }

    let stats = pipeline.stats();
    println!("✅ Done!");
    println!("   Frames: {}", stats.frames);
    println!("   Scenes: {}", stats.scenes_detected);
    println!("   Draws composed: {} (hidden {})", stats.draws_composed, stats.draws_hidden);
    println!("   Frames seen by reader: {}", reader.published_count());

    Ok(())
}

fn print_call(call: &DrawCall, out: &ComposedProjection) {
    let p = decompose(&call.projection);
    println!(
        "   {:<12} {:>5.1}° x {:>5.1}° -> {:?}{}",
        call.viewport.display_name(),
        p.hfov_deg,
        p.vfov_deg,
        out.path,
        if out.layer_on_top { " (on top)" } else { "" }
    );
    print_matrix("left ", &out.left);
    print_matrix("right", &out.right);
}

fn print_matrix(label: &str, m: &Matrix4) {
    let cells = m.to_array();
    for (row, chunk) in cells.chunks(4).enumerate() {
        let prefix = if row == 0 { label } else { "     " };
        println!(
            "      {} [{:>9.4} {:>9.4} {:>9.4} {:>9.4}]",
            prefix, chunk[0], chunk[1], chunk[2], chunk[3]
        );
    }
}
