use std::f32::consts::TAU;
use std::path::Path;

use anyhow::{Context, bail};
use nalgebra_glm as glm;

use skindeform::deform::{DeformationSolver, translate_targets};
use skindeform::model::{Playback, Rig, as_bytes};
use skindeform::parser::{load_gltf, load_obj};
use skindeform::settings::Settings;

const DEFAULT_FRAMES: usize = 30;

fn largest_offset(a: &[glm::Vec3], b: &[glm::Vec3]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(p, q)| (p - q).norm())
        .fold(0.0, f32::max)
}

fn play_rig(path: &Path, frames: usize, settings: &Settings) -> anyhow::Result<()> {
    let data = load_gltf(path).with_context(|| format!("failed to load '{}'", path.display()))?;
    let rig = Rig::from_data(data)?.with_rotation_interpolation(settings.animation.rotation);

    let duration = rig.duration();
    let step = if duration > 0.0 {
        duration / frames as f32
    } else {
        1.0 / 30.0
    };
    let mut playback = Playback::new(settings.animation.playback_speed, settings.animation.looping);

    let bind = rig.mesh().bind_positions();
    for i in 0..frames {
        let frame = rig.frame(playback.time);
        let buffer = frame.vertex_buffer();
        log::info!(
            "frame {i:>3} t={:.3}s: max offset from bind {:.4}, {} buffer bytes",
            frame.pose.time,
            largest_offset(&frame.positions, bind),
            as_bytes(&buffer).len()
        );
        playback.advance(step, duration);
    }

    println!(
        "{}: {} vertices, {} bones, {:.3}s animated over {} frames",
        rig.name(),
        rig.mesh().vertex_count(),
        rig.animation().skeleton().len(),
        duration,
        frames
    );
    Ok(())
}

/// Pin the bottom of the mesh and sweep the top up and down.
fn sweep_mesh(path: &Path, frames: usize, settings: &Settings) -> anyhow::Result<()> {
    let mut mesh = load_obj(path).with_context(|| format!("failed to load '{}'", path.display()))?;
    mesh.normalize_to_unit_cube();
    if let Err(e) = mesh.vertex_normals() {
        log::warn!("mesh has degenerate geometry: {e}");
    }

    let anchors = mesh.select_vertices(|p| p.y < -0.4);
    let handles = mesh.select_vertices(|p| p.y > 0.4);
    if anchors.is_empty() || handles.is_empty() {
        bail!("mesh has no vertices near its bottom or top to constrain");
    }

    let mut solver = DeformationSolver::new(&mesh.triangles, mesh.positions.clone())?;
    let constrained: Vec<usize> = anchors.iter().chain(&handles).copied().collect();
    solver
        .set_constraints(&constrained, settings.deform.penalty, settings.deform.smoothing)
        .context("failed to factor the deformation system")?;

    let rest = solver.rest_positions().to_vec();
    for i in 0..frames {
        let lift = 0.25 * (TAU * i as f32 / frames as f32).sin();
        let targets = translate_targets(&rest, &handles, &glm::vec3(0.0, lift, 0.0));
        let positions = solver.solve(&targets)?;
        log::info!(
            "frame {i:>3} lift={lift:+.3}: max offset from rest {:.4}",
            largest_offset(&positions, &rest)
        );
    }

    println!(
        "{}: {} vertices, {} anchored, {} driven, {:?} smoothing over {} frames",
        path.display(),
        mesh.vertex_count(),
        anchors.len(),
        handles.len(),
        settings.deform.smoothing,
        frames
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let Some(path) = args.get(1) else {
        bail!("usage: skindeform <file.gltf|file.glb|file.obj> [frames]");
    };
    let frames = match args.get(2) {
        Some(n) => n
            .parse::<usize>()
            .with_context(|| format!("invalid frame count '{n}'"))?
            .max(1),
        None => DEFAULT_FRAMES,
    };

    let settings = Settings::load();
    log::debug!("settings: {settings:?}");

    let path = Path::new(path);
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("gltf" | "glb") => play_rig(path, frames, &settings),
        Some("obj") => sweep_mesh(path, frames, &settings),
        _ => bail!("unsupported file type: {}", path.display()),
    }
}
