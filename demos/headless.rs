//! # Headless
//!
//! Runs the field on the host for a few seconds of simulated time and logs
//! lifetime and speed statistics.
//!
//! If a GPU adapter is available, a short run is replayed on both backends
//! from the same frame sequence and the final grids are compared texel by
//! texel. The demo fails when too many texels differ.
//!
//! Run with: `cargo run --example headless`

use flowfield::prelude::*;
use flowfield::logging;

const FRAMES: u32 = 600;
const COMPARE_FRAMES: u32 = 60;
const DT: f32 = 1.0 / 60.0;

/// Largest per-component difference still counted as a match.
const TOLERANCE: f32 = 1.0e-2;
/// Fraction of texels allowed to differ (respawns near a threshold may flip).
const MAX_MISMATCH_FRACTION: f32 = 0.01;

struct Stats {
    mean_lifetime: f32,
    mean_speed: f32,
    max_speed: f32,
    mean_radius: f32,
}

fn stats(positions: &[Vec4], velocities: &[Vec4]) -> Stats {
    let n = positions.len().max(1) as f32;
    let speeds = velocities.iter().map(|v| v.truncate().length());
    Stats {
        mean_lifetime: positions.iter().map(|p| p.w).sum::<f32>() / n,
        mean_speed: speeds.clone().sum::<f32>() / n,
        max_speed: speeds.fold(0.0, f32::max),
        mean_radius: positions.iter().map(|p| p.truncate().length()).sum::<f32>() / n,
    }
}

/// One frame of input: `(elapsed, delta, attractor)`.
type Frame = (f32, f32, Vec3);

/// Attractor circling the origin, on a fixed-delta clock.
fn frames(count: u32) -> Vec<Frame> {
    let mut time = Time::new();
    time.set_fixed_delta(Some(DT));
    (0..count)
        .map(|_| {
            let (elapsed, delta) = time.advance(DT);
            let angle = elapsed * 0.5;
            (elapsed, delta, Vec3::new(angle.cos() * 6.0, angle.sin() * 6.0, 0.0))
        })
        .collect()
}

/// Max absolute difference and number of texels beyond [`TOLERANCE`].
fn compare(a: &[Vec4], b: &[Vec4]) -> (f32, usize) {
    a.iter().zip(b).fold((0.0f32, 0usize), |(max, over), (x, y)| {
        let diff = (*x - *y).abs().max_element();
        (max.max(diff), over + usize::from(diff > TOLERANCE))
    })
}

fn run_cpu(config: &FieldConfig, frames: &[Frame]) -> Result<CpuParticleField, FieldError> {
    let mut field = CpuParticleField::cpu(config.clone(), VisualConfig::default())?;
    for &(elapsed, delta, attractor) in frames {
        field.set_attractor_position(attractor);
        field.update(elapsed, delta, 30.0)?;
    }
    Ok(field)
}

fn compare_backends(
    context: &GpuContext,
    config: &FieldConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let frames = frames(COMPARE_FRAMES);
    let cpu = run_cpu(config, &frames)?;

    let mut gpu = GpuParticleField::new(
        context,
        config.clone(),
        VisualConfig::default(),
        wgpu::TextureFormat::Rgba8UnormSrgb,
        None,
    )?;
    for &(elapsed, delta, attractor) in &frames {
        gpu.field().set_attractor_position(attractor);
        gpu.update(elapsed, delta, 30.0)?;
    }
    let gpu_positions = gpu.read_positions()?;
    let gpu_velocities = gpu.field().backend().read_velocities()?;
    gpu.dispose();

    let state = cpu.state().ok_or(FieldError::Disposed)?;
    let (position_diff, position_over) = compare(state.positions(), &gpu_positions);
    let (velocity_diff, velocity_over) = compare(state.velocities(), &gpu_velocities);
    log::info!(
        "cpu vs gpu after {COMPARE_FRAMES} frames: position max diff {position_diff:.2e} ({position_over} over), \
         velocity max diff {velocity_diff:.2e} ({velocity_over} over)"
    );

    let allowed = (state.positions().len() as f32 * MAX_MISMATCH_FRACTION) as usize;
    if position_over > allowed || velocity_over > allowed {
        return Err(format!(
            "backends diverged: {position_over} position and {velocity_over} velocity texels \
             differ by more than {TOLERANCE} (allowed {allowed})"
        )
        .into());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _logger = logging::setup()?;

    let config = FieldConfig::default().with_particle_count(64 * 64).with_seed(42);

    let frames = frames(FRAMES);
    let mut field = CpuParticleField::cpu(config.clone(), VisualConfig::default())?;
    for (frame, &(elapsed, delta, attractor)) in frames.iter().enumerate() {
        field.set_attractor_position(attractor);
        field.update(elapsed, delta, 30.0)?;

        if frame % 120 == 0 {
            if let Some(state) = field.state() {
                let s = stats(state.positions(), state.velocities());
                log::info!(
                    "t={elapsed:>5.2}s lifetime {:.3} speed {:.3} (max {:.3}) radius {:.2}",
                    s.mean_lifetime,
                    s.mean_speed,
                    s.max_speed,
                    s.mean_radius
                );
            }
        }
    }
    field.dispose();

    match pollster::block_on(GpuContext::headless()) {
        Ok(context) => compare_backends(&context, &config)?,
        Err(err) => log::warn!("skipping cpu/gpu comparison: {err}"),
    }
    Ok(())
}
