//! Velocity pass: `pos[t-1], vel[t-1] → vel[t]`.
//!
//! Forces, in the order they are summed:
//!
//! 1. **Flow**: curl of fractal simplex noise at `p * scale + time * speed`.
//! 2. **Attractor**: pull toward the pointer inside `attractor_radius` with a
//!    squared smoothstep falloff; negative strength repels.
//! 3. **Turbulence**: raw noise at a higher frequency.
//! 4. **Containment**: pull toward the origin once outside `bounds_radius`.
//!
//! Then `v' = (v + F·dt)·max(0, 1 − damping·dt)`, the respawn reset, and the
//! speed clamp, in that order.

use glam::{Vec3, Vec4};
use rayon::prelude::*;

use super::smoothstep;
use crate::noise::{curl_noise, noise_vec3};
use crate::random::{frame_seed, rand_vec3, salt};
use crate::state::SPAWN_SPEED;
use crate::uniforms::SimUniforms;

/// Lifetimes at or below this get a fresh velocity; they are about to respawn.
pub const RESPAWN_LIFETIME_THRESHOLD: f32 = 0.01;

/// Scale of the containment pull at full strength.
pub const CONTAINMENT_STRENGTH: f32 = 0.5;

pub fn flow_force(position: Vec3, u: &SimUniforms) -> Vec3 {
    let sample = position * u.flow_scale + Vec3::splat(u.time * u.flow_speed);
    curl_noise(sample, u.fractal(), u.curl_epsilon) * u.flow_strength
}

pub fn attractor_force(position: Vec3, u: &SimUniforms) -> Vec3 {
    let to_attractor = u.attractor_position() - position;
    let distance = to_attractor.length();
    if distance >= u.attractor_radius || distance <= 1.0e-5 {
        return Vec3::ZERO;
    }
    let falloff = 1.0 - smoothstep(0.0, u.attractor_radius, distance);
    to_attractor / distance * u.attractor_strength * falloff * falloff
}

pub fn turbulence_force(position: Vec3, u: &SimUniforms) -> Vec3 {
    noise_vec3(position * u.turbulence_scale + Vec3::splat(u.time)) * u.turbulence
}

pub fn containment_force(position: Vec3, u: &SimUniforms) -> Vec3 {
    let radius = position.length();
    if radius <= u.bounds_radius {
        return Vec3::ZERO;
    }
    let pull = smoothstep(u.bounds_radius, 3.0 * u.bounds_radius, radius) * CONTAINMENT_STRENGTH;
    -position / radius * pull
}

/// Sum of all forces acting at `position`.
pub fn total_force(position: Vec3, u: &SimUniforms) -> Vec3 {
    flow_force(position, u)
        + attractor_force(position, u)
        + turbulence_force(position, u)
        + containment_force(position, u)
}

/// Explicit Euler step with linear damping.
#[inline]
pub fn integrate(velocity: Vec3, force: Vec3, u: &SimUniforms) -> Vec3 {
    (velocity + force * u.delta_time) * (1.0 - u.damping * u.delta_time).max(0.0)
}

/// Rescale `velocity` so its length is at most `max_speed`.
#[inline]
pub fn clamp_speed(velocity: Vec3, max_speed: f32) -> Vec3 {
    let speed = velocity.length();
    if speed > max_speed {
        velocity * (max_speed / speed)
    } else {
        velocity
    }
}

/// True for particles about to respawn or respawned by the previous position pass.
#[inline]
pub fn needs_reset(lifetime: f32) -> bool {
    lifetime <= RESPAWN_LIFETIME_THRESHOLD || lifetime >= 1.0
}

/// New velocity texel for particle `index`.
pub fn velocity_texel(index: u32, position_lifetime: Vec4, velocity: Vec4, u: &SimUniforms) -> Vec4 {
    let position = position_lifetime.truncate();
    let lifetime = position_lifetime.w;

    let force = total_force(position, u);
    let mut next = integrate(velocity.truncate(), force, u);

    if needs_reset(lifetime) {
        let seed = frame_seed(index, salt::RESPAWN_VELOCITY, u.seed, u.time);
        next = rand_vec3(seed) * SPAWN_SPEED;
    }

    clamp_speed(next, u.max_velocity).extend(0.0)
}

/// Run the pass over the whole grid.
pub fn run(positions: &[Vec4], velocities: &[Vec4], out: &mut [Vec4], u: &SimUniforms) {
    out.par_iter_mut().enumerate().for_each(|(i, texel)| {
        *texel = velocity_texel(i as u32, positions[i], velocities[i], u);
    });
}

const VELOCITY_WGSL: &str = r#"
@group(0) @binding(0) var<uniform> sim: SimUniforms;
@group(0) @binding(1) var position_in: texture_2d<f32>;
@group(0) @binding(2) var velocity_in: texture_2d<f32>;
@group(0) @binding(3) var velocity_out: texture_storage_2d<rgba32float, write>;

fn flow_force(p: vec3<f32>) -> vec3<f32> {
    let sample = p * sim.flow_scale + vec3<f32>(sim.time * sim.flow_speed);
    return curl_noise(sample, sim.octaves, sim.lacunarity, sim.gain, sim.curl_epsilon) * sim.flow_strength;
}

fn attractor_force(p: vec3<f32>) -> vec3<f32> {
    let to_attractor = sim.attractor.xyz - p;
    let dist = length(to_attractor);
    if dist >= sim.attractor_radius || dist <= 1.0e-5 {
        return vec3<f32>(0.0);
    }
    let falloff = 1.0 - smoothstep(0.0, sim.attractor_radius, dist);
    return to_attractor / dist * sim.attractor_strength * falloff * falloff;
}

fn turbulence_force(p: vec3<f32>) -> vec3<f32> {
    return noise_vec3(p * sim.turbulence_scale + vec3<f32>(sim.time)) * sim.turbulence;
}

fn containment_force(p: vec3<f32>) -> vec3<f32> {
    let radius = length(p);
    if radius <= sim.bounds_radius {
        return vec3<f32>(0.0);
    }
    let pull = smoothstep(sim.bounds_radius, 3.0 * sim.bounds_radius, radius) * CONTAINMENT_STRENGTH;
    return -p / radius * pull;
}

@compute @workgroup_size(8, 8)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    if global_id.x >= sim.side || global_id.y >= sim.side {
        return;
    }

    let texel = vec2<i32>(global_id.xy);
    let index = global_id.y * sim.side + global_id.x;

    let state = textureLoad(position_in, texel, 0);
    let p = state.xyz;
    let lifetime = state.w;
    let v = textureLoad(velocity_in, texel, 0).xyz;

    let force = flow_force(p) + attractor_force(p) + turbulence_force(p) + containment_force(p);
    var next = (v + force * sim.delta_time) * max(1.0 - sim.damping * sim.delta_time, 0.0);

    if lifetime <= RESPAWN_LIFETIME_THRESHOLD || lifetime >= 1.0 {
        next = rand_vec3(frame_seed(index, SALT_RESPAWN_VELOCITY, sim.seed, sim.time)) * SPAWN_SPEED;
    }

    let speed = length(next);
    if speed > sim.max_velocity {
        next = next * (sim.max_velocity / speed);
    }

    textureStore(velocity_out, texel, vec4<f32>(next, 0.0));
}
"#;

/// Complete WGSL module for the velocity pass.
pub fn shader_source() -> String {
    super::assemble(VELOCITY_WGSL)
}
