//! Position pass: `pos[t-1], vel[t] → pos[t]`.
//!
//! Ages the particle by `dt / lifespan`, integrates with the velocity written
//! by the velocity pass of the same step, and respawns near the origin once the
//! particle has expired or escaped well past the bounds.

use glam::{Vec3, Vec4};
use rayon::prelude::*;

use crate::random::{frame_seed, particle_seed, rand_in_sphere, rand_range, salt};
use crate::uniforms::SimUniforms;

/// Respawned particles land within this fraction of `bounds_radius`.
pub const RESPAWN_RADIUS_FACTOR: f32 = 0.3;

/// Particles farther than this multiple of `bounds_radius` respawn.
pub const ESCAPE_RADIUS_FACTOR: f32 = 1.5;

/// Lifespan of particle `index` in seconds. Fixed for the particle's whole
/// existence, across respawns.
#[inline]
pub fn lifespan(index: u32, u: &SimUniforms) -> f32 {
    rand_range(
        particle_seed(index, salt::LIFESPAN, u.seed),
        u.lifetime_min,
        u.lifetime_max,
    )
}

/// Respawn location for particle `index` at the current frame.
pub fn respawn_position(index: u32, u: &SimUniforms) -> Vec3 {
    rand_in_sphere(
        frame_seed(index, salt::RESPAWN_POSITION, u.seed, u.time),
        u.bounds_radius * RESPAWN_RADIUS_FACTOR,
    )
}

/// New position texel for particle `index`.
pub fn position_texel(index: u32, position_lifetime: Vec4, velocity: Vec4, u: &SimUniforms) -> Vec4 {
    let mut lifetime = position_lifetime.w - u.delta_time / lifespan(index, u);
    let mut position = position_lifetime.truncate() + velocity.truncate() * u.delta_time;

    if lifetime <= 0.0 || position.length() > u.bounds_radius * ESCAPE_RADIUS_FACTOR {
        position = respawn_position(index, u);
        lifetime = 1.0;
    }

    position.extend(lifetime.clamp(0.0, 1.0))
}

/// Run the pass over the whole grid. `velocities` is this step's output of
/// the velocity pass.
pub fn run(positions: &[Vec4], velocities: &[Vec4], out: &mut [Vec4], u: &SimUniforms) {
    out.par_iter_mut().enumerate().for_each(|(i, texel)| {
        *texel = position_texel(i as u32, positions[i], velocities[i], u);
    });
}

const POSITION_WGSL: &str = r#"
@group(0) @binding(0) var<uniform> sim: SimUniforms;
@group(0) @binding(1) var position_in: texture_2d<f32>;
@group(0) @binding(2) var velocity_in: texture_2d<f32>;
@group(0) @binding(3) var position_out: texture_storage_2d<rgba32float, write>;

@compute @workgroup_size(8, 8)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    if global_id.x >= sim.side || global_id.y >= sim.side {
        return;
    }

    let texel = vec2<i32>(global_id.xy);
    let index = global_id.y * sim.side + global_id.x;

    let state = textureLoad(position_in, texel, 0);
    let v = textureLoad(velocity_in, texel, 0).xyz;

    let lifespan = rand_range(particle_seed(index, SALT_LIFESPAN, sim.seed), sim.lifetime_min, sim.lifetime_max);
    var lifetime = state.w - sim.delta_time / lifespan;
    var p = state.xyz + v * sim.delta_time;

    if lifetime <= 0.0 || length(p) > sim.bounds_radius * ESCAPE_RADIUS_FACTOR {
        let seed = frame_seed(index, SALT_RESPAWN_POSITION, sim.seed, sim.time);
        p = rand_in_sphere(seed, sim.bounds_radius * RESPAWN_RADIUS_FACTOR);
        lifetime = 1.0;
    }

    textureStore(position_out, texel, vec4<f32>(p, clamp(lifetime, 0.0, 1.0)));
}
"#;

/// Complete WGSL module for the position pass.
pub fn shader_source() -> String {
    super::assemble(POSITION_WGSL)
}
