//! Visual configuration and per-particle render math.
//!
//! The render stage never simulates anything: it looks up each particle's
//! `position+lifetime` texel through the particle's reference address and
//! derives size, color and alpha from that texel, a few hashes of the particle
//! index and the frame's [`RenderUniforms`].
//!
//! Every formula used by the WGSL shader is also available here as a plain
//! function so render behavior can be checked without a device.
//!
//! ```ignore
//! let mut visuals = VisualConfig::new();
//! visuals
//!     .colors(Vec3::new(0.3, 0.8, 1.0), Vec3::new(0.8, 0.3, 1.0))
//!     .pulse(0.25, 2.0)
//!     .depth_fade(20.0, 60.0);
//! ```

use std::f32::consts::TAU;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::kernels::smoothstep;
use crate::random::{particle_seed, rand, rand_vec3, salt};
use crate::shader_utils::{constants_wgsl, RANDOM_WGSL};
use crate::uniforms::{RenderUniforms, RENDER_UNIFORMS_WGSL};

/// Bounds applied to the distance attenuation factor.
pub const ATTENUATION_RANGE: (f32, f32) = (0.25, 4.0);

/// Blend mode for particle rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    /// Colors add up; overlapping particles glow.
    #[default]
    Additive,

    /// Standard alpha blending.
    Alpha,
}

impl BlendMode {
    pub fn to_wgpu(self) -> wgpu::BlendState {
        match self {
            BlendMode::Additive => wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            },
            BlendMode::Alpha => wgpu::BlendState::ALPHA_BLENDING,
        }
    }
}

/// How particles look.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    /// Color of a freshly spawned particle.
    pub start_color: Vec3,
    /// Color of a particle about to expire.
    pub end_color: Vec3,
    /// Color added at the center of each sprite.
    pub core_color: Vec3,
    pub core_intensity: f32,
    /// Per-particle color jitter amplitude.
    pub hue_jitter: f32,
    pub opacity: f32,
    /// Sprite size in pixels before multipliers.
    pub base_size: f32,
    pub size_attenuation: f32,
    pub pulse_amount: f32,
    pub pulse_speed: f32,
    /// View depth where particles start to fade out.
    pub fade_near: f32,
    /// View depth past which particles are invisible.
    pub fade_far: f32,
    pub blend_mode: BlendMode,
    /// Background clear color (RGB, 0.0-1.0).
    pub background_color: Vec3,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            start_color: Vec3::new(0.35, 0.8, 1.0),
            end_color: Vec3::new(0.75, 0.3, 1.0),
            core_color: Vec3::new(1.0, 1.0, 1.0),
            core_intensity: 0.6,
            hue_jitter: 0.15,
            opacity: 0.85,
            base_size: 3.0,
            size_attenuation: 1.0,
            pulse_amount: 0.25,
            pulse_speed: 2.0,
            fade_near: 30.0,
            fade_far: 80.0,
            blend_mode: BlendMode::Additive,
            background_color: Vec3::new(0.01, 0.01, 0.03),
        }
    }
}

impl VisualConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lifetime gradient, from spawn color to expiry color.
    pub fn colors(&mut self, start: Vec3, end: Vec3) -> &mut Self {
        self.start_color = start;
        self.end_color = end;
        self
    }

    pub fn core(&mut self, color: Vec3, intensity: f32) -> &mut Self {
        self.core_color = color;
        self.core_intensity = intensity;
        self
    }

    pub fn hue_jitter(&mut self, amount: f32) -> &mut Self {
        self.hue_jitter = amount;
        self
    }

    pub fn opacity(&mut self, opacity: f32) -> &mut Self {
        self.opacity = opacity;
        self
    }

    /// Base size in pixels and how strongly it scales with camera distance.
    pub fn size(&mut self, base: f32, attenuation: f32) -> &mut Self {
        self.base_size = base;
        self.size_attenuation = attenuation;
        self
    }

    pub fn pulse(&mut self, amount: f32, speed: f32) -> &mut Self {
        self.pulse_amount = amount;
        self.pulse_speed = speed;
        self
    }

    pub fn depth_fade(&mut self, near: f32, far: f32) -> &mut Self {
        self.fade_near = near;
        self.fade_far = far;
        self
    }

    pub fn blend_mode(&mut self, mode: BlendMode) -> &mut Self {
        self.blend_mode = mode;
        self
    }

    pub fn background(&mut self, color: Vec3) -> &mut Self {
        self.background_color = color;
        self
    }

    /// Pack the uniform block for one frame.
    pub fn render_uniforms(&self, frame: &RenderFrame, seed: u32, side: u32) -> RenderUniforms {
        RenderUniforms {
            view_proj: frame.view_proj.to_cols_array_2d(),
            camera: frame.eye.extend(frame.camera_distance).to_array(),
            start_color: self.start_color.extend(self.hue_jitter).to_array(),
            end_color: self.end_color.extend(self.opacity).to_array(),
            core_color: self.core_color.extend(self.core_intensity).to_array(),
            viewport: [frame.viewport.0, frame.viewport.1],
            pixel_ratio: frame.pixel_ratio,
            time: frame.time,
            base_size: self.base_size,
            size_attenuation: self.size_attenuation,
            pulse_amount: self.pulse_amount,
            pulse_speed: self.pulse_speed,
            fade_near: self.fade_near,
            fade_far: self.fade_far,
            seed,
            side,
        }
    }
}

/// Camera and viewport state for one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderFrame {
    pub view_proj: Mat4,
    pub eye: Vec3,
    pub camera_distance: f32,
    /// Width and height in physical pixels.
    pub viewport: (f32, f32),
    pub pixel_ratio: f32,
    pub time: f32,
}

impl Default for RenderFrame {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY,
            eye: Vec3::new(0.0, 0.0, 30.0),
            camera_distance: 30.0,
            viewport: (1280.0, 720.0),
            pixel_ratio: 1.0,
            time: 0.0,
        }
    }
}

/// Fade-in after spawn and fade-out before expiry; zero at both ends.
#[inline]
pub fn fade_envelope(lifetime: f32) -> f32 {
    smoothstep(0.0, 0.15, 1.0 - lifetime) * smoothstep(0.0, 0.2, lifetime)
}

/// Per-particle size multiplier in `[0.5, 1.5)`.
#[inline]
pub fn size_multiplier(index: u32, seed: u32) -> f32 {
    0.5 + rand(particle_seed(index, salt::SIZE, seed))
}

/// Per-particle pulse phase in `[0, TAU)`.
#[inline]
pub fn pulse_phase(index: u32, seed: u32) -> f32 {
    rand(particle_seed(index, salt::PULSE, seed)) * TAU
}

#[inline]
pub fn pulse(time: f32, amount: f32, speed: f32, phase: f32) -> f32 {
    1.0 + amount * (time * speed + phase).sin()
}

/// Size scale from camera distance over view depth, clamped to [`ATTENUATION_RANGE`].
#[inline]
pub fn distance_attenuation(camera_distance: f32, size_attenuation: f32, view_depth: f32) -> f32 {
    let (lo, hi) = ATTENUATION_RANGE;
    (camera_distance * size_attenuation / view_depth.max(1.0e-4)).clamp(lo, hi)
}

/// Sprite size in pixels.
pub fn point_size(index: u32, lifetime: f32, view_depth: f32, u: &RenderUniforms) -> f32 {
    let phase = pulse_phase(index, u.seed);
    u.base_size
        * size_multiplier(index, u.seed)
        * fade_envelope(lifetime)
        * pulse(u.time, u.pulse_amount, u.pulse_speed, phase)
        * u.pixel_ratio
        * distance_attenuation(u.camera[3], u.size_attenuation, view_depth)
}

/// Sprite color before the fragment-stage core highlight.
pub fn particle_color(index: u32, lifetime: f32, u: &RenderUniforms) -> Vec3 {
    let start = Vec3::new(u.start_color[0], u.start_color[1], u.start_color[2]);
    let end = Vec3::new(u.end_color[0], u.end_color[1], u.end_color[2]);
    let jitter = rand_vec3(particle_seed(index, salt::COLOR, u.seed)) * 0.5 * u.start_color[3];
    start.lerp(end, 1.0 - lifetime) + jitter
}

pub fn particle_alpha(lifetime: f32, view_depth: f32, u: &RenderUniforms) -> f32 {
    let depth_fade = 1.0 - smoothstep(u.fade_near, u.fade_far, view_depth);
    fade_envelope(lifetime) * depth_fade * u.end_color[3]
}

const RENDER_BODY_WGSL: &str = r#"
const TAU: f32 = 6.2831855;

@group(0) @binding(0) var<uniform> render: RenderUniforms;
@group(0) @binding(1) var positions: texture_2d<f32>;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) alpha: f32,
};

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @location(0) reference: vec2<f32>,
) -> VertexOutput {
    var quad_vertices = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>( 1.0,  1.0),
    );
    let quad_pos = quad_vertices[vertex_index];

    let texel = vec2<i32>(reference * f32(render.side));
    let state = textureLoad(positions, texel, 0);
    let lifetime = state.w;
    let index = u32(texel.y) * render.side + u32(texel.x);

    var clip_pos = render.view_proj * vec4<f32>(state.xyz, 1.0);
    let view_depth = max(clip_pos.w, 1.0e-4);

    let envelope = smoothstep(0.0, 0.15, 1.0 - lifetime) * smoothstep(0.0, 0.2, lifetime);
    let multiplier = 0.5 + rand(particle_seed(index, SALT_SIZE, render.seed));
    let phase = rand(particle_seed(index, SALT_PULSE, render.seed)) * TAU;
    let pulse = 1.0 + render.pulse_amount * sin(render.time * render.pulse_speed + phase);
    let attenuation = clamp(render.camera.w * render.size_attenuation / view_depth, 0.25, 4.0);
    let size = render.base_size * multiplier * envelope * pulse * render.pixel_ratio * attenuation;

    clip_pos.x += quad_pos.x * size / render.viewport.x * clip_pos.w;
    clip_pos.y += quad_pos.y * size / render.viewport.y * clip_pos.w;

    let jitter = rand_vec3(particle_seed(index, SALT_COLOR, render.seed)) * 0.5 * render.start_color.a;
    let color = mix(render.start_color.rgb, render.end_color.rgb, 1.0 - lifetime) + jitter;
    let depth_fade = 1.0 - smoothstep(render.fade_near, render.fade_far, view_depth);

    var out: VertexOutput;
    out.clip_position = clip_pos;
    out.color = color;
    out.uv = quad_pos;
    out.alpha = envelope * depth_fade * render.end_color.a;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let dist = length(in.uv);
    if dist > 1.0 {
        discard;
    }
    let falloff = 1.0 - smoothstep(0.0, 1.0, dist);
    let core = (1.0 - smoothstep(0.0, 0.35, dist)) * render.core_color.a;
    let rgb = max(in.color, vec3<f32>(0.0)) + render.core_color.rgb * core;
    return vec4<f32>(rgb, in.alpha * falloff);
}
"#;

/// Complete WGSL module for the particle sprites.
pub fn render_shader_source() -> String {
    format!(
        "{}\n{}\n{}\n{}",
        RENDER_UNIFORMS_WGSL,
        RANDOM_WGSL,
        constants_wgsl(),
        RENDER_BODY_WGSL
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader_utils::tests::validate_wgsl;

    fn uniforms() -> RenderUniforms {
        VisualConfig::default().render_uniforms(&RenderFrame::default(), 7, 16)
    }

    #[test]
    fn test_envelope_is_zero_at_spawn_and_expiry() {
        assert_eq!(fade_envelope(1.0), 0.0);
        assert_eq!(fade_envelope(0.0), 0.0);
        assert_eq!(fade_envelope(0.5), 1.0);
        for i in 0..=100 {
            let e = fade_envelope(i as f32 / 100.0);
            assert!((0.0..=1.0).contains(&e));
        }
    }

    #[test]
    fn test_size_multiplier_range() {
        for i in 0..1000 {
            let m = size_multiplier(i, 3);
            assert!((0.5..1.5).contains(&m), "{m}");
        }
    }

    #[test]
    fn test_attenuation_is_clamped() {
        assert_eq!(distance_attenuation(30.0, 1.0, 30.0), 1.0);
        assert_eq!(distance_attenuation(30.0, 1.0, 1.0), 4.0);
        assert_eq!(distance_attenuation(30.0, 1.0, 1000.0), 0.25);
        assert_eq!(distance_attenuation(30.0, 1.0, 0.0), 4.0);
    }

    #[test]
    fn test_closer_particles_are_not_smaller() {
        let u = uniforms();
        let near = point_size(3, 0.5, 10.0, &u);
        let far = point_size(3, 0.5, 60.0, &u);
        assert!(near >= far);
        assert!(far > 0.0);
    }

    #[test]
    fn test_alpha_fades_with_depth() {
        let u = uniforms();
        assert!(particle_alpha(0.5, 10.0, &u) > particle_alpha(0.5, 60.0, &u));
        assert_eq!(particle_alpha(0.5, 500.0, &u), 0.0);
        assert!((particle_alpha(0.5, 10.0, &u) - u.end_color[3]).abs() < 1.0e-6);
    }

    #[test]
    fn test_color_moves_from_start_to_end() {
        let mut visuals = VisualConfig::default();
        visuals.hue_jitter(0.0);
        let u = visuals.render_uniforms(&RenderFrame::default(), 0, 16);
        assert_eq!(particle_color(0, 1.0, &u), visuals.start_color);
        assert!((particle_color(0, 0.0, &u) - visuals.end_color).length() < 1.0e-6);
    }

    #[test]
    fn test_render_uniforms_pack_camera_distance() {
        let frame = RenderFrame {
            camera_distance: 42.0,
            ..RenderFrame::default()
        };
        let u = VisualConfig::default().render_uniforms(&frame, 0, 128);
        assert_eq!(u.camera[3], 42.0);
        assert_eq!(u.side, 128);
        assert_eq!(u.view_proj(), frame.view_proj);
    }

    #[test]
    fn test_json_round_trip() {
        let visuals = VisualConfig::default();
        let json = serde_json::to_string(&visuals).unwrap();
        let back: VisualConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, visuals);
    }

    #[test]
    fn test_render_shader_validates() {
        validate_wgsl(&render_shader_source()).expect("render shader should be valid");
    }
}
