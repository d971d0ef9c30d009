//! GPU uniform blocks.
//!
//! [`SimUniforms`] is the single parameter snapshot both kernels see for one
//! step; the CPU backend consumes the very same struct, so the two backends
//! cannot disagree on a parameter. Layouts are plain 4-byte scalars after
//! 16-byte vectors, matching the WGSL declarations below without implicit
//! padding.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::config::FieldConfig;
use crate::interaction::{clamp_delta, FrameParams};
use crate::noise::Fractal;

/// Stand-in attractor position when no pointer is active.
pub const FAR_AWAY: [f32; 3] = [1.0e6, 1.0e6, 1.0e6];

/// Per-step kernel parameters.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SimUniforms {
    /// xyz = attractor position, w unused.
    pub attractor: [f32; 4],
    pub time: f32,
    pub delta_time: f32,
    pub bounds_radius: f32,
    pub lifetime_min: f32,
    pub lifetime_max: f32,
    pub flow_scale: f32,
    pub flow_speed: f32,
    pub flow_strength: f32,
    pub attractor_radius: f32,
    pub attractor_strength: f32,
    pub turbulence: f32,
    pub turbulence_scale: f32,
    pub damping: f32,
    pub max_velocity: f32,
    pub curl_epsilon: f32,
    pub lacunarity: f32,
    pub gain: f32,
    pub octaves: u32,
    pub side: u32,
    pub seed: u32,
}

impl SimUniforms {
    pub fn new(config: &FieldConfig, side: u32, frame: &FrameParams) -> Self {
        let attractor = frame.attractor.map(|a| a.to_array()).unwrap_or(FAR_AWAY);
        Self {
            attractor: [attractor[0], attractor[1], attractor[2], 0.0],
            time: frame.time,
            delta_time: clamp_delta(frame.delta_time),
            bounds_radius: config.bounds_radius,
            lifetime_min: config.lifetime_min,
            lifetime_max: config.lifetime_max,
            flow_scale: config.flow_field_scale,
            flow_speed: config.flow_field_speed,
            flow_strength: config.flow_field_strength,
            attractor_radius: config.attractor_radius,
            attractor_strength: config.attractor_strength,
            turbulence: config.turbulence,
            turbulence_scale: config.turbulence_scale,
            damping: config.damping,
            max_velocity: config.max_velocity,
            curl_epsilon: config.curl_epsilon,
            lacunarity: config.lacunarity,
            gain: config.gain,
            octaves: config.octaves,
            side,
            seed: config.seed,
        }
    }

    #[inline]
    pub fn attractor_position(&self) -> Vec3 {
        Vec3::new(self.attractor[0], self.attractor[1], self.attractor[2])
    }

    #[inline]
    pub fn fractal(&self) -> Fractal {
        Fractal {
            octaves: self.octaves,
            lacunarity: self.lacunarity,
            gain: self.gain,
        }
    }
}

/// WGSL declaration matching [`SimUniforms`].
pub const SIM_UNIFORMS_WGSL: &str = r#"
struct SimUniforms {
    attractor: vec4<f32>,
    time: f32,
    delta_time: f32,
    bounds_radius: f32,
    lifetime_min: f32,
    lifetime_max: f32,
    flow_scale: f32,
    flow_speed: f32,
    flow_strength: f32,
    attractor_radius: f32,
    attractor_strength: f32,
    turbulence: f32,
    turbulence_scale: f32,
    damping: f32,
    max_velocity: f32,
    curl_epsilon: f32,
    lacunarity: f32,
    gain: f32,
    octaves: u32,
    side: u32,
    seed: u32,
};
"#;

/// Per-frame render parameters.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct RenderUniforms {
    pub view_proj: [[f32; 4]; 4],
    /// xyz = eye position, w = camera distance.
    pub camera: [f32; 4],
    /// rgb = start color, a = hue jitter.
    pub start_color: [f32; 4],
    /// rgb = end color, a = opacity.
    pub end_color: [f32; 4],
    /// rgb = core color, a = core intensity.
    pub core_color: [f32; 4],
    pub viewport: [f32; 2],
    pub pixel_ratio: f32,
    pub time: f32,
    pub base_size: f32,
    pub size_attenuation: f32,
    pub pulse_amount: f32,
    pub pulse_speed: f32,
    pub fade_near: f32,
    pub fade_far: f32,
    pub seed: u32,
    pub side: u32,
}

impl RenderUniforms {
    pub fn view_proj(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.view_proj)
    }
}

/// WGSL declaration matching [`RenderUniforms`].
pub const RENDER_UNIFORMS_WGSL: &str = r#"
struct RenderUniforms {
    view_proj: mat4x4<f32>,
    camera: vec4<f32>,
    start_color: vec4<f32>,
    end_color: vec4<f32>,
    core_color: vec4<f32>,
    viewport: vec2<f32>,
    pixel_ratio: f32,
    time: f32,
    base_size: f32,
    size_attenuation: f32,
    pulse_amount: f32,
    pulse_speed: f32,
    fade_near: f32,
    fade_far: f32,
    seed: u32,
    side: u32,
};
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::MAX_DELTA_TIME;

    #[test]
    fn test_uniform_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<SimUniforms>(), 96);
        assert_eq!(std::mem::size_of::<RenderUniforms>(), 176);
    }

    #[test]
    fn test_cleared_attractor_uses_far_away_sentinel() {
        let frame = FrameParams::new(1.0, 0.016, None);
        let u = SimUniforms::new(&FieldConfig::default(), 128, &frame);
        assert_eq!(u.attractor_position(), Vec3::from_array(FAR_AWAY));

        let frame = FrameParams::new(1.0, 0.016, Some(Vec3::new(1.0, 2.0, 3.0)));
        let u = SimUniforms::new(&FieldConfig::default(), 128, &frame);
        assert_eq!(u.attractor_position(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_hand_built_frame_delta_is_clamped() {
        let config = FieldConfig::default();
        let long = FrameParams {
            time: 0.0,
            delta_time: 3.0,
            attractor: None,
        };
        assert_eq!(SimUniforms::new(&config, 128, &long).delta_time, MAX_DELTA_TIME);

        let backwards = FrameParams {
            delta_time: -1.0,
            ..long
        };
        assert_eq!(SimUniforms::new(&config, 128, &backwards).delta_time, 0.0);
    }
}
