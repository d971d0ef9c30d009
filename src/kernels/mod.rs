//! The two per-texel simulation passes.
//!
//! Each kernel exists twice: as a pure Rust function of one texel (run over
//! the grid with `rayon` by the CPU backend) and as a WGSL compute shader (run
//! by the GPU backend). Both read the same [`SimUniforms`](crate::uniforms::SimUniforms).
//!
//! Order within a step is fixed: [`velocity`] first, then [`position`], which
//! integrates with the velocity just written.

pub mod position;
pub mod velocity;

use crate::shader_utils::all_utils_wgsl;
use crate::state::SPAWN_SPEED;
use crate::uniforms::SIM_UNIFORMS_WGSL;

/// Compute workgroups are `WORKGROUP_SIZE × WORKGROUP_SIZE` texels.
pub const WORKGROUP_SIZE: u32 = 8;

/// Hermite interpolation, identical to WGSL `smoothstep`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Constants shared by both kernels.
fn kernel_constants_wgsl() -> String {
    format!(
        "const SPAWN_SPEED: f32 = {:?};\n\
         const RESPAWN_LIFETIME_THRESHOLD: f32 = {:?};\n\
         const CONTAINMENT_STRENGTH: f32 = {:?};\n\
         const RESPAWN_RADIUS_FACTOR: f32 = {:?};\n\
         const ESCAPE_RADIUS_FACTOR: f32 = {:?};\n",
        SPAWN_SPEED,
        velocity::RESPAWN_LIFETIME_THRESHOLD,
        velocity::CONTAINMENT_STRENGTH,
        position::RESPAWN_RADIUS_FACTOR,
        position::ESCAPE_RADIUS_FACTOR,
    )
}

/// Full WGSL module for a kernel body.
pub(crate) fn assemble(kernel_body: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        SIM_UNIFORMS_WGSL,
        all_utils_wgsl(),
        kernel_constants_wgsl(),
        kernel_body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoothstep_matches_reference_points() {
        assert_eq!(smoothstep(0.0, 1.0, -1.0), 0.0);
        assert_eq!(smoothstep(0.0, 1.0, 2.0), 1.0);
        assert!((smoothstep(0.0, 1.0, 0.5) - 0.5).abs() < 1.0e-6);
        assert!((smoothstep(12.0, 36.0, 24.0) - 0.5).abs() < 1.0e-6);
    }

    #[test]
    fn test_constants_are_float_literals() {
        let code = kernel_constants_wgsl();
        assert!(code.contains("const SPAWN_SPEED: f32 = 0.1;"));
        assert!(code.contains("const ESCAPE_RADIUS_FACTOR: f32 = 1.5;"));
    }
}
