//! # flowfield
//!
//! A GPU-resident particle field: tens of thousands of particles drifting
//! through curl noise, pulled by a pointer attractor, expiring and respawning
//! forever, with all state kept in textures on the device.
//!
//! ## Quick Start
//!
//! ```ignore
//! use flowfield::prelude::*;
//!
//! let config = FieldConfig::default()
//!     .with_particle_count(128 * 128)
//!     .with_bounds_radius(12.0)
//!     .with_lifetime_range(4.0, 10.0);
//!
//! let context = pollster::block_on(GpuContext::headless())?;
//! let mut field = GpuParticleField::new(&context, config, VisualConfig::default(), format, None)?;
//!
//! // once per frame
//! field.update(elapsed, delta_time, camera_distance)?;
//! field.renderable()?.draw(&mut render_pass);
//! ```
//!
//! ## How a step works
//!
//! Particle state lives in two `N×N` grids of `vec4<f32>` texels, each
//! double-buffered:
//!
//! - `position+lifetime` (xyz position, w normalized lifetime)
//! - `velocity`
//!
//! One step is a velocity pass (curl-noise flow, attractor, turbulence and
//! containment, damping, speed clamp) followed by a position pass (aging,
//! integration, respawn). Each pass reads the previous buffers and writes the
//! other instance, then the pair is swapped.
//!
//! The renderer draws one sprite per particle. Each sprite carries only a
//! fixed reference address into the grid; everything else is looked up in
//! the latest position texture.
//!
//! ## Backends
//!
//! - [`GpuBackend`]: wgpu compute shaders over `Rgba32Float` textures.
//! - [`CpuBackend`]: the same kernels in Rust, run with `rayon`. Deterministic,
//!   used by the tests, benchmarks and headless demo.

pub mod camera;
pub mod config;
pub mod cpu;
pub mod error;
pub mod field;
pub mod gpu;
pub mod interaction;
pub mod kernels;
pub mod logging;
pub mod noise;
pub mod quality;
pub mod random;
pub mod scheduler;
pub mod settings;
pub mod shader_utils;
pub mod state;
pub mod time;
pub mod uniforms;
pub mod viewer;
pub mod visuals;

pub use bytemuck;
pub use config::FieldConfig;
pub use cpu::CpuBackend;
pub use error::{ConfigError, FieldError, GpuError, ViewerError};
pub use field::{GpuParticleField, ParticleField};
pub use glam::{Mat4, Vec2, Vec3, Vec4};
pub use gpu::{GpuBackend, GpuContext, Renderable};
pub use interaction::{FrameParams, Interaction, InteractionBridge, MAX_DELTA_TIME};
pub use quality::{QualityChannel, QualityTier};
pub use scheduler::{Pass, SimulationBackend, SimulationScheduler};
pub use settings::Settings;
pub use state::{GridLayout, Particle, ParticleState, PingPong};
pub use time::Time;
pub use visuals::{BlendMode, RenderFrame, VisualConfig};

/// Field on the host-side reference backend.
pub type CpuParticleField = ParticleField<CpuBackend>;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use flowfield::prelude::*;
/// ```
pub mod prelude {
    pub use crate::camera::Camera;
    pub use crate::config::FieldConfig;
    pub use crate::cpu::CpuBackend;
    pub use crate::error::FieldError;
    pub use crate::field::{GpuParticleField, ParticleField};
    pub use crate::gpu::{GpuContext, Renderable};
    pub use crate::interaction::InteractionBridge;
    pub use crate::quality::QualityTier;
    pub use crate::settings::Settings;
    pub use crate::time::Time;
    pub use crate::visuals::{BlendMode, VisualConfig};
    pub use crate::CpuParticleField;
    pub use crate::{Mat4, Vec2, Vec3, Vec4};
}
