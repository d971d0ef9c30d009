//! Error types for flowfield.
//!
//! Configuration mistakes are rejected before any buffer exists, GPU failures
//! abort initialization as a whole, and [`FieldError`] is what the public
//! simulation API returns.

use thiserror::Error;

/// Invalid [`FieldConfig`](crate::FieldConfig) or settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Particle count of zero.
    #[error("particle count must be greater than zero")]
    EmptyParticleCount,
    /// Particle count that cannot be laid out on an `N×N` grid.
    #[error("particle count {count} is not a perfect square (nearest grid is {nearest}×{nearest})")]
    NonSquareParticleCount { count: u32, nearest: u32 },
    /// `lifetime_min > lifetime_max`, or a non-positive lifetime.
    #[error("invalid lifetime range [{min}, {max}]: bounds must be positive and min <= max")]
    InvalidLifetimeRange { min: f32, max: f32 },
    /// A parameter that must be strictly positive.
    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f32 },
    /// A parameter that must not be negative.
    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f32 },
    /// NaN or infinity.
    #[error("{name} must be finite, got {value}")]
    NotFinite { name: &'static str, value: f32 },
    /// Fractal noise without any octave.
    #[error("octaves must be between 1 and {max}, got {value}")]
    InvalidOctaves { value: u32, max: u32 },
    /// Malformed settings JSON.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    /// Settings file could not be read.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while bringing up or driving the GPU backend.
#[derive(Debug, Error)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    #[error("failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found; a WebGPU/Vulkan/Metal/DX12 capable device is required")]
    NoAdapter,
    /// Failed to create GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
    /// The state texture format cannot be sampled and written as storage.
    #[error("adapter does not support {format:?} as a sampled + storage texture")]
    UnsupportedFormat { format: wgpu::TextureFormat },
    /// Grid side exceeds `max_texture_dimension_2d`.
    #[error("state grid {side}×{side} exceeds the device texture limit of {max}")]
    GridTooLarge { side: u32, max: u32 },
    /// A WGSL kernel or pipeline failed validation.
    #[error("failed to build {stage}: {message}")]
    KernelBuild { stage: &'static str, message: String },
    /// Failed to map buffer for reading.
    #[error("failed to map GPU buffer: {0}")]
    BufferMapping(String),
}

/// Errors returned by the simulation API.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    /// `step` was called after `dispose`.
    #[error("simulation has been disposed")]
    Disposed,
}

/// Errors that end the interactive viewer.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Field(#[from] FieldError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_square_message_names_nearest_grid() {
        let err = ConfigError::NonSquareParticleCount { count: 1000, nearest: 31 };
        let msg = err.to_string();
        assert!(msg.contains("1000"));
        assert!(msg.contains("31×31"));
    }

    #[test]
    fn test_field_error_is_transparent_over_config() {
        let err: FieldError = ConfigError::EmptyParticleCount.into();
        assert_eq!(err.to_string(), "particle count must be greater than zero");
        assert!(matches!(err, FieldError::Config(_)));
    }
}
