//! Simulation parameters.
//!
//! [`FieldConfig`] is fixed at construction for the things that size buffers
//! (particle count) and freely adjustable for everything else. It follows the
//! same builder style as the rest of the crate:
//!
//! ```ignore
//! let config = FieldConfig::default()
//!     .with_particle_count(128 * 128)
//!     .with_bounds_radius(12.0)
//!     .with_lifetime_range(4.0, 10.0)
//!     .with_flow_field(0.08, 0.12, 2.5);
//! config.validate()?;
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound on fractal noise octaves, shared with the WGSL loop.
pub const MAX_OCTAVES: u32 = 8;

/// Parameters consumed by the velocity and position kernels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Number of particles. Must be a perfect square.
    pub particle_count: u32,
    /// Radius of the containment sphere.
    pub bounds_radius: f32,
    /// Shortest per-particle lifespan in seconds.
    pub lifetime_min: f32,
    /// Longest per-particle lifespan in seconds.
    pub lifetime_max: f32,
    /// Spatial frequency of the curl flow field.
    pub flow_field_scale: f32,
    /// How fast the flow field scrolls through noise space.
    pub flow_field_speed: f32,
    /// Force multiplier of the flow field.
    pub flow_field_strength: f32,
    /// Radius of influence of the attractor.
    pub attractor_radius: f32,
    /// Attractor force. Negative values repel.
    pub attractor_strength: f32,
    /// Amplitude of raw high-frequency noise.
    pub turbulence: f32,
    /// Spatial frequency of the turbulence noise.
    pub turbulence_scale: f32,
    /// Linear velocity damping per second.
    pub damping: f32,
    /// Hard cap on particle speed.
    pub max_velocity: f32,
    /// Fractal octaves of the flow potential.
    pub octaves: u32,
    /// Frequency multiplier between octaves.
    pub lacunarity: f32,
    /// Amplitude multiplier between octaves.
    pub gain: f32,
    /// Finite-difference step used for the curl.
    pub curl_epsilon: f32,
    /// Global seed mixed into every per-particle hash.
    pub seed: u32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            particle_count: 128 * 128,
            bounds_radius: 12.0,
            lifetime_min: 4.0,
            lifetime_max: 10.0,
            flow_field_scale: 0.08,
            flow_field_speed: 0.12,
            flow_field_strength: 2.5,
            attractor_radius: 4.0,
            attractor_strength: 8.0,
            turbulence: 0.4,
            turbulence_scale: 0.6,
            damping: 0.6,
            max_velocity: 6.0,
            octaves: 3,
            lacunarity: 2.0,
            gain: 0.5,
            curl_epsilon: 0.01,
            seed: 0,
        }
    }
}

impl FieldConfig {
    /// Set the number of particles (must be a perfect square).
    pub fn with_particle_count(mut self, count: u32) -> Self {
        self.particle_count = count;
        self
    }

    /// Set the containment radius.
    pub fn with_bounds_radius(mut self, radius: f32) -> Self {
        self.bounds_radius = radius;
        self
    }

    /// Set the range per-particle lifespans are drawn from.
    pub fn with_lifetime_range(mut self, min: f32, max: f32) -> Self {
        self.lifetime_min = min;
        self.lifetime_max = max;
        self
    }

    /// Set curl flow field scale, scroll speed and strength.
    pub fn with_flow_field(mut self, scale: f32, speed: f32, strength: f32) -> Self {
        self.flow_field_scale = scale;
        self.flow_field_speed = speed;
        self.flow_field_strength = strength;
        self
    }

    /// Set attractor radius and strength (negative strength repels).
    pub fn with_attractor(mut self, radius: f32, strength: f32) -> Self {
        self.attractor_radius = radius;
        self.attractor_strength = strength;
        self
    }

    /// Set turbulence amplitude and frequency.
    pub fn with_turbulence(mut self, amount: f32, scale: f32) -> Self {
        self.turbulence = amount;
        self.turbulence_scale = scale;
        self
    }

    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_max_velocity(mut self, max_velocity: f32) -> Self {
        self.max_velocity = max_velocity;
        self
    }

    /// Set fractal octaves, lacunarity and gain of the flow potential.
    pub fn with_fractal(mut self, octaves: u32, lacunarity: f32, gain: f32) -> Self {
        self.octaves = octaves;
        self.lacunarity = lacunarity;
        self.gain = gain;
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    /// Side length `N` of the state grid, if the particle count is a perfect square.
    pub fn grid_side(&self) -> Result<u32, ConfigError> {
        if self.particle_count == 0 {
            return Err(ConfigError::EmptyParticleCount);
        }
        let nearest = integer_sqrt(self.particle_count);
        if nearest * nearest != self.particle_count {
            return Err(ConfigError::NonSquareParticleCount {
                count: self.particle_count,
                nearest,
            });
        }
        Ok(nearest)
    }

    /// Reject configurations the kernels cannot run with.
    ///
    /// Nothing is coerced: an out-of-range value is an error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid_side()?;

        let scalars = [
            ("bounds_radius", self.bounds_radius),
            ("lifetime_min", self.lifetime_min),
            ("lifetime_max", self.lifetime_max),
            ("flow_field_scale", self.flow_field_scale),
            ("flow_field_speed", self.flow_field_speed),
            ("flow_field_strength", self.flow_field_strength),
            ("attractor_radius", self.attractor_radius),
            ("attractor_strength", self.attractor_strength),
            ("turbulence", self.turbulence),
            ("turbulence_scale", self.turbulence_scale),
            ("damping", self.damping),
            ("max_velocity", self.max_velocity),
            ("lacunarity", self.lacunarity),
            ("gain", self.gain),
            ("curl_epsilon", self.curl_epsilon),
        ];
        for (name, value) in scalars {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite { name, value });
            }
        }

        if self.lifetime_min <= 0.0 || self.lifetime_min > self.lifetime_max {
            return Err(ConfigError::InvalidLifetimeRange {
                min: self.lifetime_min,
                max: self.lifetime_max,
            });
        }

        for (name, value) in [
            ("bounds_radius", self.bounds_radius),
            ("max_velocity", self.max_velocity),
            ("attractor_radius", self.attractor_radius),
            ("curl_epsilon", self.curl_epsilon),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NotPositive { name, value });
            }
        }

        for (name, value) in [
            ("damping", self.damping),
            ("turbulence", self.turbulence),
            ("flow_field_scale", self.flow_field_scale),
            ("turbulence_scale", self.turbulence_scale),
        ] {
            if value < 0.0 {
                return Err(ConfigError::Negative { name, value });
            }
        }

        if self.octaves == 0 || self.octaves > MAX_OCTAVES {
            return Err(ConfigError::InvalidOctaves {
                value: self.octaves,
                max: MAX_OCTAVES,
            });
        }

        Ok(())
    }
}

/// Largest `r` with `r * r <= n`.
fn integer_sqrt(n: u32) -> u32 {
    let mut r = (n as f64).sqrt() as u32;
    while (r as u64) * (r as u64) > n as u64 {
        r -= 1;
    }
    while ((r + 1) as u64) * ((r + 1) as u64) <= n as u64 {
        r += 1;
    }
    r
}
