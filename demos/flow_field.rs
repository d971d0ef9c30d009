//! # Flow Field
//!
//! The interactive viewer with a denser, slower field and warm colors.
//!
//! ## Controls
//!
//! - Left drag: orbit the camera
//! - Right drag: hold the attractor under the cursor
//! - Scroll: zoom
//! - `1` `2` `3`: low, medium, high quality
//! - Space: pause
//! - Esc: quit
//!
//! ## Try This
//!
//! - Negative `attractor_strength` to push particles away
//! - `BlendMode::Alpha` for a softer look
//! - More `octaves` for finer swirls
//!
//! Run with: `cargo run --example flow_field`

use flowfield::prelude::*;
use flowfield::{logging, viewer};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _logger = logging::setup()?;

    let mut visuals = VisualConfig::new();
    visuals
        .colors(Vec3::new(1.0, 0.55, 0.15), Vec3::new(0.9, 0.1, 0.35))
        .core(Vec3::new(1.0, 0.95, 0.8), 0.8)
        .size(2.5, 1.0)
        .pulse(0.3, 1.5)
        .blend_mode(BlendMode::Additive);

    let settings = Settings {
        field: FieldConfig::default()
            .with_flow_field(0.06, 0.08, 2.0)
            .with_attractor(5.0, 10.0)
            .with_fractal(4, 2.0, 0.5)
            .with_lifetime_range(6.0, 14.0),
        visuals,
        quality: Some(QualityTier::High),
    };

    viewer::run(settings)?;
    Ok(())
}
