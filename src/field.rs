//! The collaborator-facing particle field.
//!
//! A [`ParticleField`] bundles the simulation scheduler, the interaction
//! bridge and the render-side parameters. Scene code only calls
//! [`update`](ParticleField::update) once per frame and draws the result.
//!
//! # Example
//!
//! ```ignore
//! use flowfield::prelude::*;
//!
//! let mut field = ParticleField::cpu(FieldConfig::default(), VisualConfig::default())?;
//! field.set_attractor_position(Vec3::new(2.0, 1.0, 0.0));
//! field.update(0.016, 0.016, 30.0)?;
//! ```

use glam::{Mat4, Vec3, Vec4};

use crate::config::FieldConfig;
use crate::cpu::CpuBackend;
use crate::error::FieldError;
use crate::gpu::{GpuBackend, GpuContext, ParticleRenderer, Renderable};
use crate::interaction::InteractionBridge;
use crate::scheduler::{SimulationBackend, SimulationScheduler};
use crate::state::{GridLayout, ParticleState};
use crate::uniforms::RenderUniforms;
use crate::visuals::{RenderFrame, VisualConfig};

/// Simulation plus render parameters over any backend.
pub struct ParticleField<B> {
    scheduler: SimulationScheduler<B>,
    bridge: InteractionBridge,
    visuals: VisualConfig,
    render_frame: RenderFrame,
    max_pixel_ratio: f32,
}

impl<B: SimulationBackend> ParticleField<B> {
    pub fn with_backend(
        backend: B,
        config: FieldConfig,
        visuals: VisualConfig,
    ) -> Result<Self, FieldError> {
        let scheduler = SimulationScheduler::new(backend, config)?;
        log::debug!(
            "particle field: {} particles on a {}×{} grid",
            scheduler.layout().len(),
            scheduler.layout().side(),
            scheduler.layout().side()
        );
        Ok(Self {
            scheduler,
            bridge: InteractionBridge::new(),
            visuals,
            render_frame: RenderFrame::default(),
            max_pixel_ratio: f32::INFINITY,
        })
    }

    /// Advance one step and record the camera distance for size attenuation.
    ///
    /// `delta_time` is clamped to `[0, MAX_DELTA_TIME]`.
    pub fn update(
        &mut self,
        elapsed: f32,
        delta_time: f32,
        camera_distance: f32,
    ) -> Result<(), FieldError> {
        let frame = self.bridge.frame(elapsed, delta_time);
        self.scheduler.step(&frame)?;
        self.render_frame.time = elapsed;
        self.render_frame.camera_distance = camera_distance;
        Ok(())
    }

    pub fn set_attractor_position(&self, position: Vec3) {
        self.bridge.set_attractor_position(position);
    }

    pub fn clear_attractor(&self) {
        self.bridge.clear_attractor();
    }

    /// Handle for feeding pointer state from elsewhere, possibly another thread.
    pub fn interaction(&self) -> InteractionBridge {
        self.bridge.clone()
    }

    /// Viewport change. Only render parameters move; the state grids keep
    /// their dimensions.
    pub fn resize(&mut self, width: u32, height: u32, pixel_ratio: f32) {
        self.render_frame.viewport = (width.max(1) as f32, height.max(1) as f32);
        self.render_frame.pixel_ratio = pixel_ratio.min(self.max_pixel_ratio).max(0.0);
    }

    /// Cap applied to the pixel ratio on every subsequent [`resize`](Self::resize).
    pub fn set_max_pixel_ratio(&mut self, cap: f32) {
        self.max_pixel_ratio = cap;
        self.render_frame.pixel_ratio = self.render_frame.pixel_ratio.min(cap);
    }

    pub fn set_camera(&mut self, view_proj: Mat4, eye: Vec3) {
        self.render_frame.view_proj = view_proj;
        self.render_frame.eye = eye;
    }

    /// Render uniforms for the current frame.
    pub fn render_uniforms(&self) -> RenderUniforms {
        let layout = self.scheduler.layout();
        self.visuals
            .render_uniforms(&self.render_frame, self.scheduler.config().seed, layout.side())
    }

    pub fn visuals(&self) -> &VisualConfig {
        &self.visuals
    }

    /// Release all grid instances. Further updates return [`FieldError::Disposed`].
    pub fn dispose(&mut self) {
        self.scheduler.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.scheduler.is_disposed()
    }

    #[inline]
    pub fn layout(&self) -> GridLayout {
        self.scheduler.layout()
    }

    pub fn config(&self) -> &FieldConfig {
        self.scheduler.config()
    }

    /// Completed simulation steps.
    pub fn frame(&self) -> u64 {
        self.scheduler.frame()
    }

    /// Slot of the position grid the renderer should sample.
    pub fn current_position_index(&self) -> usize {
        self.scheduler.current_position_index()
    }

    pub fn backend(&self) -> &B {
        self.scheduler.backend()
    }
}

impl ParticleField<CpuBackend> {
    /// Field simulated on the host.
    pub fn cpu(config: FieldConfig, visuals: VisualConfig) -> Result<Self, FieldError> {
        let backend = CpuBackend::new(&config)?;
        Self::with_backend(backend, config, visuals)
    }

    /// Host-side state, `None` after dispose.
    pub fn state(&self) -> Option<&ParticleState> {
        self.backend().state()
    }

    /// Latest `position+lifetime` grid.
    pub fn current_position_buffer(&self) -> Option<&[Vec4]> {
        self.backend().positions()
    }
}

/// Field simulated and drawn on the device.
pub struct GpuParticleField {
    field: ParticleField<GpuBackend>,
    renderer: Option<ParticleRenderer>,
    context: GpuContext,
}

impl GpuParticleField {
    /// Build the backend and the sprite pipeline for `color_format`. Pass a
    /// depth format to depth-test sprites against the scene.
    pub fn new(
        context: &GpuContext,
        config: FieldConfig,
        visuals: VisualConfig,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Result<Self, FieldError> {
        let backend = GpuBackend::new(context, &config)?;
        let layout = GridLayout::for_config(&config)?;
        let renderer = backend.textures().map(|textures| {
            ParticleRenderer::new(
                &context.device,
                color_format,
                depth_format,
                visuals.blend_mode,
                textures,
                layout,
            )
        });
        let field = ParticleField::with_backend(backend, config, visuals)?;
        Ok(Self {
            field,
            renderer,
            context: context.clone(),
        })
    }

    pub fn update(
        &mut self,
        elapsed: f32,
        delta_time: f32,
        camera_distance: f32,
    ) -> Result<(), FieldError> {
        self.field.update(elapsed, delta_time, camera_distance)
    }

    pub fn set_camera(&mut self, view_proj: Mat4, eye: Vec3) {
        self.field.set_camera(view_proj, eye);
    }

    /// Upload render parameters and return a handle drawing the latest
    /// position grid.
    pub fn renderable(&self) -> Result<Renderable<'_>, FieldError> {
        let renderer = self.renderer.as_ref().ok_or(FieldError::Disposed)?;
        renderer.prepare(&self.context.queue, &self.field.render_uniforms());
        Ok(renderer.renderable(self.field.current_position_index()))
    }

    pub fn dispose(&mut self) {
        self.renderer = None;
        self.field.dispose();
    }

    /// Copy the latest position grid back to the host.
    pub fn read_positions(&self) -> Result<Vec<Vec4>, FieldError> {
        self.field.backend().read_positions()
    }

    pub fn field(&self) -> &ParticleField<GpuBackend> {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut ParticleField<GpuBackend> {
        &mut self.field
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> FieldConfig {
        FieldConfig::default().with_particle_count(16 * 16)
    }

    #[test]
    fn test_update_advances_frame_and_records_camera() {
        let mut field = ParticleField::cpu(small(), VisualConfig::default()).unwrap();
        field.update(0.5, 0.016, 42.0).unwrap();
        assert_eq!(field.frame(), 1);
        assert_eq!(field.render_uniforms().camera[3], 42.0);
        assert_eq!(field.render_uniforms().time, 0.5);
    }

    #[test]
    fn test_resize_caps_pixel_ratio_and_keeps_grid() {
        let mut field = ParticleField::cpu(small(), VisualConfig::default()).unwrap();
        field.set_max_pixel_ratio(1.5);
        field.resize(800, 600, 3.0);
        let u = field.render_uniforms();
        assert_eq!(u.pixel_ratio, 1.5);
        assert_eq!(u.viewport, [800.0, 600.0]);
        assert_eq!(field.layout().side(), 16);
        assert_eq!(field.current_position_buffer().map(<[Vec4]>::len), Some(256));
    }

    #[test]
    fn test_update_after_dispose_fails() {
        let mut field = ParticleField::cpu(small(), VisualConfig::default()).unwrap();
        field.dispose();
        field.dispose();
        assert!(field.state().is_none());
        assert!(matches!(field.update(0.0, 0.016, 30.0), Err(FieldError::Disposed)));
    }

    #[test]
    fn test_attractor_handle_reaches_simulation() {
        let field = ParticleField::cpu(small(), VisualConfig::default()).unwrap();
        let handle = field.interaction();
        handle.set_attractor_position(Vec3::ONE);
        assert_eq!(field.bridge.snapshot().attractor, Some(Vec3::ONE));
        field.clear_attractor();
        assert_eq!(handle.snapshot().attractor, None);
    }
}
