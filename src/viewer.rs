//! Minimal interactive window around a [`GpuParticleField`].
//!
//! Controls:
//!
//! | input              | action                                  |
//! |--------------------|-----------------------------------------|
//! | left drag          | orbit                                   |
//! | wheel              | zoom                                    |
//! | right drag         | move the attractor over the `z = 0` plane |
//! | `1` / `2` / `3`    | low / medium / high quality             |
//! | `Space`            | pause                                   |
//! | `Esc`              | quit                                    |

use std::sync::Arc;

use crossbeam_channel::Receiver;
use glam::Vec2;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use crate::camera::Camera;
use crate::error::{GpuError, ViewerError};
use crate::field::GpuParticleField;
use crate::gpu::{create_depth_texture, GpuContext, DEPTH_FORMAT};
use crate::quality::{self, QualityChannel, QualityTier};
use crate::settings::Settings;
use crate::time::Time;

/// Open a window and run until it is closed.
pub fn run(settings: Settings) -> Result<(), ViewerError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = Viewer::new(settings);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct Viewer {
    settings: Settings,
    quality: QualityChannel,
    quality_rx: Receiver<QualityTier>,
    time: Time,
    camera: Camera,
    /// Tier chosen at runtime; until then the settings file decides the count.
    selected_tier: Option<QualityTier>,
    /// Key press for the tier already current, before any runtime choice.
    pending_tier: Option<QualityTier>,
    gpu: Option<ViewerGpu>,
    error: Option<ViewerError>,
    orbiting: bool,
    attracting: bool,
    cursor: Option<Vec2>,
}

struct ViewerGpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    context: GpuContext,
    depth: wgpu::TextureView,
    field: GpuParticleField,
    tier: QualityTier,
}

impl Viewer {
    fn new(settings: Settings) -> Self {
        let mut quality = QualityChannel::new(settings.tier());
        let quality_rx = quality.subscribe();
        let camera = Camera::new(settings.field.bounds_radius * 2.5);
        Self {
            settings,
            quality,
            quality_rx,
            time: Time::new(),
            camera,
            selected_tier: None,
            pending_tier: None,
            gpu: None,
            error: None,
            orbiting: false,
            attracting: false,
            cursor: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<ViewerGpu, ViewerError> {
        let attrs = Window::default_attributes()
            .with_title("flowfield")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(Arc::clone(&window))
            .map_err(GpuError::from)?;
        let context = pollster::block_on(GpuContext::new(&instance, Some(&surface)))?;

        let size = window.inner_size();
        let caps = surface.get_capabilities(&context.adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(caps.formats.first())
            .copied()
            .ok_or(GpuError::UnsupportedFormat {
                format: wgpu::TextureFormat::Bgra8UnormSrgb,
            })?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&context.device, &surface_config);
        let depth = create_depth_texture(&context.device, surface_config.width, surface_config.height);

        let tier = self.quality.current();
        let field = self.build_field(&context, format, tier, &window)?;

        Ok(ViewerGpu {
            window,
            surface,
            surface_config,
            context,
            depth,
            field,
            tier,
        })
    }

    fn build_field(
        &self,
        context: &GpuContext,
        format: wgpu::TextureFormat,
        tier: QualityTier,
        window: &Window,
    ) -> Result<GpuParticleField, ViewerError> {
        let config = self.settings.field_config_with(self.selected_tier);
        let mut field = GpuParticleField::new(
            context,
            config,
            self.settings.visuals.clone(),
            format,
            Some(DEPTH_FORMAT),
        )?;
        let size = window.inner_size();
        let inner = field.field_mut();
        inner.set_max_pixel_ratio(tier.max_pixel_ratio());
        inner.resize(size.width, size.height, window.scale_factor() as f32);
        Ok(field)
    }

    fn apply_quality(&mut self) -> Result<(), ViewerError> {
        let Some(tier) = quality::latest(&self.quality_rx).or(self.pending_tier.take()) else {
            return Ok(());
        };
        self.selected_tier = Some(tier);
        let Some(mut gpu) = self.gpu.take() else {
            return Ok(());
        };

        let count = self.settings.field_config_with(self.selected_tier).particle_count;
        let result = if count != gpu.field.field().config().particle_count {
            gpu.field.dispose();
            self.build_field(&gpu.context, gpu.surface_config.format, tier, &gpu.window)
                .map(|field| gpu.field = field)
        } else {
            let size = gpu.window.inner_size();
            let inner = gpu.field.field_mut();
            inner.set_max_pixel_ratio(tier.max_pixel_ratio());
            inner.resize(size.width, size.height, gpu.window.scale_factor() as f32);
            Ok(())
        };
        gpu.tier = tier;
        self.gpu = Some(gpu);
        result
    }

    fn pick_attractor(&self) {
        let (Some(gpu), Some(cursor)) = (&self.gpu, self.cursor) else {
            return;
        };
        let viewport = Vec2::new(
            gpu.surface_config.width as f32,
            gpu.surface_config.height as f32,
        );
        if let Some(hit) = self.camera.pick_plane(cursor, viewport) {
            gpu.field.field().set_attractor_position(hit);
        }
    }

    fn handle_key(&mut self, event: &KeyEvent, event_loop: &ActiveEventLoop) {
        if event.state != ElementState::Pressed {
            return;
        }
        match &event.logical_key {
            Key::Named(NamedKey::Space) => self.time.toggle_pause(),
            Key::Named(NamedKey::Escape) => event_loop.exit(),
            Key::Character(c) => {
                let tier = c
                    .chars()
                    .next()
                    .and_then(|ch| ch.to_digit(10))
                    .and_then(QualityTier::from_digit);
                if let Some(tier) = tier {
                    if !self.quality.set(tier) && self.selected_tier.is_none() {
                        self.pending_tier = Some(tier);
                    }
                }
            }
            _ => {}
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        if size.width == 0 || size.height == 0 {
            return;
        }
        gpu.surface_config.width = size.width;
        gpu.surface_config.height = size.height;
        gpu.surface.configure(&gpu.context.device, &gpu.surface_config);
        gpu.depth = create_depth_texture(&gpu.context.device, size.width, size.height);
        gpu.field
            .field_mut()
            .resize(size.width, size.height, gpu.window.scale_factor() as f32);
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) -> Result<(), ViewerError> {
        self.apply_quality()?;
        let (elapsed, delta) = self.time.update();

        let Some(gpu) = &mut self.gpu else {
            return Ok(());
        };

        let aspect = gpu.surface_config.width as f32 / gpu.surface_config.height as f32;
        gpu.field
            .set_camera(self.camera.view_proj(aspect), self.camera.position());
        gpu.field.update(elapsed, delta, self.camera.distance)?;

        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.context.device, &gpu.surface_config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("surface out of memory");
                event_loop.exit();
                return Ok(());
            }
            Err(e) => {
                log::warn!("skipping frame: {e:?}");
                return Ok(());
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let background = gpu.field.field().visuals().background_color;
        let renderable = gpu.field.renderable()?;
        let mut encoder = gpu
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Particle Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: background.x as f64,
                            g: background.y as f64,
                            b: background.z as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &gpu.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            renderable.draw(&mut pass);
        }
        gpu.context.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        if self.time.frame() % 300 == 0 {
            log::debug!(
                "frame {} fps {:.1} tier {:?}",
                self.time.frame(),
                self.time.fps(),
                gpu.tier
            );
        }
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: ViewerError) {
        log::error!("{err}");
        self.error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match self.init(event_loop) {
            Ok(gpu) => {
                gpu.window.request_redraw();
                self.gpu = Some(gpu);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.field.dispose();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => self.resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.gpu.as_ref().map(|g| g.window.inner_size()) {
                    self.resize(size);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = state == ElementState::Pressed;
                match button {
                    MouseButton::Left => self.orbiting = pressed,
                    MouseButton::Right => {
                        self.attracting = pressed;
                        if pressed {
                            self.pick_attractor();
                        } else if let Some(gpu) = &self.gpu {
                            gpu.field.field().clear_attractor();
                        }
                    }
                    _ => {}
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let cursor = Vec2::new(position.x as f32, position.y as f32);
                if self.orbiting {
                    if let Some(last) = self.cursor {
                        let d = cursor - last;
                        self.camera.orbit(d.x, d.y);
                    }
                }
                self.cursor = Some(cursor);
                if self.attracting {
                    self.pick_attractor();
                }
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.02,
                };
                self.camera.zoom(scroll);
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(&event, event_loop),
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw(event_loop) {
                    self.fail(event_loop, err);
                    return;
                }
                if let Some(gpu) = &self.gpu {
                    gpu.window.request_redraw();
                }
            }
            _ => {}
        }
    }
}
