//! Compute pipelines for the velocity and position passes.

use std::sync::Arc;

use glam::Vec4;
use wgpu::util::DeviceExt;

use super::textures::{read_grid, StateTextures};
use super::{GpuContext, STATE_FORMAT};
use crate::config::FieldConfig;
use crate::error::{FieldError, GpuError};
use crate::kernels::{position, velocity, WORKGROUP_SIZE};
use crate::scheduler::{Pass, SimulationBackend};
use crate::state::ParticleState;
use crate::uniforms::SimUniforms;

/// Bind groups for every `[position read slot][velocity read slot]` pair.
type BindGroupGrid = [[wgpu::BindGroup; 2]; 2];

struct Resources {
    textures: StateTextures,
    velocity_groups: BindGroupGrid,
    position_groups: BindGroupGrid,
}

/// Runs both kernels on the device.
pub struct GpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    uniform_buffer: wgpu::Buffer,
    velocity_pipeline: wgpu::ComputePipeline,
    position_pipeline: wgpu::ComputePipeline,
    resources: Option<Resources>,
    side: u32,
    workgroups: u32,
}

impl GpuBackend {
    /// Seed the grids, upload them and build both pipelines.
    ///
    /// Nothing is returned unless every resource was created and both
    /// kernels passed validation.
    pub fn new(ctx: &GpuContext, config: &FieldConfig) -> Result<Self, FieldError> {
        let state = ParticleState::seeded(config)?;
        let side = state.layout().side();
        ctx.check_state_support(side)?;

        let device = &ctx.device;
        let textures = StateTextures::upload(device, &ctx.queue, &state);

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sim Uniform Buffer"),
            contents: bytemuck::bytes_of(&SimUniforms {
                side,
                ..bytemuck::Zeroable::zeroed()
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let layout = create_kernel_layout(device);
        let velocity_pipeline =
            build_kernel(device, &layout, "velocity kernel", &velocity::shader_source())?;
        let position_pipeline =
            build_kernel(device, &layout, "position kernel", &position::shader_source())?;

        let velocity_groups = std::array::from_fn(|p| {
            std::array::from_fn(|v| {
                kernel_bind_group(
                    device,
                    &layout,
                    "Velocity Bind Group",
                    &uniform_buffer,
                    &textures.position.slot(p).view,
                    &textures.velocity.slot(v).view,
                    &textures.velocity.slot(1 - v).view,
                )
            })
        });
        let position_groups = std::array::from_fn(|p| {
            std::array::from_fn(|v| {
                kernel_bind_group(
                    device,
                    &layout,
                    "Position Bind Group",
                    &uniform_buffer,
                    &textures.position.slot(p).view,
                    &textures.velocity.slot(v).view,
                    &textures.position.slot(1 - p).view,
                )
            })
        });

        log::info!(
            "gpu backend ready: {}×{} grid, {} workgroups per axis",
            side,
            side,
            side.div_ceil(WORKGROUP_SIZE)
        );

        Ok(Self {
            device: Arc::clone(&ctx.device),
            queue: Arc::clone(&ctx.queue),
            uniform_buffer,
            velocity_pipeline,
            position_pipeline,
            resources: Some(Resources {
                textures,
                velocity_groups,
                position_groups,
            }),
            side,
            workgroups: side.div_ceil(WORKGROUP_SIZE),
        })
    }

    /// State textures, or `None` once released.
    pub fn textures(&self) -> Option<&StateTextures> {
        self.resources.as_ref().map(|r| &r.textures)
    }

    #[inline]
    pub fn side(&self) -> u32 {
        self.side
    }

    /// Copy the latest position grid back to the host.
    pub fn read_positions(&self) -> Result<Vec<Vec4>, FieldError> {
        let textures = self.textures().ok_or(FieldError::Disposed)?;
        Ok(read_grid(&self.device, &self.queue, textures.position.read(), self.side)?)
    }

    /// Copy the latest velocity grid back to the host.
    pub fn read_velocities(&self) -> Result<Vec<Vec4>, FieldError> {
        let textures = self.textures().ok_or(FieldError::Disposed)?;
        Ok(read_grid(&self.device, &self.queue, textures.velocity.read(), self.side)?)
    }
}

impl SimulationBackend for GpuBackend {
    fn run_pass(&mut self, pass: Pass, uniforms: &SimUniforms) -> Result<(), FieldError> {
        let resources = self.resources.as_ref().ok_or(FieldError::Disposed)?;
        let p = resources.textures.position.read_index();
        let v = resources.textures.velocity.read_index();
        let (pipeline, bind_group) = match pass {
            Pass::Velocity => (&self.velocity_pipeline, &resources.velocity_groups[p][v]),
            Pass::Position => (&self.position_pipeline, &resources.position_groups[p][v]),
        };

        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(pass.label()),
            });
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(pass.label()),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(pipeline);
            compute_pass.set_bind_group(0, bind_group, &[]);
            compute_pass.dispatch_workgroups(self.workgroups, self.workgroups, 1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn swap(&mut self, pass: Pass) {
        if let Some(resources) = self.resources.as_mut() {
            match pass {
                Pass::Velocity => resources.textures.velocity.swap(),
                Pass::Position => resources.textures.position.swap(),
            }
        }
    }

    fn position_read_index(&self) -> usize {
        self.textures().map_or(0, |t| t.position.read_index())
    }

    fn velocity_read_index(&self) -> usize {
        self.textures().map_or(0, |t| t.velocity.read_index())
    }

    fn release(&mut self) {
        if let Some(resources) = self.resources.take() {
            resources.textures.destroy();
        }
    }
}

fn create_kernel_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let sampled = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    };

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Kernel Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            sampled(1),
            sampled(2),
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: STATE_FORMAT,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
        ],
    })
}

fn kernel_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    label: &str,
    uniforms: &wgpu::Buffer,
    position_in: &wgpu::TextureView,
    velocity_in: &wgpu::TextureView,
    output: &wgpu::TextureView,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(position_in),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(velocity_in),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(output),
            },
        ],
    })
}

/// Compile `source` and build its pipeline inside a validation error scope.
fn build_kernel(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    stage: &'static str,
    source: &str,
) -> Result<wgpu::ComputePipeline, GpuError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(stage),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(stage),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });
    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(stage),
        layout: Some(&pipeline_layout),
        module: &shader,
        entry_point: Some("main"),
        compilation_options: Default::default(),
        cache: None,
    });

    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        log::error!("{stage} failed validation: {error}");
        return Err(GpuError::KernelBuild {
            stage,
            message: error.to_string(),
        });
    }
    Ok(pipeline)
}
