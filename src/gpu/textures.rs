//! Device-resident ping-pong grids.

use glam::Vec4;
use wgpu::util::DeviceExt;

use super::STATE_FORMAT;
use crate::error::GpuError;
use crate::state::{ParticleState, PingPong};

const TEXEL_BYTES: u32 = 16;

/// One `N×N` state texture and its full view.
pub struct GridTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl GridTexture {
    fn new(device: &wgpu::Device, queue: &wgpu::Queue, label: &str, side: u32, data: &[u8]) -> Self {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: side,
                    height: side,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: STATE_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::STORAGE_BINDING
                    | wgpu::TextureUsages::COPY_SRC
                    | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// The four grid instances: position+lifetime and velocity, twice each.
pub struct StateTextures {
    pub position: PingPong<GridTexture>,
    pub velocity: PingPong<GridTexture>,
    side: u32,
}

impl StateTextures {
    /// Upload the seeded host grids into both slots of each pair.
    pub fn upload(device: &wgpu::Device, queue: &wgpu::Queue, state: &ParticleState) -> Self {
        let side = state.layout().side();
        let positions = state.position_bytes();
        let velocities = state.velocity_bytes();
        Self {
            position: PingPong::new(
                GridTexture::new(device, queue, "Position Grid A", side, positions),
                GridTexture::new(device, queue, "Position Grid B", side, positions),
            ),
            velocity: PingPong::new(
                GridTexture::new(device, queue, "Velocity Grid A", side, velocities),
                GridTexture::new(device, queue, "Velocity Grid B", side, velocities),
            ),
            side,
        }
    }

    #[inline]
    pub fn side(&self) -> u32 {
        self.side
    }

    pub fn destroy(&self) {
        for i in 0..2 {
            self.position.slot(i).texture.destroy();
            self.velocity.slot(i).texture.destroy();
        }
    }
}

/// Copy a grid texture back to host memory. Blocks until the copy is done.
pub fn read_grid(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    grid: &GridTexture,
    side: u32,
) -> Result<Vec<Vec4>, GpuError> {
    let unpadded = side * TEXEL_BYTES;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded = unpadded.div_ceil(align) * align;

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Grid Readback Buffer"),
        size: (padded * side) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Grid Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: &grid.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(side),
            },
        },
        wgpu::Extent3d {
            width: side,
            height: side,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (sender, receiver) = crossbeam_channel::bounded(1);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device.poll(wgpu::Maintain::Wait);
    receiver
        .recv()
        .map_err(|e| GpuError::BufferMapping(e.to_string()))?
        .map_err(|e| GpuError::BufferMapping(e.to_string()))?;

    let mut texels = Vec::with_capacity((side * side) as usize);
    {
        let data = slice.get_mapped_range();
        for row in data.chunks_exact(padded as usize) {
            texels.extend(
                row[..unpadded as usize]
                    .chunks_exact(TEXEL_BYTES as usize)
                    .map(|t| Vec4::from_array(bytemuck::pod_read_unaligned(t))),
            );
        }
    }
    staging.unmap();
    Ok(texels)
}
