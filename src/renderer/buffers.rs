use std::collections::HashMap;

use crate::math::FLOATS_PER_VERTEX;
use crate::scene::{SurfaceId, SurfaceRegistry};

/// Interleaved position + color, matching [`FLOATS_PER_VERTEX`].
pub fn interleaved_layout() -> wgpu::VertexBufferLayout<'static> {
    const STRIDE: usize = FLOATS_PER_VERTEX * std::mem::size_of::<f32>();
    wgpu::VertexBufferLayout {
        array_stride: STRIDE as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    }
}

/// A GPU buffer that is written in place while its size holds and replaced
/// when it changes.
pub struct SizedBuffer {
    pub buffer: wgpu::Buffer,
    /// Element count (floats or indices) last written.
    pub len: u32,
}

impl SizedBuffer {
    fn write(
        slot: &mut Option<Self>,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        usage: wgpu::BufferUsages,
        bytes: &[u8],
        len: usize,
    ) {
        let size = bytes.len() as wgpu::BufferAddress;
        let reuse = slot.as_ref().is_some_and(|b| b.buffer.size() == size);
        if !reuse {
            if let Some(old) = slot.take() {
                old.buffer.destroy();
            }
            log::debug!("allocating {label}: {size} bytes");
            *slot = Some(Self {
                buffer: device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(label),
                    size,
                    usage: usage | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                }),
                len: 0,
            });
        }
        if let Some(b) = slot.as_mut() {
            queue.write_buffer(&b.buffer, 0, bytes);
            b.len = len as u32;
        }
    }
}

/// GPU mirror of the registry: one vertex buffer per surface plus the shared
/// triangle and wireframe index buffers.
#[derive(Default)]
pub struct SceneBuffers {
    surfaces: HashMap<SurfaceId, Option<SizedBuffer>>,
    triangles: Option<SizedBuffer>,
    lines: Option<SizedBuffer>,
}

impl SceneBuffers {
    pub fn vertices(&self, id: SurfaceId) -> Option<&SizedBuffer> {
        self.surfaces.get(&id).and_then(Option::as_ref)
    }

    pub fn triangles(&self) -> Option<&SizedBuffer> {
        self.triangles.as_ref()
    }

    pub fn lines(&self) -> Option<&SizedBuffer> {
        self.lines.as_ref()
    }

    /// Drains the registry's pending work: releases buffers of removed
    /// surfaces, then re-uploads the shared indices and every dirty surface.
    pub fn sync(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        registry: &mut SurfaceRegistry,
    ) {
        let pending = registry.take_pending();
        if pending.is_empty() {
            return;
        }

        for id in &pending.released {
            if let Some(Some(old)) = self.surfaces.remove(id) {
                old.buffer.destroy();
                log::debug!("released vertex buffer of surface {id}");
            }
        }

        if pending.indices {
            let indices = registry.indices();
            SizedBuffer::write(
                &mut self.triangles,
                device,
                queue,
                "Shared Triangle Index Buffer",
                wgpu::BufferUsages::INDEX,
                bytemuck::cast_slice(&indices.triangles),
                indices.triangles.len(),
            );
            SizedBuffer::write(
                &mut self.lines,
                device,
                queue,
                "Shared Wireframe Index Buffer",
                wgpu::BufferUsages::INDEX,
                bytemuck::cast_slice(&indices.lines),
                indices.lines.len(),
            );
        }

        for id in &pending.surfaces {
            let Some(surface) = registry.get(*id) else {
                continue;
            };
            let slot = self.surfaces.entry(*id).or_default();
            SizedBuffer::write(
                slot,
                device,
                queue,
                "Surface Vertex Buffer",
                wgpu::BufferUsages::VERTEX,
                bytemuck::cast_slice(&surface.vertices),
                surface.vertices.len(),
            );
        }

        log::debug!(
            "synced {} surface(s), indices {}",
            pending.surfaces.len(),
            if pending.indices { "rebuilt" } else { "kept" }
        );
    }
}
