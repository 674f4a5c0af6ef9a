//! GPU meshes and the built-in shapes the demo draws.

use std::sync::Arc;

use glam::{Vec2, Vec3};
use tracing::debug;

use lumen_rhi::buffer::{Buffer, BufferUsage};
use lumen_rhi::command::CommandBuffer;
use lumen_rhi::device::Device;
use lumen_rhi::vertex::Vertex;
use lumen_rhi::{RhiError, RhiResult};

/// CPU-side geometry, ready to upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    /// Empty for non-indexed geometry.
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Unit cube centered at the origin, one color per face pair.
    pub fn cube() -> Self {
        // (normal, u, v, color)
        let faces = [
            (Vec3::X, Vec3::Z, Vec3::Y, Vec3::new(0.8, 0.8, 0.1)),
            (Vec3::NEG_X, Vec3::NEG_Z, Vec3::Y, Vec3::new(0.9, 0.9, 0.9)),
            (Vec3::Y, Vec3::X, Vec3::Z, Vec3::new(0.8, 0.1, 0.1)),
            (Vec3::NEG_Y, Vec3::NEG_X, Vec3::Z, Vec3::new(0.9, 0.6, 0.1)),
            (Vec3::Z, Vec3::NEG_X, Vec3::Y, Vec3::new(0.1, 0.1, 0.8)),
            (Vec3::NEG_Z, Vec3::X, Vec3::Y, Vec3::new(0.1, 0.8, 0.1)),
        ];

        let mut data = Self::default();
        for (normal, u, v, color) in faces {
            data.push_face(normal * 0.5, u * 0.5, v * 0.5, normal, color);
        }
        data
    }

    /// Square of side `size` in the XZ plane, facing up (-Y).
    pub fn quad(size: f32) -> Self {
        let mut data = Self::default();
        let half = size * 0.5;
        data.push_face(
            Vec3::ZERO,
            Vec3::X * half,
            Vec3::Z * half,
            Vec3::NEG_Y,
            Vec3::ONE,
        );
        data
    }

    /// Appends a quad centered at `center` spanning `center ± u ± v`.
    fn push_face(&mut self, center: Vec3, u: Vec3, v: Vec3, normal: Vec3, color: Vec3) {
        let base = self.vertices.len() as u32;
        let corners = [
            (-1.0, -1.0, Vec2::new(0.0, 0.0)),
            (1.0, -1.0, Vec2::new(1.0, 0.0)),
            (1.0, 1.0, Vec2::new(1.0, 1.0)),
            (-1.0, 1.0, Vec2::new(0.0, 1.0)),
        ];
        for (su, sv, uv) in corners {
            self.vertices
                .push(Vertex::new(center + u * su + v * sv, color, normal, uv));
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

/// Vertex buffer plus an optional index buffer.
pub struct Mesh {
    vertex_buffer: Buffer,
    vertex_count: u32,
    index_buffer: Option<Buffer>,
    index_count: u32,
}

impl Mesh {
    /// Uploads `data` into host-visible buffers.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::BufferError`] for fewer than three vertices, or any
    /// buffer creation error.
    pub fn new(device: Arc<Device>, data: &MeshData) -> RhiResult<Self> {
        if data.vertices.len() < 3 {
            return Err(RhiError::BufferError(format!(
                "Mesh needs at least 3 vertices, got {}",
                data.vertices.len()
            )));
        }

        let vertex_buffer = Buffer::new_with_data(
            device.clone(),
            BufferUsage::Vertex,
            bytemuck::cast_slice(&data.vertices),
        )?;

        let index_buffer = if data.indices.is_empty() {
            None
        } else {
            Some(Buffer::new_with_data(
                device,
                BufferUsage::Index,
                bytemuck::cast_slice(&data.indices),
            )?)
        };

        debug!(
            "Created mesh: {} vertices, {} indices",
            data.vertices.len(),
            data.indices.len()
        );

        Ok(Self {
            vertex_buffer,
            vertex_count: data.vertices.len() as u32,
            index_buffer,
            index_count: data.indices.len() as u32,
        })
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn bind(&self, command_buffer: &CommandBuffer) {
        command_buffer.bind_vertex_buffers(0, &[self.vertex_buffer.handle()], &[0]);
        if let Some(index_buffer) = &self.index_buffer {
            command_buffer.bind_index_buffer(index_buffer.handle(), 0);
        }
    }

    /// Draws the whole mesh. [`Mesh::bind`] must have been recorded first.
    pub fn draw(&self, command_buffer: &CommandBuffer) {
        if self.index_buffer.is_some() {
            command_buffer.draw_indexed(self.index_count, 1, 0, 0, 0);
        } else {
            command_buffer.draw(self.vertex_count, 1, 0, 0);
        }
    }
}
