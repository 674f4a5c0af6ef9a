//! Vertex layout shared by mesh buffers and the mesh pipeline.

use std::mem::offset_of;

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Mesh vertex.
///
/// # Shader Locations
///
/// - location 0: position (vec3)
/// - location 1: color (vec3)
/// - location 2: normal (vec3)
/// - location 3: uv (vec2)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub color: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    #[inline]
    pub const fn new(position: Vec3, color: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            color,
            normal,
            uv,
        }
    }

    /// Binding 0, advanced per vertex.
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: std::mem::size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 4] {
        let attribute = |location, format, offset: usize| vk::VertexInputAttributeDescription {
            binding: 0,
            location,
            format,
            offset: offset as u32,
        };

        [
            attribute(0, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, position)),
            attribute(1, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, color)),
            attribute(2, vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, normal)),
            attribute(3, vk::Format::R32G32_SFLOAT, offset_of!(Vertex, uv)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_size() {
        // 3 x Vec3 (12) + Vec2 (8)
        assert_eq!(std::mem::size_of::<Vertex>(), 44);
    }

    #[test]
    fn test_vertex_binding_description() {
        let binding = Vertex::binding_description();
        assert_eq!(binding.binding, 0);
        assert_eq!(binding.stride, 44);
        assert_eq!(binding.input_rate, vk::VertexInputRate::VERTEX);
    }

    #[test]
    fn test_vertex_attribute_descriptions() {
        let attrs = Vertex::attribute_descriptions();

        let locations: Vec<u32> = attrs.iter().map(|a| a.location).collect();
        assert_eq!(locations, vec![0, 1, 2, 3]);

        let offsets: Vec<u32> = attrs.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24, 36]);

        assert_eq!(attrs[3].format, vk::Format::R32G32_SFLOAT);
        assert!(attrs.iter().all(|a| a.binding == 0));
    }

    #[test]
    fn test_vertex_bytes_layout() {
        let vertex = Vertex::new(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::ONE,
            Vec3::Y,
            Vec2::new(0.5, 0.25),
        );
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&vertex));
        assert_eq!(floats.len(), 11);
        assert_eq!(&floats[..3], &[1.0, 2.0, 3.0]);
        assert_eq!(&floats[9..], &[0.5, 0.25]);
    }
}
