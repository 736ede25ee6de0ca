//! CPU-side mesh representation used by loaders.

use bytemuck::{Pod, Zeroable};

/// Vertex with position and normal, in object space. `Pod` so the whole
/// vertex array can be uploaded to a GPU buffer without copying: stride is
/// 24 bytes, position at offset 0, normal at offset 12.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, normal }
    }
}

/// Non-indexed triangle list: three consecutive vertices per triangle, in
/// face emission order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
}

impl MeshData {
    pub fn new(vertices: Vec<MeshVertex>) -> Self {
        Self { vertices }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns `true` if the mesh holds at least one whole triangle.
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty() && self.vertices.len() % 3 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_data_validity() {
        let tri = vec![MeshVertex::default(); 3];
        assert!(MeshData::new(tri).is_valid());
        assert!(!MeshData::default().is_valid());
        assert!(!MeshData::new(vec![MeshVertex::default(); 4]).is_valid());
    }

    #[test]
    fn vertex_layout_matches_gpu_contract() {
        assert_eq!(std::mem::size_of::<MeshVertex>(), 24);
        assert_eq!(std::mem::offset_of!(MeshVertex, position), 0);
        assert_eq!(std::mem::offset_of!(MeshVertex, normal), 12);
    }
}
