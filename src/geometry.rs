//! Static cube and pyramid geometry with flat per-triangle normals.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Vertices belonging to the cube (12 triangles).
pub const CUBE_VERTEX_COUNT: usize = 36;
/// Vertices belonging to the pyramid (4 triangles).
pub const PYRAMID_VERTEX_COUNT: usize = 12;
/// Every vertex emitted by the scene; one draw covers all of them.
pub const VERTEX_COUNT: usize = CUBE_VERTEX_COUNT + PYRAMID_VERTEX_COUNT;

/// Object-space positions, three per triangle.
///
/// The order is the one validated against the rasterizer and must not be
/// re-wound: culling is off, so the pyramid's mixed winding is never visible.
///
/// ```text
///          0        3
///       7        4 <-- top-right-near
/// bottom
/// left
/// far ---> 1        2
///       6        5
/// ```
#[rustfmt::skip]
pub const VERTEX_POSITIONS: [[f32; 3]; VERTEX_COUNT] = [
    // cube, back
    [-0.25, -0.25, -0.25], // 1
    [-0.25,  0.25, -0.25], // 0
    [ 0.25, -0.25, -0.25], // 2

    [ 0.25,  0.25, -0.25], // 3
    [ 0.25, -0.25, -0.25], // 2
    [-0.25,  0.25, -0.25], // 0

    // cube, right
    [ 0.25, -0.25, -0.25], // 2
    [ 0.25,  0.25, -0.25], // 3
    [ 0.25, -0.25,  0.25], // 5

    [ 0.25,  0.25,  0.25], // 4
    [ 0.25, -0.25,  0.25], // 5
    [ 0.25,  0.25, -0.25], // 3

    // cube, front
    [ 0.25, -0.25,  0.25], // 5
    [ 0.25,  0.25,  0.25], // 4
    [-0.25, -0.25,  0.25], // 6

    [-0.25,  0.25,  0.25], // 7
    [-0.25, -0.25,  0.25], // 6
    [ 0.25,  0.25,  0.25], // 4

    // cube, left
    [-0.25, -0.25,  0.25], // 6
    [-0.25,  0.25,  0.25], // 7
    [-0.25, -0.25, -0.25], // 1

    [-0.25,  0.25, -0.25], // 0
    [-0.25, -0.25, -0.25], // 1
    [-0.25,  0.25,  0.25], // 7

    // cube, bottom
    [ 0.25, -0.25, -0.25], // 2
    [ 0.25, -0.25,  0.25], // 5
    [-0.25, -0.25, -0.25], // 1

    [-0.25, -0.25,  0.25], // 6
    [-0.25, -0.25, -0.25], // 1
    [ 0.25, -0.25,  0.25], // 5

    // cube, top
    [ 0.25,  0.25,  0.25], // 4
    [ 0.25,  0.25, -0.25], // 3
    [-0.25,  0.25,  0.25], // 7

    [-0.25,  0.25, -0.25], // 0
    [-0.25,  0.25,  0.25], // 7
    [ 0.25,  0.25, -0.25], // 3

    // pyramid, base
    [0.75, -0.25, -0.25], // 1
    [0.50, -0.25,  0.25], // 2
    [1.00, -0.25,  0.25], // 3

    // pyramid, faces towards apex A
    [0.75, -0.25, -0.25], // 1
    [0.50, -0.25,  0.25], // 2
    [0.75,  0.25,  0.00], // A

    [0.75, -0.25, -0.25], // 1
    [1.00, -0.25,  0.25], // 3
    [0.75,  0.25,  0.00], // A

    [0.50, -0.25,  0.25], // 2
    [1.00, -0.25,  0.25], // 3
    [0.75,  0.25,  0.00], // A
];

/// Interleaved vertex fed to attribute locations 0 (position) and 1 (normal).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Unnormalized face normal of triangle `abc`: `(b - a) x (c - a)`.
///
/// Collinear points produce the zero vector.
pub fn flat_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a)
}

/// Computes one normal per vertex, replicating each triangle's face normal
/// into its three slots. A trailing partial triangle is ignored.
pub fn flat_normals(positions: &[[f32; 3]]) -> Vec<[f32; 3]> {
    let mut normals = Vec::with_capacity(positions.len());
    for triangle in positions.chunks_exact(3) {
        let normal = flat_normal(
            Vec3::from_array(triangle[0]),
            Vec3::from_array(triangle[1]),
            Vec3::from_array(triangle[2]),
        )
        .to_array();
        normals.extend_from_slice(&[normal; 3]);
    }
    normals
}

/// Builds the static vertex buffer contents for the whole scene.
pub fn scene_vertices() -> Vec<Vertex> {
    VERTEX_POSITIONS
        .iter()
        .zip(flat_normals(&VERTEX_POSITIONS))
        .map(|(position, normal)| Vertex {
            position: *position,
            normal,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_covers_cube_and_pyramid() {
        let vertices = scene_vertices();
        assert_eq!(vertices.len(), 48);
        assert_eq!(flat_normals(&VERTEX_POSITIONS).len() / 3, 16);
        assert_eq!(VERTEX_POSITIONS.len() * 3, 144);
    }

    #[test]
    fn normals_are_replicated_cross_products() {
        let vertices = scene_vertices();
        for triangle in vertices.chunks_exact(3) {
            let a = Vec3::from_array(triangle[0].position);
            let b = Vec3::from_array(triangle[1].position);
            let c = Vec3::from_array(triangle[2].position);
            let expected = (b - a).cross(c - a).to_array();
            for vertex in triangle {
                assert_eq!(vertex.normal, expected);
            }
        }
    }

    #[test]
    fn cube_normals_point_outward() {
        let normals = flat_normals(&VERTEX_POSITIONS[..CUBE_VERTEX_COUNT]);
        for (triangle, normal) in VERTEX_POSITIONS[..CUBE_VERTEX_COUNT]
            .chunks_exact(3)
            .zip(normals.chunks_exact(3))
        {
            let centroid = triangle
                .iter()
                .map(|p| Vec3::from_array(*p))
                .sum::<Vec3>()
                / 3.0;
            let normal = Vec3::from_array(normal[0]);
            assert!(normal.dot(centroid) > 0.0, "inward normal {normal:?}");
        }
    }

    #[test]
    fn first_face_normal_faces_negative_z() {
        let normals = flat_normals(&VERTEX_POSITIONS);
        assert_eq!(normals[0], [0.0, 0.0, -0.25]);
    }

    #[test]
    fn degenerate_triangle_yields_zero() {
        let normal = flat_normal(Vec3::ZERO, Vec3::X, Vec3::X * 2.0);
        assert_eq!(normal, Vec3::ZERO);
    }

    #[test]
    fn partial_triangle_is_ignored() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [5.0, 5.0, 5.0]];
        let normals = flat_normals(&positions);
        assert_eq!(normals, vec![[0.0, 0.0, 1.0]; 3]);
    }
}
