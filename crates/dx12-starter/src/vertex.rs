//! Vertex format and the demo cube.

use std::mem::{offset_of, size_of};

use glam::{Vec2, Vec3};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub uv: Vec2,
    pub normal: Vec3,
}

/// One element of the input layout, in a form both the pipeline and the
/// tests can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub semantic: &'static str,
    pub offset: u32,
    /// Number of 32-bit float components.
    pub components: u32,
}

impl Vertex {
    pub const STRIDE: u32 = size_of::<Self>() as u32;

    /// Offsets come from the struct, so the layout cannot drift from it.
    pub const LAYOUT: [VertexAttribute; 3] = [
        VertexAttribute {
            semantic: "POSITION",
            offset: offset_of!(Vertex, position) as u32,
            components: 3,
        },
        VertexAttribute {
            semantic: "TEXCOORD",
            offset: offset_of!(Vertex, uv) as u32,
            components: 2,
        },
        VertexAttribute {
            semantic: "NORMAL",
            offset: offset_of!(Vertex, normal) as u32,
            components: 3,
        },
    ];
}

pub const CUBE_VERTEX_COUNT: usize = 36;

/// Unit cube centred at the origin, two triangles per face, clockwise
/// front faces.
pub fn cube_vertices() -> [Vertex; CUBE_VERTEX_COUNT] {
    const NORMALS: [Vec3; 6] = [
        Vec3::X,
        Vec3::NEG_X,
        Vec3::Y,
        Vec3::NEG_Y,
        Vec3::Z,
        Vec3::NEG_Z,
    ];
    const CORNERS: [(f32, f32); 6] = [
        (-1.0, -1.0),
        (-1.0, 1.0),
        (1.0, 1.0),
        (-1.0, -1.0),
        (1.0, 1.0),
        (1.0, -1.0),
    ];

    let mut vertices = [Vertex {
        position: Vec3::ZERO,
        uv: Vec2::ZERO,
        normal: Vec3::ZERO,
    }; CUBE_VERTEX_COUNT];

    for (face, normal) in NORMALS.iter().enumerate() {
        let v = if normal.y != 0.0 { Vec3::Z } else { Vec3::Y };
        let u = normal.cross(v);
        for (corner, &(a, b)) in CORNERS.iter().enumerate() {
            vertices[face * 6 + corner] = Vertex {
                position: (*normal + a * u + b * v) * 0.5,
                uv: Vec2::new((a + 1.0) * 0.5, (1.0 - b) * 0.5),
                normal: *normal,
            };
        }
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_the_struct() {
        assert_eq!(Vertex::STRIDE, 32);
        let offsets: Vec<u32> = Vertex::LAYOUT.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 20]);
        let bytes: u32 = Vertex::LAYOUT.iter().map(|a| a.components * 4).sum();
        assert_eq!(bytes, Vertex::STRIDE);
    }

    #[test]
    fn cube_faces_point_outwards() {
        let cube = cube_vertices();
        for tri in cube.chunks(3) {
            let n = tri[0].normal;
            assert!((n.length() - 1.0).abs() < 1e-6);
            assert!(tri.iter().all(|v| v.normal == n));
            assert!(tri.iter().all(|v| (v.position.dot(n) - 0.5).abs() < 1e-6));
            assert!(tri.iter().all(|v| v.position.abs().max_element() <= 0.5 + 1e-6));

            // clockwise seen from outside, as in a left-handed view
            let face = (tri[1].position - tri[0].position).cross(tri[2].position - tri[0].position);
            assert!(face.dot(n) > 0.0);
        }
    }

    #[test]
    fn uvs_stay_in_the_unit_square() {
        for v in cube_vertices() {
            assert!((0.0..=1.0).contains(&v.uv.x));
            assert!((0.0..=1.0).contains(&v.uv.y));
        }
    }
}
