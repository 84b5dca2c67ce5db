//! Procedural meshes for the demo scene

use void_engine::prelude::{MeshData, Vertex};

/// One cube face: outward normal, two in-plane axes and a flat color
struct Face {
    normal: [f32; 3],
    u: [f32; 3],
    v: [f32; 3],
    color: [f32; 3],
}

const CUBE_FACES: [Face; 6] = [
    Face { normal: [-1.0, 0.0, 0.0], u: [0.0, 0.0, 1.0], v: [0.0, 1.0, 0.0], color: [0.9, 0.9, 0.9] },
    Face { normal: [1.0, 0.0, 0.0], u: [0.0, 1.0, 0.0], v: [0.0, 0.0, 1.0], color: [0.8, 0.8, 0.1] },
    Face { normal: [0.0, -1.0, 0.0], u: [1.0, 0.0, 0.0], v: [0.0, 0.0, 1.0], color: [0.9, 0.6, 0.1] },
    Face { normal: [0.0, 1.0, 0.0], u: [0.0, 0.0, 1.0], v: [1.0, 0.0, 0.0], color: [0.8, 0.1, 0.1] },
    Face { normal: [0.0, 0.0, 1.0], u: [1.0, 0.0, 0.0], v: [0.0, 1.0, 0.0], color: [0.1, 0.1, 0.8] },
    Face { normal: [0.0, 0.0, -1.0], u: [0.0, 1.0, 0.0], v: [1.0, 0.0, 0.0], color: [0.1, 0.8, 0.1] },
];

fn corner(face: &Face, su: f32, sv: f32) -> [f32; 3] {
    std::array::from_fn(|i| 0.5 * (face.normal[i] + su * face.u[i] + sv * face.v[i]))
}

/// Unit cube centred on the origin, 24 vertices with per-face normals
pub fn cube() -> MeshData {
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for face in &CUBE_FACES {
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            vertices.push(Vertex::new(corner(face, su, sv), face.color, face.normal));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    MeshData::indexed(vertices, indices)
}

/// Unit quad in the XZ plane facing -Y, drawn without an index buffer
pub fn quad() -> MeshData {
    let color = [0.35, 0.35, 0.4];
    let normal = [0.0, -1.0, 0.0];
    let corners = [[-0.5, 0.0, -0.5], [0.5, 0.0, -0.5], [0.5, 0.0, 0.5], [-0.5, 0.0, 0.5]];

    let vertices = [0, 1, 2, 2, 3, 0]
        .iter()
        .map(|&i| Vertex::new(corners[i], color, normal))
        .collect();

    MeshData::non_indexed(vertices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_four_vertices_per_face() {
        let cube = cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
    }

    #[test]
    fn cube_corners_lie_on_their_face() {
        for face in &CUBE_FACES {
            let position = corner(face, 1.0, -1.0);
            let along_normal: f32 = position.iter().zip(face.normal).map(|(p, n)| p * n).sum();
            assert!((along_normal - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn quad_is_two_triangles() {
        let quad = quad();
        assert_eq!(quad.vertices.len(), 6);
        assert!(quad.indices.is_empty());
    }
}
