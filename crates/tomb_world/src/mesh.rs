//! Mesh buffers of the finished world.

use glam::Vec3;
use tomb_level::data::{RawMesh, RawRoom};

#[derive(Debug, Clone, Copy, Default)]
pub struct MeshVertex {
    pub position: Vec3,
    pub normal: Vec3,
    /// Baked vertex light, 0 = full bright.
    pub shade: i16,
}

#[derive(Debug, Clone, Copy)]
pub struct TexturedFace {
    pub vertices: [u16; 4],
    /// Index into the object texture table; triangles leave slot 3 unused.
    pub texture: u16,
    pub is_quad: bool,
    /// Raw TR4+ shine/translucency bits.
    pub effects: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct ColoredFace {
    pub vertices: [u16; 4],
    /// Palette index.
    pub color: u16,
    pub is_quad: bool,
}

/// A renderable and (optionally) collidable triangle mesh, either a room's
/// geometry or one joint of a skeletal model.
#[derive(Debug, Clone, Default)]
pub struct BaseMesh {
    pub center: Vec3,
    pub collision_radius: f32,
    pub vertices: Vec<MeshVertex>,
    pub textured_faces: Vec<TexturedFace>,
    pub colored_faces: Vec<ColoredFace>,
}

impl BaseMesh {
    /// Converts one record pulled from the level's mesh buffer. Positions
    /// flip from the file's Y-down convention to Y-up.
    pub fn from_raw(raw: &RawMesh) -> Self {
        let vertices = raw
            .vertices
            .iter()
            .enumerate()
            .map(|(i, &[x, y, z])| MeshVertex {
                position: flip_y(x, y, z),
                normal: raw
                    .normals
                    .get(i)
                    .map(|&[nx, ny, nz]| flip_y(nx, ny, nz).normalize_or_zero())
                    .unwrap_or(Vec3::ZERO),
                shade: raw.lights.get(i).copied().unwrap_or(0),
            })
            .collect();

        let mut mesh = BaseMesh {
            center: flip_y(raw.center[0], raw.center[1], raw.center[2]),
            collision_radius: raw.collision_radius as f32,
            vertices,
            ..Default::default()
        };
        for face in &raw.textured_quads {
            mesh.textured_faces.push(textured(face.vertices, face.texture, true, face.effects));
        }
        for face in &raw.textured_tris {
            let vertices = [face.vertices[0], face.vertices[1], face.vertices[2], 0];
            mesh.textured_faces.push(textured(vertices, face.texture, false, face.effects));
        }
        for face in &raw.colored_quads {
            mesh.colored_faces.push(colored(face.vertices, face.texture, true));
        }
        for face in &raw.colored_tris {
            let vertices = [face.vertices[0], face.vertices[1], face.vertices[2], 0];
            mesh.colored_faces.push(colored(vertices, face.texture, false));
        }
        mesh
    }

    /// Builds a room's geometry buffer. Vertices stay relative to the room
    /// origin; the room's position places them in the world.
    pub fn from_room(raw: &RawRoom) -> Self {
        let vertices = raw
            .vertices
            .iter()
            .map(|v| MeshVertex {
                position: flip_y(v.x, v.y, v.z),
                normal: Vec3::ZERO,
                shade: v.lighting,
            })
            .collect();

        let mut mesh = BaseMesh {
            vertices,
            ..Default::default()
        };
        for face in &raw.quads {
            mesh.textured_faces.push(textured(face.vertices, face.texture, true, face.effects));
        }
        for face in &raw.tris {
            let vertices = [face.vertices[0], face.vertices[1], face.vertices[2], 0];
            mesh.textured_faces.push(textured(vertices, face.texture, false, face.effects));
        }
        mesh
    }

    /// Largest vertex index any face uses, for cross-reference validation.
    pub fn max_face_index(&self) -> Option<u16> {
        let textured = self.textured_faces.iter().flat_map(|f| {
            f.vertices[..if f.is_quad { 4 } else { 3 }].iter().copied()
        });
        let colored = self.colored_faces.iter().flat_map(|f| {
            f.vertices[..if f.is_quad { 4 } else { 3 }].iter().copied()
        });
        textured.chain(colored).max()
    }
}

fn flip_y<T: Into<f32>>(x: T, y: T, z: T) -> Vec3 {
    Vec3::new(x.into(), -y.into(), z.into())
}

fn textured(vertices: [u16; 4], texture: u16, is_quad: bool, effects: u16) -> TexturedFace {
    TexturedFace {
        vertices,
        texture,
        is_quad,
        effects,
    }
}

fn colored(vertices: [u16; 4], color: u16, is_quad: bool) -> ColoredFace {
    ColoredFace {
        vertices,
        color,
        is_quad,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tomb_level::data::RawFace3;

    #[test]
    pub fn raw_mesh_conversion_flips_y() {
        let raw = RawMesh {
            center: [0, 512, 0],
            collision_radius: 300,
            vertices: vec![[100, 200, 300]],
            lights: vec![42],
            textured_tris: vec![RawFace3 {
                vertices: [0, 0, 0],
                texture: 5,
                effects: 0,
            }],
            ..Default::default()
        };
        let mesh = BaseMesh::from_raw(&raw);
        assert_eq!(mesh.center.y, -512.0);
        assert_eq!(mesh.vertices[0].position, Vec3::new(100.0, -200.0, 300.0));
        assert_eq!(mesh.vertices[0].shade, 42);
        assert_eq!(mesh.textured_faces.len(), 1);
        assert!(!mesh.textured_faces[0].is_quad);
    }

    #[test]
    pub fn face_index_bound() {
        let mesh = BaseMesh {
            textured_faces: vec![TexturedFace {
                vertices: [0, 7, 2, 9999],
                texture: 0,
                is_quad: false,
                effects: 0,
            }],
            ..Default::default()
        };
        // Slot 3 of a triangle is padding and must not count.
        assert_eq!(mesh.max_face_index(), Some(7));
    }
}
