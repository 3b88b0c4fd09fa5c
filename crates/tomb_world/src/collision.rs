//! Room collision mesh assembly.
//!
//! Two builds exist behind the `mesh-room-collision` cargo feature. The
//! default heightfield build reproduces the legacy game's collision exactly:
//! floor and ceiling surfaces come from sector corner heights (honoring
//! diagonal splits) and the gaps between neighboring sectors are closed with
//! tweens. The feature-gated build instead triangulates the room's rendered
//! geometry.

use crate::room::Room;
#[cfg(not(feature = "mesh-room-collision"))]
use crate::room::{DiagonalType, SECTOR_SIZE};
use crate::tween::{SectorTween, TweenShape};
use crate::warning::Warning;
use glam::Vec3;
#[cfg(not(feature = "mesh-room-collision"))]
use log::warn;

/// A plain indexed triangle soup in world space. Winding is outward: floor
/// triangles face up, ceiling triangles face down.
#[derive(Debug, Clone, Default)]
pub struct CollisionMesh {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl CollisionMesh {
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    fn push_triangle(&mut self, a: Vec3, b: Vec3, c: Vec3) {
        // Degenerate slivers would upset physics back ends downstream.
        if (b - a).cross(c - a).length_squared() < f32::EPSILON {
            return;
        }
        let base = self.vertices.len() as u32;
        self.vertices.extend([a, b, c]);
        self.triangles.push([base, base + 1, base + 2]);
    }

    fn push_quad(&mut self, corners: [Vec3; 4]) {
        self.push_triangle(corners[0], corners[1], corners[2]);
        self.push_triangle(corners[0], corners[2], corners[3]);
    }

    fn push_tween(&mut self, shape: TweenShape, corners: [Vec3; 4]) {
        match shape {
            TweenShape::None => {}
            // Near end matches; the patch collapses to the far-end triangle.
            TweenShape::TriangleRight => self.push_triangle(corners[0], corners[2], corners[3]),
            TweenShape::TriangleLeft => self.push_triangle(corners[0], corners[1], corners[3]),
            TweenShape::Quad => self.push_quad(corners),
            TweenShape::TwoTriangles => {
                self.push_triangle(corners[0], corners[1], corners[3]);
                self.push_triangle(corners[1], corners[2], corners[3]);
            }
        }
    }
}

/// Builds the room's collision mesh from its sector heightfield plus the
/// supplied tweens. Sectors for which no surface can be derived are reported
/// and left open.
#[cfg(not(feature = "mesh-room-collision"))]
pub fn build_room_collision(
    room: &Room,
    tweens: &[SectorTween],
    warnings: &mut Vec<Warning>,
) -> CollisionMesh {
    let mut mesh = CollisionMesh::default();

    for (index, sector) in room.sectors.iter().enumerate() {
        if sector.is_wall() {
            continue;
        }
        // A collapsed column has no surface to derive. Report it and leave
        // the cell open rather than emit coincident floor and ceiling.
        if sector.floor >= sector.ceiling {
            warn!(
                "room {} sector ({}, {}) yields no collision surface",
                room.id, sector.index_x, sector.index_z
            );
            warnings.push(Warning::GeometryDerivation {
                room: room.id,
                sector: index as u32,
            });
            continue;
        }

        let base = room.position
            + Vec3::new(
                (sector.index_x as i32 * SECTOR_SIZE) as f32,
                0.0,
                (sector.index_z as i32 * SECTOR_SIZE) as f32,
            );
        // Cell corners in grid order, matching the sector corner arrays.
        let at = |dx: i32, dz: i32, y: i32| {
            base + Vec3::new((dx * SECTOR_SIZE) as f32, y as f32, (dz * SECTOR_SIZE) as f32)
        };
        let floor = [
            at(0, 0, sector.floor_corners[0]),
            at(0, 1, sector.floor_corners[1]),
            at(1, 1, sector.floor_corners[2]),
            at(1, 0, sector.floor_corners[3]),
        ];
        let ceiling = [
            at(0, 0, sector.ceiling_corners[0]),
            at(0, 1, sector.ceiling_corners[1]),
            at(1, 1, sector.ceiling_corners[2]),
            at(1, 0, sector.ceiling_corners[3]),
        ];

        let before = mesh.triangles.len();
        push_surface(&mut mesh, floor, sector.floor_diagonal, false);
        // Ceiling winds the other way so its normal points down into the
        // room.
        push_surface(&mut mesh, ceiling, sector.ceiling_diagonal, true);

        if mesh.triangles.len() == before {
            warn!(
                "room {} sector ({}, {}) yields no collision surface",
                room.id, sector.index_x, sector.index_z
            );
            warnings.push(Warning::GeometryDerivation {
                room: room.id,
                sector: index as u32,
            });
        }
    }

    for tween in tweens {
        mesh.push_tween(tween.floor_shape, tween.floor_corners);
        mesh.push_tween(tween.ceiling_shape, tween.ceiling_corners);
    }

    mesh
}

#[cfg(not(feature = "mesh-room-collision"))]
fn push_surface(
    mesh: &mut CollisionMesh,
    corners: [Vec3; 4],
    diagonal: DiagonalType,
    flip: bool,
) {
    let c = if flip {
        [corners[3], corners[2], corners[1], corners[0]]
    } else {
        corners
    };
    match diagonal {
        // The split must follow the diagonal the floor data declared, or
        // collision would disagree with the rendered slope.
        DiagonalType::NorthEast => {
            mesh.push_triangle(c[0], c[1], c[2]);
            mesh.push_triangle(c[0], c[2], c[3]);
        }
        DiagonalType::None | DiagonalType::NorthWest => {
            mesh.push_triangle(c[0], c[1], c[3]);
            mesh.push_triangle(c[1], c[2], c[3]);
        }
    }
}

/// Builds the room's collision mesh directly from its rendered geometry.
/// Tweens are unnecessary here; the visual mesh already closes the gaps.
#[cfg(feature = "mesh-room-collision")]
pub fn build_room_collision(
    room: &Room,
    _tweens: &[SectorTween],
    warnings: &mut Vec<Warning>,
) -> CollisionMesh {
    let mut mesh = CollisionMesh::default();
    let position = |index: u16| room.position + room.mesh.vertices[index as usize].position;

    for face in &room.mesh.textured_faces {
        let count = if face.is_quad { 4 } else { 3 };
        if face.vertices[..count]
            .iter()
            .any(|&v| v as usize >= room.mesh.vertices.len())
        {
            continue;
        }
        let v = face.vertices;
        mesh.push_triangle(position(v[0]), position(v[1]), position(v[2]));
        if face.is_quad {
            mesh.push_triangle(position(v[0]), position(v[2]), position(v[3]));
        }
    }

    if mesh.is_empty() {
        for (index, sector) in room.sectors.iter().enumerate() {
            if !sector.is_wall() {
                warnings.push(Warning::GeometryDerivation {
                    room: room.id,
                    sector: index as u32,
                });
            }
        }
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::{PenetrationConfig, RoomSector};

    fn one_sector_room(floor: i32, ceiling: i32) -> Room {
        Room {
            num_x_sectors: 1,
            num_z_sectors: 1,
            sectors: vec![RoomSector {
                floor,
                ceiling,
                floor_corners: [floor; 4],
                ceiling_corners: [ceiling; 4],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[cfg(not(feature = "mesh-room-collision"))]
    #[test]
    pub fn flat_sector_builds_floor_and_ceiling() {
        let room = one_sector_room(0, 2048);
        let mut warnings = vec![];
        let mesh = build_room_collision(&room, &[], &mut warnings);

        // Two triangles each for floor and ceiling.
        assert_eq!(mesh.triangles.len(), 4);
        assert!(warnings.is_empty());

        // Floor triangles face up, ceiling triangles down.
        let normal = |t: &[u32; 3]| {
            let [a, b, c] = t.map(|i| mesh.vertices[i as usize]);
            (b - a).cross(c - a)
        };
        assert!(normal(&mesh.triangles[0]).y > 0.0);
        assert!(normal(&mesh.triangles[2]).y < 0.0);
    }

    #[cfg(not(feature = "mesh-room-collision"))]
    #[test]
    pub fn wall_sector_is_skipped_without_warning() {
        let mut room = one_sector_room(0, 2048);
        room.sectors[0].floor_penetration = PenetrationConfig::Wall;
        let mut warnings = vec![];
        let mesh = build_room_collision(&room, &[], &mut warnings);
        assert!(mesh.is_empty());
        assert!(warnings.is_empty());
    }

    #[cfg(not(feature = "mesh-room-collision"))]
    #[test]
    pub fn degenerate_sector_warns_once() {
        // Floor meets ceiling but the wall marker is absent; the surface
        // collapses and must be reported, not silently dropped.
        let mut room = one_sector_room(0, 0);
        room.sectors[0].below = Some(crate::room::SectorRef { room: 1, index: 0 });
        let mut warnings = vec![];
        build_room_collision(&room, &[], &mut warnings);
        assert_eq!(
            warnings,
            vec![Warning::GeometryDerivation { room: 0, sector: 0 }]
        );
    }
}
