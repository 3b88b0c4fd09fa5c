//! Sector tween derivation.
//!
//! A tween is the vertical patch closing the height gap along one shared
//! grid edge. Tweens are computed per room, handed straight to the collision
//! builder, and never stored in the world model.

use crate::room::{Room, RoomSector, SECTOR_SIZE};
use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweenShape {
    /// Heights match on both ends; nothing to emit.
    None,
    /// Only the far end of the edge differs.
    TriangleRight,
    /// Only the near end of the edge differs.
    TriangleLeft,
    /// Both ends differ toward the same side.
    Quad,
    /// Ends differ toward opposite sides; two triangles avoid a twisted
    /// quad.
    TwoTriangles,
}

/// Connector geometry for one edge. Corner order: near end at this room's
/// height, near end at the neighbor's height, far end at the neighbor's
/// height, far end at this room's height.
#[derive(Debug, Clone, Copy)]
pub struct SectorTween {
    pub floor_shape: TweenShape,
    pub floor_corners: [Vec3; 4],
    pub ceiling_shape: TweenShape,
    pub ceiling_corners: [Vec3; 4],
}

/// Classifies one edge from the two height pairs. `a` is this sector's edge,
/// `b` the neighbor's; index 0 is the near end.
pub fn classify(a: [i32; 2], b: [i32; 2]) -> TweenShape {
    let near = a[0] - b[0];
    let far = a[1] - b[1];
    match (near == 0, far == 0) {
        (true, true) => TweenShape::None,
        (true, false) => TweenShape::TriangleRight,
        (false, true) => TweenShape::TriangleLeft,
        (false, false) => {
            if near.signum() == far.signum() {
                TweenShape::Quad
            } else {
                TweenShape::TwoTriangles
            }
        }
    }
}

fn edge_tween(
    near: Vec3,
    far: Vec3,
    a_floor: [i32; 2],
    b_floor: [i32; 2],
    a_ceiling: [i32; 2],
    b_ceiling: [i32; 2],
) -> SectorTween {
    let at = |p: Vec3, y: i32| Vec3::new(p.x, y as f32, p.z);
    SectorTween {
        floor_shape: classify(a_floor, b_floor),
        floor_corners: [
            at(near, a_floor[0]),
            at(near, b_floor[0]),
            at(far, b_floor[1]),
            at(far, a_floor[1]),
        ],
        ceiling_shape: classify(a_ceiling, b_ceiling),
        ceiling_corners: [
            at(near, a_ceiling[0]),
            at(near, b_ceiling[0]),
            at(far, b_ceiling[1]),
            at(far, a_ceiling[1]),
        ],
    }
}

/// Follows a sector's horizontal portal into the adjoining room and returns
/// the sector covering the same world column. Border sectors only mirror the
/// neighbor room; their real heights live past the hop.
fn through_portal<'a>(rooms: &'a [Room], room: &Room, sector: &'a RoomSector) -> &'a RoomSector {
    let Some(to) = sector.portal_to_room else {
        return sector;
    };
    let Some(other) = rooms.get(to as usize) else {
        return sector;
    };
    let x = (room.position.x as i32 - other.position.x as i32) / SECTOR_SIZE
        + sector.index_x as i32;
    let z = (room.position.z as i32 - other.position.z as i32) / SECTOR_SIZE
        + sector.index_z as i32;
    if x < 0 || z < 0 {
        return sector;
    }
    other.sector(x as u16, z as u16).unwrap_or(sector)
}

/// Generates tweens for every interior edge of the room's grid. Sectors are
/// resolved through horizontal portals first, so edges along a room border
/// classify against the adjoining room's real heights. Edges touching a
/// wall-classified sector are skipped entirely.
pub fn gen_room_tweens<'a>(room: &'a Room, rooms: &'a [Room]) -> Vec<SectorTween> {
    let mut tweens = vec![];

    let corner = |x: u16, z: u16| {
        room.position
            + Vec3::new(
                (x as i32 * SECTOR_SIZE) as f32,
                0.0,
                (z as i32 * SECTOR_SIZE) as f32,
            )
    };

    for x in 0..room.num_x_sectors {
        for z in 0..room.num_z_sectors {
            let Some(current) = room.sector(x, z) else { continue };
            let current = through_portal(rooms, room, current);
            if current.is_wall() {
                continue;
            }

            // Edge toward +x: shared corners run from (x+1, z) to (x+1, z+1).
            if let Some(neighbor) = room.sector(x + 1, z) {
                let neighbor = through_portal(rooms, room, neighbor);
                if !neighbor.is_wall() {
                    tweens.push(edge_tween(
                        corner(x + 1, z),
                        corner(x + 1, z + 1),
                        current.floor_edge_x(),
                        [neighbor.floor_corners[0], neighbor.floor_corners[1]],
                        current.ceiling_edge_x(),
                        [neighbor.ceiling_corners[0], neighbor.ceiling_corners[1]],
                    ));
                }
            }

            // Edge toward +z: shared corners run from (x, z+1) to (x+1, z+1).
            if let Some(neighbor) = room.sector(x, z + 1) {
                let neighbor = through_portal(rooms, room, neighbor);
                if !neighbor.is_wall() {
                    tweens.push(edge_tween(
                        corner(x, z + 1),
                        corner(x + 1, z + 1),
                        current.floor_edge_z(),
                        [neighbor.floor_corners[0], neighbor.floor_corners[3]],
                        current.ceiling_edge_z(),
                        [neighbor.ceiling_corners[0], neighbor.ceiling_corners[3]],
                    ));
                }
            }
        }
    }

    tweens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::RoomSector;

    fn flat_room(heights: [[i32; 4]; 4]) -> Room {
        // 2x2 grid; heights indexed [x * 2 + z].
        let sectors = heights
            .iter()
            .map(|&floor_corners| RoomSector {
                floor: *floor_corners.iter().max().unwrap(),
                ceiling: 4096,
                floor_corners,
                ceiling_corners: [4096; 4],
                ..Default::default()
            })
            .collect();
        Room {
            num_x_sectors: 2,
            num_z_sectors: 2,
            sectors,
            ..Default::default()
        }
    }

    #[test]
    pub fn equal_heights_make_no_tweens() {
        let room = flat_room([[0; 4]; 4]);
        let tweens = gen_room_tweens(&room, &[]);
        assert!(tweens
            .iter()
            .all(|t| t.floor_shape == TweenShape::None
                && t.ceiling_shape == TweenShape::None));
    }

    #[test]
    pub fn one_differing_corner_makes_a_triangle() {
        assert_eq!(classify([0, 256], [0, 0]), TweenShape::TriangleRight);
        // Seen from the other sector the same edge mirrors, it must not
        // degenerate into a quad.
        assert_eq!(classify([0, 0], [0, 256]), TweenShape::TriangleRight);
        assert_eq!(classify([256, 0], [0, 0]), TweenShape::TriangleLeft);
    }

    #[test]
    pub fn four_differing_corners_never_make_a_triangle() {
        assert_eq!(classify([256, 256], [0, 0]), TweenShape::Quad);
        assert_eq!(classify([256, -256], [0, 0]), TweenShape::TwoTriangles);
        assert_eq!(classify([-512, 768], [0, 0]), TweenShape::TwoTriangles);
    }

    #[test]
    pub fn wall_sectors_contribute_no_tweens() {
        use crate::room::PenetrationConfig;
        let mut room = flat_room([[0; 4], [0; 4], [-512; 4], [0; 4]]);
        // Mark sector (1, 0) as a wall; its three edges must all vanish.
        room.sectors[2].floor_penetration = PenetrationConfig::Wall;
        let with_wall = gen_room_tweens(&room, &[]).len();

        let room = flat_room([[0; 4], [0; 4], [-512; 4], [0; 4]]);
        let without_wall = gen_room_tweens(&room, &[]).len();
        assert_eq!(without_wall - with_wall, 2);
    }

    #[test]
    pub fn portal_edge_uses_the_adjoining_rooms_heights() {
        fn index_sectors(room: &mut Room) {
            for (i, sector) in room.sectors.iter_mut().enumerate() {
                sector.index_x = (i / 2) as u16;
                sector.index_z = (i % 2) as u16;
            }
        }

        // Room 0's +x border column is a portal into room 1, whose real
        // sectors sit one step lower. The border edge must classify against
        // room 1's heights, not the border sector's own copies.
        let mut near = flat_room([[0; 4]; 4]);
        index_sectors(&mut near);
        near.sectors[2].portal_to_room = Some(1);
        near.sectors[3].portal_to_room = Some(1);

        let mut far = flat_room([[-256; 4]; 4]);
        far.id = 1;
        far.position = Vec3::new(SECTOR_SIZE as f32, 0.0, 0.0);
        index_sectors(&mut far);

        let rooms = vec![near, far];
        let tweens = gen_room_tweens(&rooms[0], &rooms);

        let quads: Vec<_> = tweens
            .iter()
            .filter(|t| t.floor_shape == TweenShape::Quad)
            .collect();
        assert_eq!(quads.len(), 2);
        assert_eq!(quads[0].floor_corners[1].y, -256.0);
        assert!(tweens.iter().all(|t| t.ceiling_shape == TweenShape::None));
    }
}
