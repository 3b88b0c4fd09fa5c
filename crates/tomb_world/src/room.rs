//! Rooms and their sector grids.

use crate::mesh::BaseMesh;
use crate::{collision::CollisionMesh, entity::StaticMesh};
use bitflags::bitflags;
use glam::Vec3;

/// One quantized height step, in world units.
pub const METERING_STEP: i32 = 256;
/// Horizontal side length of one sector, in world units.
pub const SECTOR_SIZE: i32 = 1024;
/// Floor height marking an impassable column (the raw i8 wall marker 0x81
/// scaled by [`METERING_STEP`]).
pub const WALL_HEIGHT: i32 = 32512;

/// How a sector's floor or ceiling surface interacts with collision probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PenetrationConfig {
    /// Ordinary solid surface.
    #[default]
    Solid,
    /// Diagonal-split sector where only the first triangle half carries a
    /// vertical portal.
    DoorVerticalA,
    /// As above, portal under the second triangle half.
    DoorVerticalB,
    /// Impassable column; contributes neither collision nor tweens.
    Wall,
    /// Fully open vertical portal; probes fall through to the linked sector.
    Ghost,
}

/// Diagonal split orientation of a triangulated sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagonalType {
    #[default]
    None,
    /// Split runs from the south-west to the north-east corner.
    NorthEast,
    /// Split runs from the south-east to the north-west corner.
    NorthWest,
}

bitflags! {
    /// Per-sector behavior flags derived from floor data.
    #[derive(Default)]
    pub struct SectorFlags: u16 {
        const CLIMB_NORTH = 1 << 0;
        const CLIMB_EAST = 1 << 1;
        const CLIMB_SOUTH = 1 << 2;
        const CLIMB_WEST = 1 << 3;
        const DEATH = 1 << 4;
        const MONKEYSWING = 1 << 5;
        const MINECART_LEFT = 1 << 6;
        const MINECART_RIGHT = 1 << 7;
    }
}

bitflags! {
    /// Room-level flags carried over from the file.
    #[derive(Default)]
    pub struct RoomFlags: u16 {
        const WATER = 1 << 0;
        const QUICKSAND = 1 << 7;
        const SKYBOX = 1 << 3;
    }
}

/// Non-owning link to a sector in another room's grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorRef {
    pub room: u16,
    pub index: u32,
}

/// One trigger action decoded from floor data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAction {
    Object { id: u16 },
    Camera { id: u16, timer: u8, once: bool, zoom: bool },
    UnderwaterCurrent { id: u16 },
    FlipMap { group: u16 },
    FlipOn { group: u16 },
    FlipOff { group: u16 },
    LookAt { id: u16 },
    EndLevel { to: u16 },
    PlayTrack { track: u16 },
    FlipEffect { effect: u16 },
    Secret { id: u16 },
    ClearBodies,
    Flyby { sequence: u16, once: bool },
    Cutscene { id: u16 },
}

/// One trigger with its activation condition and action list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Trigger {
    /// Raw sub-function of the trigger record (on-activate, on-pad, switch,
    /// key, pickup, heavy, ...). Interpreted by gameplay, kept verbatim here.
    pub kind: u8,
    pub timer: i8,
    pub one_shot: bool,
    pub mask: u8,
    pub actions: Vec<TriggerAction>,
}

/// One grid cell of a room.
///
/// Heights are world-space Y, positive up; corner arrays are ordered
/// `[(x0,z0), (x0,z1), (x1,z1), (x1,z0)]` counterclockwise seen from above.
/// The base `floor` is the highest floor corner, the base `ceiling` the
/// lowest ceiling corner.
#[derive(Debug, Clone, Default)]
pub struct RoomSector {
    pub index_x: u16,
    pub index_z: u16,
    /// World-space center of the cell at base floor height.
    pub position: Vec3,

    pub floor: i32,
    pub ceiling: i32,
    pub floor_corners: [i32; 4],
    pub ceiling_corners: [i32; 4],

    pub floor_penetration: PenetrationConfig,
    pub ceiling_penetration: PenetrationConfig,
    pub floor_diagonal: DiagonalType,
    pub ceiling_diagonal: DiagonalType,

    pub flags: SectorFlags,
    pub triggers: Vec<Trigger>,
    /// Horizontal portal target set by floor data, for pathfinding.
    pub portal_to_room: Option<u16>,

    pub fd_index: u16,
    pub box_index: Option<u16>,

    pub owner_room: u16,
    pub above: Option<SectorRef>,
    pub below: Option<SectorRef>,
}

impl RoomSector {
    /// Impassable columns take no part in collision or tween generation.
    pub fn is_wall(&self) -> bool {
        self.floor_penetration == PenetrationConfig::Wall
            || (self.floor >= self.ceiling && self.below.is_none())
    }

    /// Floor corner heights of the cell edge facing `+x`, then the edge
    /// facing `+z`, used when pairing with grid neighbors.
    pub fn floor_edge_x(&self) -> [i32; 2] {
        [self.floor_corners[3], self.floor_corners[2]]
    }

    pub fn floor_edge_z(&self) -> [i32; 2] {
        [self.floor_corners[1], self.floor_corners[2]]
    }

    pub fn ceiling_edge_x(&self) -> [i32; 2] {
        [self.ceiling_corners[3], self.ceiling_corners[2]]
    }

    pub fn ceiling_edge_z(&self) -> [i32; 2] {
        [self.ceiling_corners[1], self.ceiling_corners[2]]
    }
}

/// Visibility portal between two rooms.
#[derive(Debug, Clone)]
pub struct Portal {
    pub to_room: u16,
    pub normal: Vec3,
    pub vertices: [Vec3; 4],
}

/// Sprite placement inside a room.
#[derive(Debug, Clone, Copy)]
pub struct RoomSprite {
    pub position: Vec3,
    pub sprite: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct Light {
    pub position: Vec3,
}

#[derive(Debug, Clone, Default)]
pub struct Room {
    pub id: u16,
    /// World-space origin of the sector grid (corner of sector (0,0)).
    pub position: Vec3,
    pub y_top: i32,
    pub y_bottom: i32,

    pub mesh: BaseMesh,
    pub sprites: Vec<RoomSprite>,
    pub lights: Vec<Light>,

    pub num_x_sectors: u16,
    pub num_z_sectors: u16,
    pub sectors: Vec<RoomSector>,

    pub portals: Vec<Portal>,
    /// Deduplicated portal targets.
    pub adjacent_rooms: Vec<u16>,

    pub static_meshes: Vec<StaticMesh>,
    /// Ids of entities placed in this room.
    pub entities: Vec<u32>,

    pub flags: RoomFlags,
    pub ambient_intensity: i16,

    pub alternate_room: Option<u16>,
    pub base_room: Option<u16>,
    pub alternate_group: u8,
    /// Cleared while the flip group shows the alternate version.
    pub active: bool,

    pub collision: Option<CollisionMesh>,
}

impl Room {
    /// Grid storage order: `x * num_z + z`, matching the file layout.
    pub fn sector_index(&self, x: u16, z: u16) -> Option<usize> {
        (x < self.num_x_sectors && z < self.num_z_sectors)
            .then(|| x as usize * self.num_z_sectors as usize + z as usize)
    }

    pub fn sector(&self, x: u16, z: u16) -> Option<&RoomSector> {
        self.sector_index(x, z).map(|i| &self.sectors[i])
    }

    /// Looks up the sector containing the world-space position, if it lies
    /// inside this room's grid.
    pub fn sector_at(&self, x: f32, z: f32) -> Option<&RoomSector> {
        let dx = ((x - self.position.x) as i32) / SECTOR_SIZE;
        let dz = ((z - self.position.z) as i32) / SECTOR_SIZE;
        if dx < 0 || dz < 0 {
            return None;
        }
        self.sector(dx as u16, dz as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn sector_grid_indexing() {
        let room = Room {
            num_x_sectors: 3,
            num_z_sectors: 2,
            sectors: (0..6).map(|_| RoomSector::default()).collect(),
            ..Default::default()
        };
        assert_eq!(room.sector_index(0, 0), Some(0));
        assert_eq!(room.sector_index(1, 0), Some(2));
        assert_eq!(room.sector_index(2, 1), Some(5));
        assert_eq!(room.sector_index(3, 0), None);
        assert_eq!(room.sector_index(0, 2), None);
    }

    #[test]
    pub fn wall_classification() {
        let mut sector = RoomSector {
            floor: 0,
            ceiling: 2048,
            ..Default::default()
        };
        assert!(!sector.is_wall());
        sector.floor_penetration = PenetrationConfig::Wall;
        assert!(sector.is_wall());
    }
}
