//! The finished world model.

use crate::{
    entity::{Entity, StaticMeshDef},
    mesh::BaseMesh,
    room::{Room, RoomSector, SectorRef},
    skeleton::SkeletalModel,
};
use glam::Vec3;
use std::collections::BTreeMap;
use tomb_level::LevelFormat;

/// Model id the format reserves for the skybox, when the generation has one.
pub fn skybox_model_id(format: LevelFormat) -> Option<u32> {
    match format {
        LevelFormat::Tr1 | LevelFormat::Tr1Ub => None,
        LevelFormat::Tr2 => Some(254),
        LevelFormat::Tr3 => Some(355),
        LevelFormat::Tr4 => Some(459),
        LevelFormat::Tr5 => Some(454),
    }
}

/// One page of texture data, already unified to 32-bit ARGB across the
/// generations.
#[derive(Debug, Clone)]
pub struct TexturePage {
    pub pixels: Vec<u32>,
}

#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Vec3,
    pub room: i16,
    pub flags: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct SoundSource {
    pub position: Vec3,
    pub sound_id: u16,
    pub flags: u16,
}

/// Pathfinding box with sector-unit bounds.
#[derive(Debug, Clone, Copy)]
pub struct PathBox {
    pub x_min: i32,
    pub x_max: i32,
    pub z_min: i32,
    pub z_max: i32,
    pub true_floor: i32,
    pub overlap_index: u16,
}

#[derive(Debug, Clone)]
pub struct AudioSample {
    pub data: Vec<u8>,
}

/// Contiguous run of sprites forming one animated billboard.
#[derive(Debug, Clone, Copy)]
pub struct SpriteSequence {
    pub length: u16,
    /// First sprite of the run in [`World::sprites`].
    pub offset: u16,
}

/// Sprite appearance: an atlas region with world-space extents.
#[derive(Debug, Clone, Copy)]
pub struct Sprite {
    pub tile: u16,
    pub x: u8,
    pub y: u8,
    pub width: u16,
    pub height: u16,
    pub left: i16,
    pub top: i16,
    pub right: i16,
    pub bottom: i16,
}

/// Everything a loaded level owns. Built in one pass by [`crate::build`],
/// then handed to the rendering/physics/audio collaborators whole; no one
/// observes it half-constructed.
///
/// Dense tables are plain vectors indexed by file order; sparse id-keyed
/// tables (models, entities, static mesh defs) are ordered maps for id
/// lookup.
#[derive(Debug, Clone, Default)]
pub struct World {
    pub rooms: Vec<Room>,
    pub meshes: Vec<BaseMesh>,

    pub skeletal_models: BTreeMap<u32, SkeletalModel>,
    pub static_mesh_defs: BTreeMap<u32, StaticMeshDef>,
    pub entities: BTreeMap<u32, Entity>,

    pub texture_pages: Vec<TexturePage>,
    /// Atlas regions faces index by texture id.
    pub object_textures: Vec<tomb_level::data::RawObjectTexture>,
    /// Raw animated texture sequence stream, consumed by the renderer.
    pub animated_textures: Vec<u16>,
    pub sprites: Vec<Sprite>,
    pub sprite_sequences: BTreeMap<i32, SpriteSequence>,

    pub cameras: Vec<Camera>,
    pub flyby_cameras: Vec<tomb_level::data::RawFlybyCamera>,
    pub sound_sources: Vec<SoundSource>,
    /// TR4+ AI placement hints, kept raw for the pathfinding collaborator.
    pub ai_objects: Vec<tomb_level::data::RawAiObject>,

    pub boxes: Vec<PathBox>,
    pub overlaps: Vec<u16>,
    pub zones: Vec<i16>,

    pub samples: Vec<AudioSample>,
    pub soundmap: Vec<i16>,
    pub sound_details: Vec<tomb_level::data::RawSoundDetails>,
    pub sample_indices: Vec<u32>,

    /// Raw floor data block, kept for gameplay-time trigger re-evaluation.
    pub floor_data: Vec<u16>,
    /// Shared animation frame stream referenced by the skeletal models.
    pub frames: Vec<u16>,

    /// Id of the skybox model, when the level carries one.
    pub skybox: Option<u32>,
}

impl World {
    pub fn room(&self, id: u16) -> Option<&Room> {
        self.rooms.get(id as usize)
    }

    pub fn sector(&self, link: SectorRef) -> Option<&RoomSector> {
        self.rooms
            .get(link.room as usize)?
            .sectors
            .get(link.index as usize)
    }

    pub fn entity(&self, id: u32) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Swaps the active side of every room in the flip group. Group 0 means
    /// "all rooms with an alternate", matching the first generations which
    /// had a single global flip state.
    pub fn set_flip(&mut self, group: u8, flipped: bool) {
        for id in 0..self.rooms.len() {
            let room = &self.rooms[id];
            if group != 0 && room.alternate_group != group {
                continue;
            }
            let Some(alternate) = room.alternate_room else { continue };
            self.rooms[id].active = !flipped;
            if let Some(other) = self.rooms.get_mut(alternate as usize) {
                other.active = flipped;
            }
        }
    }

    /// Marks base rooms active and their alternates dormant, and checks the
    /// above/below link symmetry. Runs once as the final build stage.
    pub fn fix_rooms(&mut self) {
        // Activate everything first; alternates usually sit at higher indices
        // than their bases, so deactivation has to be its own pass.
        for room in &mut self.rooms {
            room.active = true;
        }
        for id in 0..self.rooms.len() {
            if let Some(alternate) = self.rooms[id].alternate_room {
                if let Some(other) = self.rooms.get_mut(alternate as usize) {
                    other.base_room = Some(id as u16);
                    other.active = false;
                }
            }
        }

        #[cfg(debug_assertions)]
        self.assert_link_symmetry();
    }

    #[cfg(debug_assertions)]
    fn assert_link_symmetry(&self) {
        for room in &self.rooms {
            for (index, sector) in room.sectors.iter().enumerate() {
                let here = SectorRef {
                    room: room.id,
                    index: index as u32,
                };
                if let Some(above) = sector.above.and_then(|l| self.sector(l)) {
                    debug_assert_eq!(
                        above.below,
                        Some(here),
                        "asymmetric above link from room {} sector {}",
                        room.id,
                        index
                    );
                }
                if let Some(below) = sector.below.and_then(|l| self.sector(l)) {
                    debug_assert_eq!(
                        below.above,
                        Some(here),
                        "asymmetric below link from room {} sector {}",
                        room.id,
                        index
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with_flip_pair() -> World {
        let mut world = World::default();
        world.rooms.push(Room {
            id: 0,
            alternate_room: Some(1),
            alternate_group: 2,
            ..Default::default()
        });
        world.rooms.push(Room {
            id: 1,
            ..Default::default()
        });
        world.fix_rooms();
        world
    }

    #[test]
    pub fn fix_rooms_activates_base_side() {
        let world = world_with_flip_pair();
        assert!(world.rooms[0].active);
        assert!(!world.rooms[1].active);
        assert_eq!(world.rooms[1].base_room, Some(0));
    }

    #[test]
    pub fn flip_swaps_and_restores() {
        let mut world = world_with_flip_pair();
        world.set_flip(2, true);
        assert!(!world.rooms[0].active);
        assert!(world.rooms[1].active);

        // An unrelated group must not touch the pair.
        world.set_flip(3, false);
        assert!(!world.rooms[0].active);

        world.set_flip(0, false);
        assert!(world.rooms[0].active);
        assert!(!world.rooms[1].active);
    }
}
