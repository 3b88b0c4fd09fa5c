//! World model construction on top of [`tomb_level`]'s decoder.
//!
//! The crate turns the decoder's intermediate representation into a fully
//! resolved world: owned rooms with derived sector attributes, collision
//! meshes, skeletal models, entities, and the supporting audio/camera/box
//! tables. The whole build is single threaded and staged; see [`build`]'s
//! module docs for the stage ordering.
//!
//! Fatal decode problems surface as [`LoadError`]. Everything recoverable
//! (dangling indices, unknown floor data functions, underivable sector
//! geometry) is collected as [`Warning`]s that accompany a successful load.

mod build;

pub mod collision;
pub mod entity;
pub mod floordata;
pub mod mesh;
pub mod room;
pub mod skeleton;
pub mod tween;
pub mod warning;
pub mod world;

pub use tomb_level::{LevelFormat, LoadError};
pub use warning::Warning;
pub use world::World;

use entity::ScriptLookup;
use std::path::Path;
use tomb_level::LevelData;

/// Collaborator hooks threaded through a load. Both are optional; a default
/// value loads the level with no script metadata and no progress reporting.
#[derive(Default)]
pub struct LoadParams<'a> {
    /// Queried once per entity type during base item generation.
    pub script: Option<&'a dyn ScriptLookup>,
    /// Receives coarse progress in permille (0..=1000) between build stages.
    pub progress: Option<&'a dyn Fn(u16)>,
}

/// A successfully loaded level and everything noteworthy about the load.
pub struct LoadedLevel {
    pub format: LevelFormat,
    pub world: World,
    pub warnings: Vec<Warning>,
}

/// Loads and builds the level file at `path`. On error nothing is returned;
/// the caller keeps whatever world it had.
pub fn load_level(path: &Path, params: &LoadParams) -> Result<LoadedLevel, LoadError> {
    let (format, data) = tomb_level::read_level_file(path)?;
    let (world, warnings) = build::build_world(format, &data, params);
    Ok(LoadedLevel {
        format,
        world,
        warnings,
    })
}

/// Builds a world from an already-decoded level. Split out of [`load_level`]
/// so callers holding synthetic or cached level data skip the file stage.
pub fn gen_world(
    format: LevelFormat,
    data: &LevelData,
    params: &LoadParams,
) -> (World, Vec<Warning>) {
    build::build_world(format, data, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use room::PenetrationConfig;
    use std::io::Cursor;
    use tomb_level::data::{RawEntity, RawSector, NO_ROOM};
    use tomb_utils::PackedWriteExt;

    #[test]
    pub fn dangling_model_drops_entity_with_one_warning() {
        let mut data = LevelData::default();
        data.rooms.push(Default::default());
        data.entities.push(RawEntity {
            type_id: 7,
            room: 0,
            ..Default::default()
        });

        let (world, warnings) = gen_world(LevelFormat::Tr1, &data, &LoadParams::default());
        assert!(world.entities.is_empty());
        assert_eq!(
            warnings,
            vec![Warning::DanglingReference {
                kind: "skeletal model",
                index: 7
            }]
        );
    }

    #[test]
    pub fn script_lookup_attaches_base_items() {
        struct OnlySevens;
        impl ScriptLookup for OnlySevens {
            fn behavior(&self, type_id: i16) -> Option<entity::BehaviorDescriptor> {
                (type_id == 7).then(|| entity::BehaviorDescriptor {
                    name: "medipack".into(),
                    pickup: true,
                    hit_points: 0,
                })
            }
        }

        let mut data = LevelData::default();
        data.rooms.push(Default::default());
        data.models.push(tomb_level::data::RawModel {
            id: 7,
            num_meshes: 0,
            starting_mesh: 0,
            mesh_tree_index: 0,
            frame_offset: 0,
            animation_index: u16::MAX,
        });
        data.entities.push(RawEntity {
            type_id: 7,
            room: 0,
            ..Default::default()
        });

        let params = LoadParams {
            script: Some(&OnlySevens),
            ..Default::default()
        };
        let (world, warnings) = gen_world(LevelFormat::Tr1, &data, &params);
        assert!(warnings.is_empty());
        let item = world.entity(0).unwrap().base_item.as_ref().unwrap();
        assert_eq!(item.behavior.name, "medipack");
    }

    #[test]
    pub fn progress_reaches_one_thousand() {
        let reports = std::cell::RefCell::new(vec![]);
        let sink = |permille: u16| reports.borrow_mut().push(permille);
        let params = LoadParams {
            progress: Some(&sink),
            ..Default::default()
        };

        gen_world(LevelFormat::Tr1, &LevelData::default(), &params);
        let reports = reports.into_inner();
        assert!(reports.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(reports.last(), Some(&1000));
    }

    /// Serializes a complete first-generation level: one 2x2 room with a
    /// wall column at sector (0, 0), every other section empty.
    fn synthetic_tr1_level() -> Vec<u8> {
        let mut b: Vec<u8> = vec![];
        b.write_packed(0x20u32).unwrap(); // version
        b.write_packed(0u32).unwrap(); // texture pages
        b.write_packed(0u32).unwrap(); // file info

        b.write_packed(1u16).unwrap(); // rooms
        b.write_packed([0i32, 0, 0, -2048]).unwrap(); // x, z, y bottom, y top
        b.write_packed(8u32).unwrap(); // data words
        b.write_packed([0u16; 4]).unwrap(); // vertices/quads/tris/sprites
        b.write_packed([0u16, 0, 0, 0]).unwrap(); // padding to 8 words
        b.write_packed(0u16).unwrap(); // portals
        b.write_packed([2u16, 2]).unwrap(); // z sectors, x sectors
        for i in 0..4u8 {
            b.write_packed(RawSector {
                fd_index: 0,
                box_index: u16::MAX,
                room_below: NO_ROOM,
                floor: if i == 0 { -127 } else { 0 },
                room_above: NO_ROOM,
                ceiling: if i == 0 { -127 } else { -8 },
            })
            .unwrap();
        }
        b.write_packed(0x1FFFi16).unwrap(); // ambient
        b.write_packed([0u16; 2]).unwrap(); // lights, static meshes
        b.write_packed(-1i16).unwrap(); // alternate room
        b.write_packed(0u16).unwrap(); // flags

        b.write_packed(0u32).unwrap(); // floor data
        b.write_packed([0u32, 0]).unwrap(); // mesh data, mesh pointers
        for _ in 0..6 {
            // animations through frames
            b.write_packed(0u32).unwrap();
        }
        b.write_packed([0u32, 0, 0]).unwrap(); // models, statics, object textures
        b.write_packed([0u32, 0]).unwrap(); // sprite textures, sequences
        b.write_packed([0u32, 0]).unwrap(); // cameras, sound sources
        b.write_packed([0u32, 0]).unwrap(); // boxes, overlaps
        b.write_packed(0u32).unwrap(); // animated textures
        b.write_packed(0u32).unwrap(); // entities
        b.extend_from_slice(&[0u8; 32 * 256]); // lightmap
        b.extend_from_slice(&[0u8; 768]); // palette
        b.write_packed(0u16).unwrap(); // cinematic frames
        b.write_packed(0u16).unwrap(); // demo data
        b.write_packed([0i16; 256]).unwrap(); // sound map
        b.write_packed(0u32).unwrap(); // sound details
        b.write_packed(0u32).unwrap(); // samples
        b.write_packed(0u32).unwrap(); // sample indices
        b
    }

    #[test]
    pub fn synthetic_level_end_to_end() {
        let bytes = synthetic_tr1_level();
        let data =
            tomb_level::decode::read_level(&mut Cursor::new(bytes), LevelFormat::Tr1).unwrap();
        let (world, warnings) = gen_world(LevelFormat::Tr1, &data, &LoadParams::default());

        assert!(warnings.is_empty());
        assert_eq!(world.rooms.len(), 1);
        let room = &world.rooms[0];
        assert!(room.active);

        let wall = room.sector(0, 0).unwrap();
        assert!(wall.is_wall());
        assert_eq!(wall.floor_penetration, PenetrationConfig::Wall);
        assert_eq!(wall.floor, room::WALL_HEIGHT);

        for (x, z) in [(0, 1), (1, 0), (1, 1)] {
            let sector = room.sector(x, z).unwrap();
            assert!(!sector.is_wall());
            assert_eq!(sector.floor, 0);
            assert_eq!(sector.ceiling, 2048);
        }

        // The three open sectors sit at identical heights, so every tween
        // between them is degenerate; the wall contributes none at all.
        let tweens = tween::gen_room_tweens(room, &world.rooms);
        assert!(tweens.iter().all(|t| {
            t.floor_shape == tween::TweenShape::None
                && t.ceiling_shape == tween::TweenShape::None
        }));

        // Collision exists for the three open sectors only.
        let collision = room.collision.as_ref().unwrap();
        assert_eq!(collision.triangles.len(), 3 * 4);
    }
}
