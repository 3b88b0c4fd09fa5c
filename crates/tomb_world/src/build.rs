//! The staged world build pipeline.
//!
//! Stages run strictly in dependency order; each one only consumes objects
//! the previous stages resolved. Cross-reference failures drop the referring
//! object with a [`Warning::DanglingReference`] and the build carries on,
//! since shipped levels are known to contain stray indices.

use crate::{
    collision::build_room_collision,
    entity::{angle_from_raw, BaseItem, Entity, StaticMesh, StaticMeshDef},
    floordata::translate_floor_data,
    mesh::BaseMesh,
    room::{
        Light, PenetrationConfig, Portal, Room, RoomFlags, RoomSector, RoomSprite, SectorRef,
        METERING_STEP, SECTOR_SIZE,
    },
    skeleton::{
        decode_anim_commands, Animation, MeshTreeNode, SkeletalModel, StateChange, StateDispatch,
    },
    tween::gen_room_tweens,
    warning::Warning,
    world::{
        skybox_model_id, AudioSample, Camera, PathBox, SoundSource, Sprite, SpriteSequence,
        TexturePage, World,
    },
    LoadParams,
};
use glam::{IVec3, Vec3};
use log::{debug, warn};
use tomb_level::{
    data::{LevelData, RawRoom, NO_ROOM},
    LevelFormat,
};

pub(crate) fn build_world(
    format: LevelFormat,
    data: &LevelData,
    params: &LoadParams,
) -> (World, Vec<Warning>) {
    let mut builder = Builder {
        data,
        format,
        params,
        world: World::default(),
        warnings: vec![],
    };

    builder.gen_textures();
    builder.progress(100);
    builder.gen_meshes();
    builder.progress(200);
    builder.gen_skeletal_models();
    builder.progress(350);
    builder.gen_rooms();
    builder.progress(500);
    builder.gen_room_properties();
    builder.progress(600);
    builder.gen_boxes();
    builder.gen_cameras();
    builder.progress(700);
    builder.gen_entities();
    builder.progress(800);
    builder.gen_sprites();
    builder.gen_samples();
    builder.progress(900);
    builder.gen_base_items();
    builder.gen_room_collision();
    builder.world.fix_rooms();
    builder.progress(1000);

    (builder.world, builder.warnings)
}

struct Builder<'a> {
    data: &'a LevelData,
    format: LevelFormat,
    params: &'a LoadParams<'a>,
    world: World,
    warnings: Vec<Warning>,
}

impl Builder<'_> {
    fn progress(&self, permille: u16) {
        if let Some(sink) = self.params.progress {
            sink(permille);
        }
    }

    fn dangling(&mut self, kind: &'static str, index: u32) {
        warn!("dangling {kind} reference {index}, dropping the referring object");
        self.warnings.push(Warning::DanglingReference { kind, index });
    }

    /// Unifies the per-generation page encodings into 32-bit ARGB.
    fn gen_textures(&mut self) {
        let data = self.data;
        if !data.textiles32.is_empty() {
            for page in &data.textiles32 {
                self.world.texture_pages.push(TexturePage {
                    pixels: page.clone(),
                });
            }
        } else if !data.textiles16.is_empty() {
            for page in &data.textiles16 {
                self.world.texture_pages.push(TexturePage {
                    pixels: page.iter().map(|&p| argb_from_a1rgb5(p)).collect(),
                });
            }
        } else {
            for page in &data.textiles8 {
                self.world.texture_pages.push(TexturePage {
                    pixels: page
                        .iter()
                        .map(|&index| {
                            let [r, g, b] =
                                data.palette.get(index as usize).copied().unwrap_or([0; 3]);
                            // 6-bit VGA palette channels.
                            let scale = |c: u8| (c as u32) << 2;
                            if index == 0 {
                                0 // palette slot 0 is transparent
                            } else {
                                0xFF00_0000 | scale(r) << 16 | scale(g) << 8 | scale(b)
                            }
                        })
                        .collect(),
                });
            }
        }
        self.world.object_textures = self.data.object_textures.clone();
        self.world.animated_textures = self.data.animated_textures.clone();
        debug!("built {} texture pages", self.world.texture_pages.len());
    }

    fn gen_meshes(&mut self) {
        self.world.meshes = self.data.meshes.iter().map(BaseMesh::from_raw).collect();
    }

    fn gen_skeletal_models(&mut self) {
        // A model owns the animations from its index up to the next model's;
        // u16::MAX marks an animation-less model.
        let mut anim_starts: Vec<u32> = self
            .data
            .models
            .iter()
            .map(|m| m.animation_index as u32)
            .filter(|&i| i != u16::MAX as u32)
            .collect();
        anim_starts.sort_unstable();

        for raw in &self.data.models {
            let mesh_range =
                raw.starting_mesh as usize..raw.starting_mesh as usize + raw.num_meshes as usize;
            if mesh_range.end > self.world.meshes.len() {
                self.dangling("model mesh", raw.starting_mesh as u32);
                continue;
            }

            let Some(mesh_tree) = self.read_mesh_tree(raw.mesh_tree_index, raw.num_meshes) else {
                self.dangling("mesh tree", raw.mesh_tree_index);
                continue;
            };

            let animations = if raw.animation_index == u16::MAX {
                vec![]
            } else {
                let start = raw.animation_index as u32;
                let end = anim_starts
                    .iter()
                    .find(|&&i| i > start)
                    .copied()
                    .unwrap_or(self.data.animations.len() as u32);
                (start..end.min(self.data.animations.len() as u32))
                    .map(|i| self.build_animation(i as usize))
                    .collect()
            };

            self.world.skeletal_models.insert(
                raw.id,
                SkeletalModel {
                    id: raw.id,
                    meshes: mesh_range.map(|i| i as u32).collect(),
                    mesh_tree,
                    animations,
                },
            );
        }

        for raw in &self.data.static_meshes {
            if raw.mesh as usize >= self.world.meshes.len() {
                self.dangling("static mesh", raw.mesh as u32);
                continue;
            }
            let corner = |b: [[i16; 2]; 3], side: usize| {
                Vec3::new(b[0][side] as f32, -b[1][side] as f32, b[2][side] as f32)
            };
            self.world.static_mesh_defs.insert(
                raw.id,
                StaticMeshDef {
                    id: raw.id,
                    mesh: raw.mesh as u32,
                    visibility_box: [corner(raw.visibility_box, 0), corner(raw.visibility_box, 1)],
                    collision_box: [corner(raw.collision_box, 0), corner(raw.collision_box, 1)],
                    flags: raw.flags,
                },
            );
        }

        self.world.skybox = skybox_model_id(self.format)
            .filter(|id| self.world.skeletal_models.contains_key(id));
    }

    /// Joint tree nodes sit in a shared i32 stream as (flags, x, y, z)
    /// quadruples; the root joint has none.
    fn read_mesh_tree(&self, index: u32, num_meshes: u16) -> Option<Vec<MeshTreeNode>> {
        let nodes = num_meshes.saturating_sub(1) as usize;
        let start = index as usize;
        let words = self.data.mesh_trees.get(start..start + nodes * 4)?;
        Some(
            words
                .chunks_exact(4)
                .map(|n| MeshTreeNode {
                    flags: n[0] as u32,
                    offset: IVec3::new(n[1], -n[2], n[3]),
                })
                .collect(),
        )
    }

    fn build_animation(&self, index: usize) -> Animation {
        let raw = &self.data.animations[index];

        let state_changes = (0..raw.num_state_changes as usize)
            .filter_map(|i| {
                let change = self
                    .data
                    .state_changes
                    .get(raw.state_change_offset as usize + i)?;
                let dispatches = (0..change.num_anim_dispatches as usize)
                    .filter_map(|j| {
                        let d = self.data.anim_dispatches.get(change.anim_dispatch as usize + j)?;
                        Some(StateDispatch {
                            frame_low: d.low,
                            frame_high: d.high,
                            next_animation: d.next_animation as u16,
                            next_frame: d.next_frame as u16,
                        })
                    })
                    .collect();
                Some(StateChange {
                    state_id: change.state_id,
                    dispatches,
                })
            })
            .collect();

        Animation {
            state_id: raw.state_id,
            frame_rate: raw.frame_rate,
            frame_start: raw.frame_start,
            frame_end: raw.frame_end,
            frame_offset: raw.frame_offset / 2,
            frame_size: raw.frame_size,
            speed: raw.speed,
            accel: raw.accel,
            speed_lateral: raw.speed_lateral,
            accel_lateral: raw.accel_lateral,
            next_animation: raw.next_animation,
            next_frame: raw.next_frame,
            state_changes,
            commands: decode_anim_commands(
                &self.data.anim_commands,
                raw.anim_command as usize,
                raw.num_anim_commands as usize,
            ),
        }
    }

    fn gen_rooms(&mut self) {
        for (id, raw) in self.data.rooms.iter().enumerate() {
            let room = self.build_room(id as u16, raw);
            self.world.rooms.push(room);
        }
        self.world.frames = self.data.frames.clone();
        self.world.floor_data = self.data.floor_data.clone();
    }

    fn build_room(&mut self, id: u16, raw: &RawRoom) -> Room {
        let position = Vec3::new(raw.x as f32, 0.0, raw.z as f32);
        let mut room = Room {
            id,
            position,
            y_top: -raw.y_top,
            y_bottom: -raw.y_bottom,
            mesh: BaseMesh::from_room(raw),
            num_x_sectors: raw.num_x_sectors,
            num_z_sectors: raw.num_z_sectors,
            ambient_intensity: raw.ambient_intensity,
            alternate_room: (raw.alternate_room >= 0).then_some(raw.alternate_room as u16),
            alternate_group: raw.alternate_group,
            flags: RoomFlags::from_bits_truncate(raw.flags),
            active: true,
            ..Default::default()
        };

        for x in 0..raw.num_x_sectors {
            for z in 0..raw.num_z_sectors {
                let index = x as usize * raw.num_z_sectors as usize + z as usize;
                let Some(cell) = raw.sectors.get(index) else {
                    self.dangling("room sector", index as u32);
                    continue;
                };

                let floor = -(cell.floor as i32) * METERING_STEP;
                let ceiling = -(cell.ceiling as i32) * METERING_STEP;
                let mut sector = RoomSector {
                    index_x: x,
                    index_z: z,
                    position: position
                        + Vec3::new(
                            (x as i32 * SECTOR_SIZE + SECTOR_SIZE / 2) as f32,
                            floor as f32,
                            (z as i32 * SECTOR_SIZE + SECTOR_SIZE / 2) as f32,
                        ),
                    floor,
                    ceiling,
                    floor_corners: [floor; 4],
                    ceiling_corners: [ceiling; 4],
                    fd_index: cell.fd_index,
                    box_index: (cell.box_index != u16::MAX).then_some(cell.box_index),
                    owner_room: id,
                    ..Default::default()
                };
                // The raw wall marker; vertical portals override to ghost so
                // probes pass into the linked room.
                if cell.floor == -127 {
                    sector.floor_penetration = PenetrationConfig::Wall;
                    sector.ceiling_penetration = PenetrationConfig::Wall;
                }
                if cell.room_below != NO_ROOM {
                    sector.floor_penetration = PenetrationConfig::Ghost;
                }
                if cell.room_above != NO_ROOM {
                    sector.ceiling_penetration = PenetrationConfig::Ghost;
                }
                room.sectors.push(sector);
            }
        }

        for sprite in &raw.sprites {
            let Some(vertex) = raw.vertices.get(sprite.vertex as usize) else {
                self.dangling("room sprite vertex", sprite.vertex as u32);
                continue;
            };
            room.sprites.push(RoomSprite {
                position: position
                    + Vec3::new(vertex.x as f32, -vertex.y as f32, vertex.z as f32),
                sprite: sprite.texture,
            });
        }

        for light in &raw.lights {
            room.lights.push(Light {
                position: Vec3::new(light.x as f32, -light.y as f32, light.z as f32),
            });
        }

        for placement in &raw.static_meshes {
            if !self
                .world
                .static_mesh_defs
                .contains_key(&(placement.static_mesh_id as u32))
            {
                self.dangling("static mesh placement", placement.static_mesh_id as u32);
                continue;
            }
            room.static_meshes.push(StaticMesh {
                def: placement.static_mesh_id as u32,
                position: Vec3::new(
                    placement.x as f32,
                    -placement.y as f32,
                    placement.z as f32,
                ),
                angle: angle_from_raw(placement.rotation as i16),
                shade: placement.intensity,
            });
        }

        room
    }

    /// Resolves portals, vertical adjacency links and the floor data of
    /// every sector. Needs all rooms present, hence a separate stage.
    fn gen_room_properties(&mut self) {
        let num_rooms = self.data.rooms.len();

        for id in 0..num_rooms {
            let raw = &self.data.rooms[id];

            let mut portals = vec![];
            let mut adjacent = vec![];
            for portal in &raw.portals {
                if portal.adjoining_room as usize >= num_rooms {
                    self.dangling("portal room", portal.adjoining_room as u32);
                    continue;
                }
                let position = self.world.rooms[id].position;
                let vertex = |v: [i16; 3]| {
                    position + Vec3::new(v[0] as f32, -v[1] as f32, v[2] as f32)
                };
                portals.push(Portal {
                    to_room: portal.adjoining_room,
                    normal: Vec3::new(
                        portal.normal[0] as f32,
                        -portal.normal[1] as f32,
                        portal.normal[2] as f32,
                    )
                    .normalize_or_zero(),
                    vertices: portal.vertices.map(vertex),
                });
                if !adjacent.contains(&portal.adjoining_room) {
                    adjacent.push(portal.adjoining_room);
                }
            }
            self.world.rooms[id].portals = portals;
            self.world.rooms[id].adjacent_rooms = adjacent;

            if let Some(alternate) = self.world.rooms[id].alternate_room {
                if alternate as usize >= num_rooms {
                    self.dangling("alternate room", alternate as u32);
                    self.world.rooms[id].alternate_room = None;
                }
            }

            for index in 0..self.data.rooms[id].sectors.len() {
                let cell = self.data.rooms[id].sectors[index];
                let above = (cell.room_above != NO_ROOM)
                    .then(|| self.link_vertical(id as u16, index, cell.room_above as u16))
                    .flatten();
                let below = (cell.room_below != NO_ROOM)
                    .then(|| self.link_vertical(id as u16, index, cell.room_below as u16))
                    .flatten();
                let sector = &mut self.world.rooms[id].sectors[index];
                sector.above = above;
                sector.below = below;
            }
        }

        // Floor data last: triangulation records may override the
        // penetration configs seeded above.
        let floor_data = std::mem::take(&mut self.world.floor_data);
        for room in &mut self.world.rooms {
            for sector in &mut room.sectors {
                translate_floor_data(sector, &floor_data, &mut self.warnings);
            }
        }
        self.world.floor_data = floor_data;
    }

    /// Finds the sector of `target` room lying directly above/below the
    /// given sector, by world position.
    fn link_vertical(&mut self, room: u16, index: usize, target: u16) -> Option<SectorRef> {
        let Some(target_room) = self.world.rooms.get(target as usize) else {
            self.dangling("adjacent room", target as u32);
            return None;
        };
        let sector = &self.world.rooms[room as usize].sectors[index];
        let dx = sector.position.x - target_room.position.x;
        let dz = sector.position.z - target_room.position.z;
        if dx < 0.0 || dz < 0.0 {
            self.dangling("adjacent sector", target as u32);
            return None;
        }
        let x = dx as i32 / SECTOR_SIZE;
        let z = dz as i32 / SECTOR_SIZE;
        match target_room.sector_index(x as u16, z as u16) {
            Some(i) => Some(SectorRef {
                room: target,
                index: i as u32,
            }),
            None => {
                self.dangling("adjacent sector", target as u32);
                None
            }
        }
    }

    fn gen_boxes(&mut self) {
        self.world.boxes = self
            .data
            .boxes
            .iter()
            .map(|b| PathBox {
                x_min: b.x_min,
                x_max: b.x_max,
                z_min: b.z_min,
                z_max: b.z_max,
                true_floor: -(b.true_floor as i32),
                overlap_index: b.overlap_index,
            })
            .collect();
        self.world.overlaps = self.data.overlaps.clone();
        self.world.zones = self.data.zones.clone();
    }

    fn gen_cameras(&mut self) {
        for raw in &self.data.cameras {
            self.world.cameras.push(Camera {
                position: Vec3::new(raw.x as f32, -raw.y as f32, raw.z as f32),
                room: raw.room,
                flags: raw.flags,
            });
        }
        self.world.flyby_cameras = self.data.flyby_cameras.clone();

        for raw in &self.data.sound_sources {
            self.world.sound_sources.push(SoundSource {
                position: Vec3::new(raw.x as f32, -raw.y as f32, raw.z as f32),
                sound_id: raw.sound_id,
                flags: raw.flags,
            });
        }
    }

    fn gen_entities(&mut self) {
        for (index, raw) in self.data.entities.iter().enumerate() {
            let id = index as u32;
            let model = raw.type_id as u32;
            if !self.world.skeletal_models.contains_key(&model) {
                self.dangling("skeletal model", model);
                continue;
            }
            if raw.room as usize >= self.world.rooms.len() || raw.room < 0 {
                self.dangling("entity room", raw.room as u32);
                continue;
            }

            self.world.rooms[raw.room as usize].entities.push(id);
            self.world.entities.insert(
                id,
                Entity {
                    id,
                    type_id: raw.type_id,
                    model,
                    room: raw.room as u16,
                    position: Vec3::new(raw.x as f32, -raw.y as f32, raw.z as f32),
                    angle: angle_from_raw(raw.angle),
                    shade: raw.intensity,
                    ocb: raw.ocb,
                    flags: raw.flags,
                    base_item: None,
                },
            );
        }
        self.world.ai_objects = self.data.ai_objects.clone();
    }

    fn gen_sprites(&mut self) {
        for raw in &self.data.sprite_textures {
            self.world.sprites.push(Sprite {
                tile: raw.tile,
                x: raw.x,
                y: raw.y,
                width: raw.width,
                height: raw.height,
                left: raw.left_side,
                top: raw.top_side,
                right: raw.right_side,
                bottom: raw.bottom_side,
            });
        }
        for raw in &self.data.sprite_sequences {
            let length = (-raw.negative_length).max(0) as u16;
            if raw.offset as usize + length as usize > self.world.sprites.len() {
                self.dangling("sprite sequence", raw.id as u32);
                continue;
            }
            self.world.sprite_sequences.insert(
                raw.id,
                SpriteSequence {
                    length,
                    offset: raw.offset as u16,
                },
            );
        }
    }

    fn gen_samples(&mut self) {
        self.world.samples = self
            .data
            .samples
            .iter()
            .map(|s| AudioSample {
                data: s.data.clone(),
            })
            .collect();
        self.world.soundmap = self.data.soundmap.clone();
        self.world.sound_details = self.data.sound_details.clone();
        self.world.sample_indices = self.data.sample_indices.clone();
    }

    /// Second pass over built entities attaching behavior metadata from the
    /// scripting collaborator. Types without a script entry stay inert.
    fn gen_base_items(&mut self) {
        let Some(script) = self.params.script else { return };
        for entity in self.world.entities.values_mut() {
            if let Some(behavior) = script.behavior(entity.type_id) {
                entity.base_item = Some(BaseItem { behavior });
            }
        }
    }

    fn gen_room_collision(&mut self) {
        for id in 0..self.world.rooms.len() {
            let tweens = gen_room_tweens(&self.world.rooms[id], &self.world.rooms);
            let mesh =
                build_room_collision(&self.world.rooms[id], &tweens, &mut self.warnings);
            self.world.rooms[id].collision = Some(mesh);
        }
    }
}

/// A1R5G5B5 to ARGB8888.
fn argb_from_a1rgb5(pixel: u16) -> u32 {
    let expand = |c: u16| {
        let c = (c & 0x1F) as u32;
        (c << 3) | (c >> 2)
    };
    let alpha = if pixel & 0x8000 != 0 { 0xFF } else { 0x00 };
    alpha << 24 | expand(pixel >> 10) << 16 | expand(pixel >> 5) << 8 | expand(pixel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn pixel_format_expansion() {
        assert_eq!(argb_from_a1rgb5(0x0000), 0x0000_0000);
        assert_eq!(argb_from_a1rgb5(0xFFFF), 0xFFFF_FFFF);
        // Opaque pure red.
        assert_eq!(argb_from_a1rgb5(0x8000 | 0x1F << 10), 0xFFFF_0000);
    }
}
