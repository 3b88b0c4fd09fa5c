//! Room record decoding.
//!
//! TR1 through TR4 share one room layout that only grows at the edges; TR5
//! replaced it wholesale with the offset-table "XELA" block, which gets its
//! own reader at the bottom of this module.

use crate::{
    data::*,
    decode::{count_u16, count_u32, read_bytes, read_face3, read_face4},
    profile::DecodeProfile,
};
use anyhow::{ensure, Context};
use byteorder::{ReadBytesExt, LE};
use std::io::{Cursor, Read, Seek, SeekFrom};
use tomb_utils::{AnyResult, PackedReadExt};

pub(crate) fn read_classic_room<R: Read + Seek>(
    r: &mut R,
    p: &DecodeProfile,
) -> AnyResult<RawRoom> {
    let mut room = RawRoom {
        x: r.read_packed()?,
        z: r.read_packed()?,
        y_bottom: r.read_packed()?,
        y_top: r.read_packed()?,
        ..Default::default()
    };

    // The geometry block carries its own word count; trust it over our own
    // parse position in case a level carries trailing garbage words.
    let num_data_words = count_u32(r)?;
    let data_end = r.stream_position()? + num_data_words as u64 * 2;

    let count = count_u16(r)?;
    for _ in 0..count {
        room.vertices.push(read_room_vertex(r, p)?);
    }
    let count = count_u16(r)?;
    for _ in 0..count {
        room.quads.push(read_face4(r, false)?);
    }
    let count = count_u16(r)?;
    for _ in 0..count {
        room.tris.push(read_face3(r, false)?);
    }
    let count = count_u16(r)?;
    room.sprites = r.read_packed_vec(count)?;

    ensure!(
        r.stream_position()? <= data_end,
        "room geometry overruns its own data block"
    );
    r.seek(SeekFrom::Start(data_end))?;

    let count = count_u16(r)?;
    room.portals = r.read_packed_vec(count)?;

    room.num_z_sectors = r.read_packed()?;
    room.num_x_sectors = r.read_packed()?;
    let num_sectors = room.num_z_sectors as usize * room.num_x_sectors as usize;
    room.sectors = r.read_packed_vec(num_sectors)?;

    room.ambient_intensity = r.read_packed()?;
    for _ in 1..p.room_ambient_words() {
        let _extra: i16 = r.read_packed()?;
    }

    let count = count_u16(r)?;
    for _ in 0..count {
        room.lights.push(RawLight {
            x: r.read_packed()?,
            y: r.read_packed()?,
            z: r.read_packed()?,
            payload: read_bytes(r, p.room_light_payload())?,
        });
    }

    let count = count_u16(r)?;
    for _ in 0..count {
        room.static_meshes.push(read_room_static_mesh(r, p)?);
    }

    room.alternate_room = r.read_packed()?;
    room.flags = r.read_packed()?;

    if p.room_has_extra_bytes() {
        room.water_scheme = r.read_u8()?;
        room.reverb = r.read_u8()?;
        // TR3 pads with filler here; TR4 repurposed the byte.
        let third = r.read_u8()?;
        if p.tr4_plus() {
            room.alternate_group = third;
        }
    }

    Ok(room)
}

fn read_room_vertex(r: &mut impl Read, p: &DecodeProfile) -> AnyResult<RawRoomVertex> {
    let x = r.read_packed()?;
    let y = r.read_packed()?;
    let z = r.read_packed()?;
    let lighting: i16 = r.read_packed()?;
    let (attributes, lighting2) = if p.extended_room_vertices() {
        (r.read_packed()?, r.read_packed()?)
    } else {
        (0, lighting)
    };

    Ok(RawRoomVertex {
        x,
        y,
        z,
        lighting,
        attributes,
        lighting2,
    })
}

fn read_room_static_mesh(
    r: &mut impl Read,
    p: &DecodeProfile,
) -> AnyResult<RawRoomStaticMesh> {
    let x = r.read_packed()?;
    let y = r.read_packed()?;
    let z = r.read_packed()?;
    let rotation = r.read_packed()?;
    let intensity: u16 = r.read_packed()?;
    let intensity2 = if p.room_static_mesh_has_intensity2() {
        r.read_packed()?
    } else {
        intensity
    };

    Ok(RawRoomStaticMesh {
        x,
        y,
        z,
        rotation,
        intensity,
        intensity2,
        static_mesh_id: r.read_packed()?,
    })
}

// ----------------------------------------------------------------------------
// TR5 "XELA" rooms
// ----------------------------------------------------------------------------

/// Fixed size of the XELA room header. The offset fields inside the header
/// are relative to the first byte after it.
const XELA_HEADER_LEN: u64 = 208;
const XELA_LIGHT_LEN: usize = 88;
const XELA_LAYER_LEN: i64 = 56;
const XELA_VERTEX_LEN: usize = 28;

pub(crate) fn read_tr5_room<R: Read + Seek>(r: &mut R) -> AnyResult<RawRoom> {
    let marker = read_bytes(r, 4)?;
    ensure!(marker == b"XELA", "missing XELA room marker");
    let size = count_u32(r)?;
    ensure!(size as u64 >= XELA_HEADER_LEN, "XELA room block too small");
    let block = read_bytes(r, size)?;
    let mut c = Cursor::new(&block[..]);

    // Header fields at fixed offsets; the 0xCDCDCDCD separators between them
    // are skipped by seeking.
    c.set_position(4);
    let _end_sd_offset = count_u32(&mut c)?;
    let start_sd_offset = count_u32(&mut c)? as u64;
    c.set_position(16);
    let end_portal_offset = count_u32(&mut c)? as u64;

    let mut room = RawRoom {
        x: c.read_packed()?,
        ..Default::default()
    };
    c.set_position(28);
    room.z = c.read_packed()?;

    c.set_position(56);
    room.num_z_sectors = c.read_packed()?;
    room.num_x_sectors = c.read_packed()?;
    let colour = c.read_u32::<LE>()?;
    // Rooms no longer store an ambient word; fold the ARGB room colour down
    // to a comparable brightness.
    let brightness = ((colour >> 16 & 0xFF) + (colour >> 8 & 0xFF) + (colour & 0xFF)) / 3;
    room.ambient_intensity = (brightness << 5) as i16;

    let num_lights = c.read_u16::<LE>()? as usize;
    let num_static_meshes = c.read_u16::<LE>()? as usize;
    room.reverb = c.read_u8()?;
    room.alternate_group = c.read_u8()?;
    room.water_scheme = c.read_u16::<LE>()? as u8;

    c.set_position(92);
    room.alternate_room = c.read_packed()?;
    room.flags = c.read_packed()?;

    c.set_position(184);
    room.y_top = c.read_packed()?;
    room.y_bottom = c.read_packed()?;
    let num_layers = count_u32(&mut c)?;
    let layer_offset = count_u32(&mut c)? as u64;
    let vertices_offset = count_u32(&mut c)? as u64;
    let poly_offset = count_u32(&mut c)? as u64;

    // Lights immediately follow the header.
    c.set_position(XELA_HEADER_LEN);
    for _ in 0..num_lights {
        room.lights.push(RawLight {
            x: c.read_f32::<LE>()? as i32,
            y: c.read_f32::<LE>()? as i32,
            z: c.read_f32::<LE>()? as i32,
            payload: read_bytes(&mut c, XELA_LIGHT_LEN - 12)?,
        });
    }

    c.set_position(XELA_HEADER_LEN + start_sd_offset);
    let num_sectors = room.num_z_sectors as usize * room.num_x_sectors as usize;
    room.sectors = c.read_packed_vec(num_sectors)?;

    let count = count_u16(&mut c)?;
    room.portals = c.read_packed_vec(count).context("room portals")?;

    // A 0xCDCD word separates portals from the static placements.
    c.set_position(XELA_HEADER_LEN + end_portal_offset + 2);
    for _ in 0..num_static_meshes {
        room.static_meshes.push(RawRoomStaticMesh {
            x: c.read_packed()?,
            y: c.read_packed()?,
            z: c.read_packed()?,
            rotation: c.read_packed()?,
            intensity: c.read_packed()?,
            intensity2: c.read_packed()?,
            static_mesh_id: c.read_packed()?,
        });
    }

    // Geometry is split into layers; faces index vertices relative to their
    // layer, so the running base is added back while reading.
    let mut layer_counts = Vec::with_capacity(num_layers);
    c.set_position(XELA_HEADER_LEN + layer_offset);
    for _ in 0..num_layers {
        let num_vertices = count_u32(&mut c)?;
        let _unknown = c.read_u16::<LE>()?;
        let num_rectangles = c.read_u16::<LE>()? as usize;
        let num_triangles = c.read_u16::<LE>()? as usize;
        layer_counts.push((num_vertices, num_rectangles, num_triangles));
        c.seek(SeekFrom::Current(XELA_LAYER_LEN - 10))?;
    }

    c.set_position(XELA_HEADER_LEN + vertices_offset);
    for _ in 0..layer_counts.iter().map(|l| l.0).sum::<usize>() {
        // Float positions, room-relative like the classic i16 vertices.
        let x = c.read_f32::<LE>()? as i16;
        let y = c.read_f32::<LE>()? as i16;
        let z = c.read_f32::<LE>()? as i16;
        c.seek(SeekFrom::Current(XELA_VERTEX_LEN as i64 - 12))?;
        room.vertices.push(RawRoomVertex {
            x,
            y,
            z,
            lighting: 0,
            attributes: 0,
            lighting2: 0,
        });
    }

    c.set_position(XELA_HEADER_LEN + poly_offset);
    let mut vertex_base = 0u16;
    for (num_vertices, num_rectangles, num_triangles) in layer_counts {
        for _ in 0..num_rectangles {
            let mut face = read_face4(&mut c, true)?;
            for v in &mut face.vertices {
                *v += vertex_base;
            }
            room.quads.push(face);
        }
        for _ in 0..num_triangles {
            let mut face = read_face3(&mut c, true)?;
            for v in &mut face.vertices {
                *v += vertex_base;
            }
            room.tris.push(face);
        }
        vertex_base += num_vertices as u16;
    }

    Ok(room)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::LevelFormat;
    use tomb_utils::PackedWriteExt;

    fn push_count(buffer: &mut Vec<u8>, count: u16) {
        buffer.write_packed(count).unwrap();
    }

    /// Serializes a minimal first-generation room: one vertex, no faces, a
    /// 1x1 sector grid, no lights or statics.
    fn tiny_tr1_room() -> Vec<u8> {
        let mut b = vec![];
        b.write_packed([1024i32, 2048]).unwrap(); // x, z
        b.write_packed([0i32, -2048]).unwrap(); // y_bottom, y_top

        let mut data = vec![];
        push_count(&mut data, 1); // vertices
        data.write_packed([10i16, -256, 20, 0x1FFF]).unwrap();
        push_count(&mut data, 0); // quads
        push_count(&mut data, 0); // tris
        push_count(&mut data, 0); // sprites
        b.write_packed((data.len() / 2) as u32).unwrap();
        b.extend_from_slice(&data);

        push_count(&mut b, 0); // portals
        b.write_packed([1u16, 1]).unwrap(); // z sectors, x sectors
        let sector = RawSector {
            fd_index: 0,
            box_index: 0xFFFF,
            room_below: NO_ROOM,
            floor: -2,
            room_above: NO_ROOM,
            ceiling: 6,
        };
        b.write_packed(sector).unwrap();
        b.write_packed(0x1FFFi16).unwrap(); // ambient
        push_count(&mut b, 0); // lights
        push_count(&mut b, 0); // static meshes
        b.write_packed(-1i16).unwrap(); // alternate room
        b.write_packed(0u16).unwrap(); // flags
        b
    }

    #[test]
    pub fn tr1_room_round_trips() {
        let bytes = tiny_tr1_room();
        let p = DecodeProfile::new(LevelFormat::Tr1);
        let room = read_classic_room(&mut Cursor::new(bytes), &p).unwrap();

        assert_eq!(room.x, 1024);
        assert_eq!(room.z, 2048);
        assert_eq!(room.y_top, -2048);
        assert_eq!(room.vertices.len(), 1);
        assert_eq!(room.vertices[0].lighting2, 0x1FFF);
        assert_eq!(room.sectors.len(), 1);
        assert_eq!(room.sectors[0].floor, -2);
        assert_eq!(room.alternate_room, -1);
    }

    #[test]
    pub fn data_word_count_is_authoritative() {
        // Two trailing padding words inside the data block must not shift
        // the sections after it.
        let mut bytes = vec![];
        bytes.write_packed([0i32, 0, 0, -1024]).unwrap();

        let mut data = vec![];
        push_count(&mut data, 0);
        push_count(&mut data, 0);
        push_count(&mut data, 0);
        push_count(&mut data, 0);
        data.write_packed([0xCDCDu16, 0xCDCD]).unwrap(); // padding
        bytes.write_packed((data.len() / 2) as u32).unwrap();
        bytes.extend_from_slice(&data);

        push_count(&mut bytes, 0); // portals
        bytes.write_packed([0u16, 0]).unwrap(); // empty sector grid
        bytes.write_packed(0i16).unwrap(); // ambient
        push_count(&mut bytes, 0);
        push_count(&mut bytes, 0);
        bytes.write_packed(-1i16).unwrap();
        bytes.write_packed(0u16).unwrap();

        let p = DecodeProfile::new(LevelFormat::Tr1);
        let room = read_classic_room(&mut Cursor::new(bytes), &p).unwrap();
        assert_eq!(room.flags, 0);
        assert!(room.sectors.is_empty());
    }
}
