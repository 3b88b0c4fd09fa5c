//! Version-parameterized section decoders.
//!
//! The classic generations (TR1-3) are one flat little-endian stream. TR4
//! wraps its texture pages and the whole geometry block in zlib; TR5 keeps
//! the geometry uncompressed but shares the TR4 outer structure. All three
//! paths funnel into [`read_world_sections`], which walks the shared section
//! sequence under control of the [`DecodeProfile`].

use crate::{
    data::*,
    error::LoadError,
    format::LevelFormat,
    profile::DecodeProfile,
    room::{read_classic_room, read_tr5_room},
};
use anyhow::{bail, ensure};
use byteorder::{ReadBytesExt, LE};
use flate2::read::ZlibDecoder;
use std::io::{Cursor, Read, Seek};
use tomb_utils::{ok, AnyResult, PackedReadExt};

/// Upper bound on any record count read from the file. Far above anything a
/// shipped level contains; purely a corruption guard so a bad count fails as
/// a malformed record instead of an allocation storm.
const MAX_COUNT: u32 = 0x0100_0000;

pub fn read_level<R: Read + Seek>(
    r: &mut R,
    format: LevelFormat,
) -> Result<LevelData, LoadError> {
    let profile = DecodeProfile::new(format);
    match format {
        LevelFormat::Tr1 | LevelFormat::Tr1Ub | LevelFormat::Tr2 | LevelFormat::Tr3 => {
            read_classic(r, &profile)
        }
        LevelFormat::Tr4 => read_tr4(r, &profile),
        LevelFormat::Tr5 => read_tr5(r, &profile),
    }
}

/// Runs one decode stage, attaching section name and file offset to any
/// failure. An unexpected EOF maps to `TruncatedFile`, everything else to
/// `MalformedRecord`.
fn section<R: Read + Seek, T>(
    r: &mut R,
    name: &'static str,
    f: impl FnOnce(&mut R) -> AnyResult<T>,
) -> Result<T, LoadError> {
    let offset = r.stream_position().unwrap_or(u64::MAX);
    f(r).map_err(|e| LoadError::from_decode(name, offset, e))
}

pub(crate) fn count_u32(r: &mut impl Read) -> AnyResult<usize> {
    let count = r.read_u32::<LE>()?;
    ensure!(count <= MAX_COUNT, "implausible record count {count}");
    Ok(count as usize)
}

pub(crate) fn count_u16(r: &mut impl Read) -> AnyResult<usize> {
    Ok(r.read_u16::<LE>()? as usize)
}

pub(crate) fn read_bytes(r: &mut impl Read, len: usize) -> AnyResult<Vec<u8>> {
    let mut buffer = vec![0u8; len];
    r.read_exact(&mut buffer)?;
    Ok(buffer)
}

/// Reads a `(uncompressed_size, compressed_size)` header followed by a zlib
/// stream, and inflates it.
fn read_zlib_block(r: &mut impl Read) -> AnyResult<Vec<u8>> {
    let uncomp_size = count_u32(r)?;
    let comp_size = count_u32(r)?;
    let compressed = read_bytes(r, comp_size)?;

    let mut result = Vec::with_capacity(uncomp_size);
    ZlibDecoder::new(&compressed[..]).read_to_end(&mut result)?;
    ensure!(
        result.len() == uncomp_size,
        "zlib block inflated to {} bytes, header promised {}",
        result.len(),
        uncomp_size
    );
    Ok(result)
}

/// Consumes a fixed byte marker ("SPR", "TEX" and friends in the later
/// generations).
fn skip_marker(r: &mut impl Read, expected: &[u8]) -> AnyResult {
    let found = read_bytes(r, expected.len())?;
    ensure!(
        found == expected,
        "bad section marker: expected {expected:02x?}, found {found:02x?}"
    );
    ok()
}

// ----------------------------------------------------------------------------
// Outer per-generation shells
// ----------------------------------------------------------------------------

fn read_classic<R: Read + Seek>(
    r: &mut R,
    p: &DecodeProfile,
) -> Result<LevelData, LoadError> {
    let mut level = LevelData::default();

    section(r, "header", |r| {
        let _version = r.read_u32::<LE>()?;
        ok()
    })?;

    if !p.is_tr1() {
        section(r, "palette", |r| {
            level.palette = r.read_packed_vec(PALETTE_LEN)?;
            level.palette16 = r.read_packed_vec(PALETTE_LEN)?;
            ok()
        })?;
    }

    section(r, "textures", |r| {
        let count = count_u32(r)?;
        for _ in 0..count {
            level.textiles8.push(read_bytes(r, TEXTILE_PIXELS)?);
        }
        if !p.is_tr1() {
            for _ in 0..count {
                level.textiles16.push(r.read_packed_vec(TEXTILE_PIXELS)?);
            }
        }
        ok()
    })?;

    section(r, "file info", |r| {
        let _unused = r.read_u32::<LE>()?;
        ok()
    })?;

    read_world_sections(r, p, &mut level)?;

    Ok(level)
}

fn read_tr4<R: Read + Seek>(r: &mut R, p: &DecodeProfile) -> Result<LevelData, LoadError> {
    let mut level = LevelData::default();

    let (num_room_tiles, num_obj_tiles, num_bump_tiles) = section(r, "header", |r| {
        let _version = r.read_u32::<LE>()?;
        let room = count_u16(r)?;
        let obj = count_u16(r)?;
        let bump = count_u16(r)?;
        Ok((room, obj, bump))
    })?;
    let num_tiles = num_room_tiles + num_obj_tiles + num_bump_tiles;

    section(r, "textures", |r| {
        read_textiles32(read_zlib_block(r)?, num_tiles, &mut level.textiles32)?;
        read_textiles16(read_zlib_block(r)?, num_tiles, &mut level.textiles16)?;
        // Two more 32-bit pages: loading screen font + sky layer.
        read_textiles32(read_zlib_block(r)?, 2, &mut level.textiles32)?;
        ok()
    })?;

    let geometry = section(r, "geometry", read_zlib_block)?;
    let mut cursor = Cursor::new(geometry);
    section(&mut cursor, "geometry info", |r| {
        let _unused = r.read_u32::<LE>()?;
        ok()
    })?;
    read_world_sections(&mut cursor, p, &mut level)?;

    read_compressed_samples(r, &mut level)?;

    Ok(level)
}

fn read_tr5<R: Read + Seek>(r: &mut R, p: &DecodeProfile) -> Result<LevelData, LoadError> {
    let mut level = LevelData::default();

    let (num_room_tiles, num_obj_tiles) = section(r, "header", |r| {
        let _version = r.read_u32::<LE>()?;
        let room = count_u16(r)?;
        let obj = count_u16(r)?;
        let _bump = count_u16(r)?;
        Ok((room, obj))
    })?;
    let num_tiles = num_room_tiles + num_obj_tiles;

    section(r, "textures", |r| {
        read_textiles32(read_zlib_block(r)?, num_tiles, &mut level.textiles32)?;
        read_textiles16(read_zlib_block(r)?, num_tiles, &mut level.textiles16)?;
        read_textiles32(read_zlib_block(r)?, 2, &mut level.textiles32)?;
        ok()
    })?;

    section(r, "file info", |r| {
        let _lara_type = r.read_u16::<LE>()?;
        let _weather = r.read_u16::<LE>()?;
        let mut padding = [0u8; 28];
        r.read_exact(&mut padding)?;
        // The geometry "compression" header; TR5 geometry is stored flat,
        // both sizes are equal.
        let uncomp_size = count_u32(r)?;
        let comp_size = count_u32(r)?;
        ensure!(
            uncomp_size == comp_size,
            "TR5 geometry block claims compression"
        );
        ok()
    })?;

    read_world_sections(r, p, &mut level)?;
    read_compressed_samples(r, &mut level)?;

    Ok(level)
}

fn read_textiles32(bytes: Vec<u8>, count: usize, out: &mut Vec<Vec<u32>>) -> AnyResult {
    ensure!(
        bytes.len() == count * TEXTILE_PIXELS * 4,
        "32-bit texture block size mismatch"
    );
    let mut cursor = Cursor::new(bytes);
    for _ in 0..count {
        out.push(cursor.read_packed_vec(TEXTILE_PIXELS)?);
    }
    ok()
}

fn read_textiles16(bytes: Vec<u8>, count: usize, out: &mut Vec<Vec<u16>>) -> AnyResult {
    ensure!(
        bytes.len() == count * TEXTILE_PIXELS * 2,
        "16-bit texture block size mismatch"
    );
    let mut cursor = Cursor::new(bytes);
    for _ in 0..count {
        out.push(cursor.read_packed_vec(TEXTILE_PIXELS)?);
    }
    ok()
}

/// TR4/5 sample table: per sample an uncompressed/compressed size pair and a
/// zlib stream.
fn read_compressed_samples<R: Read + Seek>(
    r: &mut R,
    level: &mut LevelData,
) -> Result<(), LoadError> {
    section(r, "samples", |r| {
        let count = count_u32(r)?;
        for _ in 0..count {
            let data = read_zlib_block(r)?;
            level.samples.push(RawSample { data });
        }
        ok()
    })
}

// ----------------------------------------------------------------------------
// Shared section sequence
// ----------------------------------------------------------------------------

/// Decodes everything from the room table to the sample indices. Section
/// order and record widths come from the profile; the stream is positioned
/// at the room count.
pub fn read_world_sections<R: Read + Seek>(
    r: &mut R,
    p: &DecodeProfile,
    level: &mut LevelData,
) -> Result<(), LoadError> {
    section(r, "rooms", |r| {
        let count = if p.format == LevelFormat::Tr5 {
            count_u32(r)?
        } else {
            count_u16(r)?
        };
        for _ in 0..count {
            let room = if p.format == LevelFormat::Tr5 {
                read_tr5_room(r)?
            } else {
                read_classic_room(r, p)?
            };
            level.rooms.push(room);
        }
        ok()
    })?;

    section(r, "floor data", |r| {
        let count = count_u32(r)?;
        level.floor_data = r.read_packed_vec(count)?;
        ok()
    })?;

    section(r, "meshes", |r| {
        let num_words = count_u32(r)?;
        level.mesh_data = read_bytes(r, num_words * 2)?;
        let num_pointers = count_u32(r)?;
        level.mesh_pointers = r.read_packed_vec(num_pointers)?;
        level.meshes = parse_meshes(&level.mesh_data, &level.mesh_pointers, p)?;
        ok()
    })?;

    section(r, "animations", |r| {
        let count = count_u32(r)?;
        for _ in 0..count {
            level.animations.push(read_animation(r, p)?);
        }
        ok()
    })?;

    section(r, "state changes", |r| {
        let count = count_u32(r)?;
        level.state_changes = r.read_packed_vec(count)?;
        ok()
    })?;

    section(r, "anim dispatches", |r| {
        let count = count_u32(r)?;
        level.anim_dispatches = r.read_packed_vec(count)?;
        ok()
    })?;

    section(r, "anim commands", |r| {
        let count = count_u32(r)?;
        level.anim_commands = r.read_packed_vec(count)?;
        ok()
    })?;

    section(r, "mesh trees", |r| {
        let count = count_u32(r)?;
        level.mesh_trees = r.read_packed_vec(count)?;
        ok()
    })?;

    section(r, "frames", |r| {
        let count = count_u32(r)?;
        level.frames = r.read_packed_vec(count)?;
        ok()
    })?;

    section(r, "models", |r| {
        let count = count_u32(r)?;
        for _ in 0..count {
            let model: RawModel = r.read_packed()?;
            if p.padded_models() {
                let _filler = r.read_u16::<LE>()?;
            }
            level.models.push(model);
        }
        ok()
    })?;

    section(r, "static meshes", |r| {
        let count = count_u32(r)?;
        level.static_meshes = r.read_packed_vec(count)?;
        ok()
    })?;

    if !p.late_object_textures() {
        section(r, "object textures", |r| {
            read_object_textures(r, p, &mut level.object_textures)
        })?;
    }

    section(r, "sprites", |r| {
        if p.format == LevelFormat::Tr4 {
            skip_marker(r, b"SPR")?;
        } else if p.format == LevelFormat::Tr5 {
            skip_marker(r, b"SPR\x00")?;
        }
        let count = count_u32(r)?;
        level.sprite_textures = r.read_packed_vec(count)?;
        let count = count_u32(r)?;
        level.sprite_sequences = r.read_packed_vec(count)?;
        ok()
    })?;

    section(r, "cameras", |r| {
        let count = count_u32(r)?;
        level.cameras = r.read_packed_vec(count)?;
        if p.tr4_plus() {
            let count = count_u32(r)?;
            level.flyby_cameras = r.read_packed_vec(count)?;
        }
        ok()
    })?;

    section(r, "sound sources", |r| {
        let count = count_u32(r)?;
        level.sound_sources = r.read_packed_vec(count)?;
        ok()
    })?;

    section(r, "boxes", |r| {
        let count = count_u32(r)?;
        for _ in 0..count {
            level.boxes.push(read_box(r, p)?);
        }
        let num_overlaps = count_u32(r)?;
        level.overlaps = r.read_packed_vec(num_overlaps)?;
        level.zones = r.read_packed_vec(count * p.zone_words_per_box())?;
        ok()
    })?;

    section(r, "animated textures", |r| {
        let count = count_u32(r)?;
        level.animated_textures = r.read_packed_vec(count)?;
        if p.tr4_plus() {
            let _uv_count = r.read_u8()?;
        }
        ok()
    })?;

    if p.late_object_textures() {
        section(r, "object textures", |r| {
            if p.format == LevelFormat::Tr4 {
                skip_marker(r, b"TEX\x00")?;
            } else if p.format == LevelFormat::Tr5 {
                skip_marker(r, b"\x00TEX\x00")?;
            }
            read_object_textures(r, p, &mut level.object_textures)
        })?;
    }

    section(r, "entities", |r| {
        let count = count_u32(r)?;
        for _ in 0..count {
            level.entities.push(read_entity(r, p)?);
        }
        ok()
    })?;

    if p.tr4_plus() {
        section(r, "ai objects", |r| {
            let count = count_u32(r)?;
            level.ai_objects = r.read_packed_vec(count)?;
            ok()
        })?;
    }

    if !p.tr4_plus() {
        section(r, "lightmap", |r| {
            level.lightmap = read_bytes(r, LIGHTMAP_LEN)?;
            if p.is_tr1() {
                level.palette = r.read_packed_vec(PALETTE_LEN)?;
            }
            ok()
        })?;

        section(r, "cinematic frames", |r| {
            let count = count_u16(r)?;
            level.cinematic_frames = r.read_packed_vec(count)?;
            ok()
        })?;
    }

    section(r, "demo data", |r| {
        let len = count_u16(r)?;
        level.demo_data = read_bytes(r, len)?;
        ok()
    })?;

    section(r, "sound map", |r| {
        level.soundmap = r.read_packed_vec(p.soundmap_len())?;
        ok()
    })?;

    section(r, "sound details", |r| {
        let count = count_u32(r)?;
        level.sound_details = r.read_packed_vec(count)?;
        ok()
    })?;

    if p.embedded_samples() {
        section(r, "samples", |r| {
            let len = count_u32(r)?;
            level.samples.push(RawSample {
                data: read_bytes(r, len)?,
            });
            ok()
        })?;
    }

    section(r, "sample indices", |r| {
        let count = count_u32(r)?;
        level.sample_indices = r.read_packed_vec(count)?;
        ok()
    })?;

    Ok(())
}

// ----------------------------------------------------------------------------
// Variable-width record readers
// ----------------------------------------------------------------------------

pub(crate) fn read_face4(r: &mut impl Read, effects: bool) -> AnyResult<RawFace4> {
    Ok(RawFace4 {
        vertices: r.read_packed()?,
        texture: r.read_packed()?,
        effects: if effects { r.read_packed()? } else { 0 },
    })
}

pub(crate) fn read_face3(r: &mut impl Read, effects: bool) -> AnyResult<RawFace3> {
    Ok(RawFace3 {
        vertices: r.read_packed()?,
        texture: r.read_packed()?,
        effects: if effects { r.read_packed()? } else { 0 },
    })
}

fn read_animation(r: &mut impl Read, p: &DecodeProfile) -> AnyResult<RawAnimation> {
    let frame_offset = r.read_packed()?;
    let frame_rate = r.read_packed()?;
    let frame_size = r.read_packed()?;
    let state_id = r.read_packed()?;
    let speed = r.read_packed()?;
    let accel = r.read_packed()?;
    let (speed_lateral, accel_lateral) = if p.extended_animations() {
        (r.read_packed()?, r.read_packed()?)
    } else {
        (0, 0)
    };

    Ok(RawAnimation {
        frame_offset,
        frame_rate,
        frame_size,
        state_id,
        speed,
        accel,
        speed_lateral,
        accel_lateral,
        frame_start: r.read_packed()?,
        frame_end: r.read_packed()?,
        next_animation: r.read_packed()?,
        next_frame: r.read_packed()?,
        num_state_changes: r.read_packed()?,
        state_change_offset: r.read_packed()?,
        num_anim_commands: r.read_packed()?,
        anim_command: r.read_packed()?,
    })
}

fn read_entity(r: &mut impl Read, p: &DecodeProfile) -> AnyResult<RawEntity> {
    let type_id = r.read_packed()?;
    let room = r.read_packed()?;
    let x = r.read_packed()?;
    let y = r.read_packed()?;
    let z = r.read_packed()?;
    let angle = r.read_packed()?;
    let intensity: i16 = r.read_packed()?;
    let intensity2 = if p.entity_has_intensity2() {
        r.read_packed()?
    } else {
        intensity
    };
    let ocb = if p.entity_has_ocb() { r.read_packed()? } else { 0 };

    Ok(RawEntity {
        type_id,
        room,
        x,
        y,
        z,
        angle,
        intensity,
        intensity2,
        ocb,
        flags: r.read_packed()?,
    })
}

fn read_box(r: &mut impl Read, p: &DecodeProfile) -> AnyResult<RawBox> {
    if p.compact_boxes() {
        // Byte-packed sector bounds.
        Ok(RawBox {
            z_min: r.read_u8()? as i32,
            z_max: r.read_u8()? as i32,
            x_min: r.read_u8()? as i32,
            x_max: r.read_u8()? as i32,
            true_floor: r.read_packed()?,
            overlap_index: r.read_packed()?,
        })
    } else {
        // World-unit bounds; normalize to sector units.
        Ok(RawBox {
            z_min: r.read_i32::<LE>()? / 1024,
            z_max: r.read_i32::<LE>()? / 1024,
            x_min: r.read_i32::<LE>()? / 1024,
            x_max: r.read_i32::<LE>()? / 1024,
            true_floor: r.read_packed()?,
            overlap_index: r.read_packed()?,
        })
    }
}

fn read_object_textures(
    r: &mut impl Read,
    p: &DecodeProfile,
    out: &mut Vec<RawObjectTexture>,
) -> AnyResult {
    let count = count_u32(r)?;
    for _ in 0..count {
        let attribute = r.read_packed()?;
        let tile_and_flags = r.read_packed()?;
        let new_flags = if p.tr4_plus() { r.read_packed()? } else { 0 };
        let uvs = r.read_packed()?;
        let bounds = if p.tr4_plus() { r.read_packed()? } else { [0; 4] };
        if p.format == LevelFormat::Tr5 {
            let _filler = r.read_u16::<LE>()?;
        }
        out.push(RawObjectTexture {
            attribute,
            tile_and_flags,
            new_flags,
            uvs,
            bounds,
        });
    }
    ok()
}

/// Walks the mesh pointer table and cuts individual meshes out of the mesh
/// buffer. Pointers are byte offsets into the buffer.
fn parse_meshes(
    mesh_data: &[u8],
    pointers: &[u32],
    p: &DecodeProfile,
) -> AnyResult<Vec<RawMesh>> {
    let mut meshes = Vec::with_capacity(pointers.len());

    for &pointer in pointers {
        let offset = pointer as usize;
        ensure!(
            offset < mesh_data.len() || mesh_data.is_empty(),
            "mesh pointer {offset:#x} outside the mesh buffer"
        );
        let mut r = Cursor::new(&mesh_data[offset.min(mesh_data.len())..]);

        let center = r.read_packed()?;
        let collision_radius = r.read_packed()?;

        let num_vertices = r.read_i16::<LE>()?;
        ensure!(num_vertices >= 0, "negative mesh vertex count");
        let vertices = r.read_packed_vec(num_vertices as usize)?;

        // Positive count: per-vertex normals. Negative: baked lights.
        let num_normals = r.read_i16::<LE>()?;
        let (normals, lights) = if num_normals >= 0 {
            (r.read_packed_vec(num_normals as usize)?, vec![])
        } else {
            (vec![], r.read_packed_vec(-num_normals as usize)?)
        };

        let effects = p.tr4_plus();
        let mut mesh = RawMesh {
            center,
            collision_radius,
            vertices,
            normals,
            lights,
            ..Default::default()
        };

        let count = read_face_count(&mut r)?;
        for _ in 0..count {
            mesh.textured_quads.push(read_face4(&mut r, effects)?);
        }
        let count = read_face_count(&mut r)?;
        for _ in 0..count {
            mesh.textured_tris.push(read_face3(&mut r, effects)?);
        }

        if !p.tr4_plus() {
            let count = read_face_count(&mut r)?;
            for _ in 0..count {
                mesh.colored_quads.push(read_face4(&mut r, false)?);
            }
            let count = read_face_count(&mut r)?;
            for _ in 0..count {
                mesh.colored_tris.push(read_face3(&mut r, false)?);
            }
        }

        meshes.push(mesh);
    }

    Ok(meshes)
}

fn read_face_count(r: &mut impl Read) -> AnyResult<usize> {
    let count = r.read_i16::<LE>()?;
    if count < 0 {
        bail!("negative mesh face count");
    }
    Ok(count as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn zlib_block_round_trips() {
        use flate2::{write::ZlibEncoder, Compression};
        use std::io::Write;
        use tomb_utils::PackedWriteExt;

        let payload: Vec<u8> = (0u8..200).collect();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&payload).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut block = vec![];
        block.write_packed(payload.len() as u32).unwrap();
        block.write_packed(compressed.len() as u32).unwrap();
        block.extend_from_slice(&compressed);

        let inflated = read_zlib_block(&mut Cursor::new(block)).unwrap();
        assert_eq!(inflated, payload);
    }

    #[test]
    pub fn mesh_buffer_parses_colored_faces() {
        use tomb_utils::PackedWriteExt;

        // One mesh: center, radius, 1 vertex, 1 normal, no textured faces,
        // one colored tri.
        let mut buffer = vec![];
        buffer.write_packed([1i16, 2, 3]).unwrap(); // center
        buffer.write_packed(100i32).unwrap(); // radius
        buffer.write_packed(1i16).unwrap();
        buffer.write_packed([0i16, 0, 0]).unwrap();
        buffer.write_packed(1i16).unwrap();
        buffer.write_packed([0i16, 1, 0]).unwrap();
        buffer.write_packed(0i16).unwrap(); // textured quads
        buffer.write_packed(0i16).unwrap(); // textured tris
        buffer.write_packed(0i16).unwrap(); // colored quads
        buffer.write_packed(1i16).unwrap(); // colored tris
        buffer.write_packed([0u16, 0, 0]).unwrap();
        buffer.write_packed(7u16).unwrap();

        let profile = DecodeProfile::new(LevelFormat::Tr1);
        let meshes = parse_meshes(&buffer, &[0], &profile).unwrap();
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].vertices.len(), 1);
        assert_eq!(meshes[0].colored_tris.len(), 1);
        assert_eq!(meshes[0].colored_tris[0].texture, 7);
    }
}
