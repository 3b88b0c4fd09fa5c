//! The format-agnostic intermediate representation.
//!
//! Every record here still carries the raw indices the file used; nothing is
//! resolved into ownership yet. Field widths are the widest any generation
//! uses; older generations fill the extra fields with neutral values when
//! decoded (see [`crate::decode`]).
//!
//! Flat records derive [`PackedData`] and decode field-by-field, little
//! endian, no padding.

use tomb_proc::PackedData;

/// Side length of one square texture page, in pixels.
pub const TEXTILE_SIZE: usize = 256;
/// Pixels per texture page.
pub const TEXTILE_PIXELS: usize = TEXTILE_SIZE * TEXTILE_SIZE;
/// Shading table dimensions carried by the palettized generations.
pub const LIGHTMAP_LEN: usize = 32 * 256;
/// Palette entries of the 8-bit generations.
pub const PALETTE_LEN: usize = 256;

/// Decode result of a whole level file. Section order in this struct follows
/// the on-disk order of the classic generations. The detected format tag
/// travels separately; see [`crate::read_level_file`].
#[derive(Debug, Clone, Default)]
pub struct LevelData {
    // Texture pages. 8-bit pages index the palette, 16-bit pages are
    // A1R5G5B5, 32-bit pages (decompressed from zlib in TR4/5) are ARGB.
    pub palette: Vec<[u8; 3]>,
    pub palette16: Vec<[u8; 4]>,
    pub textiles8: Vec<Vec<u8>>,
    pub textiles16: Vec<Vec<u16>>,
    pub textiles32: Vec<Vec<u32>>,

    pub rooms: Vec<RawRoom>,
    pub floor_data: Vec<u16>,

    pub mesh_data: Vec<u8>,
    pub mesh_pointers: Vec<u32>,
    pub meshes: Vec<RawMesh>,

    pub animations: Vec<RawAnimation>,
    pub state_changes: Vec<RawStateChange>,
    pub anim_dispatches: Vec<RawAnimDispatch>,
    pub anim_commands: Vec<i16>,
    pub mesh_trees: Vec<i32>,
    pub frames: Vec<u16>,
    pub models: Vec<RawModel>,

    pub static_meshes: Vec<RawStaticMesh>,
    pub object_textures: Vec<RawObjectTexture>,
    pub sprite_textures: Vec<RawSpriteTexture>,
    pub sprite_sequences: Vec<RawSpriteSequence>,

    pub cameras: Vec<RawCamera>,
    pub flyby_cameras: Vec<RawFlybyCamera>,
    pub sound_sources: Vec<RawSoundSource>,

    pub boxes: Vec<RawBox>,
    pub overlaps: Vec<u16>,
    pub zones: Vec<i16>,

    pub animated_textures: Vec<u16>,
    pub entities: Vec<RawEntity>,
    pub ai_objects: Vec<RawAiObject>,

    pub lightmap: Vec<u8>,
    pub cinematic_frames: Vec<RawCinematicFrame>,
    pub demo_data: Vec<u8>,

    pub soundmap: Vec<i16>,
    pub sound_details: Vec<RawSoundDetails>,
    pub samples: Vec<RawSample>,
    pub sample_indices: Vec<u32>,
}

/// One room, still with raw portal/sector/alternate indices.
#[derive(Debug, Clone, Default)]
pub struct RawRoom {
    pub x: i32,
    pub z: i32,
    pub y_bottom: i32,
    pub y_top: i32,

    pub vertices: Vec<RawRoomVertex>,
    pub quads: Vec<RawFace4>,
    pub tris: Vec<RawFace3>,
    pub sprites: Vec<RawRoomSprite>,

    pub portals: Vec<RawPortal>,
    pub num_z_sectors: u16,
    pub num_x_sectors: u16,
    pub sectors: Vec<RawSector>,

    pub ambient_intensity: i16,
    pub lights: Vec<RawLight>,
    pub static_meshes: Vec<RawRoomStaticMesh>,

    pub alternate_room: i16,
    pub alternate_group: u8,
    pub flags: u16,
    pub water_scheme: u8,
    pub reverb: u8,
}

#[derive(Debug, Clone, Default)]
pub struct RawRoomVertex {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub lighting: i16,
    /// TR2+; zero for the first generation.
    pub attributes: u16,
    /// TR2+; mirrors `lighting` for the first generation.
    pub lighting2: i16,
}

#[derive(Debug, Clone, Default)]
pub struct RawFace4 {
    pub vertices: [u16; 4],
    pub texture: u16,
    /// TR4+ mesh face lighting effects; zero elsewhere.
    pub effects: u16,
}

#[derive(Debug, Clone, Default)]
pub struct RawFace3 {
    pub vertices: [u16; 3],
    pub texture: u16,
    pub effects: u16,
}

#[derive(Debug, Clone, Copy, PackedData)]
pub struct RawRoomSprite {
    pub vertex: u16,
    pub texture: u16,
}

#[derive(Debug, Clone, Copy, PackedData)]
pub struct RawPortal {
    pub adjoining_room: u16,
    pub normal: [i16; 3],
    pub vertices: [[i16; 3]; 4],
}

/// One grid cell as stored on disk. `floor`/`ceiling` are quantized in steps
/// of 256 world units; 0x81 floor marks an impassable wall column.
#[derive(Debug, Clone, Copy, PackedData)]
pub struct RawSector {
    pub fd_index: u16,
    pub box_index: u16,
    pub room_below: u8,
    pub floor: i8,
    pub room_above: u8,
    pub ceiling: i8,
}

pub const NO_ROOM: u8 = 0xFF;

/// Room light. Only position is format-agnostic; the rest of the record
/// varies per generation and is kept raw for the collaborators that care.
#[derive(Debug, Clone)]
pub struct RawLight {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct RawRoomStaticMesh {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub rotation: u16,
    pub intensity: u16,
    /// TR2+; mirrors `intensity` for the first generation.
    pub intensity2: u16,
    pub static_mesh_id: u16,
}

/// One mesh pulled out of the mesh buffer.
#[derive(Debug, Clone, Default)]
pub struct RawMesh {
    pub center: [i16; 3],
    pub collision_radius: i32,
    pub vertices: Vec<[i16; 3]>,
    /// Either per-vertex normals...
    pub normals: Vec<[i16; 3]>,
    /// ...or per-vertex baked lights, never both.
    pub lights: Vec<i16>,
    pub textured_quads: Vec<RawFace4>,
    pub textured_tris: Vec<RawFace3>,
    pub colored_quads: Vec<RawFace4>,
    pub colored_tris: Vec<RawFace3>,
}

#[derive(Debug, Clone, Default)]
pub struct RawAnimation {
    pub frame_offset: u32,
    pub frame_rate: u8,
    pub frame_size: u8,
    pub state_id: u16,
    pub speed: i32,
    pub accel: i32,
    /// TR4+ lateral movement; zero elsewhere.
    pub speed_lateral: i32,
    pub accel_lateral: i32,
    pub frame_start: u16,
    pub frame_end: u16,
    pub next_animation: u16,
    pub next_frame: u16,
    pub num_state_changes: u16,
    pub state_change_offset: u16,
    pub num_anim_commands: u16,
    pub anim_command: u16,
}

#[derive(Debug, Clone, Copy, PackedData)]
pub struct RawStateChange {
    pub state_id: u16,
    pub num_anim_dispatches: u16,
    pub anim_dispatch: u16,
}

#[derive(Debug, Clone, Copy, PackedData)]
pub struct RawAnimDispatch {
    pub low: i16,
    pub high: i16,
    pub next_animation: i16,
    pub next_frame: i16,
}

/// Skeletal model definition ("moveable" in the original terminology).
#[derive(Debug, Clone, Copy, PackedData)]
pub struct RawModel {
    pub id: u32,
    pub num_meshes: u16,
    pub starting_mesh: u16,
    pub mesh_tree_index: u32,
    pub frame_offset: u32,
    pub animation_index: u16,
}

#[derive(Debug, Clone, Copy, PackedData)]
pub struct RawStaticMesh {
    pub id: u32,
    pub mesh: u16,
    pub visibility_box: [[i16; 2]; 3],
    pub collision_box: [[i16; 2]; 3],
    pub flags: u16,
}

/// Texture region inside an atlas page. The classic generations store
/// four (coordinate, pixel) byte pairs per corner; the later ones add a
/// bounding rectangle which is kept here when present.
#[derive(Debug, Clone, Default)]
pub struct RawObjectTexture {
    pub attribute: u16,
    pub tile_and_flags: u16,
    pub new_flags: u16,
    pub uvs: [[u8; 4]; 4],
    pub bounds: [u32; 4],
}

#[derive(Debug, Clone, Copy, PackedData)]
pub struct RawSpriteTexture {
    pub tile: u16,
    pub x: u8,
    pub y: u8,
    pub width: u16,
    pub height: u16,
    pub left_side: i16,
    pub top_side: i16,
    pub right_side: i16,
    pub bottom_side: i16,
}

#[derive(Debug, Clone, Copy, PackedData)]
pub struct RawSpriteSequence {
    pub id: i32,
    pub negative_length: i16,
    pub offset: i16,
}

#[derive(Debug, Clone, Copy, PackedData)]
pub struct RawCamera {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub room: i16,
    pub flags: u16,
}

/// TR4+ cinematic camera path node.
#[derive(Debug, Clone, Copy, PackedData)]
pub struct RawFlybyCamera {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub dx: i32,
    pub dy: i32,
    pub dz: i32,
    pub sequence: u8,
    pub index: u8,
    pub fov: u16,
    pub roll: u16,
    pub timer: u16,
    pub speed: u16,
    pub flags: u16,
    pub room_id: u32,
}

#[derive(Debug, Clone, Copy, PackedData)]
pub struct RawSoundSource {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub sound_id: u16,
    pub flags: u16,
}

/// Pathfinding box. The first generation stores sector-scaled i32 bounds;
/// later generations pack them into bytes. Bounds here are normalized to
/// sector units.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBox {
    pub z_min: i32,
    pub z_max: i32,
    pub x_min: i32,
    pub x_max: i32,
    pub true_floor: i16,
    pub overlap_index: u16,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RawEntity {
    pub type_id: i16,
    pub room: i16,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub angle: i16,
    pub intensity: i16,
    /// TR2/TR3 second intensity; mirrors `intensity` elsewhere.
    pub intensity2: i16,
    /// TR4+ object code bits; zero elsewhere.
    pub ocb: u16,
    pub flags: u16,
}

#[derive(Debug, Clone, Copy, PackedData)]
pub struct RawAiObject {
    pub type_id: u16,
    pub room: u16,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub ocb: u16,
    pub flags: u16,
    pub angle: i32,
}

#[derive(Debug, Clone, Copy, PackedData)]
pub struct RawCinematicFrame {
    pub target_x: i16,
    pub target_y: i16,
    pub target_z: i16,
    pub pos_x: i16,
    pub pos_y: i16,
    pub pos_z: i16,
    pub fov: i16,
    pub roll: i16,
}

#[derive(Debug, Clone, Copy, PackedData)]
pub struct RawSoundDetails {
    pub sample: u16,
    pub volume: u16,
    pub chance: u16,
    pub characteristics: u16,
}

/// Embedded audio sample (TR1 stores raw WAV blobs in-file, TR4/5 store
/// zlib-compressed blobs which are inflated during decode).
#[derive(Debug, Clone, Default)]
pub struct RawSample {
    pub data: Vec<u8>,
}
