//! Entities, static placements, and the scripting collaborator seam.

use glam::Vec3;

/// Behavior metadata supplied by the scripting collaborator for one entity
/// type. The pipeline attaches it verbatim; interpretation is gameplay's
/// business.
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorDescriptor {
    pub name: String,
    pub pickup: bool,
    pub hit_points: i32,
}

/// Script-side lookup invoked once per entity during base item generation.
/// Types without an entry stay inert, which is not an error.
pub trait ScriptLookup {
    fn behavior(&self, entity_type_id: i16) -> Option<BehaviorDescriptor>;
}

/// Default pickup/behavior metadata attached during the base item pass.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseItem {
    pub behavior: BehaviorDescriptor,
}

/// A placed moveable instance.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: u32,
    pub type_id: i16,
    /// Id of the resolved skeletal model (same as `type_id` in practice,
    /// kept separately since the model table owns the geometry).
    pub model: u32,
    pub room: u16,
    pub position: Vec3,
    /// Yaw in degrees.
    pub angle: f32,
    pub shade: i16,
    pub ocb: u16,
    pub flags: u16,
    pub base_item: Option<BaseItem>,
}

/// Immutable scenery definition shared by its placements.
#[derive(Debug, Clone)]
pub struct StaticMeshDef {
    pub id: u32,
    /// Index into the world mesh table.
    pub mesh: u32,
    pub visibility_box: [Vec3; 2],
    pub collision_box: [Vec3; 2],
    pub flags: u16,
}

/// One placed instance of a static mesh definition, owned by its room.
#[derive(Debug, Clone)]
pub struct StaticMesh {
    pub def: u32,
    pub position: Vec3,
    pub angle: f32,
    pub shade: u16,
}

/// Converts the raw 16384-per-quarter-turn rotation field to degrees.
pub fn angle_from_raw(raw: i16) -> f32 {
    (raw as i32 as f32 / 16384.0) * 90.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn raw_angles_map_to_quarter_turns() {
        assert_eq!(angle_from_raw(0), 0.0);
        assert_eq!(angle_from_raw(16384), 90.0);
        assert_eq!(angle_from_raw(-16384), -90.0);
    }
}
