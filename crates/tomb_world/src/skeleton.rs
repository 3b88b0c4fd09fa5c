//! Skeletal models: joint hierarchies, animations and their command lists.

use glam::IVec3;
use log::warn;

/// One joint of a model's mesh tree. The first joint has no parent op.
#[derive(Debug, Clone, Copy)]
pub struct MeshTreeNode {
    /// Bit 0 pops the parent stack, bit 1 pushes it.
    pub flags: u32,
    /// Offset from the parent joint, Y-up.
    pub offset: IVec3,
}

/// Command attached to an animation, executed on a frame or on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimCommand {
    /// Shift the entity by the given offset when the animation ends.
    SetPosition(IVec3),
    /// Launch into a jump with vertical and horizontal speed.
    JumpDistance { vertical: i16, horizontal: i16 },
    EmptyHands,
    Kill,
    PlaySound { frame: i16, sound: i16 },
    FlipEffect { frame: i16, effect: i16 },
}

/// Decodes `count` commands from the shared command stream starting at
/// `offset`. A malformed stream ends the list early with a warning rather
/// than aborting; the commands decoded so far are kept.
pub fn decode_anim_commands(stream: &[i16], offset: usize, count: usize) -> Vec<AnimCommand> {
    let mut commands = Vec::with_capacity(count);
    let mut pos = offset;

    let mut word = |pos: &mut usize| -> Option<i16> {
        let value = stream.get(*pos).copied();
        *pos += 1;
        value
    };

    for _ in 0..count {
        let Some(opcode) = word(&mut pos) else { break };
        let command = match opcode {
            1 => {
                let (Some(x), Some(y), Some(z)) =
                    (word(&mut pos), word(&mut pos), word(&mut pos))
                else {
                    break;
                };
                // File is Y-down.
                Some(AnimCommand::SetPosition(IVec3::new(
                    x as i32, -y as i32, z as i32,
                )))
            }
            2 => {
                let (Some(vertical), Some(horizontal)) = (word(&mut pos), word(&mut pos))
                else {
                    break;
                };
                Some(AnimCommand::JumpDistance {
                    vertical,
                    horizontal,
                })
            }
            3 => Some(AnimCommand::EmptyHands),
            4 => Some(AnimCommand::Kill),
            5 => {
                let (Some(frame), Some(sound)) = (word(&mut pos), word(&mut pos)) else {
                    break;
                };
                Some(AnimCommand::PlaySound { frame, sound })
            }
            6 => {
                let (Some(frame), Some(effect)) = (word(&mut pos), word(&mut pos)) else {
                    break;
                };
                Some(AnimCommand::FlipEffect { frame, effect })
            }
            other => {
                warn!("unknown animation command {other} at stream offset {pos}");
                break;
            }
        };
        match command {
            Some(c) => commands.push(c),
            None => break,
        }
    }

    commands
}

/// Dispatch from one state to another within an animation's frame range.
#[derive(Debug, Clone, Copy)]
pub struct StateDispatch {
    pub frame_low: i16,
    pub frame_high: i16,
    pub next_animation: u16,
    pub next_frame: u16,
}

#[derive(Debug, Clone)]
pub struct StateChange {
    pub state_id: u16,
    pub dispatches: Vec<StateDispatch>,
}

#[derive(Debug, Clone, Default)]
pub struct Animation {
    pub state_id: u16,
    pub frame_rate: u8,
    pub frame_start: u16,
    pub frame_end: u16,
    /// Offset into the shared frame stream, in u16 words.
    pub frame_offset: u32,
    pub frame_size: u8,
    pub speed: i32,
    pub accel: i32,
    pub speed_lateral: i32,
    pub accel_lateral: i32,
    pub next_animation: u16,
    pub next_frame: u16,
    pub state_changes: Vec<StateChange>,
    pub commands: Vec<AnimCommand>,
}

/// A moveable: an id-keyed joint hierarchy with its animation set.
#[derive(Debug, Clone, Default)]
pub struct SkeletalModel {
    pub id: u32,
    /// Indices into the world mesh table, one per joint.
    pub meshes: Vec<u32>,
    pub mesh_tree: Vec<MeshTreeNode>,
    pub animations: Vec<Animation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn command_stream_decodes_operands() {
        let stream = [5i16, 12, 30, 1, 100, 256, -50, 4];
        let commands = decode_anim_commands(&stream, 0, 3);
        assert_eq!(
            commands,
            vec![
                AnimCommand::PlaySound {
                    frame: 12,
                    sound: 30
                },
                AnimCommand::SetPosition(IVec3::new(100, -256, -50)),
                AnimCommand::Kill,
            ]
        );
    }

    #[test]
    pub fn truncated_command_stream_stops_early() {
        // SetPosition promises three operands, stream carries one.
        let stream = [1i16, 100];
        let commands = decode_anim_commands(&stream, 0, 1);
        assert!(commands.is_empty());
    }

    #[test]
    pub fn unknown_command_ends_the_list() {
        let stream = [3i16, 99, 4];
        let commands = decode_anim_commands(&stream, 0, 3);
        assert_eq!(commands, vec![AnimCommand::EmptyHands]);
    }
}
