//! The per-sector floor data interpreter.
//!
//! Floor data is a shared block of u16 words; each sector points into it
//! with `fd_index`. Records are opcode-tagged and chained by a continuation
//! bit, so decoding is a linear scan with no length prefix. [`FdReader`]
//! exposes that scan as an iterator; [`translate_floor_data`] folds the
//! records into the sector's derived attributes.
//!
//! Translation resets every derived attribute up front, so running it again
//! on the same block reproduces the same sector state.

use crate::room::{
    DiagonalType, PenetrationConfig, RoomSector, SectorFlags, Trigger, TriggerAction,
    METERING_STEP,
};
use crate::warning::Warning;
use log::warn;

const FUNC_PORTAL: u8 = 0x01;
const FUNC_FLOOR_SLANT: u8 = 0x02;
const FUNC_CEILING_SLANT: u8 = 0x03;
const FUNC_TRIGGER: u8 = 0x04;
const FUNC_KILL: u8 = 0x05;
const FUNC_CLIMB: u8 = 0x06;
const FUNC_FLOOR_TRI_NW: u8 = 0x07;
const FUNC_CEILING_TRI_NE_PORTAL_NW: u8 = 0x12;
const FUNC_MONKEYSWING: u8 = 0x13;
const FUNC_MINECART_LEFT: u8 = 0x14;
const FUNC_MINECART_RIGHT: u8 = 0x15;

/// One decoded floor data record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FdRecord {
    Portal {
        to_room: u16,
    },
    FloorSlant {
        x: i8,
        z: i8,
    },
    CeilingSlant {
        x: i8,
        z: i8,
    },
    Trigger(Trigger),
    Kill,
    Climb {
        directions: SectorFlags,
    },
    /// TR3+ triangulated sector surface. `function` distinguishes floor from
    /// ceiling, split orientation, and which half carries a portal.
    Triangulation {
        function: u8,
        corners: [u8; 4],
    },
    MonkeySwing,
    MinecartLeft,
    MinecartRight,
    /// Unrecognized function; one operand-free word was skipped.
    Unknown {
        function: u8,
    },
}

/// Restartable scan over one sector's floor data chain.
pub struct FdReader<'a> {
    block: &'a [u16],
    pos: usize,
    done: bool,
}

impl<'a> FdReader<'a> {
    /// `fd_index` 0 means "no floor data" by convention.
    pub fn new(block: &'a [u16], fd_index: u16) -> Self {
        Self {
            block,
            pos: fd_index as usize,
            done: fd_index == 0,
        }
    }

    fn word(&mut self) -> Option<u16> {
        let value = self.block.get(self.pos).copied();
        self.pos += 1;
        value
    }
}

impl Iterator for FdReader<'_> {
    type Item = FdRecord;

    fn next(&mut self) -> Option<FdRecord> {
        if self.done {
            return None;
        }
        let header = self.word()?;
        self.done = header & 0x8000 != 0;
        let function = (header & 0x001F) as u8;
        let sub_function = ((header & 0x7F00) >> 8) as u8;

        Some(match function {
            FUNC_PORTAL => FdRecord::Portal {
                to_room: self.word()?,
            },
            FUNC_FLOOR_SLANT | FUNC_CEILING_SLANT => {
                let raw = self.word()?;
                let x = (raw & 0x00FF) as u8 as i8;
                let z = ((raw & 0xFF00) >> 8) as u8 as i8;
                if function == FUNC_FLOOR_SLANT {
                    FdRecord::FloorSlant { x, z }
                } else {
                    FdRecord::CeilingSlant { x, z }
                }
            }
            FUNC_TRIGGER => {
                let setup = self.word()?;
                let mut trigger = Trigger {
                    kind: sub_function,
                    timer: (setup & 0x00FF) as u8 as i8,
                    one_shot: setup & 0x0100 != 0,
                    mask: ((setup & 0x3E00) >> 9) as u8,
                    actions: vec![],
                };
                loop {
                    let Some(word) = self.word() else { break };
                    let (action, extra) = decode_action(word, || self.block.get(self.pos).copied());
                    // Two-word actions carry the chain terminator on their
                    // operand word, not the action word itself.
                    let last = if extra {
                        self.word().map_or(true, |operand| operand & 0x8000 != 0)
                    } else {
                        word & 0x8000 != 0
                    };
                    trigger.actions.push(action);
                    if last {
                        break;
                    }
                }
                FdRecord::Trigger(trigger)
            }
            FUNC_KILL => FdRecord::Kill,
            FUNC_CLIMB => {
                let mut directions = SectorFlags::empty();
                for (bit, flag) in [
                    (0x01, SectorFlags::CLIMB_NORTH),
                    (0x02, SectorFlags::CLIMB_EAST),
                    (0x04, SectorFlags::CLIMB_SOUTH),
                    (0x08, SectorFlags::CLIMB_WEST),
                ] {
                    if sub_function & bit != 0 {
                        directions |= flag;
                    }
                }
                FdRecord::Climb { directions }
            }
            FUNC_FLOOR_TRI_NW..=FUNC_CEILING_TRI_NE_PORTAL_NW => {
                let slope = self.word()?;
                FdRecord::Triangulation {
                    function,
                    corners: [
                        (slope & 0x000F) as u8,
                        ((slope & 0x00F0) >> 4) as u8,
                        ((slope & 0x0F00) >> 8) as u8,
                        ((slope & 0xF000) >> 12) as u8,
                    ],
                }
            }
            FUNC_MONKEYSWING => FdRecord::MonkeySwing,
            FUNC_MINECART_LEFT => FdRecord::MinecartLeft,
            FUNC_MINECART_RIGHT => FdRecord::MinecartRight,
            other => {
                // Vendor extensions carry one operand word; skip it.
                let _ = self.word();
                FdRecord::Unknown { function: other }
            }
        })
    }
}

/// Decodes one trigger action word. Returns the action and whether an extra
/// operand word belongs to it (cameras and flybys carry one).
fn decode_action(word: u16, peek: impl FnOnce() -> Option<u16>) -> (TriggerAction, bool) {
    let function = ((word & 0x7C00) >> 10) as u8;
    let operand = word & 0x03FF;

    match function {
        0 => (TriggerAction::Object { id: operand }, false),
        1 => {
            let setup = peek().unwrap_or(0);
            (
                TriggerAction::Camera {
                    id: operand,
                    timer: (setup & 0x00FF) as u8,
                    once: setup & 0x0100 != 0,
                    zoom: setup & 0x1000 != 0,
                },
                true,
            )
        }
        2 => (TriggerAction::UnderwaterCurrent { id: operand }, false),
        3 => (TriggerAction::FlipMap { group: operand }, false),
        4 => (TriggerAction::FlipOn { group: operand }, false),
        5 => (TriggerAction::FlipOff { group: operand }, false),
        6 => (TriggerAction::LookAt { id: operand }, false),
        7 => (TriggerAction::EndLevel { to: operand }, false),
        8 => (TriggerAction::PlayTrack { track: operand }, false),
        9 => (TriggerAction::FlipEffect { effect: operand }, false),
        10 => (TriggerAction::Secret { id: operand }, false),
        11 => (TriggerAction::ClearBodies, false),
        12 => {
            let setup = peek().unwrap_or(0);
            (
                TriggerAction::Flyby {
                    sequence: operand,
                    once: setup & 0x0100 != 0,
                },
                true,
            )
        }
        _ => (TriggerAction::Cutscene { id: operand }, false),
    }
}

/// Folds a sector's floor data chain into its derived attributes. Safe to
/// run repeatedly; derived state is rebuilt from scratch each call.
pub fn translate_floor_data(
    sector: &mut RoomSector,
    block: &[u16],
    warnings: &mut Vec<Warning>,
) {
    // Reset everything this pass derives. Corner heights were seeded from
    // the base floor/ceiling by the room builder and are re-seeded here.
    sector.flags = SectorFlags::empty();
    sector.triggers.clear();
    sector.portal_to_room = None;
    sector.floor_diagonal = DiagonalType::None;
    sector.ceiling_diagonal = DiagonalType::None;
    sector.floor_corners = [sector.floor; 4];
    sector.ceiling_corners = [sector.ceiling; 4];
    if sector.floor_penetration != PenetrationConfig::Wall
        && sector.floor_penetration != PenetrationConfig::Ghost
    {
        sector.floor_penetration = PenetrationConfig::Solid;
    }
    if sector.ceiling_penetration != PenetrationConfig::Wall
        && sector.ceiling_penetration != PenetrationConfig::Ghost
    {
        sector.ceiling_penetration = PenetrationConfig::Solid;
    }

    for record in FdReader::new(block, sector.fd_index) {
        match record {
            FdRecord::Portal { to_room } => sector.portal_to_room = Some(to_room),
            FdRecord::FloorSlant { x, z } => apply_floor_slant(sector, x as i32, z as i32),
            FdRecord::CeilingSlant { x, z } => apply_ceiling_slant(sector, x as i32, z as i32),
            FdRecord::Trigger(trigger) => sector.triggers.push(trigger),
            FdRecord::Kill => sector.flags |= SectorFlags::DEATH,
            FdRecord::Climb { directions } => sector.flags |= directions,
            FdRecord::Triangulation { function, corners } => {
                apply_triangulation(sector, function, corners)
            }
            FdRecord::MonkeySwing => sector.flags |= SectorFlags::MONKEYSWING,
            FdRecord::MinecartLeft => sector.flags |= SectorFlags::MINECART_LEFT,
            FdRecord::MinecartRight => sector.flags |= SectorFlags::MINECART_RIGHT,
            FdRecord::Unknown { function } => {
                warn!(
                    "unknown floor data function {function:#04x} at index {}",
                    sector.fd_index
                );
                warnings.push(Warning::UnknownOpcode {
                    function,
                    fd_index: sector.fd_index,
                });
            }
        }
    }
}

/// Positive x lowers the `+x` corners, negative x the `-x` corners, so the
/// base floor stays the highest corner. Same scheme along z.
fn apply_floor_slant(sector: &mut RoomSector, x: i32, z: i32) {
    let c = &mut sector.floor_corners;
    if x > 0 {
        c[2] -= x * METERING_STEP;
        c[3] -= x * METERING_STEP;
    } else {
        c[0] += x * METERING_STEP;
        c[1] += x * METERING_STEP;
    }
    if z > 0 {
        c[1] -= z * METERING_STEP;
        c[2] -= z * METERING_STEP;
    } else {
        c[0] += z * METERING_STEP;
        c[3] += z * METERING_STEP;
    }
}

/// Mirror of the floor slant: slanted ceiling corners rise above the base,
/// which stays the lowest corner.
fn apply_ceiling_slant(sector: &mut RoomSector, x: i32, z: i32) {
    let c = &mut sector.ceiling_corners;
    if x > 0 {
        c[2] += x * METERING_STEP;
        c[3] += x * METERING_STEP;
    } else {
        c[0] -= x * METERING_STEP;
        c[1] -= x * METERING_STEP;
    }
    if z > 0 {
        c[1] += z * METERING_STEP;
        c[2] += z * METERING_STEP;
    } else {
        c[0] -= z * METERING_STEP;
        c[3] -= z * METERING_STEP;
    }
}

/// Largest of the four corner deltas, ties resolved by fixed corner order so
/// repeated runs agree.
pub fn biggest_corner(corners: [u8; 4]) -> u8 {
    corners.into_iter().fold(0, u8::max)
}

fn apply_triangulation(sector: &mut RoomSector, function: u8, corners: [u8; 4]) {
    let overall = biggest_corner(corners) as i32;
    let is_floor = matches!(function, 0x07 | 0x08 | 0x0B..=0x0E);

    if is_floor {
        for (corner, &delta) in sector.floor_corners.iter_mut().zip(&corners) {
            // The highest corner keeps the base height.
            *corner = sector.floor + (delta as i32 - overall) * METERING_STEP;
        }
        sector.floor_diagonal = match function {
            0x07 | 0x0B | 0x0C => DiagonalType::NorthWest,
            _ => DiagonalType::NorthEast,
        };
        sector.floor_penetration = match function {
            0x0B | 0x0D => PenetrationConfig::DoorVerticalA,
            0x0C | 0x0E => PenetrationConfig::DoorVerticalB,
            _ => sector.floor_penetration,
        };
    } else {
        for (corner, &delta) in sector.ceiling_corners.iter_mut().zip(&corners) {
            *corner = sector.ceiling + (overall - delta as i32) * METERING_STEP;
        }
        sector.ceiling_diagonal = match function {
            0x09 | 0x0F | 0x10 => DiagonalType::NorthWest,
            _ => DiagonalType::NorthEast,
        };
        sector.ceiling_penetration = match function {
            0x0F | 0x11 => PenetrationConfig::DoorVerticalA,
            0x10 | 0x12 => PenetrationConfig::DoorVerticalB,
            _ => sector.ceiling_penetration,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end(word: u16) -> u16 {
        word | 0x8000
    }

    fn flat_sector(fd_index: u16) -> RoomSector {
        RoomSector {
            floor: 0,
            ceiling: 2048,
            fd_index,
            ..Default::default()
        }
    }

    #[test]
    pub fn portal_and_kill_chain() {
        // Index 0 is reserved, so real chains start at 1.
        let block = [0u16, 0x0001, 7, end(0x0005)];
        let records: Vec<_> = FdReader::new(&block, 1).collect();
        assert_eq!(
            records,
            vec![FdRecord::Portal { to_room: 7 }, FdRecord::Kill]
        );
    }

    #[test]
    pub fn fd_index_zero_yields_nothing() {
        let block = [0u16, end(0x0005)];
        assert_eq!(FdReader::new(&block, 0).count(), 0);
    }

    #[test]
    pub fn slant_lowers_the_downhill_corners() {
        let block = [0u16, end(0x0002), 0x0003]; // x slant +3
        let mut sector = flat_sector(1);
        let mut warnings = vec![];
        translate_floor_data(&mut sector, &block, &mut warnings);

        assert_eq!(sector.floor_corners, [0, 0, -768, -768]);
        assert!(warnings.is_empty());
    }

    #[test]
    pub fn trigger_with_camera_action() {
        // Trigger header, setup word, object action, camera action with its
        // operand word carrying the chain-terminating bit.
        let block = [
            0u16,
            end(0x0004),
            0x001F,      // timer 31
            0x0000 | 5,  // activate object 5
            0x0400 | 2,  // camera 2
            end(0x0064), // camera operand: timer 100, last action
        ];
        let records: Vec<_> = FdReader::new(&block, 1).collect();
        assert_eq!(records.len(), 1);
        let FdRecord::Trigger(trigger) = &records[0] else {
            panic!("expected a trigger");
        };
        assert_eq!(trigger.timer, 31);
        assert_eq!(
            trigger.actions,
            vec![
                TriggerAction::Object { id: 5 },
                TriggerAction::Camera {
                    id: 2,
                    timer: 100,
                    once: false,
                    zoom: false
                },
            ]
        );
    }

    #[test]
    pub fn camera_operand_ends_the_chain_before_the_next_sector() {
        // A trigger ending on a camera action must stop at the camera's
        // operand word and leave the following sector's chain untouched.
        let block = [
            0u16,
            end(0x0004), // sector A: trigger
            0x0000,      // setup
            0x0400 | 2,  // camera 2
            end(0x0064), // camera operand, last action
            end(0x0005), // sector B: kill
        ];
        let a: Vec<_> = FdReader::new(&block, 1).collect();
        assert_eq!(a.len(), 1);
        let FdRecord::Trigger(trigger) = &a[0] else {
            panic!("expected a trigger");
        };
        assert_eq!(
            trigger.actions,
            vec![TriggerAction::Camera {
                id: 2,
                timer: 100,
                once: false,
                zoom: false
            }]
        );

        let b: Vec<_> = FdReader::new(&block, 5).collect();
        assert_eq!(b, vec![FdRecord::Kill]);
    }

    #[test]
    pub fn unknown_function_skips_operand_and_warns() {
        let block = [0u16, 0x001E, 0xBEEF, end(0x0005)];
        let mut sector = flat_sector(1);
        let mut warnings = vec![];
        translate_floor_data(&mut sector, &block, &mut warnings);

        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            warnings[0],
            Warning::UnknownOpcode {
                function: 0x1E,
                fd_index: 1
            }
        ));
        // The record after the unknown one still executed.
        assert!(sector.flags.contains(SectorFlags::DEATH));
    }

    #[test]
    pub fn translation_is_idempotent() {
        let block = [
            0u16,
            0x0002, // floor slant
            0x02FE, // x -2, z +2
            0x0006 | 0x0500, // climb north + south
            end(0x0013), // monkeyswing
        ];
        let mut sector = flat_sector(1);
        let mut warnings = vec![];
        translate_floor_data(&mut sector, &block, &mut warnings);
        let first = sector.clone();
        translate_floor_data(&mut sector, &block, &mut warnings);

        assert_eq!(sector.floor_corners, first.floor_corners);
        assert_eq!(sector.flags, first.flags);
        assert_eq!(sector.triggers, first.triggers);
        assert!(warnings.is_empty());
    }

    #[test]
    pub fn triangulation_sets_diagonal_and_corners() {
        // Floor triangle split NW, corner deltas 0,1,2,1.
        let block = [0u16, end(0x0007), 0x1210];
        let mut sector = flat_sector(1);
        let mut warnings = vec![];
        translate_floor_data(&mut sector, &block, &mut warnings);

        assert_eq!(sector.floor_diagonal, DiagonalType::NorthWest);
        assert_eq!(sector.floor_corners, [-512, -256, 0, -256]);
        assert_eq!(sector.floor_penetration, PenetrationConfig::Solid);
    }
}
