//! Recoverable load conditions.

use thiserror::Error;

/// A condition the pipeline recovered from. Warnings are accumulated in
/// build order and returned alongside the finished world; none of them
/// aborts a load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Warning {
    /// A build stage referenced an object that does not exist; the referring
    /// object was dropped.
    #[error("dangling {kind} reference {index}, object dropped")]
    DanglingReference { kind: &'static str, index: u32 },

    /// The floor data interpreter met an unrecognized function and skipped
    /// it with its operand.
    #[error("unknown floor data function {function:#04x} at index {fd_index}")]
    UnknownOpcode { function: u8, fd_index: u16 },

    /// No collision geometry could be derived for a sector; it is left
    /// non-colliding.
    #[error("no collision geometry for sector {sector} of room {room}")]
    GeometryDerivation { room: u16, sector: u32 },
}
