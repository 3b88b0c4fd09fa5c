//! Various utilities shared across the level pipeline crates.

pub mod packed;

pub use packed::{PackedData, PackedReadExt, PackedWriteExt};

pub type AnyResult<T = (), E = anyhow::Error> = anyhow::Result<T, E>;

/// Shorthand for `Ok(())`, cause it looks ugly
pub const fn ok<E>() -> Result<(), E> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn ok_shorthand() {
        let result: Result<(), u32> = ok();
        assert_eq!(result, Ok(()));
    }
}
