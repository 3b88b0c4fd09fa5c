use crate::{ok, AnyResult};
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::{
    io::{Read, Write},
    mem::MaybeUninit,
};

/// Trait for reading and writing packed binary records, always assumed to be
/// little endian. Can be implemented with the [`tomb_proc::PackedData`] derive
/// macro, which processes struct fields in definition order.
pub trait PackedData: Sized + Clone {
    fn read_packed<R: Read>(r: &mut R) -> AnyResult<Self>;
    fn write_packed<W: Write>(&self, w: &mut W) -> AnyResult;
}

impl<T: PackedData, const N: usize> PackedData for [T; N] {
    fn read_packed<R: Read>(r: &mut R) -> AnyResult<Self> {
        // MaybeUninit workarounds, since several useful array initialization
        // functions aren't stabilized yet.
        unsafe {
            let mut array: [MaybeUninit<T>; N] = MaybeUninit::uninit().assume_init();

            for i in 0..N {
                match T::read_packed(r) {
                    Ok(value) => array[i].write(value),

                    // In case of an error, we need to manually drop initialized elements
                    Err(e) => {
                        for v in &mut array[0..i] {
                            v.assume_init_drop();
                        }
                        return Err(e);
                    }
                };
            }

            // Using this instead of transmute, as transmute has issues with generic arrays
            Ok(array.as_ptr().cast::<[T; N]>().read())
        }
    }

    fn write_packed<W: Write>(&self, w: &mut W) -> AnyResult {
        for value in self {
            value.write_packed(w)?;
        }
        ok()
    }
}

macro_rules! impl_data {
    ($type:ty, $r:ident, $reader:expr, $w:ident, $self:ident, $writer:expr) => {
        impl PackedData for $type {
            fn read_packed<R: Read>($r: &mut R) -> AnyResult<Self> {
                Ok($reader)
            }

            fn write_packed<W: Write>(&self, $w: &mut W) -> AnyResult {
                let $self = self;
                $writer;
                Ok(())
            }
        }
    };
}

impl_data!((), _r, (), _w, _value, ());
impl_data!(u8, r, r.read_u8()?, w, value, w.write_u8(*value)?);
impl_data!(i8, r, r.read_i8()?, w, value, w.write_i8(*value)?);
impl_data!(
    u16,
    r,
    r.read_u16::<LE>()?,
    w,
    value,
    w.write_u16::<LE>(*value)?
);
impl_data!(
    i16,
    r,
    r.read_i16::<LE>()?,
    w,
    value,
    w.write_i16::<LE>(*value)?
);
impl_data!(
    u32,
    r,
    r.read_u32::<LE>()?,
    w,
    value,
    w.write_u32::<LE>(*value)?
);
impl_data!(
    i32,
    r,
    r.read_i32::<LE>()?,
    w,
    value,
    w.write_i32::<LE>(*value)?
);
impl_data!(
    f32,
    r,
    r.read_f32::<LE>()?,
    w,
    value,
    w.write_f32::<LE>(*value)?
);

/// Trait with a `write_packed` wrapper method for any [`Write`] type, purely for clarity.
pub trait PackedWriteExt {
    /// Writes the specified [`PackedData`] object into this stream.
    fn write_packed(&mut self, t: impl PackedData) -> AnyResult;
}

impl<T: Write> PackedWriteExt for T {
    fn write_packed(&mut self, t: impl PackedData) -> AnyResult {
        t.write_packed(self)
    }
}

/// Trait with `read_packed` wrapper methods for any [`Read`] type, purely for clarity.
pub trait PackedReadExt {
    /// Reads the specified [`PackedData`] type from this stream.
    fn read_packed<T: PackedData>(&mut self) -> AnyResult<T>;

    /// Reads `count` consecutive [`PackedData`] records from this stream.
    fn read_packed_vec<T: PackedData>(&mut self, count: usize) -> AnyResult<Vec<T>>;
}

impl<T: Read> PackedReadExt for T {
    fn read_packed<R: PackedData>(&mut self) -> AnyResult<R> {
        R::read_packed(self)
    }

    fn read_packed_vec<R: PackedData>(&mut self, count: usize) -> AnyResult<Vec<R>> {
        let mut result = Vec::with_capacity(count.min(0x10000));
        for _ in 0..count {
            result.push(R::read_packed(self)?);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    pub fn primitives_round_trip() {
        let mut buffer = vec![];
        buffer.write_packed(0x1234u16).unwrap();
        buffer.write_packed(-5i8).unwrap();
        buffer.write_packed([1u32, 2, 3]).unwrap();

        let mut cursor = Cursor::new(buffer);
        assert_eq!(cursor.read_packed::<u16>().unwrap(), 0x1234);
        assert_eq!(cursor.read_packed::<i8>().unwrap(), -5);
        assert_eq!(cursor.read_packed::<[u32; 3]>().unwrap(), [1, 2, 3]);
    }

    #[test]
    pub fn vec_read_stops_at_count() {
        let mut cursor = Cursor::new([1u8, 2, 3, 4]);
        let values: Vec<u16> = cursor.read_packed_vec(2).unwrap();
        assert_eq!(values, [0x0201, 0x0403]);
    }
}
