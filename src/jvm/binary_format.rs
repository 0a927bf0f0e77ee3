use byteorder::{BigEndian, WriteBytesExt};
use std::io::Result;

/// Big-endian encoding of the fixed-width values a class writer needs from this crate
///
/// Access flags and opcodes are written exactly as they appear in a class file, so a class writer
/// can stream them straight into its output buffer.
pub trait Serialize {
    /// Write the value to a binary output stream
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()>;
}

impl Serialize for u8 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(*self)
    }
}

macro_rules! big_endian {
    ($($int:ty => $write:ident),* $(,)?) => {
        $(
            impl Serialize for $int {
                fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
                    writer.$write::<BigEndian>(*self)
                }
            }
        )*
    };
}

big_endian!(
    u16 => write_u16,
    u32 => write_u32,
    i16 => write_i16,
    i32 => write_i32,
    i64 => write_i64,
);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn big_endian() {
        let mut bytes = vec![];
        0xcafeu16.serialize(&mut bytes).unwrap();
        (-2i32).serialize(&mut bytes).unwrap();
        7u8.serialize(&mut bytes).unwrap();
        assert_eq!(bytes, vec![0xca, 0xfe, 0xff, 0xff, 0xff, 0xfe, 0x07]);
    }
}
