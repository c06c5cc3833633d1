//! Bitstream I/O utilities for header parsing.
//!
//! Thin wrapper over `bitstream_io` reading big-endian bit fields out of
//! frame headers and tag payloads.

use std::io;

use bitstream_io::{BigEndian, BitRead, BitReader, UnsignedInteger};

#[derive(Debug)]
pub struct BitstreamIoReader<R: io::Read + io::Seek> {
    bs: BitReader<R, BigEndian>,
}

pub type BsIoSliceReader<'a> = BitstreamIoReader<io::Cursor<&'a [u8]>>;

impl<R> BitstreamIoReader<R>
where
    R: io::Read + io::Seek,
{
    pub fn new(read: R) -> Self {
        Self {
            bs: BitReader::new(read),
        }
    }

    #[inline(always)]
    pub fn get(&mut self) -> io::Result<bool> {
        self.bs.read_bit()
    }

    #[inline(always)]
    pub fn get_n<I: UnsignedInteger>(&mut self, n: u32) -> io::Result<I> {
        match self.bs.read_unsigned_var(n) {
            Ok(val) => Ok(val),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "get_n({}): out of bounds bits at {}",
                    n,
                    self.bs.position_in_bits().unwrap_or(0)
                ),
            )),
            Err(e) => Err(e),
        }
    }
}

impl<'a> BsIoSliceReader<'a> {
    pub fn from_slice(buf: &'a [u8]) -> Self {
        Self::new(io::Cursor::new(buf))
    }
}

#[test]
fn read_fields_across_bytes() -> io::Result<()> {
    let mut reader = BsIoSliceReader::from_slice(&[0xFF, 0xFB, 0x90, 0x44]);

    assert_eq!(reader.get_n::<u16>(11)?, 0x7FF);
    assert_eq!(reader.get_n::<u8>(2)?, 0b11);
    assert_eq!(reader.get_n::<u8>(2)?, 0b01);
    assert!(reader.get()?);
    assert_eq!(reader.get_n::<u8>(4)?, 9);
    assert_eq!(reader.get_n::<u8>(4)?, 0);
    assert_eq!(reader.get_n::<u8>(2)?, 0b01);

    let err = reader.get_n::<u8>(8).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    Ok(())
}
