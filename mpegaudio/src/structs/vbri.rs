//! Fraunhofer VBRI summary header.
//!
//! Unlike Xing, VBRI always sits 32 bytes after the frame header, so the
//! block handed to [`VbriHeader::parse`] starts at the marker.
//!
//! ```text
//! +0  "VBRI"
//! +4  version (u16)
//! +6  delay (u16)
//! +8  quality (u16)
//! +10 total bytes (u32)
//! +14 total frames (u32)
//! ```

use crate::structs::xing::read_u32_be;
use crate::utils::errors::VbriError;

/// Offset of the VBRI block from the start of the frame.
pub const VBRI_OFFSET: u64 = 4 + 32;

const MIN_HEADER_LEN: usize = 18;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VbriHeader {
    pub version: u16,
    pub quality: u16,
    pub total_frames: u32,
    /// Stream size in bytes.
    pub total_size: u32,
}

impl VbriHeader {
    pub fn parse(data: &[u8]) -> Result<Self, VbriError> {
        if !data.starts_with(b"VBRI") {
            return Err(VbriError::MarkerNotFound);
        }

        if data.len() < MIN_HEADER_LEN {
            return Err(VbriError::TooShort(data.len()));
        }

        Ok(Self {
            version: u16::from_be_bytes([data[4], data[5]]),
            quality: u16::from_be_bytes([data[8], data[9]]),
            total_size: read_u32_be(data, 10),
            total_frames: read_u32_be(data, 14),
        })
    }
}

#[test]
fn frame_and_byte_counts() -> Result<(), VbriError> {
    use crate::process::fixtures::vbri_block;

    let vbri = VbriHeader::parse(&vbri_block(2000, 500000))?;
    assert_eq!(vbri.version, 1);
    assert_eq!(vbri.quality, 75);
    assert_eq!(vbri.total_size, 500000);
    assert_eq!(vbri.total_frames, 2000);
    Ok(())
}

#[test]
fn marker_and_length() {
    assert!(matches!(
        VbriHeader::parse(b"XBRI\0\0\0\0\0\0\0\0\0\0\0\0\0\0"),
        Err(VbriError::MarkerNotFound)
    ));
    assert!(matches!(
        VbriHeader::parse(b"VBRI\0\x01"),
        Err(VbriError::TooShort(6))
    ));
    assert!(matches!(
        VbriHeader::parse(&[]),
        Err(VbriError::MarkerNotFound)
    ));
}
