//! Xing/Info VBR summary header with optional LAME extension.
//!
//! Encoders write the summary into the side-information area of the first
//! frame. Its position depends on version and channel mode, so the marker is
//! searched for rather than read at a fixed offset.
//!
//! ```text
//! +0   "Xing" | "Info"
//! +4   flags (big-endian u32, bit 0 frames, bit 1 bytes, bit 2 TOC, bit 3 quality)
//! +8   total frames
//! +12  total bytes
//! +120 LAME encoder version (9 bytes, "LAME...")
//! +141 encoder delay (12 bits) | end padding (12 bits)
//! ```

use log::debug;

use crate::utils::errors::XingError;

const MIN_HEADER_LEN: usize = 16;
const LAME_OFFSET: usize = 120;
const LAME_VERSION_LEN: usize = 9;
const LAME_PADDING_OFFSET: usize = 141;
const LAME_HEADER_LEN: usize = LAME_PADDING_OFFSET + 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderType {
    /// Written for VBR streams.
    Xing,
    /// Written by LAME for CBR streams.
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LameTag {
    pub encoder: String,
    pub start_padding: u16,
    pub end_padding: u16,
}

impl LameTag {
    /// Decodes the tag from the block starting at "LAME", which must cover
    /// the padding field.
    fn read(data: &[u8]) -> Self {
        let encoder = String::from_utf8_lossy(&data[..LAME_VERSION_LEN])
            .trim_end_matches(['\0', ' '])
            .to_string();

        let padding = &data[LAME_PADDING_OFFSET - LAME_OFFSET..][..3];

        Self {
            encoder,
            start_padding: ((padding[0] as u16) << 4) | (padding[1] >> 4) as u16,
            end_padding: ((padding[1] as u16 & 0x0F) << 8) | padding[2] as u16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XingHeader {
    pub header_type: HeaderType,
    pub total_frames: u32,
    /// Stream size in bytes.
    pub total_size: u32,
    pub lame: Option<LameTag>,
}

impl XingHeader {
    /// Searches `data` for a Xing or Info marker and decodes the header after it.
    pub fn parse(data: &[u8]) -> Result<Self, XingError> {
        let (offset, header_type) = find(data, b"Xing")
            .map(|offset| (offset, HeaderType::Xing))
            .or_else(|| find(data, b"Info").map(|offset| (offset, HeaderType::Info)))
            .ok_or(XingError::MarkerNotFound)?;

        if data.len() < offset + MIN_HEADER_LEN {
            return Err(XingError::TooShort {
                offset,
                len: data.len(),
            });
        }

        let flags = data[offset + 7];
        if flags & 0x03 != 0x03 {
            return Err(XingError::MissingFields(flags));
        }

        let lame = if data.len() >= offset + LAME_HEADER_LEN
            && &data[offset + LAME_OFFSET..offset + LAME_OFFSET + 4] == b"LAME"
        {
            Some(LameTag::read(
                &data[offset + LAME_OFFSET..offset + LAME_HEADER_LEN],
            ))
        } else {
            None
        };

        let header = Self {
            header_type,
            total_frames: read_u32_be(data, offset + 8),
            total_size: read_u32_be(data, offset + 12),
            lame,
        };

        debug!(
            "{:?} header at {offset}: {} frames, {} bytes, LAME tag {}",
            header.header_type,
            header.total_frames,
            header.total_size,
            header.has_lame_tag()
        );

        Ok(header)
    }

    pub fn is_valid(&self) -> bool {
        self.total_frames > 0 && self.total_size > 0
    }

    pub fn has_lame_tag(&self) -> bool {
        self.lame.is_some()
    }

    /// Encoder delay in samples, zero without a LAME tag.
    pub fn start_padding(&self) -> u16 {
        self.lame.as_ref().map_or(0, |lame| lame.start_padding)
    }

    /// Encoder padding at the end in samples, zero without a LAME tag.
    pub fn end_padding(&self) -> u16 {
        self.lame.as_ref().map_or(0, |lame| lame.end_padding)
    }
}

fn find(data: &[u8], marker: &[u8; 4]) -> Option<usize> {
    data.windows(marker.len()).position(|window| window == marker)
}

pub(crate) fn read_u32_be(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}
