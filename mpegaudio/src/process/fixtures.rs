//! In-memory streams for tests.

use std::io::Cursor;

use crate::process::stream::MpegReader;
use crate::structs::header::FrameHeader;

/// MPEG-1 Layer III, 128 kbps, 44.1 kHz, stereo, unprotected. 417-byte frames.
pub(crate) const MPEG1_L3_128K: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];

/// A frame carrying `header` followed by a zeroed body.
pub(crate) fn frame(header: [u8; 4]) -> Vec<u8> {
    let len = FrameHeader::parse(&header).map_or(4, |header| header.frame_length as usize);

    let mut data = vec![0u8; len];
    data[..4].copy_from_slice(&header);
    data
}

pub(crate) fn xing_block(
    marker: &[u8; 4],
    flags: u8,
    frames: u32,
    size: u32,
    lame: Option<(u16, u16)>,
) -> Vec<u8> {
    let mut data = marker.to_vec();
    data.extend_from_slice(&(flags as u32).to_be_bytes());
    data.extend_from_slice(&frames.to_be_bytes());
    data.extend_from_slice(&size.to_be_bytes());

    if let Some((start, end)) = lame {
        data.resize(120, 0);
        data.extend_from_slice(b"LAME3.100");
        data.resize(141, 0);
        data.push((start >> 4) as u8);
        data.push((((start & 0xF) << 4) | (end >> 8)) as u8);
        data.push(end as u8);
    }

    data
}

pub(crate) fn vbri_block(frames: u32, size: u32) -> Vec<u8> {
    let mut data = b"VBRI".to_vec();
    data.extend_from_slice(&1u16.to_be_bytes());
    data.extend_from_slice(&0u16.to_be_bytes());
    data.extend_from_slice(&75u16.to_be_bytes());
    data.extend_from_slice(&size.to_be_bytes());
    data.extend_from_slice(&frames.to_be_bytes());
    data.extend_from_slice(&[0u8; 8]);
    data
}

#[derive(Default)]
pub(crate) struct StreamBuilder {
    data: Vec<u8>,
}

impl StreamBuilder {
    pub(crate) fn raw(mut self, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(bytes);
        self
    }

    pub(crate) fn frames(mut self, header: [u8; 4], count: usize) -> Self {
        for _ in 0..count {
            self.data.extend(frame(header));
        }
        self
    }

    /// One frame with `payload` written `offset` bytes into it.
    pub(crate) fn frame_with(mut self, header: [u8; 4], offset: usize, payload: &[u8]) -> Self {
        let mut data = frame(header);
        data[offset..offset + payload.len()].copy_from_slice(payload);
        self.data.extend(data);
        self
    }

    pub(crate) fn id3v2(mut self, payload: u32, footer: bool) -> Self {
        self.data.extend_from_slice(b"ID3\x04\x00");
        self.data.push(if footer { 0x10 } else { 0x00 });
        self.data.extend_from_slice(&[
            ((payload >> 21) & 0x7F) as u8,
            ((payload >> 14) & 0x7F) as u8,
            ((payload >> 7) & 0x7F) as u8,
            (payload & 0x7F) as u8,
        ]);
        self.data.resize(self.data.len() + payload as usize, 0);
        if footer {
            self.data.extend_from_slice(b"3DI\x04\x00\x10\x00\x00\x00\x00");
        }
        self
    }

    pub(crate) fn ape(mut self, header: bool) -> Self {
        let flags: u32 = if header { 0x8000_0000 } else { 0 };
        let block = |is_header: u32| {
            let mut block = b"APETAGEX".to_vec();
            block.extend_from_slice(&2000u32.to_le_bytes());
            block.extend_from_slice(&32u32.to_le_bytes());
            block.extend_from_slice(&0u32.to_le_bytes());
            block.extend_from_slice(&(flags | is_header).to_le_bytes());
            block.extend_from_slice(&[0u8; 8]);
            block
        };

        if header {
            self.data.extend(block(0x2000_0000));
        }
        self.data.extend(block(0));
        self
    }

    pub(crate) fn id3v1(mut self) -> Self {
        let mut tag = b"TAG".to_vec();
        tag.resize(128, 0);
        self.data.extend(tag);
        self
    }

    pub(crate) fn build(self) -> MpegReader<Cursor<Vec<u8>>> {
        MpegReader::new(Cursor::new(self.data)).expect("in-memory stream")
    }
}
