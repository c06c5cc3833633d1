//! MPEG audio frame header.
//!
//! ## Layout
//!
//! ```text
//! AAAAAAAA AAABBCCD EEEEFFGH IIJJKLMM
//! ```
//!
//! - **A** (11): frame sync, all ones
//! - **B** (2): version (`00` 2.5, `01` reserved, `10` 2, `11` 1)
//! - **C** (2): layer (`00` reserved, `01` III, `10` II, `11` I)
//! - **D** (1): protection bit, `0` means a CRC follows the header
//! - **E** (4): bitrate index, `0` is free format and `15` is reserved
//! - **F** (2): sample rate index, `3` is reserved
//! - **G** (1): padding, **H** (1): private
//! - **I** (2): channel mode, **J** (2): mode extension
//! - **K** (1): copyright, **L** (1): original, **M** (2): emphasis

use std::fmt;

use crate::process::stream::MpegStream;
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::crc::CRC_MPEG_AUDIO;
use crate::utils::errors::HeaderError;

/// Bits that must stay constant between consecutive frames of one stream:
/// sync, version, layer and sample rate index.
pub const HEADER_MASK: u32 = 0xFF_FE_0C_00;

/// Bitrates in kbps, indexed by `[mpeg1 ? 0 : 1][layer - 1][bitrate index]`.
const BITRATES: [[[u32; 16]; 3]; 2] = [
    [
        [
            0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448, 0,
        ],
        [
            0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 0,
        ],
        [
            0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0,
        ],
    ],
    [
        [
            0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256, 0,
        ],
        [
            0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0,
        ],
        [
            0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0,
        ],
    ],
];

/// Padding slot size in bytes per layer.
const PADDING_SIZE: [u32; 3] = [4, 1, 1];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Version {
    #[default]
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

impl Version {
    fn sample_rates(self) -> [u32; 3] {
        match self {
            Version::Mpeg1 => [44100, 48000, 32000],
            Version::Mpeg2 => [22050, 24000, 16000],
            Version::Mpeg25 => [11025, 12000, 8000],
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Mpeg1 => write!(f, "1"),
            Version::Mpeg2 => write!(f, "2"),
            Version::Mpeg25 => write!(f, "2.5"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMode {
    #[default]
    Stereo,
    JointStereo,
    DualChannel,
    SingleChannel,
}

impl ChannelMode {
    fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            0 => ChannelMode::Stereo,
            1 => ChannelMode::JointStereo,
            2 => ChannelMode::DualChannel,
            _ => ChannelMode::SingleChannel,
        }
    }

    pub fn channels(self) -> u8 {
        if self == ChannelMode::SingleChannel {
            1
        } else {
            2
        }
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelMode::Stereo => write!(f, "Stereo"),
            ChannelMode::JointStereo => write!(f, "Joint stereo"),
            ChannelMode::DualChannel => write!(f, "Dual channel"),
            ChannelMode::SingleChannel => write!(f, "Single channel"),
        }
    }
}

/// Checks the two bytes at a candidate frame start.
///
/// A second byte of `0xFF` is rejected so runs of `0xFF` fill bytes are not
/// mistaken for frames. This also rejects MPEG-1 Layer I frames without CRC
/// (`0xFF 0xFF`), which [`FrameHeader::parse`] itself accepts; such streams
/// are never located by a scan.
#[inline(always)]
pub fn is_frame_sync(b0: u8, b1: u8) -> bool {
    b0 == 0xFF && b1 != 0xFF && b1 & 0xE0 == 0xE0
}

/// Decoded 4-byte frame header.
///
/// Only produced for headers whose sync, version, layer, bitrate index and
/// sample rate index are all usable; anything else is a [`HeaderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    bits: u32,
    pub version: Version,
    pub layer: u8,
    pub protection_enabled: bool,
    /// Bitrate in kbps.
    pub bitrate: u32,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    pub is_padded: bool,
    pub is_private: bool,
    pub channel_mode: ChannelMode,
    pub mode_extension: u8,
    pub is_copyrighted: bool,
    pub is_original: bool,
    pub emphasis: u8,
    /// Frame length in bytes including the header.
    pub frame_length: u32,
    pub samples_per_frame: u32,
}

impl FrameHeader {
    pub fn parse(data: &[u8]) -> Result<Self, HeaderError> {
        if data.len() < 4 {
            return Err(HeaderError::Truncated(data.len()));
        }

        let reader = &mut BsIoSliceReader::from_slice(&data[..4]);

        if reader.get_n::<u16>(11)? != 0x7FF {
            return Err(HeaderError::InvalidSync(u16::from_be_bytes([
                data[0], data[1],
            ])));
        }

        let version = match reader.get_n::<u8>(2)? {
            0 => Version::Mpeg25,
            2 => Version::Mpeg2,
            3 => Version::Mpeg1,
            _ => return Err(HeaderError::ReservedVersion),
        };

        let layer = match reader.get_n::<u8>(2)? {
            1 => 3,
            2 => 2,
            3 => 1,
            _ => return Err(HeaderError::ReservedLayer),
        };

        let protection_enabled = !reader.get()?;

        let bitrate_index = reader.get_n::<u8>(4)?;
        let table = if version == Version::Mpeg1 { 0 } else { 1 };
        let bitrate = BITRATES[table][layer as usize - 1][bitrate_index as usize];
        if bitrate == 0 {
            return Err(HeaderError::InvalidBitrateIndex(bitrate_index));
        }

        let sample_rate = match reader.get_n::<u8>(2)? {
            3 => return Err(HeaderError::ReservedSampleRate),
            index => version.sample_rates()[index as usize],
        };

        let is_padded = reader.get()?;
        let is_private = reader.get()?;
        let channel_mode = ChannelMode::from_bits(reader.get_n(2)?);
        let mode_extension = reader.get_n(2)?;
        let is_copyrighted = reader.get()?;
        let is_original = reader.get()?;
        let emphasis = reader.get_n(2)?;

        let samples_per_frame = match (layer, version) {
            (1, _) => 384,
            (2, _) | (3, Version::Mpeg1) => 1152,
            _ => 576,
        };

        let mut frame_length = samples_per_frame * bitrate * 125 / sample_rate;
        if is_padded {
            frame_length += PADDING_SIZE[layer as usize - 1];
        }

        if frame_length == 0 {
            return Err(HeaderError::ZeroFrameLength);
        }

        Ok(Self {
            bits: u32::from_be_bytes([data[0], data[1], data[2], data[3]]),
            version,
            layer,
            protection_enabled,
            bitrate,
            sample_rate,
            is_padded,
            is_private,
            channel_mode,
            mode_extension,
            is_copyrighted,
            is_original,
            emphasis,
            frame_length,
            samples_per_frame,
        })
    }

    /// Reads and decodes the header at `offset`.
    ///
    /// With `check_length` set, the frame must be followed by a header of the
    /// same stream at `offset + frame_length`, unless the frame runs up to the
    /// end of the audio data.
    pub fn read_from<S: MpegStream + ?Sized>(
        stream: &mut S,
        offset: u64,
        check_length: bool,
    ) -> Result<Self, HeaderError> {
        let header = Self::parse(&stream.read_block_at(offset, 4)?)?;

        if check_length {
            let next = offset + header.frame_length as u64;

            if next + 4 <= stream.audio_end()? {
                let data = stream.read_block_at(next, 4)?;
                if data.len() < 4 || !header.continues_into(&data) {
                    return Err(HeaderError::NextFrameMismatch(next));
                }
            }
        }

        Ok(header)
    }

    fn continues_into(&self, data: &[u8]) -> bool {
        let next = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        next & HEADER_MASK == self.bits & HEADER_MASK
    }

    /// Compares the fields that must agree between frames of one CBR stream.
    pub fn matches(&self, other: &FrameHeader) -> bool {
        self.version == other.version
            && self.layer == other.layer
            && self.sample_rate == other.sample_rate
            && self.channel_mode == other.channel_mode
            && self.is_copyrighted == other.is_copyrighted
            && self.is_original == other.is_original
    }

    pub fn channels(&self) -> u8 {
        self.channel_mode.channels()
    }

    /// Size of the Layer III side information following the header (and CRC).
    pub fn side_info_len(&self) -> Option<usize> {
        if self.layer != 3 {
            return None;
        }

        let mono = self.channel_mode == ChannelMode::SingleChannel;
        Some(match (self.version, mono) {
            (Version::Mpeg1, true) => 17,
            (Version::Mpeg1, false) => 32,
            (_, true) => 9,
            (_, false) => 17,
        })
    }

    /// Calculated and stored CRC of a protected Layer III frame.
    ///
    /// `frame` starts at the header and must cover the side information.
    pub fn crc(&self, frame: &[u8]) -> Option<(u16, u16)> {
        if !self.protection_enabled {
            return None;
        }

        let side_info_len = self.side_info_len()?;
        if frame.len() < 6 + side_info_len {
            return None;
        }

        let crc = &CRC_MPEG_AUDIO;
        let partial = crc.update(crc.init, &frame[2..4]);
        let calculated = crc.update(partial, &frame[6..6 + side_info_len]);
        let read = u16::from_be_bytes([frame[4], frame[5]]);

        Some((calculated, read))
    }

    pub fn verify_crc(&self, frame: &[u8]) -> Option<bool> {
        self.crc(frame).map(|(calculated, read)| calculated == read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::fixtures::{MPEG1_L3_128K, StreamBuilder};

    #[test]
    fn mpeg1_layer3() -> Result<(), HeaderError> {
        let header = FrameHeader::parse(&MPEG1_L3_128K)?;

        assert_eq!(header.version, Version::Mpeg1);
        assert_eq!(header.layer, 3);
        assert!(!header.protection_enabled);
        assert_eq!(header.bitrate, 128);
        assert_eq!(header.sample_rate, 44100);
        assert_eq!(header.channel_mode, ChannelMode::Stereo);
        assert_eq!(header.samples_per_frame, 1152);
        assert_eq!(header.frame_length, 417);
        assert!(!header.is_copyrighted);
        assert!(!header.is_original);

        let padded = FrameHeader::parse(&[0xFF, 0xFB, 0x92, 0x00])?;
        assert!(padded.is_padded);
        assert_eq!(padded.frame_length, 418);
        Ok(())
    }

    #[test]
    fn lower_sampling_versions() -> Result<(), HeaderError> {
        let header = FrameHeader::parse(&[0xFF, 0xF3, 0x80, 0xC0])?;
        assert_eq!(header.version, Version::Mpeg2);
        assert_eq!(header.bitrate, 64);
        assert_eq!(header.sample_rate, 22050);
        assert_eq!(header.samples_per_frame, 576);
        assert_eq!(header.frame_length, 208);
        assert_eq!(header.channel_mode, ChannelMode::SingleChannel);
        assert_eq!(header.channels(), 1);

        let header = FrameHeader::parse(&[0xFF, 0xE3, 0x88, 0x00])?;
        assert_eq!(header.version, Version::Mpeg25);
        assert_eq!(header.sample_rate, 8000);
        assert_eq!(header.frame_length, 576);
        Ok(())
    }

    #[test]
    fn layer1_and_layer2() -> Result<(), HeaderError> {
        let header = FrameHeader::parse(&[0xFF, 0xFE, 0xC0, 0x00])?;
        assert_eq!(header.layer, 1);
        assert!(header.protection_enabled);
        assert_eq!(header.bitrate, 384);
        assert_eq!(header.samples_per_frame, 384);
        assert_eq!(header.frame_length, 417);

        let padded = FrameHeader::parse(&[0xFF, 0xFE, 0xC2, 0x00])?;
        assert_eq!(padded.frame_length, 421);

        let header = FrameHeader::parse(&[0xFF, 0xFD, 0xA4, 0x00])?;
        assert_eq!(header.layer, 2);
        assert_eq!(header.bitrate, 192);
        assert_eq!(header.sample_rate, 48000);
        assert_eq!(header.samples_per_frame, 1152);
        assert_eq!(header.frame_length, 576);
        Ok(())
    }

    #[test]
    fn flag_bits() -> Result<(), HeaderError> {
        let header = FrameHeader::parse(&[0xFF, 0xFB, 0x91, 0x7D])?;
        assert!(header.is_private);
        assert_eq!(header.channel_mode, ChannelMode::JointStereo);
        assert_eq!(header.mode_extension, 3);
        assert!(header.is_copyrighted);
        assert!(header.is_original);
        assert_eq!(header.emphasis, 1);
        Ok(())
    }

    #[test]
    fn reserved_fields() {
        assert!(matches!(
            FrameHeader::parse(&[0xFF, 0x7B, 0x90, 0x00]),
            Err(HeaderError::InvalidSync(0xFF7B))
        ));
        assert!(matches!(
            FrameHeader::parse(&[0xFF, 0xEB, 0x90, 0x00]),
            Err(HeaderError::ReservedVersion)
        ));
        assert!(matches!(
            FrameHeader::parse(&[0xFF, 0xF9, 0x90, 0x00]),
            Err(HeaderError::ReservedLayer)
        ));
        assert!(matches!(
            FrameHeader::parse(&[0xFF, 0xFB, 0xF0, 0x00]),
            Err(HeaderError::InvalidBitrateIndex(15))
        ));
        assert!(matches!(
            FrameHeader::parse(&[0xFF, 0xFB, 0x00, 0x00]),
            Err(HeaderError::InvalidBitrateIndex(0))
        ));
        assert!(matches!(
            FrameHeader::parse(&[0xFF, 0xFB, 0x9C, 0x00]),
            Err(HeaderError::ReservedSampleRate)
        ));
        assert!(matches!(
            FrameHeader::parse(&[0xFF, 0xFB]),
            Err(HeaderError::Truncated(2))
        ));
    }

    #[test]
    fn unprotected_layer1_is_not_a_sync() -> Result<(), HeaderError> {
        let header = FrameHeader::parse(&[0xFF, 0xFF, 0xC0, 0x00])?;
        assert_eq!(header.layer, 1);
        assert!(!header.protection_enabled);

        assert!(!is_frame_sync(0xFF, 0xFF));
        assert!(is_frame_sync(0xFF, 0xFE));
        assert!(is_frame_sync(0xFF, 0xE0));
        assert!(!is_frame_sync(0xFF, 0xC0));
        assert!(!is_frame_sync(0xFE, 0xFB));
        Ok(())
    }

    #[test]
    fn decode_is_idempotent() -> Result<(), HeaderError> {
        for bytes in [
            MPEG1_L3_128K,
            [0xFF, 0xF3, 0x80, 0xC0],
            [0xFF, 0xFD, 0xA4, 0x0C],
        ] {
            assert_eq!(FrameHeader::parse(&bytes)?, FrameHeader::parse(&bytes)?);
        }
        Ok(())
    }

    #[test]
    fn matching_ignores_bitrate() -> Result<(), HeaderError> {
        let a = FrameHeader::parse(&MPEG1_L3_128K)?;
        let b = FrameHeader::parse(&[0xFF, 0xFB, 0xB0, 0x00])?;
        let c = FrameHeader::parse(&[0xFF, 0xFB, 0x94, 0x00])?;

        assert_ne!(a.bitrate, b.bitrate);
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
        Ok(())
    }

    #[test]
    fn layer3_crc() -> Result<(), HeaderError> {
        let mut frame = vec![0xFF, 0xFA, 0x90, 0x00, 0x00, 0x00];
        frame.extend((0..32u8).map(|i| i.wrapping_mul(37)));

        let header = FrameHeader::parse(&frame)?;
        assert!(header.protection_enabled);
        assert_eq!(header.side_info_len(), Some(32));

        let crc = &CRC_MPEG_AUDIO;
        let partial = crc.update(crc.init, &frame[2..4]);
        let expected = crc.update(partial, &frame[6..]);
        frame[4..6].copy_from_slice(&expected.to_be_bytes());

        assert_eq!(header.verify_crc(&frame), Some(true));

        frame[20] ^= 0x01;
        assert_eq!(header.verify_crc(&frame), Some(false));
        assert_eq!(header.verify_crc(&frame[..20]), None);

        let unprotected = FrameHeader::parse(&MPEG1_L3_128K)?;
        assert_eq!(unprotected.verify_crc(&frame), None);
        Ok(())
    }

    #[test]
    fn read_with_length_check() -> Result<(), HeaderError> {
        let mut stream = StreamBuilder::default()
            .frames(MPEG1_L3_128K, 2)
            .raw(&[0xFF, 0xFB])
            .build();

        assert!(FrameHeader::read_from(&mut stream, 0, true).is_ok());
        assert_eq!(FrameHeader::read_from(&mut stream, 417, false)?.frame_length, 417);

        // second frame is followed by two stray bytes, too few to check
        assert!(FrameHeader::read_from(&mut stream, 417, true).is_ok());

        let mut stream = StreamBuilder::default()
            .frames(MPEG1_L3_128K, 1)
            .frames([0xFF, 0xFB, 0x94, 0x00], 1)
            .build();

        assert!(FrameHeader::read_from(&mut stream, 0, false).is_ok());
        assert!(matches!(
            FrameHeader::read_from(&mut stream, 0, true),
            Err(HeaderError::NextFrameMismatch(417))
        ));
        Ok(())
    }
}
