//! Audio properties of an MPEG audio stream.
//!
//! Length and bitrate come from the first source that works:
//!
//! 1. A Xing/Info header in the first frame's side information.
//! 2. A VBRI header 32 bytes after the first frame header.
//! 3. Constant bitrate estimation: the bitrate of a reference frame header and
//!    the stream length without tags.
//!
//! Both VBR summaries give `length = samples_per_frame / sample_rate * frames`
//! and `bitrate = bytes * 8 / length`. Lengths and bitrates are rounded half
//! up.

use anyhow::{Result, anyhow};
use log::Level::Warn;
use log::{debug, trace};

use crate::log_or_err;
use crate::process::stream::{ID3V1_SIZE, MpegStream};
use crate::structs::header::{ChannelMode, FrameHeader, Version};
use crate::structs::vbri::{VBRI_OFFSET, VbriHeader};
use crate::structs::xing::XingHeader;
use crate::utils::errors::{HeaderError, PropertiesError};

/// Bytes read for a VBRI header.
const VBRI_BLOCK_LEN: usize = 24;

/// How much work to spend on reading properties.
///
/// Every style yields the same length and bitrate. [`ReadStyle::Accurate`]
/// additionally verifies the CRC of a protected first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadStyle {
    Fast,
    #[default]
    Average,
    Accurate,
}

/// Audio properties of one stream.
///
/// All fields stay zero (or at their defaults) when no usable frame header
/// is found; callers treat zero as unknown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioProperties {
    length_ms: u32,
    bitrate: u32,
    sample_rate: u32,
    channels: u8,
    version: Version,
    layer: u8,
    channel_mode: ChannelMode,
    protection_enabled: bool,
    is_copyrighted: bool,
    is_original: bool,
    xing_header: Option<XingHeader>,
    vbri_header: Option<VbriHeader>,
}

impl AudioProperties {
    /// Reads properties with the default, permissive [`PropertiesReader`].
    pub fn read<S: MpegStream + ?Sized>(stream: &mut S, style: ReadStyle) -> Result<Self> {
        let mut reader = PropertiesReader::default();
        reader.set_read_style(style);
        reader.read(stream)
    }

    pub fn length_in_seconds(&self) -> u32 {
        self.length_ms / 1000
    }

    pub fn length_in_milliseconds(&self) -> u32 {
        self.length_ms
    }

    /// Average bitrate in kbps.
    pub fn bitrate(&self) -> u32 {
        self.bitrate
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn layer(&self) -> u8 {
        self.layer
    }

    pub fn channel_mode(&self) -> ChannelMode {
        self.channel_mode
    }

    pub fn protection_enabled(&self) -> bool {
        self.protection_enabled
    }

    pub fn is_copyrighted(&self) -> bool {
        self.is_copyrighted
    }

    pub fn is_original(&self) -> bool {
        self.is_original
    }

    /// The Xing/Info header length and bitrate were taken from, if any.
    pub fn xing_header(&self) -> Option<&XingHeader> {
        self.xing_header.as_ref()
    }

    /// The VBRI header length and bitrate were taken from, if any.
    pub fn vbri_header(&self) -> Option<&VbriHeader> {
        self.vbri_header.as_ref()
    }

    fn apply_header(&mut self, header: &FrameHeader) {
        self.sample_rate = header.sample_rate;
        self.channels = header.channels();
        self.version = header.version;
        self.layer = header.layer;
        self.protection_enabled = header.protection_enabled;
        self.channel_mode = header.channel_mode;
        self.is_copyrighted = header.is_copyrighted;
        self.is_original = header.is_original;
    }
}

/// Resolves [`AudioProperties`] from an [`MpegStream`].
#[derive(Debug, Clone)]
pub struct PropertiesReader {
    style: ReadStyle,
    fail_level: log::Level,
}

impl Default for PropertiesReader {
    fn default() -> Self {
        Self {
            style: ReadStyle::default(),
            fail_level: log::Level::Error,
        }
    }
}

impl PropertiesReader {
    pub fn set_read_style(&mut self, style: ReadStyle) {
        self.style = style;
    }

    /// Sets the failure level for stream problems.
    ///
    /// - `log::Level::Error`: log problems and return defaults (default)
    /// - `log::Level::Warn`: fail when no usable frame exists or a CRC mismatches
    pub fn set_fail_level(&mut self, level: log::Level) {
        self.fail_level = level;
    }

    /// Reads properties, seeking freely within `stream`.
    ///
    /// Only I/O errors are returned unless the fail level is raised.
    pub fn read<S: MpegStream + ?Sized>(&self, stream: &mut S) -> Result<AudioProperties> {
        let mut props = AudioProperties::default();

        let Some(first) = stream.first_frame_offset()? else {
            log_or_err!(self, Warn, anyhow!(PropertiesError::NoFirstFrame));
            return Ok(props);
        };

        let first_header = match FrameHeader::read_from(stream, first, false) {
            Ok(header) => header,
            Err(HeaderError::Io(e)) => return Err(e.into()),
            Err(source) => {
                log_or_err!(
                    self,
                    Warn,
                    anyhow!(PropertiesError::InvalidFirstHeader {
                        offset: first,
                        source
                    })
                );
                return Ok(props);
            }
        };

        if self.style == ReadStyle::Accurate {
            self.check_crc(stream, first, &first_header)?;
        }

        let header = if self.read_xing(stream, first, &first_header, &mut props)?
            || self.read_vbri(stream, first, &first_header, &mut props)?
        {
            first_header
        } else {
            self.read_cbr(stream, first, first_header, &mut props)?
        };

        props.apply_header(&header);

        Ok(props)
    }

    fn read_xing<S: MpegStream + ?Sized>(
        &self,
        stream: &mut S,
        first: u64,
        header: &FrameHeader,
        props: &mut AudioProperties,
    ) -> Result<bool> {
        let side_info =
            stream.read_block_at(first + 4, header.frame_length.saturating_sub(4) as usize)?;

        let xing = match XingHeader::parse(&side_info) {
            Ok(xing) if xing.is_valid() => xing,
            Ok(xing) => {
                debug!(
                    "Ignoring Xing header with {} frames, {} bytes",
                    xing.total_frames, xing.total_size
                );
                return Ok(false);
            }
            Err(e) => {
                debug!("No Xing header: {e}");
                return Ok(false);
            }
        };

        let Some((length_ms, bitrate)) =
            vbr_length_and_bitrate(header, xing.total_frames, xing.total_size)
        else {
            return Ok(false);
        };

        props.length_ms = length_ms;
        props.bitrate = bitrate;
        props.xing_header = Some(xing);

        Ok(true)
    }

    fn read_vbri<S: MpegStream + ?Sized>(
        &self,
        stream: &mut S,
        first: u64,
        header: &FrameHeader,
        props: &mut AudioProperties,
    ) -> Result<bool> {
        let block = stream.read_block_at(first + VBRI_OFFSET, VBRI_BLOCK_LEN)?;

        let vbri = match VbriHeader::parse(&block) {
            Ok(vbri) => vbri,
            Err(e) => {
                debug!("No VBRI header: {e}");
                return Ok(false);
            }
        };

        let Some((length_ms, bitrate)) =
            vbr_length_and_bitrate(header, vbri.total_frames, vbri.total_size)
        else {
            debug!("Ignoring VBRI header with {} frames", vbri.total_frames);
            return Ok(false);
        };

        props.length_ms = length_ms;
        props.bitrate = bitrate;
        props.vbri_header = Some(vbri);

        Ok(true)
    }

    /// Estimates length from a reference header's bitrate, returning that header.
    fn read_cbr<S: MpegStream + ?Sized>(
        &self,
        stream: &mut S,
        first: u64,
        first_header: FrameHeader,
        props: &mut AudioProperties,
    ) -> Result<FrameHeader> {
        let header = match self.last_header(stream, first)? {
            Some((last, last_header)) if !first_header.matches(&last_header) => {
                debug!("First and last frame headers differ, searching for a matching pair");
                self.find_matching_header(stream, first, last, first_header)?
            }
            Some(_) => first_header,
            None => {
                debug!("No valid last frame header, using the first");
                first_header
            }
        };

        props.bitrate = header.bitrate;

        let stream_length = Self::stream_length(stream)?;
        if stream_length > 0 && header.bitrate > 0 {
            props.length_ms = (stream_length as f64 * 8.0 / header.bitrate as f64 + 0.5) as u32;
        }

        Ok(header)
    }

    /// Walks back from the last frame sync to the last decodable header.
    fn last_header<S: MpegStream + ?Sized>(
        &self,
        stream: &mut S,
        first: u64,
    ) -> Result<Option<(u64, FrameHeader)>> {
        let Some(mut position) = stream.last_frame_offset()? else {
            return Ok(None);
        };

        loop {
            match FrameHeader::read_from(stream, position, false) {
                Ok(header) => return Ok(Some((position, header))),
                Err(HeaderError::Io(e)) => return Err(e.into()),
                Err(e) => trace!("Invalid frame header at {position}: {e}"),
            }

            if position <= first {
                return Ok(None);
            }

            match stream.previous_frame_offset(position)? {
                Some(previous) if previous >= first => position = previous,
                _ => return Ok(None),
            }
        }
    }

    /// Finds the first two consecutive headers before `last` that agree with
    /// each other, falling back to `first_header`.
    fn find_matching_header<S: MpegStream + ?Sized>(
        &self,
        stream: &mut S,
        first: u64,
        last: u64,
        first_header: FrameHeader,
    ) -> Result<FrameHeader> {
        let mut previous = first_header;
        let mut next = stream.next_frame_offset(first + 2)?;

        while let Some(position) = next.filter(|&position| position < last) {
            match FrameHeader::read_from(stream, position, false) {
                Ok(header) => {
                    if previous.matches(&header) {
                        debug!("Frame headers match at {position}");
                        return Ok(previous);
                    }

                    previous = header;
                }
                Err(HeaderError::Io(e)) => return Err(e.into()),
                Err(e) => trace!("Invalid frame header at {position}: {e}"),
            }

            next = stream.next_frame_offset(position + 2)?;
        }

        debug!("No matching frame headers, using the first");
        Ok(first_header)
    }

    /// Stream length without ID3v1, ID3v2 and APE tags.
    fn stream_length<S: MpegStream + ?Sized>(stream: &mut S) -> Result<u64> {
        let mut length = stream.length()?;

        if stream.has_id3v1_tag() {
            length = length.saturating_sub(ID3V1_SIZE);
        }

        length = length.saturating_sub(stream.id3v2_tag_size().unwrap_or(0));
        length = length.saturating_sub(stream.ape_tag_size().unwrap_or(0));

        Ok(length)
    }

    fn check_crc<S: MpegStream + ?Sized>(
        &self,
        stream: &mut S,
        offset: u64,
        header: &FrameHeader,
    ) -> Result<()> {
        let Some(side_info_len) = header.side_info_len() else {
            return Ok(());
        };

        let frame = stream.read_block_at(offset, 6 + side_info_len)?;

        match header.crc(&frame) {
            Some((calculated, read)) if calculated != read => log_or_err!(
                self,
                Warn,
                anyhow!(PropertiesError::CrcMismatch {
                    offset,
                    calculated,
                    read
                })
            ),
            Some(_) => trace!("CRC verified for frame at {offset}"),
            None => {}
        }

        Ok(())
    }
}

/// Length in milliseconds and bitrate in kbps from VBR summary counts.
fn vbr_length_and_bitrate(header: &FrameHeader, frames: u32, size: u32) -> Option<(u32, u32)> {
    if header.sample_rate == 0 || frames == 0 {
        return None;
    }

    let time_per_frame = header.samples_per_frame as f64 * 1000.0 / header.sample_rate as f64;
    let length = time_per_frame * frames as f64;

    let length_ms = (length + 0.5) as u32;
    let bitrate = (size as f64 * 8.0 / length + 0.5) as u32;

    Some((length_ms, bitrate))
}
