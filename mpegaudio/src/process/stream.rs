//! Stream access used by the properties resolver.
//!
//! [`MpegStream`] is the contract the resolver reads through: frame-sync
//! scanning, positioned reads and the sizes of tags surrounding the audio
//! data. [`MpegReader`] implements it for any `Read + Seek` source.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use log::{debug, trace};

use crate::structs::header::{FrameHeader, is_frame_sync};
use crate::utils::errors::HeaderError;

/// Scan window for frame-sync searches.
const BUFFER_SIZE: u64 = 1024;

pub const ID3V1_SIZE: u64 = 128;
const ID3V2_HEADER_SIZE: u64 = 10;
const APE_FOOTER_SIZE: u64 = 32;

pub trait MpegStream {
    /// Offset of the first valid frame header after any leading ID3v2 tag.
    fn first_frame_offset(&mut self) -> io::Result<Option<u64>>;

    /// Offset of the last frame sync before any trailing tags.
    fn last_frame_offset(&mut self) -> io::Result<Option<u64>>;

    /// First frame sync at or after `position`.
    fn next_frame_offset(&mut self, position: u64) -> io::Result<Option<u64>>;

    /// Last frame sync strictly before `position`.
    fn previous_frame_offset(&mut self, position: u64) -> io::Result<Option<u64>>;

    fn seek(&mut self, position: u64) -> io::Result<()>;

    /// Reads up to `length` bytes from the current position.
    fn read_block(&mut self, length: usize) -> io::Result<Vec<u8>>;

    fn length(&mut self) -> io::Result<u64>;

    fn has_id3v1_tag(&self) -> bool;

    fn id3v2_tag_size(&self) -> Option<u64>;

    fn ape_tag_size(&self) -> Option<u64>;

    fn read_block_at(&mut self, position: u64, length: usize) -> io::Result<Vec<u8>> {
        self.seek(position)?;
        self.read_block(length)
    }

    /// End of the audio data, before APE and ID3v1 tags.
    fn audio_end(&mut self) -> io::Result<u64> {
        let id3v1 = if self.has_id3v1_tag() { ID3V1_SIZE } else { 0 };
        let trailing = id3v1 + self.ape_tag_size().unwrap_or(0);

        Ok(self.length()?.saturating_sub(trailing))
    }
}

/// [`MpegStream`] over a seekable byte source.
///
/// Tags are located once on construction; frame scanning is confined to the
/// region between them.
///
/// ```rust,no_run
/// use mpegaudio::process::stream::{MpegReader, MpegStream};
///
/// let mut reader = MpegReader::open("track.mp3")?;
/// if let Some(offset) = reader.first_frame_offset()? {
///     println!("First frame at {offset}");
/// }
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct MpegReader<R> {
    inner: R,
    len: u64,
    id3v2_size: Option<u64>,
    id3v1: bool,
    ape_size: Option<u64>,
}

impl MpegReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> MpegReader<R> {
    pub fn new(mut inner: R) -> io::Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;

        let mut reader = Self {
            inner,
            len,
            id3v2_size: None,
            id3v1: false,
            ape_size: None,
        };

        reader.id3v2_size = reader.find_id3v2()?;
        reader.id3v1 = reader.find_id3v1()?;
        reader.ape_size = reader.find_ape()?;

        debug!(
            "Stream of {len} bytes: ID3v2 {:?}, APE {:?}, ID3v1 {}",
            reader.id3v2_size, reader.ape_size, reader.id3v1
        );

        Ok(reader)
    }

    fn audio_start(&self) -> u64 {
        self.id3v2_size.unwrap_or(0)
    }

    fn find_id3v2(&mut self) -> io::Result<Option<u64>> {
        let data = self.read_block_at(0, ID3V2_HEADER_SIZE as usize)?;

        if data.len() < ID3V2_HEADER_SIZE as usize
            || !data.starts_with(b"ID3")
            || data[3] == 0xFF
            || data[4] == 0xFF
            || data[6..10].iter().any(|byte| byte & 0x80 != 0)
        {
            return Ok(None);
        }

        // synchsafe: 7 bits per byte
        let size = data[6..10]
            .iter()
            .fold(0u64, |size, &byte| (size << 7) | byte as u64);
        let footer = if data[5] & 0x10 != 0 {
            ID3V2_HEADER_SIZE
        } else {
            0
        };
        let total = ID3V2_HEADER_SIZE + size + footer;

        Ok((total <= self.len).then_some(total))
    }

    fn find_id3v1(&mut self) -> io::Result<bool> {
        if self.len < ID3V1_SIZE {
            return Ok(false);
        }

        Ok(self.read_block_at(self.len - ID3V1_SIZE, 3)? == b"TAG")
    }

    fn find_ape(&mut self) -> io::Result<Option<u64>> {
        let end = self.len - if self.id3v1 { ID3V1_SIZE } else { 0 };
        if end < APE_FOOTER_SIZE {
            return Ok(None);
        }

        let footer = self.read_block_at(end - APE_FOOTER_SIZE, APE_FOOTER_SIZE as usize)?;
        if footer.len() < APE_FOOTER_SIZE as usize || !footer.starts_with(b"APETAGEX") {
            return Ok(None);
        }

        // size covers items and footer, the optional header comes on top
        let size = u32::from_le_bytes([footer[12], footer[13], footer[14], footer[15]]) as u64;
        let flags = u32::from_le_bytes([footer[20], footer[21], footer[22], footer[23]]);
        let header = if flags & 0x8000_0000 != 0 {
            APE_FOOTER_SIZE
        } else {
            0
        };
        let total = size + header;

        Ok((APE_FOOTER_SIZE..=end).contains(&total).then_some(total))
    }
}

impl<R: Read + Seek> MpegStream for MpegReader<R> {
    fn first_frame_offset(&mut self) -> io::Result<Option<u64>> {
        let mut position = self.audio_start();

        while let Some(offset) = self.next_frame_offset(position)? {
            match FrameHeader::read_from(self, offset, true) {
                Ok(_) => return Ok(Some(offset)),
                Err(HeaderError::Io(e)) => return Err(e),
                Err(e) => trace!("Skipping sync at {offset}: {e}"),
            }

            position = offset + 1;
        }

        Ok(None)
    }

    fn last_frame_offset(&mut self) -> io::Result<Option<u64>> {
        let end = self.audio_end()?;
        self.previous_frame_offset(end)
    }

    fn next_frame_offset(&mut self, position: u64) -> io::Result<Option<u64>> {
        let end = self.audio_end()?;
        let mut position = position.max(self.audio_start());

        while position + 1 < end {
            let len = (end - position).min(BUFFER_SIZE) as usize;
            let buffer = self.read_block_at(position, len)?;
            if buffer.len() < 2 {
                break;
            }

            if let Some(i) = buffer
                .windows(2)
                .position(|pair| is_frame_sync(pair[0], pair[1]))
            {
                return Ok(Some(position + i as u64));
            }

            // keep the last byte, it may start a sync
            position += buffer.len() as u64 - 1;
        }

        Ok(None)
    }

    fn previous_frame_offset(&mut self, position: u64) -> io::Result<Option<u64>> {
        let start = self.audio_start();
        let mut limit = position.min(self.audio_end()?.saturating_sub(1));

        while limit > start {
            let begin = limit.saturating_sub(BUFFER_SIZE).max(start);
            let buffer = self.read_block_at(begin, (limit - begin + 1) as usize)?;

            if let Some(i) = buffer
                .windows(2)
                .rposition(|pair| is_frame_sync(pair[0], pair[1]))
            {
                return Ok(Some(begin + i as u64));
            }

            limit = begin;
        }

        Ok(None)
    }

    fn seek(&mut self, position: u64) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(position)).map(|_| ())
    }

    fn read_block(&mut self, length: usize) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(length);
        self.inner
            .by_ref()
            .take(length as u64)
            .read_to_end(&mut buffer)?;

        Ok(buffer)
    }

    fn length(&mut self) -> io::Result<u64> {
        Ok(self.len)
    }

    fn has_id3v1_tag(&self) -> bool {
        self.id3v1
    }

    fn id3v2_tag_size(&self) -> Option<u64> {
        self.id3v2_size
    }

    fn ape_tag_size(&self) -> Option<u64> {
        self.ape_size
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::process::fixtures::{MPEG1_L3_128K, StreamBuilder};

    #[test]
    fn detects_tags() -> io::Result<()> {
        let mut stream = StreamBuilder::default()
            .id3v2(100, false)
            .frames(MPEG1_L3_128K, 3)
            .ape(false)
            .id3v1()
            .build();

        assert_eq!(stream.id3v2_tag_size(), Some(110));
        assert_eq!(stream.ape_tag_size(), Some(32));
        assert!(stream.has_id3v1_tag());
        assert_eq!(stream.length()?, 110 + 3 * 417 + 32 + 128);
        assert_eq!(stream.audio_end()?, 110 + 3 * 417);
        Ok(())
    }

    #[test]
    fn tag_header_flags() -> io::Result<()> {
        let stream = StreamBuilder::default()
            .id3v2(20, true)
            .frames(MPEG1_L3_128K, 2)
            .ape(true)
            .build();

        assert_eq!(stream.id3v2_tag_size(), Some(40));
        assert_eq!(stream.ape_tag_size(), Some(64));
        assert!(!stream.has_id3v1_tag());
        Ok(())
    }

    #[test]
    fn no_tags() -> io::Result<()> {
        let mut stream = StreamBuilder::default().frames(MPEG1_L3_128K, 2).build();

        assert_eq!(stream.id3v2_tag_size(), None);
        assert_eq!(stream.ape_tag_size(), None);
        assert!(!stream.has_id3v1_tag());
        assert_eq!(stream.audio_end()?, 834);
        Ok(())
    }

    #[test]
    fn frame_offsets() -> io::Result<()> {
        let mut stream = StreamBuilder::default()
            .id3v2(100, false)
            .frames(MPEG1_L3_128K, 4)
            .id3v1()
            .build();

        assert_eq!(stream.first_frame_offset()?, Some(110));
        assert_eq!(stream.next_frame_offset(0)?, Some(110));
        assert_eq!(stream.next_frame_offset(111)?, Some(527));
        assert_eq!(stream.previous_frame_offset(527)?, Some(110));
        assert_eq!(stream.previous_frame_offset(110)?, None);
        assert_eq!(stream.last_frame_offset()?, Some(110 + 3 * 417));
        assert_eq!(stream.next_frame_offset(110 + 3 * 417 + 1)?, None);
        Ok(())
    }

    #[test]
    fn first_frame_skips_false_syncs() -> io::Result<()> {
        // reserved layer, then a valid header not followed by a frame
        let mut stream = StreamBuilder::default()
            .raw(&[0xFF, 0xE0, 0x00, 0x00])
            .raw(&[0xFF, 0xFB, 0x94, 0x00])
            .frames(MPEG1_L3_128K, 3)
            .build();

        assert_eq!(stream.next_frame_offset(0)?, Some(0));
        assert_eq!(stream.first_frame_offset()?, Some(8));
        Ok(())
    }

    #[test]
    fn unprotected_layer1_frames_are_not_found() -> io::Result<()> {
        let mut stream = StreamBuilder::default()
            .frames([0xFF, 0xFF, 0xC0, 0x00], 5)
            .build();

        assert_eq!(stream.next_frame_offset(0)?, None);
        assert_eq!(stream.first_frame_offset()?, None);
        assert_eq!(stream.last_frame_offset()?, None);
        Ok(())
    }

    #[test]
    fn sync_across_scan_windows() -> io::Result<()> {
        let mut stream = StreamBuilder::default()
            .raw(&[0u8; 1023])
            .frames(MPEG1_L3_128K, 2)
            .raw(&[0u8; 3000])
            .build();

        assert_eq!(stream.next_frame_offset(0)?, Some(1023));
        assert_eq!(stream.first_frame_offset()?, Some(1023));
        assert_eq!(stream.last_frame_offset()?, Some(1023 + 417));
        Ok(())
    }

    #[test]
    fn empty_and_silent_streams() -> io::Result<()> {
        let mut stream = MpegReader::new(Cursor::new(Vec::new()))?;
        assert_eq!(stream.length()?, 0);
        assert_eq!(stream.first_frame_offset()?, None);
        assert_eq!(stream.last_frame_offset()?, None);

        let mut stream = StreamBuilder::default().raw(&[0u8; 5000]).build();
        assert_eq!(stream.first_frame_offset()?, None);
        assert_eq!(stream.last_frame_offset()?, None);
        Ok(())
    }

    #[test]
    fn short_reads_at_end() -> io::Result<()> {
        let mut stream = StreamBuilder::default().raw(b"abcdef").build();

        assert_eq!(stream.read_block_at(4, 10)?, b"ef");
        assert_eq!(stream.read_block_at(10, 4)?, b"");
        Ok(())
    }
}
