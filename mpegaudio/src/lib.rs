#![doc = include_str!("../README.md")]
//!
//! ## Technical Overview
//!
//! Reads the audio properties of MPEG-1, MPEG-2 and MPEG-2.5 audio streams
//! (Layer I, II and III) without decoding any audio.
//!
//! ### Frame Headers
//!
//! Every frame starts with a 4-byte header carrying version, layer, bitrate,
//! sample rate and channel mode. Frame length and samples per frame follow
//! from these fields.
//!
//! ### VBR Summaries
//!
//! Variable bitrate encoders store the total frame and byte counts in the
//! first frame, either as a Xing/Info header (optionally extended by LAME) or
//! as a Fraunhofer VBRI header. Without one, length is estimated from the
//! bitrate of a representative frame and the stream size without tags.
//!
//! ## Quick Start
//!
//! 1. Open a stream with [`process::stream::MpegReader`]
//! 2. Resolve properties with [`process::properties::PropertiesReader`]
//!
//! ```rust,no_run
//! use mpegaudio::process::properties::{PropertiesReader, ReadStyle};
//! use mpegaudio::process::stream::MpegReader;
//!
//! let mut stream = MpegReader::open("track.mp3")?;
//!
//! let mut reader = PropertiesReader::default();
//! reader.set_read_style(ReadStyle::Accurate);
//!
//! let props = reader.read(&mut stream)?;
//! println!(
//!     "{} ms, {} kbps, {} Hz, {} channels",
//!     props.length_in_milliseconds(),
//!     props.bitrate(),
//!     props.sample_rate(),
//!     props.channels()
//! );
//!
//! if let Some(xing) = props.xing_header() {
//!     println!("Xing: {} frames", xing.total_frames);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

/// Stream access and property resolution.
///
/// 1. **Stream Access** ([`process::stream`]): Frame-sync scanning and tag
///    detection.
///
/// 2. **Properties** ([`process::properties`]): Length, bitrate and format of
///    a stream.
pub mod process;

/// Data structures representing MPEG audio bitstream components.
///
/// - **Frame Headers** ([`structs::header`]): 4-byte frame headers
/// - **Xing/Info** ([`structs::xing`]): Xing VBR summary and LAME extension
/// - **VBRI** ([`structs::vbri`]): Fraunhofer VBR summary
pub mod structs;

/// Utility functions and supporting infrastructure.
///
/// - **Bitstream I/O** ([`utils::bitstream_io`]): Bit-level reading
/// - **CRC Validation** ([`utils::crc`]): Frame CRC checks
/// - **Error Handling** ([`utils::errors`]): Error types
pub mod utils;
