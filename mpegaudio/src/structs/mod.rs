//! Data structures representing MPEG audio bitstream components.
//!
//! Frame headers and the VBR summary headers that encoders embed in the
//! first frame of a stream.

pub mod header;
pub mod vbri;
pub mod xing;
