/// Stream access and frame-sync scanning.
///
/// Provides the [`MpegStream`](stream::MpegStream) trait the resolver reads
/// through and [`MpegReader`](stream::MpegReader), which implements it for any
/// seekable byte source and locates ID3v2, APE and ID3v1 tags.
pub mod stream;

/// Audio property resolution.
///
/// Provides [`AudioProperties`](properties::AudioProperties) and the
/// configurable [`PropertiesReader`](properties::PropertiesReader).
pub mod properties;

#[cfg(test)]
pub(crate) mod fixtures;
