#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $state.fail_level {
            return Err($err);
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

#[derive(thiserror::Error, Debug)]
pub enum HeaderError {
    #[error("Frame sync not found. Read {0:#06X}")]
    InvalidSync(u16),

    #[error("Reserved MPEG version bits")]
    ReservedVersion,

    #[error("Reserved layer bits")]
    ReservedLayer,

    #[error("Bitrate index {0} is free-format or reserved")]
    InvalidBitrateIndex(u8),

    #[error("Reserved sample rate index")]
    ReservedSampleRate,

    #[error("Computed frame length is zero")]
    ZeroFrameLength,

    #[error("Frame header needs 4 bytes, got {0}")]
    Truncated(usize),

    #[error("No matching frame header follows at offset {0}")]
    NextFrameMismatch(u64),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum XingError {
    #[error("No Xing or Info marker in block")]
    MarkerNotFound,

    #[error("Xing header found but too short: marker at {offset}, block is {len} bytes")]
    TooShort { offset: usize, len: usize },

    #[error("Xing header doesn't contain the frame and byte counts. Flags {0:#04X}")]
    MissingFields(u8),
}

#[derive(thiserror::Error, Debug)]
pub enum VbriError {
    #[error("No VBRI marker at block start")]
    MarkerNotFound,

    #[error("VBRI header found but too short: {0} bytes")]
    TooShort(usize),
}

#[derive(thiserror::Error, Debug)]
pub enum PropertiesError {
    #[error("Could not find a valid first MPEG frame in the stream")]
    NoFirstFrame,

    #[error("First frame header at offset {offset} is invalid: {source}")]
    InvalidFirstHeader {
        offset: u64,
        #[source]
        source: HeaderError,
    },

    #[error("CRC mismatch in frame at offset {offset}. Calculated {calculated:#06X}, Read {read:#06X}")]
    CrcMismatch {
        offset: u64,
        calculated: u16,
        read: u16,
    },
}
