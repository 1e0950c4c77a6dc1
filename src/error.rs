use std::fmt;

/// An error that occurs while compressing raw bytes into a zlib stream.
///
/// Compression of well-formed input into a sufficiently large buffer never
/// fails, so in practice the only error a caller needs to plan for is
/// `BufferTooSmall`. The required size can always be queried up front with
/// [`max_compress_len`](fn.max_compress_len.html).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CompressError {
    /// This error occurs when the compression engine cannot be set up, for
    /// example because the requested level is out of range.
    EngineInitFailed {
        /// A description of why the engine could not be initialized.
        msg: String,
    },
    /// This error occurs when the engine reports a failure while compressing,
    /// or stops making progress before reporting the end of the stream.
    EngineStepFailed {
        /// The message reported by the engine.
        msg: String,
    },
    /// This error occurs when the output buffer is exhausted before the
    /// entire input has been compressed.
    BufferTooSmall {
        /// The size of the given output buffer.
        given: u64,
        /// The number of input bytes that needed compressing.
        input_len: u64,
    },
}

impl std::error::Error for CompressError {}

impl fmt::Display for CompressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            CompressError::EngineInitFailed { ref msg } => {
                write!(f, "base252: failed to initialize deflate: {}", msg)
            }
            CompressError::EngineStepFailed { ref msg } => {
                write!(f, "base252: deflate failed: {}", msg)
            }
            CompressError::BufferTooSmall { given, input_len } => write!(
                f,
                "base252: output buffer (size = {}) is too small to hold \
                 the compressed form of {} bytes",
                given, input_len
            ),
        }
    }
}

/// An error that occurs while inflating a zlib stream.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DecompressError {
    /// This error occurs when the stream header does not describe something
    /// an inflater can be set up for: an unknown method, an oversized window,
    /// a bad header checksum or a preset dictionary.
    EngineInitFailed {
        /// A description of the rejected header.
        msg: String,
    },
    /// This error occurs when inflation stops before the end of the stream,
    /// either because the input was cut short or because the output buffer
    /// cannot hold the entire decompressed result.
    Truncated {
        /// The number of bytes decompressed before inflation stopped.
        written: u64,
        /// The size of the given output buffer.
        capacity: u64,
    },
    /// This error occurs when the inflater rejects the compressed data.
    Corrupt {
        /// The message reported by the engine.
        msg: String,
    },
}

impl std::error::Error for DecompressError {}

impl fmt::Display for DecompressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DecompressError::EngineInitFailed { ref msg } => {
                write!(f, "base252: corrupt input (invalid header: {})", msg)
            }
            DecompressError::Truncated { written, capacity } => write!(
                f,
                "base252: truncated stream (inflated {} bytes into a \
                 buffer of size {} without reaching the end)",
                written, capacity
            ),
            DecompressError::Corrupt { ref msg } => {
                write!(f, "base252: corrupt input ({})", msg)
            }
        }
    }
}

/// An error that occurs while converting safe text back into raw bytes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DecodeError {
    /// This error occurs when a marker byte is the final byte of the text,
    /// so the payload byte of its escape pair is missing.
    MalformedEscape {
        /// The position of the lone marker byte in the text.
        offset: u64,
    },
    /// This error occurs when the given buffer is too small to hold the
    /// unescaped bytes.
    BufferTooSmall {
        /// The size of the given output buffer.
        given: u64,
        /// The minimum size of the output buffer.
        min: u64,
    },
    /// This error occurs when the unescaped bytes cannot be decompressed.
    Decompress(DecompressError),
}

impl From<DecompressError> for DecodeError {
    fn from(err: DecompressError) -> DecodeError {
        DecodeError::Decompress(err)
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            DecodeError::Decompress(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DecodeError::MalformedEscape { offset } => write!(
                f,
                "base252: malformed text (marker at offset {} has no \
                 payload byte)",
                offset
            ),
            DecodeError::BufferTooSmall { given, min } => write!(
                f,
                "base252: output buffer (size = {}) is smaller than \
                 required (size = {})",
                given, min
            ),
            DecodeError::Decompress(_) => {
                write!(f, "base252: decompression failed")
            }
        }
    }
}
