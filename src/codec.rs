use log::debug;

use crate::deflate::{self, max_compress_len, Compressor};
use crate::error::{CompressError, DecodeError, DecompressError};
use crate::escape::{self, max_escape_len, Escaped};

/// The first buffer size tried by `Decoder::decode_vec`.
const INITIAL_DECODE_LEN: usize = 1 << 12;

/// Returns the maximum number of bytes, including the terminator, that
/// encoding `input_len` raw bytes can produce.
///
/// A buffer of this size passed to `Encoder::encode` is never truncated.
pub fn max_encode_len(input_len: usize) -> usize {
    max_escape_len(max_compress_len(input_len))
}

/// Encoder compresses raw bytes and escapes them into safe text.
///
/// The encoder keeps a scratch buffer for the compressed bytes between
/// calls. It is resized for every input and never shared.
#[derive(Clone, Debug, Default)]
pub struct Encoder {
    compressor: Compressor,
    scratch: Vec<u8>,
}

impl Encoder {
    /// Return a new encoder that compresses with the best level.
    pub fn new() -> Encoder {
        Encoder::with_level(deflate::BEST_LEVEL)
    }

    /// Return a new encoder that compresses with the given level.
    pub fn with_level(level: u32) -> Encoder {
        Encoder { compressor: Compressor::with_level(level), scratch: vec![] }
    }

    /// Compresses `input`, escapes the result into `output` and writes a
    /// `0x00` terminator after the text.
    ///
    /// Escaping stops early if `output` runs out of room; the returned
    /// `Escaped` then has `truncated` set and its `len` covers only the
    /// complete prefix. Size `output` with
    /// [`max_encode_len`](fn.max_encode_len.html) to avoid truncation.
    ///
    /// # Errors
    ///
    /// This method returns an error if compression fails. Running out of
    /// room in `output` is not an error.
    pub fn encode(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<Escaped, CompressError> {
        let compressed = self.compress(input)?;
        let escaped = escape::escape(compressed, output);
        debug!(
            "encoded {} bytes: {} compressed, {} text{}",
            input.len(),
            compressed.len(),
            escaped.len,
            if escaped.truncated { " (truncated)" } else { "" }
        );
        Ok(escaped)
    }

    /// Compresses and escapes `input` into a freshly allocated `Vec`.
    ///
    /// The text is complete and carries no terminator.
    pub fn encode_vec(&mut self, input: &[u8]) -> Result<Vec<u8>, CompressError> {
        let compressed = self.compress(input)?;
        let text = escape::escape_vec(compressed);
        debug!(
            "encoded {} bytes: {} compressed, {} text",
            input.len(),
            compressed.len(),
            text.len()
        );
        Ok(text)
    }

    fn compress(&mut self, input: &[u8]) -> Result<&[u8], CompressError> {
        self.scratch.clear();
        self.scratch.resize(max_compress_len(input.len()), 0);
        let n = self.compressor.compress(input, &mut self.scratch)?;
        Ok(&self.scratch[..n])
    }
}

/// Decoder unescapes safe text and decompresses the result.
#[derive(Clone, Debug, Default)]
pub struct Decoder {
    scratch: Vec<u8>,
}

impl Decoder {
    /// Return a new decoder.
    pub fn new() -> Decoder {
        Decoder { scratch: vec![] }
    }

    /// Decodes all of `text` into `output`.
    ///
    /// The length of the text is the length of the slice; a terminator must
    /// not be included. On success, this returns the number of bytes written
    /// to `output`.
    ///
    /// # Errors
    ///
    /// This method returns an error in the following circumstances:
    ///
    /// * `text` ends with a marker byte that has no payload.
    /// * The unescaped bytes are not a complete zlib stream.
    /// * `output` cannot hold all of the decompressed bytes.
    pub fn decode(
        &mut self,
        text: &[u8],
        output: &mut [u8],
    ) -> Result<usize, DecodeError> {
        self.scratch.clear();
        self.scratch.resize(escape::unescape_len(text)?, 0);
        let n = escape::unescape(text, &mut self.scratch)?;
        let m = deflate::decompress(&self.scratch[..n], output)?;
        debug!("decoded {} text bytes: {} compressed, {} raw", text.len(), n, m);
        Ok(m)
    }

    /// Decodes all of `text` into a freshly allocated `Vec` of at most
    /// `max_len` bytes.
    ///
    /// `max_len` is a limit, not a size: the buffer starts small and doubles
    /// while the decoded bytes do not fit, up to `max_len`.
    ///
    /// This method returns an error under the same circumstances that
    /// `decode` does. A `Truncated` error always reports `max_len` as its
    /// capacity.
    pub fn decode_vec(
        &mut self,
        text: &[u8],
        max_len: usize,
    ) -> Result<Vec<u8>, DecodeError> {
        let mut cap = max_len.min(INITIAL_DECODE_LEN.max(text.len()));
        let mut buf = vec![];
        loop {
            buf.resize(cap, 0);
            match self.decode(text, &mut buf) {
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(buf);
                }
                Err(DecodeError::Decompress(DecompressError::Truncated {
                    written,
                    ..
                })) => {
                    if cap < max_len && written == cap as u64 {
                        cap = cap.saturating_mul(2).min(max_len);
                        continue;
                    }
                    return Err(DecodeError::Decompress(
                        DecompressError::Truncated {
                            written,
                            capacity: max_len as u64,
                        },
                    ));
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Safe text produced by [`encode`](fn.encode.html).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SafeText {
    bytes: Vec<u8>,
    truncated: bool,
}

impl SafeText {
    /// Returns the text, without a terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the number of text bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if there are no text bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns true if the text stopped short because it did not fit.
    ///
    /// A truncated text is a valid escape of a prefix of the compressed
    /// bytes, but it does not decode.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Consumes the text and returns its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Compresses and escapes `input` into at most `max_text_len` bytes, one of
/// which is reserved for a terminator.
///
/// # Errors
///
/// This function returns an error if compression fails.
pub fn encode(input: &[u8], max_text_len: usize) -> Result<SafeText, CompressError> {
    let mut buf = vec![0; max_text_len.min(max_encode_len(input.len()))];
    let escaped = Encoder::new().encode(input, &mut buf)?;
    buf.truncate(escaped.len);
    Ok(SafeText { bytes: buf, truncated: escaped.truncated })
}

/// Unescapes and decompresses `text` into at most `max_len` bytes.
///
/// # Errors
///
/// This function returns an error under the same circumstances that
/// `Decoder::decode` does.
pub fn decode(text: &[u8], max_len: usize) -> Result<Vec<u8>, DecodeError> {
    Decoder::new().decode_vec(text, max_len)
}
