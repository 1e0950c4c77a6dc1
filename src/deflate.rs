/*!
Bounded-buffer zlib compression and decompression.

Both directions write into a caller supplied buffer and never grow it. The
`flate2` engine is created at the start of each call and dropped before the
call returns, whether it succeeds or not.
*/

use flate2::{
    Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status,
};
use log::trace;

use crate::error::{CompressError, DecompressError};

/// The compression level that produces the smallest output.
pub const BEST_LEVEL: u32 = 9;

/// Deflate is the only compression method zlib defines.
const ZLIB_METHOD_DEFLATE: u8 = 8;

/// The largest window size exponent (minus 8) a zlib header may declare.
const ZLIB_MAX_CINFO: u8 = 7;

/// Set in the second header byte when the stream needs a preset dictionary.
const ZLIB_FDICT: u8 = 0x20;

/// Returns the maximum compressed size of an input of `input_len` bytes.
///
/// The bound is loose enough for every level, including the stored blocks an
/// engine falls back to for incompressible data.
pub fn max_compress_len(input_len: usize) -> usize {
    let n = input_len;
    let a = n.saturating_mul(110) / 100;
    let b = n.saturating_add((n / (31 * 1024) + 1) * 5);
    a.max(b).saturating_add(128)
}

/// A zlib compressor with a fixed compression level.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Compressor {
    level: u32,
}

impl Default for Compressor {
    fn default() -> Compressor {
        Compressor::new()
    }
}

impl Compressor {
    /// Return a compressor that uses the best compression level.
    pub fn new() -> Compressor {
        Compressor::with_level(BEST_LEVEL)
    }

    /// Return a compressor that uses the given level.
    ///
    /// Levels range from `0` (store only) to `9` (best). Any other level is
    /// reported as an error when compressing.
    pub fn with_level(level: u32) -> Compressor {
        Compressor { level }
    }

    /// Returns the configured compression level.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Compresses all bytes in `input` into `output` as a single zlib
    /// stream.
    ///
    /// On success, this returns the number of bytes written to `output`.
    ///
    /// # Errors
    ///
    /// This method returns an error in the following circumstances:
    ///
    /// * The configured level is greater than `9`.
    /// * The engine reports a failure or stops making progress.
    /// * `output` is exhausted before the stream is finished. Sizing `output`
    ///   with [`max_compress_len`](fn.max_compress_len.html) avoids this.
    pub fn compress(
        &self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, CompressError> {
        if self.level > BEST_LEVEL {
            return Err(CompressError::EngineInitFailed {
                msg: format!(
                    "compression level {} is out of range (0-{})",
                    self.level, BEST_LEVEL
                ),
            });
        }
        let mut engine = Compress::new(Compression::new(self.level), true);
        loop {
            let (ipos, opos) =
                (engine.total_in() as usize, engine.total_out() as usize);
            let status = engine
                .compress(&input[ipos..], &mut output[opos..], FlushCompress::Finish)
                .map_err(|err| CompressError::EngineStepFailed {
                    msg: err.to_string(),
                })?;
            let (next_ipos, next_opos) =
                (engine.total_in() as usize, engine.total_out() as usize);
            match status {
                Status::StreamEnd => {
                    trace!(
                        "deflated {} bytes into {} bytes (level {})",
                        input.len(),
                        next_opos,
                        self.level
                    );
                    return Ok(next_opos);
                }
                Status::Ok | Status::BufError => {
                    if next_opos == output.len() {
                        return Err(CompressError::BufferTooSmall {
                            given: output.len() as u64,
                            input_len: input.len() as u64,
                        });
                    }
                    if next_ipos == ipos && next_opos == opos {
                        return Err(CompressError::EngineStepFailed {
                            msg: "engine stopped before the end of the stream"
                                .to_string(),
                        });
                    }
                }
            }
        }
    }

    /// Compresses all bytes in `input` into a freshly allocated `Vec` of at
    /// most `output_capacity` bytes.
    ///
    /// This method returns an error under the same circumstances that
    /// `compress` does.
    pub fn compress_vec(
        &self,
        input: &[u8],
        output_capacity: usize,
    ) -> Result<Vec<u8>, CompressError> {
        let mut buf = vec![0; output_capacity];
        let n = self.compress(input, &mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }
}

/// Checks the two byte zlib header at the start of `input`.
///
/// Returns `Ok(false)` if the header itself is incomplete.
fn check_header(input: &[u8]) -> Result<bool, DecompressError> {
    if input.len() < 2 {
        return Ok(false);
    }
    let (cmf, flg) = (input[0], input[1]);
    let invalid = |msg: String| DecompressError::EngineInitFailed { msg };
    if cmf & 0x0F != ZLIB_METHOD_DEFLATE {
        return Err(invalid(format!("unknown method {}", cmf & 0x0F)));
    }
    if cmf >> 4 > ZLIB_MAX_CINFO {
        return Err(invalid(format!("window size exponent {}", cmf >> 4)));
    }
    if (u16::from(cmf) << 8 | u16::from(flg)) % 31 != 0 {
        return Err(invalid(format!("bad check bits {:#04x}{:02x}", cmf, flg)));
    }
    if flg & ZLIB_FDICT != 0 {
        return Err(invalid("preset dictionaries are not supported".to_string()));
    }
    Ok(true)
}

/// Decompresses the zlib stream in `input` into `output`.
///
/// On success, this returns the number of bytes written to `output`. Bytes
/// after the end of the stream are ignored.
///
/// # Errors
///
/// This function returns an error in the following circumstances:
///
/// * The zlib header is invalid or requests a preset dictionary.
/// * `input` ends before the end of the stream.
/// * `output` cannot hold all of the decompressed bytes.
/// * The compressed data is corrupt, including a bad Adler-32 trailer.
pub fn decompress(
    input: &[u8],
    output: &mut [u8],
) -> Result<usize, DecompressError> {
    let capacity = output.len() as u64;
    let truncated = |written: usize| DecompressError::Truncated {
        written: written as u64,
        capacity,
    };
    if !check_header(input)? {
        return Err(truncated(0));
    }
    // Never flush with `Finish`: under it the engine reports a short input
    // as corrupt data instead of asking for more.
    let mut engine = Decompress::new(true);
    loop {
        let (ipos, opos) =
            (engine.total_in() as usize, engine.total_out() as usize);
        let status = engine
            .decompress(&input[ipos..], &mut output[opos..], FlushDecompress::None)
            .map_err(|err| DecompressError::Corrupt { msg: err.to_string() })?;
        let (next_ipos, next_opos) =
            (engine.total_in() as usize, engine.total_out() as usize);
        match status {
            Status::StreamEnd => {
                trace!("inflated {} bytes into {} bytes", next_ipos, next_opos);
                return Ok(next_opos);
            }
            Status::Ok | Status::BufError => {
                if next_ipos == ipos && next_opos == opos {
                    return Err(truncated(next_opos));
                }
            }
        }
    }
}

/// Decompresses the zlib stream in `input` into a freshly allocated `Vec` of
/// at most `output_capacity` bytes.
///
/// This function returns an error under the same circumstances that
/// `decompress` does.
pub fn decompress_vec(
    input: &[u8],
    output_capacity: usize,
) -> Result<Vec<u8>, DecompressError> {
    let mut buf = vec![0; output_capacity];
    let n = decompress(input, &mut buf)?;
    buf.truncate(n);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_accepts_default_zlib() {
        assert_eq!(check_header(&[0x78, 0xDA]), Ok(true));
        assert_eq!(check_header(&[0x78, 0x9C]), Ok(true));
        assert_eq!(check_header(&[0x78, 0x01]), Ok(true));
    }

    #[test]
    fn header_incomplete() {
        assert_eq!(check_header(&[]), Ok(false));
        assert_eq!(check_header(&[0x78]), Ok(false));
    }

    #[test]
    fn header_rejects_bad_fields() {
        // Method 7.
        assert!(check_header(&[0x77, 0x9C]).is_err());
        // Window size exponent 8.
        assert!(check_header(&[0x88, 0x98]).is_err());
        // Check bits off by one.
        assert!(check_header(&[0x78, 0xDB]).is_err());
        // Preset dictionary: 0x78BB is a multiple of 31 with FDICT set.
        assert!(check_header(&[0x78, 0xBB]).is_err());
    }

    #[test]
    fn level_out_of_range() {
        let mut out = vec![0; 64];
        let err = Compressor::with_level(10).compress(b"abc", &mut out);
        match err {
            Err(CompressError::EngineInitFailed { .. }) => {}
            other => panic!("expected init failure, got {:?}", other),
        }
    }

    #[test]
    fn compress_buffer_too_small() {
        let mut out = vec![0; 4];
        let err = Compressor::new().compress(b"hello hello hello", &mut out);
        assert_eq!(
            err,
            Err(CompressError::BufferTooSmall { given: 4, input_len: 17 })
        );
    }

    #[test]
    fn decompress_truncated_input() {
        let compressed = Compressor::new()
            .compress_vec(b"some bytes that we will cut short", 128)
            .unwrap();
        let cut = &compressed[..compressed.len() - 5];
        match decompress_vec(cut, 128) {
            Err(DecompressError::Truncated { .. }) => {}
            other => panic!("expected truncation, got {:?}", other),
        }
    }

    #[test]
    fn decompress_output_too_small() {
        let data = vec![b'x'; 1000];
        let compressed = Compressor::new().compress_vec(&data, 128).unwrap();
        match decompress_vec(&compressed, 999) {
            Err(DecompressError::Truncated { capacity: 999, .. }) => {}
            other => panic!("expected truncation, got {:?}", other),
        }
        assert_eq!(decompress_vec(&compressed, 1000).unwrap(), data);
    }

    #[test]
    fn decompress_bad_trailer() {
        let mut compressed =
            Compressor::new().compress_vec(b"checksummed", 128).unwrap();
        let last = compressed.len() - 1;
        compressed[last] ^= 0xFF;
        match decompress_vec(&compressed, 128) {
            Err(DecompressError::Corrupt { .. }) => {}
            other => panic!("expected corruption, got {:?}", other),
        }
    }
}
