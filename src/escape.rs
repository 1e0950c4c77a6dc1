/*!
The safe-text transform.

Every byte that would break a delimited string literal (`0x00`, `"` and `\`)
and every byte that is itself used as a marker is replaced by a two byte
escape pair: a marker followed by a payload byte. The payload carries the low
six bits of the original byte biased into `128..=191`, and the marker selects
which 64-wide bucket the original byte came from. All other bytes are copied
through unchanged.
*/

use log::{debug, trace};

use crate::error::DecodeError;

/// The bias added to the low six bits of an escaped byte. Payload bytes are
/// always in `128..=191`, which never collides with a marker or with a byte
/// that needs escaping.
const PAYLOAD_BIAS: u8 = 0x80;

/// Selects the low six bits of a byte.
const PAYLOAD_MASK: u8 = 0x3F;

/// The four reserved marker bytes. Each starts an escape pair and selects
/// the base that is added back to the payload's low six bits on decode.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Marker {
    /// Escapes `0x00` and `"`.
    Base0 = 245,
    /// Escapes `\`.
    Base64 = 246,
    /// Reserved. No byte is escaped with this marker, but decoding accepts it.
    Base128 = 247,
    /// Escapes the marker bytes themselves.
    Base192 = 248,
}

impl Marker {
    /// Converts a byte to the marker it represents. If the byte is not one
    /// of the four marker values, then it is returned as an Err.
    pub fn from_u8(b: u8) -> Result<Marker, u8> {
        match b {
            245 => Ok(Marker::Base0),
            246 => Ok(Marker::Base64),
            247 => Ok(Marker::Base128),
            248 => Ok(Marker::Base192),
            b => Err(b),
        }
    }

    /// Returns the value added to a payload's low six bits when decoding an
    /// escape pair started by this marker.
    pub fn base(self) -> u8 {
        match self {
            Marker::Base0 => 0,
            Marker::Base64 => 64,
            Marker::Base128 => 128,
            Marker::Base192 => 192,
        }
    }

    /// Returns the marker used to escape `b`, or `None` if `b` may appear in
    /// safe text as is.
    #[inline(always)]
    pub fn for_byte(b: u8) -> Option<Marker> {
        match b {
            0 | b'"' => Some(Marker::Base0),
            b'\\' => Some(Marker::Base64),
            245..=248 => Some(Marker::Base192),
            _ => None,
        }
    }
}

#[inline(always)]
fn payload(b: u8) -> u8 {
    PAYLOAD_BIAS | (b & PAYLOAD_MASK)
}

/// The outcome of escaping into a fixed size buffer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Escaped {
    /// The number of text bytes written, not counting the terminator.
    pub len: usize,
    /// The number of input bytes represented by those text bytes.
    pub consumed: usize,
    /// Whether the output buffer ran out of room before all of the input
    /// was escaped.
    pub truncated: bool,
}

/// Returns the maximum number of bytes that escaping `input_len` bytes can
/// write, including the terminator.
///
/// This happens when every input byte needs an escape pair.
pub fn max_escape_len(input_len: usize) -> usize {
    input_len.saturating_mul(2).saturating_add(1)
}

/// Escapes `input` into `output` and writes a `0x00` terminator after the
/// last text byte.
///
/// One byte of `output` is always reserved for the terminator. Escaping stops
/// at the first input byte whose encoding does not fit in the remaining
/// space, and the returned `Escaped` reports how far it got. An escape pair
/// is never split. If `output` is empty, nothing is written at all.
///
/// To never truncate, size `output` with
/// [`max_escape_len`](fn.max_escape_len.html).
pub fn escape(input: &[u8], output: &mut [u8]) -> Escaped {
    let limit = output.len().saturating_sub(1);
    let mut opos = 0;
    let mut ipos = 0;
    while ipos < input.len() {
        let b = input[ipos];
        match Marker::for_byte(b) {
            None => {
                if opos + 1 > limit {
                    break;
                }
                output[opos] = b;
                opos += 1;
            }
            Some(marker) => {
                if opos + 2 > limit {
                    break;
                }
                output[opos] = marker as u8;
                output[opos + 1] = payload(b);
                opos += 2;
            }
        }
        ipos += 1;
    }
    if !output.is_empty() {
        output[opos] = 0;
    }
    let truncated = ipos < input.len();
    if truncated {
        debug!(
            "escape truncated after {} of {} input bytes \
             (output buffer size = {})",
            ipos,
            input.len(),
            output.len()
        );
    }
    Escaped { len: opos, consumed: ipos, truncated }
}

/// Escapes all of `input` into a freshly allocated `Vec`.
///
/// The returned text is not terminated and is never truncated.
pub fn escape_vec(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() + input.len() / 32 + 1);
    for &b in input {
        match Marker::for_byte(b) {
            None => out.push(b),
            Some(marker) => {
                out.push(marker as u8);
                out.push(payload(b));
            }
        }
    }
    out
}

/// Returns true if and only if `text` satisfies the safe-text invariant.
///
/// That is, `text` contains no `0x00`, `"` or `\` byte, and every marker byte
/// is immediately followed by a payload byte in `128..=191`.
pub fn is_safe_text(text: &[u8]) -> bool {
    let mut i = 0;
    while i < text.len() {
        let b = text[i];
        if Marker::from_u8(b).is_ok() {
            match text.get(i + 1) {
                Some(&p) if p & !PAYLOAD_MASK == PAYLOAD_BIAS => i += 2,
                _ => return false,
            }
        } else if b == 0 || b == b'"' || b == b'\\' {
            return false;
        } else {
            i += 1;
        }
    }
    true
}

/// Returns the number of raw bytes that `text` unescapes to.
///
/// # Errors
///
/// This function returns `DecodeError::MalformedEscape` if the last byte of
/// `text` is a marker, since its payload byte is missing.
pub fn unescape_len(text: &[u8]) -> Result<usize, DecodeError> {
    let (mut i, mut n) = (0, 0);
    while i < text.len() {
        if Marker::from_u8(text[i]).is_ok() {
            if i + 1 == text.len() {
                return Err(DecodeError::MalformedEscape { offset: i as u64 });
            }
            i += 2;
        } else {
            i += 1;
        }
        n += 1;
    }
    Ok(n)
}

/// Unescapes `text` into `output` and returns the number of bytes written.
///
/// The length of `text` is taken from the slice; a trailing terminator, if
/// any, must not be included. Payload bytes are not validated: only their
/// low six bits are used.
///
/// # Errors
///
/// This function returns an error in the following circumstances:
///
/// * The last byte of `text` is a marker with no payload byte.
/// * `output` has length less than `unescape_len(text)`.
pub fn unescape(text: &[u8], output: &mut [u8]) -> Result<usize, DecodeError> {
    let n = unescape_len(text)?;
    if output.len() < n {
        return Err(DecodeError::BufferTooSmall {
            given: output.len() as u64,
            min: n as u64,
        });
    }
    let (mut s, mut d) = (0, 0);
    while s < text.len() {
        let b = text[s];
        match Marker::from_u8(b) {
            Err(b) => {
                output[d] = b;
                s += 1;
            }
            Ok(marker) => {
                output[d] = marker.base() + (text[s + 1] & PAYLOAD_MASK);
                s += 2;
            }
        }
        d += 1;
    }
    trace!("unescaped {} text bytes into {} bytes", text.len(), d);
    Ok(d)
}

/// Unescapes `text` into a freshly allocated `Vec`.
///
/// This returns an error under the same circumstances that
/// [`unescape`](fn.unescape.html) does, except the output is always large
/// enough.
pub fn unescape_vec(text: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut buf = vec![0; unescape_len(text)?];
    unescape(text, &mut buf)?;
    Ok(buf)
}
