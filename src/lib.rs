/*!
Compression plus safe-text escaping, so arbitrary bytes can be embedded as the
body of a quoted string literal.

Encoding compresses the raw bytes into a zlib stream at the best level and
then escapes every byte that would break a literal. The resulting text
contains no `0x00`, `"` or `\` byte. Four marker bytes (`245` through `248`)
only ever appear as the first byte of a two byte escape pair. Decoding
reverses both steps.

The length of a text must always be tracked alongside it. The bounded buffer
APIs write a `0x00` terminator after the text, but the terminator is never
counted and decoding never searches for it.

# Example

```
let raw = b"AAAA\"BBBB\\CCCC";
let text = base252::encode(raw, base252::max_encode_len(raw.len())).unwrap();
assert!(!text.is_truncated());
assert!(base252::is_safe_text(text.as_bytes()));

let back = base252::decode(text.as_bytes(), 1024).unwrap();
assert_eq!(&back[..], &raw[..]);
```

Lower level access is available through `Encoder` and `Decoder`, which write
into caller supplied buffers, and through the `escape` and `deflate` stages on
their own.
*/

#![deny(missing_docs)]

pub use crate::codec::{
    decode, encode, max_encode_len, Decoder, Encoder, SafeText,
};
pub use crate::deflate::{
    decompress, decompress_vec, max_compress_len, Compressor, BEST_LEVEL,
};
pub use crate::error::{CompressError, DecodeError, DecompressError};
pub use crate::escape::{
    escape, escape_vec, is_safe_text, max_escape_len, unescape, unescape_len,
    unescape_vec, Escaped, Marker,
};

mod codec;
mod deflate;
mod error;
mod escape;
