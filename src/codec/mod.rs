//! Length-prefixed framing over async byte streams.
//!
//! Every message travels as `[u32 big-endian length][payload]`. There is no
//! type byte and no checksum; message typing belongs to the layer above.

mod framed;

pub use framed::{HEADER_LEN, encode_frame, read_exact_or_eof, read_frame, write_frame};
