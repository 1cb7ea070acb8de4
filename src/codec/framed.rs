use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

/// Size of the length prefix in bytes.
pub const HEADER_LEN: usize = 4;

/// Append one frame for `payload` to `buf`.
///
/// # Errors
///
/// Returns [`Error::MessageTooLarge`] if the payload length does not fit the
/// 32-bit length prefix.
pub fn encode_frame(payload: &[u8], buf: &mut BytesMut) -> Result<()> {
    let len = u32::try_from(payload.len()).map_err(|_| Error::MessageTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;
    buf.reserve(HEADER_LEN + payload.len());
    buf.put_u32(len);
    buf.put_slice(payload);
    Ok(())
}

/// Write one frame for `payload` to `io` and flush it.
pub async fn write_frame<W: AsyncWrite + Unpin>(io: &mut W, payload: &[u8]) -> Result<()> {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    encode_frame(payload, &mut buf)?;
    io.write_all(&buf).await?;
    io.flush().await?;
    Ok(())
}

/// Fill `buf` completely from `io`.
///
/// Keeps reading across short reads. Returns `Ok(false)` if the stream ends
/// before `buf` is full; whatever was read so far is discarded by the caller.
pub async fn read_exact_or_eof<R: AsyncRead + Unpin>(
    io: &mut R,
    buf: &mut [u8],
) -> std::io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = io.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Ok(false);
        }
        filled += n;
    }
    Ok(true)
}

/// Read the next frame from `io`.
///
/// Returns `Ok(None)` when the stream ends, including in the middle of a
/// frame. A zero or oversized length prefix is a protocol violation: the
/// stream is poisoned and the caller must disconnect.
pub async fn read_frame<R: AsyncRead + Unpin>(
    io: &mut R,
    max_size: usize,
) -> Result<Option<Bytes>> {
    let mut header = [0u8; HEADER_LEN];
    if !read_exact_or_eof(io, &mut header).await? {
        return Ok(None);
    }

    let len = u32::from_be_bytes(header) as usize;
    if len == 0 {
        return Err(Error::EmptyFrame);
    }
    if len > max_size {
        return Err(Error::FrameTooLarge {
            size: len,
            max: max_size,
        });
    }

    let mut payload = vec![0u8; len];
    if !read_exact_or_eof(io, &mut payload).await? {
        return Ok(None);
    }
    Ok(Some(Bytes::from(payload)))
}
