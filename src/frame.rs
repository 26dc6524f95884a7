//! Length-prefixed JSON framing
//!
//! One frame is a u32 big-endian byte length followed by exactly that
//! many bytes of one serialized JSON document. Reading a frame either
//! yields one fully decoded document or an [`Error::Transport`]: a
//! disconnect, a truncated or oversized frame, and an undecodable
//! document are all treated as the same transport-level failure, and
//! the caller tears the connection down without answering.

use crate::error::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Frames larger than this are treated as corruption rather than read
/// into memory.
pub const MAX_FRAME_LEN: usize = 1024 * 1024; // 1 MB

/// Read one frame and decode its document.
///
/// # Errors
///
/// Returns [`Error::Transport`] on disconnect, short read, an
/// oversized length prefix, or a document that does not decode as `T`.
pub async fn read_frame<S, T>(stream: &mut S) -> Result<T>
where
    S: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| Error::Transport(format!("reading frame length: {e}")))?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(Error::Transport(format!("frame too large: {len} bytes")));
    }

    let mut body = vec![0u8; len];
    stream
        .read_exact(&mut body)
        .await
        .map_err(|e| Error::Transport(format!("reading frame body: {e}")))?;

    serde_json::from_slice(&body).map_err(|e| Error::Transport(format!("undecodable frame: {e}")))
}

/// Encode a document and write it as one frame, flushing afterwards.
///
/// # Errors
///
/// Returns [`Error::Transport`] if encoding fails, the encoded
/// document exceeds [`MAX_FRAME_LEN`], or the peer is gone.
pub async fn write_frame<S, T>(stream: &mut S, document: &T) -> Result<()>
where
    S: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = serde_json::to_vec(document)
        .map_err(|e| Error::Transport(format!("encoding frame: {e}")))?;
    if body.len() > MAX_FRAME_LEN {
        return Err(Error::Transport(format!(
            "frame too large: {} bytes",
            body.len()
        )));
    }
    let len = u32::try_from(body.len())
        .map_err(|_| Error::Transport(format!("frame too large: {} bytes", body.len())))?;

    stream
        .write_all(&len.to_be_bytes())
        .await
        .map_err(|e| Error::Transport(format!("writing frame: {e}")))?;
    stream
        .write_all(&body)
        .await
        .map_err(|e| Error::Transport(format!("writing frame: {e}")))?;
    stream
        .flush()
        .await
        .map_err(|e| Error::Transport(format!("writing frame: {e}")))?;
    Ok(())
}
