/**
 * Length-prefixed JSON framing used for every message exchanged over a
 * worker's stdin/stdout pipes.
 *
 * Each frame is a 4-byte little-endian length prefix followed by that many
 * bytes of `serde_json`-encoded payload. This mirrors the framed
 * read/write primitives used by process-isolated workers elsewhere in the
 * corpus (the PVF worker protocol's `framed_recv_blocking`/
 * `framed_send_blocking`), swapping SCALE codec for JSON to stay on the
 * teacher's `serde`/`serde_json` stack.
 */
use std::io::{self, Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Writes one framed message. Flushes the writer so a reader blocked on
/// the other end of a pipe sees the frame promptly.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> io::Result<()> {
    let body = serde_json::to_vec(msg).map_err(to_io_error)?;
    let len = u32::try_from(body.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "frame too large"))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&body)?;
    writer.flush()
}

/// Reads one framed message. Returns `Ok(None)` on a clean EOF before any
/// bytes of the next frame arrive (the peer closed its end).
pub fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> io::Result<Option<T>> {
    let mut len_buf = [0u8; 4];
    if let Err(err) = reader.read_exact(&mut len_buf) {
        return if err.kind() == io::ErrorKind::UnexpectedEof {
            Ok(None)
        } else {
            Err(err)
        };
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body)?;
    let msg = serde_json::from_slice(&body).map_err(to_io_error)?;
    Ok(Some(msg))
}

fn to_io_error(err: serde_json::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}
