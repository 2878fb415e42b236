//! Chunked payload movement with exact byte accounting
//!
//! The engine is agnostic to the concrete transport: it moves bytes between
//! an `io::Read` producer and an `io::Write` consumer in fixed-size chunks.
//! The chunk size is a local constant shared with the server, not part of
//! the wire format.

use std::io::{ErrorKind, Read, Write};

use crate::error::Error;
use crate::protocol::CHUNK_SIZE;

/// Send `source` until exhausted, one chunk at a time, each chunk verbatim.
///
/// A source that yields no bytes at all is rejected with `EmptyFile` before
/// anything is written to the transport. A transport failure mid-stream
/// aborts immediately; there is no retry and no resume. Returns the number
/// of bytes sent. The total is not checked against any previously declared
/// size; that contract belongs to the caller.
pub fn upload(source: &mut impl Read, transport: &mut impl Write) -> Result<u64, Error> {
    let mut chunk = [0u8; CHUNK_SIZE];
    let mut total: u64 = 0;

    loop {
        let n = match source.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::File(e)),
        };
        transport.write_all(&chunk[..n]).map_err(Error::Transport)?;
        total += n as u64;
    }

    if total == 0 {
        return Err(Error::EmptyFile);
    }
    Ok(total)
}

/// Receive exactly up to `declared` bytes into `dest`.
///
/// Chunks are written whole while the running total stays within `declared`;
/// the chunk that would overshoot is truncated so the destination ends up
/// with exactly `declared` bytes, then reading stops. Bytes past the
/// boundary belong to some later message and are discarded.
///
/// Returns the byte count actually written. A transport or destination
/// failure mid-stream yields the partial count rather than an error; the
/// caller compares the count against the expected size to decide success.
pub fn download(transport: &mut impl Read, dest: &mut impl Write, declared: u64) -> u64 {
    let mut chunk = [0u8; CHUNK_SIZE];
    let mut written: u64 = 0;

    // `<=` on purpose: after landing exactly on the boundary, one more read
    // is needed to find out whether the stream ended or trailing bytes of an
    // unrelated message follow.
    while written <= declared {
        let n = match transport.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => break,
        };

        let remaining = declared - written;
        if n as u64 <= remaining {
            if dest.write_all(&chunk[..n]).is_err() {
                break;
            }
            written += n as u64;
        } else {
            if dest.write_all(&chunk[..remaining as usize]).is_err() {
                break;
            }
            written = declared;
            break;
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    /// Read side scripted as a fixed sequence of chunks, optionally ending
    /// in an error instead of EOF.
    struct ScriptedReader {
        chunks: Vec<Vec<u8>>,
        fail_at_end: bool,
    }

    impl ScriptedReader {
        fn new(chunks: Vec<Vec<u8>>) -> Self {
            Self { chunks, fail_at_end: false }
        }

        fn failing(chunks: Vec<Vec<u8>>) -> Self {
            Self { chunks, fail_at_end: true }
        }
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.chunks.is_empty() {
                if self.fail_at_end {
                    return Err(io::Error::new(io::ErrorKind::ConnectionReset, "gone"));
                }
                return Ok(0);
            }
            let chunk = self.chunks.remove(0);
            assert!(chunk.len() <= buf.len(), "scripted chunk exceeds read buffer");
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }
    }

    /// Write side that counts write calls and can be told to fail.
    struct FlakySink {
        written: Vec<u8>,
        writes: usize,
        fail_after_writes: Option<usize>,
    }

    impl FlakySink {
        fn new() -> Self {
            Self { written: Vec::new(), writes: 0, fail_after_writes: None }
        }

        fn failing_after(n: usize) -> Self {
            Self { written: Vec::new(), writes: 0, fail_after_writes: Some(n) }
        }
    }

    impl Write for FlakySink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if let Some(limit) = self.fail_after_writes {
                if self.writes >= limit {
                    return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken"));
                }
            }
            self.writes += 1;
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn upload_sends_everything_in_chunks() {
        let payload: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
        let mut source = Cursor::new(payload.clone());
        let mut sink = FlakySink::new();
        let sent = upload(&mut source, &mut sink).unwrap();
        assert_eq!(sent, 3000);
        assert_eq!(sink.written, payload);
    }

    #[test]
    fn upload_of_empty_source_touches_nothing() {
        let mut source = Cursor::new(Vec::<u8>::new());
        let mut sink = FlakySink::new();
        match upload(&mut source, &mut sink) {
            Err(Error::EmptyFile) => {}
            other => panic!("expected EmptyFile, got {:?}", other),
        }
        assert_eq!(sink.writes, 0, "no network write may be issued");
    }

    #[test]
    fn upload_aborts_on_transport_failure() {
        let payload = vec![7u8; 5 * CHUNK_SIZE];
        let mut source = Cursor::new(payload);
        let mut sink = FlakySink::failing_after(2);
        match upload(&mut source, &mut sink) {
            Err(Error::Transport(_)) => {}
            other => panic!("expected Transport, got {:?}", other),
        }
        assert_eq!(sink.written.len(), 2 * CHUNK_SIZE);
    }

    #[test]
    fn download_truncates_exactly_at_declared_size() {
        // 1024 payload bytes then 10 trailing bytes of a later message
        let mut transport = ScriptedReader::new(vec![vec![1u8; 1024], vec![9u8; 10]]);
        let mut dest = FlakySink::new();
        let written = download(&mut transport, &mut dest, 1024);
        assert_eq!(written, 1024);
        assert_eq!(dest.written.len(), 1024);
        assert!(dest.written.iter().all(|&b| b == 1));
    }

    #[test]
    fn download_splits_the_boundary_chunk() {
        // declared 2000, delivered as 1024 + 1024: the second chunk is cut
        // at 976 bytes and the remaining 48 are discarded
        let mut transport = ScriptedReader::new(vec![vec![1u8; 1024], vec![2u8; 1024]]);
        let mut dest = FlakySink::new();
        let written = download(&mut transport, &mut dest, 2000);
        assert_eq!(written, 2000);
        assert_eq!(dest.written.len(), 2000);
        assert_eq!(dest.written[1023], 1);
        assert_eq!(dest.written[1024], 2);
    }

    #[test]
    fn download_never_exceeds_declared_for_any_chunking() {
        for sizes in [
            vec![1usize],
            vec![1024],
            vec![512, 512, 512],
            vec![100, 900, 100, 900],
            vec![1024, 1024, 1024],
        ] {
            let chunks: Vec<Vec<u8>> = sizes.iter().map(|&n| vec![3u8; n]).collect();
            let delivered: u64 = sizes.iter().map(|&n| n as u64).sum();
            for declared in [0u64, 1, 511, 1024, 1500, 4096] {
                let mut transport = ScriptedReader::new(chunks.clone());
                let mut dest = FlakySink::new();
                let written = download(&mut transport, &mut dest, declared);
                assert!(written <= declared);
                assert_eq!(written, declared.min(delivered));
                assert_eq!(dest.written.len() as u64, written);
            }
        }
    }

    #[test]
    fn download_of_zero_bytes_writes_nothing() {
        let mut transport = ScriptedReader::new(vec![vec![5u8; 64]]);
        let mut dest = FlakySink::new();
        assert_eq!(download(&mut transport, &mut dest, 0), 0);
        assert!(dest.written.is_empty());
    }

    #[test]
    fn download_returns_partial_count_on_transport_error() {
        let mut transport = ScriptedReader::failing(vec![vec![1u8; 1024]]);
        let mut dest = FlakySink::new();
        let written = download(&mut transport, &mut dest, 4096);
        assert_eq!(written, 1024);
    }

    #[test]
    fn download_stops_on_peer_close_short_of_declared() {
        let mut transport = ScriptedReader::new(vec![vec![1u8; 300]]);
        let mut dest = FlakySink::new();
        assert_eq!(download(&mut transport, &mut dest, 1000), 300);
    }
}
