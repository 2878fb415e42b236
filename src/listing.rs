//! Reader for the server-pushed backup listing stream
//!
//! The listing phase is a sequence of text records, one per chunk, with no
//! byte length announced up front. The response header's payload-size field
//! doubles as an approximate record count for this one operation; it bounds
//! how long we keep reading, it does not measure bytes.

use std::io::{ErrorKind, Read};

use crate::protocol::CHUNK_SIZE;

/// Read listing records until the peer closes, a transport error occurs, or
/// more than `record_hint + 1` chunks have been consumed. Each non-empty
/// chunk is one printable record; a trailing newline is stripped.
///
/// Errors are not surfaced: the records gathered so far are returned and the
/// caller tears the session down either way.
pub fn read_records(transport: &mut impl Read, record_hint: u64) -> Vec<String> {
    let mut records = Vec::new();
    let mut chunk = [0u8; CHUNK_SIZE];

    while records.len() as u64 <= record_hint {
        let n = match transport.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => break,
        };
        let text = String::from_utf8_lossy(&chunk[..n]);
        records.push(text.trim_end_matches('\n').to_string());
    }
    records
}
