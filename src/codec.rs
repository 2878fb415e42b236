//! Pure encode/decode for request and response headers
//!
//! No I/O lives here. Both directions of the wire layout are kept in this
//! one module so the loopback tests speak exactly the bytes the client does.

use crate::error::Error;
use crate::protocol::{self, Op};

/// Parsed request header, as the server sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    pub client_id: u32,
    pub version: u8,
    pub op_code: u8,
    pub filename: Vec<u8>,
}

/// Parsed response header. The server sends a fixed prefix (version, status)
/// and appends name length, name, and payload size only for some statuses;
/// which of the optional fields are present can only be inferred from how
/// many bytes actually arrived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeader {
    pub version: u8,
    pub status: u16,
    pub name_len: Option<u16>,
    pub filename: Option<Vec<u8>>,
    pub payload_size: Option<u32>,
}

impl ResponseHeader {
    pub fn filename_lossy(&self) -> String {
        match &self.filename {
            Some(name) => String::from_utf8_lossy(name).into_owned(),
            None => String::new(),
        }
    }
}

/// Build a request header: clientId u32 | version u8 | op u8 | nameLen u16 |
/// name bytes, all little-endian, no padding, no terminator.
///
/// The operation code is validated first; 0 is the protocol's invalid
/// sentinel and anything outside the four known codes is rejected.
pub fn encode_request(
    client_id: u32,
    version: u8,
    op_code: u8,
    filename: &str,
) -> Result<Vec<u8>, Error> {
    let op = Op::from_code(op_code).ok_or(Error::InvalidOperation(op_code))?;
    let name = filename.as_bytes();
    let name_len = u16::try_from(name.len()).map_err(|_| Error::NameTooLong(name.len()))?;

    let mut buf = Vec::with_capacity(protocol::REQUEST_FIXED_LEN + name.len());
    buf.extend_from_slice(&client_id.to_le_bytes());
    buf.push(version);
    buf.push(op.code());
    buf.extend_from_slice(&name_len.to_le_bytes());
    buf.extend_from_slice(name);
    Ok(buf)
}

/// Parse a request header. Returns `None` when the buffer is shorter than
/// the fixed prefix plus the declared name length.
pub fn decode_request(raw: &[u8]) -> Option<RequestHeader> {
    if raw.len() < protocol::REQUEST_FIXED_LEN {
        return None;
    }
    let client_id = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
    let version = raw[4];
    let op_code = raw[5];
    let name_len = u16::from_le_bytes([raw[6], raw[7]]) as usize;
    let name_end = protocol::REQUEST_FIXED_LEN.checked_add(name_len)?;
    if raw.len() < name_end {
        return None;
    }
    Some(RequestHeader {
        client_id,
        version,
        op_code,
        filename: raw[protocol::REQUEST_FIXED_LEN..name_end].to_vec(),
    })
}

/// Build a response as the server does: version u8 | status u16 | nameLen u16
/// | name bytes | payload size u32. The name is appended only when non-empty
/// and the size only when non-zero; the name length field is always present.
pub fn encode_response(status: u16, filename: &[u8], payload_size: u32) -> Result<Vec<u8>, Error> {
    let name_len = u16::try_from(filename.len()).map_err(|_| Error::NameTooLong(filename.len()))?;

    let mut buf = Vec::with_capacity(5 + filename.len() + 4);
    buf.push(protocol::VERSION);
    buf.extend_from_slice(&status.to_le_bytes());
    buf.extend_from_slice(&name_len.to_le_bytes());
    if !filename.is_empty() {
        buf.extend_from_slice(filename);
    }
    if payload_size != 0 {
        buf.extend_from_slice(&payload_size.to_le_bytes());
    }
    Ok(buf)
}

/// Best-effort response parse. Never fails: short input yields absent
/// optional fields, and a name length that overruns the buffer is clamped to
/// the bytes that actually arrived. Nothing past `raw` is ever touched.
///
/// Which fields are present is inferred from the total received length
/// (the server appends them without any framing), so a genuinely truncated
/// read is indistinguishable from a deliberately short response here; the
/// caller decides based on the status whether the optional fields matter.
pub fn decode_response(raw: &[u8]) -> ResponseHeader {
    let mut hdr = ResponseHeader {
        version: raw.first().copied().unwrap_or(0),
        status: read_u16_le(raw.get(1..).unwrap_or(&[])),
        ..ResponseHeader::default()
    };

    if raw.len() > 4 {
        let name_len = u16::from_le_bytes([raw[3], raw[4]]);
        hdr.name_len = Some(name_len);

        if raw.len() > 6 {
            let name_end = raw.len().min(5 + name_len as usize);
            hdr.filename = Some(raw[5..name_end].to_vec());
            hdr.payload_size = Some(read_u32_le(raw.get(5 + name_len as usize..).unwrap_or(&[])));
        }
    }
    hdr
}

// Zero-extending little-endian reads: tolerate fewer bytes than the field
// width without indexing past the slice.
fn read_u16_le(b: &[u8]) -> u16 {
    let mut out = [0u8; 2];
    let n = b.len().min(2);
    out[..n].copy_from_slice(&b[..n]);
    u16::from_le_bytes(out)
}

fn read_u32_le(b: &[u8]) -> u32 {
    let mut out = [0u8; 4];
    let n = b.len().min(4);
    out[..n].copy_from_slice(&b[..n]);
    u32::from_le_bytes(out)
}
