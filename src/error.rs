//! Error taxonomy for the client library
//!
//! Every variant is non-fatal from the caller's point of view: a failed
//! operation ends its own session and the next operation starts fresh on a
//! new connection.

use std::io;

use crate::protocol::Status;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed server-address or backup-list file.
    #[error("bad configuration: {0}")]
    Config(String),

    /// The transport connection could not be established.
    #[error("unable to connect to {addr}")]
    Connection {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Send or receive failed mid-operation.
    #[error("transport failure")]
    Transport(#[source] io::Error),

    /// Local file could not be opened, read, or written.
    #[error("local file error")]
    File(#[source] io::Error),

    /// Operation code 0 or any code outside the protocol table.
    #[error("operation code {0} is not part of the protocol")]
    InvalidOperation(u8),

    /// Filename does not fit the u16 length field of the request header.
    #[error("filename is {0} bytes, the wire format allows at most 65535")]
    NameTooLong(usize),

    /// File size does not fit the u32 size prefix.
    #[error("file is {0} bytes, the size prefix caps uploads below 2^32")]
    SizeLimit(u64),

    /// Zero-length upload attempted.
    #[error("refusing to back up an empty file")]
    EmptyFile,

    /// The server answered with a status other than the one this operation
    /// expects.
    #[error("server answered {got} where {expected} was expected")]
    StatusMismatch { expected: Status, got: Status },

    /// A download ended short of the server-declared size.
    #[error("received {received} of {expected} declared bytes")]
    Incomplete { expected: u64, received: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;
