//! High-level backup operations: one session per request
//!
//! Each operation builds its header through the codec, opens a fresh
//! session, drives the payload phase through the transfer engine or the
//! listing reader, checks the final status, and half-closes before the
//! session drops. Nothing is shared between operations.

use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use crate::codec::{self, ResponseHeader};
use crate::config::ServerAddr;
use crate::error::Error;
use crate::listing;
use crate::logger::{Logger, NoopLogger};
use crate::protocol::{Op, Status, MAX_FILE_SIZE, VERSION};
use crate::session::Session;
use crate::transfer;

/// Process-wide client tag. The server never verifies it; it only keys the
/// per-client backup directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientId(pub u32);

impl ClientId {
    pub fn random() -> ClientId {
        ClientId(rand::random())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

pub struct Client {
    id: ClientId,
    server: ServerAddr,
    logger: Arc<dyn Logger>,
}

impl Client {
    pub fn new(server: ServerAddr, id: ClientId) -> Client {
        Client { id, server, logger: Arc::new(NoopLogger) }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Client {
        self.logger = logger;
        self
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Back up the file at `path`, sending the path string as the remote
    /// name. Returns the number of payload bytes sent.
    pub fn backup(&self, path: &Path) -> Result<u64, Error> {
        let file = File::open(path).map_err(Error::File)?;
        let len = file.metadata().map_err(Error::File)?.len();
        let name = path.to_string_lossy();
        let mut source = file;
        self.backup_from(&name, &mut source, len)
    }

    /// Back up `len` bytes from an arbitrary source under the given remote
    /// name. All local validation happens before any connection is opened.
    pub fn backup_from(
        &self,
        name: &str,
        source: &mut impl Read,
        len: u64,
    ) -> Result<u64, Error> {
        if len == 0 {
            return Err(Error::EmptyFile);
        }
        if len >= MAX_FILE_SIZE {
            return Err(Error::SizeLimit(len));
        }
        let mut msg = codec::encode_request(self.id.0, VERSION, Op::Backup.code(), name)?;
        msg.extend_from_slice(&(len as u32).to_le_bytes());

        self.logger.request("backup", name);
        let mut session = self.connect()?;
        session.send(&msg)?;
        session.settle();
        let sent = transfer::upload(source, &mut session)?;

        let resp = read_response(&mut session)?;
        self.logger.response("backup", &Status::from_code(resp.status).to_string());
        let check = expect_status(Op::Backup, &resp);
        session.half_close();
        check?;
        self.logger.transferred("backup", name, sent);
        Ok(sent)
    }

    /// Retrieve the remote file `name` into a new local file at `dest`.
    /// Returns the number of bytes written.
    pub fn retrieve(&self, name: &str, dest: &Path) -> Result<u64, Error> {
        let mut file = File::create(dest).map_err(Error::File)?;
        self.retrieve_into(name, &mut file)
    }

    /// Retrieve the remote file `name` into an arbitrary sink. The download
    /// is bounded by the size the server declares in its response; trailing
    /// bytes past that boundary are discarded.
    pub fn retrieve_into(&self, name: &str, dest: &mut impl Write) -> Result<u64, Error> {
        let msg = codec::encode_request(self.id.0, VERSION, Op::Retrieve.code(), name)?;

        self.logger.request("retrieve", name);
        let mut session = self.connect()?;
        session.send(&msg)?;

        let resp = read_response(&mut session)?;
        self.logger.response("retrieve", &Status::from_code(resp.status).to_string());
        if let Err(e) = expect_status(Op::Retrieve, &resp) {
            session.half_close();
            return Err(e);
        }

        let declared = u64::from(resp.payload_size.unwrap_or(0));
        session.settle();
        let received = transfer::download(&mut session, dest, declared);
        session.half_close();

        if received != declared {
            self.logger.error("retrieve", &format!("short transfer of {}", name));
            return Err(Error::Incomplete { expected: declared, received });
        }
        // log the name the server echoed back, when it sent one
        let echoed = resp.filename_lossy();
        let target = if echoed.is_empty() { name } else { echoed.as_str() };
        self.logger.transferred("retrieve", target, received);
        Ok(received)
    }

    /// Erase the remote file `name` from this client's backup directory.
    pub fn erase(&self, name: &str) -> Result<(), Error> {
        let msg = codec::encode_request(self.id.0, VERSION, Op::Erase.code(), name)?;

        self.logger.request("erase", name);
        let mut session = self.connect()?;
        session.send(&msg)?;

        let resp = read_response(&mut session)?;
        self.logger.response("erase", &Status::from_code(resp.status).to_string());
        let check = expect_status(Op::Erase, &resp);
        session.half_close();
        check
    }

    /// List the files currently backed up for this client id.
    pub fn list(&self) -> Result<Vec<String>, Error> {
        let msg = codec::encode_request(self.id.0, VERSION, Op::List.code(), "")?;

        self.logger.request("list", "");
        let mut session = self.connect()?;
        session.send(&msg)?;

        let resp = read_response(&mut session)?;
        self.logger.response("list", &Status::from_code(resp.status).to_string());
        if let Err(e) = expect_status(Op::List, &resp) {
            session.half_close();
            return Err(e);
        }

        // the size field of a list response carries a record count, not bytes
        let hint = u64::from(resp.payload_size.unwrap_or(0));
        session.settle();
        let records = listing::read_records(&mut session, hint);
        session.half_close();
        self.logger.transferred("list", "", records.len() as u64);
        Ok(records)
    }

    fn connect(&self) -> Result<Session, Error> {
        Session::open(&self.server.host, self.server.port)
    }
}

fn read_response(session: &mut Session) -> Result<ResponseHeader, Error> {
    let raw = session.recv_chunk()?;
    Ok(codec::decode_response(&raw))
}

fn expect_status(op: Op, resp: &ResponseHeader) -> Result<(), Error> {
    let got = Status::from_code(resp.status);
    let expected = op.expected_status();
    if got != expected {
        return Err(Error::StatusMismatch { expected, got });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn unreachable_server() -> ServerAddr {
        // bind then drop: nothing listens here, so any connect attempt fails
        let sock = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = sock.local_addr().unwrap().port();
        ServerAddr { host: "127.0.0.1".to_string(), port }
    }

    #[test]
    fn empty_backup_is_rejected_without_connecting() {
        let client = Client::new(unreachable_server(), ClientId(42));
        let mut source = Cursor::new(Vec::<u8>::new());
        match client.backup_from("a.txt", &mut source, 0) {
            Err(Error::EmptyFile) => {}
            other => panic!("expected EmptyFile, got {:?}", other),
        }
    }

    #[test]
    fn oversize_backup_is_rejected_without_connecting() {
        let client = Client::new(unreachable_server(), ClientId(42));
        let mut source = Cursor::new(vec![0u8; 4]);
        // exactly 2^32 sits at the limit and must already be refused
        match client.backup_from("big.bin", &mut source, 1 << 32) {
            Err(Error::SizeLimit(n)) => assert_eq!(n, 1 << 32),
            other => panic!("expected SizeLimit, got {:?}", other),
        }
        match client.backup_from("bigger.bin", &mut source, (1 << 32) + 5) {
            Err(Error::SizeLimit(_)) => {}
            other => panic!("expected SizeLimit, got {:?}", other),
        }
    }

    #[test]
    fn largest_encodable_size_still_tries_to_connect() {
        let client = Client::new(unreachable_server(), ClientId(42));
        let mut source = Cursor::new(vec![0u8; 4]);
        // one byte below the limit passes validation and reaches the network
        match client.backup_from("edge.bin", &mut source, (1 << 32) - 1) {
            Err(Error::Connection { .. }) => {}
            other => panic!("expected Connection, got {:?}", other),
        }
    }

    #[test]
    fn connection_failure_is_reported_per_operation() {
        let client = Client::new(unreachable_server(), ClientId(7));
        assert!(matches!(client.list(), Err(Error::Connection { .. })));
        assert!(matches!(client.erase("x"), Err(Error::Connection { .. })));
        let mut sink: Vec<u8> = Vec::new();
        assert!(matches!(
            client.retrieve_into("x", &mut sink),
            Err(Error::Connection { .. })
        ));
    }
}
