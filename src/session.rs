//! One TCP connection per protocol operation
//!
//! A session knows nothing about the wire layout; it moves raw bytes and
//! owns the connection lifecycle. Sessions are never reused: each operation
//! opens its own and the connection is released when the session drops.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::thread;

use crate::error::Error;
use crate::protocol::{CHUNK_SIZE, SETTLE_DELAY};

pub struct Session {
    stream: TcpStream,
}

impl Session {
    /// Connect to `host:port`.
    pub fn open(host: &str, port: u16) -> Result<Session, Error> {
        let addr = format!("{}:{}", host, port);
        let stream = TcpStream::connect(&addr).map_err(|source| Error::Connection {
            addr,
            source,
        })?;
        let _ = stream.set_nodelay(true);
        Ok(Session { stream })
    }

    /// Wrap an already-connected stream. Used by tests that hand-build
    /// socket pairs.
    pub fn from_stream(stream: TcpStream) -> Session {
        let _ = stream.set_nodelay(true);
        Session { stream }
    }

    /// Send the whole buffer: complete transmission or a transport error.
    /// Partial writes are retried internally by `write_all`.
    pub fn send(&mut self, buf: &[u8]) -> Result<(), Error> {
        self.stream.write_all(buf).map_err(Error::Transport)
    }

    /// One chunk-sized read. Returns the bytes that arrived, which may be
    /// empty if the peer finished sending.
    pub fn recv_chunk(&mut self) -> Result<Vec<u8>, Error> {
        let mut buf = [0u8; CHUNK_SIZE];
        let n = self.stream.read(&mut buf).map_err(Error::Transport)?;
        Ok(buf[..n].to_vec())
    }

    /// Wait out the gap the server needs to see the preceding header and the
    /// upcoming payload as two separate reads.
    pub fn settle(&self) {
        thread::sleep(SETTLE_DELAY);
    }

    /// Tell the peer no more data is coming from this side. Reads stay open.
    /// Safe on an already-failed connection; repeated shutdowns are ignored.
    pub fn half_close(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Write);
    }
}

// Capability pair for the transfer engine and listing reader: a session is
// just a byte source/sink to them, so tests can substitute in-memory streams.
impl Read for Session {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for Session {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn free_port() -> u16 {
        let sock = TcpListener::bind("127.0.0.1:0").unwrap();
        sock.local_addr().unwrap().port()
    }

    #[test]
    fn connect_failure_is_a_connection_error() {
        // bind then drop so nothing is listening on the port
        let port = free_port();
        match Session::open("127.0.0.1", port) {
            Err(Error::Connection { addr, .. }) => {
                assert_eq!(addr, format!("127.0.0.1:{}", port));
            }
            other => panic!("expected Connection error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn send_recv_and_half_close() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut peer, _) = listener.accept().unwrap();
            let mut buf = [0u8; 16];
            let n = peer.read(&mut buf).unwrap();
            assert_eq!(&buf[..n], b"ping");
            peer.write_all(b"pong").unwrap();
            // after the client's half-close we must observe EOF
            let n = peer.read(&mut buf).unwrap();
            assert_eq!(n, 0);
        });

        let stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        let mut session = Session::from_stream(stream);
        session.send(b"ping").unwrap();
        let reply = session.recv_chunk().unwrap();
        assert_eq!(reply, b"pong");
        session.half_close();
        session.half_close(); // second shutdown must be harmless
        server.join().unwrap();
    }

    #[test]
    fn recv_chunk_reports_peer_close_as_empty() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (peer, _) = listener.accept().unwrap();
            drop(peer);
        });
        let mut session = Session::open("127.0.0.1", port).unwrap();
        server.join().unwrap();
        assert!(session.recv_chunk().unwrap().is_empty());
    }
}
