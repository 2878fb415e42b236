//! External collaborator files: server address and backup list
//!
//! Two plain-text files drive the client: one holding a single `host:port`
//! line, one holding local paths to back up, one per line.

use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddr {
    pub host: String,
    pub port: u16,
}

impl ServerAddr {
    /// Parse a `host:port` line. The last colon splits host from port, so
    /// bracketless IPv6 literals still work.
    pub fn parse(line: &str) -> Result<ServerAddr, Error> {
        let line = line.trim();
        let (host, port) = line
            .rsplit_once(':')
            .ok_or_else(|| Error::Config(format!("expected host:port, got {:?}", line)))?;
        if host.is_empty() {
            return Err(Error::Config(format!("missing host in {:?}", line)));
        }
        let port: u16 = port
            .parse()
            .map_err(|_| Error::Config(format!("bad port in {:?}", line)))?;
        if port == 0 {
            return Err(Error::Config(format!("port 0 is not usable in {:?}", line)));
        }
        Ok(ServerAddr { host: host.to_string(), port })
    }

    /// Load the address from the first line of `path`.
    pub fn load(path: &Path) -> Result<ServerAddr, Error> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let line = text
            .lines()
            .next()
            .ok_or_else(|| Error::Config(format!("{} is empty", path.display())))?;
        ServerAddr::parse(line)
    }
}

impl fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Load the list of local paths to back up: one per line, blank lines and
/// surrounding whitespace ignored. An empty list is legal; callers that need
/// entries decide what that means.
pub fn load_backup_list(path: &Path) -> Result<Vec<String>, Error> {
    let text = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
