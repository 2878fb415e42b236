//! Shared constants and symbol tables for the stash backup wire format

use std::fmt;
use std::time::Duration;

/// Version byte carried in every request and response header.
pub const VERSION: u8 = 1;

/// Chunk size for all streaming transfer. The server reads and writes in
/// units of this size; both directions must agree on it.
pub const CHUNK_SIZE: usize = 1024;

/// Request header bytes before the variable-length filename.
pub const REQUEST_FIXED_LEN: usize = 8;

/// Exclusive upper bound on upload size; the wire carries the length in a u32.
pub const MAX_FILE_SIZE: u64 = 1 << 32;

/// Pause between writing a header and the payload that follows it.
/// The server frames the two only by observing them as separate reads, so the
/// client must not let the kernel coalesce them into one segment.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

// Operation codes (keep numeric stable; the server switches on these)
pub mod op {
    pub const BACKUP_FILE: u8 = 100;
    pub const GET_FILE: u8 = 200;
    pub const ERASE_FILE: u8 = 201;
    pub const LIST_BACKUPS: u8 = 202;
}

// Status codes returned by the server
pub mod status {
    pub const GET_FILE_OK: u16 = 210;
    pub const LIST_OK: u16 = 211;
    pub const BACKUP_OR_ERASE_OK: u16 = 212;
    pub const FILE_NOT_FOUND: u16 = 1001;
    pub const NO_FILES_FOR_CLIENT: u16 = 1002;
    pub const GENERAL_ERROR: u16 = 1003;
}

/// The four request operations. Code 0 is the protocol's explicit invalid
/// sentinel and has no variant; encoding rejects it up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Backup,
    Retrieve,
    Erase,
    List,
}

impl Op {
    pub fn code(self) -> u8 {
        match self {
            Op::Backup => op::BACKUP_FILE,
            Op::Retrieve => op::GET_FILE,
            Op::Erase => op::ERASE_FILE,
            Op::List => op::LIST_BACKUPS,
        }
    }

    pub fn from_code(code: u8) -> Option<Op> {
        match code {
            op::BACKUP_FILE => Some(Op::Backup),
            op::GET_FILE => Some(Op::Retrieve),
            op::ERASE_FILE => Some(Op::Erase),
            op::LIST_BACKUPS => Some(Op::List),
            _ => None,
        }
    }

    /// The success status the server answers with for this operation.
    pub fn expected_status(self) -> Status {
        match self {
            Op::Backup | Op::Erase => Status::BackupOrEraseOk,
            Op::Retrieve => Status::RetrieveOk,
            Op::List => Status::ListOk,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Op::Backup => "backup",
            Op::Retrieve => "retrieve",
            Op::Erase => "erase",
            Op::List => "list",
        };
        f.write_str(s)
    }
}

/// Decoded response status. Codes outside the table map to `Unknown`, which
/// is never a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    RetrieveOk,
    ListOk,
    BackupOrEraseOk,
    FileNotFound,
    NoFilesForClient,
    GeneralError,
    Unknown(u16),
}

impl Status {
    pub fn from_code(code: u16) -> Status {
        match code {
            status::GET_FILE_OK => Status::RetrieveOk,
            status::LIST_OK => Status::ListOk,
            status::BACKUP_OR_ERASE_OK => Status::BackupOrEraseOk,
            status::FILE_NOT_FOUND => Status::FileNotFound,
            status::NO_FILES_FOR_CLIENT => Status::NoFilesForClient,
            status::GENERAL_ERROR => Status::GeneralError,
            other => Status::Unknown(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Status::RetrieveOk => status::GET_FILE_OK,
            Status::ListOk => status::LIST_OK,
            Status::BackupOrEraseOk => status::BACKUP_OR_ERASE_OK,
            Status::FileNotFound => status::FILE_NOT_FOUND,
            Status::NoFilesForClient => status::NO_FILES_FOR_CLIENT,
            Status::GeneralError => status::GENERAL_ERROR,
            Status::Unknown(code) => code,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(
            self,
            Status::RetrieveOk | Status::ListOk | Status::BackupOrEraseOk
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::RetrieveOk => "retrieve-ok",
            Status::ListOk => "list-ok",
            Status::BackupOrEraseOk => "backup-or-erase-ok",
            Status::FileNotFound => "file-not-found",
            Status::NoFilesForClient => "no-files-for-client",
            Status::GeneralError => "general-error",
            Status::Unknown(_) => "unknown",
        };
        write!(f, "{} ({})", name, self.code())
    }
}
