use serde::{Serialize, Deserialize};
use std::path::{Path, PathBuf};
use std::fs::{OpenOptions, File};
use std::io::{BufReader, BufWriter, Write, BufRead};
use anyhow::{Result, Context};
use chrono::Utc;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum OperationOutcome {
    Ok,
    Failed,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub client_id: u32,
    pub operation: String,
    pub filename: String,
    pub status_code: Option<u16>,
    pub bytes: u64,
    pub outcome: OperationOutcome,
    pub error: Option<String>,
}

impl HistoryEntry {
    pub fn now(client_id: u32, operation: &str, filename: &str) -> Self {
        HistoryEntry {
            timestamp: Utc::now().to_rfc3339(),
            client_id,
            operation: operation.to_string(),
            filename: filename.to_string(),
            status_code: None,
            bytes: 0,
            outcome: OperationOutcome::Ok,
            error: None,
        }
    }
}

/// Append-only JSONL journal of completed and failed operations.
pub struct HistoryLog {
    log_file_path: PathBuf,
}

impl HistoryLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        HistoryLog { log_file_path: path.as_ref().to_path_buf() }
    }

    pub fn add_entry(&self, entry: HistoryEntry) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file_path)
            .context("Failed to open history log file")?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &entry)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_log(&self) -> Result<Vec<HistoryEntry>> {
        if !self.log_file_path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.log_file_path)
            .context("Failed to open history log file for reading")?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: HistoryEntry = serde_json::from_str(&line)?;
            entries.push(entry);
        }
        Ok(entries)
    }
}
