use anyhow::Result;
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

pub trait Logger: Send + Sync {
    fn request(&self, _op: &str, _target: &str) {}
    fn response(&self, _op: &str, _status: &str) {}
    fn transferred(&self, _op: &str, _target: &str, _bytes: u64) {}
    fn error(&self, _context: &str, _msg: &str) {}
}

pub struct NoopLogger;
impl Logger for NoopLogger {}

pub struct TextLogger {
    file: Mutex<File>,
}

impl TextLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(f),
        })
    }

    fn line(&self, s: &str) {
        if let Ok(mut f) = self.file.lock() {
            let _ = writeln!(f, "[{}] {}", Utc::now().to_rfc3339(), s);
        }
    }
}

impl Logger for TextLogger {
    fn request(&self, op: &str, target: &str) {
        self.line(&format!("REQUEST op={} target={}", op, target));
    }
    fn response(&self, op: &str, status: &str) {
        self.line(&format!("RESPONSE op={} status={}", op, status));
    }
    fn transferred(&self, op: &str, target: &str, bytes: u64) {
        self.line(&format!("TRANSFER op={} target={} bytes={}", op, target, bytes));
    }
    fn error(&self, context: &str, msg: &str) {
        self.line(&format!("ERROR ctx={} msg={}", context, msg));
    }
}
