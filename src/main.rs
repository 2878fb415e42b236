//! Stash - sequential backup client over a fixed binary TCP protocol
//!
//! One connection per operation, strictly sequential: an operation fully
//! completes, including teardown, before the next begins. A failed operation
//! is reported and the run continues; sessions share no state.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use stash::client::{Client, ClientId};
use stash::config::{self, ServerAddr};
use stash::error::Error;
use stash::log::{HistoryEntry, HistoryLog, OperationOutcome};
use stash::logger::{Logger, NoopLogger, TextLogger};
use stash::protocol::Op;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Stash - back up, retrieve, erase and list files on a stash server"
)]
struct Args {
    /// Server address file (a single host:port line)
    #[arg(long, default_value = "server.info")]
    server_info: PathBuf,

    /// Backup list file (one local path per line)
    #[arg(long, default_value = "backup.info")]
    backup_info: PathBuf,

    /// Fixed client id (random per process if omitted)
    #[arg(long)]
    client_id: Option<u32>,

    /// Write timestamped log lines to file
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,

    /// Append one JSONL history entry per operation
    #[arg(long = "history-file")]
    history_file: Option<PathBuf>,

    /// Show transfer progress bars
    #[arg(short, long)]
    progress: bool,

    /// Show each step
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Back up files (defaults to every path in the backup list)
    Backup {
        /// Files to back up instead of the configured list
        files: Vec<PathBuf>,
    },
    /// Retrieve a backed-up file from the server
    Retrieve {
        /// Remote name, as it was sent during backup
        name: String,
        /// Local destination path
        #[arg(long, default_value = "tmp")]
        out: PathBuf,
    },
    /// Erase a backed-up file on the server
    Erase {
        /// Remote name to erase
        name: String,
    },
    /// List files currently backed up for this client id
    List,
    /// Scripted demonstration run against the configured backup list
    Demo,
}

fn main() -> Result<()> {
    // Set up Ctrl-C handler
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted by user. Exiting (Ctrl-C)...");
        // Exit immediately with 130 (128 + SIGINT)
        std::process::exit(130);
    })
    .expect("Error setting Ctrl-C handler");

    let args = Args::parse();

    // Choose logger once; zero overhead elsewhere with NoopLogger
    let logger: Arc<dyn Logger + Send + Sync> = if let Some(ref p) = args.log_file {
        match TextLogger::new(p) {
            Ok(l) => Arc::new(l),
            Err(_) => Arc::new(NoopLogger),
        }
    } else {
        Arc::new(NoopLogger)
    };

    let server = ServerAddr::load(&args.server_info)
        .with_context(|| format!("loading {}", args.server_info.display()))?;
    let id = args.client_id.map(ClientId).unwrap_or_else(ClientId::random);
    println!("Client id: {}", id);
    if args.verbose {
        println!("Server: {}", server);
    }

    let history = args.history_file.as_ref().map(HistoryLog::new);
    let runner = Runner {
        client: Client::new(server, id).with_logger(logger),
        history,
        progress: args.progress,
        verbose: args.verbose,
    };

    match args.command.unwrap_or(Command::Demo) {
        Command::Backup { files } => {
            let files = if files.is_empty() {
                config::load_backup_list(&args.backup_info)
                    .with_context(|| format!("loading {}", args.backup_info.display()))?
                    .into_iter()
                    .map(PathBuf::from)
                    .collect()
            } else {
                files
            };
            if files.is_empty() {
                anyhow::bail!("nothing to back up: no files given and the list is empty");
            }
            for path in files {
                runner.backup(&path);
            }
        }
        Command::Retrieve { name, out } => {
            runner.retrieve(&name, &out);
        }
        Command::Erase { name } => {
            runner.erase(&name);
        }
        Command::List => {
            runner.list();
        }
        Command::Demo => {
            let list = config::load_backup_list(&args.backup_info)
                .with_context(|| format!("loading {}", args.backup_info.display()))?;
            if list.len() < 2 {
                anyhow::bail!(
                    "the demo needs at least two paths in {}",
                    args.backup_info.display()
                );
            }
            runner.demo(&list);
        }
    }
    Ok(())
}

/// Sequences operations, prints outcomes, and journals them. Every failure
/// is non-fatal: the next operation starts on a fresh session regardless.
struct Runner {
    client: Client,
    history: Option<HistoryLog>,
    progress: bool,
    verbose: bool,
}

impl Runner {
    fn backup(&self, path: &Path) -> bool {
        let name = path.to_string_lossy().into_owned();
        println!("Backing up {}", name);
        let result = self.backup_inner(path);
        match &result {
            Ok(sent) => println!("  sent {} bytes", sent),
            Err(e) => eprintln!("  backup failed: {}", describe(e)),
        }
        self.journal(Op::Backup, &name, result.as_ref().ok().copied(), result.as_ref().err());
        result.is_ok()
    }

    fn backup_inner(&self, path: &Path) -> Result<u64, Error> {
        if !self.progress {
            return self.client.backup(path);
        }
        let file = File::open(path).map_err(Error::File)?;
        let len = file.metadata().map_err(Error::File)?.len();
        let pb = ProgressBar::new(len).with_style(progress_style());
        let mut reader = pb.wrap_read(file);
        let name = path.to_string_lossy();
        let sent = self.client.backup_from(&name, &mut reader, len);
        pb.finish_and_clear();
        sent
    }

    fn retrieve(&self, name: &str, out: &Path) -> bool {
        println!("Retrieving {} -> {}", name, out.display());
        let result = self.retrieve_inner(name, out);
        match &result {
            Ok(received) => println!("  received {} bytes", received),
            Err(e) => eprintln!("  retrieve failed: {}", describe(e)),
        }
        self.journal(Op::Retrieve, name, result.as_ref().ok().copied(), result.as_ref().err());
        result.is_ok()
    }

    fn retrieve_inner(&self, name: &str, out: &Path) -> Result<u64, Error> {
        if !self.progress {
            return self.client.retrieve(name, out);
        }
        let file = File::create(out).map_err(Error::File)?;
        let pb = ProgressBar::new_spinner();
        let mut writer = pb.wrap_write(file);
        let received = self.client.retrieve_into(name, &mut writer);
        pb.finish_and_clear();
        received
    }

    fn erase(&self, name: &str) -> bool {
        println!("Erasing {}", name);
        let result = self.client.erase(name);
        match &result {
            Ok(()) => println!("  erased"),
            Err(e) => eprintln!("  erase failed: {}", describe(e)),
        }
        self.journal(Op::Erase, name, None, result.as_ref().err());
        result.is_ok()
    }

    fn list(&self) -> bool {
        println!("Listing backups");
        let result = self.client.list();
        match &result {
            Ok(records) => {
                if records.is_empty() {
                    println!("  (empty)");
                }
                for record in records {
                    for line in record.lines() {
                        println!("  {}", line);
                    }
                }
            }
            Err(e) => eprintln!("  list failed: {}", describe(e)),
        }
        let count = result.as_ref().map(|r| r.len() as u64).ok();
        self.journal(Op::List, "", count, result.as_ref().err());
        result.is_ok()
    }

    /// The original demonstration sequence: list, back up the first two
    /// configured files, list again, retrieve the first as `tmp`, erase it,
    /// then retrieve it again - the last step is expected to fail.
    fn demo(&self, backup_list: &[String]) {
        self.list();
        self.backup(Path::new(&backup_list[0]));
        self.backup(Path::new(&backup_list[1]));
        self.list();
        self.retrieve(&backup_list[0], Path::new("tmp"));
        self.erase(&backup_list[0]);
        println!("(the next retrieve should fail: the file was just erased)");
        let failed = !self.retrieve(&backup_list[0], Path::new("tmp2"));
        if failed {
            println!("Demo finished: the erased file is gone, as expected");
        } else {
            eprintln!("Demo finished, but the erased file was still retrievable");
        }
    }

    fn journal(&self, op: Op, name: &str, bytes: Option<u64>, err: Option<&Error>) {
        if self.verbose {
            if let Some(e) = err {
                println!("  [{}] error: {}", op, describe(e));
            }
        }
        let Some(history) = &self.history else { return };
        let mut entry = HistoryEntry::now(self.client.id().0, &op.to_string(), name);
        entry.bytes = bytes.unwrap_or(0);
        entry.status_code = match err {
            None => Some(op.expected_status().code()),
            Some(Error::StatusMismatch { got, .. }) => Some(got.code()),
            Some(_) => None,
        };
        if let Some(e) = err {
            entry.outcome = OperationOutcome::Failed;
            entry.error = Some(describe(e));
        }
        if let Err(e) = history.add_entry(entry) {
            eprintln!("history log write failed: {:#}", e);
        }
    }
}

fn progress_style() -> ProgressStyle {
    ProgressStyle::with_template("{bar:30} {bytes}/{total_bytes} {bytes_per_sec}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Render an error with its underlying cause, if any.
fn describe(e: &Error) -> String {
    use std::error::Error as _;
    match e.source() {
        Some(source) => format!("{}: {}", e, source),
        None => e.to_string(),
    }
}
