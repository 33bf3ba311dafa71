//! Per-invocation log sinks.
//!
//! Every run installs its own subscriber with three layers:
//!
//! - the console, filtered by `--verbose`/`--quiet`, WARN and ERROR to
//!   stderr and everything else to stdout
//! - an in-memory buffer at DEBUG, stored to `log_file` when a run fails
//! - the optional `--log` file at DEBUG
//!
//! The subscriber is scoped with [`tracing::subscriber::with_default`] so
//! runs in the same process never share sinks.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Local;
use pipkit_config::Environment;
use tracing::{Level, Metadata, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::{self, MakeWriter, time::ChronoUtc};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Layer, Registry};

const PROG: &str = "pipkit";
const SEPARATOR_WIDTH: usize = 60;

/// A cloneable in-memory sink.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for SharedBuffer {
    type Writer = SharedBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Where user-facing output goes: the real terminal, or a pair of
/// buffers for in-process runs.
#[derive(Debug, Clone, Default)]
pub enum Console {
    #[default]
    Terminal,
    Captured {
        stdout: SharedBuffer,
        stderr: SharedBuffer,
    },
}

pub enum ConsoleWriter {
    Stdout(io::Stdout),
    Stderr(io::Stderr),
    Buffer(SharedBuffer),
}

impl Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stdout(w) => w.write(buf),
            Self::Stderr(w) => w.write(buf),
            Self::Buffer(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::Stderr(w) => w.flush(),
            Self::Buffer(w) => w.flush(),
        }
    }
}

impl Console {
    pub fn captured() -> Self {
        Self::Captured {
            stdout: SharedBuffer::new(),
            stderr: SharedBuffer::new(),
        }
    }

    pub fn stdout(&self) -> ConsoleWriter {
        match self {
            Self::Terminal => ConsoleWriter::Stdout(io::stdout()),
            Self::Captured { stdout, .. } => ConsoleWriter::Buffer(stdout.clone()),
        }
    }

    pub fn stderr(&self) -> ConsoleWriter {
        match self {
            Self::Terminal => ConsoleWriter::Stderr(io::stderr()),
            Self::Captured { stderr, .. } => ConsoleWriter::Buffer(stderr.clone()),
        }
    }

    /// Prints `text` plus a newline to stdout. Write failures are ignored.
    pub fn print_out(&self, text: &str) {
        let _ = writeln!(self.stdout(), "{text}");
    }

    /// Prints `text` plus a newline to stderr. Write failures are ignored.
    pub fn print_err(&self, text: &str) {
        let _ = writeln!(self.stderr(), "{text}");
    }

    /// Captured stdout; empty for the terminal.
    pub fn stdout_text(&self) -> String {
        match self {
            Self::Terminal => String::new(),
            Self::Captured { stdout, .. } => stdout.contents(),
        }
    }

    /// Captured stderr; empty for the terminal.
    pub fn stderr_text(&self) -> String {
        match self {
            Self::Terminal => String::new(),
            Self::Captured { stderr, .. } => stderr.contents(),
        }
    }
}

impl<'a> MakeWriter<'a> for Console {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.stdout()
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        if *meta.level() <= Level::WARN {
            self.stderr()
        } else {
            self.stdout()
        }
    }
}

/// Console level: INFO, one step more verbose per `-v`, one step
/// quieter per `-q`.
///
/// # Examples
///
/// ```
/// use pipkit_cli::logging::console_level;
/// use tracing_subscriber::filter::LevelFilter;
///
/// assert_eq!(console_level(0, 0), LevelFilter::INFO);
/// assert_eq!(console_level(3, 1), LevelFilter::TRACE);
/// assert_eq!(console_level(0, 5), LevelFilter::ERROR);
/// ```
pub fn console_level(verbose: u32, quiet: u32) -> LevelFilter {
    match i64::from(verbose) - i64::from(quiet) {
        i64::MIN..=-2 => LevelFilter::ERROR,
        -1 => LevelFilter::WARN,
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Expands a leading `~` using `HOME` from `env`.
pub fn expand_user(path: &str, env: &Environment) -> PathBuf {
    PathBuf::from(shellexpand::tilde_with_context(path, || env.non_empty("HOME")).into_owned())
}

/// Opens `path` for appending, creating parent directories.
///
/// When the file already exists a separator line and a run banner are
/// written first so runs stay distinguishable.
///
/// # Errors
///
/// Returns the underlying I/O error if the directories or file cannot be
/// created or written.
pub fn open_logfile(path: &Path) -> io::Result<File> {
    let path = std::path::absolute(path)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let exists = path.exists();
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    if exists {
        writeln!(file, "{}", "-".repeat(SEPARATOR_WIDTH))?;
        writeln!(file, "{PROG} run on {}", Local::now().format("%c"))?;
    }
    Ok(file)
}

/// Writes the complete debug log of a failed run to `path`.
///
/// # Errors
///
/// See [`open_logfile`].
pub fn store_log(path: &Path, text: &str) -> io::Result<()> {
    let mut file = open_logfile(path)?;
    file.write_all(text.as_bytes())?;
    file.flush()
}

/// Builds the subscriber for one run.
pub fn run_subscriber(
    console: &Console,
    level: LevelFilter,
    explicit_levels: bool,
    buffer: &SharedBuffer,
    logfile: Option<File>,
) -> impl Subscriber + Send + Sync + 'static {
    let console_layer = fmt::layer()
        .without_time()
        .with_target(false)
        .with_level(explicit_levels)
        .with_ansi(false)
        .with_writer(console.clone())
        .with_filter(level);

    let buffer_layer = fmt::layer()
        .with_timer(ChronoUtc::rfc_3339())
        .with_target(false)
        .with_ansi(false)
        .with_writer(buffer.clone())
        .with_filter(LevelFilter::DEBUG);

    let file_layer = logfile.map(|file| {
        fmt::layer()
            .with_timer(ChronoUtc::rfc_3339())
            .with_target(false)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .with_filter(LevelFilter::DEBUG)
    });

    Registry::default()
        .with(console_layer)
        .with(buffer_layer)
        .with(file_layer)
}
