//! User-visible output: results on stdout, leveled diagnostics on stderr,
//! confirmation prompts and progress indication.
//!
//! Every stream is injected so handlers can be exercised against buffers.

mod spinner;
mod table;

pub use spinner::Spinner;
pub use table::Table;

use crossterm::style::{Color, Stylize};
use serde::Serialize;
use std::fmt;
use std::io::{BufRead, IsTerminal, Read, Write};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

const MAX_CONFIRMATION_ATTEMPTS: usize = 3;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
    #[default]
    Info,
    Debug,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Info => "info",
            Level::Debug => "debug",
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Level::Error),
            "warning" => Ok(Level::Warning),
            "info" => Ok(Level::Info),
            "debug" => Ok(Level::Debug),
            other => Err(format!("unknown verbosity {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Pretty => "pretty",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(OutputFormat::Pretty),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            other => Err(format!("unknown output format {other:?}")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum PrintError {
    #[error("write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("marshal output: {0}")]
    Serialize(String),

    #[error(
        "confirmation required: stdin is not a terminal, re-run with --assume-yes to proceed"
    )]
    ConfirmationRequired,

    #[error("operation aborted")]
    Aborted,

    #[error("no answer received")]
    NoInput,

    #[error("max number of wrong inputs reached")]
    TooManyAttempts,
}

pub type Output = Arc<Mutex<Box<dyn Write + Send>>>;
pub type Input = Arc<Mutex<Box<dyn BufRead + Send>>>;

#[derive(Clone)]
pub struct Printer {
    out: Output,
    err: Output,
    input: Input,
    stdin_is_tty: bool,
    stderr_is_tty: bool,
    stdout_width: Option<usize>,
    verbosity: Level,
    progress: bool,
}

impl Printer {
    /// Printer on the process streams.
    pub fn stdio() -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(std::io::stdout()))),
            err: Arc::new(Mutex::new(Box::new(std::io::stderr()))),
            input: Arc::new(Mutex::new(Box::new(std::io::BufReader::new(std::io::stdin())))),
            stdin_is_tty: std::io::stdin().is_terminal(),
            stderr_is_tty: std::io::stderr().is_terminal(),
            stdout_width: terminal_width(),
            verbosity: Level::Info,
            progress: true,
        }
    }

    /// Printer on injected streams, treated as non-terminals without progress.
    pub fn with_streams(
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
        input: Box<dyn BufRead + Send>,
    ) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
            err: Arc::new(Mutex::new(err)),
            input: Arc::new(Mutex::new(input)),
            stdin_is_tty: false,
            stderr_is_tty: false,
            stdout_width: None,
            verbosity: Level::Info,
            progress: false,
        }
    }

    pub fn with_verbosity(mut self, verbosity: Level) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_interactive_stdin(mut self, interactive: bool) -> Self {
        self.stdin_is_tty = interactive;
        self
    }

    /// Pretend stderr is a terminal, which turns progress back on.
    #[cfg(test)]
    pub fn with_interactive_stderr(mut self, interactive: bool) -> Self {
        self.stderr_is_tty = interactive;
        self.progress = interactive;
        self
    }

    /// Fit pretty tables into `width` columns, or leave them unbounded.
    #[cfg(test)]
    pub fn with_stdout_width(mut self, width: Option<usize>) -> Self {
        self.stdout_width = width;
        self
    }

    pub fn verbosity(&self) -> Level {
        self.verbosity
    }

    pub fn stdin_is_tty(&self) -> bool {
        self.stdin_is_tty
    }

    /// Spinners and colors only make sense on a terminal.
    pub fn stderr_is_tty(&self) -> bool {
        self.stderr_is_tty
    }

    /// Globally disable progress indication.
    pub fn disable_progress(&mut self) {
        self.progress = false;
    }

    /// Debug lines would interleave with a spinner.
    pub fn progress_enabled(&self) -> bool {
        self.progress && self.verbosity != Level::Debug
    }

    pub fn outputf(&self, text: impl fmt::Display) -> Result<(), PrintError> {
        let mut out = lock(&self.out);
        write!(out, "{text}")?;
        out.flush()?;
        Ok(())
    }

    pub fn outputln(&self, text: impl fmt::Display) -> Result<(), PrintError> {
        self.outputf(format_args!("{text}\n"))
    }

    /// Render `table` on stdout, shrunk to the terminal width when there is one.
    pub fn output_table(&self, mut table: Table) -> Result<(), PrintError> {
        if let Some(width) = self.stdout_width {
            table.set_max_width(width);
        }
        self.outputf(table.render())
    }

    pub fn debug(&self, message: impl fmt::Display) {
        tracing::debug!("{}", message);
        if self.verbosity >= Level::Debug {
            let stamp = chrono::Local::now().format("%H:%M:%S");
            self.write_err(format!("{stamp} DEBUG {message}\n"));
        }
    }

    pub fn info(&self, message: impl fmt::Display) {
        if self.verbosity >= Level::Info {
            self.write_err(format!("{message}\n"));
        }
    }

    pub fn warn(&self, message: impl fmt::Display) {
        if self.verbosity >= Level::Warning {
            let label = self.styled("Warning:", Color::Yellow);
            self.write_err(format!("{label} {message}\n"));
        }
    }

    pub fn error(&self, message: impl fmt::Display) {
        let label = self.styled("Error:", Color::Red);
        self.write_err(format!("{label} {message}\n"));
    }

    /// Ask a yes/no question on stderr. Only a `y`/`yes` answer proceeds.
    pub fn prompt_for_confirmation(&self, question: &str) -> Result<(), PrintError> {
        if !self.stdin_is_tty {
            return Err(PrintError::ConfirmationRequired);
        }
        let mut input = lock(&self.input);
        for _ in 0..MAX_CONFIRMATION_ATTEMPTS {
            self.write_err(format!("{question} [y/N] "));
            let mut answer = String::new();
            if input.read_line(&mut answer)? == 0 {
                return Err(PrintError::NoInput);
            }
            match answer.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(()),
                "" | "n" | "no" => return Err(PrintError::Aborted),
                _ => {}
            }
        }
        Err(PrintError::TooManyAttempts)
    }

    /// Show `message` and block until the user presses Enter.
    pub fn prompt_for_enter(&self, message: &str) -> Result<(), PrintError> {
        self.write_err(message.to_string());
        let mut line = String::new();
        if lock(&self.input).read_line(&mut line)? == 0 {
            return Err(PrintError::NoInput);
        }
        Ok(())
    }

    /// Everything left on the input stream.
    pub fn read_input(&self) -> Result<String, PrintError> {
        let mut buf = String::new();
        lock(&self.input).read_to_string(&mut buf)?;
        Ok(buf)
    }

    /// Render `value` as JSON or YAML, or hand over to `pretty`.
    pub fn output_result<T, E>(
        &self,
        format: OutputFormat,
        value: &T,
        pretty: impl FnOnce() -> Result<(), E>,
    ) -> Result<(), E>
    where
        T: Serialize + ?Sized,
        E: From<PrintError>,
    {
        match format {
            OutputFormat::Json => {
                let body = serde_json::to_string_pretty(value)
                    .map_err(|e| PrintError::Serialize(e.to_string()))?;
                self.outputln(body)?;
                Ok(())
            }
            OutputFormat::Yaml => {
                let body =
                    serde_yaml::to_string(value).map_err(|e| PrintError::Serialize(e.to_string()))?;
                self.outputf(body)?;
                Ok(())
            }
            OutputFormat::Pretty => pretty(),
        }
    }

    /// Raw access for the spinner.
    pub(crate) fn err_stream(&self) -> Output {
        self.err.clone()
    }

    fn styled(&self, text: &str, color: Color) -> String {
        if self.stderr_is_tty {
            text.with(color).bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn write_err(&self, text: String) {
        let mut err = lock(&self.err);
        let _ = err.write_all(text.as_bytes());
        let _ = err.flush();
    }
}

/// Columns of the terminal on stdout, `None` when output is redirected.
fn terminal_width() -> Option<usize> {
    if !std::io::stdout().is_terminal() {
        return None;
    }
    crossterm::terminal::size()
        .ok()
        .map(|(columns, _)| usize::from(columns))
        .filter(|columns| *columns > 0)
}

fn lock<T: ?Sized>(stream: &Arc<Mutex<T>>) -> MutexGuard<'_, T> {
    stream.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Cloneable in-memory sink.
    #[derive(Clone, Default)]
    pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Printer over buffers with `stdin` as input.
    pub fn buffered(stdin: &str) -> (Printer, SharedBuf, SharedBuf) {
        let out = SharedBuf::default();
        let err = SharedBuf::default();
        let printer = Printer::with_streams(
            Box::new(out.clone()),
            Box::new(err.clone()),
            Box::new(std::io::Cursor::new(stdin.as_bytes().to_vec())),
        );
        (printer, out, err)
    }
}
