//! Stage log for a single run.
//!
//! Every line is `"<timestamp>, <message>"`, appended to the log file and
//! echoed to stdout. Write failures are swallowed: a broken log never aborts
//! a run. Diagnostics about such failures go through the `log` facade.

use chrono::{DateTime, Local, TimeZone};
use std::fmt::{self, Display};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Timestamp layout of log lines, e.g. `2025-December-31-14-30-45`.
pub const LOG_TIME_FORMAT: &str = "%Y-%B-%d-%H-%M-%S";

pub fn format_log_time<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    at.format(LOG_TIME_FORMAT).to_string()
}

/// Append handle held for the duration of a run; closed on drop.
pub struct RunLog {
    path: Option<PathBuf>,
    file: Option<File>,
    echo: Option<Box<dyn Write>>,
}

impl fmt::Debug for RunLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLog")
            .field("path", &self.path)
            .field("file", &self.file)
            .field("echo", &self.echo.is_some())
            .finish()
    }
}

impl RunLog {
    /// Open (or create) `path` for appending. If that fails the log keeps
    /// working on the console only.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(f) => Some(f),
            Err(e) => {
                log::warn!("cannot open run log {}: {}", path.display(), e);
                None
            }
        };
        Self {
            path: Some(path),
            file,
            echo: Some(Box::new(io::stdout())),
        }
    }

    pub fn console_only() -> Self {
        Self {
            path: None,
            file: None,
            echo: Some(Box::new(io::stdout())),
        }
    }

    /// Toggle mirroring to stdout.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo.then(|| Box::new(io::stdout()) as Box<dyn Write>);
        self
    }

    /// Mirror lines to `out` instead of stdout.
    pub fn with_echo_to(mut self, out: impl Write + 'static) -> Self {
        self.echo = Some(Box::new(out));
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn started(&mut self, stage: &str) {
        self.message(&format!("[{stage}] Started"));
    }

    pub fn completed(&mut self, stage: &str) {
        self.message(&format!("[{stage}] Completed"));
    }

    pub fn failed(&mut self, stage: &str, error: &dyn Display) {
        self.message(&format!("[{stage}] Failed: {error}"));
    }

    /// Run `f` as a named stage: log Started, then Completed or Failed.
    pub fn stage<T, E, F>(&mut self, name: &str, f: F) -> Result<T, E>
    where
        E: Display,
        F: FnOnce() -> Result<T, E>,
    {
        self.started(name);
        let out = f();
        match &out {
            Ok(_) => self.completed(name),
            Err(e) => self.failed(name, e),
        }
        out
    }

    pub fn message(&mut self, msg: &str) {
        let line = format!("{}, {}", format_log_time(&Local::now()), msg);
        if let Some(f) = self.file.as_mut() {
            if let Err(e) = writeln!(f, "{line}") {
                log::warn!("run log write failed: {e}");
            }
        }
        if let Some(out) = self.echo.as_mut() {
            if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
                // Stop echoing after the first failure, e.g. a closed pipe.
                log::warn!("run log echo failed: {e}");
                self.echo = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn log_time_spells_out_month() {
        let t = Utc.with_ymd_and_hms(2025, 12, 31, 14, 30, 45).unwrap();
        assert_eq!(format_log_time(&t), "2025-December-31-14-30-45");
    }

    #[test]
    fn unopenable_path_degrades_to_console() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending.
        let mut log = RunLog::open(dir.path()).with_echo(false);
        log.started("Extract GDP Data");
        assert!(log.file.is_none());
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_echo_is_dropped_after_first_error() {
        let mut log = RunLog::console_only().with_echo_to(ClosedPipe);
        log.started("ETL Process");
        assert!(log.echo.is_none());
        log.completed("ETL Process");
    }
}
