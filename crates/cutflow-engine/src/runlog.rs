//! Per-run text log receiving the run header and the summary table.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use cutflow_core::errors::{AnaError, ErrorInfo};

enum Sink {
    File(BufWriter<File>),
    Memory(Vec<u8>),
    Discard,
}

/// Text sink of one run, usually `<folder>/<sample>.log`.
pub struct RunLog {
    sink: Sink,
    path: Option<PathBuf>,
}

impl RunLog {
    /// Creates (or truncates) the log file, creating parent directories.
    pub fn create(path: &Path) -> Result<Self, AnaError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| AnaError::io("log_dir", err))?;
        }
        let file = File::create(path).map_err(|err| {
            AnaError::Io(
                ErrorInfo::new("log_create", err.to_string()).with_context("path", path.display()),
            )
        })?;
        Ok(Self {
            sink: Sink::File(BufWriter::new(file)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Log kept in memory, readable with [`RunLog::contents`].
    pub fn memory() -> Self {
        Self {
            sink: Sink::Memory(Vec::new()),
            path: None,
        }
    }

    /// Log that drops everything.
    pub fn discard() -> Self {
        Self {
            sink: Sink::Discard,
            path: None,
        }
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Appends text verbatim.
    pub fn write_str(&mut self, text: &str) -> Result<(), AnaError> {
        match &mut self.sink {
            Sink::File(writer) => writer
                .write_all(text.as_bytes())
                .map_err(|err| AnaError::io("log_write", err)),
            Sink::Memory(buffer) => {
                buffer.extend_from_slice(text.as_bytes());
                Ok(())
            }
            Sink::Discard => Ok(()),
        }
    }

    /// Flushes buffered output to disk.
    pub fn flush(&mut self) -> Result<(), AnaError> {
        match &mut self.sink {
            Sink::File(writer) => writer.flush().map_err(|err| AnaError::io("log_flush", err)),
            Sink::Memory(_) | Sink::Discard => Ok(()),
        }
    }

    /// Text written so far to an in-memory log.
    pub fn contents(&self) -> Option<String> {
        match &self.sink {
            Sink::Memory(buffer) => Some(String::from_utf8_lossy(buffer).into_owned()),
            Sink::File(_) | Sink::Discard => None,
        }
    }
}

impl std::fmt::Debug for RunLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.sink {
            Sink::File(_) => "file",
            Sink::Memory(_) => "memory",
            Sink::Discard => "discard",
        };
        f.debug_struct("RunLog")
            .field("sink", &kind)
            .field("path", &self.path)
            .finish()
    }
}
