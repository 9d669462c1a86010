//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Append-only JSON Lines sink for emitted readings."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Result, SimError};

/// Append-only line writer. Lines are buffered until [`JsonlSink::flush`].
pub struct JsonlSink<W: Write = BufWriter<File>> {
    path: PathBuf,
    writer: W,
    lines: u64,
}

impl JsonlSink {
    /// Open `path` for appending, creating missing parent directories first.
    /// Existing content is never truncated.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| SimError::SinkOpen {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| SimError::SinkOpen {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_writer(path, BufWriter::new(file)))
    }
}

impl<W: Write> JsonlSink<W> {
    /// Wrap an arbitrary writer; `path` is only used in diagnostics.
    pub fn from_writer(path: impl Into<PathBuf>, writer: W) -> Self {
        Self {
            path: path.into(),
            writer,
            lines: 0,
        }
    }

    /// Serialize `record` as one compact JSON line.
    pub fn append<T: Serialize>(&mut self, record: &T) -> Result<()> {
        let line = serde_json::to_string(record)?;
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .map_err(|source| SimError::SinkWrite {
                path: self.path.clone(),
                source,
            })?;
        self.lines += 1;
        Ok(())
    }

    /// Push buffered lines down to the file.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|source| SimError::SinkWrite {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines appended through this handle.
    pub fn lines_written(&self) -> u64 {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
