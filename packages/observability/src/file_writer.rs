//! Append-only log file writer.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing_subscriber::fmt::MakeWriter;

/// Shared handle to a log file opened in append mode.
///
/// Every write is flushed so that lines from several processes sharing the
/// file do not interleave mid-line.
#[derive(Clone)]
pub struct AppendFileWriter {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl AppendFileWriter {
    /// Open (or create) the file, creating parent directories as needed.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::with_capacity(8192, file))),
        })
    }

    fn lock(&self) -> MutexGuard<'_, BufWriter<File>> {
        // A panic while holding the lock leaves at most a partial line behind.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Write for AppendFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.lock();
        let written = guard.write(buf)?;
        guard.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for AppendFileWriter {
    type Writer = AppendFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_parent_dirs_and_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("nested").join("favorites.jsonl");

        let mut writer = AppendFileWriter::open(&path).unwrap();
        writer.write_all(b"first\n").unwrap();

        let mut second = AppendFileWriter::open(&path).unwrap();
        second.write_all(b"second\n").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }
}
