//! Destinations for split pages.
//!
//! A sink receives `(file name, PDF bytes)` pairs. Every sink is write-once:
//! writing a name twice is an error, and [`OutputSink::exists`] lets the
//! splitter pick a free name before writing.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Receives single-page documents under their assigned names.
pub trait OutputSink {
    /// Whether `name` is already taken in this sink.
    fn exists(&self, name: &str) -> bool;

    /// Store a document under `name`. Fails if the name is taken.
    fn write(&mut self, name: &str, data: &[u8]) -> Result<()>;
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn exists(&self, name: &str) -> bool {
        (**self).exists(name)
    }

    fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        (**self).write(name, data)
    }
}

/// Writes files into a directory.
///
/// Files already present in the directory count as taken, so a run never
/// overwrites earlier output.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Use `dir`, creating it if needed.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path for a file name.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl OutputSink for DirectorySink {
    fn exists(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }

    /// Writes to a temporary file in the directory, then links it under
    /// `name`; a failed write leaves nothing behind.
    fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.path_for(name);
        if path.exists() {
            return Err(already_exists(&path));
        }

        let mut file = tempfile::Builder::new()
            .prefix(PARTIAL_PREFIX)
            .suffix(".part")
            .tempfile_in(&self.dir)?;
        file.write_all(data)?;
        file.flush()?;
        file.persist_noclobber(&path).map_err(|e| match e.error.kind() {
            std::io::ErrorKind::AlreadyExists => already_exists(&path),
            _ => Error::Io(e.error),
        })?;
        Ok(())
    }
}

/// Prefix of in-progress files inside a [`DirectorySink`] directory.
const PARTIAL_PREFIX: &str = ".ordersplit-";

fn already_exists(path: &Path) -> Error {
    Error::Output(format!("{} already exists", path.display()))
}

/// Keeps documents in memory, in write order.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    files: Vec<(String, Vec<u8>)>,
    names: HashSet<String>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names in write order.
    pub fn names(&self) -> Vec<&str> {
        self.files.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Contents stored under `name`.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.files
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d.as_slice())
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Consume the sink, returning `(name, bytes)` pairs in write order.
    pub fn into_files(self) -> Vec<(String, Vec<u8>)> {
        self.files
    }
}

impl OutputSink for MemorySink {
    fn exists(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        if !self.names.insert(name.to_string()) {
            return Err(Error::Output(format!("{} already written", name)));
        }
        self.files.push((name.to_string(), data.to_vec()));
        Ok(())
    }
}

#[cfg(feature = "archive")]
pub use archive::ZipSink;

#[cfg(feature = "archive")]
mod archive {
    use std::collections::HashSet;
    use std::fs::File;
    use std::io::{Seek, Write};
    use std::path::Path;

    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    use super::OutputSink;
    use crate::error::{Error, Result};

    /// Streams documents into a ZIP archive.
    pub struct ZipSink<W: Write + Seek> {
        writer: ZipWriter<W>,
        names: HashSet<String>,
    }

    impl ZipSink<File> {
        /// Create an archive file at `path`.
        pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
            Ok(Self::new(File::create(path)?))
        }
    }

    impl<W: Write + Seek> ZipSink<W> {
        /// Write the archive into `inner`.
        pub fn new(inner: W) -> Self {
            Self {
                writer: ZipWriter::new(inner),
                names: HashSet::new(),
            }
        }

        /// Number of archived documents.
        pub fn len(&self) -> usize {
            self.names.len()
        }

        /// Whether nothing has been archived.
        pub fn is_empty(&self) -> bool {
            self.names.is_empty()
        }

        /// Write the central directory and return the inner writer.
        pub fn finish(self) -> Result<W> {
            Ok(self.writer.finish()?)
        }
    }

    impl<W: Write + Seek> OutputSink for ZipSink<W> {
        fn exists(&self, name: &str) -> bool {
            self.names.contains(name)
        }

        fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
            if self.names.contains(name) {
                return Err(Error::Output(format!("{} already archived", name)));
            }
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            self.writer.start_file(name, options)?;
            self.writer.write_all(data)?;
            self.names.insert(name.to_string());
            Ok(())
        }
    }
}
