//! CSV record store
//!
//! Every batch is written by building the complete new file in a temporary file next
//! to the target and renaming it into place, so readers never observe a half-written
//! file.

use crate::crawler::ProductRecord;
use crate::output::traits::{OutputResult, RecordStore};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Header row of the output file
pub const CSV_HEADER: [&str; 4] = ["Title", "Price", "Category", "Link"];

/// Writes product records to a CSV file
#[derive(Debug)]
pub struct CsvStore {
    path: PathBuf,
    append: bool,
    started: bool,
}

impl CsvStore {
    /// Creates a store for `path`
    ///
    /// Without `append`, the first batch of the run replaces any existing file.
    /// With `append`, existing rows are kept and the header is written only when
    /// the file is new or empty.
    pub fn new(path: impl Into<PathBuf>, append: bool) -> Self {
        Self {
            path: path.into(),
            append,
            started: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn target_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Copies the current file into `temp`, returning the number of bytes copied
    ///
    /// A last line without terminator is completed so new rows start on a line of
    /// their own.
    fn copy_existing(&self, temp: &mut NamedTempFile) -> io::Result<u64> {
        let mut existing = match File::open(&self.path) {
            Ok(existing) => existing,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let copied = io::copy(&mut existing, temp.as_file_mut())?;
        if copied > 0 && !ends_with_newline(temp.as_file_mut())? {
            temp.as_file_mut().write_all(b"\n")?;
        }
        Ok(copied)
    }

    /// Gives the replacement file the permissions of the file it replaces
    fn keep_permissions(&self, temp: &NamedTempFile) -> io::Result<()> {
        match std::fs::metadata(&self.path) {
            Ok(metadata) => temp.as_file().set_permissions(metadata.permissions()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl RecordStore for CsvStore {
    fn append_records(&mut self, records: &[ProductRecord]) -> OutputResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut temp = NamedTempFile::new_in(self.target_dir())?;

        let keep_existing = self.started || self.append;
        let existing_bytes = if keep_existing {
            self.copy_existing(&mut temp)?
        } else {
            0
        };

        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(temp.as_file_mut());

            if existing_bytes == 0 {
                writer.write_record(CSV_HEADER)?;
            }
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }

        self.keep_permissions(&temp)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path)?;
        self.started = true;

        tracing::debug!(
            "Wrote {} records to {}",
            records.len(),
            self.path.display()
        );
        Ok(records.len())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Checks the last byte of `file`, leaving the cursor at the end
fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
