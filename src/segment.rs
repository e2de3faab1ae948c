//! Segment files.
//!
//! A segment is one append-only `NNNNNN.log` file. Exactly one segment is
//! active at a time: it owns a buffered writer and receives all appends.
//! Every other segment is frozen and serves positional reads only.
//! Segments are never rewritten in place.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::options::{HEADER_SIZE, WRITE_BUFFER_SIZE};
use crate::record::Record;
use crate::util::filename::segment_file_path;
use crate::{Error, Result};

/// Handle to one segment file on disk.
pub struct Segment {
    /// Segment id; the id embedded in the filename is authoritative.
    id: u64,
    path: PathBuf,
    /// Handle used for positional reads; shares its file description with
    /// the writer below when the segment is active.
    file: File,
    /// Buffered writer fronting appends. `Some` only while active.
    writer: Option<BufWriter<File>>,
}

impl Segment {
    /// Open a segment for appending, creating the file if needed.
    ///
    /// The returned segment is active: appends go through a buffered
    /// writer of the given capacity, and positional reads observe every
    /// flushed byte.
    pub fn open_active(dir: &Path, id: u64, buffer_size: usize) -> Result<Segment> {
        let path = segment_file_path(dir, id);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)?;

        let writer = BufWriter::with_capacity(buffer_size, file.try_clone()?);

        Ok(Segment {
            id,
            path,
            file,
            writer: Some(writer),
        })
    }

    /// Open an existing segment read-only (frozen).
    pub fn open_readonly(dir: &Path, id: u64) -> Result<Segment> {
        let path = segment_file_path(dir, id);
        let file = OpenOptions::new().read(true).open(&path)?;

        Ok(Segment {
            id,
            path,
            file,
            writer: None,
        })
    }

    /// Get the segment id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Check whether this segment accepts appends.
    pub fn is_active(&self) -> bool {
        self.writer.is_some()
    }

    /// Current size of the file on disk, excluding any buffered bytes.
    pub fn file_size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Append bytes through the buffered writer; returns bytes written.
    pub fn append(&mut self, data: &[u8]) -> Result<usize> {
        match self.writer.as_mut() {
            Some(writer) => {
                writer.write_all(data)?;
                Ok(data.len())
            }
            None => Err(Error::internal(format!(
                "append to frozen segment {}",
                self.id
            ))),
        }
    }

    /// Flush the buffered writer to the OS.
    pub fn flush(&mut self) -> Result<()> {
        match self.writer.as_mut() {
            Some(writer) => {
                writer.flush()?;
                Ok(())
            }
            None => Err(Error::internal(format!(
                "flush on frozen segment {}",
                self.id
            ))),
        }
    }

    /// Force previously flushed bytes to stable storage (fsync).
    pub fn sync(&self) -> Result<()> {
        if self.writer.is_none() {
            return Err(Error::internal(format!(
                "fsync on frozen segment {}",
                self.id
            )));
        }
        self.file.sync_all()?;
        Ok(())
    }

    /// Positional read of exactly `size` bytes at `offset`.
    ///
    /// Never moves a shared file cursor, so concurrent reads do not
    /// interfere with each other or with appends.
    pub fn read_at(&self, offset: u64, size: u64) -> Result<Bytes> {
        let mut buf = vec![0u8; size as usize];

        self.file.read_exact_at(&mut buf, offset).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                Error::corruption(format!(
                    "short read in segment {}: {} bytes at offset {}",
                    self.id, size, offset
                ))
            } else {
                e.into()
            }
        })?;

        Ok(Bytes::from(buf))
    }

    /// Seal the segment: flush, fsync, close the writable handle, and
    /// reopen read-only. The writable descriptor is closed before the
    /// read-only one is opened.
    pub fn freeze(mut self) -> Result<Segment> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            self.file.sync_all()?;
        }

        let id = self.id;
        let path = self.path.clone();
        drop(self);

        let file = OpenOptions::new().read(true).open(&path)?;

        Ok(Segment {
            id,
            path,
            file,
            writer: None,
        })
    }

    /// Sequential scan over every record in the segment, in append order.
    ///
    /// Used only by recovery. The scanner owns an independent cursor
    /// starting at offset 0 and is consumed once.
    pub fn scan(&self) -> Result<SegmentScanner> {
        let file = File::open(&self.path)?;

        Ok(SegmentScanner {
            reader: BufReader::with_capacity(WRITE_BUFFER_SIZE, file),
            offset: 0,
            done: false,
        })
    }
}

/// Forward reader over a segment's records.
///
/// Yields `(record, offset, size)` triples in physical append order. A
/// clean end-of-file or a truncated tail record ends the scan without
/// error; a checksum failure on a fully present record is reported.
pub struct SegmentScanner {
    reader: BufReader<File>,
    offset: u64,
    done: bool,
}

impl SegmentScanner {
    /// Read the next record, or `None` at the end of the segment.
    pub fn read_entry(&mut self) -> Result<Option<(Record, u64, u64)>> {
        if self.done {
            return Ok(None);
        }

        let mut buf = vec![0u8; HEADER_SIZE];
        if !self.fill(&mut buf)? {
            return Ok(None);
        }

        let key_len = u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]) as usize;
        let value_len = u32::from_be_bytes([buf[16], buf[17], buf[18], buf[19]]) as usize;

        buf.resize(HEADER_SIZE + key_len + value_len, 0);
        if !self.fill_from(&mut buf, HEADER_SIZE)? {
            return Ok(None);
        }

        let record = Record::decode(&buf)?;

        let offset = self.offset;
        let size = buf.len() as u64;
        self.offset += size;

        Ok(Some((record, offset, size)))
    }

    fn fill(&mut self, buf: &mut Vec<u8>) -> Result<bool> {
        self.fill_from(buf, 0)
    }

    /// Read exactly `buf[start..]`; a clean EOF or a partial read marks
    /// the scan done (truncated tail tolerated) and returns false.
    fn fill_from(&mut self, buf: &mut Vec<u8>, start: usize) -> Result<bool> {
        match self.reader.read_exact(&mut buf[start..]) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                self.done = true;
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Iterator for SegmentScanner {
    type Item = Result<(Record, u64, u64)>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
