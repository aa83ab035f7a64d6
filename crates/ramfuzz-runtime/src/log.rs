//! Value log, region index and replay control file.
//!
//! A log is a flat sequence of records: one tag byte, the value's
//! little-endian bytes, then the value id as a little-endian `u64`. Region
//! boundaries go to a companion index (`<log>.i`), one per line: `id{offset`
//! at region start, `id}offset` at region end, and `id|offset` after a value
//! logged as a region of its own.
//!
//! A replay reads an input log plus its control file (`<log>.c`), whose
//! lines `r <start> <end>` name input regions to regenerate instead of
//! replaying.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::oracle::Wide;
use crate::scalar::Scalar;
use crate::RuntimeError;

/// Bytes after the tag: value, then a `u64` value id.
const VALUEID_WIDTH: usize = 8;

pub fn index_path(log: &Path) -> PathBuf {
    with_suffix(log, ".i")
}

pub fn control_path(log: &Path) -> PathBuf {
    with_suffix(log, ".c")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

fn create_file(path: &Path) -> Result<BufWriter<File>, RuntimeError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| RuntimeError::File {
            path: path.to_path_buf(),
            source,
        })
}

// ── Writing ──────────────────────────────────────────────────────────

/// Append-only writer for a log and its index.
pub struct LogWriter {
    path: PathBuf,
    log: BufWriter<File>,
    index: BufWriter<File>,
    offset: u64,
    scratch: Vec<u8>,
}

impl LogWriter {
    /// Creates (truncating) `path` and `path.i`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let path = path.as_ref().to_path_buf();
        let log = create_file(&path)?;
        let index = create_file(&index_path(&path))?;
        Ok(Self {
            path,
            log,
            index,
            offset: 0,
            scratch: Vec::with_capacity(1 + 8 + VALUEID_WIDTH),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written to the log so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn record<T: Scalar>(&mut self, value: T, valueid: u64) -> Result<(), RuntimeError> {
        self.scratch.clear();
        self.scratch.push(T::TAG);
        value.write_le(&mut self.scratch);
        self.scratch.extend_from_slice(&valueid.to_le_bytes());
        self.log.write_all(&self.scratch)?;
        self.offset += self.scratch.len() as u64;
        Ok(())
    }

    pub fn mark_value(&mut self, id: u64) -> Result<(), RuntimeError> {
        writeln!(self.index, "{id}|{}", self.offset)?;
        Ok(())
    }

    pub fn begin_region(&mut self, id: u64) -> Result<(), RuntimeError> {
        writeln!(self.index, "{id}{{{}", self.offset)?;
        Ok(())
    }

    pub fn end_region(&mut self, id: u64) -> Result<(), RuntimeError> {
        writeln!(self.index, "{id}}}{}", self.offset)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), RuntimeError> {
        self.log.flush()?;
        self.index.flush()?;
        Ok(())
    }
}

// ── Reading ──────────────────────────────────────────────────────────

/// One decoded record, whatever its type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogRecord {
    pub offset: u64,
    pub tag: u8,
    pub value: Wide,
    pub valueid: u64,
}

/// Sequential reader over a whole log held in memory.
#[derive(Debug)]
pub struct LogReader {
    data: Vec<u8>,
    pos: usize,
}

impl LogReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| RuntimeError::File {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_bytes(data))
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    pub fn offset(&self) -> u64 {
        self.pos as u64
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn seek(&mut self, offset: u64) -> Result<(), RuntimeError> {
        match usize::try_from(offset) {
            Ok(pos) if pos <= self.data.len() => {
                self.pos = pos;
                Ok(())
            }
            _ => Err(RuntimeError::LogExhausted { offset }),
        }
    }

    /// Reads the next record, which must hold a `T`.
    pub fn read<T: Scalar>(&mut self) -> Result<(T, u64), RuntimeError> {
        let offset = self.offset();
        let found = *self
            .data
            .get(self.pos)
            .ok_or(RuntimeError::LogExhausted { offset })?;
        if !tag_matches(T::TAG, found) {
            return Err(RuntimeError::TagMismatch {
                offset,
                expected: T::TAG,
                found,
            });
        }
        let (value, valueid, len) = self.decode_at::<T>(self.pos)?;
        self.pos += len;
        Ok((value, valueid))
    }

    /// Reads the next record of any type; None at the end of the log.
    pub fn next_record(&mut self) -> Result<Option<LogRecord>, RuntimeError> {
        let offset = self.offset();
        let Some(&tag) = self.data.get(self.pos) else {
            return Ok(None);
        };
        let (value, valueid, len) = match tag {
            0 => self.decode_wide::<bool>()?,
            1 => self.decode_wide::<i8>()?,
            2 => self.decode_wide::<u8>()?,
            3 => self.decode_wide::<i16>()?,
            4 => self.decode_wide::<u16>()?,
            5 => self.decode_wide::<i32>()?,
            6 => self.decode_wide::<u32>()?,
            7 | 9 => self.decode_wide::<i64>()?,
            8 | 10 => self.decode_wide::<u64>()?,
            11 => self.decode_wide::<f32>()?,
            12 => self.decode_wide::<f64>()?,
            other => {
                return Err(RuntimeError::Protocol(format!(
                    "unknown log tag {other} at offset {offset}"
                )))
            }
        };
        self.pos += len;
        Ok(Some(LogRecord {
            offset,
            tag,
            value,
            valueid,
        }))
    }

    fn decode_wide<T: Scalar>(&self) -> Result<(Wide, u64, usize), RuntimeError> {
        let (value, valueid, len) = self.decode_at::<T>(self.pos)?;
        Ok((value.widen(), valueid, len))
    }

    /// Decodes the record starting at `pos`, returning its length too.
    fn decode_at<T: Scalar>(&self, pos: usize) -> Result<(T, u64, usize), RuntimeError> {
        let len = 1 + T::WIDTH + VALUEID_WIDTH;
        let bytes = self
            .data
            .get(pos..pos + len)
            .ok_or(RuntimeError::LogExhausted { offset: pos as u64 })?;
        let value = T::read_le(&bytes[1..1 + T::WIDTH]).ok_or_else(|| {
            RuntimeError::Protocol(format!("undecodable value at offset {pos}"))
        })?;
        let mut id = [0u8; VALUEID_WIDTH];
        id.copy_from_slice(&bytes[1 + T::WIDTH..]);
        Ok((value, u64::from_le_bytes(id), len))
    }
}

/// Tags 9 and 10 (`long long` variants) read as 64-bit integers.
fn tag_matches(expected: u8, found: u8) -> bool {
    found == expected || (expected == 7 && found == 9) || (expected == 8 && found == 10)
}

// ── Control file ─────────────────────────────────────────────────────

/// An input-log span to regenerate during replay, from a region start to
/// the matching region end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipRange {
    pub start: u64,
    pub end: u64,
}

/// Parses a control file. A missing file means nothing is regenerated.
pub fn read_control(path: &Path) -> Result<Vec<SkipRange>, RuntimeError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(RuntimeError::File {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse_control(&text)
}

pub fn parse_control(text: &str) -> Result<Vec<SkipRange>, RuntimeError> {
    let mut ranges = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let bad = || RuntimeError::Protocol(format!("control line {}: '{line}'", n + 1));
        let mut words = line.split_whitespace();
        if words.next() != Some("r") {
            return Err(bad());
        }
        let start = words.next().and_then(|w| w.parse().ok()).ok_or_else(bad)?;
        let end = words.next().and_then(|w| w.parse().ok()).ok_or_else(bad)?;
        if words.next().is_some() || end < start {
            return Err(bad());
        }
        ranges.push(SkipRange { start, end });
    }
    ranges.sort_by_key(|r| r.start);
    Ok(ranges)
}

pub fn write_control(path: &Path, ranges: &[SkipRange]) -> Result<(), RuntimeError> {
    let mut out = create_file(path)?;
    for r in ranges {
        writeln!(out, "r {} {}", r.start, r.end)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(records: &[(u8, &[u8], u64)]) -> Vec<u8> {
        let mut data = Vec::new();
        for (tag, value, id) in records {
            data.push(*tag);
            data.extend_from_slice(value);
            data.extend_from_slice(&id.to_le_bytes());
        }
        data
    }

    #[test]
    fn test_read_typed() {
        let data = encoded(&[(5, &7i32.to_le_bytes(), 3), (0, &[1], 4)]);
        let mut reader = LogReader::from_bytes(data);
        assert_eq!(reader.read::<i32>().unwrap(), (7, 3));
        assert_eq!(reader.read::<bool>().unwrap(), (true, 4));
        assert!(reader.is_at_end());
        assert!(matches!(
            reader.read::<bool>(),
            Err(RuntimeError::LogExhausted { offset: 23 })
        ));
    }

    #[test]
    fn test_tag_mismatch() {
        let data = encoded(&[(6, &9u32.to_le_bytes(), 0)]);
        let mut reader = LogReader::from_bytes(data);
        let err = reader.read::<i32>().unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::TagMismatch { offset: 0, expected: 5, found: 6 }
        ));
        // Position is unchanged after a failed read.
        assert_eq!(reader.read::<u32>().unwrap(), (9, 0));
    }

    #[test]
    fn test_long_long_tags_read_as_64_bit() {
        let data = encoded(&[(9, &(-1i64).to_le_bytes(), 1), (10, &5u64.to_le_bytes(), 2)]);
        let mut reader = LogReader::from_bytes(data);
        assert_eq!(reader.read::<i64>().unwrap(), (-1, 1));
        let rec = reader.next_record().unwrap().unwrap();
        assert_eq!(rec.value, Wide::U64(5));
        assert_eq!(rec.tag, 10);
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_truncated_record() {
        let mut data = encoded(&[(12, &1.5f64.to_le_bytes(), 1)]);
        data.truncate(10);
        let mut reader = LogReader::from_bytes(data);
        assert!(matches!(
            reader.read::<f64>(),
            Err(RuntimeError::LogExhausted { .. })
        ));
    }

    #[test]
    fn test_unknown_tag() {
        let mut reader = LogReader::from_bytes(vec![42, 0, 0]);
        assert!(matches!(
            reader.next_record(),
            Err(RuntimeError::Protocol(_))
        ));
    }

    #[test]
    fn test_parse_control() {
        let ranges = parse_control("r 40 80\n\nr 0 17\n").unwrap();
        assert_eq!(
            ranges,
            vec![SkipRange { start: 0, end: 17 }, SkipRange { start: 40, end: 80 }]
        );
        assert!(parse_control("x 1 2").is_err());
        assert!(parse_control("r 5").is_err());
        assert!(parse_control("r 9 3").is_err());
        assert!(parse_control("r 1 2 3").is_err());
    }

    #[test]
    fn test_companion_paths() {
        let log = Path::new("/tmp/run/fuzzlog");
        assert_eq!(index_path(log), Path::new("/tmp/run/fuzzlog.i"));
        assert_eq!(control_path(log), Path::new("/tmp/run/fuzzlog.c"));
    }
}
