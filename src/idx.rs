//! IDX dataset files
//!
//! The IDX format stores an n-dimensional array of unsigned bytes behind a
//! big-endian header:
//!
//! | bytes | meaning                                  |
//! |-------|------------------------------------------|
//! | 2     | reserved, must be zero                   |
//! | 1     | element type, `0x08` for unsigned bytes  |
//! | 1     | number of dimensions `n`                 |
//! | 4 × n | big-endian `u32` size of each dimension  |
//! | ...   | payload, product of all sizes in bytes   |
//!
//! MNIST labels are 1-D files (one byte per sample) and images are 3-D files
//! (`count × rows × cols`). Load failures are reported through [`IdxError`];
//! asking a loaded file for a record it does not have is a programming error
//! and panics.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use log::debug;

/// Type tag of unsigned-byte payloads.
pub const TYPE_UNSIGNED_BYTE: u8 = 0x08;

/// Errors that can occur while loading an IDX file.
#[derive(Debug)]
pub enum IdxError {
    /// Reading the source failed.
    Io(io::Error),
    /// The two reserved header bytes were not zero.
    BadMagic(u16),
    /// The payload type is not unsigned bytes.
    UnsupportedType(u8),
    /// The header declared zero dimensions.
    NoDimensions,
    /// The source ended before the header or payload was complete.
    Truncated { expected: usize, actual: usize },
    /// The declared dimensions multiply past the addressable size.
    Oversized(Vec<u32>),
    /// A label record is not below the number of classes.
    LabelOutOfRange {
        index: usize,
        label: u8,
        classes: usize,
    },
}

impl fmt::Display for IdxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::BadMagic(magic) => write!(f, "bad magic: {magic:#06x}"),
            Self::UnsupportedType(tag) => {
                write!(f, "unsupported element type {tag:#04x}, expected 0x08")
            }
            Self::NoDimensions => write!(f, "header declares no dimensions"),
            Self::Truncated { expected, actual } => {
                write!(f, "truncated file: expected {expected} bytes, got {actual}")
            }
            Self::Oversized(dims) => write!(f, "dimensions {dims:?} are too large"),
            Self::LabelOutOfRange {
                index,
                label,
                classes,
            } => write!(f, "label {label} at record {index} is not below {classes}"),
        }
    }
}

impl std::error::Error for IdxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for IdxError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// A fully loaded IDX file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdxFile {
    dims: Vec<u32>,
    data: Vec<u8>,
}

/// Fill `buf` completely, reporting a short read as `Truncated`.
fn read_exact_or_truncated<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    consumed: usize,
) -> Result<(), IdxError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(IdxError::Truncated {
                    expected: consumed + buf.len(),
                    actual: consumed + filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Product of `dims` as `usize`, or `None` on overflow.
fn checked_product(dims: &[u32]) -> Option<usize> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d as usize))
}

impl IdxFile {
    /// Parse an IDX stream.
    pub fn read<R: Read>(mut reader: R) -> Result<Self, IdxError> {
        let mut header = [0u8; 4];
        read_exact_or_truncated(&mut reader, &mut header, 0)?;

        let magic = u16::from_be_bytes([header[0], header[1]]);
        if magic != 0 {
            return Err(IdxError::BadMagic(magic));
        }
        if header[2] != TYPE_UNSIGNED_BYTE {
            return Err(IdxError::UnsupportedType(header[2]));
        }
        let ndims = header[3] as usize;
        if ndims == 0 {
            return Err(IdxError::NoDimensions);
        }

        let mut raw_dims = vec![0u8; 4 * ndims];
        read_exact_or_truncated(&mut reader, &mut raw_dims, header.len())?;
        let dims: Vec<u32> = raw_dims
            .chunks_exact(4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        // Record size is checked separately so `record_len` stays in range
        // even when the record count is zero.
        let nbytes = checked_product(&dims[1..])
            .and_then(|record| record.checked_mul(dims[0] as usize))
            .ok_or_else(|| IdxError::Oversized(dims.clone()))?;

        // The buffer only grows with the bytes actually present.
        let consumed = header.len() + raw_dims.len();
        let mut data = Vec::new();
        reader.by_ref().take(nbytes as u64).read_to_end(&mut data)?;
        if data.len() < nbytes {
            return Err(IdxError::Truncated {
                expected: consumed.saturating_add(nbytes),
                actual: consumed + data.len(),
            });
        }

        debug!("read idx file: dims={:?}, payload={} bytes", dims, nbytes);
        Ok(Self { dims, data })
    }

    /// Open and parse the IDX file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IdxError> {
        let file = File::open(path)?;
        Self::read(BufReader::new(file))
    }

    /// Size of every dimension, outermost first.
    pub fn dims(&self) -> &[u32] {
        &self.dims
    }

    /// Number of records (size of the first dimension).
    pub fn len(&self) -> usize {
        self.dims[0] as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes per record: the product of every dimension after the first.
    pub fn record_len(&self) -> usize {
        self.dims[1..].iter().map(|&d| d as usize).product()
    }

    /// The `i`-th scalar of a 1-D file.
    pub fn get1(&self, i: usize) -> u8 {
        assert_eq!(self.dims.len(), 1, "get1 requires a 1-D file");
        assert!(i < self.len(), "record {} out of range ({})", i, self.len());
        self.data[i]
    }

    /// The `i`-th matrix of a 3-D file, row-major.
    pub fn get3(&self, i: usize) -> &[u8] {
        assert_eq!(self.dims.len(), 3, "get3 requires a 3-D file");
        assert!(i < self.len(), "record {} out of range ({})", i, self.len());
        let n = self.record_len();
        &self.data[i * n..(i + 1) * n]
    }

    /// Copy the `i`-th matrix of a 3-D file into `out`.
    pub fn get3_into(&self, i: usize, out: &mut [u8]) {
        out.copy_from_slice(self.get3(i));
    }

    /// Check that every scalar of a 1-D label file is below `classes`.
    pub fn check_labels(&self, classes: usize) -> Result<(), IdxError> {
        assert_eq!(self.dims.len(), 1, "check_labels requires a 1-D file");
        match self
            .data
            .iter()
            .position(|&label| label as usize >= classes)
        {
            Some(index) => Err(IdxError::LabelOutOfRange {
                index,
                label: self.data[index],
                classes,
            }),
            None => Ok(()),
        }
    }
}

/// Scale raw pixel bytes into `[0, 1]`.
pub fn normalize_into(bytes: &[u8], out: &mut [f64]) {
    assert_eq!(bytes.len(), out.len(), "length mismatch in normalize_into");
    for (value, &byte) in out.iter_mut().zip(bytes) {
        *value = byte as f64 / 255.0;
    }
}
